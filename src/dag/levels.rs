// src/dag/levels.rs

//! Dependency levels.
//!
//! `level(t) = 0` when `t.blocked_by` is empty, otherwise
//! `1 + max(level(d))` over the dependencies present in the snapshot.
//! Dependencies missing from the snapshot are skipped, so a task whose
//! dependencies are all unknown sits at level 0.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::errors::{Result, SquadronError};
use crate::model::{Task, TaskId};

/// Computes levels against one snapshot, memoizing across calls.
///
/// Create one per batch: the memo is only valid while the snapshot it was
/// built from stays unchanged.
#[derive(Debug)]
pub struct LevelCalculator<'a> {
    index: HashMap<&'a str, &'a Task>,
    /// Finished nodes.
    memo: HashMap<TaskId, u32>,
}

impl<'a> LevelCalculator<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        Self {
            index: tasks.iter().map(|t| (t.id.as_str(), t)).collect(),
            memo: HashMap::new(),
        }
    }

    /// Level of `task`, which need not be part of the snapshot itself
    /// (e.g. a task that is about to be created).
    pub fn level_of(&mut self, task: &Task) -> Result<u32> {
        if self.index.contains_key(task.id.as_str()) {
            if let Some(level) = self.visit(&task.id)? {
                return Ok(level);
            }
        }

        let mut deepest = Depth::default();
        for dep in task.blocked_by.iter() {
            match self.visit(dep)? {
                Some(level) => deepest.absorb(level),
                None => warn!(dep = %dep, "dependency missing from snapshot; ignored for level"),
            }
        }
        Ok(deepest.level())
    }

    /// Level of a snapshot member by id; `None` if the id is unknown.
    pub fn level_of_id(&mut self, id: &str) -> Result<Option<u32>> {
        self.visit(id)
    }

    /// Iterative depth-first walk from `root`. Tasks on the current path
    /// are grey; memoized tasks are black.
    fn visit(&mut self, root: &str) -> Result<Option<u32>> {
        if let Some(level) = self.memo.get(root) {
            return Ok(Some(*level));
        }
        let Some(root_task) = self.index.get(root).copied() else {
            return Ok(None);
        };

        let mut path: HashSet<&'a str> = HashSet::from([root_task.id.as_str()]);
        let mut stack: Vec<Frame<'a>> = vec![Frame::new(root_task)];

        while let Some(frame) = stack.last_mut() {
            let task = frame.task;

            if let Some(dep) = task.blocked_by.get(frame.next) {
                frame.next += 1;

                if let Some(level) = self.memo.get(dep.as_str()) {
                    frame.depth.absorb(*level);
                    continue;
                }
                let Some(dep_task) = self.index.get(dep.as_str()).copied() else {
                    warn!(dep = %dep, "dependency missing from snapshot; ignored for level");
                    continue;
                };
                if !path.insert(dep_task.id.as_str()) {
                    return Err(SquadronError::CyclicDependency(format!(
                        "task '{}' is reachable from its own blocked_by chain",
                        dep_task.id
                    )));
                }
                stack.push(Frame::new(dep_task));
                continue;
            }

            let level = frame.depth.level();
            stack.pop();
            path.remove(task.id.as_str());
            self.memo.insert(task.id.clone(), level);

            if let Some(parent) = stack.last_mut() {
                parent.depth.absorb(level);
            }
        }

        Ok(self.memo.get(root).copied())
    }
}

/// Deepest dependency level seen so far.
#[derive(Debug, Default, Clone, Copy)]
struct Depth(Option<u32>);

impl Depth {
    fn absorb(&mut self, level: u32) {
        self.0 = Some(self.0.map_or(level, |d| d.max(level)));
    }

    fn level(self) -> u32 {
        self.0.map_or(0, |d| d + 1)
    }
}

#[derive(Debug)]
struct Frame<'a> {
    task: &'a Task,
    next: usize,
    depth: Depth,
}

impl<'a> Frame<'a> {
    fn new(task: &'a Task) -> Self {
        Self {
            task,
            next: 0,
            depth: Depth::default(),
        }
    }
}

/// Level of a single task against `tasks`.
pub fn calculate_level(task: &Task, tasks: &[Task]) -> Result<u32> {
    LevelCalculator::new(tasks).level_of(task)
}

/// Levels of every task in the snapshot, sharing one memo.
pub fn calculate_levels(tasks: &[Task]) -> Result<HashMap<TaskId, u32>> {
    let mut calc = LevelCalculator::new(tasks);
    let mut levels = HashMap::with_capacity(tasks.len());

    for task in tasks {
        let level = calc.level_of(task)?;
        levels.insert(task.id.clone(), level);
    }

    Ok(levels)
}

/// Partition tasks into buckets by their stored `level`.
///
/// Buckets cover 0 through the highest observed level; a level with no
/// tasks yields an empty bucket. Input order is kept inside each bucket.
pub fn group_by_level<'t, I>(tasks: I) -> Vec<Vec<&'t Task>>
where
    I: IntoIterator<Item = &'t Task>,
{
    let mut buckets: Vec<Vec<&'t Task>> = Vec::new();

    for task in tasks {
        let idx = task.level as usize;
        if buckets.len() <= idx {
            buckets.resize_with(idx + 1, Vec::new);
        }
        buckets[idx].push(task);
    }

    buckets
}
