// src/dag/structure.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;

use crate::dag::levels::group_by_level;
use crate::errors::{Result, SquadronError};
use crate::model::{Task, TaskId};
use crate::types::{AgentRole, TaskStatus};

/// One task as seen in the DAG projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagNode {
    pub id: TaskId,
    pub subject: String,
    pub role: AgentRole,
    pub status: TaskStatus,
    pub level: u32,
}

/// Edge direction is dependency -> dependent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DagEdge {
    pub from: TaskId,
    pub to: TaskId,
}

/// Read-only projection of the task graph.
#[derive(Debug, Clone, Serialize)]
pub struct DagStructure {
    pub nodes: Vec<DagNode>,
    /// Only edges whose endpoints both exist in the snapshot.
    pub edges: Vec<DagEdge>,
    /// Task ids bucketed by stored level.
    pub levels: Vec<Vec<TaskId>>,
    /// A topological order of all nodes.
    pub order: Vec<TaskId>,
}

impl DagStructure {
    /// Build the projection; fails with `CyclicDependency` on a cyclic graph.
    pub fn build(tasks: &[Task]) -> Result<Self> {
        let graph = dependency_graph(tasks);
        let order = topological_order(&graph)?;

        let nodes = tasks
            .iter()
            .map(|t| DagNode {
                id: t.id.clone(),
                subject: t.subject.clone(),
                role: t.role,
                status: t.status,
                level: t.level,
            })
            .collect();

        let edges = graph
            .all_edges()
            .map(|(from, to, _)| DagEdge {
                from: from.to_string(),
                to: to.to_string(),
            })
            .collect();

        let levels = group_by_level(tasks)
            .into_iter()
            .map(|bucket| bucket.into_iter().map(|t| t.id.clone()).collect())
            .collect();

        Ok(Self {
            nodes,
            edges,
            levels,
            order,
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = &DagNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.to.as_str()).collect();
        self.nodes
            .iter()
            .filter(move |n| !targets.contains(n.id.as_str()))
    }
}

/// Fail with `CyclicDependency` if the `blocked_by` graph has a cycle.
pub fn validate_acyclic(tasks: &[Task]) -> Result<()> {
    let graph = dependency_graph(tasks);
    topological_order(&graph).map(|_| ())
}

// Edge direction: dep -> task. For `B.blocked_by = [A]` we add A -> B.
fn dependency_graph(tasks: &[Task]) -> DiGraphMap<&str, ()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in tasks {
        graph.add_node(task.id.as_str());
    }

    for task in tasks {
        for dep in task.blocked_by.iter() {
            if graph.contains_node(dep.as_str()) {
                graph.add_edge(dep.as_str(), task.id.as_str(), ());
            }
        }
    }

    graph
}

fn topological_order(graph: &DiGraphMap<&str, ()>) -> Result<Vec<TaskId>> {
    match toposort(graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(SquadronError::CyclicDependency(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
