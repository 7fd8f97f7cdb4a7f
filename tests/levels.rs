// tests/levels.rs

use squadron::dag::{calculate_level, calculate_levels, group_by_level, LevelCalculator};
use squadron::errors::SquadronError;
use squadron_test_utils::builders::{task, TaskBuilder};

#[test]
fn test_task_without_dependencies_is_level_zero() {
    let tasks = vec![task("a", &[])];
    assert_eq!(calculate_level(&tasks[0], &tasks).unwrap(), 0);
}

#[test]
fn test_level_is_one_plus_deepest_dependency() {
    // a -> b -> d, c -> d
    let tasks = vec![
        task("a", &[]),
        task("b", &["a"]),
        task("c", &[]),
        task("d", &["b", "c"]),
    ];

    let levels = calculate_levels(&tasks).unwrap();
    assert_eq!(levels["a"], 0);
    assert_eq!(levels["b"], 1);
    assert_eq!(levels["c"], 0);
    assert_eq!(levels["d"], 2);
}

#[test]
fn test_missing_dependency_is_ignored_not_counted_as_zero() {
    let tasks = vec![task("a", &[]), task("b", &["a", "ghost"])];
    assert_eq!(calculate_level(&tasks[1], &tasks).unwrap(), 1);

    // Only unknown deps: nothing contributes to the max.
    let lonely = task("c", &["ghost"]);
    assert_eq!(calculate_level(&lonely, &tasks).unwrap(), 0);
}

#[test]
fn test_task_outside_snapshot_can_be_levelled() {
    let tasks = vec![task("a", &[]), task("b", &["a"])];
    let new_task = task("c", &["b"]);

    let mut calc = LevelCalculator::new(&tasks);
    assert_eq!(calc.level_of(&new_task).unwrap(), 2);
    assert_eq!(calc.level_of_id("c").unwrap(), None);
    assert_eq!(calc.level_of_id("b").unwrap(), Some(1));
}

#[test]
fn test_cycle_is_rejected_with_cyclic_dependency() {
    let tasks = vec![task("a", &["c"]), task("b", &["a"]), task("c", &["b"])];

    match calculate_levels(&tasks) {
        Err(SquadronError::CyclicDependency(msg)) => {
            assert!(msg.contains('a') || msg.contains('b') || msg.contains('c'));
        }
        other => panic!("expected CyclicDependency, got {other:?}"),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let tasks = vec![task("a", &["a"])];
    assert!(matches!(
        calculate_level(&tasks[0], &tasks),
        Err(SquadronError::CyclicDependency(_))
    ));
}

fn chain(len: usize) -> Vec<squadron::model::Task> {
    (0..len)
        .map(|i| {
            let id = format!("t{i}");
            match i {
                0 => task(&id, &[]),
                _ => {
                    let dep = format!("t{}", i - 1);
                    task(&id, &[dep.as_str()])
                }
            }
        })
        .collect()
}

#[test]
fn test_long_chain_levels_without_deep_recursion() {
    let tasks = chain(20_000);

    let last = tasks.last().unwrap();
    assert_eq!(calculate_level(last, &tasks).unwrap(), 19_999);

    let levels = calculate_levels(&tasks).unwrap();
    assert_eq!(levels["t10000"], 10_000);
}

#[test]
fn test_long_cycle_is_still_detected() {
    let mut tasks = chain(10_000);
    tasks[0].blocked_by.push("t9999".to_string());

    assert!(matches!(
        calculate_level(&tasks[5000], &tasks),
        Err(SquadronError::CyclicDependency(_))
    ));
}

#[test]
fn test_diamond_shares_memo_without_false_cycle() {
    //   a
    //  / \
    // b   c
    //  \ /
    //   d
    let tasks = vec![
        task("a", &[]),
        task("b", &["a"]),
        task("c", &["a"]),
        task("d", &["b", "c"]),
    ];
    let levels = calculate_levels(&tasks).unwrap();
    assert_eq!(levels["d"], 2);
}

#[test]
fn test_group_by_level_covers_gaps_and_keeps_order() {
    let tasks = vec![
        TaskBuilder::new("x").level(2).build(),
        TaskBuilder::new("y").level(0).build(),
        TaskBuilder::new("z").level(2).build(),
    ];

    let buckets = group_by_level(&tasks);
    assert_eq!(buckets.len(), 3);

    let ids: Vec<Vec<&str>> = buckets
        .iter()
        .map(|b| b.iter().map(|t| t.id.as_str()).collect())
        .collect();
    assert_eq!(ids, vec![vec!["y"], vec![], vec!["x", "z"]]);
}

#[test]
fn test_group_by_level_of_nothing_is_empty() {
    let tasks: Vec<squadron::model::Task> = Vec::new();
    assert!(group_by_level(&tasks).is_empty());
}
