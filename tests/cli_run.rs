// tests/cli_run.rs

use std::io::Write;

use clap::Parser;
use squadron::cli::CliArgs;
use squadron::run;
use squadron_test_utils::{init_tracing, with_timeout, TestResult};
use tempfile::NamedTempFile;

const MEMORY_CONFIG: &str = r#"
[storage]
mode = "memory"

[template.feature]
name = "Feature: {feature}"

[[template.feature.level]]
[[template.feature.level.task]]
role = "backend"
subject = "Build {feature}"
"#;

fn memory_config() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{MEMORY_CONFIG}").unwrap();
    file
}

fn args(config: &NamedTempFile, rest: &[&str]) -> CliArgs {
    let config = config.path().to_str().unwrap();
    let mut argv = vec!["squadron", "--config", config];
    argv.extend_from_slice(rest);
    CliArgs::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn test_run_creates_and_starts_squad() -> TestResult {
    init_tracing();
    let config = memory_config();

    with_timeout(run(args(
        &config,
        &["squad", "create", "feature", "--var", "feature=search", "--start"],
    )))
    .await?;
    with_timeout(run(args(&config, &["dag"]))).await?;
    with_timeout(run(args(&config, &["plan", "feature", "--var", "feature=x"]))).await?;
    Ok(())
}

#[tokio::test]
async fn test_run_reports_unknown_ids_and_templates() {
    let config = memory_config();

    let err = with_timeout(run(args(&config, &["task", "start", "nope"])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("task 'nope'"));

    assert!(with_timeout(run(args(&config, &["squad", "create", "missing"])))
        .await
        .is_err());
}
