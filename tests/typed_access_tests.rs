//! End-to-end typed access over a realistic job configuration.

use anyhow::Result;
use norns_config::{ConfigDuration, ConfigError, JobContextLoader, NornsConfig};
use std::collections::BTreeMap;
use tempfile::TempDir;

const JOB_CONF: &str = r#"
job {
    name = wordcount
    mode = batch
    # resolved against the merged tree
    id = ${job.name}-01
}

checkpoint {
    interval = 60s
    retention = infinite
}

prototypes.task {
    timeout = 30s
    retries = 3
}

tasks = [
    { name = split }
    { name = count, timeout = 10s }
    { name = sink, retries = 0 }
]
"#;

fn load_fixture() -> Result<NornsConfig> {
    let temp = TempDir::new()?;
    std::fs::write(temp.path().join("norns-job.conf"), JOB_CONF)?;
    let config = JobContextLoader::new()
        .with_base_dir(temp.path())
        .with_env_snapshot(BTreeMap::new())
        .load()?;
    Ok(config)
}

#[test]
fn substitution_and_scalars() -> Result<()> {
    let config = load_fixture()?;
    assert_eq!(config.get::<String>("job.id")?, "wordcount-01");
    assert_eq!(config.get::<String>("job.name")?, "wordcount");
    Ok(())
}

#[test]
fn duration_literals_and_infinite() -> Result<()> {
    let config = load_fixture()?;
    let interval = config.get::<ConfigDuration>("checkpoint.interval")?;
    assert_eq!(interval.as_millis(), Some(60_000));

    let retention = config.get::<ConfigDuration>("checkpoint.retention")?;
    assert!(retention.is_infinite());
    assert!(retention > interval);
    Ok(())
}

#[test]
fn validated_reads() -> Result<()> {
    let config = load_fixture()?;
    let mode =
        config.get_and_validate::<String>("job.mode", &["batch".into(), "stream".into()])?;
    assert_eq!(mode, "batch");

    let err = config
        .get_and_validate::<String>("job.mode", &["stream".into()])
        .unwrap_err();
    assert!(matches!(err, ConfigError::Validation { .. }));
    Ok(())
}

#[test]
fn prototyped_tasks_share_defaults() -> Result<()> {
    let config = load_fixture()?;
    let tasks = config.get_prototyped_seq("tasks", "prototypes.task")?;
    assert_eq!(tasks.len(), 3);

    // "split" inherits everything
    assert_eq!(
        tasks[0].get::<ConfigDuration>("timeout")?,
        ConfigDuration::from_secs(30)
    );
    assert_eq!(tasks[0].get::<i64>("retries")?, 3);

    // "count" overrides the timeout, inherits retries
    assert_eq!(
        tasks[1].get::<ConfigDuration>("timeout")?,
        ConfigDuration::from_secs(10)
    );
    assert_eq!(tasks[1].get::<i64>("retries")?, 3);

    // "sink" overrides retries, inherits the timeout
    assert_eq!(tasks[2].get::<i64>("retries")?, 0);
    assert_eq!(
        tasks[2].get::<ConfigDuration>("timeout")?,
        ConfigDuration::from_secs(30)
    );
    Ok(())
}

#[test]
fn nested_sub_config() -> Result<()> {
    let config = load_fixture()?;
    let checkpoint = config.get::<NornsConfig>("checkpoint")?;
    assert_eq!(
        checkpoint.get::<ConfigDuration>("interval")?,
        ConfigDuration::from_secs(60)
    );
    Ok(())
}

#[test]
fn key_enumeration() -> Result<()> {
    let config = load_fixture()?;
    let keys = config.keys();
    assert!(keys.contains("job.name"));
    assert!(keys.contains("checkpoint.interval"));
    assert!(keys.contains("tasks"));

    let sub: Vec<_> = config.sub_keys().into_iter().collect();
    assert_eq!(sub, vec!["checkpoint", "job", "prototypes", "tasks"]);
    Ok(())
}
