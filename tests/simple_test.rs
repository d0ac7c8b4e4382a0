//! 简单的文件日志测试

use rat_rotatelog::{Level, LoggerBuilder, RotateOutcome, RotationConfig};
use std::fs;
use std::time::Duration;

#[test]
fn test_basic_file_logging() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logs/app.log");

    let logger = LoggerBuilder::new()
        .with_level(Level::Info)
        .with_prefix("app ")
        .with_rotation(&path, RotationConfig::new(Duration::from_secs(3600), 3, true))
        .build()
        .unwrap();

    rat_rotatelog::info!(logger, "started pid={}", 42);
    rat_rotatelog::debug!(logger, "not written");
    logger.print(format_args!("{} {}", "hello", "log"));
    logger.flush();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "app [Info] started pid=42\napp [Info] hello log\n"
    );

    // 同一周期内手动轮转是空操作
    assert_eq!(logger.rotate().unwrap(), RotateOutcome::Unchanged);
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn test_existing_file_is_appended() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");
    fs::write(&path, "[Info] from last run\n").unwrap();

    let logger = LoggerBuilder::new()
        .with_rotation(&path, RotationConfig::new(Duration::from_secs(60), 1, false))
        .build()
        .unwrap();
    rat_rotatelog::warning!(logger, "resumed");

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[Info] from last run\n[Warning] resumed\n"
    );
}

#[test]
fn test_shutdown_releases_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    let logger = LoggerBuilder::new()
        .with_rotation(&path, RotationConfig::new(Duration::from_secs(60), 1, false))
        .build()
        .unwrap();
    logger.start_rotate().unwrap();
    rat_rotatelog::info!(logger, "before shutdown");

    logger.shutdown();
    logger.shutdown();
    assert!(logger.try_log(Level::Critical, format_args!("after shutdown")).is_err());
    assert_eq!(fs::read_to_string(&path).unwrap(), "[Info] before shutdown\n");
}
