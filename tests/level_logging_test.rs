//! rat_rotatelog 按级别输出日志测试

use rat_rotatelog::{Level, Logger, LoggerBuilder, SharedBuffer, WriterOutput};
use std::sync::Arc;

fn buffered_logger(level: Level) -> (Logger, SharedBuffer) {
    let buffer = SharedBuffer::new();
    let logger = LoggerBuilder::new()
        .with_level(level)
        .with_output(Arc::new(WriterOutput::new(buffer.clone())))
        .build()
        .unwrap();
    (logger, buffer)
}

fn log_every_level(logger: &Logger, message: &str) {
    rat_rotatelog::debug!(logger, "{}", message);
    rat_rotatelog::info!(logger, "{}", message);
    rat_rotatelog::notice!(logger, "{}", message);
    rat_rotatelog::warning!(logger, "{}", message);
    rat_rotatelog::error!(logger, "{}", message);
    rat_rotatelog::critical!(logger, "{}", message);
}

#[test]
fn test_warning_threshold_scenario() {
    let (logger, buffer) = buffered_logger(Level::Warning);

    rat_rotatelog::debug!(logger, "x");
    rat_rotatelog::info!(logger, "x");
    rat_rotatelog::warning!(logger, "y");

    assert_eq!(buffer.text(), "[Warning] y\n");
}

#[test]
fn test_each_threshold_emits_levels_at_or_above() {
    for threshold in Level::ALL {
        let (logger, buffer) = buffered_logger(threshold);
        log_every_level(&logger, "msg");

        let expected: String = Level::ALL
            .iter()
            .filter(|level| **level >= threshold)
            .map(|level| format!("{}msg\n", level.tag()))
            .collect();
        assert_eq!(buffer.text(), expected, "threshold {:?}", threshold);
    }
}

#[test]
fn test_generic_log_and_level_names() {
    let (logger, buffer) = buffered_logger(Level::from_name("notice"));

    rat_rotatelog::log!(logger, Level::Info, "below");
    rat_rotatelog::log!(logger, Level::from_name("no-such-level"), "unknown names map to {}", "error");
    logger.log(Level::Notice, format_args!("{}-{}", 1, 2));

    assert_eq!(buffer.text(), "[Error] unknown names map to error\n[Notice] 1-2\n");
}

#[test]
fn test_level_change_is_shared_between_clones() {
    let (logger, buffer) = buffered_logger(Level::Error);
    let clone = logger.clone();

    rat_rotatelog::info!(clone, "hidden");
    logger.set_level(Level::Debug);
    rat_rotatelog::info!(clone, "visible");

    assert_eq!(buffer.text(), "[Info] visible\n");
}
