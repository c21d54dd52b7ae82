use super::*;

#[test]
fn test_global_level_filters_ring() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(8, LevelFilter::Info, LevelFilter::Off);
    emit(&logger, Level::Debug, "t", "hidden");
    emit(&logger, Level::Info, "t", "shown");
    assert_eq!(messages(&logger), ["shown"]);

    logger.set_level(LevelFilter::Debug);
    emit(&logger, Level::Debug, "t", "now shown");
    assert_eq!(logger.len(), 2);
}

#[test]
fn test_console_threshold() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(8, LevelFilter::Info, LevelFilter::Warn);
    let output = CaptureOutput::new();
    logger.set_output(output.clone());
    emit(&logger, Level::Info, "vfs", "quiet");
    emit(&logger, Level::Error, "vfs", "loud");
    assert_eq!(output.text(), "[     1] ERROR vfs: loud\n");
    assert_eq!(logger.len(), 2);
}

#[test]
fn test_console_only_record_skips_ring() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(8, LevelFilter::Off, LevelFilter::Error);
    let output = CaptureOutput::new();
    logger.set_output(output.clone());
    emit(&logger, Level::Error, "t", "boom");
    assert!(logger.is_empty());
    assert!(output.text().ends_with("boom\n"));
}

#[test]
fn test_parse_level() {
    assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
    assert_eq!(parse_level("WARN"), Some(LevelFilter::Warn));
    assert_eq!(parse_level("off"), Some(LevelFilter::Off));
    assert_eq!(parse_level("loud"), None);
}
