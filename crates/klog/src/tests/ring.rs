use super::*;

#[test]
fn test_fifo_order() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(8, LevelFilter::Debug, LevelFilter::Off);
    for i in 0..5 {
        emit(&logger, Level::Debug, "t", &alloc::format!("message {}", i));
    }
    assert_eq!(logger.len(), 5);
    let lines = logger.lines();
    assert_eq!(lines[0].message, "message 0");
    assert_eq!(lines[4].message, "message 4");
    assert_eq!(lines[4].seq, 4);
}

#[test]
fn test_overflow_drops_oldest() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(3, LevelFilter::Info, LevelFilter::Off);
    for i in 0..5 {
        emit(&logger, Level::Info, "t", &alloc::format!("{}", i));
    }
    assert_eq!(messages(&logger), ["2", "3", "4"]);
    assert_eq!(logger.dropped(), 2);
    assert_eq!(logger.lines()[0].seq, 2);
}

#[test]
fn test_render_format() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(4, LevelFilter::Info, LevelFilter::Off);
    emit(&logger, Level::Warn, "fat32", "disk full");
    assert_eq!(logger.render(), "[     0] WARN  fat32: disk full\n");
    logger.clear();
    assert!(logger.is_empty());
}

#[test]
fn test_long_message_truncated() {
    test_support::init_arch_ops();
    let logger = KernelLogger::new(4, LevelFilter::Info, LevelFilter::Off);
    let long = "é".repeat(MAX_LOG_MESSAGE_LENGTH);
    emit(&logger, Level::Info, "t", &long);
    let stored = &logger.lines()[0].message;
    assert!(stored.len() <= MAX_LOG_MESSAGE_LENGTH);
    assert!(stored.chars().all(|c| c == 'é'));
}
