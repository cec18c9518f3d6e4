use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use topo_domain::config::{LogRotation, LoggingConfig};
use topo_logger::{Logger, LoggerError};

#[test]
fn file_logging_creates_log_file_and_rejects_second_init() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");
    let config = LoggingConfig {
        console: false,
        directory: Some(log_dir.clone()),
        rotation: LogRotation::Never,
        ..LoggingConfig::default()
    };

    let logger = Logger::init("topo-file-logging", &config)?;
    assert!(logger.guard().is_some(), "file output keeps a worker guard");

    tracing::info!(operator = "admin", "hello from integration test");

    let second = Logger::init("topo-file-logging-again", &LoggingConfig::default());
    assert!(matches!(second, Err(LoggerError::Subscriber { .. })));

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let contents = fs::read_to_string(log_file)?;
    assert!(contents.contains("hello from integration test"));

    Ok(())
}
