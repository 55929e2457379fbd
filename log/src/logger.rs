use crate::{LogError, LogLevel, Logger, set_logger};
use dirs::data_dir;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Console logger that optionally mirrors every line into a session file.
pub struct SessionLogger {
    level: AtomicU8,
    log_file: Option<PathBuf>,
}

impl SessionLogger {
    pub fn new(level: LogLevel, log_file: Option<PathBuf>) -> Self {
        if let Some(file) = &log_file {
            if file.exists() {
                archive_previous(file);
            }
            if let Some(parent) = file.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                        eprintln!("Failed to create log directory: {e}");
                    });
                }
            }
        }

        // A log file that cannot be created degrades to console-only logging.
        let log_file = log_file.filter(|file| match std::fs::File::create(file) {
            Ok(_) => true,
            Err(e) => {
                eprintln!("Failed to create log file {}: {e}", file.display());
                false
            }
        });

        SessionLogger {
            level: AtomicU8::new(level.as_rank()),
            log_file,
        }
    }

    /// Installs a global logger writing to `<data_dir>/<app>/latest.log`
    /// when `to_file` is set.
    pub fn init(log_level: LogLevel, app: &str, to_file: bool) -> Result<(), LogError> {
        let log_file = if to_file {
            data_dir().map(|dir| dir.join(app).join("latest.log"))
        } else {
            None
        };

        set_logger(Arc::new(SessionLogger::new(log_level, log_file)))
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Renames the previous session log with its timestamp, packs it into a
/// `.7z` next to it and removes the plain copy.
fn archive_previous(file: &Path) {
    let mut renamed = file.to_path_buf();
    renamed.set_file_name(format!(
        "{}.log",
        chrono::Local::now().format("%d%m%Y_%H%M%S")
    ));

    if let Err(e) = std::fs::rename(file, &renamed) {
        eprintln!("Failed to rename existing log file: {e}");
        return;
    }

    let mut compressed = renamed.clone();
    compressed.set_extension("7z");

    match sevenz_rust2::compress_to_path(&renamed, &compressed) {
        Ok(()) => std::fs::remove_file(&renamed).unwrap_or_else(|e| {
            eprintln!("Failed to remove old log file: {e}");
        }),
        Err(e) => eprintln!("Failed to compress file: {e}"),
    }
}

fn log_to_file(log_file: &Path, message: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_file)?;
    writeln!(file, "{message}")?;
    Ok(())
}

impl Logger for SessionLogger {
    fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_rank(), Ordering::Relaxed);
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_rank(self.level.load(Ordering::Relaxed))
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.level().allows(level) {
            return;
        }

        let timestamp = chrono::Local::now().format("%d%m%Y %H:%M:%S");
        println!("{timestamp} - [{level}] - {message}");
        if let Some(ref file) = self.log_file {
            let write_msg = format!("{} - [{}] - {}", timestamp, level.raw_str(), message);
            log_to_file(file, &write_msg).unwrap_or_else(|e| {
                eprintln!("Failed to write to log file: {e}");
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_plain_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.log");
        let logger = SessionLogger::new(LogLevel::Info, Some(path.clone()));

        logger.debug("hidden");
        logger.warning("camera reopened");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[WARNING] - camera reopened"));
        assert!(!contents.contains("hidden"));
    }

    #[test]
    fn level_changes_at_runtime() {
        let logger = SessionLogger::new(LogLevel::Info, None);
        assert_eq!(logger.level(), LogLevel::Info);

        logger.set_level(LogLevel::Debug);
        assert_eq!(logger.level(), LogLevel::Debug);
    }

    #[test]
    fn archives_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("camswitch");
        let path = nested.join("latest.log");

        let first = SessionLogger::new(LogLevel::Info, Some(path.clone()));
        first.info("first session");
        drop(first);

        let second = SessionLogger::new(LogLevel::Info, Some(path.clone()));
        assert_eq!(second.log_file(), Some(path.as_path()));

        let archived = std::fs::read_dir(&nested)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().extension().is_some_and(|ext| ext == "7z"));
        assert!(archived);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
