use chrono::Local;
use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::Path,
};

/// Progress sink handed to every component of a workflow.
pub trait Logger: Send + Sync {
    fn log(&mut self, message: &str);
    fn debug_log(&mut self, message: &str);
}

const PREFIX: &str = "[snapshot-insight]";

/// Human-readable progress on stdout.
#[derive(Debug)]
pub struct ConsoleLogger {
    debug: bool,
}

impl ConsoleLogger {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl Logger for ConsoleLogger {
    fn log(&mut self, message: &str) {
        println!("{}", line(message, false));
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            println!("{}", line(message, true));
        }
    }
}

fn line(message: &str, debug: bool) -> String {
    let level = if debug { " [DEBUG]" } else { "" };
    format!(
        "{} {}{} {}",
        PREFIX,
        Local::now().format("%Y/%m/%d %H:%M:%S"),
        level,
        message
    )
}

/// Appends every line to a file, keeping the handle open for the whole run.
#[derive(Debug)]
pub struct FileLogger {
    file: File,
    debug: bool,
}

impl FileLogger {
    pub fn new(log_file: &Path, debug: bool) -> std::io::Result<Self> {
        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(log_file)?;
        Ok(FileLogger { file, debug })
    }

    fn append(&mut self, line: &str) {
        if let Err(e) = writeln!(self.file, "{}", line) {
            eprintln!("Failed to write to log file: {}", e);
        }
    }
}

impl Logger for FileLogger {
    fn log(&mut self, message: &str) {
        self.append(&line(message, false));
    }

    fn debug_log(&mut self, message: &str) {
        if self.debug {
            self.append(&line(message, true));
        }
    }
}

/// Fans each message out to every wrapped logger in order.
pub struct MultiLogger {
    loggers: Vec<Box<dyn Logger>>,
}

impl MultiLogger {
    pub fn new(loggers: Vec<Box<dyn Logger>>) -> Self {
        Self { loggers }
    }
}

impl Logger for MultiLogger {
    fn log(&mut self, message: &str) {
        self.loggers.iter_mut().for_each(|l| l.log(message));
    }

    fn debug_log(&mut self, message: &str) {
        self.loggers.iter_mut().for_each(|l| l.debug_log(message));
    }
}

#[cfg(test)]
pub struct MockLogger {
    pub logs: Vec<String>,
}

#[cfg(test)]
impl MockLogger {
    pub fn new() -> Self {
        Self { logs: Vec::new() }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.logs.iter().any(|line| line.contains(needle))
    }
}

#[cfg(test)]
impl Logger for MockLogger {
    fn log(&mut self, message: &str) {
        self.logs.push(message.to_string());
    }

    fn debug_log(&mut self, message: &str) {
        self.logs.push(format!("DEBUG: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_logger_appends_and_filters_debug() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("logs").join("run.log");

        let mut logger = FileLogger::new(&path, false)?;
        logger.log("first");
        logger.debug_log("hidden");
        logger.log("second");

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("first"));
        assert!(content.contains("second"));
        assert!(!content.contains("hidden"));
        assert_eq!(content.lines().count(), 2);
        Ok(())
    }

    #[test]
    fn multi_logger_fans_out() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let a = temp_dir.path().join("a.log");
        let b = temp_dir.path().join("b.log");

        let mut logger = MultiLogger::new(vec![
            Box::new(FileLogger::new(&a, true)?),
            Box::new(FileLogger::new(&b, true)?),
        ]);
        logger.debug_log("both");

        assert!(fs::read_to_string(&a)?.contains("[DEBUG] both"));
        assert!(fs::read_to_string(&b)?.contains("[DEBUG] both"));
        Ok(())
    }
}
