use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::config::AppConfig;

pub struct Logger {
    file: Mutex<File>,
    level: LevelFilter,
}

impl Logger {
    pub fn new(log_path: &Path, level: LevelFilter) -> Result<Self, std::io::Error> {
        if let Some(dir) = log_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Logger {
            file: Mutex::new(file),
            level,
        })
    }

    /// 配置了 LOG_FILE 时写文件，否则交给 env_logger 输出到 stderr
    pub fn init(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
        match &config.log_file {
            Some(path) => {
                let logger = Self::new(path, config.log_level)?;
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(config.log_level);
            }
            None => {
                env_logger::Builder::new()
                    .filter_level(config.log_level)
                    .try_init()?;
            }
        }
        Ok(())
    }

    fn format(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "[{}] [{}] [{}:{}] {}\n",
            timestamp,
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let entry = Self::format(record);
            if let Ok(mut file) = self.file.lock() {
                let _ = file.write_all(entry.as_bytes());
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}
