//! Run log: colored console output mirrored into timestamped setup and error
//! log files. Every line passes through the run's [`Redactor`].

use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use chrono::Local;
use owo_colors::OwoColorize;

use crate::utils::Redactor;

#[derive(Debug)]
pub struct RunLog {
    setup_path: PathBuf,
    error_path: PathBuf,
    setup: Mutex<File>,
    errors: Mutex<File>,
    redactor: Redactor,
}

impl RunLog {
    /// Open `setup_<ts>.log` and `errors_<ts>.log` under `dir`, creating it.
    pub fn create(dir: &Path, redactor: Redactor) -> Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::create_with_stamp(dir, &stamp, redactor)
    }

    pub fn create_with_stamp(dir: &Path, stamp: &str, redactor: Redactor) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating log directory {}", dir.display()))?;
        let setup_path = dir.join(format!("setup_{stamp}.log"));
        let error_path = dir.join(format!("errors_{stamp}.log"));
        let setup = open_append(&setup_path)?;
        let errors = open_append(&error_path)?;
        Ok(Self {
            setup_path,
            error_path,
            setup: Mutex::new(setup),
            errors: Mutex::new(errors),
            redactor,
        })
    }

    pub fn setup_path(&self) -> &Path {
        &self.setup_path
    }

    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        let msg = self.redactor.apply(msg.as_ref());
        println!("{}", msg);
        self.write_setup("INFO", &msg);
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        let msg = self.redactor.apply(msg.as_ref());
        println!("{} {}", "✓".green(), msg.green());
        self.write_setup("OK", &msg);
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        let msg = self.redactor.apply(msg.as_ref());
        println!("{} {}", "!".yellow().bold(), msg.yellow());
        self.write_setup("WARN", &msg);
        self.write_errors("WARN", &msg);
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        let msg = self.redactor.apply(msg.as_ref());
        eprintln!("{} {}", "✗".red().bold(), msg.red());
        self.write_setup("ERROR", &msg);
        self.write_errors("ERROR", &msg);
    }

    pub fn section(&self, title: &str) {
        println!("\n{}", title.bold().underline());
        self.write_setup("INFO", &format!("==== {} ====", title));
    }

    pub fn step(&self, ordinal: usize, total: usize, name: &str) {
        let header = format!("[{}/{}]", ordinal, total);
        println!("\n{} {}", header.cyan().bold(), name.bold());
        self.write_setup("STEP", &format!("{} {}", header, name));
    }

    /// Command output: setup log only.
    pub fn output(&self, line: &str) {
        let line = self.redactor.apply(line);
        self.write_raw(&self.setup, &format!("    | {}", line));
    }

    /// A failed command's context and trailing output, for the error log.
    pub fn error_block(&self, header: &str, lines: &[String]) {
        let header = self.redactor.apply(header);
        self.write_errors("FAIL", &header);
        for l in lines {
            self.write_raw(&self.errors, &format!("    | {}", self.redactor.apply(l)));
        }
    }

    /// Diagnostic record from the `log` facade: files only.
    pub fn record(&self, level: log::Level, target: &str, msg: &str) {
        let msg = self.redactor.apply(msg);
        let line = format!("{target}: {msg}");
        let tag = level.as_str();
        self.write_setup(tag, &line);
        if level <= log::Level::Warn {
            self.write_errors(tag, &line);
        }
    }

    fn write_setup(&self, level: &str, msg: &str) {
        self.write_raw(&self.setup, &stamped(level, msg));
    }

    fn write_errors(&self, level: &str, msg: &str) {
        self.write_raw(&self.errors, &stamped(level, msg));
    }

    fn write_raw(&self, file: &Mutex<File>, line: &str) {
        if let Ok(mut f) = file.lock() {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn stamped(level: &str, msg: &str) -> String {
    format!("[{}] [{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), level, msg)
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

/// Routes `log` records into a shared [`RunLog`].
struct LogBridge {
    run_log: Arc<RunLog>,
    level: log::LevelFilter,
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level && metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.run_log
                .record(record.level(), record.target(), &record.args().to_string());
        }
    }

    fn flush(&self) {
        for f in [&self.run_log.setup, &self.run_log.errors] {
            if let Ok(mut f) = f.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// Install `run_log` as the process-wide `log` backend.
pub fn install(run_log: Arc<RunLog>, level: log::LevelFilter) -> Result<()> {
    log::set_boxed_logger(Box::new(LogBridge { run_log, level }))
        .map_err(|e| anyhow::anyhow!("logger already installed: {}", e))?;
    log::set_max_level(level);
    Ok(())
}
