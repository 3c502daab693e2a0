//! Rotating file log sink actor (§4.6).
//!
//! Entirely original to this design — the teacher's own file logger
//! (`airssys-osl/src/middleware/logger/loggers/file.rs`) was a `// TODO:
//! Implement in Phase 4` stub, so this module is grounded directly on the
//! design spec's rotation algorithm rather than on teacher source, using
//! `chrono` for timestamp formatting the way the rest of the teacher's
//! codebase does.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::actor::behavior::ActorBehavior;
use crate::actor::context::ActorContext;
use crate::error::{ActorError, ActorResult};

/// Configuration for a [`LogSinkActor`]. Empty `dir_path` and
/// `file_prefix` means "write formatted lines to standard output" instead of
/// a file.
#[derive(Debug, Clone)]
pub struct LogSinkConfig {
    pub dir_path: String,
    pub file_prefix: String,
    pub max_line: u32,
    pub max_files: u32,
}

impl Default for LogSinkConfig {
    fn default() -> Self {
        LogSinkConfig {
            dir_path: String::new(),
            file_prefix: String::new(),
            max_line: 1000,
            max_files: 10,
        }
    }
}

impl LogSinkConfig {
    fn is_stdout_mode(&self) -> bool {
        self.dir_path.is_empty() && self.file_prefix.is_empty()
    }
}

/// One line to be written to the sink.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub text: String,
    /// Reserved for severity/formatting flags; `option != 0` forces an
    /// immediate flush of the current file after this line is written.
    pub option: i32,
    pub timestamp: DateTime<Utc>,
    pub thread_id: String,
}

impl LogMsg {
    /// Construct a message stamped with the current time and thread.
    pub fn now(text: impl Into<String>) -> Self {
        LogMsg {
            text: text.into(),
            option: 0,
            timestamp: Utc::now(),
            thread_id: format!("{:?}", std::thread::current().id()),
        }
    }
}

/// Serialises [`LogMsg`] lines to rotating files (or standard output).
pub struct LogSinkActor {
    config: LogSinkConfig,
    current_file: Option<File>,
    line_count: u32,
}

impl LogSinkActor {
    pub fn new(config: LogSinkConfig) -> Self {
        LogSinkActor {
            config,
            current_file: None,
            line_count: 0,
        }
    }

    fn file_name_for(&self, ts: DateTime<Utc>) -> String {
        format!(
            "{}{}.log",
            self.config.file_prefix,
            ts.format("%y%m%d_%H%M%S")
        )
    }

    /// True iff `name` matches `<prefix>YYMMDD_hhmmss.log`.
    fn matches_rotation_pattern(&self, name: &str) -> bool {
        let prefix = &self.config.file_prefix;
        let Some(rest) = name.strip_prefix(prefix.as_str()) else {
            return false;
        };
        let Some(stamp) = rest.strip_suffix(".log") else {
            return false;
        };
        // YYMMDD_hhmmss: 6 digits, underscore, 6 digits.
        stamp.len() == 13
            && stamp.as_bytes()[6] == b'_'
            && stamp[..6].bytes().all(|b| b.is_ascii_digit())
            && stamp[7..].bytes().all(|b| b.is_ascii_digit())
    }

    fn sweep_retention(&self, ctx: &ActorContext) {
        let dir = PathBuf::from(&self.config.dir_path);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return;
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| self.matches_rotation_pattern(n))
            .collect();
        names.sort();
        // `sweep_retention` runs before the new file for this rotation is
        // created, so the budget reserves one slot for it: keeping
        // `max_files - 1` existing files plus the new one equals
        // `max_files` total once the caller finishes opening it.
        let keep = self.config.max_files.max(1).saturating_sub(1) as usize;
        if names.len() <= keep {
            return;
        }
        let to_delete = names.len() - keep;
        for name in &names[..to_delete] {
            tracing::warn!(actor = ctx.number(), file = %name, "log rotation deleting oldest file");
            let _ = std::fs::remove_file(dir.join(name));
        }
    }

    fn open_new_file(&mut self, ctx: &ActorContext) -> ActorResult<()> {
        self.sweep_retention(ctx);
        let name = self.file_name_for(Utc::now());
        let path = PathBuf::from(&self.config.dir_path).join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(ActorError::System)?;
        self.current_file = Some(file);
        self.line_count = 0;
        Ok(())
    }

    fn write_line(&mut self, ctx: &ActorContext, msg: &LogMsg) {
        let formatted = format!(
            "{} {:06} {}\n",
            msg.timestamp.format("%Y.%m.%d %H:%M:%S"),
            msg.timestamp.timestamp_subsec_micros(),
            msg.text,
        );

        if self.config.is_stdout_mode() {
            print!("{formatted}");
            return;
        }

        if self.current_file.is_none() || self.line_count >= self.config.max_line {
            if let Err(e) = self.open_new_file(ctx) {
                tracing::error!(actor = ctx.number(), error = %e, "failed to open log file");
                print!("{formatted}");
                return;
            }
        }

        if let Some(file) = self.current_file.as_mut() {
            if let Err(e) = file.write_all(formatted.as_bytes()) {
                tracing::error!(actor = ctx.number(), error = %e, "failed to write log line");
                return;
            }
            self.line_count += 1;
            if msg.option != 0 {
                let _ = file.flush();
            }
        }
    }
}

impl ActorBehavior for LogSinkActor {
    type Message = LogMsg;

    fn on_msg(&mut self, ctx: &ActorContext, msg: LogMsg) {
        self.write_line(ctx, &msg);
    }

    fn on_thread_terminate(&mut self, _ctx: &ActorContext) {
        if let Some(file) = self.current_file.as_mut() {
            let _ = file.flush();
        }
    }
}
