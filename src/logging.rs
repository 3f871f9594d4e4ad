//! Logger setup.
//!
//! The terminal is in raw alternate-screen mode while the essay runs, so
//! logs only go to the file named by `PATHWAYS_LOG_FILE`. Without it no
//! logger is installed and the `log` macros stay no-ops. `RUST_LOG`
//! overrides the default `warn` filter.

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

use env_logger::{Builder, Env, Target};

pub const LOG_FILE_ENV: &str = "PATHWAYS_LOG_FILE";

pub fn init() {
    let Some(target) = log_target(std::env::var_os(LOG_FILE_ENV).as_deref()) else {
        return;
    };
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    builder.target(target);
    // A second init (tests) keeps the first logger.
    let _ = builder.try_init();
}

/// Where log output goes, if anywhere. Never stderr.
fn log_target(path: Option<&OsStr>) -> Option<Target> {
    let path = Path::new(path?);
    match File::create(path) {
        Ok(file) => Some(Target::Pipe(Box::new(file))),
        Err(e) => {
            // Still on the normal screen here.
            eprintln!("could not open log file {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_log_file_means_no_logger() {
        assert!(log_target(None).is_none());
    }

    #[test]
    fn unwritable_log_file_does_not_fall_back_to_stderr() {
        let path = std::env::temp_dir().join("pathways-missing-dir").join("x").join("log.txt");
        assert!(log_target(Some(path.as_os_str())).is_none());
    }

    #[test]
    fn log_file_target_is_a_pipe() {
        let path = std::env::temp_dir().join(format!("pathways-log-{}.txt", std::process::id()));
        let target = log_target(Some(path.as_os_str()));
        assert!(matches!(target, Some(Target::Pipe(_))));
        let _ = std::fs::remove_file(&path);
    }
}
