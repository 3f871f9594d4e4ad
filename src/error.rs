//! Error types.
//!
//! Navigation itself never fails (out-of-range moves clamp or no-op), so
//! the only fallible surfaces are content loading and the terminal.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("could not read content file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("content file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("content defines no pathways")]
    Empty,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),

    #[error(transparent)]
    Content(#[from] ContentError),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_errors_pass_through_unchanged() {
        fn load() -> Result<()> {
            Err(ContentError::Empty)?
        }
        let err = load().unwrap_err();
        assert!(matches!(err, AppError::Content(ContentError::Empty)));
        assert_eq!(err.to_string(), "content defines no pathways");
    }
}
