use std::path::PathBuf;

use hk_core::CoreError;
use thiserror::Error;

pub type BcResult<T> = Result<T, BcError>;

#[derive(Error, Debug)]
pub enum BcError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Time(#[from] CoreError),
}

impl BcError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
