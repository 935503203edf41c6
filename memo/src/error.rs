use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("not a usable store directory: {0}")]
    Path(PathBuf),
}
