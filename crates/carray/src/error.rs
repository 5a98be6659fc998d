use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("not a container: {}", .0.display())]
    NotAContainer(PathBuf),

    #[error("container already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("corrupt container descriptor at {}: {reason}", path.display())]
    CorruptDescriptor { path: PathBuf, reason: String },

    #[error("attribute error: {0}")]
    Attrs(#[from] carray_attrs::AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ContainerResult<T> = Result<T, ContainerError>;
