//! The `meta/container.json` file that marks a directory as a container.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

pub const META_DIR: &str = "meta";
pub const DESCRIPTOR_FILE: &str = "container.json";
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Flavour of container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// A single chunked, compressed array.
    CArray,
    /// A table of named carray columns.
    CTable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub version: u32,
    pub kind: ContainerKind,
}

impl Descriptor {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            version: DESCRIPTOR_VERSION,
            kind,
        }
    }

    pub fn path(rootdir: &Path) -> PathBuf {
        rootdir.join(META_DIR).join(DESCRIPTOR_FILE)
    }

    pub fn exists(rootdir: &Path) -> bool {
        Self::path(rootdir).is_file()
    }

    /// Create `meta/` and write the descriptor.
    pub fn write(&self, rootdir: &Path) -> ContainerResult<()> {
        let path = Self::path(rootdir);
        fs::create_dir_all(rootdir.join(META_DIR))?;
        let json = serde_json::to_vec(self).map_err(io::Error::from)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read(rootdir: &Path) -> ContainerResult<Self> {
        let path = Self::path(rootdir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ContainerError::NotAContainer(rootdir.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let descriptor: Descriptor =
            serde_json::from_slice(&bytes).map_err(|e| ContainerError::CorruptDescriptor {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if descriptor.version != DESCRIPTOR_VERSION {
            return Err(ContainerError::CorruptDescriptor {
                path,
                reason: format!("unsupported version {}", descriptor.version),
            });
        }
        Ok(descriptor)
    }
}
