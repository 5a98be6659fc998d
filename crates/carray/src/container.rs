use std::fs;
use std::path::{Path, PathBuf};

use carray_attrs::{AccessMode, AttributeStore, PersistConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::descriptor::{ContainerKind, Descriptor};
use crate::error::{ContainerError, ContainerResult};

/// Options for creating or opening a disk-backed container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContainerOptions {
    /// Access mode of the attribute store. Only honoured by `open`.
    pub mode: AccessMode,
    /// On `create`, wipe an existing container at the same root directory.
    pub overwrite: bool,
    /// Metadata persistence settings.
    pub persist: PersistConfig,
}

impl ContainerOptions {
    pub fn read_only() -> Self {
        Self {
            mode: AccessMode::ReadOnly,
            ..Default::default()
        }
    }
}

/// A carray or ctable, either purely in memory or bound to a root directory.
///
/// Only the parts needed to carry attributes live here: the flavour, the
/// optional root directory and the attribute store, which is built exactly
/// once per instance and lives as long as the container does.
#[derive(Debug)]
pub struct Container {
    kind: ContainerKind,
    rootdir: Option<PathBuf>,
    attrs: AttributeStore,
}

impl Container {
    /// In-memory container.
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            rootdir: None,
            attrs: AttributeStore::in_memory(),
        }
    }

    /// Create a disk-backed container at `rootdir` with default options.
    pub fn create(kind: ContainerKind, rootdir: impl AsRef<Path>) -> ContainerResult<Self> {
        Self::create_with(kind, rootdir, ContainerOptions::default())
    }

    pub fn create_with(
        kind: ContainerKind,
        rootdir: impl AsRef<Path>,
        options: ContainerOptions,
    ) -> ContainerResult<Self> {
        let rootdir = rootdir.as_ref();
        if Descriptor::exists(rootdir) {
            if !options.overwrite {
                return Err(ContainerError::AlreadyExists(rootdir.to_path_buf()));
            }
            warn!(rootdir = %rootdir.display(), "overwriting existing container");
            fs::remove_dir_all(rootdir)?;
        }

        fs::create_dir_all(rootdir)?;
        Descriptor::new(kind).write(rootdir)?;
        debug!(rootdir = %rootdir.display(), ?kind, "container created");

        Ok(Self {
            kind,
            rootdir: Some(rootdir.to_path_buf()),
            attrs: AttributeStore::create(rootdir, options.persist),
        })
    }

    /// Re-open an existing container, loading its attributes from disk.
    pub fn open(rootdir: impl AsRef<Path>) -> ContainerResult<Self> {
        Self::open_with(rootdir, ContainerOptions::default())
    }

    pub fn open_with(rootdir: impl AsRef<Path>, options: ContainerOptions) -> ContainerResult<Self> {
        let rootdir = rootdir.as_ref();
        let descriptor = Descriptor::read(rootdir)?;
        let attrs = AttributeStore::open(rootdir, options.mode, options.persist)?;
        debug!(
            rootdir = %rootdir.display(),
            kind = ?descriptor.kind,
            attrs = attrs.len(),
            "container opened"
        );

        Ok(Self {
            kind: descriptor.kind,
            rootdir: Some(rootdir.to_path_buf()),
            attrs,
        })
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Root directory, `None` for in-memory containers.
    pub fn rootdir(&self) -> Option<&Path> {
        self.rootdir.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.attrs.mode()
    }

    pub fn attrs(&self) -> &AttributeStore {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttributeStore {
        &mut self.attrs
    }
}
