//! Chunked array containers with attached attribute dictionaries.
//!
//! A [`Container`] is a carray or a ctable that lives either in memory or
//! under a root directory. Every container carries an
//! [`AttributeStore`](carray_attrs::AttributeStore), reachable through
//! [`Container::attrs`] and [`Container::attrs_mut`], which is persisted next
//! to the container's data when it has a root directory.
//!
//! ```no_run
//! use carray::{Container, ContainerKind};
//!
//! let mut cn = Container::create(ContainerKind::CArray, "/tmp/temps.carray")?;
//! cn.attrs_mut().set("units", "K")?;
//! drop(cn);
//!
//! let cn = Container::open("/tmp/temps.carray")?;
//! assert_eq!(cn.attrs().get("units")?, "K");
//! # Ok::<(), carray::ContainerError>(())
//! ```

pub mod container;
pub mod descriptor;
pub mod error;

pub use container::{Container, ContainerOptions};
pub use descriptor::ContainerKind;
pub use error::{ContainerError, ContainerResult};

// Re-export the attribute types callers need alongside a container.
pub use carray_attrs::{
    AccessMode, AttrError, AttrMap, AttributeStore, AttributeValue, PersistConfig, SyncMode,
};
