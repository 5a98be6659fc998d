//! Attribute dictionaries for carray/ctable containers.
//!
//! Every container owns a small key/value dictionary of user attributes
//! (units, provenance notes, free-form tags) that lives independently of the
//! container's bulk array data. In memory the dictionary is a plain ordered
//! map; for disk-backed containers it is mirrored into a JSON file under the
//! container's root directory and rewritten in full on every change.
//!
//! # Key Types
//!
//! - [`AttributeValue`] -- closed, JSON-representable attribute value
//! - [`AttrMap`] -- insertion-ordered mapping of attribute names to values
//! - [`AttributeStore`] -- the authoritative per-container dictionary
//! - [`MetadataPersister`] -- load/save contract for the durable form
//! - [`JsonFilePersister`] -- `<rootdir>/__attrs__` backend
//! - [`PersistConfig`] -- fsync and formatting knobs for the persister
//!
//! # Design Rules
//!
//! 1. Read nothing, write everything: each mutation serializes the whole map.
//! 2. The file is replaced atomically (temp file + rename), never patched.
//! 3. A mutation that fails to persist leaves memory and disk unchanged.
//! 4. The file is only created by the first mutation; a missing file loads
//!    as an empty dictionary.

pub mod config;
pub mod error;
pub mod map;
pub mod persist;
pub mod store;
pub mod value;

pub use config::{PersistConfig, SyncMode};
pub use error::{AttrError, AttrResult};
pub use map::AttrMap;
pub use persist::{JsonFilePersister, MetadataPersister, ATTRS_FILE, METADATA_VERSION};
pub use store::{AccessMode, AttributeStore, Attrs};
pub use value::{AttributeValue, MAX_NESTING_DEPTH};
