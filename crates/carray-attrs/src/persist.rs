//! Durable form of an attribute dictionary.
//!
//! ## Layout
//!
//! ```text
//! <rootdir>/
//!     meta/           container descriptor (owned by the container)
//!     __attrs__       {"version": 1, "attrs": {"name": value, ...}}
//! ```
//!
//! The file is rewritten in full on every save. Writes go to `__attrs__.tmp`
//! in the same directory, which is then renamed over `__attrs__`, so a reader
//! in another process sees either the old document or the new one.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{PersistConfig, SyncMode};
use crate::error::{AttrError, AttrResult};
use crate::map::AttrMap;

/// File name of the attribute metadata inside a container's root directory.
pub const ATTRS_FILE: &str = "__attrs__";

/// Schema version written into every metadata document.
pub const METADATA_VERSION: u32 = 1;

/// Load/save contract for an attribute dictionary's durable form.
///
/// Implementations must satisfy these invariants:
/// - `load` of a location that was never saved to returns an empty map.
/// - `save` replaces the previous contents atomically; a failed save leaves
///   them untouched.
/// - Both operations are synchronous and run to completion.
pub trait MetadataPersister: fmt::Debug + Send + Sync {
    /// Read the full mapping.
    fn load(&self) -> AttrResult<AttrMap>;

    /// Write the full mapping, replacing whatever was stored before.
    fn save(&self, attrs: &AttrMap) -> AttrResult<()>;
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    version: u32,
    attrs: &'a AttrMap,
}

// `version` is checked separately through `VersionHeader`.
#[derive(Deserialize)]
struct Document {
    attrs: AttrMap,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// JSON file persister bound to `<rootdir>/__attrs__`.
#[derive(Clone, Debug)]
pub struct JsonFilePersister {
    path: PathBuf,
    config: PersistConfig,
}

impl JsonFilePersister {
    pub fn new(rootdir: &Path, config: PersistConfig) -> Self {
        Self {
            path: rootdir.join(ATTRS_FILE),
            config,
        }
    }

    /// Location of the metadata file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    fn corrupt(&self, reason: impl fmt::Display) -> AttrError {
        AttrError::CorruptMetadata {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn decode(&self, bytes: &[u8]) -> AttrResult<AttrMap> {
        let header: VersionHeader = serde_json::from_slice(bytes).map_err(|e| self.corrupt(e))?;
        if header.version != METADATA_VERSION {
            return Err(AttrError::UnsupportedVersion {
                path: self.path.clone(),
                version: header.version,
            });
        }
        let doc: Document = serde_json::from_slice(bytes).map_err(|e| self.corrupt(e))?;
        Ok(doc.attrs)
    }

    /// Sibling of the metadata file that each save is staged in.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    // Created like any other file, so it gets the process umask.
    fn write_temp(&self, tmp_path: &Path, doc: &DocumentRef<'_>) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)?;
        let mut writer = BufWriter::new(file);
        if self.config.pretty {
            serde_json::to_writer_pretty(&mut writer, doc)?;
        } else {
            serde_json::to_writer(&mut writer, doc)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        if matches!(self.config.sync_mode, SyncMode::EveryWrite) {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl MetadataPersister for JsonFilePersister {
    fn load(&self) -> AttrResult<AttrMap> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no attribute metadata; starting empty");
                return Ok(AttrMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let attrs = self.decode(&bytes)?;
        debug!(path = %self.path.display(), count = attrs.len(), "attribute metadata loaded");
        Ok(attrs)
    }

    fn save(&self, attrs: &AttrMap) -> AttrResult<()> {
        let doc = DocumentRef {
            version: METADATA_VERSION,
            attrs,
        };
        let tmp_path = self.temp_path();

        let written = self
            .write_temp(&tmp_path, &doc)
            .and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), count = attrs.len(), "attribute metadata saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttributeValue;

    fn sample() -> AttrMap {
        let mut attrs = AttrMap::new();
        attrs.insert("attr1", "val1".into());
        attrs.insert("count", AttributeValue::Int(10));
        attrs.insert("scale", AttributeValue::Float(0.25));
        attrs.insert(
            "dims",
            AttributeValue::Array(vec!["x".into(), "y".into()]),
        );
        attrs
    }

    fn temp_persister() -> (tempfile::TempDir, JsonFilePersister) {
        let dir = tempfile::tempdir().unwrap();
        let persister = JsonFilePersister::new(dir.path(), PersistConfig::default());
        (dir, persister)
    }

    fn leftover_temp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[test]
    fn load_missing_file_is_empty() {
        let (dir, persister) = temp_persister();
        let attrs = persister.load().unwrap();
        assert!(attrs.is_empty());
        assert!(!dir.path().join(ATTRS_FILE).exists());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (_dir, persister) = temp_persister();
        let attrs = sample();
        persister.save(&attrs).unwrap();
        assert_eq!(persister.load().unwrap(), attrs);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let (dir, persister) = temp_persister();
        persister.save(&sample()).unwrap();

        let mut smaller = AttrMap::new();
        smaller.insert("only", true.into());
        persister.save(&smaller).unwrap();

        assert_eq!(persister.load().unwrap(), smaller);
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[test]
    fn document_carries_version_marker() {
        let (_dir, persister) = temp_persister();
        let mut attrs = AttrMap::new();
        attrs.insert("attr1", "val1".into());
        persister.save(&attrs).unwrap();

        let text = fs::read_to_string(persister.path()).unwrap();
        assert_eq!(text, "{\"version\":1,\"attrs\":{\"attr1\":\"val1\"}}\n");
    }

    #[test]
    fn pretty_output_is_still_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let config = PersistConfig {
            pretty: true,
            ..PersistConfig::fast()
        };
        let persister = JsonFilePersister::new(dir.path(), config);
        persister.save(&sample()).unwrap();

        let text = fs::read_to_string(persister.path()).unwrap();
        assert!(text.contains("\n  \"attrs\""));
        assert_eq!(persister.load().unwrap(), sample());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let (_dir, persister) = temp_persister();
        fs::write(persister.path(), b"{not json").unwrap();
        let err = persister.load().unwrap_err();
        assert!(matches!(err, AttrError::CorruptMetadata { .. }));
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let (_dir, persister) = temp_persister();
        fs::write(persister.path(), br#"{"version":1,"attrs":[1,2,3]}"#).unwrap();
        assert!(matches!(
            persister.load().unwrap_err(),
            AttrError::CorruptMetadata { .. }
        ));

        fs::write(persister.path(), br#"{"attrs":{}}"#).unwrap();
        assert!(matches!(
            persister.load().unwrap_err(),
            AttrError::CorruptMetadata { .. }
        ));
    }

    #[test]
    fn newer_version_is_rejected() {
        let (_dir, persister) = temp_persister();
        fs::write(persister.path(), br#"{"version":7,"attrs":{"a":1}}"#).unwrap();
        let err = persister.load().unwrap_err();
        assert!(matches!(err, AttrError::UnsupportedVersion { version: 7, .. }));
    }

    #[test]
    fn save_into_missing_directory_fails_with_io() {
        let dir = tempfile::tempdir().unwrap();
        let persister =
            JsonFilePersister::new(&dir.path().join("does-not-exist"), PersistConfig::fast());
        let err = persister.save(&sample()).unwrap_err();
        assert!(matches!(err, AttrError::Io(_)));
    }

    #[test]
    fn stray_temp_files_are_ignored_by_load() {
        let (dir, persister) = temp_persister();
        persister.save(&sample()).unwrap();
        fs::write(dir.path().join("__attrs__.tmp"), b"{\"version\":1,").unwrap();
        assert_eq!(persister.load().unwrap(), sample());
    }

    #[cfg(unix)]
    #[test]
    fn metadata_file_follows_umask() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, persister) = temp_persister();
        persister.save(&sample()).unwrap();

        let sibling = dir.path().join("data");
        fs::write(&sibling, b"bulk").unwrap();
        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(persister.path()), mode(&sibling));
    }

    #[cfg(unix)]
    #[test]
    fn failed_save_keeps_previous_document() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, persister) = temp_persister();
        let before = sample();
        persister.save(&before).unwrap();

        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        // Privileged users can still write into the directory; nothing to check then.
        if fs::write(dir.path().join("writable"), b"").is_ok() {
            fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut after = AttrMap::new();
        after.insert("only", true.into());
        let result = persister.save(&after);
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result.unwrap_err(), AttrError::Io(_)));
        assert_eq!(persister.load().unwrap(), before);
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let (dir, persister) = temp_persister();
        // A directory in place of the metadata file makes the rename fail.
        fs::create_dir(persister.path()).unwrap();
        fs::write(persister.path().join("occupant"), b"").unwrap();

        let err = persister.save(&sample()).unwrap_err();
        assert!(matches!(err, AttrError::Io(_)));
        assert_eq!(leftover_temp_files(dir.path()), 0);
    }
}
