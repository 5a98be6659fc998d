use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PersistConfig;
use crate::error::{AttrError, AttrResult};
use crate::map::AttrMap;
use crate::persist::{JsonFilePersister, MetadataPersister};
use crate::value::AttributeValue;

/// Whether a store accepts mutations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// The attribute dictionary of one container.
///
/// An in-memory store holds the mapping and nothing else. A disk-backed
/// store additionally owns a [`MetadataPersister`] and saves the complete
/// mapping before any mutating call returns. Mutations are staged on a copy
/// and only become visible once the save succeeded, so memory and disk never
/// disagree.
///
/// Access is single-owner: mutating calls take `&mut self` and callers that
/// share a store across threads must serialize access themselves.
#[derive(Debug)]
pub struct AttributeStore {
    attrs: AttrMap,
    persister: Option<Box<dyn MetadataPersister>>,
    mode: AccessMode,
}

impl AttributeStore {
    /// Empty store for a container without a root directory.
    pub fn in_memory() -> Self {
        Self {
            attrs: AttrMap::new(),
            persister: None,
            mode: AccessMode::ReadWrite,
        }
    }

    /// Empty store for a freshly created disk-backed container.
    ///
    /// Nothing is written until the first mutation.
    pub fn create(rootdir: &Path, config: PersistConfig) -> Self {
        Self {
            attrs: AttrMap::new(),
            persister: Some(Box::new(JsonFilePersister::new(rootdir, config))),
            mode: AccessMode::ReadWrite,
        }
    }

    /// Load the store of an existing disk-backed container.
    ///
    /// A missing metadata file yields an empty store.
    pub fn open(rootdir: &Path, mode: AccessMode, config: PersistConfig) -> AttrResult<Self> {
        Self::with_persister(Box::new(JsonFilePersister::new(rootdir, config)), mode)
    }

    /// Load a store through an arbitrary persister.
    pub fn with_persister(
        persister: Box<dyn MetadataPersister>,
        mode: AccessMode,
    ) -> AttrResult<Self> {
        let attrs = persister.load()?;
        debug!(count = attrs.len(), ?mode, "attribute store opened");
        Ok(Self {
            attrs,
            persister: Some(persister),
            mode,
        })
    }

    /// Returns `true` if mutations are persisted.
    pub fn is_persistent(&self) -> bool {
        self.persister.is_some()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Look up an attribute.
    pub fn get(&self, key: &str) -> AttrResult<&AttributeValue> {
        self.attrs
            .get(key)
            .ok_or_else(|| AttrError::key_not_found(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Number of attributes currently stored.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Attribute names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys()
    }

    /// Insert or overwrite an attribute.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> AttrResult<()> {
        self.check_writable()?;
        let key = key.into();
        let value = value.into();
        validate(&key, &value)?;
        self.apply(|attrs| {
            attrs.insert(key, value);
        })
    }

    /// Remove an attribute, returning its value.
    pub fn delete(&mut self, key: &str) -> AttrResult<AttributeValue> {
        self.check_writable()?;
        if !self.attrs.contains_key(key) {
            return Err(AttrError::key_not_found(key));
        }
        self.apply(|attrs| attrs.remove(key))?
            .ok_or_else(|| AttrError::key_not_found(key))
    }

    /// Set several attributes with a single save.
    ///
    /// Either every pair is applied or none is.
    pub fn update<I, K, V>(&mut self, pairs: I) -> AttrResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        self.check_writable()?;
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| {
                let (key, value) = (k.into(), v.into());
                validate(&key, &value).map(|()| (key, value))
            })
            .collect::<AttrResult<Vec<_>>>()?;
        if pairs.is_empty() {
            return Ok(());
        }
        self.apply(|attrs| {
            for (key, value) in pairs {
                attrs.insert(key, value);
            }
        })
    }

    /// Remove every attribute.
    pub fn clear(&mut self) -> AttrResult<()> {
        self.check_writable()?;
        if self.attrs.is_empty() {
            return Ok(());
        }
        self.apply(AttrMap::clear)
    }

    /// Iterate over a snapshot of the current attributes.
    ///
    /// The iterator owns its copy, so later mutations of the store do not
    /// show up in it.
    pub fn iter(&self) -> Attrs {
        Attrs {
            inner: self.attrs.clone().into_iter(),
        }
    }

    /// Owned copy of the mapping.
    pub fn to_map(&self) -> AttrMap {
        self.attrs.clone()
    }

    fn check_writable(&self) -> AttrResult<()> {
        match self.mode {
            AccessMode::ReadWrite => Ok(()),
            AccessMode::ReadOnly => Err(AttrError::ReadOnly),
        }
    }

    /// Run a mutation, persisting the result before it becomes visible.
    fn apply<R>(&mut self, mutate: impl FnOnce(&mut AttrMap) -> R) -> AttrResult<R> {
        match &self.persister {
            None => Ok(mutate(&mut self.attrs)),
            Some(persister) => {
                let mut next = self.attrs.clone();
                let out = mutate(&mut next);
                persister.save(&next)?;
                self.attrs = next;
                Ok(out)
            }
        }
    }
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

fn validate(key: &str, value: &AttributeValue) -> AttrResult<()> {
    if key.is_empty() {
        return Err(AttrError::InvalidKey);
    }
    value
        .check_representable()
        .map_err(|reason| AttrError::NotRepresentable {
            key: key.to_string(),
            reason,
        })
}

/// Snapshot iterator over `(name, value)` pairs, in insertion order.
#[derive(Debug)]
pub struct Attrs {
    inner: std::vec::IntoIter<(String, AttributeValue)>,
}

impl Iterator for Attrs {
    type Item = (String, AttributeValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Attrs {}

impl<'a> IntoIterator for &'a AttributeStore {
    type Item = (String, AttributeValue);
    type IntoIter = Attrs;

    fn into_iter(self) -> Attrs {
        self.iter()
    }
}
