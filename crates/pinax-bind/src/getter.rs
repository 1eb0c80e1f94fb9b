//! Source abstractions.
//!
//! Every key/value source the binder reads from implements [`ValueGetter`].
//! Sources that carry uploaded files additionally implement [`FileGetter`]
//! and expose it through [`ValueGetter::file_getter`].
//!
//! [`ValueMap`] is the general-purpose in-memory source: an insertion-ordered
//! multimap that most adapters collect into.

use std::collections::HashMap;

use indexmap::IndexMap;
use pinax_core::UploadedFile;
use thiserror::Error;

/// Read access to one source of string key/value pairs.
///
/// `has` reports whether a key is present independently of its value, so a
/// key set to the empty string is present while a missing key is not.
pub trait ValueGetter {
    /// First value for `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<&str>;

    /// All values for `key` in source order; empty if absent.
    fn get_all(&self, key: &str) -> Vec<&str>;

    /// Returns true if the key is present, even with an empty value.
    fn has(&self, key: &str) -> bool;

    /// Every key in the source. Map and indexed-slice binding scan this;
    /// sources that cannot enumerate return an empty list.
    fn keys(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Estimated number of keys under `prefix`, used to size maps.
    fn approx_count(&self, _prefix: &str) -> Option<usize> {
        None
    }

    /// Returns true if any key continues `prefix` with `.` or `[`.
    fn has_prefix(&self, prefix: &str) -> bool {
        self.keys().iter().any(|key| continues_prefix(key, prefix))
    }

    /// The file capability of this source, if it has one.
    fn file_getter(&self) -> Option<&dyn FileGetter> {
        None
    }
}

/// Returns true if `key` is `prefix.…` or `prefix[…`.
pub(crate) fn continues_prefix(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

/// Error returned by [`FileGetter`] lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    /// No file was uploaded under the name.
    #[error("no file uploaded for field '{0}'")]
    NotFound(String),

    /// The file could not be read.
    #[error("failed to read uploaded file '{name}': {reason}")]
    Unreadable {
        /// Field name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Access to uploaded files.
pub trait FileGetter {
    /// The first file uploaded under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::NotFound`] if there is none.
    fn file(&self, name: &str) -> Result<UploadedFile, FileError>;

    /// All files uploaded under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::NotFound`] if there are none.
    fn files(&self, name: &str) -> Result<Vec<UploadedFile>, FileError>;

    /// Returns true if at least one file was uploaded under `name`.
    fn has_file(&self, name: &str) -> bool;
}

/// An insertion-ordered string multimap.
///
/// # Example
///
/// ```rust
/// use pinax_bind::{ValueGetter, ValueMap};
///
/// let mut values = ValueMap::new();
/// values.append("tag", "a");
/// values.append("tag", "b");
/// values.insert("empty", "");
///
/// assert_eq!(values.get("tag"), Some("a"));
/// assert_eq!(values.get_all("tag"), vec!["a", "b"]);
/// assert!(values.has("empty"));
/// assert!(!values.has("missing"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    inner: IndexMap<String, Vec<String>>,
}

impl ValueMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from `(key, value)` pairs, keeping repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Self::new();
        for (key, value) in pairs {
            map.append(key, value);
        }
        map
    }

    /// Adds a value under `key`, after any existing values.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces all values under `key` with one value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), vec![value.into()]);
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.inner.shift_remove(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates `(key, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl ValueGetter for ValueMap {
    fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .get(key)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn has(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    fn approx_count(&self, prefix: &str) -> Option<usize> {
        Some(
            self.inner
                .keys()
                .filter(|key| continues_prefix(key, prefix))
                .count(),
        )
    }
}

impl ValueGetter for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        HashMap::get(self, key)
            .map(|value| vec![value.as_str()])
            .unwrap_or_default()
    }

    fn has(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

impl ValueGetter for HashMap<String, Vec<String>> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        HashMap::get(self, key)
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn has(&self, key: &str) -> bool {
        self.contains_key(key)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}
