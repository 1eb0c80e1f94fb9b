//! Prefix-scoped views.

use pinax_core::UploadedFile;

use crate::getter::{FileError, FileGetter, ValueGetter};

/// A view over another source that prepends `prefix.` to every lookup.
///
/// Binding a nested struct field `address` reads `address.city` from the
/// underlying source as `city` through this view, so the binder recurses
/// without knowing how deep it is.
///
/// ```rust
/// use pinax_bind::{PrefixedGetter, ValueGetter, ValueMap};
///
/// let values = ValueMap::from_pairs([("address.city", "Oslo"), ("name", "x")]);
/// let address = PrefixedGetter::new(&values, "address");
/// assert_eq!(address.get("city"), Some("Oslo"));
/// assert!(!address.has("name"));
/// assert_eq!(address.keys(), vec!["city"]);
/// ```
pub struct PrefixedGetter<'a> {
    inner: &'a dyn ValueGetter,
    prefix: String,
}

impl<'a> PrefixedGetter<'a> {
    /// Scopes `inner` to keys under `prefix`.
    pub fn new(inner: &'a dyn ValueGetter, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// The prefix, without the trailing dot.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}.{key}", self.prefix)
    }
}

impl ValueGetter for PrefixedGetter<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(&self.full_key(key))
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner.get_all(&self.full_key(key))
    }

    fn has(&self, key: &str) -> bool {
        self.inner.has(&self.full_key(key))
    }

    fn keys(&self) -> Vec<&str> {
        self.inner
            .keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(self.prefix.as_str())?.strip_prefix('.'))
            .filter(|rest| !rest.is_empty())
            .collect()
    }

    fn approx_count(&self, prefix: &str) -> Option<usize> {
        self.inner.approx_count(&self.full_key(prefix))
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.inner.has_prefix(&self.full_key(prefix))
    }

    fn file_getter(&self) -> Option<&dyn FileGetter> {
        self.inner.file_getter().map(|_| self as &dyn FileGetter)
    }
}

impl FileGetter for PrefixedGetter<'_> {
    fn file(&self, name: &str) -> Result<UploadedFile, FileError> {
        self.inner
            .file_getter()
            .ok_or_else(|| FileError::NotFound(self.full_key(name)))?
            .file(&self.full_key(name))
    }

    fn files(&self, name: &str) -> Result<Vec<UploadedFile>, FileError> {
        self.inner
            .file_getter()
            .ok_or_else(|| FileError::NotFound(self.full_key(name)))?
            .files(&self.full_key(name))
    }

    fn has_file(&self, name: &str) -> bool {
        self.inner
            .file_getter()
            .is_some_and(|files| files.has_file(&self.full_key(name)))
    }
}
