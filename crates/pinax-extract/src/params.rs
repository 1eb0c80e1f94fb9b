//! Path parameter storage.
//!
//! Path parameters come from the router, typically one to four per route,
//! so they are kept in a small vector that stays on the stack for common
//! cases.

use pinax_bind::ValueGetter;
use smallvec::SmallVec;

// Routes rarely capture more than this many segments.
const INLINE_PARAMS: usize = 4;

/// Path parameters captured by a router, served as a [`ValueGetter`] for
/// the `path` namespace.
///
/// # Example
///
/// ```rust
/// use pinax_bind::ValueGetter;
/// use pinax_extract::PathParams;
///
/// let mut params = PathParams::new();
/// params.push("shop", "north");
/// params.push("order", "77");
///
/// assert_eq!(params.get("order"), Some("77"));
/// assert_eq!(params.keys(), ["shop", "order"]);
/// assert!(!params.has("line"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter. A later parameter with the same name replaces the
    /// earlier one.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Name/value pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl ValueGetter for PathParams {
    fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        ValueGetter::get(self, key).into_iter().collect()
    }

    fn has(&self, key: &str) -> bool {
        self.inner.iter().any(|(name, _)| name == key)
    }

    fn keys(&self) -> Vec<&str> {
        self.inner.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}
