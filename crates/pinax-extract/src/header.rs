//! Header source and extractor.

use std::ops::Deref;

use http::HeaderMap;
use pinax_bind::ValueGetter;
use pinax_core::Bindable;

use crate::extractor::bind_source;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// Request headers as a key/value source.
///
/// Lookups are case-insensitive. Repeated headers yield every value in
/// order. Values that are not visible ASCII are skipped by `get` and
/// `get_all` but still count as present.
///
/// ```rust
/// use http::HeaderMap;
/// use pinax_bind::ValueGetter;
/// use pinax_extract::HeaderValues;
///
/// let mut headers = HeaderMap::new();
/// headers.append("x-tag", "a".parse().unwrap());
/// headers.append("x-tag", "b".parse().unwrap());
///
/// let values = HeaderValues::new(&headers);
/// assert_eq!(values.get("X-Tag"), Some("a"));
/// assert_eq!(values.get_all("X-TAG"), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HeaderValues<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderValues<'a> {
    /// Wraps a header map.
    #[must_use]
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }
}

impl ValueGetter for HeaderValues<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|value| value.to_str().ok())
    }

    fn get_all(&self, key: &str) -> Vec<&str> {
        self.headers
            .get_all(key)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    fn has(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Header names, lowercased.
    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(http::HeaderName::as_str).collect()
    }

    fn approx_count(&self, prefix: &str) -> Option<usize> {
        let prefix = prefix.to_ascii_lowercase();
        Some(
            self.headers
                .keys()
                .filter(|name| {
                    name.as_str()
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
                })
                .count(),
        )
    }
}

/// Extractor that binds the `header`-tagged fields of `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers<T>(pub T);

impl<T> Headers<T> {
    /// Consumes the Headers and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Headers<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + Default> FromRequest for Headers<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let values = HeaderValues::new(ctx.headers());
        bind_source(ctx, &values, RequestSource::Header).map(Headers)
    }
}
