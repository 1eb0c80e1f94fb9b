//! Cookie source and extractor.

use std::ops::Deref;

use http::{header, HeaderMap};
use pinax_bind::ValueMap;
use pinax_core::Bindable;
use tracing::trace;

use crate::extractor::bind_source;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// Cookies sent in the request's `Cookie` headers.
///
/// Pairs are read from every `Cookie` header in order. Surrounding double
/// quotes are removed from values; pairs without `=` or with an empty name
/// are ignored. A repeated cookie name keeps every value, first one first.
///
/// ```rust
/// use pinax_bind::ValueGetter;
/// use pinax_extract::CookieValues;
///
/// let cookies = CookieValues::parse("session=abc123; theme=\"dark\"");
/// assert_eq!(cookies.get("session"), Some("abc123"));
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieValues {
    values: ValueMap,
}

impl CookieValues {
    /// Parses one `Cookie` header value.
    #[must_use]
    pub fn parse(header_value: &str) -> Self {
        let mut cookies = Self::default();
        cookies.extend_from(header_value);
        cookies
    }

    /// Parses every `Cookie` header in `headers`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Malformed`] if a `Cookie` header is not valid
    /// visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, Rejection> {
        let mut cookies = Self::default();
        for value in headers.get_all(header::COOKIE) {
            let value = value.to_str().map_err(|_| {
                Rejection::malformed(RequestSource::Cookie, "invalid characters in Cookie header")
            })?;
            cookies.extend_from(value);
        }
        trace!(count = cookies.values.len(), "parsed cookies");
        Ok(cookies)
    }

    /// The parsed pairs.
    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    fn extend_from(&mut self, header_value: &str) {
        for pair in header_value.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            self.values.append(name, value);
        }
    }
}

delegate_value_getter!(CookieValues, values);

/// Extractor that binds the `cookie`-tagged fields of `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookies<T>(pub T);

impl<T> Cookies<T> {
    /// Consumes the Cookies and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Cookies<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + Default> FromRequest for Cookies<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let values = CookieValues::from_headers(ctx.headers())?;
        bind_source(ctx, &values, RequestSource::Cookie).map(Cookies)
    }
}
