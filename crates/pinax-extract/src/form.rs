//! URL-encoded form source and extractor.

use std::ops::Deref;

use pinax_bind::ValueMap;
use pinax_core::Bindable;

use crate::extractor::bind_source;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// Default maximum body size for form extraction (1 MB).
pub const DEFAULT_FORM_LIMIT: usize = 1024 * 1024;

/// The decoded pairs of an `application/x-www-form-urlencoded` body.
///
/// ```rust
/// use pinax_bind::ValueGetter;
/// use pinax_extract::FormValues;
///
/// let form = FormValues::parse(b"user=alice&roles=a&roles=b").unwrap();
/// assert_eq!(form.get("user"), Some("alice"));
/// assert_eq!(form.get_all("roles"), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: ValueMap,
}

impl FormValues {
    /// Decodes a body of at most [`DEFAULT_FORM_LIMIT`] bytes.
    ///
    /// # Errors
    ///
    /// As [`FormValues::parse_with_limit`].
    pub fn parse(body: &[u8]) -> Result<Self, Rejection> {
        Self::parse_with_limit(body, DEFAULT_FORM_LIMIT)
    }

    /// Decodes a body of at most `limit` bytes.
    ///
    /// # Errors
    ///
    /// [`Rejection::PayloadTooLarge`] if the body exceeds `limit`,
    /// [`Rejection::Malformed`] if it is not URL-encoded data.
    pub fn parse_with_limit(body: &[u8], limit: usize) -> Result<Self, Rejection> {
        if body.len() > limit {
            return Err(Rejection::payload_too_large(limit, body.len()));
        }
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|err| Rejection::malformed(RequestSource::Form, err))?;
        Ok(Self {
            values: ValueMap::from_pairs(pairs),
        })
    }

    /// The decoded pairs.
    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }
}

delegate_value_getter!(FormValues, values);

/// Extractor that binds the `form`-tagged fields of `T` from a URL-encoded
/// body.
///
/// Content-Type is not checked; use [`Bind`](crate::Bind) to dispatch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Consumes the Form and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Form<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + Default> FromRequest for Form<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let values = FormValues::parse(ctx.body())?;
        bind_source(ctx, &values, RequestSource::Form).map(Form)
    }
}
