//! Query string source and extractor.

use std::ops::Deref;

use pinax_bind::ValueMap;
use pinax_core::Bindable;

use crate::extractor::bind_source;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// The decoded pairs of a URL query string.
///
/// Repeated keys keep every value in order. A key with no `=` is present
/// with an empty value.
///
/// ```rust
/// use pinax_bind::ValueGetter;
/// use pinax_extract::QueryValues;
///
/// let query = QueryValues::parse("tag=a&tag=b&q=hello+world&flag").unwrap();
/// assert_eq!(query.get_all("tag"), vec!["a", "b"]);
/// assert_eq!(query.get("q"), Some("hello world"));
/// assert!(query.has("flag"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryValues {
    values: ValueMap,
}

impl QueryValues {
    /// Decodes a query string (without the leading `?`).
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::Malformed`] if the string is not valid
    /// URL-encoded data.
    pub fn parse(query: &str) -> Result<Self, Rejection> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|err| Rejection::malformed(RequestSource::Query, err))?;
        Ok(Self {
            values: ValueMap::from_pairs(pairs),
        })
    }

    /// Decodes the query string of the request, empty if it has none.
    ///
    /// # Errors
    ///
    /// As [`QueryValues::parse`].
    pub fn from_context(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        Self::parse(ctx.query_string().unwrap_or_default())
    }

    /// The decoded pairs.
    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }
}

delegate_value_getter!(QueryValues, values);

/// Extractor that binds the `query`-tagged fields of `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Consumes the Query and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + Default> FromRequest for Query<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let values = QueryValues::from_context(ctx)?;
        bind_source(ctx, &values, RequestSource::Query).map(Query)
    }
}
