//! Bind error types.
//!
//! Field-level failures are reported as [`BindError`], structural limits as
//! [`LimitError`], strict-mode unknown JSON fields as [`UnknownFieldError`],
//! and collect-all mode aggregates all of them into a [`MultiError`]. The
//! top-level [`Error`] ties these together with the decode, validation and
//! programmer-error cases.
//!
//! Every type carries structured data so callers can build their own HTTP
//! status mapping; [`Error::is_client_error`] gives the conventional split.

use std::fmt;

use thiserror::Error;

use crate::shape::BoxError;

/// Result alias used across the binding crates.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What went wrong with a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindErrorKind {
    /// The raw value could not be converted to the field's type.
    Conversion,
    /// The value is not in the field's `enum` set.
    Enum,
    /// A `required:"true"` field received no value.
    Required,
    /// The field's type cannot be bound (unsupported kind or map key type).
    Unsupported,
    /// A file field could not be read from the source.
    File,
}

impl BindErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Conversion => "invalid_value",
            Self::Enum => "invalid_enum",
            Self::Required => "missing_field",
            Self::Unsupported => "unsupported_type",
            Self::File => "invalid_file",
        }
    }
}

/// A failure binding one field.
///
/// # Example
///
/// ```rust
/// use pinax_core::BindError;
///
/// let err = BindError::conversion("page", "page", "query", "abc", "u32", "invalid digit");
/// assert_eq!(err.field(), "page");
/// assert!(err.to_string().contains("abc"));
/// ```
#[derive(Debug)]
pub struct BindError {
    kind: BindErrorKind,
    field: String,
    key: String,
    namespace: String,
    value: Option<String>,
    expected: String,
    reason: String,
    hint: Option<String>,
    cause: Option<BoxError>,
}

impl BindError {
    fn new(
        kind: BindErrorKind,
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            key: key.into(),
            namespace: namespace.into(),
            value: None,
            expected: expected.into(),
            reason: reason.into(),
            hint: None,
            cause: None,
        }
    }

    /// A value that failed to convert.
    #[must_use]
    pub fn conversion(
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(BindErrorKind::Conversion, field, key, namespace, expected, reason);
        err.value = Some(value.into());
        err
    }

    /// A value outside the declared `enum` set.
    #[must_use]
    pub fn invalid_enum(
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        value: impl Into<String>,
        allowed: &[String],
    ) -> Self {
        let reason = format!("must be one of [{}]", allowed.join(", "));
        let mut err = Self::new(BindErrorKind::Enum, field, key, namespace, "enum", reason);
        err.value = Some(value.into());
        err
    }

    /// A required field with no value.
    #[must_use]
    pub fn required(
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::new(
            BindErrorKind::Required,
            field,
            key,
            namespace,
            expected,
            "value is required",
        )
    }

    /// A field whose type cannot be bound.
    #[must_use]
    pub fn unsupported(
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(BindErrorKind::Unsupported, field, key, namespace, expected, reason)
    }

    /// A file field that could not be read.
    #[must_use]
    pub fn file(
        field: impl Into<String>,
        key: impl Into<String>,
        namespace: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(BindErrorKind::File, field, key, namespace, "file", reason)
    }

    /// Attaches a human hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Prefixes the field name with the path of the struct that holds it.
    #[must_use]
    pub fn nested_in(mut self, parent: &str) -> Self {
        if !parent.is_empty() {
            self.field = format!("{parent}.{}", self.field);
        }
        self
    }

    /// The failure category.
    #[must_use]
    pub fn kind(&self) -> BindErrorKind {
        self.kind
    }

    /// Declared name of the field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The key the value was looked up under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The tag namespace of the source (`query`, `form`, ...).
    #[must_use]
    pub fn source_kind(&self) -> &str {
        &self.namespace
    }

    /// The offending raw value, if there was one.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Name of the expected type.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Why the value was rejected.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// A suggestion for fixing the input, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} field '{}'", self.namespace, self.field)?;
        if self.key != self.field {
            write!(f, " (key '{}')", self.key)?;
        }
        if let Some(value) = &self.value {
            write!(f, ": value {value:?} is not a valid {}", self.expected)?;
        }
        write!(f, ": {}", self.reason)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Which structural limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// Nested struct depth.
    Depth,
    /// Number of slice elements.
    SliceLength,
    /// Number of map entries.
    MapSize,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depth => write!(f, "nesting depth"),
            Self::SliceLength => write!(f, "slice length"),
            Self::MapSize => write!(f, "map size"),
        }
    }
}

/// A depth, slice-length or map-size limit was exceeded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{limit_kind} {observed} exceeds configured limit {limit} at field '{field}'")]
pub struct LimitError {
    /// The limit that was hit.
    pub limit_kind: LimitKind,
    /// The field being bound when the limit was hit.
    pub field: String,
    /// The observed depth or size.
    pub observed: usize,
    /// The configured maximum.
    pub limit: usize,
}

impl LimitError {
    /// Creates a limit error.
    #[must_use]
    pub fn new(limit_kind: LimitKind, field: impl Into<String>, observed: usize, limit: usize) -> Self {
        Self {
            limit_kind,
            field: field.into(),
            observed,
            limit,
        }
    }
}

/// JSON fields that the destination does not declare.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown field(s): {}", .fields.join(", "))]
pub struct UnknownFieldError {
    /// Dotted paths of the offending fields.
    pub fields: Vec<String>,
}

impl UnknownFieldError {
    /// Creates an error for the given field paths.
    #[must_use]
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }
}

/// Every field error from a collect-all bind.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<Error>,
}

impl MultiError {
    /// Creates an empty aggregate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error, flattening nested aggregates.
    pub fn push(&mut self, err: Error) {
        match err {
            Error::Multi(inner) => self.errors.extend(inner.errors),
            other => self.errors.push(other),
        }
    }

    /// Number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The collected errors in the order they occurred.
    #[must_use]
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Iterates the collected errors.
    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.errors.iter()
    }

    /// Consumes the aggregate.
    #[must_use]
    pub fn into_errors(self) -> Vec<Error> {
        self.errors
    }

    /// `None` when nothing was collected, otherwise [`Error::Multi`], even
    /// for a single member.
    #[must_use]
    pub fn into_error(self) -> Option<Error> {
        if self.errors.is_empty() {
            None
        } else {
            Some(Error::Multi(self))
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bind error(s)", self.errors.len())?;
        for err in &self.errors {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Errors returned by bind operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A single field failed.
    #[error(transparent)]
    Field(#[from] BindError),

    /// A structural limit was exceeded.
    #[error(transparent)]
    Limit(#[from] LimitError),

    /// Strict unknown-field policy rejected the body.
    #[error(transparent)]
    UnknownFields(#[from] UnknownFieldError),

    /// Collect-all mode gathered at least one error.
    #[error(transparent)]
    Multi(#[from] MultiError),

    /// The injected validator rejected the bound value.
    #[error("validation failed: {source}")]
    Validation {
        /// What the validator reported.
        #[source]
        source: BoxError,
    },

    /// A body codec could not decode the payload.
    #[error("failed to decode {format} body: {source}")]
    Decode {
        /// Codec name (`json`, `xml`, `yaml`).
        format: &'static str,
        /// The codec error.
        #[source]
        source: BoxError,
    },

    /// The API was misused (bad destination, bad configuration).
    #[error("invalid bind target: {message}")]
    Structural {
        /// What was wrong.
        message: String,
    },
}

impl Error {
    /// Create a new validation error.
    pub fn validation(source: impl Into<BoxError>) -> Self {
        Self::Validation {
            source: source.into(),
        }
    }

    /// Create a new decode error.
    pub fn decode(format: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            format,
            source: source.into(),
        }
    }

    /// Create a new structural (programmer) error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
        }
    }

    /// Returns true if the error was caused by the input rather than by how
    /// the library was called.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Structural { .. } => false,
            Self::Multi(multi) => multi.iter().all(Self::is_client_error),
            _ => true,
        }
    }

    /// Every field-level error, looking inside aggregates.
    #[must_use]
    pub fn bind_errors(&self) -> Vec<&BindError> {
        match self {
            Self::Field(err) => vec![err],
            Self::Multi(multi) => multi.iter().flat_map(Self::bind_errors).collect(),
            _ => Vec::new(),
        }
    }

    /// The first limit error, looking inside aggregates.
    #[must_use]
    pub fn limit(&self) -> Option<&LimitError> {
        match self {
            Self::Limit(err) => Some(err),
            Self::Multi(multi) => multi.iter().find_map(Self::limit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_message() {
        let err = BindError::conversion("Page", "page", "query", "abc", "u32", "invalid digit")
            .with_hint("expected a whole number");
        let msg = err.to_string();
        assert!(msg.contains("query field 'Page'"));
        assert!(msg.contains("(key 'page')"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("u32"));
        assert!(msg.contains("hint: expected a whole number"));
        assert_eq!(err.kind(), BindErrorKind::Conversion);
    }

    #[test]
    fn test_enum_error_lists_allowed() {
        let allowed = vec!["asc".to_string(), "desc".to_string()];
        let err = BindError::invalid_enum("sort", "sort", "query", "up", &allowed);
        assert!(err.to_string().contains("[asc, desc]"));
        assert_eq!(err.kind().code(), "invalid_enum");
    }

    #[test]
    fn test_bind_error_source_chain() {
        let cause = "10x".parse::<i32>().unwrap_err();
        let err = BindError::conversion("n", "n", "query", "10x", "i32", "bad").with_cause(cause);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_limit_error_names_both_numbers() {
        let err = LimitError::new(LimitKind::SliceLength, "tags", 1001, 1000);
        let msg = err.to_string();
        assert!(msg.contains("1001"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("slice length"));
    }

    #[test]
    fn test_multi_error_flattens() {
        let mut inner = MultiError::new();
        inner.push(BindError::required("a", "a", "query", "String").into());
        inner.push(BindError::required("b", "b", "query", "String").into());

        let mut outer = MultiError::new();
        outer.push(Error::Multi(inner));
        outer.push(LimitError::new(LimitKind::MapSize, "m", 3, 2).into());
        assert_eq!(outer.len(), 3);

        let err = Error::Multi(outer);
        assert_eq!(err.bind_errors().len(), 2);
        assert!(err.limit().is_some());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_into_error_keeps_single_member_aggregated() {
        assert!(MultiError::new().into_error().is_none());

        let mut one = MultiError::new();
        one.push(BindError::required("a", "a", "query", "String").into());
        let Some(Error::Multi(multi)) = one.into_error() else {
            panic!("expected an aggregate");
        };
        assert_eq!(multi.len(), 1);
    }

    #[test]
    fn test_structural_is_not_client_error() {
        assert!(!Error::structural("empty namespace").is_client_error());
        assert!(Error::validation("nope").is_client_error());
    }
}
