//! Extraction rejections.
//!
//! A [`Rejection`] is what an extractor returns when a request cannot be
//! bound. It wraps the binder's [`pinax_core::Error`] or describes a problem
//! with the request itself, and maps both to an HTTP status code and a
//! stable error code for error envelopes.

use std::fmt;

use http::StatusCode;
use pinax_core::{BindErrorKind, Error};
use thiserror::Error;

/// The part of the request a rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestSource {
    /// Path parameters (e.g., `/users/{id}`)
    Path,
    /// Query string parameters
    Query,
    /// URL-encoded form body
    Form,
    /// HTTP headers
    Header,
    /// The `Cookie` header
    Cookie,
    /// `multipart/form-data` body
    Multipart,
    /// Codec-decoded body (JSON, XML, YAML)
    Body,
}

impl RequestSource {
    /// The tag namespace fields bound from this source are declared under.
    ///
    /// Multipart text fields use the `form` namespace; codec bodies are
    /// reported under `json`.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Form | Self::Multipart => "form",
            Self::Header => "header",
            Self::Cookie => "cookie",
            Self::Body => "json",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Query => write!(f, "query"),
            Self::Form => write!(f, "form"),
            Self::Header => write!(f, "header"),
            Self::Cookie => write!(f, "cookie"),
            Self::Multipart => write!(f, "multipart"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// Error returned by extractors.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use pinax_core::{Error, LimitError, LimitKind};
/// use pinax_extract::Rejection;
///
/// let limit = LimitError::new(LimitKind::SliceLength, "ids", 5000, 1000);
/// let rejection = Rejection::from(Error::from(limit));
/// assert_eq!(rejection.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
/// assert_eq!(rejection.error_code(), "LIMIT_EXCEEDED");
/// ```
#[derive(Error, Debug)]
pub enum Rejection {
    /// Binding the request into the destination failed.
    #[error(transparent)]
    Bind(#[from] Error),

    /// The body exceeds the extractor's size limit.
    #[error("payload too large: max {limit} bytes, got {actual} bytes")]
    PayloadTooLarge {
        /// Configured maximum.
        limit: usize,
        /// Received size.
        actual: usize,
    },

    /// The Content-Type is missing or not one the extractor accepts.
    #[error("unsupported content type: expected '{expected}', got '{actual}'")]
    UnsupportedMediaType {
        /// What the extractor accepts.
        expected: &'static str,
        /// What the request sent, `none` if absent.
        actual: String,
    },

    /// The request data could not be parsed into key/value pairs.
    #[error("malformed {location} data: {message}")]
    Malformed {
        /// Where the data came from.
        location: RequestSource,
        /// What the parser reported.
        message: String,
    },
}

impl Rejection {
    /// Create a new payload-too-large rejection.
    #[must_use]
    pub fn payload_too_large(limit: usize, actual: usize) -> Self {
        Self::PayloadTooLarge { limit, actual }
    }

    /// Create a new unsupported-media-type rejection.
    #[must_use]
    pub fn unsupported_media_type(expected: &'static str, actual: Option<&str>) -> Self {
        Self::UnsupportedMediaType {
            expected,
            actual: actual.unwrap_or("none").to_string(),
        }
    }

    /// Create a new malformed-data rejection.
    #[must_use]
    pub fn malformed(location: RequestSource, message: impl fmt::Display) -> Self {
        Self::Malformed {
            location,
            message: message.to_string(),
        }
    }

    /// The binder error, if binding is what failed.
    #[must_use]
    pub fn bind_error(&self) -> Option<&Error> {
        match self {
            Self::Bind(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the appropriate HTTP status code for this rejection.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Bind(err) => bind_status(err),
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Malformed { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Bind(err) => bind_code(err),
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            Self::Malformed { .. } => "MALFORMED_REQUEST",
        }
    }
}

fn bind_status(err: &Error) -> StatusCode {
    match err {
        Error::Field(_) | Error::UnknownFields(_) | Error::Decode { .. } => StatusCode::BAD_REQUEST,
        Error::Limit(_) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Structural { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        // The most severe member wins.
        Error::Multi(multi) => multi
            .iter()
            .map(bind_status)
            .max_by_key(StatusCode::as_u16)
            .unwrap_or(StatusCode::BAD_REQUEST),
    }
}

fn bind_code(err: &Error) -> &'static str {
    match err {
        Error::Field(field) if field.kind() == BindErrorKind::Required => "MISSING_PARAMETER",
        Error::Field(_) => "INVALID_PARAMETER",
        Error::Limit(_) => "LIMIT_EXCEEDED",
        Error::UnknownFields(_) => "UNKNOWN_FIELD",
        Error::Decode { .. } => "DESERIALIZATION_FAILED",
        Error::Validation { .. } => "VALIDATION_FAILED",
        Error::Structural { .. } => "BINDING_MISCONFIGURED",
        Error::Multi(_) => "MULTIPLE_ERRORS",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinax_core::{BindError, LimitError, LimitKind, MultiError, UnknownFieldError};

    fn field_error() -> Error {
        BindError::conversion("limit", "limit", "query", "ten", "u32", "invalid digit").into()
    }

    #[test]
    fn test_field_error_is_bad_request() {
        let rejection = Rejection::from(field_error());
        assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection.error_code(), "INVALID_PARAMETER");
        assert!(rejection.to_string().contains("limit"));
    }

    #[test]
    fn test_required_error_code() {
        let rejection = Rejection::from(Error::from(BindError::required("tenant", "X-Tenant", "header", "String")));
        assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection.error_code(), "MISSING_PARAMETER");
    }

    #[test]
    fn test_limit_and_validation_status() {
        let limit = Rejection::from(Error::from(LimitError::new(LimitKind::Depth, "a.b", 33, 32)));
        assert_eq!(limit.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let validation = Rejection::from(Error::validation("email is invalid"));
        assert_eq!(validation.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(validation.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_structural_is_server_error() {
        let rejection = Rejection::from(Error::structural("tag namespace must not be empty"));
        assert_eq!(rejection.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rejection.error_code(), "BINDING_MISCONFIGURED");
    }

    #[test]
    fn test_unknown_fields_and_decode() {
        let unknown = Rejection::from(Error::from(UnknownFieldError::new(vec!["extra".into()])));
        assert_eq!(unknown.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(unknown.error_code(), "UNKNOWN_FIELD");

        let decode = Rejection::from(Error::decode("json", "expected value at line 1"));
        assert_eq!(decode.error_code(), "DESERIALIZATION_FAILED");
    }

    #[test]
    fn test_multi_takes_most_severe_status() {
        let mut multi = MultiError::new();
        multi.push(field_error());
        multi.push(LimitError::new(LimitKind::MapSize, "meta", 3, 2).into());
        let rejection = Rejection::from(Error::Multi(multi));
        assert_eq!(rejection.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(rejection.error_code(), "MULTIPLE_ERRORS");
    }

    #[test]
    fn test_request_rejections() {
        let large = Rejection::payload_too_large(1024, 2048);
        assert_eq!(large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(large.to_string().contains("1024"));
        assert!(large.to_string().contains("2048"));

        let media = Rejection::unsupported_media_type("multipart/form-data", Some("text/plain"));
        assert_eq!(media.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(media.to_string().contains("text/plain"));

        let malformed = Rejection::malformed(RequestSource::Query, "invalid percent-encoding");
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);
        assert!(malformed.to_string().starts_with("malformed query data"));
        assert!(malformed.bind_error().is_none());
    }

    #[test]
    fn test_request_source_namespaces() {
        assert_eq!(RequestSource::Path.namespace(), "path");
        assert_eq!(RequestSource::Multipart.namespace(), "form");
        assert_eq!(RequestSource::Multipart.to_string(), "multipart");
        assert_eq!(RequestSource::Cookie.to_string(), "cookie");
    }
}
