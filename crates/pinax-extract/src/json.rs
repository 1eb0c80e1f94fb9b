//! JSON body extractor.

use std::ops::Deref;

use pinax_bind::BodyFormat;
use pinax_core::Bindable;
use serde::de::DeserializeOwned;

use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

/// Default maximum body size for JSON extraction (1 MB).
pub const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

/// Extractor for JSON request bodies.
///
/// Body keys are matched against the `json` tag names of `T` under the
/// binder's unknown-field policy, then serde decodes the renamed document
/// and the binder's validator runs. Content-Type is not checked.
///
/// ```rust
/// use pinax_core::{Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
/// use pinax_extract::{ExtractionContext, FromRequest, Json};
/// use serde::Deserialize;
///
/// #[derive(Default, Deserialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// impl FieldType for CreateUser {
///     fn shape() -> TypeShape {
///         TypeShape::nested::<Self>()
///     }
/// }
///
/// impl Bindable for CreateUser {
///     fn schema() -> StructSchema {
///         SchemaBuilder::<Self>::new()
///             .field("name", r#"json:"name""#, |u| &mut u.name)
///             .build()
///     }
/// }
///
/// let ctx = ExtractionContext::builder()
///     .body(r#"{"name": "Alice"}"#)
///     .build();
/// let Json(user) = Json::<CreateUser>::from_request(&ctx).unwrap();
/// assert_eq!(user.name, "Alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consumes the Json and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Bindable + DeserializeOwned + Default> FromRequest for Json<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let body = ctx.body();

        if body.len() > DEFAULT_JSON_LIMIT {
            return Err(Rejection::payload_too_large(DEFAULT_JSON_LIMIT, body.len()));
        }

        if body.is_empty() {
            return Err(Rejection::malformed(RequestSource::Body, "empty request body"));
        }

        let mut value = T::default();
        ctx.binder().bind_body(&mut value, body, BodyFormat::Json)?;
        Ok(Json(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use pinax_bind::Binder;
    use pinax_core::{validate_with, BindConfig, UnknownFieldPolicy};
    use pinax_macros::Bind;
    use serde::Deserialize;

    #[derive(Bind, Debug, Default, Deserialize)]
    #[bind(crate = "pinax_core")]
    struct CreateUser {
        #[bind(json = "name")]
        name: String,
        #[bind(json = "age")]
        #[serde(default)]
        age: Option<u8>,
    }

    fn ctx(body: &'static str, binder: Binder) -> ExtractionContext {
        ExtractionContext::builder().body(body).binder(binder).build()
    }

    #[test]
    fn test_json_extraction() {
        let Json(user) =
            Json::<CreateUser>::from_request(&ctx(r#"{"name":"Ann","age":30}"#, Binder::default())).unwrap();
        assert_eq!(user.name, "Ann");
        assert_eq!(user.age, Some(30));
    }

    #[test]
    fn test_empty_and_invalid_body() {
        let err = Json::<CreateUser>::from_request(&ctx("", Binder::default())).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_REQUEST");

        let err = Json::<CreateUser>::from_request(&ctx("{not json", Binder::default())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "DESERIALIZATION_FAILED");
    }

    #[test]
    fn test_strict_unknown_fields() {
        let binder = Binder::new(BindConfig::builder().unknown_fields(UnknownFieldPolicy::Error).build());
        let err = Json::<CreateUser>::from_request(&ctx(r#"{"name":"Ann","admin":true}"#, binder)).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_FIELD");
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_validator_runs() {
        let config = BindConfig::builder()
            .validator(validate_with(|user: &CreateUser| {
                if user.name.is_empty() {
                    Err("name must not be empty".into())
                } else {
                    Ok(())
                }
            }))
            .build();
        let err = Json::<CreateUser>::from_request(&ctx(r#"{"name":""}"#, Binder::new(config))).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
