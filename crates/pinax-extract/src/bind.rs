//! Whole-request extractor.

use std::ops::Deref;

use pinax_bind::{BodyFormat, Sources};
use pinax_core::Bindable;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::cookie::CookieValues;
use crate::form::{FormValues, DEFAULT_FORM_LIMIT};
use crate::header::HeaderValues;
use crate::json::DEFAULT_JSON_LIMIT;
use crate::query::QueryValues;
use crate::{ExtractionContext, FromRequest, Rejection, RequestSource};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const ACCEPTED_BODIES: &str =
    "application/json, application/xml, application/yaml or application/x-www-form-urlencoded";

/// Extractor that binds `T` from every part of the request.
///
/// A JSON, XML or YAML body is decoded first, because decoding replaces
/// the whole value. Path parameters, the query string, headers and cookies
/// are then bound in that order, each into the fields tagged with its
/// namespace. A URL-encoded form body is bound last. Later sources
/// overwrite fields earlier ones set, and the validator runs once at the
/// end.
///
/// An empty body is skipped. Any other non-empty body is rejected with
/// 415. Multipart bodies are bound with
/// [`bind_multipart`](crate::bind_multipart).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bind<T>(pub T);

impl<T> Bind<T> {
    /// Consumes the Bind and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Bind<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

enum Body {
    None,
    Codec(BodyFormat),
    Form(FormValues),
}

fn classify(ctx: &ExtractionContext) -> Result<Body, Rejection> {
    if ctx.is_body_empty() {
        return Ok(Body::None);
    }
    let content_type = ctx.content_type();
    if let Some(format) = content_type.and_then(BodyFormat::from_content_type) {
        if ctx.body().len() > DEFAULT_JSON_LIMIT {
            return Err(Rejection::payload_too_large(DEFAULT_JSON_LIMIT, ctx.body().len()));
        }
        return Ok(Body::Codec(format));
    }
    let is_form = content_type.is_some_and(|value| {
        value
            .split(';')
            .next()
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
    });
    if is_form {
        return FormValues::parse_with_limit(ctx.body(), DEFAULT_FORM_LIMIT).map(Body::Form);
    }
    Err(Rejection::unsupported_media_type(ACCEPTED_BODIES, content_type))
}

impl<T: Bindable + DeserializeOwned + Default> FromRequest for Bind<T> {
    fn from_request(ctx: &ExtractionContext) -> Result<Self, Rejection> {
        let body = classify(ctx)?;
        let query = QueryValues::from_context(ctx)?;
        let headers = HeaderValues::new(ctx.headers());
        let cookies = CookieValues::from_headers(ctx.headers())?;

        let mut sources = Sources::new(ctx.binder().config());
        if let Body::Codec(format) = body {
            debug!(format = format.name(), "binding request body");
            sources = sources.body(ctx.body(), format);
        }
        sources = sources
            .values(ctx.path_params(), RequestSource::Path.namespace())
            .values(&query, RequestSource::Query.namespace())
            .values(&headers, RequestSource::Header.namespace())
            .values(&cookies, RequestSource::Cookie.namespace());
        if let Body::Form(form) = &body {
            sources = sources.values(form, RequestSource::Form.namespace());
        }

        let mut dest = T::default();
        sources.bind(&mut dest)?;
        Ok(Bind(dest))
    }
}
