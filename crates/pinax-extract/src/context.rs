//! The request view extractors bind from.
//!
//! An [`ExtractionContext`] owns the buffered parts of one request plus the
//! [`Binder`] whose configuration every extractor in that request shares.
//! Servers usually build it from an `http::Request<Bytes>` and the router's
//! captured parameters.

use bytes::Bytes;
use http::{header, HeaderMap, Method, Request, Uri};
use pinax_bind::Binder;

use crate::params::PathParams;

/// A buffered request and the binder to bind it with.
///
/// ```rust
/// use http::Request;
/// use pinax_bind::ValueGetter;
/// use pinax_extract::{ExtractionContext, PathParams};
///
/// let request = Request::get("/orders/9?expand=lines")
///     .header("x-tenant", "acme")
///     .body(bytes::Bytes::new())
///     .unwrap();
/// let params: PathParams = [("order", "9")].into_iter().collect();
///
/// let ctx = ExtractionContext::from_request(request, params);
/// assert_eq!(ctx.query_string(), Some("expand=lines"));
/// assert_eq!(ctx.header("x-tenant"), Some("acme"));
/// assert_eq!(ctx.path_params().get("order"), Some("9"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExtractionContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: PathParams,
    binder: Binder,
}

impl ExtractionContext {
    /// Takes apart a buffered request. The default binder is used until
    /// [`with_binder`](Self::with_binder) replaces it.
    #[must_use]
    pub fn from_request(request: Request<Bytes>, path_params: PathParams) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            path_params,
            binder: Binder::default(),
        }
    }

    /// Starts an empty `GET /` context, mostly for tests.
    #[must_use]
    pub fn builder() -> ExtractionContextBuilder {
        ExtractionContextBuilder::default()
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Path component of the target.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw, still percent-encoded query string.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// All request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The buffered body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parameters the router captured from the path.
    #[must_use]
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The binder extractors use.
    #[must_use]
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Replaces the binder, e.g. with a per-route overlay.
    #[must_use]
    pub fn with_binder(mut self, binder: Binder) -> Self {
        self.binder = binder;
        self
    }

    /// First value of header `name`, if it is visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The Content-Type header, parameters included.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
    }

    /// Returns true if the body has no bytes.
    #[must_use]
    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Step-by-step construction of an [`ExtractionContext`].
///
/// Unset parts default to `GET /` with no headers, body or parameters.
#[derive(Debug, Default)]
pub struct ExtractionContextBuilder {
    inner: ExtractionContext,
}

impl ExtractionContextBuilder {
    /// Request method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.inner.method = method;
        self
    }

    /// Request target.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.inner.uri = uri;
        self
    }

    /// Replaces every header.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.headers = headers;
        self
    }

    /// Appends one header. Names or values that are not valid HTTP are
    /// ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<header::HeaderName>(),
            value.parse::<header::HeaderValue>(),
        ) {
            self.inner.headers.append(name, value);
        }
        self
    }

    /// Buffered body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    /// Replaces every path parameter.
    #[must_use]
    pub fn path_params(mut self, params: PathParams) -> Self {
        self.inner.path_params = params;
        self
    }

    /// Captures one path parameter.
    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.path_params.push(name, value);
        self
    }

    /// Binder the extractors will use.
    #[must_use]
    pub fn binder(mut self, binder: Binder) -> Self {
        self.inner.binder = binder;
        self
    }

    /// Finishes the context.
    #[must_use]
    pub fn build(self) -> ExtractionContext {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinax_bind::ValueGetter;
    use pinax_core::{BindConfig, ErrorMode};

    #[test]
    fn test_from_request_keeps_every_part() {
        let request = Request::post("/carts/7/items?merge=true")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{\"sku\":\"A-1\"}"))
            .unwrap();
        let params: PathParams = [("cart", "7")].into_iter().collect();

        let ctx = ExtractionContext::from_request(request, params);
        assert_eq!(ctx.method(), &Method::POST);
        assert_eq!(ctx.path(), "/carts/7/items");
        assert_eq!(ctx.query_string(), Some("merge=true"));
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(&ctx.body()[..], b"{\"sku\":\"A-1\"}");
        assert_eq!(ctx.path_params().get("cart"), Some("7"));
    }

    #[test]
    fn test_builder_appends_repeated_headers() {
        let ctx = ExtractionContext::builder()
            .header("x-trace", "a")
            .header("x-trace", "b")
            .header("bad header", "ignored")
            .path_param("cart", "1")
            .path_param("cart", "2")
            .build();

        assert_eq!(ctx.headers().get_all("x-trace").iter().count(), 2);
        assert_eq!(ctx.headers().len(), 2);
        assert_eq!(ctx.path_params().get("cart"), Some("2"));
        assert_eq!(ctx.method(), &Method::GET);
        assert_eq!(ctx.path(), "/");
        assert!(ctx.is_body_empty());
    }

    #[test]
    fn test_binder_override() {
        let binder = Binder::new(BindConfig::builder().error_mode(ErrorMode::CollectAll).build());
        let ctx = ExtractionContext::default().with_binder(binder);
        assert_eq!(ctx.binder().config().settings().error_mode, ErrorMode::CollectAll);
    }
}
