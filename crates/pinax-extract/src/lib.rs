//! # Pinax Extract
//!
//! HTTP request source adapters and typed extractors for pinax binding.
//!
//! Every part of a request is exposed as a [`ValueGetter`](pinax_bind::ValueGetter)
//! so the binder can read it, and wrapped in an extractor that binds a
//! [`Bindable`](pinax_core::Bindable) struct from it.
//!
//! ## Sources
//!
//! | Source | Extractor | Namespace | Reads |
//! |--------|-----------|-----------|-------|
//! | [`PathParams`] | [`Path<T>`] | `path` | Router parameters |
//! | [`QueryValues`] | [`Query<T>`] | `query` | URL query string |
//! | [`FormValues`] | [`Form<T>`] | `form` | URL-encoded body |
//! | [`HeaderValues`] | [`Headers<T>`] | `header` | Request headers |
//! | [`CookieValues`] | [`Cookies<T>`] | `cookie` | `Cookie` header |
//! | [`MultipartValues`] | [`bind_multipart`] | `form` | `multipart/form-data` body |
//! | n/a | [`Json<T>`] | `json` | JSON body |
//! | several | [`Bind<T>`] | all | Path, query, headers, cookies and the body |
//!
//! ## Example
//!
//! ```rust
//! use pinax_core::{Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
//! use pinax_extract::{ExtractionContext, FromRequest, Query};
//!
//! #[derive(Default)]
//! struct ListParams {
//!     limit: u32,
//!     tags: Vec<String>,
//! }
//!
//! impl FieldType for ListParams {
//!     fn shape() -> TypeShape {
//!         TypeShape::nested::<Self>()
//!     }
//! }
//!
//! impl Bindable for ListParams {
//!     fn schema() -> StructSchema {
//!         SchemaBuilder::<Self>::new()
//!             .field("limit", r#"query:"limit" default:"20""#, |p| &mut p.limit)
//!             .field("tags", r#"query:"tag""#, |p| &mut p.tags)
//!             .build()
//!     }
//! }
//!
//! let ctx = ExtractionContext::builder()
//!     .uri("/items?tag=a&tag=b".parse().unwrap())
//!     .build();
//!
//! let Query(params) = Query::<ListParams>::from_request(&ctx).unwrap();
//! assert_eq!(params.limit, 20);
//! assert_eq!(params.tags, ["a", "b"]);
//! ```
//!
//! ## Error Handling
//!
//! Extractors return [`Rejection`], which carries the binder's error and
//! maps it to an HTTP status code.

#![doc(html_root_url = "https://docs.rs/pinax-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Implements `ValueGetter` for a source that stores its pairs in a
/// `ValueMap` field.
macro_rules! delegate_value_getter {
    ($source:ty, $field:ident) => {
        impl pinax_bind::ValueGetter for $source {
            fn get(&self, key: &str) -> Option<&str> {
                self.$field.get(key)
            }

            fn get_all(&self, key: &str) -> Vec<&str> {
                self.$field.get_all(key)
            }

            fn has(&self, key: &str) -> bool {
                self.$field.has(key)
            }

            fn keys(&self) -> Vec<&str> {
                self.$field.keys()
            }

            fn approx_count(&self, prefix: &str) -> Option<usize> {
                self.$field.approx_count(prefix)
            }
        }
    };
}

mod bind;
mod context;
mod cookie;
mod error;
mod extractor;
mod form;
mod header;
mod json;
mod multipart;
mod params;
mod path;
mod query;

pub use bind::Bind;
pub use context::{ExtractionContext, ExtractionContextBuilder};
pub use cookie::{CookieValues, Cookies};
pub use error::{Rejection, RequestSource};
pub use extractor::FromRequest;
pub use form::{Form, FormValues, DEFAULT_FORM_LIMIT};
pub use header::{HeaderValues, Headers};
pub use json::{Json, DEFAULT_JSON_LIMIT};
pub use multipart::{bind_multipart, MultipartConfig, MultipartValues};
pub use params::PathParams;
pub use path::Path;
pub use query::{Query, QueryValues};
