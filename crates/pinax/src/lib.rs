//! # Pinax
//!
//! **Tag-driven binding of request data into Rust structs**
//!
//! Pinax fills struct fields from untyped string sources (query strings,
//! path parameters, forms, headers, cookies, multipart bodies) and from
//! JSON, XML or YAML bodies. Each field declares, per source, which keys
//! feed it:
//!
//! ```rust
//! use pinax::prelude::*;
//!
//! #[derive(Bind, Debug, Default)]
//! struct ListOrders {
//!     #[bind(path = "customer")]
//!     customer: u64,
//!     #[bind(query = "page,p", default = "1")]
//!     page: u32,
//!     #[bind(query = "status", enum = "open,shipped")]
//!     status: Option<String>,
//!     #[bind(query = "tag")]
//!     tags: Vec<String>,
//!     #[bind(header = "X-Tenant", required)]
//!     tenant: String,
//! }
//!
//! let path = ValueMap::from_pairs([("customer", "42")]);
//! let query = ValueMap::from_pairs([("p", "3"), ("tag", "gift"), ("tag", "eu")]);
//! let headers = ValueMap::from_pairs([("X-Tenant", "acme")]);
//!
//! let config = BindConfig::builder().check_required(true).build();
//! let mut orders = ListOrders::default();
//! Sources::new(&config)
//!     .values(&path, "path")
//!     .values(&query, "query")
//!     .values(&headers, "header")
//!     .bind(&mut orders)?;
//!
//! assert_eq!(orders.customer, 42);
//! assert_eq!(orders.page, 3);
//! assert_eq!(orders.status, None);
//! assert_eq!(orders.tags, ["gift", "eu"]);
//! # Ok::<(), pinax::Error>(())
//! ```
//!
//! ## Crates
//!
//! | Crate | Re-exported as | Contents |
//! |-------|----------------|----------|
//! | `pinax-core` | crate root | Shapes, schemas, registry, tags, conversion, config, errors |
//! | `pinax-bind` | crate root | Sources, binder, body codecs, multi-source binding |
//! | `pinax-extract` | [`extract`] | HTTP source adapters and extractors |
//! | `pinax-macros` | [`Bind`] | `#[derive(Bind)]` |
//!
//! ## Behaviour
//!
//! - Defaults apply only when a key is absent; a present empty value is
//!   left alone, and `Option` fields stay `None`.
//! - Struct nesting depth, slice length and map size are limited (see
//!   [`BindSettings`]).
//! - Fail-fast mode stops at the first field error; collect-all mode
//!   returns every field error together.
//! - Struct metadata is parsed once per type and tag namespace and shared
//!   across threads.

#![doc(html_root_url = "https://docs.rs/pinax/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use pinax_core::*;

pub use pinax_bind::{
    bind, bind_body, bind_in, decode_body, decode_json_reader, Binder, BodyFormat, FileError,
    FileGetter, JsonField, JsonFieldTrie, PrefixedGetter, Sources, ValueGetter, ValueMap,
};

/// Derives [`FieldType`] and [`Bindable`] from `#[bind(...)]` attributes.
pub use pinax_macros::Bind;

// HTTP source adapters and extractors
pub use pinax_extract as extract;

/// Prelude module for convenient imports.
///
/// ```rust
/// use pinax::prelude::*;
///
/// #[derive(Bind, Default)]
/// struct Page {
///     #[bind(query = "page", default = "1")]
///     page: u32,
/// }
///
/// let mut page = Page::default();
/// bind(&mut page, &ValueMap::new(), "query", &BindConfig::default()).unwrap();
/// assert_eq!(page.page, 1);
/// ```
pub mod prelude {
    pub use crate::{
        bind, BindConfig, Bindable, Binder, BodyFormat, Error, ErrorMode, FieldType, SliceMode,
        Sources, UnknownFieldPolicy, UploadedFile, ValueGetter, ValueMap,
    };

    pub use pinax_macros::Bind;

    pub use pinax_extract::{
        bind_multipart, Cookies, ExtractionContext, Form, FromRequest, Headers, Json, Path, Query,
        Rejection,
    };
}
