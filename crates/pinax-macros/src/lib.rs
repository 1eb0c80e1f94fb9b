//! Derive macro for pinax destination structs.
//!
//! `#[derive(Bind)]` implements `FieldType` and `Bindable` for a struct with
//! named fields. Field attributes become the struct-tag string the runtime
//! tag parser reads:
//!
//! ```rust,ignore
//! use pinax::Bind;
//!
//! #[derive(Bind, Default)]
//! struct ListUsers {
//!     #[bind(query = "page,p", default = "1")]
//!     page: u32,
//!     #[bind(query = "sort", enum = "asc,desc")]
//!     sort: Option<String>,
//!     #[bind(header = "X-Tenant", required)]
//!     tenant: String,
//!     #[bind(skip)]
//!     cache: Option<std::sync::Arc<Cache>>,
//! }
//! ```
//!
//! expands to a schema whose `page` field carries the tag
//! `query:"page,p" default:"1"`.
//!
//! # Attributes
//!
//! | Attribute | Effect |
//! |-----------|--------|
//! | `query`, `path`, `form`, `header`, `cookie`, `json` `= "name,alias,..."` | Keys for that source |
//! | `xml`, `yaml` `= "name"` | Body field name; must equal the Rust field name |
//! | `default = "..."` | Value used when the key is absent |
//! | `enum = "a,b"` | Allowed values for string fields |
//! | `required` | Fails the bind when absent (with required checking enabled) |
//! | `tag = "..."` | Raw tag text appended as is |
//! | `flatten` | Embedded struct whose fields bind as if declared here |
//! | `skip` | Field is not part of the schema |
//!
//! On the struct, `#[bind(crate = "path")]` changes where the generated code
//! finds the runtime items (default `::pinax`).

mod derive;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `FieldType` and `Bindable`.
///
/// Every field that is not marked `skip` must implement `FieldType`, and
/// the struct must implement `Default`.
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::expand_bind(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
