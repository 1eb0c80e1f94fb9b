//! # Pinax Bind
//!
//! The binding engine: reads untyped key/value sources and body payloads into
//! [`Bindable`](pinax_core::Bindable) structs.
//!
//! | Item | Role |
//! |------|------|
//! | [`ValueGetter`], [`FileGetter`] | What a source must provide |
//! | [`ValueMap`] | In-memory multimap source |
//! | [`PrefixedGetter`] | Prefix-scoped view used for nested structs |
//! | [`bind`], [`Binder`] | Bind one key/value source |
//! | [`bind_body`], [`BodyFormat`] | Decode a JSON, XML or YAML body |
//! | [`Sources`] | Bind several sources into one struct, in order |
//! | [`JsonFieldTrie`] | Unknown JSON field detection |
//!
//! ## Key notation
//!
//! Nested structs read `address.city`. Maps read `meta.key`, `meta[key]`,
//! `meta["dotted.key"]`, or a JSON object under `meta`. Slices of structs
//! read `items[0].name` or `items.0.name`. Scalar slices read repeated keys,
//! or one comma-separated value in CSV mode.
//!
//! ## Limits
//!
//! Struct nesting, slice length and map size are bounded by
//! [`BindSettings`](pinax_core::BindSettings). Exceeding the depth limit
//! always aborts the bind; slice and map limits are reported per field.

#![doc(html_root_url = "https://docs.rs/pinax-bind/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod binder;
mod codec;
mod field;
mod getter;
mod keys;
mod scoped;
mod sources;
mod unknown;

pub use binder::{bind, bind_body, bind_in, Binder};
pub use codec::{decode_body, decode_json_reader, BodyFormat};
pub use getter::{FileError, FileGetter, ValueGetter, ValueMap};
pub use scoped::PrefixedGetter;
pub use sources::Sources;
pub use unknown::{JsonField, JsonFieldTrie};
