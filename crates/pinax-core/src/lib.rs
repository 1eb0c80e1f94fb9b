//! # Pinax Core
//!
//! Struct metadata, tag parsing and value conversion for the pinax binding
//! library.
//!
//! This crate holds everything the binder needs to know about a destination
//! type before it looks at any input:
//!
//! | Item | Role |
//! |------|------|
//! | [`FieldType`], [`TypeShape`] | Classification of declared field types |
//! | [`Bindable`], [`StructSchema`] | The declared fields of a destination struct |
//! | [`StructTag`], [`parse_struct`] | Go-style struct-tag parsing |
//! | [`TypeRegistry`], [`StructInfo`] | Per (type, namespace) metadata cache |
//! | [`convert_value`] | The string-to-value conversion engine |
//! | [`BindConfig`], [`BindSettings`] | Limits, modes, converters and hooks |
//! | [`Error`], [`BindError`] | The error taxonomy |
//!
//! Most users derive [`Bindable`] with `#[derive(Bind)]` from the `pinax`
//! crate and never touch these types directly.
//!
//! ## Example
//!
//! ```rust
//! use pinax_core::{BindConfig, FieldType, convert_value};
//! use std::time::Duration;
//!
//! let config = BindConfig::default();
//! let value = convert_value("1m30s", &Duration::shape(), &config).unwrap();
//! assert_eq!(*value.downcast::<Duration>().unwrap(), Duration::from_secs(90));
//! ```

#![doc(html_root_url = "https://docs.rs/pinax-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod convert;
mod error;
mod file;
mod hooks;
mod metadata;
mod net;
mod registry;
mod schema;
mod shape;
mod tag;

pub use config::{
    BindConfig, BindConfigBuilder, BindSettings, Converter, ErrorMode, SettingsError, SliceMode,
    UnknownFieldPolicy, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MAP_SIZE, DEFAULT_MAX_SLICE_LEN,
};
pub use convert::{convert_into, convert_value, parse_bool, parse_datetime, parse_duration, ConvertError};
pub use error::{
    BindError, BindErrorKind, Error, LimitError, LimitKind, MultiError, Result, UnknownFieldError,
};
pub use file::UploadedFile;
pub use hooks::{validate_with, BindHooks, BindStats, FieldEvent, FnValidator, Validator};
pub use metadata::{FieldKind, FieldMetadata, StructInfo};
pub use net::{IpNetwork, IpNetworkError};
pub use registry::TypeRegistry;
pub use schema::{Bindable, FieldAccessor, FieldDecl, SchemaBuilder, StructSchema};
pub use shape::{
    BoxError, BoxedValue, FieldType, KnownType, LeafRepr, LeafShape, ListShape, MapShape,
    NestedShape, OptionalShape, Primitive, ShapeKind, TextUnmarshal, TypeShape,
};
pub use tag::{is_body_namespace, parse_struct, StructTag, BODY_NAMESPACES};
