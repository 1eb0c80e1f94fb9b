//! Bind entry points and the reusable [`Binder`] handle.

use std::sync::Arc;

use pinax_core::{Bindable, BindConfig, BindConfigBuilder, BindStats, Error, Result, TypeRegistry};
use serde::de::DeserializeOwned;

use crate::codec::{decode_body, BodyFormat};
use crate::field::{BindRun, FieldBinder};
use crate::getter::ValueGetter;
use crate::sources::Sources;

/// Binds the fields of `dest` declared under `namespace` from `getter`, then
/// runs the configured validator.
///
/// Fields the source does not supply keep their current value unless a
/// `default` is declared.
///
/// # Errors
///
/// Fail-fast mode returns the first field error; collect-all mode returns
/// them together. [`Error::Structural`] for an empty namespace.
///
/// # Example
///
/// ```rust
/// use pinax_bind::{bind, ValueMap};
/// use pinax_core::{BindConfig, Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
///
/// #[derive(Default)]
/// struct Page {
///     page: u32,
///     size: u32,
/// }
///
/// impl FieldType for Page {
///     fn shape() -> TypeShape {
///         TypeShape::nested::<Self>()
///     }
/// }
///
/// impl Bindable for Page {
///     fn schema() -> StructSchema {
///         SchemaBuilder::<Self>::new()
///             .field("page", r#"query:"page,p""#, |p| &mut p.page)
///             .field("size", r#"query:"size" default:"20""#, |p| &mut p.size)
///             .build()
///     }
/// }
///
/// let values = ValueMap::from_pairs([("p", "3")]);
/// let mut page = Page::default();
/// bind(&mut page, &values, "query", &BindConfig::default()).unwrap();
/// assert_eq!((page.page, page.size), (3, 20));
/// ```
pub fn bind<T: Bindable>(
    dest: &mut T,
    getter: &dyn ValueGetter,
    namespace: &str,
    config: &BindConfig,
) -> Result<()> {
    bind_in(TypeRegistry::global(), dest, getter, namespace, config)
}

/// [`bind`] against a specific registry.
///
/// # Errors
///
/// As [`bind`].
pub fn bind_in<T: Bindable>(
    registry: &TypeRegistry,
    dest: &mut T,
    getter: &dyn ValueGetter,
    namespace: &str,
    config: &BindConfig,
) -> Result<()> {
    let mut run = BindRun::new(config);
    bind_fields(registry, dest, getter, namespace, config, &mut run.stats)?;
    run.validate(dest)
}

/// Decodes a body into `dest`, replacing its previous contents, then runs
/// the configured validator.
///
/// # Errors
///
/// [`Error::Decode`], [`Error::UnknownFields`] or [`Error::Validation`].
pub fn bind_body<T>(dest: &mut T, bytes: &[u8], format: BodyFormat, config: &BindConfig) -> Result<()>
where
    T: Bindable + DeserializeOwned,
{
    let mut run = BindRun::new(config);
    *dest = decode_body(bytes, format, config, TypeRegistry::global()).map_err(|err| run.fail(err))?;
    run.validate(dest)
}

/// Binds one namespace without running the validator.
pub(crate) fn bind_fields<T: Bindable>(
    registry: &TypeRegistry,
    dest: &mut T,
    getter: &dyn ValueGetter,
    namespace: &str,
    config: &BindConfig,
    stats: &mut BindStats,
) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::structural("tag namespace must not be empty"));
    }
    let info = registry.struct_info::<T>(namespace);
    FieldBinder::new(registry, config, namespace, stats).run(dest, &info, getter)
}

/// A long-lived binding configuration shared across calls.
///
/// Cloning is cheap. [`Binder::with`] derives a per-call variant without
/// touching the shared configuration.
///
/// ```rust
/// use pinax_bind::Binder;
/// use pinax_core::{BindConfig, ErrorMode};
///
/// let shared = Binder::new(BindConfig::builder().max_slice_len(50).build());
/// let strict = shared.with(|b| b.error_mode(ErrorMode::CollectAll));
///
/// assert_eq!(shared.config().settings().error_mode, ErrorMode::FailFast);
/// assert_eq!(strict.config().settings().error_mode, ErrorMode::CollectAll);
/// assert_eq!(strict.config().settings().max_slice_len, 50);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: Arc<BindConfig>,
}

impl Binder {
    /// Wraps a configuration.
    #[must_use]
    pub fn new(config: BindConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The shared configuration.
    #[must_use]
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// A binder whose configuration is a copy of this one with `overlay`
    /// applied.
    #[must_use]
    pub fn with(&self, overlay: impl FnOnce(BindConfigBuilder) -> BindConfigBuilder) -> Self {
        Self::new(overlay(self.config.to_builder()).build())
    }

    /// See [`bind`].
    ///
    /// # Errors
    ///
    /// As [`bind`].
    pub fn bind<T: Bindable>(&self, dest: &mut T, getter: &dyn ValueGetter, namespace: &str) -> Result<()> {
        bind(dest, getter, namespace, &self.config)
    }

    /// See [`bind_body`].
    ///
    /// # Errors
    ///
    /// As [`bind_body`].
    pub fn bind_body<T>(&self, dest: &mut T, bytes: &[u8], format: BodyFormat) -> Result<()>
    where
        T: Bindable + DeserializeOwned,
    {
        bind_body(dest, bytes, format, &self.config)
    }

    /// Starts a multi-source bind.
    #[must_use]
    pub fn sources<'a, T: Bindable>(&'a self) -> Sources<'a, T> {
        Sources::new(&self.config)
    }
}
