//! Multi-source binding.
//!
//! [`Sources`] applies an ordered list of sources to one destination. Each
//! key/value source binds the fields tagged with its namespace; a body source
//! decodes the whole struct. Sources are applied in the order they were
//! added, so a later source overwrites fields an earlier one set.

use std::fmt;
use std::io::Read;

use pinax_core::{
    Bindable, BindConfig, BindStats, Error, ErrorMode, MultiError, Result, TypeRegistry,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::binder::bind_fields;
use crate::codec::{decode_body, decode_json_reader, BodyFormat};
use crate::field::BindRun;
use crate::getter::ValueGetter;

type Step<'a, T> =
    Box<dyn FnOnce(&mut T, &BindConfig, &TypeRegistry, &mut BindStats) -> Result<()> + 'a>;

/// An ordered set of sources for one bind call.
///
/// ```rust
/// use pinax_bind::{Sources, ValueMap};
/// use pinax_core::{BindConfig, Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
///
/// #[derive(Default)]
/// struct Lookup {
///     id: u64,
///     verbose: bool,
/// }
///
/// impl FieldType for Lookup {
///     fn shape() -> TypeShape {
///         TypeShape::nested::<Self>()
///     }
/// }
///
/// impl Bindable for Lookup {
///     fn schema() -> StructSchema {
///         SchemaBuilder::<Self>::new()
///             .field("id", r#"path:"id""#, |l| &mut l.id)
///             .field("verbose", r#"query:"verbose""#, |l| &mut l.verbose)
///             .build()
///     }
/// }
///
/// let path = ValueMap::from_pairs([("id", "42")]);
/// let query = ValueMap::from_pairs([("verbose", "yes")]);
/// let config = BindConfig::default();
///
/// let mut lookup = Lookup::default();
/// Sources::new(&config)
///     .values(&path, "path")
///     .values(&query, "query")
///     .bind(&mut lookup)
///     .unwrap();
/// assert_eq!((lookup.id, lookup.verbose), (42, true));
/// ```
pub struct Sources<'a, T> {
    config: &'a BindConfig,
    registry: &'a TypeRegistry,
    steps: Vec<(&'a str, Step<'a, T>)>,
}

impl<'a, T: Bindable> Sources<'a, T> {
    /// Starts an empty source list.
    #[must_use]
    pub fn new(config: &'a BindConfig) -> Self {
        Self {
            config,
            registry: TypeRegistry::global(),
            steps: Vec::new(),
        }
    }

    /// Uses `registry` instead of the process-wide one.
    #[must_use]
    pub fn registry(mut self, registry: &'a TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a key/value source for the fields tagged with `namespace`.
    ///
    /// The source is skipped when `T` declares no field for the namespace.
    #[must_use]
    pub fn values(mut self, getter: &'a dyn ValueGetter, namespace: &'a str) -> Self {
        let step: Step<'a, T> = Box::new(move |dest, config, registry, stats| {
            if !namespace.is_empty() && registry.struct_info::<T>(namespace).is_empty() {
                debug!(
                    namespace,
                    type_name = std::any::type_name::<T>(),
                    "destination declares no fields for source, skipping"
                );
                return Ok(());
            }
            bind_fields(registry, dest, getter, namespace, config, stats)
        });
        self.steps.push((namespace, step));
        self
    }

    /// Number of sources added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if no source was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every source in order, then runs the validator once.
    ///
    /// In collect-all mode errors from all sources are returned together in
    /// one [`Error::Multi`]; structural errors still stop immediately. The
    /// completion hook fires once with the counters of every source.
    ///
    /// # Errors
    ///
    /// The first error in fail-fast mode, the aggregate in collect-all mode,
    /// or the validator's verdict.
    pub fn bind(self, dest: &mut T) -> Result<()> {
        let mut run = BindRun::new(self.config);
        let collect = self.config.settings().error_mode == ErrorMode::CollectAll;
        let mut errors = MultiError::new();
        for (label, step) in self.steps {
            match step(dest, self.config, self.registry, &mut run.stats) {
                Ok(()) => {}
                Err(err @ Error::Structural { .. }) => return Err(err),
                Err(err) if collect => {
                    debug!(source = label, error = %err, "source failed, continuing");
                    errors.push(err);
                }
                Err(err) => return Err(err),
            }
        }
        if let Some(err) = errors.into_error() {
            return Err(err);
        }
        run.validate(dest)
    }
}

impl<'a, T: Bindable + DeserializeOwned> Sources<'a, T> {
    /// Adds a body source, which replaces everything bound before it.
    #[must_use]
    pub fn body(mut self, bytes: &'a [u8], format: BodyFormat) -> Self {
        let step: Step<'a, T> = Box::new(move |dest, config, registry, stats| {
            *dest = counted(stats, decode_body(bytes, format, config, registry))?;
            Ok(())
        });
        self.steps.push((format.name(), step));
        self
    }

    /// Adds a JSON body.
    #[must_use]
    pub fn json(self, bytes: &'a [u8]) -> Self {
        self.body(bytes, BodyFormat::Json)
    }

    /// Adds an XML body.
    #[must_use]
    pub fn xml(self, bytes: &'a [u8]) -> Self {
        self.body(bytes, BodyFormat::Xml)
    }

    /// Adds a YAML body.
    #[must_use]
    pub fn yaml(self, bytes: &'a [u8]) -> Self {
        self.body(bytes, BodyFormat::Yaml)
    }

    /// Adds a JSON body read from a stream.
    #[must_use]
    pub fn json_reader(mut self, reader: impl Read + 'a) -> Self {
        let step: Step<'a, T> = Box::new(move |dest, config, registry, stats| {
            *dest = counted(stats, decode_json_reader(reader, config, registry))?;
            Ok(())
        });
        self.steps.push(("json", step));
        self
    }
}

/// Body decodes are atomic, so they only add to the error count.
fn counted<T>(stats: &mut BindStats, decoded: Result<T>) -> Result<T> {
    if decoded.is_err() {
        stats.errors += 1;
    }
    decoded
}

impl<T> fmt::Debug for Sources<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.steps.iter().map(|(label, _)| *label).collect();
        f.debug_struct("Sources")
            .field("sources", &labels)
            .finish_non_exhaustive()
    }
}
