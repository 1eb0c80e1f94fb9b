//! Struct-info cache.
//!
//! The registry maps (struct type, tag namespace) to the parsed
//! [`StructInfo`]. Entries are created on first use and live for the rest of
//! the process; the key space is bounded by the struct types compiled into
//! the program.
//!
//! Reads clone the current snapshot `Arc` under a briefly held read lock and
//! never wait on a parse. A miss takes the writer mutex, checks again, parses,
//! and publishes a new map that contains the old entries plus the new one, so
//! readers never observe a partially updated map.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::metadata::StructInfo;
use crate::schema::{Bindable, StructSchema};
use crate::tag::parse_struct;

type Snapshot = HashMap<(TypeId, Box<str>), Arc<StructInfo>>;

/// Cache of parsed struct metadata.
#[derive(Default)]
pub struct TypeRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
    parses: AtomicUsize,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the binder.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Metadata for `T` under `namespace`.
    ///
    /// # Panics
    ///
    /// Panics if `namespace` is empty.
    pub fn struct_info<T: Bindable>(&self, namespace: &str) -> Arc<StructInfo> {
        self.struct_info_for(TypeId::of::<T>(), T::schema, namespace)
    }

    /// Metadata for the struct identified by `type_id`, whose schema is
    /// produced by `schema` on a miss.
    ///
    /// # Panics
    ///
    /// Panics if `namespace` is empty.
    pub fn struct_info_for(
        &self,
        type_id: TypeId,
        schema: fn() -> StructSchema,
        namespace: &str,
    ) -> Arc<StructInfo> {
        assert!(
            !namespace.is_empty(),
            "struct info requested with an empty tag namespace"
        );

        let key = (type_id, Box::<str>::from(namespace));
        if let Some(info) = self.snapshot.read().get(&key) {
            return Arc::clone(info);
        }

        let _writer = self.writer.lock();
        if let Some(info) = self.snapshot.read().get(&key) {
            return Arc::clone(info);
        }

        let schema = schema();
        let info = Arc::new(parse_struct(&schema, namespace));
        self.parses.fetch_add(1, Ordering::Relaxed);
        debug!(
            type_name = info.type_name(),
            namespace,
            fields = info.fields().len(),
            "parsed struct metadata"
        );

        let current = Arc::clone(&self.snapshot.read());
        let mut next = Snapshot::clone(&current);
        next.insert(key, Arc::clone(&info));
        *self.snapshot.write() = Arc::new(next);
        info
    }

    /// Number of cached (type, namespace) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Returns true if nothing has been parsed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times a struct was parsed. Each (type, namespace) pair is
    /// parsed at most once.
    #[must_use]
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("entries", &self.len())
            .field("parses", &self.parse_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::shape::{FieldType, TypeShape};
    use std::thread;

    #[derive(Default)]
    struct Filter {
        q: String,
        limit: u32,
    }

    impl FieldType for Filter {
        fn shape() -> TypeShape {
            TypeShape::nested::<Self>()
        }
    }

    impl Bindable for Filter {
        fn schema() -> StructSchema {
            SchemaBuilder::<Self>::new()
                .field("q", r#"query:"q""#, |f| &mut f.q)
                .field("limit", r#"query:"limit" form:"limit""#, |f| &mut f.limit)
                .build()
        }
    }

    #[test]
    fn test_parses_once_per_namespace() {
        let registry = TypeRegistry::new();
        let a = registry.struct_info::<Filter>("query");
        let b = registry.struct_info::<Filter>("query");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.parse_count(), 1);

        let form = registry.struct_info::<Filter>("form");
        assert_eq!(form.fields().len(), 1);
        assert_eq!(registry.parse_count(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_first_use() {
        let registry = Arc::new(TypeRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.struct_info::<Filter>("query"))
            })
            .collect();
        let infos: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.parse_count(), 1);
        for info in &infos {
            assert!(Arc::ptr_eq(info, &infos[0]));
        }
        let single = TypeRegistry::new().struct_info::<Filter>("query");
        let keys = |info: &StructInfo| {
            info.fields()
                .iter()
                .map(|f| f.primary_key().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&infos[0]), keys(&single));
    }

    #[test]
    #[should_panic(expected = "empty tag namespace")]
    fn test_empty_namespace_panics() {
        let registry = TypeRegistry::new();
        let _ = registry.struct_info::<Filter>("");
    }

    #[test]
    fn test_global_is_shared() {
        let a = TypeRegistry::global() as *const TypeRegistry;
        let b = TypeRegistry::global() as *const TypeRegistry;
        assert_eq!(a, b);
    }
}
