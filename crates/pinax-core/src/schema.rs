//! Struct schemas.
//!
//! A [`StructSchema`] is the reflected view of a destination struct: its
//! declared fields in order, each with its raw struct-tag string, its
//! [`TypeShape`] and an accessor that borrows the field out of a type-erased
//! struct value. `#[derive(Bind)]` generates the schema; hand-written
//! implementations use [`SchemaBuilder`].
//!
//! ```rust
//! use pinax_core::{Bindable, FieldType, SchemaBuilder, StructSchema, TypeShape};
//!
//! #[derive(Default)]
//! struct Page {
//!     number: u32,
//!     size: u32,
//! }
//!
//! impl FieldType for Page {
//!     fn shape() -> TypeShape {
//!         TypeShape::nested::<Self>()
//!     }
//! }
//!
//! impl Bindable for Page {
//!     fn schema() -> StructSchema {
//!         SchemaBuilder::<Self>::new()
//!             .field("number", r#"query:"page" default:"1""#, |p| &mut p.number)
//!             .field("size", r#"query:"size,per_page""#, |p| &mut p.size)
//!             .build()
//!     }
//! }
//!
//! assert_eq!(Page::schema().fields().len(), 2);
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::shape::{FieldType, TypeShape};

/// A destination struct.
pub trait Bindable: FieldType + Default {
    /// Describes the struct's declared fields.
    fn schema() -> StructSchema;
}

/// Borrows one field out of a type-erased struct value.
pub type FieldAccessor = Arc<dyn Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync>;

/// One declared field.
#[derive(Clone)]
pub struct FieldDecl {
    name: &'static str,
    tag: Cow<'static, str>,
    shape: TypeShape,
    access: FieldAccessor,
    flatten: bool,
    skip: bool,
}

impl FieldDecl {
    /// Declared field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Raw struct-tag string.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Shape of the declared type.
    #[must_use]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// The field accessor.
    #[must_use]
    pub fn accessor(&self) -> &FieldAccessor {
        &self.access
    }

    /// Embedded field whose own fields bind as if declared on the parent.
    #[must_use]
    pub fn is_flattened(&self) -> bool {
        self.flatten
    }

    /// Field that never binds.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.skip
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("shape", &self.shape)
            .field("flatten", &self.flatten)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

/// The declared fields of a struct, in declaration order.
#[derive(Debug, Clone)]
pub struct StructSchema {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldDecl>,
}

impl StructSchema {
    /// `TypeId` of the struct.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the struct.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared fields.
    #[must_use]
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }
}

/// Pins a closure to the higher-ranked accessor signature.
fn accessor<A>(access: A) -> A
where
    A: Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync + 'static,
{
    access
}

/// Builds a [`StructSchema`] for `S`.
pub struct SchemaBuilder<S> {
    fields: Vec<FieldDecl>,
    _struct: PhantomData<fn() -> S>,
}

impl<S: Any> Default for SchemaBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Any> SchemaBuilder<S> {
    /// Starts an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            _struct: PhantomData,
        }
    }

    fn push<F: FieldType>(
        mut self,
        name: &'static str,
        tag: impl Into<Cow<'static, str>>,
        get: fn(&mut S) -> &mut F,
        flatten: bool,
        skip: bool,
    ) -> Self {
        let access = accessor(move |target| {
            target
                .downcast_mut::<S>()
                .map(|target| get(target) as &mut dyn Any)
        });
        self.fields.push(FieldDecl {
            name,
            tag: tag.into(),
            shape: F::shape(),
            access: Arc::new(access),
            flatten,
            skip,
        });
        self
    }

    /// Declares a field with its struct-tag string.
    #[must_use]
    pub fn field<F: FieldType>(
        self,
        name: &'static str,
        tag: impl Into<Cow<'static, str>>,
        get: fn(&mut S) -> &mut F,
    ) -> Self {
        self.push(name, tag, get, false, false)
    }

    /// Declares an embedded struct (or `Option` of one) whose fields are
    /// flattened into this struct.
    #[must_use]
    pub fn flatten<F: FieldType>(
        self,
        name: &'static str,
        tag: impl Into<Cow<'static, str>>,
        get: fn(&mut S) -> &mut F,
    ) -> Self {
        self.push(name, tag, get, true, false)
    }

    /// Declares a field that never binds.
    #[must_use]
    pub fn skip<F: FieldType>(self, name: &'static str, get: fn(&mut S) -> &mut F) -> Self {
        self.push(name, "", get, false, true)
    }

    /// Finishes the schema.
    #[must_use]
    pub fn build(self) -> StructSchema {
        StructSchema {
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>()
                .rsplit("::")
                .next()
                .unwrap_or_default(),
            fields: self.fields,
        }
    }
}
