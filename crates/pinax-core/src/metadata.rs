//! Cached field metadata.
//!
//! Produced once per (struct type, tag namespace) by the tag parser and
//! shared read-only by every bind afterwards.

use std::any::Any;
use std::fmt;

use crate::schema::FieldAccessor;
use crate::shape::{BoxedValue, OptionalShape, ShapeKind, TypeShape};

/// How the binder treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Converted from a single value.
    Scalar,
    /// `Vec<T>`, one element per value.
    Slice,
    /// String-keyed map.
    Map,
    /// Nested struct bound through a prefix-scoped view.
    Struct,
    /// Uploaded file.
    File,
}

impl FieldKind {
    /// Classifies a declared type, looking through one `Option`.
    #[must_use]
    pub fn of(shape: &TypeShape) -> Self {
        match shape.pointee().kind() {
            ShapeKind::List(_) => Self::Slice,
            ShapeKind::Map(_) => Self::Map,
            ShapeKind::Struct(_) => Self::Struct,
            ShapeKind::File => Self::File,
            ShapeKind::Leaf(_) | ShapeKind::Optional(_) | ShapeKind::Unsupported(_) => Self::Scalar,
        }
    }
}

/// One hop from a struct value to a field, through an embedded struct.
#[derive(Clone)]
pub(crate) struct AccessStep {
    pub(crate) access: FieldAccessor,
    /// Set when the hop passes through an embedded `Option<Struct>`.
    pub(crate) through: Option<OptionalShape>,
}

/// Binding description of one field.
pub struct FieldMetadata {
    pub(crate) index_path: Vec<usize>,
    pub(crate) steps: Vec<AccessStep>,
    pub(crate) field_name: String,
    pub(crate) primary_key: String,
    pub(crate) alias_keys: Vec<String>,
    pub(crate) kind: FieldKind,
    pub(crate) is_optional: bool,
    pub(crate) shape: TypeShape,
    pub(crate) elem_kind: Option<FieldKind>,
    pub(crate) default_raw: Option<String>,
    pub(crate) default_typed: Option<BoxedValue>,
    pub(crate) enum_values: Vec<String>,
    pub(crate) required: bool,
}

impl FieldMetadata {
    /// Field indices from the root struct to this field.
    #[must_use]
    pub fn index_path(&self) -> &[usize] {
        &self.index_path
    }

    /// Declared field name, used in error messages.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// The primary lookup key.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Alias keys tried in order when the primary key is absent.
    #[must_use]
    pub fn alias_keys(&self) -> &[String] {
        &self.alias_keys
    }

    /// The binding classification.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Returns true if the declared type is `Option<T>`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.is_optional
    }

    /// Shape of the declared type.
    #[must_use]
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Classification of slice elements.
    #[must_use]
    pub fn elem_kind(&self) -> Option<FieldKind> {
        self.elem_kind
    }

    /// The raw `default` tag value.
    #[must_use]
    pub fn default_raw(&self) -> Option<&str> {
        self.default_raw.as_deref()
    }

    /// Returns true if the default was converted when the tag was parsed.
    #[must_use]
    pub fn has_typed_default(&self) -> bool {
        self.default_typed.is_some()
    }

    /// A fresh copy of the precomputed default, typed as the pointee.
    #[must_use]
    pub fn typed_default(&self) -> Option<BoxedValue> {
        let value = self.default_typed.as_deref()?;
        match self.shape.pointee().kind() {
            ShapeKind::Leaf(leaf) => leaf.duplicate(value),
            _ => None,
        }
    }

    /// Allowed values; empty when unconstrained.
    #[must_use]
    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    /// Returns true for `required:"true"`.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Borrows this field out of the root struct, allocating embedded
    /// `Option` structs on the way.
    pub fn resolve<'a>(&self, root: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let mut current = root;
        for step in &self.steps {
            let field = (step.access)(current)?;
            current = match &step.through {
                Some(opt) => opt.ensure(field)?,
                None => field,
            };
        }
        Some(current)
    }
}

impl fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("index_path", &self.index_path)
            .field("field_name", &self.field_name)
            .field("primary_key", &self.primary_key)
            .field("alias_keys", &self.alias_keys)
            .field("kind", &self.kind)
            .field("is_optional", &self.is_optional)
            .field("type", &self.shape.name())
            .field("elem_kind", &self.elem_kind)
            .field("default_raw", &self.default_raw)
            .field("has_typed_default", &self.default_typed.is_some())
            .field("enum_values", &self.enum_values)
            .field("required", &self.required)
            .finish()
    }
}

/// Ordered field metadata for one (struct type, tag namespace) pair.
#[derive(Debug)]
pub struct StructInfo {
    pub(crate) type_name: &'static str,
    pub(crate) namespace: String,
    pub(crate) fields: Vec<FieldMetadata>,
}

impl StructInfo {
    /// Name of the struct.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The tag namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fields participating in this namespace, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    /// Returns true if the struct declares nothing for this namespace.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a field up by its primary key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|field| field.primary_key == key)
    }
}
