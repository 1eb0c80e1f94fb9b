//! Field type shapes.
//!
//! A [`TypeShape`] is the classification of a field's declared type. It is
//! produced once per type by [`FieldType::shape`], stored in the cached field
//! metadata, and dispatched on by the binder without ever inspecting the
//! concrete type again.
//!
//! Every shape carries the handful of type-erased operations the binder needs
//! (assign a converted value, wrap it in `Some`, push onto a `Vec`, insert into
//! a map, construct a default). These are plain function pointers
//! monomorphised for the concrete type, so a shape is cheap to clone and safe
//! to share between threads.
//!
//! # Example
//!
//! ```rust
//! use pinax_core::{FieldType, ShapeKind};
//!
//! let shape = <Option<Vec<u16>>>::shape();
//! assert!(shape.is_optional());
//! match shape.pointee().kind() {
//!     ShapeKind::List(list) => assert_eq!(list.elem().name(), "u16"),
//!     _ => unreachable!(),
//! }
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::file::UploadedFile;
use crate::net::IpNetwork;
use crate::schema::{Bindable, StructSchema};

/// A converted value waiting to be written into a field.
pub type BoxedValue = Box<dyn Any + Send + Sync>;

/// Boxed error used at the conversion and validation seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Types that can appear as the declared type of a bindable field.
///
/// Implemented for primitives, strings, the well-known leaf types
/// (`chrono` date-times, [`Duration`], [`url::Url`], IP addresses,
/// [`IpNetwork`], [`regex::Regex`]), [`UploadedFile`], and the containers
/// `Option<T>`, `Vec<T>`, `HashMap<K, V>` and `BTreeMap<K, V>`.
///
/// Destination structs get an implementation from `#[derive(Bind)]`.
/// Caller-defined leaf types implement it with one of the [`TypeShape`]
/// constructors:
///
/// ```rust
/// use pinax_core::{BoxError, FieldType, TextUnmarshal, TypeShape};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Level(u8);
///
/// impl TextUnmarshal for Level {
///     fn unmarshal_text(text: &str) -> Result<Self, BoxError> {
///         match text {
///             "low" => Ok(Level(1)),
///             "high" => Ok(Level(9)),
///             other => Err(format!("unknown level {other}").into()),
///         }
///     }
/// }
///
/// impl FieldType for Level {
///     fn shape() -> TypeShape {
///         TypeShape::text::<Self>()
///     }
/// }
/// ```
pub trait FieldType: Any + Send + Sync {
    /// Returns the classification of this type.
    fn shape() -> TypeShape;
}

/// The text-unmarshaling capability.
///
/// Types implementing this trait and registering their shape with
/// [`TypeShape::text`] are converted by delegating to
/// [`unmarshal_text`](TextUnmarshal::unmarshal_text) when no custom converter
/// and no well-known type matches.
pub trait TextUnmarshal: Sized {
    /// Parses a value from its textual form.
    fn unmarshal_text(text: &str) -> Result<Self, BoxError>;
}

/// Primitive kinds handled by the final stage of conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `String`
    Str,
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `i128`
    I128,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `u128`
    U128,
    /// `usize`
    Usize,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl Primitive {
    /// Returns true for the signed and unsigned integer kinds.
    #[must_use]
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Str | Self::Bool | Self::Char | Self::F32 | Self::F64)
    }

    /// Returns true for the unsigned integer kinds.
    #[must_use]
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 | Self::U128 | Self::Usize
        )
    }
}

/// Leaf types with bespoke parsing, matched by exact type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownType {
    /// `chrono::DateTime<FixedOffset>`
    DateTime,
    /// `chrono::DateTime<Utc>`
    DateTimeUtc,
    /// `chrono::NaiveDate`
    NaiveDate,
    /// `chrono::NaiveDateTime`
    NaiveDateTime,
    /// `std::time::Duration`
    Duration,
    /// `url::Url`
    Url,
    /// `std::net::IpAddr`
    IpAddr,
    /// `std::net::Ipv4Addr`
    Ipv4Addr,
    /// `std::net::Ipv6Addr`
    Ipv6Addr,
    /// [`IpNetwork`]
    IpNetwork,
    /// `regex::Regex`
    Regex,
}

/// How a leaf value is produced from text.
#[derive(Clone, Copy)]
pub enum LeafRepr {
    /// Primitive kind switch.
    Primitive(Primitive),
    /// Well-known type with bespoke parsing.
    Known(KnownType),
    /// Text-unmarshaling capability.
    Text(fn(&str) -> Result<BoxedValue, BoxError>),
    /// No built-in route; only a registered converter can produce it.
    Opaque,
}

impl fmt::Debug for LeafRepr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.debug_tuple("Primitive").field(p).finish(),
            Self::Known(k) => f.debug_tuple("Known").field(k).finish(),
            Self::Text(_) => f.write_str("Text"),
            Self::Opaque => f.write_str("Opaque"),
        }
    }
}

/// A scalar leaf.
#[derive(Debug, Clone)]
pub struct LeafShape {
    repr: LeafRepr,
    duplicate: fn(&dyn Any) -> Option<BoxedValue>,
}

impl LeafShape {
    /// Returns how this leaf is parsed.
    #[must_use]
    pub fn repr(&self) -> LeafRepr {
        self.repr
    }

    /// Clones a value of this leaf type into a fresh box.
    #[must_use]
    pub fn duplicate(&self, value: &dyn Any) -> Option<BoxedValue> {
        (self.duplicate)(value)
    }
}

/// `Option<T>`, the "pointer" of this binding model.
#[derive(Debug, Clone)]
pub struct OptionalShape {
    inner: Box<TypeShape>,
    wrap: fn(BoxedValue) -> Option<BoxedValue>,
    none: fn() -> BoxedValue,
    is_some: fn(&dyn Any) -> bool,
    inner_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    set: fn(&mut dyn Any, BoxedValue) -> bool,
}

impl OptionalShape {
    /// The pointee shape.
    #[must_use]
    pub fn inner(&self) -> &TypeShape {
        &self.inner
    }

    /// Wraps a boxed `T` into a boxed `Some(T)`.
    #[must_use]
    pub fn wrap(&self, value: BoxedValue) -> Option<BoxedValue> {
        (self.wrap)(value)
    }

    /// A boxed `None`.
    #[must_use]
    pub fn none(&self) -> BoxedValue {
        (self.none)()
    }

    /// Returns true if the slot holds `Some`.
    #[must_use]
    pub fn is_some(&self, slot: &dyn Any) -> bool {
        (self.is_some)(slot)
    }

    /// Stores `Some(value)` into the slot.
    pub fn set_some(&self, slot: &mut dyn Any, value: BoxedValue) -> bool {
        match self.wrap(value) {
            Some(wrapped) => (self.set)(slot, wrapped),
            None => false,
        }
    }

    /// Makes sure the slot holds `Some`, allocating a default pointee when it
    /// is `None`, and returns the pointee.
    pub fn ensure<'a>(&self, slot: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        if !(self.is_some)(slot) {
            let fresh = self.inner.construct()?;
            if !self.set_some(slot, fresh) {
                return None;
            }
        }
        (self.inner_mut)(slot)
    }
}

/// `Vec<T>`.
#[derive(Debug, Clone)]
pub struct ListShape {
    elem: Box<TypeShape>,
    clear: fn(&mut dyn Any),
    push: fn(&mut dyn Any, BoxedValue) -> bool,
    len: fn(&dyn Any) -> usize,
    last_mut: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl ListShape {
    /// The element shape.
    #[must_use]
    pub fn elem(&self) -> &TypeShape {
        &self.elem
    }

    /// Removes all elements.
    pub fn clear(&self, slot: &mut dyn Any) {
        (self.clear)(slot);
    }

    /// Appends a converted element.
    pub fn push(&self, slot: &mut dyn Any, value: BoxedValue) -> bool {
        (self.push)(slot, value)
    }

    /// Number of elements currently held.
    #[must_use]
    pub fn len(&self, slot: &dyn Any) -> usize {
        (self.len)(slot)
    }

    /// The most recently pushed element.
    pub fn last_mut<'a>(&self, slot: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.last_mut)(slot)
    }
}

/// `HashMap<K, V>` or `BTreeMap<K, V>`.
#[derive(Debug, Clone)]
pub struct MapShape {
    key_type: &'static str,
    string_keys: bool,
    value: Box<TypeShape>,
    insert: fn(&mut dyn Any, String, BoxedValue) -> bool,
    reserve: fn(&mut dyn Any, usize),
    len: fn(&dyn Any) -> usize,
}

impl MapShape {
    /// Name of the declared key type.
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        self.key_type
    }

    /// Only `String`-keyed maps can be bound.
    #[must_use]
    pub fn has_string_keys(&self) -> bool {
        self.string_keys
    }

    /// The value shape.
    #[must_use]
    pub fn value(&self) -> &TypeShape {
        &self.value
    }

    /// Inserts a converted value under `key`.
    pub fn insert(&self, slot: &mut dyn Any, key: String, value: BoxedValue) -> bool {
        (self.insert)(slot, key, value)
    }

    /// Reserves room for `additional` entries where the map supports it.
    pub fn reserve(&self, slot: &mut dyn Any, additional: usize) {
        (self.reserve)(slot, additional);
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self, slot: &dyn Any) -> usize {
        (self.len)(slot)
    }
}

/// A nested [`Bindable`] struct.
#[derive(Clone)]
pub struct NestedShape {
    schema: fn() -> StructSchema,
}

impl NestedShape {
    /// Builds the nested struct's schema.
    #[must_use]
    pub fn schema(&self) -> StructSchema {
        (self.schema)()
    }

    /// The schema constructor, for registry lookups.
    #[must_use]
    pub fn schema_fn(&self) -> fn() -> StructSchema {
        self.schema
    }
}

impl fmt::Debug for NestedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedShape").finish_non_exhaustive()
    }
}

/// The closed classification of a field type.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    /// Scalar leaf converted from a single string.
    Leaf(LeafShape),
    /// `Option<T>`.
    Optional(OptionalShape),
    /// `Vec<T>`.
    List(ListShape),
    /// String-keyed (or rejected non-string-keyed) map.
    Map(MapShape),
    /// Nested bindable struct.
    Struct(NestedShape),
    /// Uploaded file.
    File,
    /// A kind this library refuses to bind (arrays, tuples, unit).
    Unsupported(&'static str),
}

impl ShapeKind {
    /// Short label used in diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Leaf(_) => "scalar",
            Self::Optional(_) => "optional",
            Self::List(_) => "slice",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
            Self::File => "file",
            Self::Unsupported(kind) => kind,
        }
    }
}

/// Classification of one declared type plus its type-erased operations.
#[derive(Clone)]
pub struct TypeShape {
    id: TypeId,
    name: &'static str,
    kind: ShapeKind,
    assign: fn(&mut dyn Any, BoxedValue) -> bool,
    construct: Option<fn() -> BoxedValue>,
}

impl fmt::Debug for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeShape")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

impl TypeShape {
    fn base<T: Any + Send + Sync>(kind: ShapeKind) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
            kind,
            assign: assign_value::<T>,
            construct: None,
        }
    }

    fn leaf<T: Any + Send + Sync + Clone>(repr: LeafRepr) -> Self {
        Self::base::<T>(ShapeKind::Leaf(LeafShape {
            repr,
            duplicate: duplicate_value::<T>,
        }))
    }

    /// Shape of a primitive handled by the kind switch.
    #[must_use]
    pub fn primitive<T: Any + Send + Sync + Clone>(primitive: Primitive) -> Self {
        Self::leaf::<T>(LeafRepr::Primitive(primitive))
    }

    /// Shape of a well-known type with bespoke parsing.
    #[must_use]
    pub fn known<T: Any + Send + Sync + Clone>(known: KnownType) -> Self {
        Self::leaf::<T>(LeafRepr::Known(known))
    }

    /// Shape of a type converted through [`TextUnmarshal`].
    #[must_use]
    pub fn text<T: TextUnmarshal + Any + Send + Sync + Clone>() -> Self {
        Self::leaf::<T>(LeafRepr::Text(unmarshal_boxed::<T>))
    }

    /// Shape of a type converted through its [`FromStr`] implementation,
    /// treated as a text-unmarshaling capability.
    #[must_use]
    pub fn parsed<T>() -> Self
    where
        T: FromStr + Any + Send + Sync + Clone,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        Self::leaf::<T>(LeafRepr::Text(from_str_boxed::<T>))
    }

    /// Shape of a leaf only a registered converter can produce.
    #[must_use]
    pub fn opaque<T: Any + Send + Sync + Clone>() -> Self {
        Self::leaf::<T>(LeafRepr::Opaque)
    }

    /// Shape of a kind that is refused at bind time with a named error.
    #[must_use]
    pub fn unsupported<T: Any + Send + Sync>(kind: &'static str) -> Self {
        Self::base::<T>(ShapeKind::Unsupported(kind))
    }

    /// Shape of a nested bindable struct.
    #[must_use]
    pub fn nested<T: Bindable>() -> Self {
        let mut shape = Self::base::<T>(ShapeKind::Struct(NestedShape {
            schema: T::schema,
        }));
        shape.construct = Some(construct_default::<T>);
        shape
    }

    /// Shape of `Option<T>`.
    #[must_use]
    pub fn optional<T: FieldType>() -> Self {
        let mut shape = Self::base::<Option<T>>(ShapeKind::Optional(OptionalShape {
            inner: Box::new(T::shape()),
            wrap: wrap_some::<T>,
            none: boxed_none::<T>,
            is_some: option_is_some::<T>,
            inner_mut: option_inner_mut::<T>,
            set: assign_value::<Option<T>>,
        }));
        shape.construct = Some(construct_default::<Option<T>>);
        shape
    }

    /// Shape of `Vec<T>`.
    #[must_use]
    pub fn list<T: FieldType>() -> Self {
        let mut shape = Self::base::<Vec<T>>(ShapeKind::List(ListShape {
            elem: Box::new(T::shape()),
            clear: vec_clear::<T>,
            push: vec_push::<T>,
            len: vec_len::<T>,
            last_mut: vec_last_mut::<T>,
        }));
        shape.construct = Some(construct_default::<Vec<T>>);
        shape
    }

    /// Shape of `HashMap<K, V>`.
    #[must_use]
    pub fn hash_map<K, V>() -> Self
    where
        K: Eq + Hash + Any + Send + Sync,
        V: FieldType,
    {
        let mut shape = Self::base::<HashMap<K, V>>(ShapeKind::Map(MapShape {
            key_type: short_type_name::<K>(),
            string_keys: TypeId::of::<K>() == TypeId::of::<String>(),
            value: Box::new(V::shape()),
            insert: hash_map_insert::<K, V>,
            reserve: hash_map_reserve::<K, V>,
            len: hash_map_len::<K, V>,
        }));
        shape.construct = Some(construct_default::<HashMap<K, V>>);
        shape
    }

    /// Shape of `BTreeMap<K, V>`.
    #[must_use]
    pub fn btree_map<K, V>() -> Self
    where
        K: Ord + Any + Send + Sync,
        V: FieldType,
    {
        let mut shape = Self::base::<BTreeMap<K, V>>(ShapeKind::Map(MapShape {
            key_type: short_type_name::<K>(),
            string_keys: TypeId::of::<K>() == TypeId::of::<String>(),
            value: Box::new(V::shape()),
            insert: btree_map_insert::<K, V>,
            reserve: |_, _| {},
            len: btree_map_len::<K, V>,
        }));
        shape.construct = Some(construct_default::<BTreeMap<K, V>>);
        shape
    }

    /// Shape of [`UploadedFile`].
    #[must_use]
    pub fn file() -> Self {
        Self::base::<UploadedFile>(ShapeKind::File)
    }

    /// The `TypeId` of the declared type.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Readable name of the declared type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The classification.
    #[must_use]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Returns true for `Option<T>`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self.kind, ShapeKind::Optional(_))
    }

    /// The pointee for `Option<T>`, otherwise the shape itself.
    #[must_use]
    pub fn pointee(&self) -> &TypeShape {
        match &self.kind {
            ShapeKind::Optional(opt) => opt.inner(),
            _ => self,
        }
    }

    /// Writes a boxed value of exactly this type into the slot.
    pub fn assign(&self, slot: &mut dyn Any, value: BoxedValue) -> bool {
        (self.assign)(slot, value)
    }

    /// A default value of this type, when the type has one the binder may
    /// allocate (structs, containers, options).
    #[must_use]
    pub fn construct(&self) -> Option<BoxedValue> {
        self.construct.map(|construct| construct())
    }
}

/// Strips module paths from a type name (`alloc::string::String` → `String`).
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

fn assign_value<T: Any>(slot: &mut dyn Any, value: BoxedValue) -> bool {
    let Some(slot) = slot.downcast_mut::<T>() else {
        return false;
    };
    match value.downcast::<T>() {
        Ok(value) => {
            *slot = *value;
            true
        }
        Err(_) => false,
    }
}

fn duplicate_value<T: Any + Send + Sync + Clone>(value: &dyn Any) -> Option<BoxedValue> {
    value
        .downcast_ref::<T>()
        .map(|value| Box::new(value.clone()) as BoxedValue)
}

fn construct_default<T: Default + Any + Send + Sync>() -> BoxedValue {
    Box::new(T::default())
}

fn unmarshal_boxed<T: TextUnmarshal + Any + Send + Sync>(text: &str) -> Result<BoxedValue, BoxError> {
    T::unmarshal_text(text).map(|value| Box::new(value) as BoxedValue)
}

fn from_str_boxed<T>(text: &str) -> Result<BoxedValue, BoxError>
where
    T: FromStr + Any + Send + Sync,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    text.parse::<T>()
        .map(|value| Box::new(value) as BoxedValue)
        .map_err(|e| Box::new(e) as BoxError)
}

fn wrap_some<T: Any + Send + Sync>(value: BoxedValue) -> Option<BoxedValue> {
    value
        .downcast::<T>()
        .ok()
        .map(|value| Box::new(Some(*value)) as BoxedValue)
}

fn boxed_none<T: Any + Send + Sync>() -> BoxedValue {
    Box::new(None::<T>)
}

fn option_is_some<T: Any>(slot: &dyn Any) -> bool {
    slot.downcast_ref::<Option<T>>()
        .is_some_and(Option::is_some)
}

fn option_inner_mut<T: Any>(slot: &mut dyn Any) -> Option<&mut dyn Any> {
    slot.downcast_mut::<Option<T>>()?
        .as_mut()
        .map(|inner| inner as &mut dyn Any)
}

fn vec_clear<T: Any>(slot: &mut dyn Any) {
    if let Some(items) = slot.downcast_mut::<Vec<T>>() {
        items.clear();
    }
}

fn vec_push<T: Any>(slot: &mut dyn Any, value: BoxedValue) -> bool {
    let Some(items) = slot.downcast_mut::<Vec<T>>() else {
        return false;
    };
    match value.downcast::<T>() {
        Ok(value) => {
            items.push(*value);
            true
        }
        Err(_) => false,
    }
}

fn vec_len<T: Any>(slot: &dyn Any) -> usize {
    slot.downcast_ref::<Vec<T>>().map_or(0, Vec::len)
}

fn vec_last_mut<T: Any>(slot: &mut dyn Any) -> Option<&mut dyn Any> {
    slot.downcast_mut::<Vec<T>>()?
        .last_mut()
        .map(|item| item as &mut dyn Any)
}

/// Moves the owned key into the map's key type; only succeeds for `String`.
fn typed_key<K: Any>(key: String) -> Option<K> {
    let key: Box<dyn Any> = Box::new(key);
    key.downcast::<K>().ok().map(|key| *key)
}

fn hash_map_insert<K: Eq + Hash + Any, V: Any>(
    slot: &mut dyn Any,
    key: String,
    value: BoxedValue,
) -> bool {
    let Some(map) = slot.downcast_mut::<HashMap<K, V>>() else {
        return false;
    };
    let (Some(key), Ok(value)) = (typed_key::<K>(key), value.downcast::<V>()) else {
        return false;
    };
    map.insert(key, *value);
    true
}

fn hash_map_reserve<K: Eq + Hash + Any, V: Any>(slot: &mut dyn Any, additional: usize) {
    if let Some(map) = slot.downcast_mut::<HashMap<K, V>>() {
        map.reserve(additional);
    }
}

fn hash_map_len<K: Any, V: Any>(slot: &dyn Any) -> usize {
    slot.downcast_ref::<HashMap<K, V>>().map_or(0, HashMap::len)
}

fn btree_map_insert<K: Ord + Any, V: Any>(slot: &mut dyn Any, key: String, value: BoxedValue) -> bool {
    let Some(map) = slot.downcast_mut::<BTreeMap<K, V>>() else {
        return false;
    };
    let (Some(key), Ok(value)) = (typed_key::<K>(key), value.downcast::<V>()) else {
        return false;
    };
    map.insert(key, *value);
    true
}

fn btree_map_len<K: Any, V: Any>(slot: &dyn Any) -> usize {
    slot.downcast_ref::<BTreeMap<K, V>>().map_or(0, BTreeMap::len)
}

macro_rules! impl_primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                fn shape() -> TypeShape {
                    TypeShape::primitive::<$ty>(Primitive::$kind)
                }
            }
        )*
    };
}

impl_primitive!(
    String => Str,
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => Usize,
    f32 => F32,
    f64 => F64,
);

macro_rules! impl_known {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                fn shape() -> TypeShape {
                    TypeShape::known::<$ty>(KnownType::$kind)
                }
            }
        )*
    };
}

impl_known!(
    DateTime<FixedOffset> => DateTime,
    DateTime<Utc> => DateTimeUtc,
    NaiveDate => NaiveDate,
    NaiveDateTime => NaiveDateTime,
    Duration => Duration,
    url::Url => Url,
    IpAddr => IpAddr,
    Ipv4Addr => Ipv4Addr,
    Ipv6Addr => Ipv6Addr,
    IpNetwork => IpNetwork,
    regex::Regex => Regex,
);

impl FieldType for UploadedFile {
    fn shape() -> TypeShape {
        TypeShape::file()
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::optional::<T>()
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::list::<T>()
    }
}

impl<K, V> FieldType for HashMap<K, V>
where
    K: Eq + Hash + Any + Send + Sync,
    V: FieldType,
{
    fn shape() -> TypeShape {
        TypeShape::hash_map::<K, V>()
    }
}

impl<K, V> FieldType for BTreeMap<K, V>
where
    K: Ord + Any + Send + Sync,
    V: FieldType,
{
    fn shape() -> TypeShape {
        TypeShape::btree_map::<K, V>()
    }
}

impl<T: Any + Send + Sync, const N: usize> FieldType for [T; N] {
    fn shape() -> TypeShape {
        TypeShape::unsupported::<Self>("array")
    }
}

impl FieldType for () {
    fn shape() -> TypeShape {
        TypeShape::unsupported::<Self>("unit")
    }
}

impl<A: Any + Send + Sync, B: Any + Send + Sync> FieldType for (A, B) {
    fn shape() -> TypeShape {
        TypeShape::unsupported::<Self>("tuple")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_shapes() {
        let shape = u16::shape();
        assert_eq!(shape.id(), TypeId::of::<u16>());
        assert_eq!(shape.name(), "u16");
        assert!(matches!(
            shape.kind(),
            ShapeKind::Leaf(leaf) if matches!(leaf.repr(), LeafRepr::Primitive(Primitive::U16))
        ));
        assert_eq!(String::shape().name(), "String");
    }

    #[test]
    fn test_assign_checks_types() {
        let shape = i32::shape();
        let mut slot = 0_i32;
        assert!(shape.assign(&mut slot, Box::new(42_i32)));
        assert_eq!(slot, 42);

        // Wrong value type is refused, slot untouched.
        assert!(!shape.assign(&mut slot, Box::new(7_i64)));
        assert_eq!(slot, 42);
    }

    #[test]
    fn test_optional_ensure_allocates_once() {
        let shape = <Option<Vec<u8>>>::shape();
        let ShapeKind::Optional(opt) = shape.kind() else {
            panic!("expected optional");
        };

        let mut slot: Option<Vec<u8>> = None;
        assert!(!opt.is_some(&slot));
        let inner = opt.ensure(&mut slot).unwrap();
        inner.downcast_mut::<Vec<u8>>().unwrap().push(1);
        let inner = opt.ensure(&mut slot).unwrap();
        inner.downcast_mut::<Vec<u8>>().unwrap().push(2);
        assert_eq!(slot, Some(vec![1, 2]));
    }

    #[test]
    fn test_optional_wrap_and_none() {
        let shape = <Option<u8>>::shape();
        let ShapeKind::Optional(opt) = shape.kind() else {
            panic!("expected optional");
        };
        let mut slot: Option<u8> = Some(3);
        assert!(shape.assign(&mut slot, opt.none()));
        assert_eq!(slot, None);
        assert!(opt.set_some(&mut slot, Box::new(9_u8)));
        assert_eq!(slot, Some(9));
    }

    #[test]
    fn test_list_operations() {
        let shape = <Vec<String>>::shape();
        let ShapeKind::List(list) = shape.kind() else {
            panic!("expected list");
        };
        let mut slot = vec!["stale".to_string()];
        list.clear(&mut slot);
        assert!(list.push(&mut slot, Box::new("a".to_string())));
        assert!(!list.push(&mut slot, Box::new(1_u8)));
        assert_eq!(list.len(&slot), 1);
        assert_eq!(slot, vec!["a".to_string()]);
    }

    #[test]
    fn test_map_key_support() {
        let shape = <HashMap<String, i64>>::shape();
        let ShapeKind::Map(map) = shape.kind() else {
            panic!("expected map");
        };
        assert!(map.has_string_keys());
        let mut slot: HashMap<String, i64> = HashMap::new();
        map.reserve(&mut slot, 4);
        assert!(map.insert(&mut slot, "k".into(), Box::new(5_i64)));
        assert_eq!(slot.get("k"), Some(&5));

        let shape = <BTreeMap<u32, String>>::shape();
        let ShapeKind::Map(map) = shape.kind() else {
            panic!("expected map");
        };
        assert!(!map.has_string_keys());
        assert_eq!(map.key_type(), "u32");
    }

    #[test]
    fn test_unsupported_kinds() {
        assert_eq!(<[u8; 4]>::shape().kind().label(), "array");
        assert_eq!(<(u8, u8)>::shape().kind().label(), "tuple");
        assert_eq!(<()>::shape().kind().label(), "unit");
    }

    #[test]
    fn test_pointee() {
        let shape = <Option<url::Url>>::shape();
        assert!(shape.is_optional());
        assert_eq!(shape.pointee().id(), TypeId::of::<url::Url>());
        assert_eq!(u8::shape().pointee().id(), TypeId::of::<u8>());
    }
}
