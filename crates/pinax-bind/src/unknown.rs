//! Unknown JSON field detection.
//!
//! [`JsonFieldTrie`] holds the JSON field names a destination type accepts,
//! one level per nested struct. Walking a decoded document against it yields
//! the dotted path of every key the type does not declare, and
//! [`JsonFieldTrie::rename_keys`] maps tagged names back to field names
//! before serde sees the document.

use pinax_core::{Bindable, FieldKind, FieldMetadata, ShapeKind, StructInfo, TypeRegistry, TypeShape};
use serde_json::Value;

/// The JSON tag namespace.
pub(crate) const JSON_NAMESPACE: &str = "json";

/// A node in the trie of accepted JSON field paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFieldTrie {
    /// Anything goes below this point: scalars, maps, and structs past the
    /// depth bound.
    Open,
    /// An object with a fixed set of fields.
    Struct(Vec<JsonField>),
}

/// One declared field of a [`JsonFieldTrie::Struct`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonField {
    /// Declared Rust field name, which serde decodes by.
    pub name: String,
    /// Accepted JSON names, primary first.
    pub keys: Vec<String>,
    /// What the field's value may contain.
    pub child: JsonFieldTrie,
}

impl JsonFieldTrie {
    /// Builds the trie for `T`, descending at most `max_depth` struct levels.
    #[must_use]
    pub fn for_type<T: Bindable>(registry: &TypeRegistry, max_depth: usize) -> Self {
        let info = registry.struct_info::<T>(JSON_NAMESPACE);
        Self::from_info(registry, &info, max_depth)
    }

    fn from_info(registry: &TypeRegistry, info: &StructInfo, depth_left: usize) -> Self {
        let fields = info
            .fields()
            .iter()
            .map(|meta| JsonField {
                name: meta.field_name().to_string(),
                keys: std::iter::once(meta.primary_key())
                    .chain(meta.alias_keys().iter().map(String::as_str))
                    .map(String::from)
                    .collect(),
                child: Self::for_field(registry, meta, depth_left),
            })
            .collect();
        Self::Struct(fields)
    }

    fn for_field(registry: &TypeRegistry, meta: &FieldMetadata, depth_left: usize) -> Self {
        let nested = match meta.kind() {
            FieldKind::Struct => meta.shape().pointee(),
            FieldKind::Slice if meta.elem_kind() == Some(FieldKind::Struct) => {
                match meta.shape().pointee().kind() {
                    ShapeKind::List(list) => list.elem().pointee(),
                    _ => return Self::Open,
                }
            }
            _ => return Self::Open,
        };
        if depth_left == 0 {
            return Self::Open;
        }
        Self::for_struct(registry, nested, depth_left - 1)
    }

    fn for_struct(registry: &TypeRegistry, shape: &TypeShape, depth_left: usize) -> Self {
        match shape.kind() {
            ShapeKind::Struct(nested) => {
                let info = registry.struct_info_for(shape.id(), nested.schema_fn(), JSON_NAMESPACE);
                Self::from_info(registry, &info, depth_left)
            }
            _ => Self::Open,
        }
    }

    fn child(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Open => Some(self),
            Self::Struct(fields) => fields
                .iter()
                .find(|field| field.keys.iter().any(|k| k == key))
                .map(|field| &field.child),
        }
    }

    /// Returns true if the top level accepts `key`.
    #[must_use]
    pub fn accepts(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    /// Calls `report` with the dotted path of every key in `document` that
    /// the trie does not contain. Arrays of objects are walked element-wise.
    pub fn walk(&self, document: &Value, report: &mut dyn FnMut(&str)) {
        self.walk_at(document, "", report);
    }

    /// Collects the paths [`walk`](Self::walk) reports.
    #[must_use]
    pub fn unknown_fields(&self, document: &Value) -> Vec<String> {
        let mut found = Vec::new();
        self.walk(document, &mut |path| found.push(path.to_string()));
        found
    }

    fn walk_at(&self, value: &Value, path: &str, report: &mut dyn FnMut(&str)) {
        if matches!(self, Self::Open) {
            return;
        }
        match value {
            Value::Object(object) => {
                for (key, inner) in object {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{path}.{key}")
                    };
                    match self.child(key) {
                        Some(child) => child.walk_at(inner, &child_path, report),
                        None => report(&child_path),
                    }
                }
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.walk_at(item, &format!("{path}[{index}]"), report);
                }
            }
            _ => {}
        }
    }

    /// Renames every object key from its JSON name to the declared field
    /// name so serde sees the names it derives by.
    ///
    /// When several names of one field are present the primary wins, then
    /// aliases in declaration order. Keys no field accepts are dropped.
    pub fn rename_keys(&self, value: &mut Value) {
        let Self::Struct(fields) = self else {
            return;
        };
        match value {
            Value::Object(object) => {
                let mut source = std::mem::take(object);
                for field in fields {
                    let Some(mut inner) = field.keys.iter().find_map(|key| source.remove(key)) else {
                        continue;
                    };
                    field.child.rename_keys(&mut inner);
                    object.insert(field.name.clone(), inner);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.rename_keys(item);
                }
            }
            _ => {}
        }
    }
}

/// Extracts `x` from a serde ``unknown field `x` `` message.
pub(crate) fn unknown_field_from_message(message: &str) -> Option<&str> {
    let rest = &message[message.find("unknown field `")? + "unknown field `".len()..];
    rest.find('`').map(|end| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use pinax_core::{FieldType, SchemaBuilder, StructSchema};
    use serde_json::json;

    #[derive(Default)]
    struct Line {
        sku: String,
        qty: u32,
    }

    impl FieldType for Line {
        fn shape() -> TypeShape {
            TypeShape::nested::<Self>()
        }
    }

    impl Bindable for Line {
        fn schema() -> StructSchema {
            SchemaBuilder::<Self>::new()
                .field("sku", r#"json:"sku""#, |l| &mut l.sku)
                .field("qty", r#"json:"qty,quantity""#, |l| &mut l.qty)
                .build()
        }
    }

    #[derive(Default)]
    struct Order {
        id: String,
        lines: Vec<Line>,
        billing: Option<Line>,
        labels: HashMap<String, String>,
        internal: String,
    }

    impl FieldType for Order {
        fn shape() -> TypeShape {
            TypeShape::nested::<Self>()
        }
    }

    impl Bindable for Order {
        fn schema() -> StructSchema {
            SchemaBuilder::<Self>::new()
                .field("id", r#"json:"id""#, |o| &mut o.id)
                .field("lines", r#"json:"lines""#, |o| &mut o.lines)
                .field("billing", "", |o| &mut o.billing)
                .field("labels", r#"json:"labels""#, |o| &mut o.labels)
                .field("internal", r#"json:"-""#, |o| &mut o.internal)
                .build()
        }
    }

    #[test]
    fn test_reports_nested_paths() {
        let trie = JsonFieldTrie::for_type::<Order>(&TypeRegistry::new(), 8);
        let doc = json!({
            "id": "o-1",
            "extra": true,
            "lines": [{"sku": "a", "quantity": 2}, {"sku": "b", "color": "red"}],
            "billing": {"sku": "x", "zip": "0150"},
            "labels": {"anything": "goes"},
            "internal": "nope"
        });
        let mut found = trie.unknown_fields(&doc);
        found.sort();
        assert_eq!(
            found,
            ["billing.zip", "extra", "internal", "lines[1].color"]
        );
    }

    #[test]
    fn test_depth_bound_opens_the_trie() {
        let trie = JsonFieldTrie::for_type::<Order>(&TypeRegistry::new(), 0);
        let doc = json!({"lines": [{"whatever": 1}], "billing": {"zip": "1"}});
        assert!(trie.unknown_fields(&doc).is_empty());
        assert!(!trie.accepts("extra"));
    }

    #[test]
    fn test_rename_keys_maps_tags_to_field_names() {
        #[derive(Default)]
        struct Profile {
            display: String,
            home: Line,
        }

        impl FieldType for Profile {
            fn shape() -> TypeShape {
                TypeShape::nested::<Self>()
            }
        }

        impl Bindable for Profile {
            fn schema() -> StructSchema {
                SchemaBuilder::<Self>::new()
                    .field("display", r#"json:"display_name,nick""#, |p| &mut p.display)
                    .field("home", r#"json:"home_line""#, |p| &mut p.home)
                    .build()
            }
        }

        let trie = JsonFieldTrie::for_type::<Profile>(&TypeRegistry::new(), 8);
        let mut doc = json!({
            "nick": "al",
            "display_name": "Al",
            "display": "dropped",
            "home_line": {"sku": "h", "quantity": 3}
        });
        trie.rename_keys(&mut doc);
        assert_eq!(doc, json!({"display": "Al", "home": {"sku": "h", "qty": 3}}));

        let mut doc = json!({"nick": "al"});
        trie.rename_keys(&mut doc);
        assert_eq!(doc, json!({"display": "al"}));
    }

    #[test]
    fn test_rename_keys_walks_slices_and_leaves_maps() {
        let trie = JsonFieldTrie::for_type::<Order>(&TypeRegistry::new(), 8);
        let mut doc = json!({
            "lines": [{"sku": "a", "quantity": 2}, {"sku": "b", "qty": 1}],
            "labels": {"quantity": "kept"},
            "internal": "gone"
        });
        trie.rename_keys(&mut doc);
        assert_eq!(
            doc,
            json!({
                "lines": [{"sku": "a", "qty": 2}, {"sku": "b", "qty": 1}],
                "labels": {"quantity": "kept"}
            })
        );
    }

    #[test]
    fn test_unknown_field_from_message() {
        assert_eq!(
            unknown_field_from_message("unknown field `colour`, expected one of `a`, `b` at line 1"),
            Some("colour")
        );
        assert_eq!(unknown_field_from_message("missing field `id`"), None);
    }
}
