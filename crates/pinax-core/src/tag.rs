//! Struct-tag parsing.
//!
//! Tags use the Go-style grammar `key:"value" key2:"value2"`. For a tag
//! namespace such as `query`, the value is `primary[,alias]*[,omitempty]`;
//! `default`, `enum` and `required` are read from their own keys.
//!
//! Body namespaces (`json`, `xml`, `yaml`) fall back to the declared field
//! name when the tag is missing or its primary segment is empty, and `-`
//! excludes the field. Every other namespace only binds tagged fields.

use std::any::TypeId;

use tracing::debug;

use crate::config::BindConfig;
use crate::convert::convert_value;
use crate::metadata::{AccessStep, FieldKind, FieldMetadata, StructInfo};
use crate::schema::StructSchema;
use crate::shape::{ShapeKind, TypeShape};

/// Namespaces decoded from a whole request body.
pub const BODY_NAMESPACES: &[&str] = &["json", "xml", "yaml"];

/// Returns true for body-oriented namespaces.
#[must_use]
pub fn is_body_namespace(namespace: &str) -> bool {
    BODY_NAMESPACES.contains(&namespace)
}

/// A raw struct-tag string.
///
/// ```rust
/// use pinax_core::StructTag;
///
/// let tag = StructTag::new(r#"query:"user_id,id" default:"8080""#);
/// assert_eq!(tag.lookup("query").as_deref(), Some("user_id,id"));
/// assert_eq!(tag.get("default"), "8080");
/// assert_eq!(tag.lookup("form"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructTag<'a>(&'a str);

impl<'a> StructTag<'a> {
    /// Wraps a tag string.
    #[must_use]
    pub fn new(tag: &'a str) -> Self {
        Self(tag)
    }

    /// The value under `key`, or the empty string.
    #[must_use]
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// The value under `key`, distinguishing an absent key from an empty
    /// value. Parsing stops at the first malformed pair.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut tag = self.0;
        loop {
            tag = tag.trim_start_matches(' ');
            if tag.is_empty() {
                return None;
            }

            let name_len = tag
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(tag.len());
            let bytes = tag.as_bytes();
            if name_len == 0
                || name_len + 1 >= tag.len()
                || bytes[name_len] != b':'
                || bytes[name_len + 1] != b'"'
            {
                return None;
            }
            let name = &tag[..name_len];
            tag = &tag[name_len + 1..];

            let bytes = tag.as_bytes();
            let mut end = 1;
            while end < bytes.len() && bytes[end] != b'"' {
                if bytes[end] == b'\\' {
                    end += 1;
                }
                end += 1;
            }
            if end >= bytes.len() {
                return None;
            }
            let quoted = &tag[1..end];
            tag = &tag[end + 1..];

            if name == key {
                return Some(unquote(quoted));
            }
        }
    }
}

fn unquote(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parses a struct schema into the ordered field metadata for `namespace`.
///
/// Embedded (`flatten`) fields are expanded in place, their index paths
/// prefixed with the embedding field's index. A struct embedding itself
/// through a cycle is expanded once.
#[must_use]
pub fn parse_struct(schema: &StructSchema, namespace: &str) -> StructInfo {
    let mut fields = Vec::new();
    let mut stack = vec![schema.type_id()];
    collect_fields(schema, namespace, &[], &[], &mut stack, &mut fields);
    StructInfo {
        type_name: schema.type_name(),
        namespace: namespace.to_string(),
        fields,
    }
}

fn collect_fields(
    schema: &StructSchema,
    namespace: &str,
    index_prefix: &[usize],
    step_prefix: &[AccessStep],
    stack: &mut Vec<TypeId>,
    out: &mut Vec<FieldMetadata>,
) {
    let body = is_body_namespace(namespace);

    for (index, decl) in schema.fields().iter().enumerate() {
        if decl.is_skipped() {
            continue;
        }

        let mut index_path = index_prefix.to_vec();
        index_path.push(index);

        if decl.is_flattened() {
            if let ShapeKind::Struct(nested) = decl.shape().pointee().kind() {
                let inner_id = decl.shape().pointee().id();
                if stack.contains(&inner_id) {
                    debug!(
                        field = decl.name(),
                        type_name = decl.shape().pointee().name(),
                        "skipping recursive embedded struct"
                    );
                    continue;
                }
                let through = match decl.shape().kind() {
                    ShapeKind::Optional(opt) => Some(opt.clone()),
                    _ => None,
                };
                let mut steps = step_prefix.to_vec();
                steps.push(AccessStep {
                    access: decl.accessor().clone(),
                    through,
                });
                stack.push(inner_id);
                collect_fields(&nested.schema(), namespace, &index_path, &steps, stack, out);
                stack.pop();
                continue;
            }
        }

        let tag = StructTag::new(decl.tag());
        let raw = tag.lookup(namespace);
        let mut segments = raw.as_deref().unwrap_or("").split(',');
        let primary = segments.next().unwrap_or("").trim();

        let primary_key = if body {
            match primary {
                "-" => continue,
                "" => decl.name().to_string(),
                name => name.to_string(),
            }
        } else if primary.is_empty() {
            continue;
        } else {
            primary.to_string()
        };

        let alias_keys: Vec<String> = segments
            .map(str::trim)
            .filter(|alias| !alias.is_empty() && *alias != "omitempty")
            .map(String::from)
            .collect();

        let shape = decl.shape().clone();
        let kind = FieldKind::of(&shape);
        let elem_kind = match shape.pointee().kind() {
            ShapeKind::List(list) => Some(FieldKind::of(list.elem())),
            _ => None,
        };

        let default_raw = tag.lookup("default");
        let default_typed = default_raw
            .as_deref()
            .and_then(|raw| precompute_default(raw, decl.name(), &shape, kind));

        let enum_values = tag
            .lookup("enum")
            .map(|values| {
                values
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut steps = step_prefix.to_vec();
        steps.push(AccessStep {
            access: decl.accessor().clone(),
            through: None,
        });

        out.push(FieldMetadata {
            index_path,
            steps,
            field_name: decl.name().to_string(),
            primary_key,
            alias_keys,
            kind,
            is_optional: shape.is_optional(),
            shape,
            elem_kind,
            default_raw,
            default_typed,
            enum_values,
            required: tag.lookup("required").as_deref() == Some("true"),
        });
    }
}

fn precompute_default(
    raw: &str,
    field: &str,
    shape: &TypeShape,
    kind: FieldKind,
) -> Option<crate::shape::BoxedValue> {
    if kind != FieldKind::Scalar {
        debug!(field, ?kind, "default tag ignored for non-scalar field");
        return None;
    }
    match convert_value(raw, shape.pointee(), &BindConfig::default()) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(
                field,
                default = raw,
                error = %err,
                "default not precomputed, converting at bind time"
            );
            None
        }
    }
}
