//! Body codecs.
//!
//! Body sources are decoded as a whole by serde rather than field by field.
//! JSON documents are parsed to a [`Value`] first so the `json` tag names,
//! aliases and the unknown-field policy apply before serde maps them onto
//! the destination. XML and YAML go straight to serde, so their tag names
//! must equal the field names.

use std::io::Read;

use pinax_core::{
    Bindable, BindConfig, Error, Result, TypeRegistry, UnknownFieldError, UnknownFieldPolicy,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::unknown::{unknown_field_from_message, JsonFieldTrie};

/// Supported body formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyFormat {
    /// `application/json`
    Json,
    /// `application/xml`, `text/xml`
    Xml,
    /// `application/yaml`, `application/x-yaml`
    Yaml,
}

impl BodyFormat {
    /// Short name used in errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Yaml => "yaml",
        }
    }

    /// Picks a format from a Content-Type value, ignoring parameters.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => Some(Self::Json),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "application/yaml" | "application/x-yaml" | "text/yaml" => Some(Self::Yaml),
            other if other.ends_with("+json") => Some(Self::Json),
            other if other.ends_with("+xml") => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Decodes `bytes` into a fresh `T`, applying the JSON unknown-field policy.
///
/// # Errors
///
/// [`Error::Decode`] if the payload is malformed, [`Error::UnknownFields`]
/// under the error policy.
pub fn decode_body<T>(
    bytes: &[u8],
    format: BodyFormat,
    config: &BindConfig,
    registry: &TypeRegistry,
) -> Result<T>
where
    T: Bindable + DeserializeOwned,
{
    match format {
        BodyFormat::Json => decode_json(bytes, config, registry),
        BodyFormat::Xml => {
            let text = std::str::from_utf8(bytes).map_err(|err| Error::decode("xml", err))?;
            quick_xml::de::from_str(text).map_err(|err| Error::decode("xml", err))
        }
        BodyFormat::Yaml => serde_yaml::from_slice(bytes).map_err(|err| Error::decode("yaml", err)),
    }
}

/// Reads a JSON document from `reader` and decodes it like [`decode_body`].
///
/// # Errors
///
/// As [`decode_body`], plus [`Error::Decode`] if reading fails.
pub fn decode_json_reader<T, R>(reader: R, config: &BindConfig, registry: &TypeRegistry) -> Result<T>
where
    T: Bindable + DeserializeOwned,
    R: Read,
{
    let document: Value = serde_json::from_reader(reader).map_err(|err| Error::decode("json", err))?;
    decode_document(document, config, registry)
}

fn decode_json<T>(bytes: &[u8], config: &BindConfig, registry: &TypeRegistry) -> Result<T>
where
    T: Bindable + DeserializeOwned,
{
    let document: Value = serde_json::from_slice(bytes).map_err(|err| Error::decode("json", err))?;
    decode_document(document, config, registry)
}

/// Applies the unknown-field policy, renames tagged keys to field names,
/// then hands the document to serde.
fn decode_document<T>(mut document: Value, config: &BindConfig, registry: &TypeRegistry) -> Result<T>
where
    T: Bindable + DeserializeOwned,
{
    let trie = JsonFieldTrie::for_type::<T>(registry, config.settings().max_depth);
    match config.settings().unknown_fields {
        UnknownFieldPolicy::Error => {
            if let Some(field) = first_unknown_top_level(&trie, &document) {
                return Err(UnknownFieldError::new(vec![field]).into());
            }
        }
        UnknownFieldPolicy::Warn => {
            trie.walk(&document, &mut |path| {
                if !config.hooks().unknown_field(path) {
                    warn!(field = path, "unknown JSON field");
                }
            });
        }
        UnknownFieldPolicy::Ignore => {}
    }

    trie.rename_keys(&mut document);
    serde_json::from_value(document).map_err(|err| {
        let message = err.to_string();
        match unknown_field_from_message(&message) {
            Some(field) => UnknownFieldError::new(vec![field.to_string()]).into(),
            None => Error::decode("json", err),
        }
    })
}

fn first_unknown_top_level(trie: &JsonFieldTrie, document: &Value) -> Option<String> {
    let Value::Object(object) = document else {
        return None;
    };
    object.keys().find(|key| !trie.accepts(key)).cloned()
}
