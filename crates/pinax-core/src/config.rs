//! Bind configuration.
//!
//! [`BindSettings`] is the plain, serde-loadable part of the configuration
//! (limits and mode switches). [`BindConfig`] adds the behaviour that cannot
//! be expressed as data: custom converters, the validator, hooks and the key
//! normaliser.
//!
//! A `BindConfig` is immutable once built. Per-call overlays start from
//! [`BindConfig::to_builder`], which copies the converter table so the shared
//! base is never mutated.
//!
//! # Example
//!
//! ```rust
//! use pinax_core::{BindConfig, ErrorMode, SliceMode};
//!
//! let config = BindConfig::builder()
//!     .max_depth(8)
//!     .slice_mode(SliceMode::Csv)
//!     .error_mode(ErrorMode::CollectAll)
//!     .build();
//!
//! assert_eq!(config.settings().max_depth, 8);
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hooks::{BindHooks, Validator};
use crate::shape::{BoxError, BoxedValue};

/// Default maximum nested struct depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default maximum number of slice elements.
pub const DEFAULT_MAX_SLICE_LEN: usize = 1000;

/// Default maximum number of map entries.
pub const DEFAULT_MAX_MAP_SIZE: usize = 1000;

/// How slice fields read their values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SliceMode {
    /// One element per repeated key (`tags=a&tags=b`).
    #[default]
    Repeat,
    /// A single value is split on commas (`tags=a,b`).
    Csv,
}

/// What to do with JSON fields the destination does not declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// Decode silently.
    #[default]
    Ignore,
    /// Report each unknown field but keep binding.
    Warn,
    /// Fail on the first unknown field.
    Error,
}

/// How field-level errors are reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Return the first field error.
    #[default]
    FailFast,
    /// Keep binding and return every field error together.
    CollectAll,
}

/// Error returned by [`BindSettings::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid bind setting {field}: {reason}")]
pub struct SettingsError {
    /// The setting with the invalid value.
    pub field: &'static str,
    /// Why it is invalid.
    pub reason: String,
}

impl SettingsError {
    fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Limits and switches that can be loaded from a configuration file.
///
/// ```rust
/// use pinax_core::{BindSettings, SliceMode};
///
/// let settings: BindSettings =
///     serde_json::from_str(r#"{"max_depth": 4, "slice_mode": "csv"}"#).unwrap();
/// assert_eq!(settings.max_depth, 4);
/// assert_eq!(settings.slice_mode, SliceMode::Csv);
/// assert_eq!(settings.max_map_size, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BindSettings {
    /// Maximum nested struct depth.
    pub max_depth: usize,
    /// Maximum number of elements bound into one slice.
    pub max_slice_len: usize,
    /// Maximum number of entries bound into one map.
    pub max_map_size: usize,
    /// Repeated-key or comma-separated slices.
    pub slice_mode: SliceMode,
    /// Unknown JSON field handling.
    pub unknown_fields: UnknownFieldPolicy,
    /// Fail-fast or collect-all.
    pub error_mode: ErrorMode,
    /// Honour `0x`, `0o`, `0b` and leading-zero octal prefixes on integers.
    pub detect_int_base: bool,
    /// Extra `chrono` format strings tried after the built-in time layouts.
    pub time_layouts: Vec<String>,
    /// Enforce `required:"true"` tags.
    pub check_required: bool,
}

impl Default for BindSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_slice_len: DEFAULT_MAX_SLICE_LEN,
            max_map_size: DEFAULT_MAX_MAP_SIZE,
            slice_mode: SliceMode::default(),
            unknown_fields: UnknownFieldPolicy::default(),
            error_mode: ErrorMode::default(),
            detect_int_base: false,
            time_layouts: Vec::new(),
            check_required: false,
        }
    }
}

impl BindSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any limit is zero or a time layout is empty.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_depth == 0 {
            return Err(SettingsError::invalid_value("max_depth", "must be at least 1"));
        }
        if self.max_slice_len == 0 {
            return Err(SettingsError::invalid_value(
                "max_slice_len",
                "must be at least 1",
            ));
        }
        if self.max_map_size == 0 {
            return Err(SettingsError::invalid_value(
                "max_map_size",
                "must be at least 1",
            ));
        }
        if self.time_layouts.iter().any(|layout| layout.trim().is_empty()) {
            return Err(SettingsError::invalid_value(
                "time_layouts",
                "layouts must not be empty",
            ));
        }
        Ok(())
    }
}

type ConvertFn = dyn Fn(&str) -> Result<BoxedValue, BoxError> + Send + Sync;
type NormalizeFn = dyn Fn(&str) -> String + Send + Sync;

/// A caller-supplied conversion for one target type.
#[derive(Clone)]
pub struct Converter {
    target: &'static str,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Wraps a typed conversion function.
    pub fn new<T, E, F>(func: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            target: std::any::type_name::<T>(),
            func: Arc::new(move |raw| {
                func(raw)
                    .map(|value| Box::new(value) as BoxedValue)
                    .map_err(Into::into)
            }),
        }
    }

    /// Name of the target type.
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Runs the conversion.
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped function reports.
    pub fn convert(&self, raw: &str) -> Result<BoxedValue, BoxError> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Complete configuration for a bind call.
#[derive(Clone, Default)]
pub struct BindConfig {
    settings: BindSettings,
    converters: HashMap<TypeId, Converter>,
    validator: Option<Arc<dyn Validator>>,
    hooks: BindHooks,
    key_normalizer: Option<Arc<NormalizeFn>>,
}

impl BindConfig {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn builder() -> BindConfigBuilder {
        BindConfigBuilder::default()
    }

    /// Creates a configuration from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail [`BindSettings::validate`].
    pub fn from_settings(settings: BindSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    /// Starts an overlay builder from a copy of this configuration.
    #[must_use]
    pub fn to_builder(&self) -> BindConfigBuilder {
        BindConfigBuilder {
            config: self.clone(),
        }
    }

    /// The data settings.
    #[must_use]
    pub fn settings(&self) -> &BindSettings {
        &self.settings
    }

    /// The converter registered for exactly `id`, if any.
    #[must_use]
    pub fn converter(&self, id: TypeId) -> Option<&Converter> {
        self.converters.get(&id)
    }

    /// Returns true if any converters are registered.
    #[must_use]
    pub fn has_converters(&self) -> bool {
        !self.converters.is_empty()
    }

    /// The injected validator.
    #[must_use]
    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// The observability hooks.
    #[must_use]
    pub fn hooks(&self) -> &BindHooks {
        &self.hooks
    }

    /// Applies the key normaliser, if one is configured.
    #[must_use]
    pub fn normalize_key(&self, key: &str) -> String {
        match &self.key_normalizer {
            Some(normalize) => normalize(key),
            None => key.to_string(),
        }
    }
}

impl fmt::Debug for BindConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindConfig")
            .field("settings", &self.settings)
            .field("converters", &self.converters.values().collect::<Vec<_>>())
            .field("validator", &self.validator.is_some())
            .field("hooks", &self.hooks)
            .field("key_normalizer", &self.key_normalizer.is_some())
            .finish()
    }
}

/// Builder for [`BindConfig`].
#[derive(Clone, Default)]
pub struct BindConfigBuilder {
    config: BindConfig,
}

impl BindConfigBuilder {
    /// Replaces all data settings.
    #[must_use]
    pub fn settings(mut self, settings: BindSettings) -> Self {
        self.config.settings = settings;
        self
    }

    /// Sets the maximum nested struct depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.settings.max_depth = depth;
        self
    }

    /// Sets the maximum slice length.
    #[must_use]
    pub fn max_slice_len(mut self, len: usize) -> Self {
        self.config.settings.max_slice_len = len;
        self
    }

    /// Sets the maximum map size.
    #[must_use]
    pub fn max_map_size(mut self, size: usize) -> Self {
        self.config.settings.max_map_size = size;
        self
    }

    /// Sets the slice mode.
    #[must_use]
    pub fn slice_mode(mut self, mode: SliceMode) -> Self {
        self.config.settings.slice_mode = mode;
        self
    }

    /// Sets the unknown JSON field policy.
    #[must_use]
    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.config.settings.unknown_fields = policy;
        self
    }

    /// Sets the error mode.
    #[must_use]
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.config.settings.error_mode = mode;
        self
    }

    /// Enables integer base prefixes.
    #[must_use]
    pub fn detect_int_base(mut self, enabled: bool) -> Self {
        self.config.settings.detect_int_base = enabled;
        self
    }

    /// Adds a `chrono` format string tried after the built-in layouts.
    #[must_use]
    pub fn time_layout(mut self, layout: impl Into<String>) -> Self {
        self.config.settings.time_layouts.push(layout.into());
        self
    }

    /// Enables `required:"true"` checks.
    #[must_use]
    pub fn check_required(mut self, enabled: bool) -> Self {
        self.config.settings.check_required = enabled;
        self
    }

    /// Registers a converter for `T`. It also serves `Option<T>` fields.
    #[must_use]
    pub fn converter<T, E, F>(mut self, func: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        self.config
            .converters
            .insert(TypeId::of::<T>(), Converter::new(func));
        self
    }

    /// Installs the validator run after each successful bind.
    #[must_use]
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.config.validator = Some(Arc::new(validator));
        self
    }

    /// Installs observability hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: BindHooks) -> Self {
        self.config.hooks = hooks;
        self
    }

    /// Installs a function applied to every lookup key.
    #[must_use]
    pub fn key_normalizer<F>(mut self, normalize: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.config.key_normalizer = Some(Arc::new(normalize));
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> BindConfig {
        self.config
    }
}

impl fmt::Debug for BindConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = BindSettings::default();
        assert_eq!(settings.max_depth, 32);
        assert_eq!(settings.max_slice_len, 1000);
        assert_eq!(settings.max_map_size, 1000);
        assert_eq!(settings.slice_mode, SliceMode::Repeat);
        assert_eq!(settings.error_mode, ErrorMode::FailFast);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_reject_zero_limits() {
        let settings = BindSettings {
            max_map_size: 0,
            ..BindSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.field, "max_map_size");
        assert!(BindConfig::from_settings(settings).is_err());
    }

    #[test]
    fn test_settings_deny_unknown_fields() {
        let result = serde_json::from_str::<BindSettings>(r#"{"max_dept": 3}"#);
        assert!(result.is_err());

        let settings: BindSettings =
            serde_json::from_str(r#"{"unknown_fields": "warn", "error_mode": "collect_all"}"#)
                .unwrap();
        assert_eq!(settings.unknown_fields, UnknownFieldPolicy::Warn);
        assert_eq!(settings.error_mode, ErrorMode::CollectAll);
    }

    #[test]
    fn test_overlay_does_not_touch_base() {
        let base = BindConfig::builder()
            .converter(|raw: &str| raw.parse::<u8>())
            .build();
        let overlay = base
            .to_builder()
            .converter(|raw: &str| Ok::<_, BoxError>(raw.len()))
            .max_depth(2)
            .build();

        assert!(base.converter(TypeId::of::<usize>()).is_none());
        assert!(overlay.converter(TypeId::of::<usize>()).is_some());
        assert!(overlay.converter(TypeId::of::<u8>()).is_some());
        assert_eq!(base.settings().max_depth, 32);
    }

    #[test]
    fn test_converter_boxes_value() {
        let conv = Converter::new(|raw: &str| raw.parse::<i64>());
        let value = conv.convert("-7").unwrap();
        assert_eq!(*value.downcast::<i64>().unwrap(), -7);
        assert!(conv.convert("x").is_err());
    }

    #[test]
    fn test_key_normalizer() {
        let config = BindConfig::builder()
            .key_normalizer(|key| key.to_ascii_lowercase())
            .build();
        assert_eq!(config.normalize_key("X-Trace"), "x-trace");
        assert_eq!(BindConfig::default().normalize_key("X-Trace"), "X-Trace");
    }
}
