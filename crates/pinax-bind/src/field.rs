//! The recursive field binder.
//!
//! One [`FieldBinder`] lives for one namespace of a bind call. It walks
//! the cached [`StructInfo`] of the destination and, per field, picks the
//! first matching strategy: file, map, nested struct, indexed struct slice,
//! then key lookup with default and required handling, and finally slice or
//! scalar conversion.
//!
//! Field-level failures go through [`FieldBinder::record`], which either
//! returns them (fail-fast) or stores them (collect-all). Depth overruns and
//! unreachable fields abort the call in both modes.
//!
//! Counters go to the [`BindRun`] of the whole call, which fires the
//! completion hook once when it is dropped.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use pinax_core::{
    convert_into, convert_value, BindConfig, BindError, BindStats, BoxedValue, ConvertError,
    ErrorMode, Error, FieldEvent, FieldKind, FieldMetadata, LeafRepr, LimitError, LimitKind,
    MultiError, Primitive, Result, ShapeKind, SliceMode, StructInfo, TypeRegistry, TypeShape,
};
use tracing::{debug, trace};

use crate::getter::ValueGetter;
use crate::keys::{json_object_values, scan_map_keys, slice_index, JsonEntries, MapEntry};
use crate::scoped::PrefixedGetter;

/// Initial map capacity when the source cannot estimate one.
const DEFAULT_MAP_CAPACITY: usize = 8;

/// Counters of one bind call, however many sources it reads.
///
/// Dropping it logs the totals and fires the completion hook, so every exit
/// path reports exactly once.
pub(crate) struct BindRun<'c> {
    config: &'c BindConfig,
    pub(crate) stats: BindStats,
}

impl<'c> BindRun<'c> {
    pub(crate) fn new(config: &'c BindConfig) -> Self {
        Self {
            config,
            stats: BindStats::default(),
        }
    }

    /// Counts an error raised outside the field binder.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        self.stats.errors += 1;
        err
    }

    /// Runs the configured validator on the finished destination.
    pub(crate) fn validate<T: Any>(&mut self, dest: &T) -> Result<()> {
        let config = self.config;
        match config.validator() {
            Some(validator) => validator
                .validate(dest)
                .map_err(|reason| self.fail(Error::validation(reason))),
            None => Ok(()),
        }
    }
}

impl Drop for BindRun<'_> {
    fn drop(&mut self) {
        debug!(
            attempted = self.stats.fields_attempted,
            bound = self.stats.fields_bound,
            errors = self.stats.errors,
            "bind complete"
        );
        self.config.hooks().complete(&self.stats);
    }
}

/// Field traversal for one namespace.
pub(crate) struct FieldBinder<'b> {
    registry: &'b TypeRegistry,
    config: &'b BindConfig,
    namespace: &'b str,
    stats: &'b mut BindStats,
    errors: MultiError,
}

impl<'b> FieldBinder<'b> {
    pub(crate) fn new(
        registry: &'b TypeRegistry,
        config: &'b BindConfig,
        namespace: &'b str,
        stats: &'b mut BindStats,
    ) -> Self {
        Self {
            registry,
            config,
            namespace,
            stats,
            errors: MultiError::new(),
        }
    }

    /// Binds every field of `info` into `root` and returns the outcome under
    /// the configured error mode.
    pub(crate) fn run(
        &mut self,
        root: &mut dyn Any,
        info: &StructInfo,
        getter: &dyn ValueGetter,
    ) -> Result<()> {
        let outcome = self.bind_struct(root, info, getter, 0, "");
        let mut collected = std::mem::take(&mut self.errors);
        match outcome {
            Ok(()) => collected.into_error().map_or(Ok(()), Err),
            Err(err @ Error::Structural { .. }) => Err(err),
            Err(abort) if collected.is_empty() => Err(abort),
            Err(abort) => {
                collected.push(abort);
                Err(Error::Multi(collected))
            }
        }
    }

    fn record(&mut self, err: impl Into<Error>) -> Result<()> {
        let err = err.into();
        self.stats.errors += 1;
        match self.config.settings().error_mode {
            ErrorMode::FailFast => Err(err),
            ErrorMode::CollectAll => {
                self.errors.push(err);
                Ok(())
            }
        }
    }

    fn bound(&mut self, path: &str, key: &str) {
        self.stats.fields_bound += 1;
        trace!(field = path, key, namespace = self.namespace, "bound field");
        self.config.hooks().field_bound(&FieldEvent {
            field: path,
            key,
            namespace: self.namespace,
        });
    }

    fn missing(&mut self, meta: &FieldMetadata, key: &str, path: &str) -> Result<()> {
        if self.config.settings().check_required && meta.is_required() {
            let err = BindError::required(path, key, self.namespace, meta.shape().pointee().name());
            return self.record(err);
        }
        Ok(())
    }

    fn bind_struct(
        &mut self,
        target: &mut dyn Any,
        info: &StructInfo,
        getter: &dyn ValueGetter,
        depth: usize,
        path: &str,
    ) -> Result<()> {
        for meta in info.fields() {
            let field_path = join_path(path, meta.field_name());
            match meta.kind() {
                FieldKind::File => self.bind_file(target, meta, getter, &field_path)?,
                FieldKind::Slice if meta.elem_kind() == Some(FieldKind::File) => {
                    self.bind_file(target, meta, getter, &field_path)?;
                }
                FieldKind::Map => self.bind_map(target, meta, getter, depth, &field_path)?,
                FieldKind::Struct => self.bind_nested(target, meta, getter, depth, &field_path)?,
                FieldKind::Slice if meta.elem_kind() == Some(FieldKind::Struct) => {
                    self.bind_struct_slice(target, meta, getter, depth, &field_path)?;
                }
                FieldKind::Scalar | FieldKind::Slice => {
                    self.bind_value(target, meta, getter, &field_path)?;
                }
            }
        }
        Ok(())
    }

    /// Finds the first present key among the primary key and aliases.
    fn lookup<'g>(
        &self,
        meta: &FieldMetadata,
        getter: &'g dyn ValueGetter,
    ) -> Option<(String, Vec<&'g str>)> {
        std::iter::once(meta.primary_key())
            .chain(meta.alias_keys().iter().map(String::as_str))
            .map(|key| self.config.normalize_key(key))
            .find(|key| getter.has(key))
            .map(|key| {
                let mut values = getter.get_all(&key);
                if values.is_empty() {
                    values.push(getter.get(&key).unwrap_or(""));
                }
                (key, values)
            })
    }

    fn bind_value(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        path: &str,
    ) -> Result<()> {
        self.stats.fields_attempted += 1;
        let Some((key, values)) = self.lookup(meta, getter) else {
            return self.apply_default(target, meta, path);
        };
        if meta.kind() == FieldKind::Slice {
            self.bind_slice(target, meta, &key, values, path)
        } else {
            let raw = values.first().copied().unwrap_or("");
            self.bind_scalar(target, meta, &key, raw, path)
        }
    }

    fn apply_default(&mut self, target: &mut dyn Any, meta: &FieldMetadata, path: &str) -> Result<()> {
        let key = self.config.normalize_key(meta.primary_key());
        let Some(raw) = meta.default_raw().filter(|_| meta.kind() == FieldKind::Scalar) else {
            return self.missing(meta, &key, path);
        };

        let value = match meta.typed_default() {
            Some(value) => value,
            None => match convert_value(raw, meta.shape().pointee(), self.config) {
                Ok(value) => value,
                Err(err) => {
                    let err = self.conversion_error(meta.shape().pointee(), &key, raw, path, err);
                    return self.record(err);
                }
            },
        };
        let slot = reach(meta, target, path)?;
        if !store(meta.shape(), slot, value) {
            return Err(type_mismatch(path, meta.shape()));
        }
        self.bound(path, &key);
        Ok(())
    }

    fn bind_scalar(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        key: &str,
        raw: &str,
        path: &str,
    ) -> Result<()> {
        let is_string = is_string(meta.shape().pointee());

        let required = self.config.settings().check_required && meta.is_required();
        if raw.is_empty() {
            if meta.is_optional() || !is_string || required {
                return self.missing(meta, key, path);
            }
        } else if is_string
            && !meta.enum_values().is_empty()
            && !meta.enum_values().iter().any(|allowed| allowed == raw)
        {
            let err = BindError::invalid_enum(path, key, self.namespace, raw, meta.enum_values());
            return self.record(err);
        }

        let slot = reach(meta, target, path)?;
        match convert_into(raw, meta.shape(), slot, self.config) {
            Ok(true) => {
                self.bound(path, key);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(err) => {
                let err = self.conversion_error(meta.shape().pointee(), key, raw, path, err);
                self.record(err)
            }
        }
    }

    /// Applies the slice mode and drops a lone empty value.
    fn split_values<'v>(&self, values: Vec<&'v str>) -> Vec<&'v str> {
        let values = match (self.config.settings().slice_mode, values.as_slice()) {
            (SliceMode::Csv, [single]) if !single.is_empty() => {
                single.split(',').map(str::trim).collect()
            }
            _ => values,
        };
        if matches!(values.as_slice(), [only] if only.is_empty()) {
            Vec::new()
        } else {
            values
        }
    }

    /// Converts every raw value to the element type, stopping at the first
    /// failure.
    fn convert_elements(
        &self,
        elem: &TypeShape,
        key: &str,
        raws: &[&str],
        path: &str,
    ) -> std::result::Result<Vec<BoxedValue>, BindError> {
        if !matches!(FieldKind::of(elem), FieldKind::Scalar) {
            return Err(BindError::unsupported(
                path,
                key,
                self.namespace,
                elem.name(),
                "slices of slices, maps or files are not supported",
            ));
        }
        raws.iter()
            .enumerate()
            .map(|(index, raw)| {
                convert_value(raw, elem, self.config).map_err(|err| {
                    self.conversion_error(elem, key, raw, &format!("{path}[{index}]"), err)
                })
            })
            .collect()
    }

    fn bind_slice(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        key: &str,
        values: Vec<&str>,
        path: &str,
    ) -> Result<()> {
        let ShapeKind::List(list) = meta.shape().pointee().kind() else {
            return Err(type_mismatch(path, meta.shape()));
        };
        let raws = self.split_values(values);
        if raws.is_empty() {
            return self.missing(meta, key, path);
        }

        let limit = self.config.settings().max_slice_len;
        if raws.len() > limit {
            return self.record(LimitError::new(LimitKind::SliceLength, path, raws.len(), limit));
        }

        let elements = match self.convert_elements(list.elem(), key, &raws, path) {
            Ok(elements) => elements,
            Err(err) => return self.record(err),
        };

        let slot = pointee_slot(meta.shape(), reach(meta, target, path)?, path)?;
        list.clear(slot);
        for element in elements {
            if !list.push(slot, element) {
                return Err(type_mismatch(path, list.elem()));
            }
        }
        self.bound(path, key);
        Ok(())
    }

    fn enter(&mut self, depth: usize, path: &str) -> Result<usize> {
        let next = depth + 1;
        let limit = self.config.settings().max_depth;
        if next > limit {
            self.stats.errors += 1;
            debug!(field = path, depth = next, limit, "depth limit exceeded");
            return Err(LimitError::new(LimitKind::Depth, path, next, limit).into());
        }
        Ok(next)
    }

    fn struct_info(&self, shape: &TypeShape) -> Option<Arc<StructInfo>> {
        match shape.kind() {
            ShapeKind::Struct(nested) => Some(self.registry.struct_info_for(
                shape.id(),
                nested.schema_fn(),
                self.namespace,
            )),
            _ => None,
        }
    }

    fn bind_nested(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        depth: usize,
        path: &str,
    ) -> Result<()> {
        let key = self.config.normalize_key(meta.primary_key());
        if meta.is_optional() && !getter.has_prefix(&key) {
            return Ok(());
        }
        let next = self.enter(depth, path)?;
        let Some(info) = self.struct_info(meta.shape().pointee()) else {
            return Err(type_mismatch(path, meta.shape()));
        };

        let scoped = PrefixedGetter::new(getter, key);
        let slot = pointee_slot(meta.shape(), reach(meta, target, path)?, path)?;
        self.bind_struct(slot, &info, &scoped, next, path)
    }

    fn bind_struct_slice(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        depth: usize,
        path: &str,
    ) -> Result<()> {
        self.stats.fields_attempted += 1;
        let key = self.config.normalize_key(meta.primary_key());
        let ShapeKind::List(list) = meta.shape().pointee().kind() else {
            return Err(type_mismatch(path, meta.shape()));
        };

        let mut elements: BTreeMap<usize, String> = BTreeMap::new();
        for source_key in getter.keys() {
            if let Some((index, prefix)) = slice_index(source_key, &key) {
                elements.entry(index).or_insert(prefix);
            }
        }
        if elements.is_empty() {
            return self.missing(meta, &key, path);
        }

        let limit = self.config.settings().max_slice_len;
        if elements.len() > limit {
            return self.record(LimitError::new(LimitKind::SliceLength, path, elements.len(), limit));
        }

        let next = self.enter(depth, path)?;
        let elem = list.elem();
        let Some(info) = self.struct_info(elem.pointee()) else {
            return Err(type_mismatch(path, elem));
        };

        let mut values = Vec::with_capacity(elements.len());
        for (position, prefix) in elements.values().enumerate() {
            let value = self.bind_element(elem, &info, getter, prefix, next, &format!("{path}[{position}]"))?;
            values.push(value);
        }

        let slot = pointee_slot(meta.shape(), reach(meta, target, path)?, path)?;
        list.clear(slot);
        for value in values {
            if !list.push(slot, value) {
                return Err(type_mismatch(path, elem));
            }
        }
        self.bound(path, &key);
        Ok(())
    }

    /// Builds one struct value (or `Some(struct)`) from the keys under `prefix`.
    fn bind_element(
        &mut self,
        shape: &TypeShape,
        info: &StructInfo,
        getter: &dyn ValueGetter,
        prefix: &str,
        depth: usize,
        path: &str,
    ) -> Result<BoxedValue> {
        let Some(mut value) = shape.pointee().construct() else {
            return Err(type_mismatch(path, shape));
        };
        let scoped = PrefixedGetter::new(getter, prefix);
        self.bind_struct(&mut *value, info, &scoped, depth, path)?;
        match shape.kind() {
            ShapeKind::Optional(opt) => opt.wrap(value).ok_or_else(|| type_mismatch(path, shape)),
            _ => Ok(value),
        }
    }

    fn bind_map(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        depth: usize,
        path: &str,
    ) -> Result<()> {
        self.stats.fields_attempted += 1;
        let key = self.config.normalize_key(meta.primary_key());
        let ShapeKind::Map(map) = meta.shape().pointee().kind() else {
            return Err(type_mismatch(path, meta.shape()));
        };
        if !map.has_string_keys() {
            let reason = format!("map keys must be String, found {}", map.key_type());
            let err = BindError::unsupported(path, &key, self.namespace, meta.shape().name(), reason);
            return self.record(err);
        }
        let value_kind = FieldKind::of(map.value());
        if matches!(value_kind, FieldKind::Map | FieldKind::File) {
            let err = BindError::unsupported(
                path,
                &key,
                self.namespace,
                meta.shape().name(),
                "map values must be scalars, slices or structs",
            );
            return self.record(err);
        }

        let nested = value_kind == FieldKind::Struct;
        let limit = self.config.settings().max_map_size;
        let capacity = getter
            .approx_count(&key)
            .unwrap_or(DEFAULT_MAP_CAPACITY)
            .min(limit);

        let entries = match scan_map_keys(getter.keys(), &key, nested, limit, capacity) {
            Ok(entries) => entries,
            Err(observed) => {
                return self.record(LimitError::new(LimitKind::MapSize, path, observed, limit));
            }
        };
        if !entries.is_empty() {
            return self.fill_map(target, meta, getter, entries.into_iter().collect(), depth, path, &key);
        }

        let raw = match getter.get(&key) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return self.missing(meta, &key, path),
        };
        let fallback = match json_object_values(&key, raw, nested) {
            Ok(fallback) => fallback,
            Err(err) => {
                let err = BindError::conversion(path, &key, self.namespace, raw, "JSON object", err.to_string())
                    .with_cause(err);
                return self.record(err);
            }
        };
        if fallback.entries.len() > limit {
            let err = LimitError::new(LimitKind::MapSize, path, fallback.entries.len(), limit);
            return self.record(err);
        }
        if fallback.entries.is_empty() {
            return self.missing(meta, &key, path);
        }
        let JsonEntries { values, entries } = fallback;
        self.fill_map(target, meta, &values, entries.into_iter().collect(), depth, path, &key)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_map(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        entries: Vec<(String, MapEntry)>,
        depth: usize,
        path: &str,
        key: &str,
    ) -> Result<()> {
        let ShapeKind::Map(map) = meta.shape().pointee().kind() else {
            return Err(type_mismatch(path, meta.shape()));
        };
        let value_shape = map.value();

        let info = match FieldKind::of(value_shape) {
            FieldKind::Struct => {
                let next = self.enter(depth, path)?;
                let info = self
                    .struct_info(value_shape.pointee())
                    .ok_or_else(|| type_mismatch(path, value_shape))?;
                Some((info, next))
            }
            _ => None,
        };

        let mut converted = Vec::with_capacity(entries.len());
        for (name, entry) in entries {
            let entry_path = format!("{path}[{name}]");
            let value = match (&info, value_shape.pointee().kind()) {
                (Some((info, next)), _) => {
                    self.bind_element(value_shape, info, getter, &entry.source, *next, &entry_path)?
                }
                (None, ShapeKind::List(list)) => {
                    let raws = self.split_values(getter.get_all(&entry.source));
                    let limit = self.config.settings().max_slice_len;
                    if raws.len() > limit {
                        let err = LimitError::new(LimitKind::SliceLength, &entry_path, raws.len(), limit);
                        return self.record(err);
                    }
                    let elements = match self.convert_elements(list.elem(), &entry.source, &raws, &entry_path) {
                        Ok(elements) => elements,
                        Err(err) => return self.record(err),
                    };
                    let Some(mut vec) = value_shape.pointee().construct() else {
                        return Err(type_mismatch(&entry_path, value_shape));
                    };
                    for element in elements {
                        if !list.push(&mut *vec, element) {
                            return Err(type_mismatch(&entry_path, list.elem()));
                        }
                    }
                    match value_shape.kind() {
                        ShapeKind::Optional(opt) => opt
                            .wrap(vec)
                            .ok_or_else(|| type_mismatch(&entry_path, value_shape))?,
                        _ => vec,
                    }
                }
                (None, _) => {
                    let raw = getter.get(&entry.source).unwrap_or("");
                    match convert_value(raw, value_shape, self.config) {
                        Ok(value) => value,
                        Err(err) => {
                            let err = self.conversion_error(value_shape, &entry.source, raw, &entry_path, err);
                            return self.record(err);
                        }
                    }
                }
            };
            converted.push((name, value));
        }

        let slot = pointee_slot(meta.shape(), reach(meta, target, path)?, path)?;
        map.reserve(slot, converted.len());
        for (name, value) in converted {
            if !map.insert(slot, name, value) {
                return Err(type_mismatch(path, value_shape));
            }
        }
        self.bound(path, key);
        Ok(())
    }

    fn bind_file(
        &mut self,
        target: &mut dyn Any,
        meta: &FieldMetadata,
        getter: &dyn ValueGetter,
        path: &str,
    ) -> Result<()> {
        self.stats.fields_attempted += 1;
        let primary = self.config.normalize_key(meta.primary_key());
        let Some(files) = getter.file_getter() else {
            return self.missing(meta, &primary, path);
        };
        let key = std::iter::once(meta.primary_key())
            .chain(meta.alias_keys().iter().map(String::as_str))
            .map(|key| self.config.normalize_key(key))
            .find(|key| files.has_file(key));
        let Some(key) = key else {
            return self.missing(meta, &primary, path);
        };

        if let ShapeKind::List(list) = meta.shape().pointee().kind() {
            let uploads = match files.files(&key) {
                Ok(uploads) => uploads,
                Err(err) => {
                    let err = BindError::file(path, &key, self.namespace, err.to_string()).with_cause(err);
                    return self.record(err);
                }
            };
            let limit = self.config.settings().max_slice_len;
            if uploads.len() > limit {
                return self.record(LimitError::new(LimitKind::SliceLength, path, uploads.len(), limit));
            }
            let slot = pointee_slot(meta.shape(), reach(meta, target, path)?, path)?;
            list.clear(slot);
            for upload in uploads {
                if !list.push(slot, Box::new(upload)) {
                    return Err(type_mismatch(path, list.elem()));
                }
            }
        } else {
            let upload = match files.file(&key) {
                Ok(upload) => upload,
                Err(err) => {
                    let err = BindError::file(path, &key, self.namespace, err.to_string()).with_cause(err);
                    return self.record(err);
                }
            };
            let slot = reach(meta, target, path)?;
            if !store(meta.shape(), slot, Box::new(upload)) {
                return Err(type_mismatch(path, meta.shape()));
            }
        }
        self.bound(path, &key);
        Ok(())
    }

    fn conversion_error(
        &self,
        shape: &TypeShape,
        key: &str,
        raw: &str,
        path: &str,
        err: ConvertError,
    ) -> BindError {
        if err.is_unsupported() {
            return BindError::unsupported(path, key, self.namespace, shape.name(), err.to_string());
        }
        let reason = match &err {
            ConvertError::Invalid { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        let bind_err = BindError::conversion(path, key, self.namespace, raw, shape.name(), reason);
        let bind_err = match err.hint() {
            Some(hint) => bind_err.with_hint(hint),
            None => bind_err,
        };
        bind_err.with_cause(err)
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn is_string(shape: &TypeShape) -> bool {
    matches!(shape.kind(), ShapeKind::Leaf(leaf) if matches!(leaf.repr(), LeafRepr::Primitive(Primitive::Str)))
}

fn type_mismatch(path: &str, shape: &TypeShape) -> Error {
    Error::structural(format!("field '{path}' does not hold a {}", shape.name()))
}

/// Borrows the field out of the struct being bound.
fn reach<'t>(meta: &FieldMetadata, target: &'t mut dyn Any, path: &str) -> Result<&'t mut dyn Any> {
    meta.resolve(target)
        .ok_or_else(|| Error::structural(format!("field '{path}' is not reachable on the destination")))
}

/// Looks through `Option<T>`, allocating the pointee when it is `None`.
fn pointee_slot<'t>(shape: &TypeShape, slot: &'t mut dyn Any, path: &str) -> Result<&'t mut dyn Any> {
    match shape.kind() {
        ShapeKind::Optional(opt) => opt.ensure(slot).ok_or_else(|| type_mismatch(path, shape)),
        _ => Ok(slot),
    }
}

/// Writes a pointee value into a field, wrapping it in `Some` when needed.
fn store(shape: &TypeShape, slot: &mut dyn Any, value: BoxedValue) -> bool {
    match shape.kind() {
        ShapeKind::Optional(opt) => opt.set_some(slot, value),
        _ => shape.assign(slot, value),
    }
}
