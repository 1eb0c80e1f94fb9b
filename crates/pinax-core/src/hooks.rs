//! Validator capability and observability hooks.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::shape::BoxError;

/// Validates a destination after a successful bind.
///
/// The target is handed over type-erased; implementations downcast to the
/// types they know and accept everything else. [`validate_with`] builds one
/// from a closure over a concrete type.
pub trait Validator: Send + Sync {
    /// Checks the bound value.
    ///
    /// # Errors
    ///
    /// Returns the reason the value is not acceptable.
    fn validate(&self, target: &dyn Any) -> Result<(), BoxError>;
}

/// A [`Validator`] for one concrete destination type.
pub struct FnValidator<T, F> {
    check: F,
    _target: PhantomData<fn(&T)>,
}

impl<T, F> Validator for FnValidator<T, F>
where
    T: Any,
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync,
{
    fn validate(&self, target: &dyn Any) -> Result<(), BoxError> {
        match target.downcast_ref::<T>() {
            Some(target) => (self.check)(target),
            None => Ok(()),
        }
    }
}

/// Builds a validator that runs `check` on destinations of type `T`.
///
/// ```rust
/// use pinax_core::{validate_with, Validator};
///
/// struct Range { lo: u32, hi: u32 }
///
/// let v = validate_with(|r: &Range| {
///     if r.lo <= r.hi { Ok(()) } else { Err("lo must not exceed hi".into()) }
/// });
/// assert!(v.validate(&Range { lo: 1, hi: 2 }).is_ok());
/// assert!(v.validate(&Range { lo: 3, hi: 2 }).is_err());
/// ```
pub fn validate_with<T, F>(check: F) -> FnValidator<T, F>
where
    T: Any,
    F: Fn(&T) -> Result<(), BoxError> + Send + Sync,
{
    FnValidator {
        check,
        _target: PhantomData,
    }
}

/// Counters accumulated over one bind call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindStats {
    /// Fields for which a value was looked up.
    pub fields_attempted: usize,
    /// Fields that received a value.
    pub fields_bound: usize,
    /// Errors raised.
    pub errors: usize,
}

/// Reported to [`BindHooks::on_field_bound`] for every successfully bound field.
#[derive(Debug, Clone, Copy)]
pub struct FieldEvent<'a> {
    /// Declared field path.
    pub field: &'a str,
    /// The key that supplied the value.
    pub key: &'a str,
    /// Tag namespace of the source.
    pub namespace: &'a str,
}

type FieldHook = Arc<dyn Fn(&FieldEvent<'_>) + Send + Sync>;
type CompleteHook = Arc<dyn Fn(&BindStats) + Send + Sync>;
type UnknownHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional observability callbacks.
#[derive(Clone, Default)]
pub struct BindHooks {
    pub(crate) field_bound: Option<FieldHook>,
    pub(crate) complete: Option<CompleteHook>,
    pub(crate) unknown_field: Option<UnknownHook>,
}

impl BindHooks {
    /// Creates an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after each field is bound.
    #[must_use]
    pub fn on_field_bound<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FieldEvent<'_>) + Send + Sync + 'static,
    {
        self.field_bound = Some(Arc::new(hook));
        self
    }

    /// Called once per bind on every exit path, with the final counters.
    #[must_use]
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BindStats) + Send + Sync + 'static,
    {
        self.complete = Some(Arc::new(hook));
        self
    }

    /// Called with the dotted path of every unknown JSON field under the
    /// warn policy.
    #[must_use]
    pub fn on_unknown_field<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.unknown_field = Some(Arc::new(hook));
        self
    }

    /// Fires the field-bound hook, if set.
    pub fn field_bound(&self, event: &FieldEvent<'_>) {
        if let Some(hook) = &self.field_bound {
            hook(event);
        }
    }

    /// Fires the completion hook, if set.
    pub fn complete(&self, stats: &BindStats) {
        if let Some(hook) = &self.complete {
            hook(stats);
        }
    }

    /// Fires the unknown-field hook. Returns false when none is installed.
    pub fn unknown_field(&self, path: &str) -> bool {
        match &self.unknown_field {
            Some(hook) => {
                hook(path);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for BindHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindHooks")
            .field("on_field_bound", &self.field_bound.is_some())
            .field("on_complete", &self.complete.is_some())
            .field("on_unknown_field", &self.unknown_field.is_some())
            .finish()
    }
}
