//! Operation Registration Module
//!
//! Metadata every cacheable operation registers once before use.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::EntryKind;
use crate::error::{CacheError, Result};

/// Error type a validator may return; treated the same as "not usable".
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased validator run against a cached resource before reuse.
pub type Validator = Arc<
    dyn Fn(&(dyn Any + Send + Sync)) -> std::result::Result<bool, BoxError> + Send + Sync,
>;

// == Operation Spec ==
/// Typed builder describing one cacheable operation.
///
/// ```ignore
/// cache
///     .register(OperationSpec::<ExampleData>::data("configurable_example")
///         .ttl(Duration::from_secs(30))
///         .max_entries(5))
///     .await?;
/// ```
pub struct OperationSpec<T> {
    id: String,
    kind: EntryKind,
    ttl: Option<Duration>,
    max_entries: Option<usize>,
    validator: Option<Validator>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> OperationSpec<T> {
    /// An operation whose results are handed out by value.
    pub fn data(id: impl Into<String>) -> Self
    where
        T: Clone,
    {
        Self::with_kind(id, EntryKind::Data)
    }

    /// An operation whose result is a shared live resource.
    pub fn resource(id: impl Into<String>) -> Self {
        Self::with_kind(id, EntryKind::Resource)
    }

    fn with_kind(id: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            id: id.into(),
            kind,
            ttl: None,
            max_entries: None,
            validator: None,
            _marker: PhantomData,
        }
    }

    /// Entries expire once strictly more than `ttl` has elapsed.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// At most `max` entries of this operation are kept (FIFO eviction).
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Checks a cached resource before it is reused. Resource operations only.
    pub fn validate<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        let validator: Validator = Arc::new(move |value: &(dyn Any + Send + Sync)| {
            match value.downcast_ref::<T>() {
                Some(typed) => check(typed),
                None => Ok(false),
            }
        });
        self.validator = Some(validator);
        self
    }

    pub(crate) fn into_meta(self) -> Result<OperationMeta> {
        if self.max_entries == Some(0) {
            return Err(CacheError::InvalidOperation {
                operation: self.id,
                reason: "max_entries must be at least 1".to_string(),
            });
        }
        if self.kind == EntryKind::Data && self.validator.is_some() {
            return Err(CacheError::InvalidOperation {
                operation: self.id,
                reason: "validation is only supported for resource operations".to_string(),
            });
        }

        Ok(OperationMeta {
            id: self.id,
            kind: self.kind,
            ttl: self.ttl,
            max_entries: self.max_entries,
            validator: self.validator,
            value_type: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        })
    }
}

// == Operation Meta ==
/// Registered, type-erased metadata of one operation.
#[derive(Clone)]
pub struct OperationMeta {
    pub id: String,
    pub kind: EntryKind,
    pub ttl: Option<Duration>,
    pub max_entries: Option<usize>,
    pub validator: Option<Validator>,
    pub value_type: TypeId,
    pub type_name: &'static str,
}

impl OperationMeta {
    /// Rejects a call whose value type or kind differs from the registration.
    pub fn check_call<T: 'static>(&self, kind: EntryKind) -> Result<()> {
        if self.value_type != TypeId::of::<T>() {
            return Err(CacheError::TypeMismatch {
                operation: self.id.clone(),
                registered: self.type_name,
                requested: type_name::<T>(),
            });
        }
        if self.kind != kind {
            return Err(CacheError::KindMismatch {
                operation: self.id.clone(),
                registered: self.kind.as_str(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for OperationMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationMeta")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .field("validated", &self.validator.is_some())
            .field("type_name", &self.type_name)
            .finish()
    }
}
