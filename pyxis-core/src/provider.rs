//! Provider adapter - Trait abstracting per-kind resource operations
//!
//! An adapter implements {describe, create, delete} against a real cloud API.
//! The engine never calls any other provider operation and never inspects
//! provider responses beyond presence/absence and the structural spec value.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::descriptor::{ObservedState, ResourceDescriptor, ResourceKind, Scope};
use crate::error::ErrorKind;

/// Failures at the adapter boundary
///
/// `AlreadyExists` and `AlreadyAbsent` are not failures from the engine's
/// point of view: create/delete must be idempotent, and the engine folds
/// both into NoOp outcomes to tolerate concurrent external mutation or a
/// partial retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("resource already exists")]
    AlreadyExists,

    #[error("resource already absent")]
    AlreadyAbsent,
}

impl From<AdapterError> for ErrorKind {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unavailable(msg) => ErrorKind::AdapterUnavailable(msg),
            AdapterError::PermissionDenied(msg) => ErrorKind::PermissionDenied(msg),
            AdapterError::Conflict(msg) => ErrorKind::Conflict(msg),
            // Only reachable when an adapter reports these outside of the
            // create/delete calls where the engine special-cases them.
            AdapterError::AlreadyExists => ErrorKind::Conflict("resource already exists".into()),
            AdapterError::AlreadyAbsent => ErrorKind::Conflict("resource already absent".into()),
        }
    }
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Return type for async adapter operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main provider adapter trait
///
/// Each infrastructure provider implements this trait. All operations are
/// async, involve external I/O, and may be slow; the engine wraps every call
/// in its configured timeout.
pub trait ProviderAdapter: Send + Sync {
    /// Name of this adapter (e.g. "gcloud")
    fn name(&self) -> &'static str;

    /// Query the current state of a resource
    ///
    /// Returns [`ObservedState::Absent`] if the resource does not exist.
    fn describe(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<ObservedState>>;

    /// Create a resource from its descriptor
    fn create(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'_, AdapterResult<()>>;

    /// Delete a resource
    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<()>>;
}

/// ProviderAdapter implementation for Box<dyn ProviderAdapter>
/// This enables dynamic dispatch for adapters
impl ProviderAdapter for Box<dyn ProviderAdapter> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn describe(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<ObservedState>> {
        (**self).describe(kind, id, scope)
    }

    fn create(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'_, AdapterResult<()>> {
        (**self).create(descriptor)
    }

    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<()>> {
        (**self).delete(kind, id, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock adapter where nothing exists and every mutation succeeds
    struct EmptyAdapter;

    impl ProviderAdapter for EmptyAdapter {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn describe(
            &self,
            _kind: ResourceKind,
            _id: &str,
            _scope: Scope,
        ) -> BoxFuture<'_, AdapterResult<ObservedState>> {
            Box::pin(async { Ok(ObservedState::Absent) })
        }

        fn create(&self, _descriptor: &ResourceDescriptor) -> BoxFuture<'_, AdapterResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn delete(
            &self,
            _kind: ResourceKind,
            _id: &str,
            _scope: Scope,
        ) -> BoxFuture<'_, AdapterResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn describe_through_boxed_adapter() {
        let adapter: Box<dyn ProviderAdapter> = Box::new(EmptyAdapter);
        let state = adapter
            .describe(ResourceKind::Vm, "web-vm", Scope::Zonal)
            .await
            .unwrap();
        assert_eq!(state, ObservedState::Absent);
    }

    #[test]
    fn adapter_error_maps_into_error_kind() {
        let kind: ErrorKind = AdapterError::Unavailable("connection refused".into()).into();
        assert_eq!(kind, ErrorKind::AdapterUnavailable("connection refused".into()));

        let kind: ErrorKind = AdapterError::PermissionDenied("no token".into()).into();
        assert_eq!(kind, ErrorKind::PermissionDenied("no token".into()));
    }
}
