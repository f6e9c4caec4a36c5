//! In-memory provider adapter
//!
//! Backs the engine with a plain map instead of a cloud API. Used as the
//! test collaborator: it records every call it receives, and individual
//! resources can be given injected faults or artificial latency to exercise
//! the engine's failure, idempotence and timeout paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use pyxis_core::provider::{AdapterError, AdapterResult, BoxFuture, ProviderAdapter};
use pyxis_core::{ObservedState, ResourceDescriptor, ResourceKind, Scope};

/// How a resource is addressed in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    pub kind: ResourceKind,
    pub scope: Scope,
    pub id: String,
}

impl ResourceAddress {
    pub fn new(kind: ResourceKind, scope: Scope, id: impl Into<String>) -> Self {
        Self {
            kind,
            scope,
            id: id.into(),
        }
    }
}

/// One adapter call as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe(String),
    Create(String),
    Delete(String),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        matches!(self, Call::Create(_) | Call::Delete(_))
    }

    pub fn id(&self) -> &str {
        match self {
            Call::Describe(id) | Call::Create(id) | Call::Delete(id) => id,
        }
    }
}

#[derive(Default)]
struct Inner {
    resources: Mutex<HashMap<ResourceAddress, Value>>,
    calls: Mutex<Vec<Call>>,
    describe_faults: Mutex<HashMap<String, AdapterError>>,
    create_faults: Mutex<HashMap<String, AdapterError>>,
    delete_faults: Mutex<HashMap<String, AdapterError>>,
    delay: Mutex<Option<Duration>>,
}

/// Map-backed adapter; clones share the same store
#[derive(Clone, Default)]
pub struct MemoryAdapter {
    inner: Arc<Inner>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a resource, as if it had been created out-of-band
    pub fn seed(&self, kind: ResourceKind, scope: Scope, id: impl Into<String>, spec: Value) {
        self.inner
            .resources
            .lock()
            .unwrap()
            .insert(ResourceAddress::new(kind, scope, id), spec);
    }

    pub fn contains(&self, kind: ResourceKind, scope: Scope, id: &str) -> bool {
        self.inner
            .resources
            .lock()
            .unwrap()
            .contains_key(&ResourceAddress::new(kind, scope, id))
    }

    pub fn spec_of(&self, kind: ResourceKind, scope: Scope, id: &str) -> Option<Value> {
        self.inner
            .resources
            .lock()
            .unwrap()
            .get(&ResourceAddress::new(kind, scope, id))
            .cloned()
    }

    pub fn resource_count(&self) -> usize {
        self.inner.resources.lock().unwrap().len()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// Only the create/delete calls received so far, in order
    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.calls.lock().unwrap().clear();
    }

    /// Make every describe of `id` fail with the given error
    pub fn fail_describe(&self, id: impl Into<String>, error: AdapterError) {
        self.inner
            .describe_faults
            .lock()
            .unwrap()
            .insert(id.into(), error);
    }

    /// Make every create of `id` fail with the given error
    pub fn fail_create(&self, id: impl Into<String>, error: AdapterError) {
        self.inner
            .create_faults
            .lock()
            .unwrap()
            .insert(id.into(), error);
    }

    /// Make every delete of `id` fail with the given error
    pub fn fail_delete(&self, id: impl Into<String>, error: AdapterError) {
        self.inner
            .delete_faults
            .lock()
            .unwrap()
            .insert(id.into(), error);
    }

    /// Delay every call by the given duration
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = Some(delay);
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
    }

    fn delay(&self) -> Option<Duration> {
        *self.inner.delay.lock().unwrap()
    }

    fn fault(faults: &Mutex<HashMap<String, AdapterError>>, id: &str) -> Option<AdapterError> {
        faults.lock().unwrap().get(id).cloned()
    }
}

impl ProviderAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn describe(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<ObservedState>> {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        let delay = self.delay();
        self.record(Call::Describe(id.clone()));
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = Self::fault(&inner.describe_faults, &id) {
                return Err(err);
            }
            let resources = inner.resources.lock().unwrap();
            match resources.get(&ResourceAddress::new(kind, scope, id)) {
                Some(spec) => Ok(ObservedState::Present(spec.clone())),
                None => Ok(ObservedState::Absent),
            }
        })
    }

    fn create(&self, descriptor: &ResourceDescriptor) -> BoxFuture<'_, AdapterResult<()>> {
        let inner = Arc::clone(&self.inner);
        let descriptor = descriptor.clone();
        let delay = self.delay();
        self.record(Call::Create(descriptor.id.clone()));
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = Self::fault(&inner.create_faults, &descriptor.id) {
                return Err(err);
            }
            let mut resources = inner.resources.lock().unwrap();
            let address =
                ResourceAddress::new(descriptor.kind, descriptor.scope, descriptor.id.clone());
            if resources.contains_key(&address) {
                return Err(AdapterError::AlreadyExists);
            }
            resources.insert(address, descriptor.spec);
            Ok(())
        })
    }

    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        scope: Scope,
    ) -> BoxFuture<'_, AdapterResult<()>> {
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        let delay = self.delay();
        self.record(Call::Delete(id.clone()));
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = Self::fault(&inner.delete_faults, &id) {
                return Err(err);
            }
            let mut resources = inner.resources.lock().unwrap();
            match resources.remove(&ResourceAddress::new(kind, scope, id)) {
                Some(_) => Ok(()),
                None => Err(AdapterError::AlreadyAbsent),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn describe_reflects_seeded_state() {
        let adapter = MemoryAdapter::new();
        adapter.seed(
            ResourceKind::StaticIp,
            Scope::Global,
            "lb-ip",
            json!({"tier": "premium"}),
        );

        let state = adapter
            .describe(ResourceKind::StaticIp, "lb-ip", Scope::Global)
            .await
            .unwrap();
        assert_eq!(state, ObservedState::Present(json!({"tier": "premium"})));

        let state = adapter
            .describe(ResourceKind::StaticIp, "other", Scope::Global)
            .await
            .unwrap();
        assert_eq!(state, ObservedState::Absent);
    }

    #[tokio::test]
    async fn create_is_strict_about_existing_resources() {
        let adapter = MemoryAdapter::new();
        let descriptor = ResourceDescriptor::new("web-vm", ResourceKind::Vm);

        adapter.create(&descriptor).await.unwrap();
        let err = adapter.create(&descriptor).await.unwrap_err();
        assert_eq!(err, AdapterError::AlreadyExists);
    }

    #[tokio::test]
    async fn delete_reports_already_absent() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .delete(ResourceKind::Vm, "web-vm", Scope::Zonal)
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::AlreadyAbsent);
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let adapter = MemoryAdapter::new();
        let descriptor = ResourceDescriptor::new("web-vm", ResourceKind::Vm);

        let _ = adapter
            .describe(ResourceKind::Vm, "web-vm", Scope::Zonal)
            .await;
        let _ = adapter.create(&descriptor).await;
        let _ = adapter.delete(ResourceKind::Vm, "web-vm", Scope::Zonal).await;

        assert_eq!(
            adapter.calls(),
            vec![
                Call::Describe("web-vm".into()),
                Call::Create("web-vm".into()),
                Call::Delete("web-vm".into()),
            ]
        );
        assert_eq!(adapter.mutations().len(), 2);
    }

    #[tokio::test]
    async fn injected_fault_overrides_store() {
        let adapter = MemoryAdapter::new();
        adapter.fail_create("web-vm", AdapterError::PermissionDenied("no token".into()));

        let err = adapter
            .create(&ResourceDescriptor::new("web-vm", ResourceKind::Vm))
            .await
            .unwrap_err();
        assert_eq!(err, AdapterError::PermissionDenied("no token".into()));
        assert!(!adapter.contains(ResourceKind::Vm, Scope::Zonal, "web-vm"));
    }
}
