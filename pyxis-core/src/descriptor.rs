//! Descriptor - Declared resources and their observed state

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource type tag
///
/// The set of infrastructure object kinds the engine knows how to address.
/// The provider adapter is responsible for mapping a kind to its actual API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vm,
    FirewallRule,
    HealthCheck,
    BackendService,
    UrlMap,
    HttpsProxy,
    SslCertificate,
    StaticIp,
    InstanceGroup,
    ForwardingRule,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vm => "vm",
            ResourceKind::FirewallRule => "firewall-rule",
            ResourceKind::HealthCheck => "health-check",
            ResourceKind::BackendService => "backend-service",
            ResourceKind::UrlMap => "url-map",
            ResourceKind::HttpsProxy => "https-proxy",
            ResourceKind::SslCertificate => "ssl-certificate",
            ResourceKind::StaticIp => "static-ip",
            ResourceKind::InstanceGroup => "instance-group",
            ResourceKind::ForwardingRule => "forwarding-rule",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the provider addresses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Zonal,
    Global,
}

/// One declared desired infrastructure object plus its dependency edges
///
/// The `id` is caller-assigned and stable across runs for the same logical
/// resource. `spec` is an opaque, kind-specific payload compared structurally
/// when diffing against observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    pub kind: ResourceKind,
    /// Ids that must exist before this resource is created, and must not be
    /// removed before this resource is removed.
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    #[serde(default)]
    pub spec: Value,
    pub scope: Scope,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on: BTreeSet::new(),
            spec: Value::Null,
            scope: Scope::Zonal,
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_spec(mut self, spec: Value) -> Self {
        self.spec = spec;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }
}

/// Result of a `describe` call against the provider
///
/// Always re-queried at plan time; never cached across runs, since external
/// state may change out-of-band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservedState {
    Absent,
    Present(Value),
}

impl ObservedState {
    pub fn is_present(&self) -> bool {
        matches!(self, ObservedState::Present(_))
    }
}

/// Caller-facing input for one run
///
/// `desired` is reconciled toward existence; `removed` lists formerly-managed
/// descriptors the caller wants retired. The core holds no store between
/// runs, so retirement is declared explicitly rather than inferred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub desired: Vec<ResourceDescriptor>,
    #[serde(default)]
    pub removed: Vec<ResourceDescriptor>,
}

impl Manifest {
    pub fn new(desired: Vec<ResourceDescriptor>) -> Self {
        Self {
            desired,
            removed: Vec::new(),
        }
    }

    pub fn with_removed(mut self, removed: Vec<ResourceDescriptor>) -> Self {
        self.removed = removed;
        self
    }

    /// Retire an entire descriptor set (full teardown)
    pub fn destroy_all(descriptors: Vec<ResourceDescriptor>) -> Self {
        Self {
            desired: Vec::new(),
            removed: descriptors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty() && self.removed.is_empty()
    }
}
