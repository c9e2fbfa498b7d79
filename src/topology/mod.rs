//! Explicit resource topology: declaration nodes, the ordered dependency
//! graph, and canonical plan rendering.

pub mod canonical;
pub mod graph;
pub mod node;

pub use canonical::to_canonical_json;
pub use graph::Topology;
pub use node::{
    CertificateSpec, DatabaseSpec, DnsRecordSpec, HealthCheckSpec, IngressSource, IngressSpec,
    LoadBalancerSpec, NetworkSpec, OutputSpec, ProbeProtocol, ResourceKind, ResourceNode,
    SecretEnvRef, SecretSpec, SecretTemplate, ServiceSpec, SubnetTier, TargetGroupSpec,
};
