//! Resource declaration nodes and their spec payloads.
//!
//! A node is what the composer asks an external collaborator for; the
//! payload carries exactly the parameters of the matching backend call.
//! Secret nodes never carry secret values — material travels through
//! handles, so a rendered plan is safe to print or persist.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Network topology request: a virtual network with isolated subnets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub nat_gateways: u32,
    pub max_azs: u32,
}

/// JSON template for a generated secret: fixed fields plus one key that
/// receives the generated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretTemplate {
    pub fields: BTreeMap<String, String>,
    pub generate_key: String,
}

/// Secret creation request. The value is either generated by the store
/// or supplied by the composer out of band — never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    pub exclude_punctuation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<SecretTemplate>,
}

/// Subnet tier a resource is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    Public,
    PrivateWithEgress,
    PrivateIsolated,
}

/// Relational database cluster request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSpec {
    pub engine: String,
    pub engine_version: String,
    pub instance_class: String,
    pub subnet_tier: SubnetTier,
    pub instance_count: u32,
    pub default_db_name: String,
    pub port: u16,
    /// Node id of the admin credentials secret.
    pub credentials_ref: String,
}

/// Certificate issuance request. May be slow-completing in the external
/// engine; dependents must be declared after this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSpec {
    pub domain: String,
    pub email: String,
    pub zone_id: String,
}

/// Network load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancerSpec {
    pub listener_port: u16,
    pub internet_facing: bool,
}

/// Health probe protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeProtocol {
    Tcp,
    Http,
    Https,
}

/// Target group health check configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    pub path: String,
    pub interval_seconds: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
    pub protocol: ProbeProtocol,
}

/// Load balancer target group. Health check and deregistration delay are
/// amended after declaration, mirroring how the service composite is
/// configured in two passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deregistration_delay_seconds: Option<u32>,
}

/// Secret-backed environment injection: which secret, and optionally
/// which field of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEnvRef {
    /// Opaque retrieval reference of the secret being injected.
    pub secret_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Container service request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub image: String,
    pub cpu_units: u32,
    pub memory_mib: u32,
    pub container_port: u16,
    pub desired_count: u32,
    pub assign_public_ip: bool,
    pub health_check_grace_seconds: u32,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    pub env: BTreeMap<String, String>,
    pub secret_env: BTreeMap<String, SecretEnvRef>,
}

/// Where ingress traffic originates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngressSource {
    /// Another declared node (e.g. the container service).
    Node(String),
    /// Any IPv4 address.
    AnyIpv4,
}

/// Network access rule: allow `source` to reach `target` on `port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressSpec {
    pub source: IngressSource,
    /// Node id of the resource being reached.
    pub target: String,
    pub port: u16,
}

/// DNS record request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecordSpec {
    pub record_type: String,
    /// Name of the record being created (the custom FQDN).
    pub record_name: String,
    /// Value the record points at (the load balancer DNS name).
    pub domain_name: String,
    pub zone_id: String,
    pub zone_name: String,
    pub ttl_seconds: u32,
}

/// Informational output a provisioner attaches to the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub description: String,
    /// Node id whose value this output surfaces.
    pub value_ref: String,
}

/// The kind of resource a node declares, with its request payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResourceKind {
    Network(NetworkSpec),
    Secret(SecretSpec),
    Database(DatabaseSpec),
    Certificate(CertificateSpec),
    LoadBalancer(LoadBalancerSpec),
    TargetGroup(TargetGroupSpec),
    Service(ServiceSpec),
    Ingress(IngressSpec),
    DnsRecord(DnsRecordSpec),
    Output(OutputSpec),
}

impl ResourceKind {
    /// Kind name for logging/display.
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Network(_) => "network",
            ResourceKind::Secret(_) => "secret",
            ResourceKind::Database(_) => "database",
            ResourceKind::Certificate(_) => "certificate",
            ResourceKind::LoadBalancer(_) => "load_balancer",
            ResourceKind::TargetGroup(_) => "target_group",
            ResourceKind::Service(_) => "service",
            ResourceKind::Ingress(_) => "ingress",
            ResourceKind::DnsRecord(_) => "dns_record",
            ResourceKind::Output(_) => "output",
        }
    }
}

/// One declaration in the dependency-ordered plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    /// Ids of nodes whose outputs this node references. Must all be
    /// declared strictly before this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            depends_on: Vec::new(),
        }
    }

    /// Add a dependency on an earlier node.
    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder() {
        let node = ResourceNode::new(
            "aurora-database",
            ResourceKind::Database(DatabaseSpec {
                engine: "aurora-postgresql".to_string(),
                engine_version: "13.4".to_string(),
                instance_class: "db.t4g.medium".to_string(),
                subnet_tier: SubnetTier::PrivateIsolated,
                instance_count: 2,
                default_db_name: "postgres".to_string(),
                port: 5432,
                credentials_ref: "aurora-password".to_string(),
            }),
        )
        .with_dependency("vpc")
        .with_dependency("aurora-password");

        assert_eq!(node.id, "aurora-database");
        assert_eq!(node.kind.name(), "database");
        assert_eq!(node.depends_on, vec!["vpc", "aurora-password"]);
    }

    #[test]
    fn test_secret_spec_carries_no_value() {
        let spec = SecretSpec {
            exclude_punctuation: true,
            template: Some(SecretTemplate {
                fields: BTreeMap::from([
                    ("username".to_string(), "postgres".to_string()),
                    ("password".to_string(), String::new()),
                ]),
                generate_key: "password".to_string(),
            }),
        };

        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("exclude_punctuation"));
        // The template's password field is the empty placeholder, never a value
        assert!(json.contains(r#""password":"""#));
    }
}
