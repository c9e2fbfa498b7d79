//! Default plan backend: a local synthesizer implementing [`CloudBackend`].
//!
//! No cloud account, no network I/O. Secret material is generated locally
//! and synthesized resource names (cluster hostname, load balancer DNS
//! name, retrieval references) are derived deterministically from the
//! backend's scope, so two runs over the same scope render the same plan.
//! State lives in memory; persist it through a
//! [`PlanStore`](crate::store::PlanStore) if you need it back.

use crate::backend::CloudBackend;
use crate::error::ComposeError;
use crate::secret::generate_password;
use crate::state::ComposeState;
use crate::topology::{
    CertificateSpec, DatabaseSpec, DnsRecordSpec, LoadBalancerSpec, NetworkSpec, SecretSpec,
    ServiceSpec,
};
use crate::types::{
    CertificateHandle, DatabaseHandle, NetworkHandle, SecretHandle, SecretPayload, ServiceHandle,
};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

const DEFAULT_PASSWORD_LENGTH: usize = 32;

/// Local [`CloudBackend`] that synthesizes a plan instead of provisioning.
pub struct PlanBackend {
    scope: String,
    password_length: usize,
    states: Mutex<HashMap<String, ComposeState>>,
}

impl PlanBackend {
    /// Create a backend scoped under a name. The scope seeds every
    /// synthesized resource name.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            password_length: DEFAULT_PASSWORD_LENGTH,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Deterministic name fragment for a resource within this scope.
    fn derive(&self, parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.scope.as_bytes());
        for part in parts {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        let hash = hasher.finalize();
        hex::encode(&hash[..6])
    }

    fn retrieval_ref(&self, logical_id: &str) -> String {
        format!("secret://{}/{}", self.scope, logical_id)
    }

    fn generate(&self, spec: &SecretSpec) -> SecretPayload {
        // Only punctuation-free generation is supported locally; the
        // composer never asks for punctuated material.
        debug_assert!(spec.exclude_punctuation);

        match &spec.template {
            Some(template) => {
                let mut fields = serde_json::Map::new();
                for (key, value) in &template.fields {
                    fields.insert(key.clone(), serde_json::Value::String(value.clone()));
                }
                fields.insert(
                    template.generate_key.clone(),
                    serde_json::Value::String(generate_password(self.password_length)),
                );
                SecretPayload::Json(serde_json::Value::Object(fields))
            }
            None => SecretPayload::Text(generate_password(self.password_length)),
        }
    }
}

impl Default for PlanBackend {
    fn default() -> Self {
        Self::new("edgedb")
    }
}

impl CloudBackend for PlanBackend {
    async fn provision_network(
        &self,
        _session_id: &str,
        spec: &NetworkSpec,
    ) -> Result<NetworkHandle, ComposeError> {
        let isolated_subnet_ids = (0..spec.max_azs)
            .map(|az| format!("subnet-{}", self.derive(&["subnet", &az.to_string()])))
            .collect();
        Ok(NetworkHandle {
            network_id: format!("vpc-{}", self.derive(&["vpc"])),
            isolated_subnet_ids,
            max_azs: spec.max_azs,
        })
    }

    async fn create_secret(
        &self,
        session_id: &str,
        logical_id: &str,
        spec: &SecretSpec,
        value: Option<&SecretPayload>,
    ) -> Result<SecretHandle, ComposeError> {
        let payload = match value {
            Some(provided) => provided.clone(),
            None => self.generate(spec),
        };
        debug!(session = session_id, secret = logical_id, "synthesized secret");
        Ok(SecretHandle {
            logical_id: logical_id.to_string(),
            retrieval_ref: self.retrieval_ref(logical_id),
            value: payload,
        })
    }

    async fn provision_database(
        &self,
        _session_id: &str,
        spec: &DatabaseSpec,
        _network: &NetworkHandle,
        credentials: &SecretHandle,
    ) -> Result<DatabaseHandle, ComposeError> {
        Ok(DatabaseHandle {
            endpoint_hostname: format!(
                "{}-db.cluster-{}.rds.internal",
                self.scope,
                self.derive(&["database"])
            ),
            port: spec.port,
            secret_ref: credentials.retrieval_ref.clone(),
            instance_count: spec.instance_count,
        })
    }

    async fn request_certificate(
        &self,
        _session_id: &str,
        spec: &CertificateSpec,
    ) -> Result<CertificateHandle, ComposeError> {
        debug!(domain = %spec.domain, "synthesized certificate");
        Ok(CertificateHandle {
            secret_ref: self.retrieval_ref("endpoint-certificate"),
            key_field: "keyPem".to_string(),
            cert_field: "certPem".to_string(),
        })
    }

    async fn provision_service(
        &self,
        _session_id: &str,
        spec: &ServiceSpec,
        load_balancer: &LoadBalancerSpec,
        _network: &NetworkHandle,
    ) -> Result<ServiceHandle, ComposeError> {
        debug_assert_eq!(spec.container_port, load_balancer.listener_port);
        Ok(ServiceHandle {
            lb_dns_name: format!(
                "{}-nlb-{}.elb.internal",
                self.scope,
                self.derive(&["nlb"])
            ),
            load_balancer_id: format!("nlb-{}", self.derive(&["nlb", "id"])),
            target_group_id: format!("tg-{}", self.derive(&["tg"])),
            desired_count: spec.desired_count,
        })
    }

    async fn create_dns_record(
        &self,
        _session_id: &str,
        spec: &DnsRecordSpec,
    ) -> Result<(), ComposeError> {
        debug!(record = %spec.record_name, target = %spec.domain_name, "synthesized DNS record");
        Ok(())
    }

    async fn load_state(&self, session_id: &str) -> Result<Option<ComposeState>, ComposeError> {
        let states = self
            .states
            .lock()
            .map_err(|_| ComposeError::Storage("state lock poisoned".into()))?;
        Ok(states.get(session_id).cloned())
    }

    async fn save_state(
        &self,
        session_id: &str,
        state: &ComposeState,
    ) -> Result<(), ComposeError> {
        let mut states = self
            .states
            .lock()
            .map_err(|_| ComposeError::Storage("state lock poisoned".into()))?;
        states.insert(session_id.to_string(), state.clone());
        Ok(())
    }
}
