//! Composition state machine definition.
//!
//! The state is the complete snapshot of a composition run.
//! It's serializable, restorable, and the composer doesn't care how you
//! persist it — that's the backend's problem.

use crate::request::DeploymentRequest;
use crate::topology::Topology;
use crate::types::{
    CertificateHandle, DatabaseHandle, DeploymentOutputs, NetworkHandle, SecretHandle,
    ServiceHandle,
};
use serde::{Deserialize, Serialize};

/// Composition steps — the state machine's nodes.
///
/// Order matters: every step references only the outputs of earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Apply defaults and reject invalid requests before declaring anything.
    Validate,
    /// Network topology: no NAT gateways, two availability zones.
    Network,
    /// Database admin secret with a fixed username and generated password.
    AdminSecret,
    /// Database cluster on the isolated subnet tier.
    Database,
    /// Compose the backend DSN and store it as a secret.
    BackendDsn,
    /// Certificate issuance (custom domain only).
    Certificate,
    /// Application-server password.
    ServerSecret,
    /// Container service behind a network load balancer.
    Service,
    /// Open network access paths.
    Connectivity,
    /// Health probe and deregistration delay on the target group.
    HealthCheck,
    /// CNAME binding for the custom domain (custom domain only).
    DnsRecord,
    /// Prune redundant outputs, emit the credential secret.
    Outputs,
    /// Done.
    Complete,
    /// Failed, possibly recoverable.
    Failed { reason: String, recoverable: bool },
}

impl Step {
    /// Human-readable step name for logging/display.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Validate => "validate",
            Step::Network => "network",
            Step::AdminSecret => "admin_secret",
            Step::Database => "database",
            Step::BackendDsn => "backend_dsn",
            Step::Certificate => "certificate",
            Step::ServerSecret => "server_secret",
            Step::Service => "service",
            Step::Connectivity => "connectivity",
            Step::HealthCheck => "health_check",
            Step::DnsRecord => "dns_record",
            Step::Outputs => "outputs",
            Step::Complete => "complete",
            Step::Failed { .. } => "failed",
        }
    }
}

/// Full composition state — serializable, restorable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeState {
    /// Unique session identifier.
    pub session_id: String,
    /// Current step in the composition.
    pub step: Step,
    /// The request this composition is evaluating.
    pub request: DeploymentRequest,
    /// Resolved high-availability flag (absent in the request means true).
    pub high_availability: bool,

    /// The declared resource topology, grown one step at a time.
    pub topology: Topology,

    // Handles populated as composition progresses
    pub network: Option<NetworkHandle>,
    pub admin_secret: Option<SecretHandle>,
    pub database: Option<DatabaseHandle>,
    pub backend_dsn: Option<SecretHandle>,
    pub certificate: Option<CertificateHandle>,
    pub server_secret: Option<SecretHandle>,
    pub service: Option<ServiceHandle>,
    pub credential_secret: Option<SecretHandle>,

    /// Final outputs, set when the run completes.
    pub outputs: Option<DeploymentOutputs>,

    // Audit
    /// Unix timestamp of creation.
    pub created_at: u64,
    /// Unix timestamp of last update.
    pub updated_at: u64,
}

impl ComposeState {
    /// Create a new composition state for a request.
    pub fn new(session_id: impl Into<String>, request: DeploymentRequest) -> Self {
        let now = current_unix_time();

        Self {
            session_id: session_id.into(),
            step: Step::Validate,
            request,
            high_availability: true,
            topology: Topology::new(),
            network: None,
            admin_secret: None,
            database: None,
            backend_dsn: None,
            certificate: None,
            server_secret: None,
            service: None,
            credential_secret: None,
            outputs: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Is this composition in a terminal state?
    pub fn is_terminal(&self) -> bool {
        matches!(self.step, Step::Complete | Step::Failed { .. })
    }

    /// Is this composition failed?
    pub fn is_failed(&self) -> bool {
        matches!(self.step, Step::Failed { .. })
    }

    /// Is this composition complete?
    pub fn is_complete(&self) -> bool {
        matches!(self.step, Step::Complete)
    }

    /// Transition to a new step.
    pub fn transition(&mut self, step: Step) {
        self.step = step;
        self.updated_at = current_unix_time();
    }

    /// Fail the composition.
    pub fn fail(&mut self, reason: impl Into<String>, recoverable: bool) {
        self.step = Step::Failed {
            reason: reason.into(),
            recoverable,
        };
        self.updated_at = current_unix_time();
    }
}

fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
