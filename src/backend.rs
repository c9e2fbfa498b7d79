//! The One Trait: CloudBackend
//!
//! This is the single abstraction point for all external collaborators.
//! The composer is pure wiring logic — it doesn't know about cloud SDKs,
//! accounts, credentials, or retry policies. That's YOUR problem when you
//! implement this trait. Convergence, polling, and rollback also live on
//! the other side of this seam.

use crate::error::ComposeError;
use crate::state::ComposeState;
use crate::topology::{
    CertificateSpec, DatabaseSpec, DnsRecordSpec, LoadBalancerSpec, NetworkSpec, SecretSpec,
    ServiceSpec,
};
use crate::types::{
    CertificateHandle, DatabaseHandle, NetworkHandle, SecretHandle, SecretPayload, ServiceHandle,
};
use std::future::Future;

/// The single trait consumers implement to run the deployment composer.
///
/// Abstracts:
/// - Network topology provisioning
/// - Secret creation and retrieval references
/// - Database cluster provisioning
/// - Certificate issuance (may be slow-completing)
/// - Container service + load balancer provisioning
/// - DNS record creation
/// - Composition state persistence
pub trait CloudBackend: Send + Sync {
    /// Provision a virtual network with isolated subnets.
    fn provision_network(
        &self,
        session_id: &str,
        spec: &NetworkSpec,
    ) -> impl Future<Output = Result<NetworkHandle, ComposeError>> + Send;

    /// Create a secret.
    ///
    /// When `value` is supplied the store holds it verbatim; otherwise the
    /// store generates the material per `spec` (honoring
    /// `exclude_punctuation` and filling the template's generate key).
    fn create_secret(
        &self,
        session_id: &str,
        logical_id: &str,
        spec: &SecretSpec,
        value: Option<&SecretPayload>,
    ) -> impl Future<Output = Result<SecretHandle, ComposeError>> + Send;

    /// Provision a database cluster using previously created credentials.
    fn provision_database(
        &self,
        session_id: &str,
        spec: &DatabaseSpec,
        network: &NetworkHandle,
        credentials: &SecretHandle,
    ) -> impl Future<Output = Result<DatabaseHandle, ComposeError>> + Send;

    /// Request certificate issuance for a custom domain.
    ///
    /// Issuance may take a long time in the external engine; the composer
    /// declares the container service strictly after this completes.
    fn request_certificate(
        &self,
        session_id: &str,
        spec: &CertificateSpec,
    ) -> impl Future<Output = Result<CertificateHandle, ComposeError>> + Send;

    /// Provision the container service behind a network load balancer.
    fn provision_service(
        &self,
        session_id: &str,
        spec: &ServiceSpec,
        load_balancer: &LoadBalancerSpec,
        network: &NetworkHandle,
    ) -> impl Future<Output = Result<ServiceHandle, ComposeError>> + Send;

    /// Create a DNS record in a hosted zone.
    fn create_dns_record(
        &self,
        session_id: &str,
        spec: &DnsRecordSpec,
    ) -> impl Future<Output = Result<(), ComposeError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // STATE PERSISTENCE
    // ═══════════════════════════════════════════════════════════════

    /// Load composition state by session ID.
    fn load_state(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<ComposeState>, ComposeError>> + Send;

    /// Save composition state.
    fn save_state(
        &self,
        session_id: &str,
        state: &ComposeState,
    ) -> impl Future<Output = Result<(), ComposeError>> + Send;
}
