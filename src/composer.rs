//! Deployment Composer Engine
//!
//! The state machine that turns a request into a resource topology. It's
//! dumb — it declares nodes, calls the backend, and transitions. No
//! retries, no polling, no rollback. Convergence belongs to the external
//! provisioning engine.

use crate::backend::CloudBackend;
use crate::error::ComposeError;
use crate::state::{ComposeState, Step};
use crate::topology::{
    CertificateSpec, DatabaseSpec, DnsRecordSpec, HealthCheckSpec, IngressSource, IngressSpec,
    LoadBalancerSpec, NetworkSpec, OutputSpec, ProbeProtocol, ResourceKind, ResourceNode,
    SecretEnvRef, SecretSpec, SecretTemplate, ServiceSpec, SubnetTier, TargetGroupSpec,
};
use crate::types::{CredentialBundle, CredentialSecret, DeploymentOutputs, SecretPayload};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Logical node ids of the declared topology.
pub mod nodes {
    pub const VPC: &str = "vpc";
    pub const ADMIN_SECRET: &str = "aurora-password";
    pub const DATABASE: &str = "aurora-database";
    pub const BACKEND_DSN: &str = "aurora-database-dsn";
    pub const CERTIFICATE: &str = "endpoint-certificate";
    pub const SERVER_SECRET: &str = "server-password";
    pub const LOAD_BALANCER: &str = "nlb";
    pub const TARGET_GROUP: &str = "nlb-target-group";
    pub const SERVICE: &str = "edgedb-service";
    /// Redundant informational output the service composite auto-creates;
    /// pruned again at the Outputs step.
    pub const LB_DNS_OUTPUT: &str = "edgedb-service-load-balancer-dns";
    pub const DB_INGRESS: &str = "allow-service-to-database";
    pub const PUBLIC_INGRESS: &str = "allow-any-to-service";
    pub const CNAME: &str = "nlb-custom-dns";
    pub const CREDENTIALS: &str = "server-credentials";
}

/// Environment variables passed to the provisioned container.
mod env_vars {
    pub const TLS_CERT_MODE: &str = "EDGEDB_SERVER_TLS_CERT_MODE";
    pub const PASSWORD: &str = "EDGEDB_SERVER_PASSWORD";
    pub const BACKEND_DSN: &str = "EDGEDB_SERVER_BACKEND_DSN";
    pub const TLS_KEY: &str = "EDGEDB_SERVER_TLS_KEY";
    pub const TLS_CERT: &str = "EDGEDB_SERVER_TLS_CERT";
}

const TLS_MODE_REQUIRE_FILE: &str = "require_file";
const TLS_MODE_SELF_SIGNED: &str = "generate_self_signed";

/// Composer configuration. The defaults are the deployment's fixed
/// constants; override only if you know the downstream image agrees.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub max_azs: u32,
    pub admin_username: String,
    pub database_engine: String,
    pub database_engine_version: String,
    pub database_instance_class: String,
    pub database_port: u16,
    pub database_name: String,
    /// Scheme of the backend DSN handed to the server.
    pub backend_scheme: String,
    pub server_image: String,
    /// Port the container listens on; also the load balancer listener port.
    pub server_port: u16,
    pub server_cpu_units: u32,
    pub server_memory_mib: u32,
    pub server_username: String,
    pub server_database: String,
    /// Scheme of the client-facing DSN in the credential bundle.
    pub server_scheme: String,
    pub health_check_path: String,
    pub health_check_interval_seconds: u32,
    pub health_check_threshold: u32,
    /// Kept low to minimize failover latency during rolling updates.
    pub deregistration_delay_seconds: u32,
    pub health_check_grace_seconds: u32,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    pub dns_ttl_seconds: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_azs: 2,
            admin_username: "postgres".to_string(),
            database_engine: "aurora-postgresql".to_string(),
            database_engine_version: "13.4".to_string(),
            database_instance_class: "db.t4g.medium".to_string(),
            database_port: 5432,
            database_name: "postgres".to_string(),
            backend_scheme: "postgres".to_string(),
            server_image: "edgedb/edgedb".to_string(),
            server_port: 5656,
            server_cpu_units: 1024,
            server_memory_mib: 2048,
            server_username: "edgedb".to_string(),
            server_database: "edgedb".to_string(),
            server_scheme: "edgedb".to_string(),
            health_check_path: "/server/status/ready".to_string(),
            health_check_interval_seconds: 10,
            health_check_threshold: 2,
            deregistration_delay_seconds: 10,
            health_check_grace_seconds: 120,
            min_healthy_percent: 100,
            max_healthy_percent: 200,
            dns_ttl_seconds: 60,
        }
    }
}

/// Result of advancing one step.
#[derive(Debug)]
pub enum StepResult {
    /// Keep going, call advance() again.
    Continue,
    /// Done successfully.
    Complete,
    /// Failed.
    Failed(String),
}

/// The deployment composer engine.
///
/// Parameterized by the backend — you provide the implementation.
pub struct DeploymentComposer<'a, B: CloudBackend> {
    backend: &'a B,
    config: ComposerConfig,
}

impl<'a, B: CloudBackend> DeploymentComposer<'a, B> {
    /// Create a new composer.
    pub fn new(backend: &'a B, config: ComposerConfig) -> Self {
        Self { backend, config }
    }

    /// Advance the composition by one step.
    ///
    /// Each step declares its node(s), makes at most one backend request,
    /// then transitions. Call this in a loop until you get Complete or
    /// Failed. A backend error propagates without transitioning, so no
    /// later resource is ever requested past a failure.
    pub async fn advance(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        debug!(
            session = %state.session_id,
            step = state.step.name(),
            "advancing composition"
        );

        let result = match &state.step {
            Step::Validate => self.step_validate(state),
            Step::Network => self.step_network(state).await,
            Step::AdminSecret => self.step_admin_secret(state).await,
            Step::Database => self.step_database(state).await,
            Step::BackendDsn => self.step_backend_dsn(state).await,
            Step::Certificate => self.step_certificate(state).await,
            Step::ServerSecret => self.step_server_secret(state).await,
            Step::Service => self.step_service(state).await,
            Step::Connectivity => self.step_connectivity(state),
            Step::HealthCheck => self.step_health_check(state),
            Step::DnsRecord => self.step_dns_record(state).await,
            Step::Outputs => self.step_outputs(state).await,
            Step::Complete => return Ok(StepResult::Complete),
            Step::Failed { reason, .. } => return Ok(StepResult::Failed(reason.clone())),
        };

        // Always save state after a step (even on error, state might have changed)
        self.backend.save_state(&state.session_id, state).await?;

        result
    }

    /// Run until completion or failure.
    pub async fn run_to_completion(
        &self,
        state: &mut ComposeState,
    ) -> Result<StepResult, ComposeError> {
        loop {
            match self.advance(state).await? {
                StepResult::Continue => continue,
                other => return Ok(other),
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // STEP IMPLEMENTATIONS
    // ═══════════════════════════════════════════════════════════════

    fn step_validate(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        if let Err(err) = state.request.validate() {
            // Fail fast: nothing declared, nothing provisioned.
            warn!(session = %state.session_id, error = %err, "request rejected");
            let reason = err.to_string();
            state.fail(&reason, false);
            return Ok(StepResult::Failed(reason));
        }

        state.high_availability = state.request.high_availability_enabled();
        info!(
            session = %state.session_id,
            high_availability = state.high_availability,
            custom_domain = state.request.custom_domain.is_some(),
            "request validated"
        );

        state.transition(Step::Network);
        Ok(StepResult::Continue)
    }

    async fn step_network(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        // AZ count is fixed at two; HA varies instance counts only.
        let spec = NetworkSpec {
            nat_gateways: 0,
            max_azs: self.config.max_azs,
        };
        state
            .topology
            .declare(ResourceNode::new(nodes::VPC, ResourceKind::Network(spec.clone())))?;

        let network = self
            .backend
            .provision_network(&state.session_id, &spec)
            .await?;

        info!(
            session = %state.session_id,
            network_id = %network.network_id,
            subnets = network.isolated_subnet_ids.len(),
            "declared network topology"
        );

        state.network = Some(network);
        state.transition(Step::AdminSecret);
        Ok(StepResult::Continue)
    }

    async fn step_admin_secret(
        &self,
        state: &mut ComposeState,
    ) -> Result<StepResult, ComposeError> {
        // The database provisioner's own generated password may contain
        // characters that corrupt the backend DSN, so the credentials are
        // generated here with punctuation excluded.
        let spec = SecretSpec {
            exclude_punctuation: true,
            template: Some(SecretTemplate {
                fields: BTreeMap::from([
                    ("username".to_string(), self.config.admin_username.clone()),
                    ("password".to_string(), String::new()),
                ]),
                generate_key: "password".to_string(),
            }),
        };
        state.topology.declare(ResourceNode::new(
            nodes::ADMIN_SECRET,
            ResourceKind::Secret(spec.clone()),
        ))?;

        let secret = self
            .backend
            .create_secret(&state.session_id, nodes::ADMIN_SECRET, &spec, None)
            .await?;

        info!(session = %state.session_id, secret = nodes::ADMIN_SECRET, "declared admin secret");

        state.admin_secret = Some(secret);
        state.transition(Step::Database);
        Ok(StepResult::Continue)
    }

    async fn step_database(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        let spec = DatabaseSpec {
            engine: self.config.database_engine.clone(),
            engine_version: self.config.database_engine_version.clone(),
            instance_class: self.config.database_instance_class.clone(),
            subnet_tier: SubnetTier::PrivateIsolated,
            instance_count: if state.high_availability { 2 } else { 1 },
            default_db_name: self.config.database_name.clone(),
            port: self.config.database_port,
            credentials_ref: nodes::ADMIN_SECRET.to_string(),
        };
        state.topology.declare(
            ResourceNode::new(nodes::DATABASE, ResourceKind::Database(spec.clone()))
                .with_dependency(nodes::VPC)
                .with_dependency(nodes::ADMIN_SECRET),
        )?;

        let network = state
            .network
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("network missing at Database".into()))?;
        let credentials = state
            .admin_secret
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("admin secret missing at Database".into()))?;

        let database = self
            .backend
            .provision_database(&state.session_id, &spec, network, credentials)
            .await?;

        info!(
            session = %state.session_id,
            host = %database.endpoint_hostname,
            instances = database.instance_count,
            "declared database cluster"
        );

        state.database = Some(database);
        state.transition(Step::BackendDsn);
        Ok(StepResult::Continue)
    }

    async fn step_backend_dsn(
        &self,
        state: &mut ComposeState,
    ) -> Result<StepResult, ComposeError> {
        let database = state
            .database
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("database missing at BackendDsn".into()))?;
        let admin = state
            .admin_secret
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("admin secret missing at BackendDsn".into()))?;
        let password = admin.value.field("password").ok_or_else(|| {
            ComposeError::InvalidState("admin secret has no password field".into())
        })?;

        // Recomputed only at composition time — never refreshed on rotation.
        let dsn = crate::dsn::compose(
            &self.config.backend_scheme,
            &self.config.admin_username,
            password,
            &database.endpoint_hostname,
            database.port,
            &self.config.database_name,
        );

        let spec = SecretSpec {
            exclude_punctuation: false,
            template: None,
        };
        state.topology.declare(
            ResourceNode::new(nodes::BACKEND_DSN, ResourceKind::Secret(spec.clone()))
                .with_dependency(nodes::DATABASE)
                .with_dependency(nodes::ADMIN_SECRET),
        )?;

        let secret = self
            .backend
            .create_secret(
                &state.session_id,
                nodes::BACKEND_DSN,
                &spec,
                Some(&SecretPayload::Text(dsn)),
            )
            .await?;

        info!(session = %state.session_id, secret = nodes::BACKEND_DSN, "declared backend DSN");

        state.backend_dsn = Some(secret);
        state.transition(Step::Certificate);
        Ok(StepResult::Continue)
    }

    async fn step_certificate(
        &self,
        state: &mut ComposeState,
    ) -> Result<StepResult, ComposeError> {
        if let Some(domain) = state.request.custom_domain.clone() {
            let spec = CertificateSpec {
                domain: domain.name.clone(),
                email: domain.email.clone(),
                zone_id: domain.hosted_zone_id.clone(),
            };
            state.topology.declare(ResourceNode::new(
                nodes::CERTIFICATE,
                ResourceKind::Certificate(spec.clone()),
            ))?;

            // Issuance may be slow in the external engine; the service is
            // declared strictly after this handle exists.
            let certificate = self
                .backend
                .request_certificate(&state.session_id, &spec)
                .await?;

            info!(session = %state.session_id, domain = %domain.name, "declared certificate");

            state.certificate = Some(certificate);
        } else {
            debug!(session = %state.session_id, "no custom domain, skipping certificate");
        }

        state.transition(Step::ServerSecret);
        Ok(StepResult::Continue)
    }

    async fn step_server_secret(
        &self,
        state: &mut ComposeState,
    ) -> Result<StepResult, ComposeError> {
        let spec = SecretSpec {
            exclude_punctuation: true,
            template: None,
        };
        state.topology.declare(ResourceNode::new(
            nodes::SERVER_SECRET,
            ResourceKind::Secret(spec.clone()),
        ))?;

        let secret = self
            .backend
            .create_secret(&state.session_id, nodes::SERVER_SECRET, &spec, None)
            .await?;

        info!(session = %state.session_id, secret = nodes::SERVER_SECRET, "declared server secret");

        state.server_secret = Some(secret);
        state.transition(Step::Service);
        Ok(StepResult::Continue)
    }

    async fn step_service(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        let server_secret = state
            .server_secret
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("server secret missing at Service".into()))?;
        let backend_dsn = state
            .backend_dsn
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("backend DSN missing at Service".into()))?;

        let tls_mode = if state.certificate.is_some() {
            TLS_MODE_REQUIRE_FILE
        } else {
            TLS_MODE_SELF_SIGNED
        };
        let env = BTreeMap::from([(env_vars::TLS_CERT_MODE.to_string(), tls_mode.to_string())]);

        let mut secret_env = BTreeMap::from([
            (
                env_vars::PASSWORD.to_string(),
                SecretEnvRef {
                    secret_ref: server_secret.retrieval_ref.clone(),
                    field: None,
                },
            ),
            (
                env_vars::BACKEND_DSN.to_string(),
                SecretEnvRef {
                    secret_ref: backend_dsn.retrieval_ref.clone(),
                    field: None,
                },
            ),
        ]);
        if let Some(certificate) = &state.certificate {
            secret_env.insert(
                env_vars::TLS_KEY.to_string(),
                SecretEnvRef {
                    secret_ref: certificate.secret_ref.clone(),
                    field: Some(certificate.key_field.clone()),
                },
            );
            secret_env.insert(
                env_vars::TLS_CERT.to_string(),
                SecretEnvRef {
                    secret_ref: certificate.secret_ref.clone(),
                    field: Some(certificate.cert_field.clone()),
                },
            );
        }

        let lb_spec = LoadBalancerSpec {
            listener_port: self.config.server_port,
            internet_facing: true,
        };
        let service_spec = ServiceSpec {
            image: self.config.server_image.clone(),
            cpu_units: self.config.server_cpu_units,
            memory_mib: self.config.server_memory_mib,
            container_port: self.config.server_port,
            desired_count: if state.high_availability { 2 } else { 1 },
            assign_public_ip: true,
            health_check_grace_seconds: self.config.health_check_grace_seconds,
            min_healthy_percent: self.config.min_healthy_percent,
            max_healthy_percent: self.config.max_healthy_percent,
            env,
            secret_env,
        };

        state.topology.declare(
            ResourceNode::new(
                nodes::LOAD_BALANCER,
                ResourceKind::LoadBalancer(lb_spec.clone()),
            )
            .with_dependency(nodes::VPC),
        )?;
        state.topology.declare(
            ResourceNode::new(
                nodes::TARGET_GROUP,
                ResourceKind::TargetGroup(TargetGroupSpec {
                    port: self.config.server_port,
                    health_check: None,
                    deregistration_delay_seconds: None,
                }),
            )
            .with_dependency(nodes::LOAD_BALANCER),
        )?;

        let mut service_node = ResourceNode::new(
            nodes::SERVICE,
            ResourceKind::Service(service_spec.clone()),
        )
        .with_dependency(nodes::VPC)
        .with_dependency(nodes::TARGET_GROUP)
        .with_dependency(nodes::BACKEND_DSN)
        .with_dependency(nodes::SERVER_SECRET);
        if state.certificate.is_some() {
            service_node = service_node.with_dependency(nodes::CERTIFICATE);
        }
        state.topology.declare(service_node)?;

        // The service composite auto-creates an informational output for
        // the load balancer DNS name.
        state.topology.declare(
            ResourceNode::new(
                nodes::LB_DNS_OUTPUT,
                ResourceKind::Output(OutputSpec {
                    description: "load balancer DNS name".to_string(),
                    value_ref: nodes::LOAD_BALANCER.to_string(),
                }),
            )
            .with_dependency(nodes::LOAD_BALANCER),
        )?;

        let network = state
            .network
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("network missing at Service".into()))?;

        let service = self
            .backend
            .provision_service(&state.session_id, &service_spec, &lb_spec, network)
            .await?;

        info!(
            session = %state.session_id,
            lb_dns = %service.lb_dns_name,
            desired_count = service.desired_count,
            tls_mode,
            "declared container service"
        );

        state.service = Some(service);
        state.transition(Step::Connectivity);
        Ok(StepResult::Continue)
    }

    fn step_connectivity(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        // Access control is the network boundary's job, not the
        // application's: the service reaches the cluster port, and anyone
        // reaches the listener.
        state.topology.declare(
            ResourceNode::new(
                nodes::DB_INGRESS,
                ResourceKind::Ingress(IngressSpec {
                    source: IngressSource::Node(nodes::SERVICE.to_string()),
                    target: nodes::DATABASE.to_string(),
                    port: self.config.database_port,
                }),
            )
            .with_dependency(nodes::SERVICE)
            .with_dependency(nodes::DATABASE),
        )?;
        state.topology.declare(
            ResourceNode::new(
                nodes::PUBLIC_INGRESS,
                ResourceKind::Ingress(IngressSpec {
                    source: IngressSource::AnyIpv4,
                    target: nodes::SERVICE.to_string(),
                    port: self.config.server_port,
                }),
            )
            .with_dependency(nodes::SERVICE),
        )?;

        info!(session = %state.session_id, "declared network access rules");

        state.transition(Step::HealthCheck);
        Ok(StepResult::Continue)
    }

    fn step_health_check(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        state.topology.configure_health_check(
            nodes::TARGET_GROUP,
            HealthCheckSpec {
                path: self.config.health_check_path.clone(),
                interval_seconds: self.config.health_check_interval_seconds,
                healthy_threshold: self.config.health_check_threshold,
                unhealthy_threshold: self.config.health_check_threshold,
                protocol: ProbeProtocol::Https,
            },
        )?;
        state.topology.set_deregistration_delay(
            nodes::TARGET_GROUP,
            self.config.deregistration_delay_seconds,
        )?;

        info!(session = %state.session_id, "configured target group health check");

        state.transition(Step::DnsRecord);
        Ok(StepResult::Continue)
    }

    async fn step_dns_record(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        if let Some(domain) = state.request.custom_domain.clone() {
            let service = state
                .service
                .as_ref()
                .ok_or_else(|| ComposeError::InvalidState("service missing at DnsRecord".into()))?;

            let spec = DnsRecordSpec {
                record_type: "CNAME".to_string(),
                record_name: domain.name.clone(),
                domain_name: service.lb_dns_name.clone(),
                zone_id: domain.hosted_zone_id.clone(),
                zone_name: domain.zone_name.clone(),
                ttl_seconds: self.config.dns_ttl_seconds,
            };
            state.topology.declare(
                ResourceNode::new(nodes::CNAME, ResourceKind::DnsRecord(spec.clone()))
                    .with_dependency(nodes::LOAD_BALANCER),
            )?;

            self.backend
                .create_dns_record(&state.session_id, &spec)
                .await?;

            info!(
                session = %state.session_id,
                record = %domain.name,
                target = %spec.domain_name,
                "declared CNAME record"
            );
        } else {
            debug!(session = %state.session_id, "no custom domain, skipping DNS record");
        }

        state.transition(Step::Outputs);
        Ok(StepResult::Continue)
    }

    async fn step_outputs(&self, state: &mut ComposeState) -> Result<StepResult, ComposeError> {
        // The auto-created informational output duplicates the endpoint we
        // are about to emit.
        state.topology.remove(nodes::LB_DNS_OUTPUT);

        let service = state
            .service
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("service missing at Outputs".into()))?;
        let server_secret = state
            .server_secret
            .as_ref()
            .ok_or_else(|| ComposeError::InvalidState("server secret missing at Outputs".into()))?;
        let password = server_secret.value.as_text().ok_or_else(|| {
            ComposeError::InvalidState("server secret is not a text payload".into())
        })?;

        let endpoint = match &state.request.custom_domain {
            Some(domain) => domain.name.clone(),
            None => service.lb_dns_name.clone(),
        };

        let bundle = CredentialBundle::new(
            &self.config.server_scheme,
            endpoint.clone(),
            self.config.server_port,
            self.config.server_username.clone(),
            password,
            self.config.server_database.clone(),
        );
        let payload = SecretPayload::Json(
            serde_json::to_value(&bundle)
                .map_err(|e| ComposeError::Secret(format!("bundle serialization: {}", e)))?,
        );

        let spec = SecretSpec {
            exclude_punctuation: false,
            template: None,
        };
        state.topology.declare(
            ResourceNode::new(nodes::CREDENTIALS, ResourceKind::Secret(spec.clone()))
                .with_dependency(nodes::SERVER_SECRET)
                .with_dependency(nodes::SERVICE),
        )?;

        let secret = self
            .backend
            .create_secret(&state.session_id, nodes::CREDENTIALS, &spec, Some(&payload))
            .await?;

        info!(session = %state.session_id, endpoint = %endpoint, "composition complete");

        let outputs = DeploymentOutputs {
            endpoint,
            credential_secret: CredentialSecret {
                retrieval_ref: secret.retrieval_ref.clone(),
                bundle,
            },
        };

        state.credential_secret = Some(secret);
        state.outputs = Some(outputs);
        state.transition(Step::Complete);
        Ok(StepResult::Complete)
    }
}
