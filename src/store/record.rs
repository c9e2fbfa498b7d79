//! [`PlanRecord`] — on-disk representation of a composition.
//!
//! Mirrors [`ComposeState`] but with every secret payload stripped out of
//! the handles and sealed into a single ChaCha20-Poly1305 blob. A
//! serialized record never contains plaintext secret material.

use crate::error::ComposeError;
use crate::request::DeploymentRequest;
use crate::secret::{decrypt_payload, encrypt_payload};
use crate::state::{ComposeState, Step};
use crate::topology::Topology;
use crate::types::{
    CertificateHandle, CredentialBundle, CredentialSecret, DatabaseHandle, DeploymentOutputs,
    NetworkHandle, SecretHandle, SecretPayload, ServiceHandle,
};
use serde::{Deserialize, Serialize};

/// A secret handle with its value removed for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedSecret {
    pub logical_id: String,
    pub retrieval_ref: String,
}

impl From<&SecretHandle> for RedactedSecret {
    fn from(handle: &SecretHandle) -> Self {
        Self {
            logical_id: handle.logical_id.clone(),
            retrieval_ref: handle.retrieval_ref.clone(),
        }
    }
}

/// Everything stripped from the handles, sealed as one encrypted blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SecretMaterial {
    admin: Option<SecretPayload>,
    backend_dsn: Option<SecretPayload>,
    server: Option<SecretPayload>,
    credentials: Option<SecretPayload>,
    bundle: Option<CredentialBundle>,
}

impl SecretMaterial {
    fn is_empty(&self) -> bool {
        self.admin.is_none()
            && self.backend_dsn.is_none()
            && self.server.is_none()
            && self.credentials.is_none()
            && self.bundle.is_none()
    }
}

/// On-disk representation of a composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    pub session_id: String,
    pub step: Step,
    pub request: DeploymentRequest,
    pub high_availability: bool,
    pub topology: Topology,

    pub network: Option<NetworkHandle>,
    pub admin_secret: Option<RedactedSecret>,
    pub database: Option<DatabaseHandle>,
    pub backend_dsn: Option<RedactedSecret>,
    pub certificate: Option<CertificateHandle>,
    pub server_secret: Option<RedactedSecret>,
    pub service: Option<ServiceHandle>,
    pub credential_secret: Option<RedactedSecret>,

    /// Endpoint of a completed composition; the credential bundle lives in
    /// the encrypted blob.
    pub endpoint: Option<String>,

    /// Secret payloads encrypted with ChaCha20-Poly1305 (Argon2id-derived
    /// key), base64 on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub encrypted_secrets: Option<Vec<u8>>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl PlanRecord {
    /// Create a record from a [`ComposeState`], sealing all secret material.
    ///
    /// The `password` is used to derive an encryption key via Argon2id.
    pub fn from_state(state: &ComposeState, password: &str) -> Result<Self, ComposeError> {
        let material = SecretMaterial {
            admin: state.admin_secret.as_ref().map(|s| s.value.clone()),
            backend_dsn: state.backend_dsn.as_ref().map(|s| s.value.clone()),
            server: state.server_secret.as_ref().map(|s| s.value.clone()),
            credentials: state.credential_secret.as_ref().map(|s| s.value.clone()),
            bundle: state
                .outputs
                .as_ref()
                .map(|o| o.credential_secret.bundle.clone()),
        };

        let encrypted_secrets = if material.is_empty() {
            None
        } else {
            let plaintext = serde_json::to_vec(&material)
                .map_err(|e| ComposeError::Storage(format!("failed to serialize secrets: {}", e)))?;
            Some(encrypt_payload(&plaintext, password)?)
        };

        Ok(Self {
            session_id: state.session_id.clone(),
            step: state.step.clone(),
            request: state.request.clone(),
            high_availability: state.high_availability,
            topology: state.topology.clone(),
            network: state.network.clone(),
            admin_secret: state.admin_secret.as_ref().map(RedactedSecret::from),
            database: state.database.clone(),
            backend_dsn: state.backend_dsn.as_ref().map(RedactedSecret::from),
            certificate: state.certificate.clone(),
            server_secret: state.server_secret.as_ref().map(RedactedSecret::from),
            service: state.service.clone(),
            credential_secret: state.credential_secret.as_ref().map(RedactedSecret::from),
            endpoint: state.outputs.as_ref().map(|o| o.endpoint.clone()),
            encrypted_secrets,
            created_at: state.created_at,
            updated_at: state.updated_at,
        })
    }

    /// Convert this record back into a [`ComposeState`], unsealing the
    /// secret material with the `password` used during encryption.
    pub fn to_state(self, password: &str) -> Result<ComposeState, ComposeError> {
        let material = match &self.encrypted_secrets {
            Some(encrypted) => {
                let plaintext = decrypt_payload(encrypted, password)?;
                serde_json::from_slice(&plaintext)
                    .map_err(|e| ComposeError::Storage(format!("failed to parse secrets: {}", e)))?
            }
            None => SecretMaterial::default(),
        };

        let restore = |redacted: Option<RedactedSecret>,
                       value: Option<SecretPayload>,
                       what: &str|
         -> Result<Option<SecretHandle>, ComposeError> {
            match (redacted, value) {
                (Some(redacted), Some(value)) => Ok(Some(SecretHandle {
                    logical_id: redacted.logical_id,
                    retrieval_ref: redacted.retrieval_ref,
                    value,
                })),
                (None, _) => Ok(None),
                (Some(_), None) => Err(ComposeError::InvalidState(format!(
                    "record has {} reference but no sealed material",
                    what
                ))),
            }
        };

        let credential_secret =
            restore(self.credential_secret, material.credentials, "credential secret")?;

        let outputs = match (self.endpoint, material.bundle) {
            (Some(endpoint), Some(bundle)) => {
                let retrieval_ref = credential_secret
                    .as_ref()
                    .map(|s| s.retrieval_ref.clone())
                    .ok_or_else(|| {
                        ComposeError::InvalidState(
                            "record has outputs but no credential secret".into(),
                        )
                    })?;
                Some(DeploymentOutputs {
                    endpoint,
                    credential_secret: CredentialSecret {
                        retrieval_ref,
                        bundle,
                    },
                })
            }
            (None, _) => None,
            (Some(_), None) => {
                return Err(ComposeError::InvalidState(
                    "record has endpoint but no sealed bundle".into(),
                ))
            }
        };

        Ok(ComposeState {
            session_id: self.session_id,
            step: self.step,
            request: self.request,
            high_availability: self.high_availability,
            topology: self.topology,
            network: self.network,
            admin_secret: restore(self.admin_secret, material.admin, "admin secret")?,
            database: self.database,
            backend_dsn: restore(self.backend_dsn, material.backend_dsn, "backend DSN")?,
            certificate: self.certificate,
            server_secret: restore(self.server_secret, material.server, "server secret")?,
            service: self.service,
            credential_secret,
            outputs,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Base64 (de)serialization for the encrypted blob, so record JSON stays
/// readable instead of carrying a byte array.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => STANDARD
                .decode(encoded)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
