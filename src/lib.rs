//! EdgeDB Compose Library
//!
//! Standalone, trait-based deployment composer for EdgeDB on managed
//! cloud services.
//!
//! # Design
//!
//! This library turns a small [`DeploymentRequest`] into a
//! dependency-ordered resource topology — network, secrets, database
//! cluster, container service behind a network load balancer, optional
//! TLS certificate and DNS record — and the final [`DeploymentOutputs`].
//! It never provisions anything itself: you implement the
//! [`CloudBackend`] trait with your infrastructure, and the composer
//! handles the state machine. Convergence, retries, and rollback belong
//! to the external provisioning engine behind your backend.
//!
//! # Usage
//!
//! ```ignore
//! use edgedb_compose_rs::{
//!     ComposeState, ComposerConfig, DeploymentComposer, DeploymentRequest, PlanBackend,
//!     StepResult,
//! };
//!
//! // The bundled PlanBackend synthesizes a plan locally
//! let backend = PlanBackend::new("prod");
//! let composer = DeploymentComposer::new(&backend, ComposerConfig::default());
//!
//! let request = DeploymentRequest::from_yaml("highAvailability: false")?;
//! let mut state = ComposeState::new("session-1", request);
//!
//! match composer.run_to_completion(&mut state).await? {
//!     StepResult::Complete => {
//!         let outputs = state.outputs.as_ref().unwrap();
//!         println!("endpoint: {}", outputs.endpoint);
//!         println!("plan: {}", state.topology.render_canonical()?);
//!     }
//!     StepResult::Failed(reason) => println!("failed: {}", reason),
//!     _ => {}
//! }
//! ```

pub mod backend;
pub mod composer;
pub mod dsn;
pub mod error;
pub mod request;
pub mod secret;
pub mod state;
pub mod store;
pub mod topology;
pub mod types;

#[cfg(feature = "plan-backend")]
pub mod plan;

// Re-export the main types at crate root for convenience
pub use backend::CloudBackend;
pub use composer::{ComposerConfig, DeploymentComposer, StepResult};
pub use error::ComposeError;
pub use request::{CustomDomainSpec, DeploymentRequest};
pub use state::{ComposeState, Step};
#[cfg(feature = "file-storage")]
pub use store::FilePlanStore;
pub use store::{PlanRecord, PlanStore, StdoutStore};
pub use topology::{to_canonical_json, ResourceKind, ResourceNode, Topology};
pub use types::*;

#[cfg(feature = "plan-backend")]
pub use plan::PlanBackend;
