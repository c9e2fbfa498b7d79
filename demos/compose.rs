//! Compose a deployment plan locally and print it.
//!
//! Run with: `cargo run --example compose`

use edgedb_compose_rs::{
    ComposeState, ComposerConfig, DeploymentComposer, DeploymentRequest, PlanBackend, StepResult,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let request = DeploymentRequest::from_yaml(
        "\
highAvailability: false
customDomain:
  hostedZoneId: Z1234567890
  zoneName: example.com
  name: db.example.com
  email: ops@example.com
",
    )?;

    let backend = PlanBackend::new("demo");
    let composer = DeploymentComposer::new(&backend, ComposerConfig::default());
    let mut state = ComposeState::new("demo-session", request);

    match composer.run_to_completion(&mut state).await? {
        StepResult::Complete => {
            let outputs = state.outputs.as_ref().expect("complete run has outputs");
            println!();
            println!("endpoint:  {}", outputs.endpoint);
            println!("secret at: {}", outputs.credential_secret.retrieval_ref);
            println!("dsn:       {}", outputs.credential_secret.bundle.dsn);
            println!();
            println!("plan: {}", state.topology.render_canonical()?);
        }
        StepResult::Failed(reason) => eprintln!("composition failed: {}", reason),
        StepResult::Continue => unreachable!("run_to_completion never returns Continue"),
    }

    Ok(())
}
