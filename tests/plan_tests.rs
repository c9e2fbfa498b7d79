//! Plan rendering and synthesizer determinism.

#![cfg(feature = "plan-backend")]

use edgedb_compose_rs::composer::nodes;
use edgedb_compose_rs::{
    ComposeState, ComposerConfig, CustomDomainSpec, DeploymentComposer, DeploymentRequest,
    PlanBackend, StepResult,
};

async fn compose_with_scope(scope: &str, request: DeploymentRequest) -> ComposeState {
    let backend = PlanBackend::new(scope);
    let composer = DeploymentComposer::new(&backend, ComposerConfig::default());
    let mut state = ComposeState::new("session-1", request);

    match composer.run_to_completion(&mut state).await.unwrap() {
        StepResult::Complete => state,
        other => panic!("composition did not complete: {:?}", other),
    }
}

fn full_request() -> DeploymentRequest {
    DeploymentRequest {
        high_availability: Some(true),
        custom_domain: Some(CustomDomainSpec {
            hosted_zone_id: "Z1".to_string(),
            zone_name: "example.com".to_string(),
            name: "db.example.com".to_string(),
            email: "a@example.com".to_string(),
        }),
    }
}

#[tokio::test]
async fn render_is_byte_stable_across_runs() {
    let first = compose_with_scope("prod", full_request()).await;
    let second = compose_with_scope("prod", full_request()).await;

    // Secret values differ between runs, but the plan carries none of
    // them: renders are identical.
    let render_a = first.topology.render_canonical().unwrap();
    let render_b = second.topology.render_canonical().unwrap();
    assert_eq!(render_a, render_b);
}

#[tokio::test]
async fn render_differs_across_scopes() {
    let prod = compose_with_scope("prod", full_request()).await;
    let staging = compose_with_scope("staging", full_request()).await;

    // The CNAME target embeds the synthesized LB DNS name, which is
    // scope-derived.
    assert_ne!(
        prod.topology.render_canonical().unwrap(),
        staging.topology.render_canonical().unwrap()
    );
    assert_ne!(
        prod.service.as_ref().unwrap().lb_dns_name,
        staging.service.as_ref().unwrap().lb_dns_name
    );
}

#[tokio::test]
async fn synthesized_names_are_deterministic() {
    let a = compose_with_scope("prod", DeploymentRequest::default()).await;
    let b = compose_with_scope("prod", DeploymentRequest::default()).await;

    assert_eq!(
        a.service.as_ref().unwrap().lb_dns_name,
        b.service.as_ref().unwrap().lb_dns_name
    );
    assert_eq!(
        a.database.as_ref().unwrap().endpoint_hostname,
        b.database.as_ref().unwrap().endpoint_hostname
    );
    assert_eq!(
        a.network.as_ref().unwrap().network_id,
        b.network.as_ref().unwrap().network_id
    );
}

#[tokio::test]
async fn render_contains_no_secret_material() {
    let state = compose_with_scope("prod", full_request()).await;
    let render = state.topology.render_canonical().unwrap();

    let admin_password = state
        .admin_secret
        .as_ref()
        .unwrap()
        .value
        .field("password")
        .unwrap();
    let server_password = state
        .server_secret
        .as_ref()
        .unwrap()
        .value
        .as_text()
        .unwrap();

    assert!(!render.contains(admin_password), "admin password in plan");
    assert!(!render.contains(server_password), "server password in plan");
    assert!(!render.contains("postgres://"), "backend DSN in plan");
}

#[tokio::test]
async fn render_preserves_declaration_order() {
    let state = compose_with_scope("prod", full_request()).await;
    let render = state.topology.render_canonical().unwrap();

    // Declaration order is dependency order; spot-check the spine.
    let spine = [
        nodes::VPC,
        nodes::ADMIN_SECRET,
        nodes::DATABASE,
        nodes::BACKEND_DSN,
        nodes::CERTIFICATE,
        nodes::SERVER_SECRET,
        nodes::LOAD_BALANCER,
        nodes::TARGET_GROUP,
        nodes::SERVICE,
        nodes::CNAME,
        nodes::CREDENTIALS,
    ];
    let positions: Vec<usize> = spine
        .iter()
        .map(|id| {
            render
                .find(&format!("\"id\":\"{}\"", id))
                .unwrap_or_else(|| panic!("node {} missing from render", id))
        })
        .collect();

    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "nodes rendered out of declaration order");
}

#[tokio::test]
async fn render_parses_back_as_json() {
    let state = compose_with_scope("prod", DeploymentRequest::default()).await;
    let render = state.topology.render_canonical().unwrap();

    let value: serde_json::Value = serde_json::from_str(&render).unwrap();
    let node_count = value["nodes"].as_array().unwrap().len();
    assert_eq!(node_count, state.topology.len());
}
