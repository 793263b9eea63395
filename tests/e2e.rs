//! End-to-end tests against a live LLM provider.
//!
//! These tests make real API calls and are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//! The provider is auto-detected the same way the binary does it
//! (`OPENAI_API_KEY`, `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, …).
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! PDF tests additionally need a text-based learning plan at
//! `test_cases/laeringsplan.pdf`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use plancoach::{
    generate, generate_from_pdf, router, AppState, CoachConfig, LabelSet, PlanCoachError,
    ServerConfig, SuggestionSet,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use tower::ServiceExt;

const PLAN: &str = "Læringsplan for Maria, nyudnævnt teamleder i kundeservice.\n\
    Mål: Blive tryg ved at lede teammøder og give konstruktiv feedback.\n\
    Nuværende niveau: Har ingen ledelseserfaring, men kender fagområdet godt.\n\
    Aktiviteter: Deltage i et todages kursus i ledelse, læse 'Feedback i praksis', \
    have månedlige samtaler med egen leder.\n\
    Tidsramme: Seks måneder.";

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Route library logs to the test output; `RUST_LOG` overrides the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("plancoach=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Skip this test if E2E_ENABLED is not set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
    }};
}

/// Assert the normalised set respects every bound a live model could break.
fn assert_suggestions_bounded(set: &SuggestionSet, config: &CoachConfig, context: &str) {
    let limits = config.limits;
    assert!(!set.is_empty(), "[{context}] Model returned no actions");
    assert!(
        set.len() <= limits.max_actions,
        "[{context}] {} actions, limit {}",
        set.len(),
        limits.max_actions
    );

    for action in &set.actions {
        assert!(!action.title.trim().is_empty(), "[{context}] Empty title");
        assert!(action.title.chars().count() <= limits.max_title_chars);
        assert!(action.description.chars().count() <= limits.max_description_chars);
        assert!(action.steps.len() <= limits.max_steps);
        for step in &action.steps {
            assert!(step.chars().count() <= limits.max_step_chars);
        }
    }

    println!("[{context}] ✓  {} action(s), bounds hold", set.len());
}

// ── Library entry points ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_generate_typed_plan() {
    e2e_skip_unless_enabled!();

    let config = CoachConfig::default();
    let output = generate(PLAN, &config)
        .await
        .expect("generation should succeed");

    assert_suggestions_bounded(&output.suggestions, &config, "typed");
    assert!(output.stats.input_tokens > 0, "Token usage should be reported");
    println!(
        "{}",
        serde_json::to_string_pretty(&output.suggestions.to_json(config.labels)).unwrap()
    );
}

#[tokio::test]
async fn test_generate_with_danish_labels() {
    e2e_skip_unless_enabled!();

    let config = CoachConfig::builder()
        .labels(LabelSet::DanishMedium)
        .build()
        .expect("valid config");
    let output = generate(PLAN, &config)
        .await
        .expect("generation should succeed");

    assert_suggestions_bounded(&output.suggestions, &config, "danish");
    let rendered = output.suggestions.to_json(config.labels);
    for action in rendered["actions"].as_array().unwrap() {
        for key in ["impact", "effort"] {
            let label = action[key].as_str().unwrap();
            assert!(
                ["Lav", "Medium", "Høj"].contains(&label),
                "Unexpected {key} label {label:?}"
            );
        }
    }
}

#[tokio::test]
async fn test_generate_from_pdf() {
    e2e_skip_unless_enabled!();
    let path = test_cases_dir().join("laeringsplan.pdf");
    if !path.exists() {
        println!("SKIP — test file not found: {}", path.display());
        return;
    }

    let pdf = std::fs::read(&path).expect("readable test PDF");
    let config = CoachConfig::default();
    let output = generate_from_pdf(&pdf, Some("application/pdf"), &config)
        .await
        .expect("generation from PDF should succeed");

    assert_suggestions_bounded(&output.suggestions, &config, "pdf");
    assert!(output.stats.plan_chars >= config.min_plan_chars);
}

#[tokio::test]
async fn test_unknown_provider_is_not_configured() {
    e2e_skip_unless_enabled!();

    let config = CoachConfig::builder()
        .provider_name("no-such-provider")
        .build()
        .expect("valid config");
    let err = generate(PLAN, &config).await.unwrap_err();
    assert!(
        matches!(err, PlanCoachError::ProviderNotConfigured { .. }),
        "got: {err:?}"
    );
}

// ── HTTP surface ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_http_generate_round_trip() {
    e2e_skip_unless_enabled!();

    let mut config = CoachConfig::default();
    config.provider =
        Some(plancoach::generate::resolve_provider(&config).expect("provider from env"));
    let server = ServerConfig {
        static_dir: None,
        ..ServerConfig::default()
    };
    let app = router(AppState::new(config, &server), &server);

    let request = Request::post("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "planText": PLAN }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    let actions = body["actions"].as_array().expect("actions array");
    assert!(!actions.is_empty() && actions.len() <= 3);
    for action in actions {
        for key in ["title", "description", "impact", "effort", "steps"] {
            assert!(action.get(key).is_some(), "Missing {key} in {action}");
        }
    }
}
