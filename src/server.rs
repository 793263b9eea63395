//! HTTP service: the browser-facing JSON API plus static files.
//!
//! ## Routes
//!
//! | Method | Path                     | Body                  | Success                                   |
//! |--------|--------------------------|-----------------------|-------------------------------------------|
//! | GET    | `/api/health`            | –                     | `{ "ok": true }`                          |
//! | POST   | `/api/generate`          | `{ "planText": … }`   | `{ "actions": [...] }`                    |
//! | POST   | `/api/generate-from-pdf` | multipart, `pdf` file | `{ "actions": [...] }`                    |
//! | POST   | `/api/extract-pdf`       | multipart, `pdf` file | `{ "planText", "characters", "truncated" }` |
//!
//! Anything else falls through to the static directory (`public/` by
//! default). Every failure is answered as `{ "error": "<Danish message>" }`
//! with the status from [`PlanCoachError::status_code`]; the full error only
//! goes to the log.
//!
//! The three POST routes share a per-IP [`governor`] quota and a semaphore
//! that caps how many provider calls run at once.

use crate::config::{CoachConfig, ServerConfig};
use crate::error::{NormalizeError, PlanCoachError};
use crate::generate::{extract_plan_from_pdf, generate, generate_from_pdf, resolve_provider};
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Multipart, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Multipart form field carrying the uploaded PDF.
pub const PDF_FIELD: &str = "pdf";

/// Body cap for `/api/generate`. A maximal plan of 20 000 characters is at
/// most 80 KB of UTF-8, plus JSON escaping.
const JSON_BODY_LIMIT: usize = 256 * 1024;

/// Slack on top of the file cap for multipart boundaries and part headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// How often idle rate-limiter entries are dropped.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// ── Error mapping ────────────────────────────────────────────────────────

impl PlanCoachError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlanCoachError::InputTooShort { .. }
            | PlanCoachError::MissingPlanText { .. }
            | PlanCoachError::MissingUpload { .. }
            | PlanCoachError::InvalidUpload { .. }
            | PlanCoachError::UnsupportedFileType { .. }
            | PlanCoachError::CorruptPdf { .. }
            | PlanCoachError::NoExtractableText
            | PlanCoachError::FileNotFound { .. }
            | PlanCoachError::PermissionDenied { .. }
            | PlanCoachError::DownloadFailed { .. }
            | PlanCoachError::DownloadTimeout { .. } => StatusCode::BAD_REQUEST,
            PlanCoachError::FileTooLarge { .. } | PlanCoachError::BodyTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            PlanCoachError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PlanCoachError::ProviderUnavailable { .. }
            | PlanCoachError::ApiTimeout { .. }
            | PlanCoachError::Normalize(_) => StatusCode::BAD_GATEWAY,
            PlanCoachError::ProviderNotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PlanCoachError::InvalidConfig(_) | PlanCoachError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short Danish message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            PlanCoachError::InputTooShort { min, .. } => {
                format!("Læringsplan skal være mindst {min} tegn lang")
            }
            PlanCoachError::MissingPlanText { .. } => "Læringsplan mangler".into(),
            PlanCoachError::MissingUpload { .. } => "Ingen PDF-fil modtaget".into(),
            PlanCoachError::InvalidUpload { .. } => "Uploaden kunne ikke læses".into(),
            PlanCoachError::UnsupportedFileType { .. } => "Kun PDF-filer er tilladt".into(),
            PlanCoachError::FileTooLarge { limit } => {
                format!("Filen er for stor (maks {})", display_size(*limit))
            }
            PlanCoachError::BodyTooLarge { limit } => {
                format!("Læringsplanen er for lang (maks {})", display_size(*limit))
            }
            PlanCoachError::CorruptPdf { .. } => "PDF-filen kunne ikke læses".into(),
            PlanCoachError::NoExtractableText => {
                "PDF-filen indeholder ingen tekst der kan læses".into()
            }
            PlanCoachError::FileNotFound { .. }
            | PlanCoachError::PermissionDenied { .. }
            | PlanCoachError::DownloadFailed { .. }
            | PlanCoachError::DownloadTimeout { .. } => "Filen kunne ikke hentes".into(),
            PlanCoachError::ProviderNotConfigured { .. } => {
                "AI-tjenesten er ikke konfigureret".into()
            }
            PlanCoachError::ProviderUnavailable { .. } | PlanCoachError::ApiTimeout { .. } => {
                "Fejl ved generering af forslag".into()
            }
            PlanCoachError::Normalize(NormalizeError::EmptyResponse) => {
                "AI-tjenesten returnerede et tomt svar. Prøv igen.".into()
            }
            PlanCoachError::Normalize(_) => "AI-svaret kunne ikke forstås. Prøv igen.".into(),
            PlanCoachError::RateLimited { .. } => {
                "For mange forespørgsler. Prøv igen om lidt.".into()
            }
            PlanCoachError::InvalidConfig(_) | PlanCoachError::Internal(_) => {
                "Der opstod en intern fejl".into()
            }
        }
    }
}

/// Byte cap as shown to users: whole MB from 1 MiB up, KB below that.
fn display_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB {
        format!("{} MB", bytes.div_ceil(MIB))
    } else {
        format!("{} KB", bytes.div_ceil(KIB).max(1))
    }
}

impl IntoResponse for PlanCoachError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{} → {}", status, self);
        } else {
            warn!("{} → {}", status, self);
        }
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

// ── State ────────────────────────────────────────────────────────────────

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<CoachConfig>,
    permits: Arc<Semaphore>,
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
}

impl AppState {
    pub fn new(config: CoachConfig, server: &ServerConfig) -> Self {
        let per_minute = NonZeroU32::new(server.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(server.rate_limit_burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self {
            config: Arc::new(config),
            permits: Arc::new(Semaphore::new(server.max_concurrent_requests.max(1))),
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }
}

// ── Router ───────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let api = Router::new()
        .route(
            "/api/generate",
            post(generate_text).layer(DefaultBodyLimit::max(JSON_BODY_LIMIT)),
        )
        .route(
            "/api/generate-from-pdf",
            post(generate_pdf).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/extract-pdf",
            post(extract_pdf).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    let mut app = Router::new()
        .route("/api/health", get(health))
        .merge(api);

    if let Some(ref dir) = server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `server.addr` and serve until Ctrl-C.
///
/// The provider is resolved once up front and shared by all requests. If
/// none can be resolved the service still starts: health and static files
/// work and generation answers 503.
pub async fn serve(mut config: CoachConfig, server: ServerConfig) -> Result<(), PlanCoachError> {
    if config.provider.is_none() {
        match resolve_provider(&config) {
            Ok(provider) => config.provider = Some(provider),
            Err(e) => warn!("Starting without an LLM provider: {}", e),
        }
    }

    let state = AppState::new(config, &server);
    let limiter = Arc::clone(&state.limiter);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            limiter.retain_recent();
        }
    });

    let app = router(state, &server);
    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|e| PlanCoachError::Internal(format!("Cannot bind {}: {}", server.addr, e)))?;

    info!("Server kører på http://{}", server.addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| PlanCoachError::Internal(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Middleware ───────────────────────────────────────────────────────────

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let client = client_ip(&request);
    if state.limiter.check_key(&client).is_err() {
        return PlanCoachError::RateLimited {
            client: client.to_string(),
        }
        .into_response();
    }
    next.run(request).await
}

/// Peer address from the connection, or `0.0.0.0` when the router runs
/// without connect info (tests, some proxies).
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

// ── Handlers ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(rename = "planText")]
    plan_text: Option<String>,
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn generate_text(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Value>, PlanCoachError> {
    let Json(request) = body.map_err(json_error)?;
    let plan_text = request
        .plan_text
        .ok_or_else(|| PlanCoachError::MissingPlanText {
            detail: "field absent or null".into(),
        })?;

    let _permit = acquire(&state).await?;
    let output = generate(&plan_text, &state.config).await?;
    Ok(Json(output.suggestions.to_json(state.config.labels)))
}

async fn generate_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, PlanCoachError> {
    let (content_type, pdf) = read_pdf_field(multipart, state.config.max_upload_bytes).await?;

    let _permit = acquire(&state).await?;
    let output = generate_from_pdf(&pdf, content_type.as_deref(), &state.config).await?;
    Ok(Json(output.suggestions.to_json(state.config.labels)))
}

async fn extract_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, PlanCoachError> {
    let (content_type, pdf) = read_pdf_field(multipart, state.config.max_upload_bytes).await?;

    let plan = extract_plan_from_pdf(&pdf, content_type.as_deref(), &state.config).await?;
    Ok(Json(json!({
        "planText": plan.as_str(),
        "characters": plan.chars(),
        "truncated": plan.was_truncated(),
    })))
}

fn json_error(rejection: JsonRejection) -> PlanCoachError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlanCoachError::BodyTooLarge {
            limit: JSON_BODY_LIMIT,
        }
    } else {
        PlanCoachError::MissingPlanText {
            detail: rejection.body_text(),
        }
    }
}

async fn acquire(state: &AppState) -> Result<tokio::sync::SemaphorePermit<'_>, PlanCoachError> {
    state
        .permits
        .acquire()
        .await
        .map_err(|e| PlanCoachError::Internal(format!("Request semaphore closed: {}", e)))
}

/// Pull the `pdf` part out of a multipart body, ignoring any other fields.
async fn read_pdf_field(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(Option<String>, Vec<u8>), PlanCoachError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, max_bytes))?
    {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| upload_error(e, max_bytes))?;
        return Ok((content_type, bytes.to_vec()));
    }

    Err(PlanCoachError::MissingUpload {
        field: PDF_FIELD.to_string(),
    })
}

fn upload_error(e: MultipartError, max_bytes: usize) -> PlanCoachError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PlanCoachError::FileTooLarge { limit: max_bytes }
    } else {
        PlanCoachError::InvalidUpload {
            detail: e.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            PlanCoachError::InputTooShort { chars: 3, min: 50 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PlanCoachError::FileTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            PlanCoachError::Normalize(NormalizeError::EmptyResponse).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PlanCoachError::ProviderNotConfigured {
                provider: "auto".into(),
                hint: String::new(),
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PlanCoachError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn user_messages_hide_details() {
        let e = PlanCoachError::ProviderUnavailable {
            attempts: 3,
            detail: "sk-secret rejected".into(),
        };
        assert_eq!(e.user_message(), "Fejl ved generering af forslag");

        let e = PlanCoachError::InputTooShort { chars: 3, min: 50 };
        assert_eq!(e.user_message(), "Læringsplan skal være mindst 50 tegn lang");
    }

    #[test]
    fn size_limits_render_in_matching_unit() {
        let e = PlanCoachError::FileTooLarge {
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(e.user_message(), "Filen er for stor (maks 10 MB)");
        let e = PlanCoachError::FileTooLarge { limit: 1024 };
        assert_eq!(e.user_message(), "Filen er for stor (maks 1 KB)");
        let e = PlanCoachError::BodyTooLarge {
            limit: JSON_BODY_LIMIT,
        };
        assert_eq!(e.user_message(), "Læringsplanen er for lang (maks 256 KB)");
        assert_eq!(e.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(display_size(1), "1 KB");
        assert_eq!(display_size(1024 * 1024 + 1), "2 MB");
    }

    #[test]
    fn client_ip_defaults_without_connect_info() {
        let request = Request::new(axum::body::Body::empty());
        assert_eq!(client_ip(&request), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
