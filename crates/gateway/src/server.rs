use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    axum::{
        Router,
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    futures::future::BoxFuture,
    quotabot_channels::{ContinueCallback, TurnContext},
    quotabot_config::QuotabotConfig,
    quotabot_msteams::{Activity, constant_time_eq, verify_webhook_signature},
    quotabot_purespectrum::{ProviderError, SurveyEvent},
    secrecy::ExposeSecret,
    serde_json::json,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{debug, info, warn},
};

use crate::{poller::spawn_poller, state::GatewayState};

const EVENTS_TOKEN_HEADER: &str = "x-webhook-token";

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route("/api/messages", post(messages_handler))
        .route("/webhook", post(webhook_handler))
        .route("/api/purespectrum/events", post(events_handler))
        .route("/api/surveys", get(surveys_handler))
        .route("/api/quotas/{survey_id}", get(quotas_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server and the survey poller.
pub async fn start_gateway(config: QuotabotConfig) -> anyhow::Result<()> {
    let state = GatewayState::from_config(&config)?;

    let auth_status = match state.provider.check_auth().await {
        Ok(()) => "authenticated".to_string(),
        Err(e) => {
            warn!(error = %e, "PureSpectrum authentication check failed");
            format!("unavailable ({e})")
        },
    };

    let poll_interval = Duration::from_secs(config.purespectrum.poll_interval_secs);
    spawn_poller(
        Arc::clone(&state.provider),
        state.broadcaster.clone(),
        poll_interval,
    );

    let app = build_gateway_app(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Startup banner.
    let lines = [
        format!("quotabot gateway v{}", state.version),
        format!("listening on {addr}"),
        format!(
            "teams: {}",
            if config.teams_configured() {
                "app credentials set"
            } else {
                "no app credentials"
            }
        ),
        format!("purespectrum: {auth_status}"),
        if poll_interval.is_zero() {
            "poller: disabled".to_string()
        } else {
            format!("poller: every {}s", poll_interval.as_secs())
        },
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "channel": state.channel.id(),
        "surveys": state.store.survey_count(),
        "subscriptions": state.store.subscription_count(),
    }))
}

/// Bot Framework messaging endpoint. The reply is posted back through the
/// channel after the request has been acknowledged.
async fn messages_handler(
    State(state): State<Arc<GatewayState>>,
    Json(activity): Json<Activity>,
) -> StatusCode {
    if let Some(deleted) = activity.deleted_conversation() {
        let removed = state.store.remove_conversation_everywhere(&deleted);
        info!(
            conversation = deleted.conversation_id(),
            removed, "conversation deleted"
        );
        return StatusCode::OK;
    }

    let reference = activity.conversation_reference();
    if activity.bot_removed() {
        let removed = state.store.remove_conversation_everywhere(&reference);
        info!(
            conversation = reference.conversation_id(),
            removed, "bot removed from conversation"
        );
        return StatusCode::OK;
    }
    if !activity.is_message() {
        debug!(kind = %activity.kind, "ignoring activity");
        return StatusCode::OK;
    }

    let reply = state.bot.handle(&activity.command_text(), &reference).await;
    let channel = Arc::clone(&state.channel);
    tokio::spawn(async move {
        let callback: ContinueCallback = Box::new(
            move |turn: Arc<dyn TurnContext>| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(async move { turn.send_text(&reply).await })
            },
        );
        if let Err(e) = channel.continue_conversation(&reference, callback).await {
            warn!(
                conversation = reference.conversation_id(),
                error = %e,
                "failed to deliver reply"
            );
        }
    });
    StatusCode::OK
}

/// Teams outgoing webhook: the reply travels back in the response body.
async fn webhook_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if !verify_webhook_signature(state.webhook_token.as_ref(), &body, authorization) {
        warn!("rejected outgoing webhook with bad signature");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid signature" })),
        )
            .into_response();
    }

    let activity: Activity = match serde_json::from_slice(&body) {
        Ok(activity) => activity,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid activity: {e}") })),
            )
                .into_response();
        },
    };

    let reference = activity.conversation_reference();
    let reply = state.bot.handle(&activity.command_text(), &reference).await;
    Json(json!({ "type": "message", "text": reply })).into_response()
}

/// PureSpectrum survey event: fan the event out to the survey's subscribers.
async fn events_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(event): Json<SurveyEvent>,
) -> Response {
    if let Some(expected) = state.events_token.as_ref() {
        let provided = headers
            .get(EVENTS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !constant_time_eq(provided, expected.expose_secret()) {
            warn!("rejected survey event with bad token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid token" })),
            )
                .into_response();
        }
    }

    let survey_id = event.survey_id.trim();
    if survey_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "surveyId is required" })),
        )
            .into_response();
    }

    let report = state.broadcaster.broadcast(survey_id, &event.to_text()).await;
    Json(json!({
        "status": "ok",
        "surveyId": survey_id,
        "attempted": report.attempted,
        "delivered": report.delivered,
        "failed": report.failed,
    }))
    .into_response()
}

// ── Data API ─────────────────────────────────────────────────────────────────

fn provider_error_response(error: &ProviderError) -> Response {
    let status = match error {
        ProviderError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::Unauthorized => StatusCode::UNAUTHORIZED,
        ProviderError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

async fn surveys_handler(State(state): State<Arc<GatewayState>>) -> Response {
    match state.provider.list_surveys().await {
        Ok(surveys) => Json(json!({ "surveys": surveys })).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to list surveys");
            provider_error_response(&e)
        },
    }
}

async fn quotas_handler(
    State(state): State<Arc<GatewayState>>,
    Path(survey_id): Path<String>,
) -> Response {
    match state.provider.fetch_quotas(&survey_id).await {
        Ok(quotas) => Json(json!({ "surveyId": survey_id, "quotas": quotas })).into_response(),
        Err(e) => {
            warn!(survey_id = %survey_id, error = %e, "failed to fetch quotas");
            provider_error_response(&e)
        },
    }
}
