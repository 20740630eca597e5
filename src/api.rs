//! REST API server for the agent chain
//!
//! Exposes chain runs, plan scoring, numerology profiles and the document
//! library over HTTP.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::AgentChain;
use crate::context::{ExternalLookup, NumerologyContextProvider, TradingContextProvider};
use crate::documents::{document_key, is_known_category, NumerologyLibrary};
use crate::evaluator::PlanEvaluator;
use crate::numerology::NumerologyCalculator;
use crate::trading::resolve_data_file;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NumerologyRequest {
    pub name: String,
    pub dob: String,
    pub current_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TradingRequest {
    /// Relative to the server's trading data directory
    pub file_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainRequest {
    pub question: String,
    pub max_iterations: Option<u32>,
    pub numerology: Option<NumerologyRequest>,
    pub trading: Option<TradingRequest>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub question: String,
    pub plan: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct PhaseQuery {
    pub phase: Option<u32>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn failure(status: StatusCode, message: String) -> ApiResult {
    (status, Json(ApiResponse::error(message)))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub chain: Arc<AgentChain>,
    pub evaluator: Arc<PlanEvaluator>,
    pub library: NumerologyLibrary,
    pub max_iterations: u32,
    pub trading_data_dir: PathBuf,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_agents(State(state): State<ApiState>) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(state.chain.chain_info())))
}

/// =============================
/// Chain Endpoint
/// =============================

async fn run_chain(State(state): State<ApiState>, Json(req): Json<ChainRequest>) -> ApiResult {
    info!(question = %req.question, "Received chain request");

    if req.question.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "question must not be empty".into());
    }

    let lookup: Option<Box<dyn ExternalLookup>> = match (req.numerology, req.trading) {
        (Some(_), Some(_)) => {
            return failure(
                StatusCode::BAD_REQUEST,
                "pass either numerology or trading, not both".into(),
            )
        }
        (Some(n), None) => Some(Box::new(NumerologyContextProvider::new(
            n.name,
            n.dob,
            n.current_date,
            state.library.clone(),
        )) as Box<dyn ExternalLookup>),
        (None, Some(t)) => match resolve_data_file(&state.trading_data_dir, &t.file_path) {
            Ok(path) => Some(Box::new(TradingContextProvider::new(path)) as Box<dyn ExternalLookup>),
            Err(e) => {
                warn!("Rejected trading file: {}", e);
                return failure(StatusCode::BAD_REQUEST, e.to_string());
            }
        },
        (None, None) => None,
    };

    let max_iterations = req.max_iterations.unwrap_or(state.max_iterations);

    match state
        .chain
        .execute(&req.question, lookup.as_deref(), max_iterations)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "run_id": outcome.run_id,
                "response": outcome.response,
                "termination": outcome.termination,
                "iterations": outcome.iterations,
                "external_data": outcome.context.external_data,
            }))),
        ),
        Err(e) => {
            warn!("Chain run failed: {}", e);
            failure(StatusCode::BAD_GATEWAY, format!("Chain run failed: {}", e))
        }
    }
}

/// =============================
/// Evaluation Endpoint
/// =============================

async fn evaluate_plan(
    State(state): State<ApiState>,
    Json(req): Json<EvaluateRequest>,
) -> ApiResult {
    match state
        .evaluator
        .evaluate(&req.question, &req.plan, &req.answer)
        .await
    {
        Ok(evaluation) => (StatusCode::OK, Json(ApiResponse::success(evaluation))),
        Err(e) => failure(StatusCode::BAD_GATEWAY, format!("Evaluation failed: {}", e)),
    }
}

/// =============================
/// Numerology Endpoints
/// =============================

async fn numerology_profile(Json(req): Json<NumerologyRequest>) -> ApiResult {
    match NumerologyCalculator::new(&req.name, &req.dob, req.current_date.as_deref()) {
        Ok(calculator) => (StatusCode::OK, Json(ApiResponse::success(calculator.profile()))),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn get_document(
    State(state): State<ApiState>,
    Path((category, number)): Path<(String, u32)>,
    Query(query): Query<PhaseQuery>,
) -> ApiResult {
    if !is_known_category(&category) {
        return failure(
            StatusCode::NOT_FOUND,
            format!("Unknown document category: {}", category),
        );
    }

    if let Err(e) = document_key(state.library.prefix(), &category, number, query.phase) {
        return failure(StatusCode::BAD_REQUEST, e.to_string());
    }

    match state
        .library
        .try_document_text(&category, number, query.phase)
        .await
    {
        Ok(text) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "category": category,
                "number": number,
                "phase": query.phase,
                "text": text,
            }))),
        ),
        Err(e) => failure(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/chain", post(run_chain))
        .route("/api/evaluate", post(evaluate_plan))
        .route("/api/numerology/profile", post(numerology_profile))
        .route("/api/documents/:category/:number", get(get_document))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ANALYZE_AGENT, CHECKER_AGENT, EXECUTE_AGENT};
    use crate::documents::docx::tests::build_docx;
    use crate::documents::InMemoryDocumentStore;
    use crate::llm::{LanguageModel, ScriptedModel};
    use crate::models::AgentConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn configs() -> Vec<AgentConfig> {
        [
            json!({"name": ANALYZE_AGENT, "input": {"user_question": "q"},
                   "output": {"plan": "p", "external_keywords": "k"}}),
            json!({"name": EXECUTE_AGENT,
                   "input": {"user_question": "q", "plan": "p", "external_data": "d", "loss_response": "l"},
                   "output": {"response": "r"}}),
            json!({"name": CHECKER_AGENT, "input": {"plan": "p", "response": "r"},
                   "output": {"missing_steps": "m"}}),
        ]
        .iter()
        .map(|v| AgentConfig::from_value(v).unwrap())
        .collect()
    }

    async fn state(replies: Vec<&str>) -> (ApiState, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::from_replies(replies));
        let shared: Arc<dyn LanguageModel> = model.clone();

        let store = InMemoryDocumentStore::new();
        store
            .insert("p/duong_doi/duong_doi_8.docx", build_docx(&["Đường đời số 8"]))
            .await;

        let state = ApiState {
            chain: Arc::new(AgentChain::new(configs(), shared.clone()).unwrap()),
            evaluator: Arc::new(PlanEvaluator::new(shared).unwrap()),
            library: NumerologyLibrary::new(Arc::new(store), "p"),
            max_iterations: 3,
            trading_data_dir: std::env::temp_dir(),
        };
        (state, model)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state(vec![]).await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(create_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_chain_with_numerology_context() {
        let (state, model) = state(vec![
            "[[ ## plan ## ]]\n1. read life path\n[[ ## external_keywords ## ]]\n[\"life_path\"]\n[[ ## completed ## ]]",
            "[[ ## response ## ]]\nFocus on discipline.\n[[ ## completed ## ]]",
            "[[ ## missing_steps ## ]]\nNone\n[[ ## completed ## ]]",
        ])
        .await;

        let request = post_json(
            "/api/chain",
            json!({
                "question": "Hôm nay tôi nên giao dịch thế nào?",
                "numerology": {"name": "Hồ Đăng Mạnh", "dob": "18/11/2004", "current_date": "18/10/2026"}
            }),
        );
        let (status, body) = send(create_router(state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["response"]["response"], "Focus on discipline.");
        assert_eq!(body["data"]["termination"], "completed");
        assert_eq!(body["data"]["external_data"]["life_path"], "Đường đời số 8");
        assert!(model.calls().await[1].1.contains("life_path: Đường đời số 8"));
    }

    #[tokio::test]
    async fn test_chain_rejects_two_lookups() {
        let (state, model) = state(vec![]).await;
        let request = post_json(
            "/api/chain",
            json!({
                "question": "q",
                "numerology": {"name": "An", "dob": "01/01/2000"},
                "trading": {"file_path": "t.xlsx"}
            }),
        );

        let (status, body) = send(create_router(state), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(model.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_chain_rejects_trading_path_outside_data_dir() {
        let (state, model) = state(vec![]).await;

        for file_path in ["../trades.xlsx", "/etc/passwd"] {
            let request = post_json(
                "/api/chain",
                json!({"question": "q", "trading": {"file_path": file_path}}),
            );
            let (status, body) = send(create_router(state.clone()), request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body["error"].as_str().unwrap().contains("trading data directory"));
        }
        assert_eq!(model.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_chain_with_missing_trading_file_still_answers() {
        let (state, _) = state(vec![
            "[[ ## plan ## ]]\n1. review\n[[ ## external_keywords ## ]]\n[\"summary\"]\n[[ ## completed ## ]]",
            "[[ ## response ## ]]\nKeep risk small.\n[[ ## completed ## ]]",
            "[[ ## missing_steps ## ]]\nNone\n[[ ## completed ## ]]",
        ])
        .await;

        let request = post_json(
            "/api/chain",
            json!({"question": "q", "trading": {"file_path": "no-such-export.xlsx"}}),
        );
        let (status, body) = send(create_router(state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["response"]["response"], "Keep risk small.");
        assert_eq!(body["data"]["external_data"], json!({}));
    }

    #[tokio::test]
    async fn test_chain_failure_is_reported() {
        let (state, _) = state(vec![]).await;
        let (status, body) = send(create_router(state), post_json("/api/chain", json!({"question": "q"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("script exhausted"));
    }

    #[tokio::test]
    async fn test_evaluate_endpoint() {
        let (state, _) = state(vec![
            "[[ ## evaluation ## ]]\nok\n[[ ## score ## ]]\n9\n[[ ## follow_plan ## ]]\ntrue\n[[ ## missing_steps ## ]]\nNone\n[[ ## completed ## ]]",
        ])
        .await;

        let request = post_json(
            "/api/evaluate",
            json!({"question": "q", "plan": "1. a", "answer": "a"}),
        );
        let (status, body) = send(create_router(state), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["score"], 9);
        assert_eq!(body["data"]["follow_plan"], true);
    }

    #[tokio::test]
    async fn test_profile_endpoint() {
        let (state, _) = state(vec![]).await;

        let request = post_json(
            "/api/numerology/profile",
            json!({"name": "Hồ Đăng Mạnh", "dob": "18/11/2004", "current_date": "18/10/2026"}),
        );
        let (status, body) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["life_path"], 8);

        let request = post_json("/api/numerology/profile", json!({"name": "An", "dob": "2004-11-18"}));
        let (status, _) = send(create_router(state), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_documents_endpoint() {
        let (state, _) = state(vec![]).await;

        let request = Request::builder()
            .uri("/api/documents/life_path/8")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["text"], "Đường đời số 8");

        let request = Request::builder()
            .uri("/api/documents/lucky_color/1")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(create_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::builder()
            .uri("/api/documents/milestone/9")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(create_router(state), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
