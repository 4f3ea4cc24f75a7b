//! REST API server for LedgerChain
//!
//! Exposes the ledger over HTTP: identity creation, transaction submission,
//! chain and pool queries, mining control, balances and discovered
//! neighbors. All routes are nested under `/api`.

use axum::{
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info};

use crate::address::Address;
use crate::blockchain::{Block, Ledger};
use crate::crypto::Identity;
use crate::discovery::NeighborSet;
use crate::error::ChainError;
use crate::node::NodeState;
use crate::transaction::{SignedSubmission, Transaction, TransactionRequest};

/// Auto-mining period used when `/mining/start` omits one.
pub const DEFAULT_AUTO_MINING_INTERVAL_SECS: u64 = 20;

/// Shared handles the HTTP handlers operate on.
#[derive(Clone)]
pub struct Node {
    pub ledger: Arc<Ledger>,
    pub neighbors: Arc<NeighborSet>,
    // Optional orchestrator state for health checks and logging
    pub state: Option<Arc<RwLock<NodeState>>>,
    api_stats: Arc<RwLock<ApiStats>>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    mining_starts: u64,
    mining_stops: u64,
    transactions_submitted: u64,
    transactions_rejected: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl Node {
    /// API node over a ledger with no orchestrator and no discovery.
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::new_shared(ledger, Arc::new(NeighborSet::new()), None)
    }

    /// API node sharing the orchestrator's ledger, neighbor set and state.
    pub fn new_shared(
        ledger: Arc<Ledger>,
        neighbors: Arc<NeighborSet>,
        state: Option<Arc<RwLock<NodeState>>>,
    ) -> Self {
        Self {
            ledger,
            neighbors,
            state,
            api_stats: Arc::new(RwLock::new(ApiStats::new())),
        }
    }

    pub fn is_mining(&self) -> bool {
        self.ledger.is_auto_mining()
    }

    /// Blocks appended after genesis.
    pub fn blocks_mined(&self) -> u64 {
        self.ledger.height().saturating_sub(1) as u64
    }

    pub async fn start_mining(&self, interval: Duration) -> Result<(), ApiError> {
        self.ledger.start_auto_mining(interval)?;
        self.api_stats.write().await.mining_starts += 1;
        info!(interval_secs = interval.as_secs(), "auto-mining started via API");
        Ok(())
    }

    pub async fn stop_mining(&self) -> Result<(), ApiError> {
        self.ledger.stop_auto_mining().await?;
        self.api_stats.write().await.mining_stops += 1;
        info!("auto-mining stopped via API");
        Ok(())
    }

    /// Runs one mining round on the blocking pool.
    pub async fn mine(&self) -> Result<Block, ApiError> {
        let ledger = self.ledger.clone();
        tokio::task::spawn_blocking(move || ledger.mine())
            .await
            .map_err(|e| ApiError::InternalError(format!("Mining task failed: {}", e)))?
            .map_err(ApiError::from)
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            mining_starts: stats.mining_starts,
            mining_stops: stats.mining_stops,
            transactions_submitted: stats.transactions_submitted,
            transactions_rejected: stats.transactions_rejected,
            uptime_seconds: uptime,
            height: self.ledger.height(),
            pending_transactions: self.ledger.pending_transactions().len(),
            blocks_mined: self.blocks_mined(),
            is_mining: self.is_mining(),
            neighbor_count: self.neighbors.len(),
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    LedgerError(ChainError),
    InvalidInput(String),
    InternalError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::LedgerError(e) => match e {
                ChainError::MalformedAddress(_)
                | ChainError::MalformedPublicKey(_)
                | ChainError::MalformedPrivateKey(_)
                | ChainError::MalformedSignature(_)
                | ChainError::InvalidTransaction(_)
                | ChainError::ConfigError(_) => StatusCode::BAD_REQUEST,
                ChainError::InvalidSignature | ChainError::SenderKeyMismatch => {
                    StatusCode::UNAUTHORIZED
                }
                ChainError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ChainError::AutoMiningAlreadyRunning | ChainError::AutoMiningNotRunning => {
                    StatusCode::CONFLICT
                }
                ChainError::MiningAborted => StatusCode::SERVICE_UNAVAILABLE,
                ChainError::KeyGenerationFailed(_)
                | ChainError::EmptyChainInvariantViolated
                | ChainError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::LedgerError(e) => e.to_string(),
            ApiError::InvalidInput(msg) | ApiError::InternalError(msg) => msg,
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %message, "request failed");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        ApiError::LedgerError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub length: usize,
}

#[derive(Serialize)]
pub struct AmountResponse {
    pub amount: f64,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub message: String,
    pub block: Block,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub mining_starts: u64,
    pub mining_stops: u64,
    pub transactions_submitted: u64,
    pub transactions_rejected: u64,
    pub uptime_seconds: u64,
    pub height: usize,
    pub pending_transactions: usize,
    pub blocks_mined: u64,
    pub is_mining: bool,
    pub neighbor_count: usize,
}

#[derive(Deserialize, Default)]
pub struct StartMiningRequest {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_AUTO_MINING_INTERVAL_SECS
}

#[derive(Serialize)]
struct WalletResponse {
    private_key: String,
    public_key: String,
    blockchain_address: String,
}

#[derive(Serialize)]
struct SuccessResponse {
    message: String,
}

impl SuccessResponse {
    fn new(message: &str) -> Json<Self> {
        Json(SuccessResponse {
            message: message.to_string(),
        })
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Request statistics middleware
async fn stats_middleware(State(node): State<Arc<Node>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = node.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status, duration and the current `NodeState` (when
/// available).
async fn logging_middleware(
    State(node): State<Arc<Node>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    let node_state = match &node.state {
        Some(s) => format!("{:?}", *s.read().await),
        None => "unknown".to_string(),
    };

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        node_state = %node_state,
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Build the API router with all endpoints
pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE])
        .allow_credentials(true);

    let api_routes = Router::new()
        // Ledger endpoints
        .route("/chain", get(get_chain))
        .route(
            "/transactions",
            get(get_transactions).post(submit_transaction),
        )
        .route("/amount/:address", get(get_amount))
        // Mining endpoints
        .route("/mine", post(mine))
        .route("/mining/start", post(start_mining))
        .route("/mining/stop", post(stop_mining))
        .route("/mining/status", get(get_mining_status))
        // Network endpoints
        .route("/network/neighbors", get(get_neighbors))
        // Wallet endpoints
        .route("/wallet", post(create_wallet))
        // System endpoints
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats))
        // logging before stats so we always record timing and node-state
        .layer(middleware::from_fn_with_state(node.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(node.clone(), stats_middleware))
        .with_state(node);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn run_api_server<F>(
    node: Arc<Node>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();
    match &node.state {
        Some(s) => {
            let state = *s.read().await;
            let (status, label) = match state {
                NodeState::Ready => (StatusCode::OK, "healthy"),
                _ => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
            };
            (
                status,
                Json(serde_json::json!({
                    "status": label,
                    "node_state": format!("{:?}", state),
                    "height": node.ledger.height(),
                    "timestamp": timestamp
                })),
            )
        }
        // No orchestrator state available, assume healthy
        None => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "height": node.ledger.height(),
                "timestamp": timestamp
            })),
        ),
    }
}

async fn create_wallet() -> Result<Json<WalletResponse>, ApiError> {
    let identity = Identity::generate()?;
    info!(address = %identity.address(), "identity created");

    Ok(Json(WalletResponse {
        private_key: identity.private_key_hex(),
        public_key: identity.public_key_hex(),
        blockchain_address: identity.address().to_string(),
    }))
}

async fn get_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    let chain = node.ledger.chain();
    Json(ChainResponse {
        length: chain.len(),
        chain: chain.to_vec(),
    })
}

async fn get_transactions(State(node): State<Arc<Node>>) -> Json<TransactionsResponse> {
    let transactions = node.ledger.pending_transactions();
    Json(TransactionsResponse {
        length: transactions.len(),
        transactions,
    })
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    body: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SuccessResponse>), ApiError> {
    let Json(request) = body?;

    let result =
        SignedSubmission::try_from(request).and_then(|submission| node.ledger.submit(submission));

    {
        let mut stats = node.api_stats.write().await;
        match &result {
            Ok(()) => stats.transactions_submitted += 1,
            Err(_) => stats.transactions_rejected += 1,
        }
    }
    result?;

    Ok((StatusCode::CREATED, SuccessResponse::new("success")))
}

async fn get_amount(
    State(node): State<Arc<Node>>,
    Path(address): Path<String>,
) -> Result<Json<AmountResponse>, ApiError> {
    let address = Address::parse(&address)?;
    let amount = node.ledger.balance(&address);
    Ok(Json(AmountResponse {
        amount: amount.to_coins(),
    }))
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(MineResponse {
        message: "success".to_string(),
        block,
    }))
}

async fn start_mining(
    State(node): State<Arc<Node>>,
    body: Option<Json<StartMiningRequest>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    if request.interval_secs == 0 {
        return Err(ApiError::InvalidInput(
            "interval_secs must be greater than zero".to_string(),
        ));
    }
    node.start_mining(Duration::from_secs(request.interval_secs))
        .await?;

    Ok(SuccessResponse::new("Mining started successfully"))
}

async fn stop_mining(State(node): State<Arc<Node>>) -> Result<Json<SuccessResponse>, ApiError> {
    node.stop_mining().await?;

    Ok(SuccessResponse::new("Mining stopped successfully"))
}

async fn get_mining_status(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let config = node.ledger.config();
    Json(serde_json::json!({
        "is_mining": node.is_mining(),
        "blocks_mined": node.blocks_mined(),
        "difficulty": config.difficulty,
        "reward": config.reward.to_coins(),
    }))
}

async fn get_neighbors(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let neighbors: Vec<String> = node
        .neighbors
        .list()
        .iter()
        .map(ToString::to_string)
        .collect();
    Json(serde_json::json!({
        "count": neighbors.len(),
        "neighbors": neighbors
    }))
}

async fn get_api_stats(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let stats = node.get_stats().await;
    Json(stats)
}
