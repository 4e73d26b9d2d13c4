use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    wire::{check_block_shape, ChainResponse},
    Block, CancelToken, ChainFetcher, ConsensusResolver, Ledger, LedgerError, PeerRegistry,
    ResolveOutcome,
};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub peers: Arc<PeerRegistry>,
    pub resolver: Arc<ConsensusResolver<Arc<dyn ChainFetcher>>>,
    pub mine_timeout: Duration,
}

impl AppState {
    pub fn new(
        ledger: Arc<Ledger>,
        peers: Arc<PeerRegistry>,
        fetcher: Arc<dyn ChainFetcher>,
        mine_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            peers,
            resolver: Arc::new(ConsensusResolver::new(fetcher)),
            mine_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chain", get(get_chain))
        .route("/mine", get(mine_from_query).post(mine_from_body))
        .route("/blocks", post(receive_block))
        .route("/nodes", get(list_nodes).delete(remove_nodes))
        .route("/nodes/register", post(register_nodes))
        .route("/register_node", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .route("/resolve", get(resolve))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Ledger(e) => {
                let status = match &e {
                    LedgerError::Validation(_) | LedgerError::MalformedInput(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    LedgerError::StaleTip { .. } => StatusCode::CONFLICT,
                    LedgerError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
                    LedgerError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                    LedgerError::NonceSpaceExhausted => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    length: usize,
    peers: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        length: state.ledger.len(),
        peers: state.peers.len(),
    })
}

async fn get_chain(State(state): State<AppState>) -> Json<ChainResponse> {
    Json(ChainResponse::from(state.ledger.snapshot().as_ref()))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MineQuery {
    data: Option<String>,
}

/// `data` is UTF-8 text, `payload` is hex for arbitrary bytes. At most one.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MineRequest {
    data: Option<String>,
    payload: Option<String>,
}

impl MineRequest {
    fn into_payload(self) -> Result<Option<Vec<u8>>, LedgerError> {
        match (self.data, self.payload) {
            (Some(_), Some(_)) => Err(LedgerError::MalformedInput(
                "send either data or payload, not both".into(),
            )),
            (Some(data), None) => Ok(Some(data.into_bytes())),
            (None, Some(hex_payload)) => hex::decode(hex_payload)
                .map(Some)
                .map_err(|e| LedgerError::MalformedInput(format!("payload is not hex: {e}"))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Serialize)]
struct MineResponse {
    message: &'static str,
    index: u64,
    hash: String,
    previous_hash: String,
    proof: u64,
    payload: String,
    timestamp: u64,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "New block mined!",
            index: block.index,
            hash: block.hash,
            previous_hash: block.previous_hash,
            proof: block.proof,
            payload: hex::encode(block.payload),
            timestamp: block.timestamp,
        }
    }
}

async fn mine_from_query(
    State(state): State<AppState>,
    Query(query): Query<MineQuery>,
) -> Result<Json<MineResponse>, ApiError> {
    mine(state, query.data.map(String::into_bytes)).await
}

async fn mine_from_body(
    State(state): State<AppState>,
    body: Option<Json<MineRequest>>,
) -> Result<Json<MineResponse>, ApiError> {
    let payload = body.map(|Json(req)| req).unwrap_or_default().into_payload()?;
    mine(state, payload).await
}

/// Cancels the search if the request goes away before it finishes.
struct CancelOnDrop(CancelToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn mine(state: AppState, payload: Option<Vec<u8>>) -> Result<Json<MineResponse>, ApiError> {
    let payload =
        payload.unwrap_or_else(|| format!("Block {} data", state.ledger.len() + 1).into_bytes());

    let cancel = CancelToken::new();
    let _guard = CancelOnDrop(cancel.clone());
    let deadline = tokio::spawn({
        let cancel = cancel.clone();
        let timeout = state.mine_timeout;
        async move {
            tokio::time::sleep(timeout).await;
            warn!(?timeout, "mining deadline reached, cancelling search");
            cancel.cancel();
        }
    });

    let ledger = state.ledger.clone();
    let mined = tokio::task::spawn_blocking(move || ledger.mine(payload, &cancel)).await;
    deadline.abort();

    let block = mined.map_err(|e| ApiError::Internal(format!("mining task failed: {e}")))??;
    Ok(Json(MineResponse::from(block)))
}

#[derive(Serialize)]
struct BlockAccepted {
    message: &'static str,
    index: u64,
    hash: String,
}

async fn receive_block(
    State(state): State<AppState>,
    Json(block): Json<Block>,
) -> Result<(StatusCode, Json<BlockAccepted>), ApiError> {
    check_block_shape(&block, block.index)?;
    let (index, hash) = (block.index, block.hash.clone());
    state.ledger.accept_block(block)?;
    Ok((
        StatusCode::CREATED,
        Json(BlockAccepted {
            message: "Block accepted",
            index,
            hash,
        }),
    ))
}

/// Accepts `{"nodes": ["a:1", "b:2"]}` or a single `{"nodes": "a:1"}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum Nodes {
    One(String),
    Many(Vec<String>),
}

impl Nodes {
    fn into_vec(self) -> Vec<String> {
        match self {
            Nodes::One(node) => vec![node],
            Nodes::Many(nodes) => nodes,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodesRequest {
    nodes: Nodes,
}

#[derive(Serialize)]
struct NodesResponse {
    message: &'static str,
    total_nodes: Vec<String>,
}

async fn register_nodes(
    State(state): State<AppState>,
    Json(req): Json<NodesRequest>,
) -> Result<(StatusCode, Json<NodesResponse>), ApiError> {
    let nodes = req.nodes.into_vec();
    if nodes.is_empty() {
        return Err(LedgerError::MalformedInput("supply at least one node".into()).into());
    }
    state.peers.add_all(&nodes)?;
    Ok((
        StatusCode::CREATED,
        Json(NodesResponse {
            message: "New nodes have been added",
            total_nodes: state.peers.list(),
        }),
    ))
}

async fn remove_nodes(
    State(state): State<AppState>,
    Json(req): Json<NodesRequest>,
) -> Json<NodesResponse> {
    for node in req.nodes.into_vec() {
        state.peers.remove(&node);
    }
    Json(NodesResponse {
        message: "Nodes removed",
        total_nodes: state.peers.list(),
    })
}

async fn list_nodes(State(state): State<AppState>) -> Json<NodesResponse> {
    Json(NodesResponse {
        message: "Known nodes",
        total_nodes: state.peers.list(),
    })
}

#[derive(Serialize)]
struct ResolveResponse {
    message: &'static str,
    replaced: bool,
    peer: Option<String>,
    length: usize,
    chain: Vec<Block>,
    failures: Vec<String>,
}

async fn resolve(State(state): State<AppState>) -> Json<ResolveResponse> {
    let res = state.resolver.resolve(&state.ledger, &state.peers).await;
    let (message, peer) = match res.outcome {
        ResolveOutcome::Replaced { peer } => ("Chain updated", Some(peer)),
        ResolveOutcome::Unchanged => ("Chain unchanged", None),
    };
    info!(
        outcome = message,
        length = res.chain.len(),
        failures = res.failures.len(),
        "resolve finished"
    );
    Json(ResolveResponse {
        message,
        replaced: peer.is_some(),
        peer,
        length: res.chain.len(),
        chain: res.chain.blocks().to_vec(),
        failures: res.failures.iter().map(ToString::to_string).collect(),
    })
}
