use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use longchain_core::{Block, ChainResponse, LedgerError, NodeId, SharedLedger, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match &err {
            LedgerError::MalformedAddress(_) => Self::BadRequest(err.to_string()),
            _ => {
                error!(error = %err, "ledger operation failed");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub node: NodeId,
}

#[derive(Serialize, Deserialize)]
pub struct TransactionAccepted {
    pub message: String,
    pub index: u64,
}

#[derive(Serialize, Deserialize)]
pub struct Mined {
    pub message: String,
    pub block: Block,
}

#[derive(Deserialize)]
pub struct RegisterNodes {
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct NodesRegistered {
    pub message: String,
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct Resolved {
    pub message: String,
    pub chain: Vec<Block>,
}

pub fn router(ledger: SharedLedger) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending))
        .route("/mine", get(mine).post(mine))
        .route("/chain", get(chain))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve))
        .with_state(ledger)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(ledger): State<SharedLedger>) -> Json<Health> {
    Json(Health {
        status: "ok".into(),
        node: ledger.node_id().await,
    })
}

async fn new_transaction(
    State(ledger): State<SharedLedger>,
    payload: Result<Json<Transaction>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionAccepted>), ApiError> {
    let Json(tx) = payload?;
    let index = ledger.add_transaction(tx).await;
    Ok((
        StatusCode::CREATED,
        Json(TransactionAccepted {
            message: format!("Transaction will be added to block with index {index}"),
            index,
        }),
    ))
}

async fn pending(State(ledger): State<SharedLedger>) -> Json<Vec<Transaction>> {
    Json(ledger.pending().await)
}

async fn mine(State(ledger): State<SharedLedger>) -> Result<Json<Mined>, ApiError> {
    let block = ledger.mine().await?;
    Ok(Json(Mined {
        message: "New block created and added to chain".into(),
        block,
    }))
}

async fn chain(State(ledger): State<SharedLedger>) -> Json<ChainResponse> {
    Json(ChainResponse::new(ledger.chain().await))
}

async fn register_nodes(
    State(ledger): State<SharedLedger>,
    payload: Result<Json<RegisterNodes>, JsonRejection>,
) -> Result<(StatusCode, Json<NodesRegistered>), ApiError> {
    let Json(req) = payload?;
    let nodes = ledger.register_nodes(&req.nodes).await?;
    Ok((
        StatusCode::CREATED,
        Json(NodesRegistered {
            message: "New nodes added".into(),
            nodes,
        }),
    ))
}

async fn resolve(State(ledger): State<SharedLedger>) -> Result<Json<Resolved>, ApiError> {
    let replaced = ledger.resolve_conflicts().await?;
    let message = if replaced {
        "Chain is replaced"
    } else {
        "Our chain is master"
    };
    Ok(Json(Resolved {
        message: message.into(),
        chain: ledger.chain().await,
    }))
}
