use crate::error::AppError;
use crate::handlers::blocking;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use types::records::LedgerDump;

#[derive(Debug, Deserialize)]
pub struct DumpParams {
    pub rows: Option<usize>,
}

pub async fn get_dump(
    State(state): State<AppState>,
    Query(params): Query<DumpParams>,
) -> Result<Json<LedgerDump>, AppError> {
    let rows = params.rows.unwrap_or(state.dump_rows);
    let exchange = state.exchange.clone();
    let dump = blocking(move || exchange.dump(rows)).await?;
    Ok(Json(dump))
}
