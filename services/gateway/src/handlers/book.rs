use crate::error::AppError;
use crate::handlers::blocking;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use matching_engine::book::BookSnapshot;
use serde::Deserialize;
use types::ids::Symbol;

const DEFAULT_DEPTH: usize = 10;

#[derive(Debug, Deserialize)]
pub struct DepthParams {
    pub depth: Option<usize>,
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<DepthParams>,
) -> Result<Json<BookSnapshot>, AppError> {
    let symbol = Symbol::try_new(symbol)
        .ok_or_else(|| AppError::BadRequest("Symbol name must not be blank".into()))?;
    let depth = params.depth.unwrap_or(DEFAULT_DEPTH);

    let exchange = state.exchange.clone();
    let lookup = symbol.clone();
    let snapshot = blocking(move || exchange.book_snapshot(&lookup, depth)).await?;

    snapshot
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No book for symbol {symbol}")))
}
