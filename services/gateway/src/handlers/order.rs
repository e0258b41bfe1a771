use crate::error::AppError;
use crate::handlers::blocking;
use crate::protocol::StatusBody;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use types::ids::OrderId;

#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub id: OrderId,
    #[serde(flatten)]
    pub status: StatusBody,
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<u64>,
) -> Result<Json<OrderStatusResponse>, AppError> {
    let id = OrderId::new(order_id);
    let exchange = state.exchange.clone();
    let report = blocking(move || exchange.query_order(id)).await??;

    Ok(Json(OrderStatusResponse {
        id,
        status: report.into(),
    }))
}
