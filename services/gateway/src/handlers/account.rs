use crate::error::AppError;
use crate::handlers::blocking;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use matching_engine::AccountView;
use types::ids::AccountId;

pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountView>, AppError> {
    let id = AccountId::try_new(account_id)
        .ok_or_else(|| AppError::BadRequest("Account id must not be blank".into()))?;

    let exchange = state.exchange.clone();
    let lookup = id.clone();
    let view = blocking(move || exchange.account(&lookup)).await?;

    view.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Account with ID {id} does not exist")))
}
