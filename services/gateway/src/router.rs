use crate::handlers::{account, book, dump, order};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/dump", get(dump::get_dump))
        .route("/orders/{id}", get(order::get_order))
        .route("/accounts/{id}", get(account::get_account))
        .route("/books/{symbol}", get(book::get_book));

    Router::new()
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
