pub mod auth;
pub mod error;
pub mod extract;
pub mod messages;
pub mod seed;
pub mod session;
pub mod state;
pub mod tickets;
pub mod triage;
pub mod workflow;

use axum::{
    Router,
    routing::{get, post, put},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner, SessionSettings};

/// All routes, with the REST surface nested under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/me", get(auth::me))
        .route("/users/logout", get(auth::logout))
        .route("/tickets", post(tickets::create).get(tickets::list))
        .route(
            "/tickets/{id}",
            get(tickets::show).patch(tickets::update).delete(tickets::remove),
        )
        .route("/tickets/{id}/history", get(tickets::history))
        .route("/tickets/{id}/ai-suggestion", get(tickets::ai_suggestion))
        .route("/messages", post(messages::send))
        .route("/messages/ticket/{ticket_id}", get(messages::list))
        .route("/messages/{id}", put(messages::edit).delete(messages::remove));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .with_state(state)
}
