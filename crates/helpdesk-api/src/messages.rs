use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::{debug, info};

use helpdesk_types::api::{EditMessageRequest, MessageQuery, SendMessageRequest, StatusMessage, positive_id};
use helpdesk_types::models::Message;

use crate::error::ApiError;
use crate::extract::{ApiPath, ApiQuery, JsonBody};
use crate::session::{MaybeContext, RequestContext};
use crate::state::{AppState, run_db};
use crate::tickets::ticket_owner;

/// GET /messages/ticket/{ticket_id}?includeInternal=
///
/// Internal notes are only returned when the flag is set *and* the caller
/// holds an admin session.
pub async fn list(
    State(state): State<AppState>,
    MaybeContext(ctx): MaybeContext,
    ApiPath(ticket_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<MessageQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let ticket_id = positive_id(ticket_id, "ticket id")?;
    let include_internal = query.include_internal && ctx.is_some_and(|c| c.is_admin());

    let messages = run_db(&state, move |db| {
        db.list_messages(ticket_id, include_internal)?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(messages))
}

/// POST /messages. The session user is always the sender.
pub async fn send(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let req = req.validated()?;
    let ticket_id = positive_id(req.ticket_id, "ticket id")?;
    let ctx = ctx.ensure_account(&state).await?;

    if req.is_internal && !ctx.is_admin() {
        return Err(ApiError::Forbidden("Only admins can post internal notes"));
    }

    let owner = ticket_owner(&state, ticket_id).await?;
    if !ctx.may_act_on(owner) {
        return Err(ApiError::Forbidden("You can only reply to your own tickets"));
    }

    let message = run_db(&state, move |db| {
        db.insert_message(ticket_id, Some(ctx.user_id), req.message_type, &req.content, req.is_internal)?
            .map(|row| row.into_model())
            .transpose()
    })
    .await?
    .ok_or(ApiError::NotFound("Ticket"))?;

    debug!(
        message_id = message.id,
        ticket_id,
        internal = message.is_internal,
        "Message sent"
    );
    Ok((StatusCode::CREATED, Json(message)))
}

/// PUT /messages/{id}
pub async fn edit(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<EditMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let id = positive_id(id, "message id")?;
    let req = req.validated()?;

    authorize_author(&state, ctx, id, "You can only edit your own messages").await?;

    let message = run_db(&state, move |db| {
        db.update_message_content(id, &req.content)?
            .map(|row| row.into_model())
            .transpose()
    })
    .await?
    .ok_or(ApiError::NotFound("Message"))?;

    Ok(Json(message))
}

/// DELETE /messages/{id}
pub async fn remove(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<StatusMessage>, ApiError> {
    let id = positive_id(id, "message id")?;

    authorize_author(&state, ctx, id, "You can only delete your own messages").await?;

    if !run_db(&state, move |db| db.delete_message(id)).await? {
        return Err(ApiError::NotFound("Message"));
    }

    info!(message_id = id, user_id = ctx.user_id, "Message deleted");
    Ok(Json(StatusMessage {
        message: "Message deleted successfully".into(),
    }))
}

/// Admins may modify any message, everyone else only messages they sent.
async fn authorize_author(
    state: &AppState,
    ctx: RequestContext,
    message_id: i64,
    denied: &'static str,
) -> Result<(), ApiError> {
    let ctx = ctx.ensure_account(state).await?;
    let sender = run_db(state, move |db| Ok(db.get_message(message_id)?.map(|row| row.sender_id)))
        .await?
        .ok_or(ApiError::NotFound("Message"))?;

    if ctx.may_act_on(sender) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(denied))
    }
}
