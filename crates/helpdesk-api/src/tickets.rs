use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::info;

use helpdesk_types::api::{
    CreateTicketRequest, StatusMessage, SuggestionResponse, TicketResponse, UpdateTicketRequest,
    UpdateTicketResponse, positive_id,
};
use helpdesk_types::models::{AiAssessment, Message, StatusHistoryEntry};

use crate::error::ApiError;
use crate::extract::{ApiPath, JsonBody};
use crate::session::{MaybeContext, RequestContext};
use crate::state::{AppState, run_db};
use crate::workflow::notify_in_background;

fn acknowledgment(ticket_id: i64) -> String {
    format!(
        "Thank you for contacting support. Your ticket #{ticket_id} has been received and a member of our team will review it shortly."
    )
}

/// POST /tickets
///
/// The classifier runs before anything is written, so a triage failure
/// leaves no ticket behind. The workflow notification is spawned after the
/// commit and never affects the response.
pub async fn create(
    State(state): State<AppState>,
    ctx: RequestContext,
    JsonBody(req): JsonBody<CreateTicketRequest>,
) -> Result<(StatusCode, Json<TicketResponse>), ApiError> {
    let req = req.validated()?;
    let ctx = ctx.ensure_account(&state).await?;

    let triage = state.classifier.classify(&req.title, &req.description).await?;

    let (ticket, owner, assessment) = run_db(&state, move |db| {
        let row = db.create_ticket(ctx.user_id, &req.title, &req.description, &triage, acknowledgment)?;
        let assessment = db.get_assessment(row.id)?.map(|a| a.into_model()).transpose()?;
        let (ticket, owner) = row.into_model()?;
        Ok((ticket, owner, assessment))
    })
    .await?;

    info!(
        ticket_id = ticket.id,
        user_id = ctx.user_id,
        priority = %ticket.priority,
        "Ticket created"
    );
    notify_in_background(Arc::clone(&state.workflow), ticket.id);

    Ok((
        StatusCode::CREATED,
        Json(TicketResponse {
            ticket,
            owner,
            assessment,
            messages: None,
        }),
    ))
}

/// GET /tickets. Admins see every ticket with its assessment and full
/// conversation attached; everyone else sees only their own tickets.
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> Result<Json<Vec<TicketResponse>>, ApiError> {
    let tickets = run_db(&state, move |db| {
        if !ctx.is_admin() {
            return db
                .list_tickets(Some(ctx.user_id))?
                .into_iter()
                .map(|row| {
                    let (ticket, owner) = row.into_model()?;
                    Ok(TicketResponse { ticket, owner, assessment: None, messages: None })
                })
                .collect::<anyhow::Result<Vec<_>>>();
        }

        let rows = db.list_tickets(None)?;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();

        let mut assessments: HashMap<i64, AiAssessment> = HashMap::new();
        for row in db.get_assessments_for_tickets(&ids)? {
            let assessment = row.into_model()?;
            assessments.insert(assessment.ticket_id, assessment);
        }

        let mut conversations: HashMap<i64, Vec<Message>> = HashMap::new();
        for row in db.get_messages_for_tickets(&ids, true)? {
            let message = row.into_model()?;
            conversations.entry(message.ticket_id).or_default().push(message);
        }

        rows.into_iter()
            .map(|row| {
                let (ticket, owner) = row.into_model()?;
                Ok(TicketResponse {
                    assessment: assessments.remove(&ticket.id),
                    messages: Some(conversations.remove(&ticket.id).unwrap_or_default()),
                    ticket,
                    owner,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(tickets))
}

/// GET /tickets/{id}
pub async fn show(
    State(state): State<AppState>,
    MaybeContext(ctx): MaybeContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<TicketResponse>, ApiError> {
    let id = positive_id(id, "ticket id")?;
    let include_internal = ctx.is_some_and(|c| c.is_admin());

    let response = run_db(&state, move |db| {
        let Some(row) = db.get_ticket(id)? else {
            return Ok(None);
        };
        let (ticket, owner) = row.into_model()?;
        let assessment = db.get_assessment(id)?.map(|a| a.into_model()).transpose()?;
        let messages = db
            .list_messages(id, include_internal)?
            .into_iter()
            .map(|m| m.into_model())
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Some(TicketResponse {
            ticket,
            owner,
            assessment,
            messages: Some(messages),
        }))
    })
    .await?
    .ok_or(ApiError::NotFound("Ticket"))?;

    Ok(Json(response))
}

/// PATCH /tickets/{id}
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<UpdateTicketRequest>,
) -> Result<Json<UpdateTicketResponse>, ApiError> {
    let id = positive_id(id, "ticket id")?;
    let req = req.validated()?;
    let ctx = ctx.ensure_account(&state).await?;

    let owner = ticket_owner(&state, id).await?;
    if !ctx.may_act_on(owner) {
        return Err(ApiError::Forbidden("You can only update your own tickets"));
    }
    if !ctx.is_admin() && (req.priority.is_some() || req.response.is_some()) {
        return Err(ApiError::Forbidden("Only admins can change priority or response"));
    }

    let status = req.status;
    let ticket = run_db(&state, move |db| {
        db.update_ticket(id, &req, Some(ctx.user_id))?
            .map(|row| row.into_model().map(|(ticket, _)| ticket))
            .transpose()
    })
    .await?
    .ok_or(ApiError::NotFound("Ticket"))?;

    if let Some(status) = status {
        info!(ticket_id = id, user_id = ctx.user_id, %status, "Ticket updated");
    }

    Ok(Json(UpdateTicketResponse { affected: 1, ticket }))
}

/// GET /tickets/{id}/history, newest first. Empty for unknown tickets.
pub async fn history(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<StatusHistoryEntry>>, ApiError> {
    let id = positive_id(id, "ticket id")?;
    let entries = run_db(&state, move |db| {
        db.get_history(id)?
            .into_iter()
            .map(|row| row.into_model())
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;
    Ok(Json(entries))
}

/// GET /tickets/{id}/ai-suggestion
pub async fn ai_suggestion(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let id = positive_id(id, "ticket id")?;
    let suggested_response = run_db(&state, move |db| {
        Ok(db.get_assessment(id)?.and_then(|a| a.suggested_response))
    })
    .await?;
    Ok(Json(SuggestionResponse { suggested_response }))
}

/// DELETE /tickets/{id} removes the ticket with its assessment,
/// conversation and history.
pub async fn remove(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<StatusMessage>, ApiError> {
    let id = positive_id(id, "ticket id")?;
    let ctx = ctx.ensure_account(&state).await?;

    let owner = ticket_owner(&state, id).await?;
    if !ctx.may_act_on(owner) {
        return Err(ApiError::Forbidden("You can only delete your own tickets"));
    }

    let removed = run_db(&state, move |db| db.delete_ticket(id)).await?;
    if !removed {
        return Err(ApiError::NotFound("Ticket"));
    }

    info!(ticket_id = id, user_id = ctx.user_id, "Ticket deleted");
    Ok(Json(StatusMessage {
        message: "Ticket deleted successfully".into(),
    }))
}

/// Owner of an existing ticket; `NotFound` if there is no such ticket.
pub(crate) async fn ticket_owner(state: &AppState, id: i64) -> Result<Option<i64>, ApiError> {
    run_db(state, move |db| Ok(db.get_ticket(id)?.map(|row| row.user_id)))
        .await?
        .ok_or(ApiError::NotFound("Ticket"))
}
