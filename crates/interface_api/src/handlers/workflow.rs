//! Sanction workflow handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::SanctionRequestId;
use domain_workflow::{
    ProcessCommand, ProcessOutcome, RequestDetail, ReviewerRef, RoleName, WorkflowStep,
};

use crate::dto::workflow::*;
use crate::{error::ApiError, AppState};

fn request_id(raw: &str) -> Result<SanctionRequestId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a sanction request id", raw)))
}

fn summaries(state: &AppState, requests: Vec<domain_workflow::SanctionRequest>) -> Vec<RequestSummary> {
    requests
        .into_iter()
        .map(|r| RequestSummary::new(r, state.engine.registry()))
        .collect()
}

/// Lists the configured workflow steps in order
pub async fn list_steps(State(state): State<AppState>) -> Json<Vec<WorkflowStep>> {
    Json(state.engine.registry().steps().to_vec())
}

/// Opens a sanction request for a submitted claim
pub async fn submit_claim(
    State(state): State<AppState>,
    Json(body): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<RequestSummary>), ApiError> {
    let request = state.engine.submit_claim(body.claim_ref).await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestSummary::new(request, state.engine.registry())),
    ))
}

/// The caller's work queue
pub async fn pending_queue(
    State(state): State<AppState>,
    Extension(actor): Extension<ReviewerRef>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    let requests = state.engine.pending_for_actor(&actor).await?;
    Ok(Json(summaries(&state, requests)))
}

/// Every open request, for the allocation dashboard
///
/// Only the allocator role may list it.
pub async fn open_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<ReviewerRef>,
) -> Result<Json<Vec<RequestSummary>>, ApiError> {
    if !actor.has_role(state.engine.allocator_role()) {
        return Err(ApiError::Forbidden(format!(
            "role {} may not view the allocation dashboard",
            actor.role
        )));
    }
    let requests = state.engine.open_requests().await?;
    Ok(Json(summaries(&state, requests)))
}

/// Full reviewer view of one request
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RequestDetail>, ApiError> {
    let detail = state.engine.get_request_detail(request_id(&id)?).await?;
    Ok(Json(detail))
}

/// Applies a reviewer action
pub async fn process_action(
    State(state): State<AppState>,
    Extension(actor): Extension<ReviewerRef>,
    Path(id): Path<String>,
    Json(body): Json<ProcessActionRequest>,
) -> Result<Json<ProcessOutcome>, ApiError> {
    body.validate()?;

    let mut command = ProcessCommand::new(request_id(&id)?, actor, body.action)
        .with_comments(body.comments.unwrap_or_default());
    if let Some(amount) = body.stated_amount {
        command = command.with_amount(amount);
    }
    for update in body.item_updates {
        command = command.with_item_update(update);
    }

    let outcome = state.engine.process_request(command).await?;
    Ok(Json(outcome))
}

/// Assigns a request to a reviewer
pub async fn allocate(
    State(state): State<AppState>,
    Extension(admin): Extension<ReviewerRef>,
    Path(id): Path<String>,
    Json(body): Json<AllocateRequest>,
) -> Result<Json<AllocationResponse>, ApiError> {
    body.validate()?;
    let assignee = ReviewerRef::new(body.assignee_id, RoleName::new(body.assignee_role));

    let allocation = state.engine.allocate(request_id(&id)?, &assignee, &admin).await?;
    Ok(Json(AllocationResponse {
        request: RequestSummary::new(allocation.request, state.engine.registry()),
        entry: allocation.entry,
    }))
}
