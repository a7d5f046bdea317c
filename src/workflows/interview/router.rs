use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::domain::SlotPatch;
use super::repository::{BookingStore, SlotStore, StoreError};
use super::service::{InterviewError, InterviewService};
use crate::api::{ApiResponse, RequestContext};
use crate::workflows::clients::OrgDirectory;
use crate::workflows::ids::{AppId, OrgId, SlotId, UserId};

/// State shared by the interview endpoints. Org-scoped operations resolve
/// the caller's organization through the org directory before anything else.
pub struct InterviewRouterState<S, B> {
    pub service: Arc<InterviewService<S, B>>,
    pub orgs: Arc<dyn OrgDirectory>,
}

impl<S, B> Clone for InterviewRouterState<S, B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            orgs: self.orgs.clone(),
        }
    }
}

/// Route table for slot scheduling and the interview booking lifecycle.
pub fn interview_router<S, B>(state: InterviewRouterState<S, B>) -> Router
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    Router::new()
        .route(
            "/interview/adoptions/:id/interview/request",
            post(request_interview::<S, B>),
        )
        .route(
            "/interview/adoptions/:id/interview",
            get(booking_detail::<S, B>),
        )
        .route(
            "/interview/adoptions/:id/interview/confirm",
            post(confirm_interview::<S, B>),
        )
        .route(
            "/interview/adoptions/:id/interview/complete",
            post(complete_interview::<S, B>),
        )
        .route("/interview/adoptions/:id/slots", get(available_slots::<S, B>))
        .route("/interview/bookings", get(org_bookings::<S, B>))
        .route(
            "/interview/slots",
            get(list_slots::<S, B>).post(create_slot::<S, B>),
        )
        .route(
            "/interview/slots/:id",
            put(update_slot::<S, B>).delete(delete_slot::<S, B>),
        )
        .with_state(state)
}

fn interview_error(err: &InterviewError) -> Response {
    let code = match err {
        InterviewError::SlotNotFound
        | InterviewError::BookingNotFound
        | InterviewError::ApplicationNotFound => 404,
        InterviewError::Forbidden => 403,
        InterviewError::AlreadyBooked => 409,
        InterviewError::SlotClosed
        | InterviewError::InvalidTransition { .. }
        | InterviewError::Validation(_) => 400,
        InterviewError::Upstream(_) => 502,
        InterviewError::Store(StoreError::NotFound) => 404,
        InterviewError::Store(_) => 500,
    };
    ApiResponse::<()>::error(code, err.to_string()).into_response()
}

fn resolve_org(orgs: &Arc<dyn OrgDirectory>, user: UserId) -> Result<OrgId, Response> {
    match orgs.primary_org(user) {
        Ok(Some(org)) => Ok(org),
        Ok(None) => Err(ApiResponse::<()>::error(
            403,
            "caller does not belong to any organization",
        )
        .into_response()),
        Err(err) => Err(
            ApiResponse::<()>::error(502, format!("org directory unavailable: {err}"))
                .into_response(),
        ),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestInterviewBody {
    slot_id: Option<SlotId>,
}

async fn request_interview<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    _context: RequestContext,
    Path(app_id): Path<i64>,
    Json(body): Json<RequestInterviewBody>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let Some(slot_id) = body.slot_id else {
        return ApiResponse::<()>::error(400, "an interview slot must be selected")
            .into_response();
    };

    match state.service.request(AppId(app_id), slot_id) {
        Ok(booking) => ApiResponse::success(booking).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn booking_detail<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Path(app_id): Path<i64>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    if let Err(rejection) = resolve_org(&state.orgs, context.user_id) {
        return rejection;
    }
    match state.service.booking_for_application(AppId(app_id)) {
        Ok(detail) => ApiResponse::success(detail).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn confirm_interview<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Path(app_id): Path<i64>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    if let Err(rejection) = resolve_org(&state.orgs, context.user_id) {
        return rejection;
    }
    match state.service.confirm(AppId(app_id)) {
        Ok(booking) => ApiResponse::success(booking).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn complete_interview<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Path(app_id): Path<i64>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    if let Err(rejection) = resolve_org(&state.orgs, context.user_id) {
        return rejection;
    }
    match state.service.complete(AppId(app_id)) {
        Ok(booking) => ApiResponse::success(booking).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn available_slots<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    _context: RequestContext,
    Path(app_id): Path<i64>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    match state.service.available_slots_for_application(AppId(app_id)) {
        Ok(slots) => ApiResponse::success(slots).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn org_bookings<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.bookings_for_org(org) {
        Ok(bookings) => ApiResponse::success(bookings).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn list_slots<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.slots_for_org(org) {
        Ok(slots) => ApiResponse::success(slots).into_response(),
        Err(err) => interview_error(&err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSlotBody {
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    is_open: Option<bool>,
}

async fn create_slot<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Json(body): Json<CreateSlotBody>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state
        .service
        .create_slot(org, body.start_at, body.end_at, body.is_open)
    {
        Ok(slot) => ApiResponse::success(slot).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn update_slot<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Path(slot_id): Path<i64>,
    Json(patch): Json<SlotPatch>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.update_slot(org, SlotId(slot_id), patch) {
        Ok(slot) => ApiResponse::success(slot).into_response(),
        Err(err) => interview_error(&err),
    }
}

async fn delete_slot<S, B>(
    State(state): State<InterviewRouterState<S, B>>,
    context: RequestContext,
    Path(slot_id): Path<i64>,
) -> Response
where
    S: SlotStore + 'static,
    B: BookingStore + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.delete_slot(org, SlotId(slot_id)) {
        Ok(()) => ApiResponse::success("slot deleted").into_response(),
        Err(err) => interview_error(&err),
    }
}
