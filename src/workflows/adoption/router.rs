use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::repository::{AdoptionRepository, RepositoryError};
use super::service::{AdoptionError, AdoptionService};
use crate::api::{ApiResponse, RequestContext};
use crate::workflows::adoption::domain::AdoptionStatus;
use crate::workflows::clients::OrgDirectory;
use crate::workflows::ids::{AppId, OrgId, PetId, Role, UserId};

/// State shared by the adoption endpoints.
pub struct AdoptionRouterState<R> {
    pub service: Arc<AdoptionService<R>>,
    pub orgs: Arc<dyn OrgDirectory>,
}

impl<R> Clone for AdoptionRouterState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            orgs: self.orgs.clone(),
        }
    }
}

/// Route table for the adoption application lifecycle.
pub fn adoption_router<R>(state: AdoptionRouterState<R>) -> Router
where
    R: AdoptionRepository + 'static,
{
    Router::new()
        .route("/adoptions", post(submit::<R>))
        .route("/adoptions/me/adoptions", get(my_applications::<R>))
        .route("/adoptions/org/adoptions", get(org_queue::<R>))
        .route("/adoptions/:id", get(application_detail::<R>))
        .route("/adoptions/:id/approve", post(org_approve::<R>))
        .route("/adoptions/:id/reject", post(org_reject::<R>))
        .route("/adoptions/:id/platform-approve", post(platform_approve::<R>))
        .route("/adoptions/:id/platform-reject", post(platform_reject::<R>))
        .route("/adoptions/:id/handover/complete", post(complete_handover::<R>))
        .with_state(state)
}

fn adoption_error(err: &AdoptionError) -> Response {
    let code = match err {
        AdoptionError::NotFound => 404,
        AdoptionError::Forbidden => 403,
        AdoptionError::DuplicatePending => 409,
        AdoptionError::InvalidTransition { .. }
        | AdoptionError::InterviewUnfinished
        | AdoptionError::Validation(_) => 400,
        AdoptionError::Upstream(_) => 502,
        AdoptionError::Repository(RepositoryError::NotFound) => 404,
        AdoptionError::Repository(_) => 500,
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

fn require_platform_reviewer(context: &RequestContext) -> Result<(), Response> {
    if context.has_role(Role::Auditor) || context.has_role(Role::Admin) {
        Ok(())
    } else {
        Err(
            ApiResponse::<()>::error(403, "caller is not a platform reviewer")
                .into_response(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody {
    pet_id: PetId,
    org_id: OrgId,
}

async fn submit<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Json(body): Json<SubmitBody>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    match state
        .service
        .submit(body.pet_id, context.user_id, body.org_id)
    {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn my_applications<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    match state.service.my_applications(context.user_id) {
        Ok(applications) => ApiResponse::success(applications).into_response(),
        Err(err) => adoption_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct OrgQueueQuery {
    status: Option<String>,
}

async fn org_queue<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Query(query): Query<OrgQueueQuery>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };

    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match AdoptionStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return ApiResponse::<()>::error(400, format!("unknown status '{raw}'"))
                    .into_response()
            }
        },
    };

    match state.service.applications_for_org(org, status) {
        Ok(applications) => ApiResponse::success(applications).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn application_detail<R>(
    State(state): State<AdoptionRouterState<R>>,
    _context: RequestContext,
    Path(id): Path<i64>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    match state.service.application(AppId(id)) {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn org_approve<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Path(id): Path<i64>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.review_by_org(AppId(id), org, true, None) {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

#[derive(Debug, Deserialize)]
struct RejectBody {
    reason: Option<String>,
}

async fn org_reject<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Path(id): Path<i64>,
    Json(body): Json<RejectBody>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state
        .service
        .review_by_org(AppId(id), org, false, body.reason.as_deref())
    {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn platform_approve<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Path(id): Path<i64>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    if let Err(rejection) = require_platform_reviewer(&context) {
        return rejection;
    }
    match state.service.review_by_platform(AppId(id), true, None) {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn platform_reject<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Path(id): Path<i64>,
    Json(body): Json<RejectBody>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    if let Err(rejection) = require_platform_reviewer(&context) {
        return rejection;
    }
    match state
        .service
        .review_by_platform(AppId(id), false, body.reason.as_deref())
    {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}

async fn complete_handover<R>(
    State(state): State<AdoptionRouterState<R>>,
    context: RequestContext,
    Path(id): Path<i64>,
) -> Response
where
    R: AdoptionRepository + 'static,
{
    let org = match resolve_org(&state.orgs, context.user_id) {
        Ok(org) => org,
        Err(rejection) => return rejection,
    };
    match state.service.complete_handover(AppId(id), org) {
        Ok(application) => ApiResponse::success(application).into_response(),
        Err(err) => adoption_error(&err),
    }
}
