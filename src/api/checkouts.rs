//! Checkout endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        checkout::{
            CheckoutDetails, CheckoutQuery, CheckoutStats, CheckoutStatus, CreateCheckout,
            UpdateCheckout,
        },
        CheckoutPage, Page,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Result of an overdue sweep
#[derive(Serialize, ToSchema)]
pub struct OverdueSweepResponse {
    pub message: String,
    /// Number of checkouts moved to "En retard"
    pub updated_count: u64,
}

/// List checkouts
#[utoipa::path(
    get,
    path = "/checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(CheckoutQuery),
    responses(
        (status = 200, description = "Paginated checkouts", body = CheckoutPage),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_checkouts(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Query(query): Query<CheckoutQuery>,
) -> AppResult<Json<Page<CheckoutDetails>>> {
    let page = state.services.checkouts.list(&actor, query).await?;
    Ok(Json(page))
}

/// Get checkout by ID
#[utoipa::path(
    get,
    path = "/checkouts/{id}",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Checkout ID")
    ),
    responses(
        (status = 200, description = "Checkout details", body = CheckoutDetails),
        (status = 403, description = "Checkout belongs to another borrower"),
        (status = 404, description = "Checkout not found")
    )
)]
pub async fn get_checkout(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<CheckoutDetails>> {
    let checkout = state.services.checkouts.get(&actor, id).await?;
    Ok(Json(checkout))
}

/// Lend equipment to a borrower
#[utoipa::path(
    post,
    path = "/checkouts",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    request_body = CreateCheckout,
    responses(
        (status = 201, description = "Checkout created", body = CheckoutDetails),
        (status = 403, description = "Insufficient rights"),
        (status = 422, description = "Invalid input or equipment not available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Json(request): Json<CreateCheckout>,
) -> AppResult<(StatusCode, Json<CheckoutDetails>)> {
    let created = state.services.checkouts.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a checkout (including returning it)
#[utoipa::path(
    put,
    path = "/checkouts/{id}",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Checkout ID")
    ),
    request_body = UpdateCheckout,
    responses(
        (status = 200, description = "Checkout updated", body = CheckoutDetails),
        (status = 403, description = "Insufficient rights"),
        (status = 404, description = "Checkout not found"),
        (status = 422, description = "Invalid input or transition", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_checkout(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(patch): Json<UpdateCheckout>,
) -> AppResult<Json<CheckoutDetails>> {
    let updated = state.services.checkouts.update(&actor, id, patch).await?;
    Ok(Json(updated))
}

/// Delete a checkout
#[utoipa::path(
    delete,
    path = "/checkouts/{id}",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Checkout ID")
    ),
    responses(
        (status = 204, description = "Checkout deleted"),
        (status = 403, description = "Insufficient rights"),
        (status = 404, description = "Checkout not found")
    )
)]
pub async fn delete_checkout(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.checkouts.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List checkout statuses
#[utoipa::path(
    get,
    path = "/checkouts/statuses",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All checkout statuses", body = Vec<CheckoutStatus>)
    )
)]
pub async fn list_statuses(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> AppResult<Json<Vec<CheckoutStatus>>> {
    Ok(Json(state.services.checkouts.statuses(&actor)?))
}

/// Mark every open checkout past its due date as overdue
#[utoipa::path(
    post,
    path = "/checkouts/update-overdue",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = OverdueSweepResponse),
        (status = 403, description = "Insufficient rights")
    )
)]
pub async fn update_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> AppResult<Json<OverdueSweepResponse>> {
    let updated_count = state.services.checkouts.run_overdue_sweep(&actor).await?;
    Ok(Json(OverdueSweepResponse {
        message: format!("{} checkout(s) marked as overdue", updated_count),
        updated_count,
    }))
}

/// Checkout counters for the dashboard
#[utoipa::path(
    get,
    path = "/checkouts/stats",
    tag = "checkouts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Checkout counters", body = CheckoutStats)
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> AppResult<Json<CheckoutStats>> {
    let stats = state.services.checkouts.stats(&actor).await?;
    Ok(Json(stats))
}
