use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::auth::current_identity;
use crate::engine::NewPickup;
use crate::error::{AppError, EngineError};
use crate::models::pickup::{PickupItem, PickupRequest};
use crate::models::user::Role;
use crate::state::AppState;
use crate::views;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pickups", post(create_pickup).get(list_pickups))
        .route("/pickups/recent", get(recent_pickups))
        .route("/pickups/:id", get(get_pickup))
        .route("/pickups/:id/accept", post(accept_pickup))
        .route("/pickups/:id/start", post(start_pickup))
        .route("/pickups/:id/items", post(submit_items))
        .route("/pickups/:id/approve", post(approve_pickup))
        .route("/dashboard", get(dashboard))
}

#[derive(Deserialize)]
pub struct CreatePickupRequest {
    pub address: String,
    #[serde(default)]
    pub map_link: Option<String>,
    pub pickup_date: NaiveDate,
    pub time_slot: String,
}

async fn create_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreatePickupRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let actor = current_identity(&state, &headers)?;
    let record = state.engine.create(
        &actor,
        NewPickup {
            address: payload.address,
            map_link: payload.map_link,
            pickup_date: payload.pickup_date,
            time_slot: payload.time_slot,
        },
    )?;
    Ok(Json(record))
}

/// Customers get their own pickups; partners get the actionable set.
async fn list_pickups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let actor = current_identity(&state, &headers)?;
    let pickups = match actor.role {
        Role::Customer => views::for_customer(&state.store, actor.id),
        Role::Partner => views::for_partner(&state.store, actor.id),
    };
    Ok(Json(pickups))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

async fn recent_pickups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<PickupRequest>>, AppError> {
    let actor = current_identity(&state, &headers)?;
    if actor.role != Role::Customer {
        return Err(EngineError::Unauthorized.into());
    }

    let limit = query.limit.unwrap_or(state.recent_limit);
    Ok(Json(views::recent_for_customer(
        &state.store,
        actor.id,
        limit,
    )))
}

async fn get_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    current_identity(&state, &headers)?;
    let pickup = state.store.get(id).ok_or(EngineError::NotFound(id))?;
    Ok(Json(pickup))
}

async fn accept_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let actor = current_identity(&state, &headers)?;
    Ok(Json(state.engine.accept(&actor, id)?))
}

#[derive(Deserialize)]
pub struct StartPickupRequest {
    pub code: String,
}

async fn start_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<StartPickupRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let actor = current_identity(&state, &headers)?;
    Ok(Json(state.engine.start(&actor, id, &payload.code)?))
}

#[derive(Deserialize)]
pub struct PickupItemInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl PickupItemInput {
    fn into_item(self) -> PickupItem {
        PickupItem {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name: self.name,
            quantity: self.quantity,
            price: self.price,
        }
    }
}

#[derive(Deserialize)]
pub struct SubmitItemsRequest {
    pub items: Vec<PickupItemInput>,
    pub total_amount: f64,
}

async fn submit_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitItemsRequest>,
) -> Result<Json<PickupRequest>, AppError> {
    let actor = current_identity(&state, &headers)?;
    let items = payload
        .items
        .into_iter()
        .map(PickupItemInput::into_item)
        .collect();
    Ok(Json(state.engine.submit_items(
        &actor,
        id,
        items,
        payload.total_amount,
    )?))
}

async fn approve_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PickupRequest>, AppError> {
    let actor = current_identity(&state, &headers)?;
    Ok(Json(state.engine.approve(&actor, id)?))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<views::PartnerDashboard>, AppError> {
    let actor = current_identity(&state, &headers)?;
    if actor.role != Role::Partner {
        return Err(EngineError::Unauthorized.into());
    }
    Ok(Json(views::partner_dashboard(&state.store, actor.id)))
}
