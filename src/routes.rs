use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::accounts::{AccountService, SessionStore};
use crate::error::ApiError;
use crate::lifecycle::PlantService;
use crate::models::{CreatePlantRequest, PlantListResponse, PlantView};
use crate::user_models::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};

pub struct AppState {
    pub plants: PlantService,
    pub accounts: AccountService,
    pub sessions: SessionStore,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(register))
        .route("/sessions", post(login).delete(logout))
        .route("/plants", get(list_plants).post(create_plant))
        .route("/plants/:id", delete(delete_plant))
        .route("/plants/:id/water", post(water_plant))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The logged-in user, resolved from `Authorization: Bearer <token>`.
pub struct CurrentUser {
    pub user_id: String,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Login required".to_string()))?;

        let user_id = state
            .sessions
            .resolve(token)
            .await
            .ok_or_else(|| ApiError::Unauthorized("Session expired, please log in again".to_string()))?;

        Ok(Self {
            user_id,
            token: token.to_string(),
        })
    }
}

/// `Json` body whose rejections come back as the usual error body.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .accounts
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.accounts.authenticate(&payload.login, &payload.password).await?;
    let token = state.sessions.create(&user.id).await;
    tracing::debug!(user_id = %user.id, "Session created");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

async fn logout(State(state): State<Arc<AppState>>, current: CurrentUser) -> StatusCode {
    state.sessions.revoke(&current.token).await;
    StatusCode::NO_CONTENT
}

async fn list_plants(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<PlantListResponse>, ApiError> {
    let plants = state.plants.list_plants(&current.user_id).await?;
    Ok(Json(PlantListResponse { plants }))
}

async fn create_plant(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    AppJson(payload): AppJson<CreatePlantRequest>,
) -> Result<(StatusCode, Json<PlantView>), ApiError> {
    let plant = state
        .plants
        .create_plant(
            &current.user_id,
            &payload.name,
            payload.days_between_watering,
            payload.last_watered.unwrap_or_else(today),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(plant)))
}

async fn water_plant(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(plant_id): Path<String>,
) -> Result<Json<PlantView>, ApiError> {
    let plant = state
        .plants
        .water_plant(&current.user_id, &plant_id, today())
        .await?;
    Ok(Json(plant))
}

async fn delete_plant(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(plant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.plants.delete_plant(&current.user_id, &plant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
