//! Route handlers for the drinks catalog
//!
//! The public drink list is unauthenticated and returns the short recipe
//! view. Every other route authorizes the request before anything else,
//! including body parsing, so a bad body never changes an auth failure's
//! response. Handlers receive the verified claims from the gate.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use taproom::{Authority, Claims, Permission};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::drink::{DrinkStore, Ingredient};
use crate::error::ApiError;

/// Shared state handed to every route handler
#[derive(Clone, Debug)]
pub struct AppState {
    /// Verifies bearer tokens and permission grants
    pub authority: Authority,
    /// The drinks catalog
    pub store: DrinkStore,
}

/// Builds the application router over the given state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/drinks", get(list_drinks).post(create_drink))
        .route("/drinks-detail", get(list_drinks_detail))
        .route(
            "/drinks/:id",
            axum::routing::patch(update_drink).delete(delete_drink),
        )
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION)?.to_str().ok()
}

async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    required: &'static str,
) -> Result<Claims, ApiError> {
    let required = Permission::from_static(required);
    let claims = state
        .authority
        .authorize(bearer(headers), Some(&required))
        .await?;
    Ok(claims)
}

/// Parses a request body only after the request has been authorized.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::Unprocessable)
}

fn parse_drink_id(id: &str) -> Result<i64, ApiError> {
    // Mirrors route matching: a non-numeric id is an unknown resource.
    id.parse().map_err(|_| ApiError::NotFound)
}

async fn fallback() -> ApiError {
    ApiError::NotFound
}

/// A recipe submitted as either a single ingredient or a list of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeDraft {
    One(Ingredient),
    Many(Vec<Ingredient>),
}

impl RecipeDraft {
    fn into_vec(self) -> Vec<Ingredient> {
        match self {
            Self::One(ingredient) => vec![ingredient],
            Self::Many(ingredients) => ingredients,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewDrink {
    title: String,
    recipe: RecipeDraft,
}

#[derive(Debug, Deserialize)]
struct DrinkPatch {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    recipe: Option<RecipeDraft>,
}

async fn list_drinks(State(state): State<AppState>) -> Json<Value> {
    let drinks: Vec<_> = state
        .store
        .list()
        .await
        .iter()
        .map(crate::drink::Drink::summary)
        .collect();

    Json(json!({ "success": true, "drinks": drinks }))
}

async fn list_drinks_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let claims = authorize(&state, &headers, "get:drinks-detail").await?;
    tracing::debug!(sub = ?claims.sub(), "serving drink details");

    let drinks = state.store.list().await;
    Ok(Json(json!({ "success": true, "drinks": drinks })))
}

async fn create_drink(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let claims = authorize(&state, &headers, "post:drinks").await?;
    let new_drink: NewDrink = parse_body(&body)?;

    let drink = state
        .store
        .create(new_drink.title, new_drink.recipe.into_vec())
        .await
        .ok_or(ApiError::Unprocessable)?;

    tracing::info!(drink.id, sub = ?claims.sub(), "created drink");
    Ok(Json(json!({ "success": true, "drinks": [drink] })))
}

async fn update_drink(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let id = parse_drink_id(&id)?;
    let claims = authorize(&state, &headers, "patch:drinks").await?;
    let patch: DrinkPatch = parse_body(&body)?;

    if patch.title.is_none() && patch.recipe.is_none() {
        return Err(ApiError::Unprocessable);
    }

    let drink = state
        .store
        .update(id, patch.title, patch.recipe.map(RecipeDraft::into_vec))
        .await
        .ok_or(ApiError::NotFound)?;

    tracing::info!(drink.id = id, sub = ?claims.sub(), "updated drink");
    Ok(Json(json!({ "success": true, "drinks": [drink] })))
}

async fn delete_drink(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let id = parse_drink_id(&id)?;
    let claims = authorize(&state, &headers, "delete:drinks").await?;

    let id = state.store.delete(id).await.ok_or(ApiError::NotFound)?;

    tracing::info!(drink.id = id, sub = ?claims.sub(), "deleted drink");
    Ok(Json(json!({ "success": true, "delete": id })))
}
