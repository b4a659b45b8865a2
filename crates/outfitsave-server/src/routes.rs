//! HTTP handlers for outfits and share links.

use std::time::Instant;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, MatchedPath, Path, Request, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use outfitsave_core::slug::is_valid_slug;
use outfitsave_core::{share_url, NewOutfit, Outfit, OutfitId, OutfitItem, OutfitSaveError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::AppState;

/// Header the fronting auth layer sets to the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, taken from [`USER_ID_HEADER`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CurrentUser(v.to_string()))
            .ok_or(ApiError(OutfitSaveError::Unauthorized))
    }
}

/// Body of `POST /api/outfits`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutfitRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub items: Vec<OutfitItem>,
}

/// Body returned by `POST /api/outfits/:id/share`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_slug: String,
    pub share_url: String,
}

/// `POST /api/outfits`
///
/// Malformed or incomplete bodies are rejected with 400 and the usual JSON
/// error body.
pub(crate) async fn create_outfit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    body: Result<Json<CreateOutfitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Outfit>), ApiError> {
    let Json(body) =
        body.map_err(|rejection| OutfitSaveError::InvalidInput(rejection.body_text()))?;

    let new = NewOutfit {
        owner_id: user_id,
        name: body.name.trim().to_string(),
        description: body.description,
        image_url: body.image_url,
        is_public: body.is_public,
        items: body.items,
    };
    new.validate()?;

    let outfit = state.store.create(new).await?;
    debug!(outfit = %outfit.id, owner = %outfit.owner_id, "created outfit");
    Ok((StatusCode::CREATED, Json(outfit)))
}

/// `GET /api/outfits/:id`
///
/// Private outfits are only visible to their owner; everyone else gets 404.
pub(crate) async fn get_outfit(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Outfit>, ApiError> {
    let id = OutfitId::from(id);
    let viewer = user.as_ref().map(|u| u.0.as_str());

    match state.store.get(&id).await? {
        Some(outfit) if outfit.is_visible_to(viewer) => Ok(Json(outfit)),
        _ => Err(OutfitSaveError::not_found(id.as_str()).into()),
    }
}

/// `POST /api/outfits/:id/share`
///
/// Owner only. Returns the outfit's share slug and public URL, assigning a
/// slug on first use.
pub(crate) async fn share_outfit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ShareResponse>, ApiError> {
    let id = OutfitId::from(id);

    let outfit = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| OutfitSaveError::not_found(id.as_str()))?;

    if !outfit.is_owned_by(&user_id) {
        return Err(OutfitSaveError::Forbidden(format!(
            "outfit '{}' belongs to another user",
            id
        ))
        .into());
    }

    let share_slug = state.allocator.ensure_share_slug(&id).await?;
    let share_url = share_url(&state.links.base_url, &state.links.path_prefix, &share_slug);

    info!(outfit = %id, slug = %share_slug, "share link ready");
    Ok(Json(ShareResponse {
        share_slug,
        share_url,
    }))
}

/// `GET /api/share/:slug`
pub(crate) async fn get_shared_outfit(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Outfit>, ApiError> {
    if !is_valid_slug(&slug) {
        return Err(OutfitSaveError::not_found(slug).into());
    }

    state
        .store
        .find_by_share_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| OutfitSaveError::not_found(slug).into())
}

/// `GET /healthz`
pub(crate) async fn healthz() -> &'static str {
    "ok"
}

/// Middleware recording one request metric per matched route.
///
/// Installed with `route_layer`, so only requests that hit a route get here.
pub(crate) async fn track_requests(
    State(state): State<AppState>,
    matched: MatchedPath,
    req: Request,
    next: Next,
) -> Response {
    let route = matched.as_str().to_string();
    let method = req.method().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    state.metrics.record_request(&route, status);
    debug!(
        %method,
        route = %route,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request finished"
    );
    response
}

/// `GET /metrics`
///
/// Prometheus text exposition when the `prometheus` feature is enabled and
/// metrics are not disabled in configuration; 501 otherwise.
#[cfg_attr(not(feature = "prometheus"), allow(unused_variables))]
pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    #[cfg(feature = "prometheus")]
    {
        if let Some(prometheus) = state.prometheus.as_ref() {
            return match prometheus.render() {
                Ok((content_type, body)) => {
                    (StatusCode::OK, [("Content-Type", content_type)], body).into_response()
                }
                Err(err) => {
                    tracing::error!("outfitsave-server: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "failed to encode metrics\n",
                    )
                        .into_response()
                }
            };
        }
    }

    (
        StatusCode::NOT_IMPLEMENTED,
        [("Content-Type", "text/plain; charset=utf-8")],
        "Prometheus metrics not enabled\n",
    )
        .into_response()
}
