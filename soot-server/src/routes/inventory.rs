//! Project, equipment and catalog endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use chrono::Utc;
use serde::Deserialize;
use soot_core::{SootError, SootResult};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, non_blank, required};
use crate::state::AppState;
use crate::store::catalog::{self, CatalogEntry, CatalogKind};
use crate::store::houses;
use crate::store::inventory::{self, InventoryItem, InventoryKind, NewInventoryItem};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/houses/{house_id}/projects",
            get(list_projects).post(create_project),
        )
        .route("/projects/{id}", delete(delete_project))
        .route(
            "/houses/{house_id}/equipment",
            get(list_equipment).post(create_equipment),
        )
        .route("/equipment/{id}", delete(delete_equipment))
        .route(
            "/houses/{house_id}/catalog/{kind}",
            get(list_catalog).post(create_catalog_entry),
        )
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub zone_id: Option<String>,
}

impl Validate for CreateItemRequest {
    type Output = NewInventoryItem;

    fn validate(self) -> SootResult<NewInventoryItem> {
        Ok(NewInventoryItem {
            name: required(self.name, "Le nom est obligatoire")?,
            description: non_blank(self.description),
            zone_id: non_blank(self.zone_id),
        })
    }
}

async fn list_items(state: &AppState, kind: InventoryKind, house_id: &str, user_id: &str) -> Result<Vec<InventoryItem>, AppError> {
    houses::require_member(&state.pool, house_id, user_id).await?;
    Ok(inventory::list(&state.pool, kind, house_id, Utc::now()).await?)
}

async fn create_item(
    state: &AppState,
    kind: InventoryKind,
    house_id: &str,
    user_id: &str,
    new: NewInventoryItem,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    houses::require_member(&state.pool, house_id, user_id).await?;
    let item = inventory::create(&state.pool, kind, house_id, new).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn delete_item(state: &AppState, kind: InventoryKind, id: &str, user_id: &str) -> Result<StatusCode, AppError> {
    let house_id = inventory::house_of(&state.pool, kind, id)
        .await?
        .ok_or_else(|| SootError::not_found(kind.label()))?;
    houses::require_member(&state.pool, &house_id, user_id).await?;
    inventory::delete(&state.pool, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /houses/{house_id}/projects
async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    Ok(Json(list_items(&state, InventoryKind::Project, &house_id, &user.id).await?))
}

/// POST /houses/{house_id}/projects
async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    create_item(&state, InventoryKind::Project, &house_id, &user.id, new).await
}

/// DELETE /projects/{id}
async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_item(&state, InventoryKind::Project, &id, &user.id).await
}

/// GET /houses/{house_id}/equipment
async fn list_equipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    Ok(Json(list_items(&state, InventoryKind::Equipment, &house_id, &user.id).await?))
}

/// POST /houses/{house_id}/equipment
async fn create_equipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    create_item(&state, InventoryKind::Equipment, &house_id, &user.id, new).await
}

/// DELETE /equipment/{id}
async fn delete_equipment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_item(&state, InventoryKind::Equipment, &id, &user.id).await
}

/// GET /houses/{house_id}/catalog/{kind} - Zones, categories, animals or people
async fn list_catalog(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((house_id, kind)): Path<(String, String)>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let kind: CatalogKind = kind.parse()?;
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(catalog::list(&state.pool, kind, &house_id).await?))
}

#[derive(Deserialize)]
pub struct CreateCatalogEntryRequest {
    pub name: String,
    pub color: Option<String>,
}

pub struct NewCatalogEntry {
    name: String,
    color: Option<String>,
}

impl Validate for CreateCatalogEntryRequest {
    type Output = NewCatalogEntry;

    fn validate(self) -> SootResult<NewCatalogEntry> {
        let color = non_blank(self.color);
        if let Some(color) = &color {
            let hex = color.strip_prefix('#').unwrap_or(color);
            if !(hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())) {
                return Err(SootError::validation("Couleur invalide : format attendu #RRGGBB"));
            }
        }
        Ok(NewCatalogEntry {
            name: required(self.name, "Le nom est obligatoire")?,
            color,
        })
    }
}

/// POST /houses/{house_id}/catalog/{kind}
async fn create_catalog_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((house_id, kind)): Path<(String, String)>,
    ValidJson(new): ValidJson<CreateCatalogEntryRequest>,
) -> Result<(StatusCode, Json<CatalogEntry>), AppError> {
    let kind: CatalogKind = kind.parse()?;
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    let entry = catalog::create(&state.pool, kind, &house_id, &new.name, new.color.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}
