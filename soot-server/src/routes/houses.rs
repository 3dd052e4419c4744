//! House and membership endpoints

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use soot_core::{SootError, SootResult};

use crate::auth::CurrentUser;
use crate::routes::{AppError, Validate, ValidJson, required};
use crate::state::AppState;
use crate::store::accounts;
use crate::store::houses::{self, House, HouseMember, HouseRole};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/houses", get(list_houses).post(create_house))
        .route("/houses/{house_id}/members", get(list_members).post(add_member))
}

/// GET /houses - Houses the caller belongs to
async fn list_houses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<House>>, AppError> {
    Ok(Json(houses::list_for_user(&state.pool, &user.id).await?))
}

#[derive(Deserialize)]
pub struct CreateHouseRequest {
    pub name: String,
}

impl Validate for CreateHouseRequest {
    type Output = String;

    fn validate(self) -> SootResult<String> {
        required(self.name, "Le nom de la maison est obligatoire")
    }
}

/// POST /houses - Create a house owned by the caller
async fn create_house(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidJson(name): ValidJson<CreateHouseRequest>,
) -> Result<(StatusCode, Json<House>), AppError> {
    let house = houses::create(&state.pool, &name, &user).await?;
    Ok((StatusCode::CREATED, Json(house)))
}

/// GET /houses/{house_id}/members
async fn list_members(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
) -> Result<Json<Vec<HouseMember>>, AppError> {
    houses::require_member(&state.pool, &house_id, &user.id).await?;
    Ok(Json(houses::list_members(&state.pool, &house_id).await?))
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<HouseRole>,
}

pub struct NewMember {
    email: String,
    name: Option<String>,
    role: HouseRole,
}

impl Validate for AddMemberRequest {
    type Output = NewMember;

    fn validate(self) -> SootResult<NewMember> {
        let email = required(self.email, "L'adresse e-mail est obligatoire")?;
        if !email.contains('@') {
            return Err(SootError::validation("Adresse e-mail invalide"));
        }
        if self.role == Some(HouseRole::Owner) {
            return Err(SootError::validation("Une maison n'a qu'un seul propriétaire"));
        }
        Ok(NewMember {
            email,
            name: self.name,
            role: self.role.unwrap_or(HouseRole::Member),
        })
    }
}

/// POST /houses/{house_id}/members - Invite a user by email (owners and admins)
async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(house_id): Path<String>,
    ValidJson(new): ValidJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<HouseMember>), AppError> {
    let caller = houses::require_member(&state.pool, &house_id, &user.id).await?;
    if !caller.role.can_manage_members() {
        return Err(SootError::AccessDenied.into());
    }

    let invited = accounts::find_or_create(&state.pool, &new.email, new.name.as_deref()).await?;
    let member = houses::add_member(&state.pool, &house_id, &invited, new.role).await?;
    Ok((StatusCode::CREATED, Json(member)))
}
