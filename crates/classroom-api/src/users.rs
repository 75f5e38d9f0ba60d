use axum::{
    Json,
    extract::{Path, Query, State},
};

use classroom_types::User;
use classroom_types::api::UserSearchQuery;

use crate::{ApiError, AppState, with_db};

/// GET /users?search=term — users whose email contains the term.
pub async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = with_db(&state, move |db| {
        db.search_users(&query.search)?
            .into_iter()
            .map(|row| row.into_user())
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(users))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = with_db(&state, move |db| db.get_user(id)?.map(|row| row.into_user()).transpose())
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(user))
}
