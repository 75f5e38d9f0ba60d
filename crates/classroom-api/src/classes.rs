use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use classroom_db::CreateChannelOutcome;
use classroom_types::api::MemberResponse;
use classroom_types::{Channel, ChannelMember, NewChannel, Role};

use crate::{ApiError, AppState, with_db};

/// GET /classes
pub async fn list_classes(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    let channels = with_db(&state, |db| db.list_channels()).await?;
    Ok(Json(channels))
}

/// POST /classes — create a class and its memberships atomically.
///
/// The stored `class_id` is assigned here, not taken from the payload.
pub async fn create_class(
    State(state): State<AppState>,
    Json(req): Json<NewChannel>,
) -> Result<impl IntoResponse, ApiError> {
    if req.display_name.trim().is_empty() {
        return Err(ApiError::BadRequest("className must not be blank".into()));
    }

    let name = req.display_name.clone();
    let outcome = with_db(&state, move |db| db.create_channel(&req)).await?;

    match outcome {
        CreateChannelOutcome::Created(channel) => {
            info!("Class '{}' created as class_id {}", channel.display_name, channel.sequence_id);
            Ok((StatusCode::CREATED, Json(channel)))
        }
        CreateChannelOutcome::DuplicateName => {
            warn!("Rejected duplicate class name '{}'", name);
            Err(ApiError::DuplicateName(name))
        }
        CreateChannelOutcome::UnknownEmail(email) => {
            Err(ApiError::Unprocessable(format!("no user with email {}", email)))
        }
        CreateChannelOutcome::RoleMismatch {
            email,
            expected,
            actual,
        } => Err(ApiError::Unprocessable(format!(
            "{} is a {}, not a {}",
            email, actual, expected
        ))),
    }
}

/// GET /classes/{class_id}/members
pub async fn class_members(
    State(state): State<AppState>,
    Path(class_id): Path<i64>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let rows = with_db(&state, move |db| db.channel_members(class_id))
        .await?
        .ok_or(ApiError::NotFound("class"))?;

    let members = rows
        .into_iter()
        .map(|row| -> Result<MemberResponse, ApiError> {
            let role = row.role.parse::<Role>().map_err(anyhow::Error::from)?;
            Ok(MemberResponse {
                member: ChannelMember {
                    channel_id: class_id,
                    user_id: row.user_id,
                    role,
                },
                email: row.email,
                name: row.name,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(members))
}
