pub mod classes;
pub mod error;
pub mod users;

use std::sync::Arc;

use axum::{Router, routing::get};
use tracing::error;

use classroom_db::Database;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

/// All API routes. Transport layers (CORS, tracing) are added by the server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(users::search_users))
        .route("/users/{id}", get(users::get_user))
        .route("/classes", get(classes::list_classes).post(classes::create_class))
        .route("/classes/{class_id}/members", get(classes::class_members))
        .with_state(state)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use classroom_types::Role;
    use classroom_types::api::NewUser;

    use super::*;

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        for (username, email, role) in [
            ("tina", "tina@school.edu", Role::Teacher),
            ("sam", "sam@school.edu", Role::Staff),
            ("stu", "stu@school.edu", Role::Student),
        ] {
            db.upsert_user(&NewUser {
                username: username.into(),
                name: username.into(),
                email: email.into(),
                role,
                status: None,
            })
            .unwrap();
        }
        router(Arc::new(AppStateInner { db }))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_class(body: Value) -> Request<Body> {
        Request::post("/classes")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn math101() -> Value {
        json!({
            "class_id": 1,
            "className": "Math101",
            "teacher_emails": ["tina@school.edu"],
            "staff_emails": ["sam@school.edu"],
            "student_emails": ["stu@school.edu"],
        })
    }

    #[tokio::test]
    async fn search_users_filters_by_email() {
        let app = app();

        let (status, body) = send(&app, get("/users?search=SA")).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "sam@school.edu");
        assert_eq!(users[0]["role"], "staff");

        let (_, body) = send(&app, get("/users")).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn get_user_returns_404_for_unknown_id() {
        let app = app();

        let (status, body) = send(&app, get("/users/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "tina");

        let (status, body) = send(&app, get("/users/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "user not found");
    }

    #[tokio::test]
    async fn create_then_list_classes() {
        let app = app();

        let (status, body) = send(&app, post_class(math101())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["class_id"], 1);
        assert_eq!(body["className"], "Math101");

        let (status, body) = send(&app, get("/classes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["className"], "Math101");
        assert_eq!(body[0]["student_emails"], json!(["stu@school.edu"]));

        let (status, body) = send(&app, get("/classes/1/members")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(body[0]["role"], "teacher");
    }

    #[tokio::test]
    async fn duplicate_class_name_conflicts() {
        let app = app();

        let (status, _) = send(&app, post_class(math101())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, post_class(math101())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "class name already exists: Math101");

        let (_, body) = send(&app, get("/classes")).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_proposed_id_is_reassigned() {
        let app = app();
        send(&app, post_class(math101())).await;

        let mut second = math101();
        second["className"] = json!("Science202");
        let (status, body) = send(&app, post_class(second)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["class_id"], 2);
    }

    #[tokio::test]
    async fn rejects_blank_name_and_bad_members() {
        let app = app();

        let mut blank = math101();
        blank["className"] = json!("   ");
        let (status, _) = send(&app, post_class(blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut unknown = math101();
        unknown["staff_emails"] = json!(["ghost@school.edu"]);
        let (status, body) = send(&app, post_class(unknown)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "no user with email ghost@school.edu");

        let mut swapped = math101();
        swapped["teacher_emails"] = json!(["stu@school.edu"]);
        let (status, body) = send(&app, post_class(swapped)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "stu@school.edu is a student, not a teacher");

        let (status, _) = send(&app, get("/classes/1/members")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
