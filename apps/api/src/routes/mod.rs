pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::auth::handlers as auth;
use crate::interviews::{feedback, schedule};
use crate::jobs::{candidates, listings};
use crate::notifications::handlers as notifications;
use crate::org::{branches, departments, designations, employees, leave_types, roles};
use crate::profit::handlers as profit;
use crate::screening::handlers as screening;
use crate::state::AppState;
use crate::uploads;

fn org_routes() -> Router<AppState> {
    Router::new()
        .route("/branches", get(branches::handle_list).post(branches::handle_create))
        .route(
            "/branches/:id",
            get(branches::handle_get)
                .put(branches::handle_update)
                .delete(branches::handle_delete),
        )
        .route(
            "/departments",
            get(departments::handle_list).post(departments::handle_create),
        )
        .route(
            "/departments/:id",
            get(departments::handle_get)
                .put(departments::handle_update)
                .delete(departments::handle_delete),
        )
        .route("/roles", get(roles::handle_list).post(roles::handle_create))
        .route(
            "/roles/:id",
            get(roles::handle_get)
                .put(roles::handle_update)
                .delete(roles::handle_delete),
        )
        .route("/permissions", get(roles::handle_permissions))
        .route(
            "/designations",
            get(designations::handle_list).post(designations::handle_create),
        )
        .route(
            "/designations/:id",
            get(designations::handle_get)
                .put(designations::handle_update)
                .delete(designations::handle_delete),
        )
        .route(
            "/leave-types",
            get(leave_types::handle_list).post(leave_types::handle_create),
        )
        .route(
            "/leave-types/:id",
            get(leave_types::handle_get)
                .put(leave_types::handle_update)
                .delete(leave_types::handle_delete),
        )
        .route(
            "/employees",
            get(employees::handle_list).post(employees::handle_create),
        )
        .route(
            "/employees/:id",
            get(employees::handle_get)
                .put(employees::handle_update)
                .delete(employees::handle_delete),
        )
}

fn recruitment_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(listings::handle_list).post(listings::handle_create))
        .route(
            "/jobs/:id",
            get(listings::handle_get)
                .put(listings::handle_update)
                .delete(listings::handle_delete),
        )
        .route("/jobs/:id/matches", get(listings::handle_matches))
        .route("/jobs/:id/profit", get(listings::handle_profit))
        .route(
            "/candidates",
            get(candidates::handle_list).post(candidates::handle_create),
        )
        .route(
            "/candidates/:id",
            get(candidates::handle_get)
                .put(candidates::handle_update)
                .delete(candidates::handle_delete),
        )
        .route(
            "/interviews",
            get(schedule::handle_list).post(schedule::handle_create),
        )
        .route(
            "/interviews/:id",
            get(schedule::handle_get).put(schedule::handle_update),
        )
        .route(
            "/interviews/:id/feedback",
            get(feedback::handle_list).post(feedback::handle_submit),
        )
        .route(
            "/screenings",
            get(screening::handle_list).post(screening::handle_create),
        )
        .route("/screenings/:id", get(screening::handle_get))
        .route("/screenings/:id/connect", post(screening::handle_connect))
        .route("/screenings/:id/signal", post(screening::handle_signal))
        .route("/screenings/:id/recording", post(screening::handle_recording))
        .route("/screenings/:id/end", post(screening::handle_end))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::handle_login))
        .route("/auth/logout", post(auth::handle_logout))
        .route("/auth/me", get(auth::handle_me))
        .route(
            "/notifications",
            get(notifications::handle_list)
                .post(notifications::handle_add)
                .delete(notifications::handle_clear),
        )
        .route(
            "/notifications/read-all",
            post(notifications::handle_mark_all_read),
        )
        .route(
            "/notifications/email",
            post(notifications::handle_send_email),
        )
        .route(
            "/notifications/:id",
            delete(notifications::handle_delete),
        )
        .route(
            "/notifications/:id/read",
            patch(notifications::handle_mark_read),
        )
        .route("/profit/calculate", post(profit::handle_calculate))
        .route("/profit/split", post(profit::handle_split))
}

pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_handler))
        .nest(
            "/api/v1",
            Router::new()
                .merge(account_routes())
                .merge(org_routes())
                .merge(recruitment_routes()),
        );

    if state.config.enable_direct_upload {
        router = router
            .route(
                "/direct-upload",
                post(uploads::handle_direct_upload)
                    .layer(DefaultBodyLimit::max(state.config.max_upload_bytes)),
            )
            .nest_service("/uploads", ServeDir::new(&state.config.upload_dir));
    }

    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, RwLock};

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::accounts::AccountDirectory;
    use crate::auth::session::issue_token;
    use crate::config::Config;
    use crate::errors::AppError;
    use crate::models::user::{User, UserRole};

    /// Stand-in for the employees table.
    #[derive(Default)]
    struct TestAccounts {
        users: RwLock<HashMap<Uuid, User>>,
    }

    impl TestAccounts {
        fn add(&self, role: UserRole) -> Uuid {
            let id = Uuid::new_v4();
            let user = User {
                id,
                name: format!("{} user", role.as_str()),
                email: format!("{id}@talentdesk.test"),
                role,
                designation: None,
                branch_id: Some(Uuid::new_v4()),
                department_id: None,
            };
            self.users.write().unwrap().insert(id, user);
            id
        }

        fn deactivate(&self, id: Uuid) {
            self.users.write().unwrap().remove(&id);
        }
    }

    #[axum::async_trait]
    impl AccountDirectory for TestAccounts {
        async fn active_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
            Ok(self.users.read().unwrap().get(&id).cloned())
        }
    }

    fn test_config(upload_dir: PathBuf, enable_direct_upload: bool) -> Config {
        Config {
            database_url: "postgres://localhost/talentdesk_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            session_ttl_minutes: 60,
            port: 8080,
            rust_log: "debug".to_string(),
            upload_dir,
            public_base_url: "http://localhost:8080".to_string(),
            max_upload_bytes: 1024 * 1024,
            enable_direct_upload,
            mail_relay_url: None,
            email_delay_ms: 0,
            screening_connect_delay_ms: 10,
            seed_admin_email: "admin@talentdesk.local".to_string(),
            seed_admin_password: "change-me-now".to_string(),
        }
    }

    /// The pool never connects; these routes do not touch the database.
    fn test_state(upload_dir: PathBuf, enable_direct_upload: bool) -> (AppState, Arc<TestAccounts>) {
        let config = test_config(upload_dir, enable_direct_upload);
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let accounts = Arc::new(TestAccounts::default());
        let mut state = AppState::new(db, config);
        state.accounts = accounts.clone();
        (state, accounts)
    }

    fn token_for(state: &AppState, accounts: &TestAccounts, role: UserRole) -> String {
        let id = accounts.add(role);
        issue_token(id, role, &state.session_keys).unwrap().0
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn authed(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(PathBuf::from("./uploads"), false).0);
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["service"], "talentdesk-api");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = build_router(test_state(PathBuf::from("./uploads"), false).0);
        let resp = app
            .oneshot(Request::get("/api/v1/branches").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_profit_calculate_filters_by_role() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let inputs = json!({
            "client_budget": 120.0,
            "internal_budget": 90.0,
            "candidate_split": 80.0,
            "company_split": 20.0
        });

        let ceo = token_for(&state, &accounts, UserRole::Ceo);
        let resp = build_router(state.clone())
            .oneshot(authed("POST", "/api/v1/profit/calculate", &ceo, Some(inputs.clone())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["total_profit"], 48.0);
        assert_eq!(body["data"]["profit_margin"], 40.0);

        let recruiter = token_for(&state, &accounts, UserRole::MarketingRecruiter);
        let resp = build_router(state)
            .oneshot(authed("POST", "/api/v1/profit/calculate", &recruiter, Some(inputs)))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert!(body["data"].get("total_profit").is_none());
        assert_eq!(body["data"]["candidate_payout"], 72.0);
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let token = token_for(&state, &accounts, UserRole::MarketingAssociate);

        let resp = build_router(state.clone())
            .oneshot(authed("GET", "/api/v1/notifications", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["notifications"].as_array().unwrap().len(), 4);
        assert_eq!(body["data"]["unread_count"], 2);

        let resp = build_router(state.clone())
            .oneshot(authed("POST", "/api/v1/auth/logout", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = build_router(state)
            .oneshot(authed("GET", "/api/v1/notifications", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_without_token_still_succeeds() {
        let app = build_router(test_state(PathBuf::from("./uploads"), false).0);
        let resp = app
            .oneshot(
                Request::post("/api/v1/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_screening_is_404() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let token = token_for(&state, &accounts, UserRole::MarketingRecruiter);
        let uri = format!("/api/v1/screenings/{}/end", Uuid::new_v4());
        let resp = build_router(state)
            .oneshot(authed("POST", &uri, &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_token_without_account_is_rejected() {
        let (state, _) = test_state(PathBuf::from("./uploads"), false);
        let (token, _) = issue_token(Uuid::new_v4(), UserRole::Ceo, &state.session_keys).unwrap();
        let inputs = json!({
            "client_budget": 100.0,
            "internal_budget": 80.0,
            "candidate_split": 70.0,
            "company_split": 30.0
        });
        let resp = build_router(state)
            .oneshot(authed("POST", "/api/v1/profit/calculate", &token, Some(inputs)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_is_read_from_account_not_token() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let recruiter = accounts.add(UserRole::MarketingRecruiter);
        let (token, _) = issue_token(recruiter, UserRole::Ceo, &state.session_keys).unwrap();
        let inputs = json!({
            "client_budget": 120.0,
            "internal_budget": 90.0,
            "candidate_split": 80.0,
            "company_split": 20.0
        });
        let resp = build_router(state)
            .oneshot(authed("POST", "/api/v1/profit/calculate", &token, Some(inputs)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert!(body["data"].get("total_profit").is_none());
    }

    #[tokio::test]
    async fn test_deactivated_account_loses_access() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let id = accounts.add(UserRole::BranchManager);
        let (token, _) = issue_token(id, UserRole::BranchManager, &state.session_keys).unwrap();

        let resp = build_router(state.clone())
            .oneshot(authed("GET", "/api/v1/auth/me", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["id"], id.to_string());
        assert_eq!(body["data"]["role"], "branch-manager");

        accounts.deactivate(id);
        let resp = build_router(state)
            .oneshot(authed("GET", "/api/v1/notifications", &token, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["error"]["message"], "Account no longer active");
    }

    #[tokio::test]
    async fn test_login_requires_email() {
        let app = build_router(test_state(PathBuf::from("./uploads"), false).0);
        let resp = app
            .oneshot(
                Request::post("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({"email": "  ", "password": "secret"}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_applicant_cannot_drive_screening() {
        let (state, accounts) = test_state(PathBuf::from("./uploads"), false);
        let session = state
            .screenings
            .create(Uuid::new_v4(), None, Uuid::new_v4())
            .await;

        let applicant = token_for(&state, &accounts, UserRole::Applicant);
        for action in ["connect", "end"] {
            let uri = format!("/api/v1/screenings/{}/{action}", session.id);
            let resp = build_router(state.clone())
                .oneshot(authed("POST", &uri, &applicant, None))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }
        let uri = format!("/api/v1/screenings/{}/recording", session.id);
        let resp = build_router(state.clone())
            .oneshot(authed("POST", &uri, &applicant, Some(json!({"recording": true}))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let recruiter = token_for(&state, &accounts, UserRole::MarketingRecruiter);
        let uri = format!("/api/v1/screenings/{}/connect", session.id);
        let resp = build_router(state)
            .oneshot(authed("POST", &uri, &recruiter, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_direct_upload_disabled() {
        let app = build_router(test_state(PathBuf::from("./uploads"), false).0);
        let resp = app
            .oneshot(Request::post("/direct-upload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_direct_upload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(dir.path().to_path_buf(), true);

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"my cv.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello\r\n\
             --{boundary}--\r\n"
        );
        let resp = build_router(state.clone())
            .oneshot(
                Request::post("/direct-upload")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["success"], true);
        let url = json["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("http://localhost:8080/uploads/"));
        assert!(url.ends_with("-my_cv.txt"));

        let path = url.trim_start_matches("http://localhost:8080");
        let resp = build_router(state)
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }
}
