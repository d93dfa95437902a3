pub mod auth;
pub mod enrollment;
pub mod error;
pub mod handlers;
pub mod ical;
pub mod models;
pub mod openapi;
pub mod schedule;
pub mod settings;
pub mod store;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::{SessionStore, hash_password};
use crate::handlers::{
    checkout, course_exams, create_course, create_exam, delete_course, enroll, get_course,
    get_schedule_ical, healthz_live, healthz_ready, list_courses, login, logout, register, root,
    submit_exam, unenroll, update_course,
};
use crate::ical::ScheduleExporter;
use crate::models::{Role, User};
use crate::openapi::ApiDoc;
use crate::settings::Settings;
use crate::store::{JsonStore, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<JsonStore>,
    pub sessions: Arc<SessionStore>,
    pub exporter: Arc<ScheduleExporter>,
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let store = Arc::new(JsonStore::new(settings.data_dir.clone()));
    seed_admin(&store, &settings).await?;

    let state = AppState {
        settings: settings.clone(),
        store,
        sessions: Arc::new(SessionStore::new()),
        exporter: Arc::new(ScheduleExporter::new()),
    };

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Course Registry API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// First boot of an empty store gets an administrator account from settings;
/// without one no course could ever be created.
async fn seed_admin(store: &JsonStore, settings: &Settings) -> Result<(), StoreError> {
    let users = store.load_users().await?;
    if !users.is_empty() {
        return Ok(());
    }
    store
        .update_users(|users| {
            users.push(User {
                id: Uuid::new_v4(),
                name: settings.admin_name.clone(),
                email: settings.admin_email.clone(),
                password_hash: hash_password(&settings.admin_password),
                role: Role::Admin,
            });
        })
        .await?;
    info!(email = %settings.admin_email, "seeded initial admin account");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/courses", get(list_courses).post(create_course))
        .route(
            "/courses/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/{id}/enroll", post(enroll))
        .route("/courses/{id}/unenroll", post(unenroll))
        .route("/courses/{id}/checkout", post(checkout))
        .route("/courses/{id}/exams", get(course_exams))
        .route("/exams", post(create_exam))
        .route("/exams/{id}/submit", post(submit_exam))
        .route("/schedule.ical", get(get_schedule_ical))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
