use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::Local;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::auth::{Session, authenticate, hash_password, require_role};
use crate::enrollment::{self, AdmissionDecision, WithdrawalDecision};
use crate::error::ApiError;
use crate::models::{
    CheckoutRequest, Course, CoursePayload, Exam, ExamView, LoginRequest, LoginResponse,
    NewExamRequest, PaymentOutcome, RegisterRequest, Role, ScoreResponse, SubmitExamRequest, User,
    UserInfo,
};
use crate::schedule::TimeSlot;
use crate::validation::{validate_capacity, validate_questions, validate_registration};

#[derive(Debug, serde::Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

type AuthHeader = Option<TypedHeader<Authorization<Bearer>>>;

async fn authorize(
    state: &AppState,
    auth: AuthHeader,
    query_token: Option<&str>,
    role: Option<Role>,
) -> Result<Session, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    let session = authenticate(&state.sessions, auth_header, query_token).await?;
    if let Some(role) = role {
        require_role(&session, role)?;
    }
    Ok(session)
}

fn admission_rejection(decision: AdmissionDecision) -> Option<ApiError> {
    let msg = match decision {
        AdmissionDecision::Admitted => return None,
        AdmissionDecision::AlreadyEnrolled => "you are already enrolled in this course",
        AdmissionDecision::CapacityFull => "this course has reached its capacity",
        AdmissionDecision::ScheduleConflict => "this course conflicts with your current schedule",
    };
    Some(ApiError::Conflict(msg.into()))
}

fn parse_slots(pairs: &[(String, String)]) -> Result<Vec<TimeSlot>, ApiError> {
    pairs
        .iter()
        .map(|(day, range)| TimeSlot::new(day.clone(), range).map_err(ApiError::from))
        .collect()
}

/// Runs the load-decide-apply cycle for one enrollment attempt inside the
/// store's update lock, so the decision never acts on stale state.
async fn attempt_enrollment(
    state: &AppState,
    session: &Session,
    course_id: Uuid,
) -> Result<(AdmissionDecision, String), ApiError> {
    let student_id = session.user_id;
    let outcome = state
        .store
        .update_courses(|courses| {
            let idx = courses.iter().position(|c| c.id == course_id)?;
            let mine = enrollment::student_courses(student_id, courses);
            let decision = enrollment::decide(student_id, &courses[idx], &mine);
            if decision == AdmissionDecision::Admitted {
                courses[idx].enrolled.push(student_id);
            }
            Some((decision, courses[idx].name.clone()))
        })
        .await?;
    outcome.ok_or_else(|| ApiError::NotFound("course not found".into()))
}

#[utoipa::path(get, path = "/", tag = "meta")]
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Course Registry API",
        "endpoints": {
            "/auth/register": "Create an account",
            "/auth/login": "Log in and receive a token",
            "/courses": "Browse and manage courses",
            "/courses/{id}/enroll": "Enroll in a course",
            "/schedule.ical": "Download your schedule as an iCal file"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "meta")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "meta")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserInfo),
        (status = 400, description = "Missing required fields"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_registration(&req)?;

    let user = User {
        id: Uuid::new_v4(),
        name: req.name,
        email: req.email,
        password_hash: hash_password(&req.password),
        role: req.role,
    };
    let created = state
        .store
        .update_users(|users| {
            if users.iter().any(|u| u.email == user.email) {
                return None;
            }
            users.push(user.clone());
            Some(UserInfo::from(&user))
        })
        .await?;

    let info = created.ok_or_else(|| {
        ApiError::Conflict("an account with this email already exists".into())
    })?;
    info!(email = %info.email, role = ?info.role, "account registered");
    Ok((StatusCode::CREATED, Json(info)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Wrong email or password")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.load_users().await?;
    let digest = hash_password(&req.password);
    let user = users
        .iter()
        .find(|u| u.email == req.email && u.password_hash == digest)
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".into()))?;

    let token = state
        .sessions
        .issue(Session {
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
        })
        .await;
    info!(email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        token,
        user: UserInfo::from(user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 200, description = "Token revoked"),
        (status = 401, description = "Unknown token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let token = auth
        .map(|TypedHeader(a)| a.token().to_string())
        .or(query.token)
        .ok_or_else(|| ApiError::Unauthorized("Missing authentication token".into()))?;
    if !state.sessions.revoke(&token).await {
        return Err(ApiError::Unauthorized(
            "Invalid authentication token".into(),
        ));
    }
    Ok(Json(json!({"status": "logged out"})))
}

#[utoipa::path(
    get,
    path = "/courses",
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 200, description = "All course offerings", body = [Course]),
        (status = 401, description = "Invalid authentication token")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courses"
)]
pub async fn list_courses(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), None).await?;
    let courses = state.store.load_courses().await?;
    Ok(Json(courses))
}

#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "The course", body = Course),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), None).await?;
    let courses = state.store.load_courses().await?;
    let course = courses
        .into_iter()
        .find(|c| c.id == course_id)
        .ok_or_else(|| ApiError::NotFound("course not found".into()))?;
    Ok(Json(course))
}

#[utoipa::path(
    post,
    path = "/courses",
    request_body = CoursePayload,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid capacity or time slots"),
        (status = 403, description = "Administrator access required")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courses"
)]
pub async fn create_course(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), Some(Role::Admin)).await?;
    let capacity = validate_capacity(payload.capacity)?;
    let time_slots = parse_slots(&payload.time_slots)?;

    let course = Course {
        id: Uuid::new_v4(),
        name: payload.name,
        instructor: payload.instructor,
        capacity,
        content: payload.content,
        time_slots,
        enrolled: vec![],
    };
    state
        .store
        .update_courses(|courses| courses.push(course.clone()))
        .await?;
    info!(course = %course.name, id = %course.id, "course created");
    Ok((StatusCode::CREATED, Json(course)))
}

#[utoipa::path(
    put,
    path = "/courses/{id}",
    request_body = CoursePayload,
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Updated course", body = Course),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courses"
)]
pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(payload): Json<CoursePayload>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), Some(Role::Admin)).await?;
    let capacity = validate_capacity(payload.capacity)?;
    let time_slots = parse_slots(&payload.time_slots)?;

    // The whole time_slots set is replaced in one edit; enrollment survives.
    let updated = state
        .store
        .update_courses(|courses| {
            let course = courses.iter_mut().find(|c| c.id == course_id)?;
            course.name = payload.name;
            course.instructor = payload.instructor;
            course.capacity = capacity;
            course.content = payload.content;
            course.time_slots = time_slots;
            Some(course.clone())
        })
        .await?;

    let course = updated.ok_or_else(|| ApiError::NotFound("course not found".into()))?;
    info!(course = %course.name, id = %course.id, "course updated");
    Ok(Json(course))
}

#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "courses"
)]
pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), Some(Role::Admin)).await?;
    let removed = state
        .store
        .update_courses(|courses| {
            let before = courses.len();
            courses.retain(|c| c.id != course_id);
            courses.len() != before
        })
        .await?;
    if !removed {
        return Err(ApiError::NotFound("course not found".into()));
    }
    info!(id = %course_id, "course deleted");
    Ok(Json(json!({"status": "deleted"})))
}

#[utoipa::path(
    post,
    path = "/courses/{id}/enroll",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Enrolled"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled, capacity full, or schedule conflict")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollment"
)]
pub async fn enroll(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    let (decision, course_name) = attempt_enrollment(&state, &session, course_id).await?;
    if let Some(rejection) = admission_rejection(decision) {
        return Err(rejection);
    }
    info!(course = %course_name, student = %session.user_id, "student enrolled");
    Ok(Json(json!({"status": "enrolled", "course_id": course_id})))
}

#[utoipa::path(
    post,
    path = "/courses/{id}/unenroll",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Enrollment removed"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Not enrolled in this course")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollment"
)]
pub async fn unenroll(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    let student_id = session.user_id;
    let outcome = state
        .store
        .update_courses(|courses| {
            let idx = courses.iter().position(|c| c.id == course_id)?;
            let decision = enrollment::decide_withdrawal(student_id, &courses[idx]);
            if decision == WithdrawalDecision::Withdrawn {
                courses[idx].enrolled.retain(|id| *id != student_id);
            }
            Some(decision)
        })
        .await?;

    match outcome {
        None => Err(ApiError::NotFound("course not found".into())),
        Some(WithdrawalDecision::NotEnrolled) => Err(ApiError::Conflict(
            "you are not enrolled in this course".into(),
        )),
        Some(WithdrawalDecision::Withdrawn) => {
            info!(course = %course_id, student = %student_id, "student unenrolled");
            Ok(Json(json!({"status": "unenrolled", "course_id": course_id})))
        }
    }
}

#[utoipa::path(
    post,
    path = "/courses/{id}/checkout",
    request_body = CheckoutRequest,
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Payment accepted and enrollment applied"),
        (status = 402, description = "Simulated payment failed"),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Already enrolled, capacity full, or schedule conflict")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "enrollment"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    if req.outcome == PaymentOutcome::Failure {
        return Err(ApiError::PaymentFailed(
            "payment was not completed, please try again".into(),
        ));
    }

    // A successful payment goes through the same admission pipeline as a
    // plain enrollment.
    let (decision, course_name) = attempt_enrollment(&state, &session, course_id).await?;
    if let Some(rejection) = admission_rejection(decision) {
        return Err(rejection);
    }
    info!(course = %course_name, student = %session.user_id, "student enrolled via checkout");
    Ok(Json(json!({
        "status": "enrolled",
        "course_id": course_id,
        "message": format!("payment accepted, you are enrolled in {course_name}")
    })))
}

#[utoipa::path(
    get,
    path = "/courses/{id}/exams",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Exams for the course, without answer keys", body = [ExamView]),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "exams"
)]
pub async fn course_exams(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    let courses = state.store.load_courses().await?;
    if !courses.iter().any(|c| c.id == course_id) {
        return Err(ApiError::NotFound("course not found".into()));
    }
    let exams = state.store.load_exams().await?;
    let views: Vec<ExamView> = exams
        .iter()
        .filter(|e| e.course_id == course_id)
        .map(ExamView::from)
        .collect();
    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/exams",
    request_body = NewExamRequest,
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 201, description = "Exam created", body = ExamView),
        (status = 400, description = "Invalid questions"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "exams"
)]
pub async fn create_exam(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(req): Json<NewExamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, auth, query.token.as_deref(), Some(Role::Admin)).await?;
    validate_questions(&req.questions)?;

    let courses = state.store.load_courses().await?;
    if !courses.iter().any(|c| c.id == req.course_id) {
        return Err(ApiError::NotFound("course not found".into()));
    }

    let exam = Exam {
        id: Uuid::new_v4(),
        course_id: req.course_id,
        title: req.title,
        questions: req.questions,
    };
    state
        .store
        .update_exams(|exams| exams.push(exam.clone()))
        .await?;
    info!(exam = %exam.title, course = %exam.course_id, "exam created");
    Ok((StatusCode::CREATED, Json(ExamView::from(&exam))))
}

#[utoipa::path(
    post,
    path = "/exams/{id}/submit",
    request_body = SubmitExamRequest,
    params(
        ("id" = Uuid, Path, description = "Exam id"),
        ("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")
    ),
    responses(
        (status = 200, description = "Score for the submission", body = ScoreResponse),
        (status = 404, description = "Exam not found")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "exams"
)]
pub async fn submit_exam(
    State(state): State<AppState>,
    Path(exam_id): Path<Uuid>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    let exams = state.store.load_exams().await?;
    let exam = exams
        .iter()
        .find(|e| e.id == exam_id)
        .ok_or_else(|| ApiError::NotFound("exam not found".into()))?;

    // Unanswered questions score zero, like blank form fields did.
    let score = exam
        .questions
        .iter()
        .enumerate()
        .filter(|(i, q)| req.answers.get(*i).is_some_and(|a| *a == q.answer))
        .count() as u32;
    let total = exam.questions.len() as u32;
    info!(exam = %exam.title, student = %session.user_id, score, total, "exam submitted");
    Ok(Json(ScoreResponse { score, total }))
}

#[utoipa::path(
    get,
    path = "/schedule.ical",
    params(("token" = Option<String>, Query, description = "Authentication token (alternative to Bearer header)")),
    responses(
        (status = 200, description = "iCal file of the student's weekly schedule", content_type = "text/calendar"),
        (status = 401, description = "Invalid authentication token"),
        (status = 404, description = "No enrolled courses")
    ),
    security(("bearer_auth" = []), ("query_token" = [])),
    tag = "schedule"
)]
pub async fn get_schedule_ical(
    State(state): State<AppState>,
    auth: AuthHeader,
    Query(query): Query<AuthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = authorize(&state, auth, query.token.as_deref(), Some(Role::Student)).await?;
    let courses = state.store.load_courses().await?;
    let mine = enrollment::student_courses(session.user_id, &courses);
    if mine.is_empty() {
        return Err(ApiError::NotFound("no enrolled courses".into()));
    }

    let body = state
        .exporter
        .generate(&mine, Local::now().date_naive());
    Ok((
        StatusCode::OK,
        [
            ("content-type", "text/calendar"),
            (
                "content-disposition",
                "attachment; filename=course_schedule.ics",
            ),
        ],
        body,
    ))
}
