use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{
    CheckoutRequest, Course, CoursePayload, ExamView, LoginRequest, LoginResponse, NewExamRequest,
    PaymentOutcome, Question, QuestionView, RegisterRequest, Role, ScoreResponse,
    SubmitExamRequest, UserInfo,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .build(),
            ),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::register,
        crate::handlers::login,
        crate::handlers::logout,
        crate::handlers::list_courses,
        crate::handlers::get_course,
        crate::handlers::create_course,
        crate::handlers::update_course,
        crate::handlers::delete_course,
        crate::handlers::enroll,
        crate::handlers::unenroll,
        crate::handlers::checkout,
        crate::handlers::course_exams,
        crate::handlers::create_exam,
        crate::handlers::submit_exam,
        crate::handlers::get_schedule_ical
    ),
    components(schemas(
        Role,
        UserInfo,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        Course,
        CoursePayload,
        PaymentOutcome,
        CheckoutRequest,
        Question,
        QuestionView,
        ExamView,
        NewExamRequest,
        SubmitExamRequest,
        ScoreResponse
    )),
    tags(
        (name = "meta", description = "Service information and health"),
        (name = "auth", description = "Accounts and sessions"),
        (name = "courses", description = "Course offering management"),
        (name = "enrollment", description = "Enrollment, withdrawal and checkout"),
        (name = "exams", description = "Exam management and submissions"),
        (name = "schedule", description = "Schedule export")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
