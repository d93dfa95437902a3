use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schedule::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

/// Stored user record. Never serialized into API responses; see [`UserInfo`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub instructor: String,
    pub capacity: u32,
    pub content: String,
    #[schema(value_type = Vec<Vec<String>>)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub enrolled: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub questions: Vec<Question>,
}

/// Exam as served to students: same shape minus the answer key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExamView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
}

impl From<&Exam> for ExamView {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id,
            course_id: exam.course_id,
            title: exam.title.clone(),
            questions: exam
                .questions
                .iter()
                .map(|q| QuestionView {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// Create/update payload for a course. Time slots arrive as raw
/// `(day, "HH:MM-HH:MM")` pairs and are validated before they become
/// [`TimeSlot`] values.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CoursePayload {
    pub name: String,
    pub instructor: String,
    pub capacity: u32,
    pub content: String,
    #[schema(value_type = Vec<Vec<String>>)]
    pub time_slots: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success,
    Failure,
}

/// Simulated payment gateway result reported by the client.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewExamRequest {
    pub course_id: Uuid,
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitExamRequest {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScoreResponse {
    pub score: u32,
    pub total: u32,
}
