use uuid::Uuid;

use crate::models::Course;
use crate::schedule;

/// Outcome of evaluating whether a student may enroll in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted,
    AlreadyEnrolled,
    CapacityFull,
    ScheduleConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalDecision {
    Withdrawn,
    NotEnrolled,
}

/// Pure admission check. The caller owns loading the course collection,
/// applying the verdict, and persisting.
///
/// Checks run in a fixed order and the first match wins: an already-enrolled
/// student gets `AlreadyEnrolled` even when the course is also full or
/// conflicting.
pub fn decide(student_id: Uuid, course: &Course, student_courses: &[Course]) -> AdmissionDecision {
    if course.enrolled.contains(&student_id) {
        return AdmissionDecision::AlreadyEnrolled;
    }
    if course.enrolled.len() as u32 >= course.capacity {
        return AdmissionDecision::CapacityFull;
    }
    if schedule::has_time_conflict(course, student_courses) {
        return AdmissionDecision::ScheduleConflict;
    }
    AdmissionDecision::Admitted
}

/// Converse of [`decide`]: whether the student can leave the course.
pub fn decide_withdrawal(student_id: Uuid, course: &Course) -> WithdrawalDecision {
    if course.enrolled.contains(&student_id) {
        WithdrawalDecision::Withdrawn
    } else {
        WithdrawalDecision::NotEnrolled
    }
}

/// Courses the student currently holds, computed fresh from the loaded
/// collection so the decision never acts on stale enrollment state.
pub fn student_courses(student_id: Uuid, courses: &[Course]) -> Vec<Course> {
    courses
        .iter()
        .filter(|course| course.enrolled.contains(&student_id))
        .cloned()
        .collect()
}
