use crate::error::ApiError;
use crate::models::{Question, RegisterRequest};

pub fn validate_capacity(value: u32) -> Result<u32, ApiError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(ApiError::BadRequest("capacity must be at least 1".into()))
    }
}

pub fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "name, email and password are required".into(),
        ));
    }
    Ok(())
}

pub fn validate_questions(questions: &[Question]) -> Result<(), ApiError> {
    if questions.is_empty() {
        return Err(ApiError::BadRequest(
            "an exam needs at least one question".into(),
        ));
    }
    if questions.iter().any(|q| q.options.is_empty()) {
        return Err(ApiError::BadRequest(
            "every question needs at least one option".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(200).is_ok());
        assert!(validate_capacity(0).is_err());
    }

    #[test]
    fn test_validate_registration() {
        let mut req = RegisterRequest {
            name: "Sara".to_string(),
            email: "sara@example.com".to_string(),
            password: "pw".to_string(),
            role: Role::Student,
        };
        assert!(validate_registration(&req).is_ok());
        req.email = "  ".to_string();
        assert!(validate_registration(&req).is_err());
    }

    #[test]
    fn test_validate_questions() {
        assert!(validate_questions(&[]).is_err());
        let good = Question {
            question: "2+2?".to_string(),
            options: vec!["3".to_string(), "4".to_string()],
            answer: "4".to_string(),
        };
        assert!(validate_questions(std::slice::from_ref(&good)).is_ok());
        let no_options = Question {
            options: vec![],
            ..good
        };
        assert!(validate_questions(&[no_options]).is_err());
    }
}
