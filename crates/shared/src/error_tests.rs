use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::Unauthorized("test".into()), 401, "UNAUTHORIZED")]
#[case(AppError::Forbidden("test".into()), 403, "FORBIDDEN")]
#[case(AppError::NotFound("test".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("test".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::InvalidAction("test".into()), 400, "INVALID_ACTION")]
#[case(AppError::Conflict("test".into()), 409, "CONFLICT")]
#[case(AppError::Database("test".into()), 500, "DATABASE_ERROR")]
#[case(AppError::ExternalService("test".into()), 502, "EXTERNAL_SERVICE_ERROR")]
#[case(AppError::Internal("test".into()), 500, "INTERNAL_ERROR")]
fn test_app_error_mapping(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.error_code(), code);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        AppError::InvalidAction("expense already approved".into()).to_string(),
        "Invalid action: expense already approved"
    );
    assert_eq!(
        AppError::Conflict("msg".into()).to_string(),
        "Conflict: msg"
    );
    assert_eq!(
        AppError::ExternalService("rates down".into()).to_string(),
        "External service error: rates down"
    );
}

#[test]
fn test_is_server_error() {
    assert!(AppError::Database(String::new()).is_server_error());
    assert!(AppError::ExternalService(String::new()).is_server_error());
    assert!(!AppError::Conflict(String::new()).is_server_error());
    assert!(!AppError::InvalidAction(String::new()).is_server_error());
}
