use super::*;

// =============================================================================
// FieldErrors::from_body
// =============================================================================

#[test]
fn field_errors_from_list_values() {
    let errors = FieldErrors::from_body(r#"{"email": ["Email already exists."], "password": ["Too short.", "Too common."]}"#);
    assert_eq!(errors.get("email"), ["Email already exists."]);
    assert_eq!(errors.get("password").len(), 2);
    assert!(errors.non_field().is_empty());
}

#[test]
fn field_errors_detail_becomes_non_field() {
    let errors = FieldErrors::from_body(r#"{"detail": "Invalid credentials."}"#);
    assert_eq!(errors.non_field(), ["Invalid credentials."]);
}

#[test]
fn field_errors_non_field_errors_key_kept() {
    let errors = FieldErrors::from_body(r#"{"non_field_errors": ["Invalid credentials."]}"#);
    assert_eq!(errors.first_message(), Some("Invalid credentials."));
}

#[test]
fn field_errors_nested_objects_flatten() {
    let errors = FieldErrors::from_body(r#"{"profile": {"bio": ["Too long."]}}"#);
    assert_eq!(errors.get("profile.bio"), ["Too long."]);
}

#[test]
fn field_errors_bare_list() {
    let errors = FieldErrors::from_body(r#"["first", "second"]"#);
    assert_eq!(errors.non_field(), ["first", "second"]);
}

#[test]
fn field_errors_non_json_body_kept_verbatim() {
    let errors = FieldErrors::from_body("Bad Request");
    assert_eq!(errors.non_field(), ["Bad Request"]);
}

#[test]
fn field_errors_long_raw_body_truncated() {
    let body = "x".repeat(500);
    let errors = FieldErrors::from_body(&body);
    let msg = &errors.non_field()[0];
    assert_eq!(msg.chars().count(), MAX_RAW_BODY_CHARS + 1);
    assert!(msg.ends_with('…'));
}

#[test]
fn field_errors_empty_body() {
    assert!(FieldErrors::from_body("  ").is_empty());
}

#[test]
fn field_errors_display_joins_messages() {
    let mut errors = FieldErrors::new();
    errors.push("email", "Required.");
    errors.push(NON_FIELD_KEY, "Try again.");
    assert_eq!(errors.to_string(), "email: Required.; Try again.");
}

// =============================================================================
// ApiError::from_response
// =============================================================================

#[test]
fn from_response_400_is_validation() {
    let err = ApiError::from_response(400, None, r#"{"title": ["This field is required."]}"#);
    let ApiError::Validation(fields) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(fields.get("title"), ["This field is required."]);
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn from_response_401_uses_detail() {
    let err = ApiError::from_response(401, None, r#"{"detail": "Token is invalid or expired"}"#);
    assert_eq!(err, ApiError::Unauthorized("Token is invalid or expired".into()));
    assert_eq!(err.kind(), ErrorKind::Auth);
}

#[test]
fn from_response_403_and_404() {
    assert_eq!(ApiError::from_response(403, None, r#"{"detail": "Not allowed"}"#), ApiError::Forbidden("Not allowed".into()));
    assert_eq!(ApiError::from_response(404, None, ""), ApiError::NotFound("resource not found".into()));
}

#[test]
fn from_response_429_keeps_retry_after() {
    let err = ApiError::from_response(429, Some(30), "");
    assert_eq!(err, ApiError::RateLimited { retry_after_secs: Some(30) });
    assert!(err.retryable());
}

#[test]
fn from_response_5xx_is_server() {
    let err = ApiError::from_response(503, None, "");
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.status(), Some(503));
    assert!(err.retryable());
}

#[test]
fn from_response_other_status_is_unexpected() {
    let err = ApiError::from_response(418, None, "teapot");
    assert_eq!(err, ApiError::Unexpected { status: 418, body: "teapot".into() });
    assert_eq!(err.kind(), ErrorKind::Unknown);
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(ApiError::Network("x".into()).error_code(), "E_NETWORK");
    assert_eq!(ApiError::Unauthorized("x".into()).error_code(), "E_UNAUTHORIZED");
    assert_eq!(ApiError::Decode("x".into()).error_code(), "E_DECODE");
}

#[test]
fn auth_errors_are_not_retryable() {
    assert!(!ApiError::Unauthorized("x".into()).retryable());
    assert!(!ApiError::Validation(FieldErrors::new()).retryable());
}
