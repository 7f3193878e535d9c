use super::error::{SendError, SourceError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn unknown_levels_fall_back_to_info() {
    assert_eq!(logging::normalize_level("WARNING"), "warn");
    assert_eq!(logging::normalize_level("Trace"), "trace");
    assert_eq!(logging::normalize_level("loud"), "info");
}

#[test]
fn source_errors_name_the_endpoint() {
    let err = SourceError::Status {
        endpoint: "v1/standings/now".to_string(),
        status: 503,
    };
    assert_eq!(
        err.to_string(),
        "upstream returned status 503 for v1/standings/now"
    );

    let err = SourceError::NotJson {
        endpoint: "v1/score/now".to_string(),
    };
    assert!(err.to_string().contains("v1/score/now"));
}

#[test]
fn send_error_reports_client() {
    let err = SendError::Closed("client-1".to_string());
    assert_eq!(err.to_string(), "connection client-1 is closed");
}
