//! Mapping of non-success responses onto [`FetchError`].

use reqwest::StatusCode;
use serde_json::Value;

use super::error::FetchError;

pub(crate) fn classify_failure(status: StatusCode, body: &[u8]) -> FetchError {
    let Ok(decoded) = serde_json::from_slice::<Value>(body) else {
        return FetchError::Status(status);
    };

    match server_message(&decoded) {
        Some(message) => FetchError::Server { status, message },
        None => FetchError::Status(status),
    }
}

/// Pull the server's own explanation out of an error body.
///
/// Checked in order: `error.description`, `error`, `errorMessage`. Null
/// values count as absent.
pub(crate) fn server_message(body: &Value) -> Option<String> {
    let present = |value: Option<&Value>| value.filter(|v| !v.is_null()).map(stringify);

    present(body.pointer("/error/description"))
        .or_else(|| present(body.get("error")))
        .or_else(|| present(body.get("errorMessage")))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message_of(err: FetchError) -> String {
        match err {
            FetchError::Server { message, .. } => message,
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn description_wins() {
        let body = br#"{"error":{"description":"bad field","code":7},"errorMessage":"nope"}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert_eq!(message_of(err), "bad field");
    }

    #[test]
    fn error_field_is_stringified() {
        let err = classify_failure(StatusCode::BAD_REQUEST, br#"{"error":"plain"}"#);
        assert_eq!(message_of(err), "plain");

        let err = classify_failure(StatusCode::CONFLICT, br#"{"error":{"code":7}}"#);
        assert_eq!(message_of(err), r#"{"code":7}"#);
    }

    #[test]
    fn error_message_is_last_resort() {
        let err = classify_failure(StatusCode::FORBIDDEN, br#"{"errorMessage":"denied"}"#);
        assert_eq!(message_of(err), "denied");
    }

    #[test]
    fn null_error_falls_through() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            br#"{"error":null,"errorMessage":"denied"}"#,
        );
        assert_eq!(message_of(err), "denied");
    }

    #[test]
    fn uninformative_body_keeps_status() {
        let err = classify_failure(StatusCode::NOT_FOUND, br#"{"detail":"x"}"#);
        assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));

        let err = classify_failure(StatusCode::NOT_FOUND, b"[1,2]");
        assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));
    }

    #[test]
    fn undecodable_body_keeps_status() {
        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>");
        assert!(matches!(
            err,
            FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn server_message_reads_nested_description() {
        assert_eq!(
            server_message(&json!({"error": {"description": 42}})).as_deref(),
            Some("42")
        );
        assert_eq!(server_message(&json!({"ok": true})), None);
    }
}
