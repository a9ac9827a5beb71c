//! Remote failures and their classification.
//!
//! Every non-success response is turned into a [`RemoteError`] by
//! [`classify`], which looks only at the HTTP status, the route family and the
//! structured `code` of the error body. Anything it does not recognise is a
//! terminal [`RemoteError::Api`]; only transport failures, timeouts and
//! server-side outages are transient.

use serde::Deserialize;
use thiserror::Error;

use crate::rows::DecodeError;

/// Errors produced by the remote adapter.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network failure, timeout or server outage. The only transient class.
    #[error("Remote backend unreachable: {0}")]
    Connectivity(String),

    /// The request needs a logged-in session.
    #[error("You must be logged in: {0}")]
    AuthRequired(String),

    /// Row-level security or role check rejected the request.
    #[error("Not allowed: {0}")]
    AuthorizationDenied(String),

    /// Missing table/column or a type mismatch: the backend is not set up.
    #[error("Remote schema is missing or out of date: {0}")]
    SchemaMissing(String),

    /// Business-level refusal from the auth service (bad credentials,
    /// duplicate email).
    #[error("{0}")]
    Rejected(String),

    /// The addressed row does not exist (or is hidden by row security).
    #[error("Record not found")]
    NotFound,

    /// A response row did not have the expected shape.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Unrecognised failure. Never retried.
    #[error("Remote API error: {message}")]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }

    /// PostgREST's "zero rows for a single-object request".
    pub(crate) fn is_no_rows(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if code == "PGRST116")
    }

    /// Postgres `unique_violation`, reported by PostgREST as a 409.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Api { code: Some(code), .. } if code == "23505")
    }

    /// Classify a transport-level failure. Anything reqwest reports before a
    /// status line is received counts as connectivity.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return classify(status.as_u16(), Route::Table, &ErrorBody::default());
        }
        if err.is_decode() {
            return Self::Api {
                status: None,
                code: None,
                message: err.to_string(),
            };
        }
        Self::Connectivity(err.to_string())
    }
}

/// Which family of endpoints produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/rest/v1/<table>`
    Table,
    /// `/auth/v1/...`
    Auth,
}

/// Union of the PostgREST and GoTrue error payloads.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| Self {
            message: (!raw.trim().is_empty()).then(|| raw.trim().to_string()),
            ..Default::default()
        })
    }

    /// The structured error code: PostgREST's string `code`, or GoTrue's
    /// `error_code`. Numeric GoTrue `code`s are HTTP statuses and ignored.
    pub fn code(&self) -> Option<&str> {
        match self.code {
            Some(serde_json::Value::String(ref c)) => Some(c.as_str()),
            _ => self.error_code.as_deref(),
        }
    }

    pub fn message(&self) -> String {
        self.message
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
            .unwrap_or("no details")
            .to_string()
    }
}

const AUTH_CODES: &[&str] = &["PGRST301", "PGRST302"];
const PRIVILEGE_CODES: &[&str] = &["42501"];
const SCHEMA_CODES: &[&str] = &["42P01", "42703", "42804", "22P02", "PGRST204", "PGRST205"];

/// Map a failed response onto the error taxonomy.
///
/// Known codes win over the status. Unknown combinations are terminal.
pub fn classify(status: u16, route: Route, body: &ErrorBody) -> RemoteError {
    let message = body.message();
    let code = body.code();

    if let Some(code) = code {
        if AUTH_CODES.contains(&code) {
            return RemoteError::AuthRequired(message);
        }
        if PRIVILEGE_CODES.contains(&code) {
            return RemoteError::AuthorizationDenied(message);
        }
        if SCHEMA_CODES.contains(&code) {
            return RemoteError::SchemaMissing(message);
        }
    }

    match status {
        401 => RemoteError::AuthRequired(message),
        403 => RemoteError::AuthorizationDenied(message),
        404 if route == Route::Table => RemoteError::SchemaMissing(message),
        408 | 500..=599 => RemoteError::Connectivity(format!("HTTP {status}: {message}")),
        400 | 422 if route == Route::Auth => RemoteError::Rejected(message),
        _ => RemoteError::Api {
            status: Some(status),
            code: code.map(str::to_string),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: &str) -> ErrorBody {
        ErrorBody::parse(json)
    }

    #[test]
    fn server_errors_and_timeouts_are_connectivity() {
        for status in [500, 502, 503, 504, 408] {
            let err = classify(status, Route::Table, &ErrorBody::default());
            assert!(err.is_transient(), "status {status}");
        }
    }

    #[test]
    fn auth_statuses_and_codes() {
        assert!(matches!(
            classify(401, Route::Table, &ErrorBody::default()),
            RemoteError::AuthRequired(_)
        ));
        assert!(matches!(
            classify(400, Route::Table, &body(r#"{"code":"PGRST301","message":"JWT expired"}"#)),
            RemoteError::AuthRequired(_)
        ));
        assert!(matches!(
            classify(403, Route::Table, &ErrorBody::default()),
            RemoteError::AuthorizationDenied(_)
        ));
    }

    #[test]
    fn row_security_violation_is_denied_not_transient() {
        let err = classify(
            400,
            Route::Table,
            &body(r#"{"code":"42501","message":"new row violates row-level security policy"}"#),
        );
        assert!(matches!(err, RemoteError::AuthorizationDenied(ref m) if m.contains("row-level")));
        assert!(!err.is_transient());
    }

    #[test]
    fn schema_codes_win_over_server_status() {
        let err = classify(
            500,
            Route::Table,
            &body(r#"{"code":"42P01","message":"relation \"products\" does not exist"}"#),
        );
        assert!(matches!(err, RemoteError::SchemaMissing(_)));

        for code in ["42703", "42804", "22P02", "PGRST204", "PGRST205"] {
            let raw = format!(r#"{{"code":"{code}","message":"x"}}"#);
            assert!(matches!(
                classify(400, Route::Table, &body(&raw)),
                RemoteError::SchemaMissing(_)
            ));
        }
    }

    #[test]
    fn not_found_depends_on_route() {
        assert!(matches!(
            classify(404, Route::Table, &ErrorBody::default()),
            RemoteError::SchemaMissing(_)
        ));
        assert!(matches!(
            classify(404, Route::Auth, &ErrorBody::default()),
            RemoteError::Api { status: Some(404), .. }
        ));
    }

    #[test]
    fn bad_credentials_are_rejected_with_message() {
        let err = classify(
            400,
            Route::Auth,
            &body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
        );
        assert!(matches!(err, RemoteError::Rejected(ref m) if m == "Invalid login credentials"));

        let err = classify(
            422,
            Route::Auth,
            &body(r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#),
        );
        assert!(matches!(err, RemoteError::Rejected(ref m) if m == "User already registered"));
    }

    #[test]
    fn unknown_errors_default_to_terminal() {
        let err = classify(409, Route::Table, &body(r#"{"code":"23505","message":"duplicate key"}"#));
        assert!(!err.is_transient());
        assert!(matches!(
            err,
            RemoteError::Api { status: Some(409), code: Some(ref c), .. } if c == "23505"
        ));
    }

    #[test]
    fn no_rows_is_recognised() {
        let err = classify(
            406,
            Route::Table,
            &body(r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#),
        );
        assert!(err.is_no_rows());
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let parsed = ErrorBody::parse("upstream connect error");
        assert_eq!(parsed.message(), "upstream connect error");
        assert!(parsed.code().is_none());
    }
}
