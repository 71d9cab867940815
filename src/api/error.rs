//! Error types for the request functions. The [std::fmt::Display] text of
//! each error is the user facing message that is shown to the user

use log::error;
use reqwest::StatusCode;
use std::error::Error as StdError;
use thiserror::Error;

/// Typed categories for failures below the HTTP layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request did not complete within its timeout
    #[error("request timed out")]
    Timeout,
    /// The server actively refused the connection
    #[error("network error: connection refused")]
    ConnectionRefused,
    /// The server could not be reached (DNS failure, no route, etc)
    #[error("network error: unreachable ({0})")]
    Unreachable(String),
    /// Any other failure while sending the request or reading the body
    #[error("network error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout;
        }

        if err.is_connect() {
            if io_error_kind(&err) == Some(std::io::ErrorKind::ConnectionRefused) {
                return TransportError::ConnectionRefused;
            }
            return TransportError::Unreachable(error_chain(&err));
        }

        TransportError::Other(error_chain(&err))
    }
}

/// Finds the kind of the first IO error in the source chain
fn io_error_kind(err: &(dyn StdError + 'static)) -> Option<std::io::ErrorKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(value) = current {
        if let Some(io) = value.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        current = value.source();
    }
    None
}

/// Joins the messages of the error and its sources
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(value) = current {
        message.push_str(": ");
        message.push_str(&value.to_string());
        current = value.source();
    }
    message
}

/// Message for a non-success HTTP status
pub fn status_message(status: StatusCode) -> String {
    match status {
        StatusCode::BAD_REQUEST => "bad request parameters".to_string(),
        StatusCode::NOT_FOUND => "endpoint not found".to_string(),
        StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
        status => format!("request failed ({})", status.as_u16()),
    }
}

/// Errors from the GET, POST and upload functions
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure that is either a timeout or a network failure
    #[error("{}", transport_message(.0))]
    Transport(TransportError),
    /// Server replied with a status other than 200
    #[error("{}", status_message(*.0))]
    Status(StatusCode),
    /// Response body was not the expected JSON
    #[error("response parse failed")]
    Parse(#[source] serde_json::Error),
    /// Anything else, carries the underlying message if there was one
    #[error("{}", other_message(.0))]
    Other(Option<String>),
}

fn transport_message(err: &TransportError) -> &'static str {
    match err {
        TransportError::Timeout => "request timed out, check network and retry",
        _ => "network connection failed, check backend service",
    }
}

fn other_message(message: &Option<String>) -> &str {
    match message.as_deref() {
        Some(value) if !value.is_empty() => value,
        _ => "unknown error",
    }
}

/// Logs the failure of a request and returns the message that should be
/// presented to the user
///
/// ## Arguments
/// * `context` - Description of the request (usually the path)
/// * `err`     - The error that occurred
pub fn handle_error(context: &str, err: &ApiError) -> String {
    match err {
        ApiError::Transport(cause) => error!("[API Error] {}: {:?}", context, cause),
        ApiError::Parse(cause) => error!("[API Error] {}: {}", context, cause),
        _ => error!("[API Error] {}: {}", context, err),
    }
    err.to_string()
}

/// Errors from the retrying form upload
#[derive(Debug, Error)]
pub enum FetchError {
    /// The final attempt ran out of time
    #[error("request timed out, please retry")]
    TimedOut,
    /// Request failed below the HTTP layer
    #[error("{0}")]
    Transport(TransportError),
    /// Server replied with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body was not valid JSON
    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Timeouts and network failures are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::TimedOut | FetchError::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match TransportError::from(err) {
            TransportError::Timeout => FetchError::TimedOut,
            err => FetchError::Transport(err),
        }
    }
}
