//! Retrying form upload. Each attempt has its own timeout and transient
//! failures are retried with a linear backoff

use super::FetchError;
use crate::{ctx::ClientContext, notify::LoadingGuard};
use bytes::Bytes;
use log::{debug, error, warn};
use reqwest::{
    multipart::{Form, Part},
    RequestBuilder,
};
use serde::de::DeserializeOwned;
use std::{future::Future, time::Duration};

/// Base delay for the linear backoff between attempts
pub const RETRY_DELAY_MS: u64 = 1000;
/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_COUNT: u32 = 2;
/// Default indicator text
const FETCH_LOADING_TEXT: &str = "processing...";

/// File attached to a [FormPayload]
#[derive(Debug, Clone)]
struct FilePart {
    field: String,
    file_name: String,
    bytes: Bytes,
}

/// Multipart form contents that can be rebuilt for every attempt
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Adds a file field from in memory bytes
    ///
    /// ## Arguments
    /// * `name`      - The form field name
    /// * `file_name` - The file name reported to the server
    /// * `bytes`     - The file contents
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        self.files.push(FilePart {
            field: name.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
        });
        self
    }

    /// Creates a fresh multipart form from the payload
    pub fn to_form(&self) -> Form {
        let form = self
            .fields
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });

        self.files.iter().fold(form, |form, file| {
            let part = Part::stream(file.bytes.clone()).file_name(file.file_name.clone());
            form.part(file.field.clone(), part)
        })
    }
}

/// Options for [api_fetch]
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Show the loading indicator while the request is running
    pub show_loading: bool,
    /// Text for the loading indicator
    pub loading_text: Option<String>,
    /// Don't show a notice when the request fails
    pub silent: bool,
    /// Timeout for each individual attempt
    pub timeout: Duration,
    /// Number of retries allowed after the first attempt
    pub retry_count: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            show_loading: true,
            loading_text: None,
            silent: false,
            timeout: Duration::from_millis(30_000),
            retry_count: DEFAULT_RETRY_COUNT,
        }
    }
}

/// Bounds for the retry loop
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries allowed after the first attempt
    pub retry_count: u32,
    /// Timeout for each individual attempt
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (zero based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(RETRY_DELAY_MS * (attempt as u64 + 1))
    }
}

/// States of the retry loop
enum RetryState<T> {
    /// Running the attempt with the provided zero based index
    Attempting { attempt: u32 },
    /// Waiting before the attempt after `attempt`
    Waiting { attempt: u32, delay: Duration },
    Succeeded(T),
    Exhausted(FetchError),
}

/// Runs the operation until it succeeds, fails with an error that is not
/// retryable or runs out of attempts. Operations that exceed the policy
/// timeout are dropped and treated as [FetchError::TimedOut]
///
/// ## Arguments
/// * `policy`    - The retry bounds
/// * `operation` - Creates the future for the provided attempt index
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut state = RetryState::Attempting { attempt: 0 };

    loop {
        state = match state {
            RetryState::Attempting { attempt } => {
                let result = tokio::time::timeout(policy.timeout, operation(attempt))
                    .await
                    .unwrap_or_else(|_| Err(FetchError::TimedOut));

                match result {
                    Ok(value) => RetryState::Succeeded(value),
                    Err(err) if err.is_retryable() && attempt < policy.retry_count => {
                        let delay = policy.backoff(attempt);
                        warn!(
                            "Attempt {}/{} failed ({}), retrying in {}ms",
                            attempt + 1,
                            policy.retry_count + 1,
                            err,
                            delay.as_millis()
                        );
                        RetryState::Waiting { attempt, delay }
                    }
                    Err(err) => RetryState::Exhausted(err),
                }
            }
            RetryState::Waiting { attempt, delay } => {
                tokio::time::sleep(delay).await;
                RetryState::Attempting {
                    attempt: attempt + 1,
                }
            }
            RetryState::Succeeded(value) => return Ok(value),
            RetryState::Exhausted(err) => return Err(err),
        };
    }
}

/// Posts a multipart form to the provided path retrying timeouts and
/// network failures, resolving with the parsed JSON body
///
/// ## Arguments
/// * `ctx`     - The client context
/// * `path`    - Relative path or absolute URL
/// * `payload` - The form contents
/// * `options` - Fetch options
pub async fn api_fetch<T>(
    ctx: &ClientContext,
    path: &str,
    payload: &FormPayload,
    options: FetchOptions,
) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let url = ctx.build_url(path);
    let loading_text = options.loading_text.as_deref().unwrap_or(FETCH_LOADING_TEXT);
    let _loading = LoadingGuard::show(ctx.notifier.as_ref(), options.show_loading, loading_text);

    let policy = RetryPolicy {
        retry_count: options.retry_count,
        timeout: options.timeout,
    };

    let result = run_with_retry(&policy, |attempt| {
        debug!("FETCH {} (attempt {})", url, attempt + 1);
        let request = ctx.http_client.post(url.as_str()).multipart(payload.to_form());
        send_form(request)
    })
    .await;

    if let Err(err) = &result {
        error!("[API Error] {}: {:?}", path, err);
        if !options.silent {
            ctx.notifier
                .show_notice(&err.to_string(), ctx.config.fetch_notice_duration);
        }
    }

    result
}

/// Sends a single attempt of the form upload
async fn send_form<T>(request: RequestBuilder) -> Result<T, FetchError>
where
    T: DeserializeOwned,
{
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await?;
        return Err(FetchError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
