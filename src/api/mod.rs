//! Request functions for talking to the backend. Failures are classified
//! into user facing messages which are also shown as a notice unless the
//! request is silent

use crate::{config::RequestConfig, ctx::ClientContext, notify::LoadingGuard};
use log::debug;
use reqwest::{
    header,
    multipart::{Form, Part},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

pub mod endpoints;
pub mod error;
pub mod fetch;

pub use error::{handle_error, ApiError, FetchError, TransportError};

/// Default indicator text for GET requests
const GET_LOADING_TEXT: &str = "loading...";
/// Default indicator text for POST requests
const POST_LOADING_TEXT: &str = "processing...";
/// Default indicator text for uploads
const UPLOAD_LOADING_TEXT: &str = "uploading...";
/// Multipart field name used for uploaded files by default
pub const DEFAULT_FILE_FIELD: &str = "file";

/// Creates a new HTTP client to use with the configured user agent
///
/// ## Arguments
/// * `config` - The request configuration
pub fn create_http_client(config: &RequestConfig) -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(&config.user_agent).build()
}

/// Per call options for GET and POST requests
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Show the loading indicator while the request is running
    pub show_loading: bool,
    /// Text for the loading indicator, each request kind has its own default
    pub loading_text: Option<String>,
    /// Don't show a notice when the request fails
    pub silent: bool,
}

impl RequestOptions {
    /// Options that suppress the failure notice
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Default::default()
        }
    }

    /// Options that show the loading indicator with the provided text
    pub fn loading(text: impl Into<String>) -> Self {
        Self {
            show_loading: true,
            loading_text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Per call options for file uploads
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Show the loading indicator while uploading
    pub show_loading: bool,
    /// Text for the loading indicator
    pub loading_text: Option<String>,
    /// Don't show a notice when the upload fails
    pub silent: bool,
    /// Multipart field name for the file
    pub file_name: String,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            show_loading: true,
            loading_text: None,
            silent: false,
            file_name: DEFAULT_FILE_FIELD.to_string(),
        }
    }
}

/// Sends a GET request to the provided path, resolving with the parsed
/// JSON body when the server responds with 200
///
/// ## Arguments
/// * `ctx`     - The client context
/// * `path`    - Relative path or absolute URL
/// * `options` - Request options
pub async fn api_get<T>(
    ctx: &ClientContext,
    path: &str,
    options: RequestOptions,
) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let url = ctx.build_url(path);
    debug!("GET {}", url);

    let request = ctx.http_client.get(url);
    let loading_text = options.loading_text.as_deref().unwrap_or(GET_LOADING_TEXT);

    execute(ctx, path, request, options.show_loading, loading_text, options.silent).await
}

/// Sends a POST request with a JSON body to the provided path, resolving
/// with the parsed JSON body when the server responds with 200
///
/// ## Arguments
/// * `ctx`     - The client context
/// * `path`    - Relative path or absolute URL
/// * `body`    - Value to send as the JSON body
/// * `options` - Request options
pub async fn api_post<B, T>(
    ctx: &ClientContext,
    path: &str,
    body: &B,
    options: RequestOptions,
) -> Result<T, ApiError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let url = ctx.build_url(path);
    debug!("POST {}", url);

    let request = ctx
        .http_client
        .post(url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(body);
    let loading_text = options.loading_text.as_deref().unwrap_or(POST_LOADING_TEXT);

    execute(ctx, path, request, options.show_loading, loading_text, options.silent).await
}

/// Uploads a local file as multipart form data along with additional
/// form fields
///
/// ## Arguments
/// * `ctx`       - The client context
/// * `path`      - Relative path or absolute URL
/// * `file_path` - Path to the local file
/// * `form_data` - Additional text fields
/// * `options`   - Upload options
pub async fn api_upload<T>(
    ctx: &ClientContext,
    path: &str,
    file_path: &Path,
    form_data: &[(&str, &str)],
    options: UploadOptions,
) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let url = ctx.build_url(path);
    debug!("UPLOAD {} -> {}", file_path.display(), url);

    let loading_text = options.loading_text.as_deref().unwrap_or(UPLOAD_LOADING_TEXT);
    let _loading = LoadingGuard::show(ctx.notifier.as_ref(), options.show_loading, loading_text);

    let result = match read_upload_form(file_path, form_data, &options.file_name).await {
        Ok(form) => send_request(ctx, ctx.http_client.post(url).multipart(form)).await,
        Err(err) => Err(err),
    };

    report(ctx, path, options.silent, result)
}

/// Reads the local file and creates the multipart form for an upload
async fn read_upload_form(
    file_path: &Path,
    form_data: &[(&str, &str)],
    field_name: &str,
) -> Result<Form, ApiError> {
    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|err| ApiError::Other(Some(err.to_string())))?;

    let mut part = Part::bytes(bytes);
    if let Some(name) = file_path.file_name().and_then(|name| name.to_str()) {
        part = part.file_name(name.to_string());
    }

    let form = form_data
        .iter()
        .fold(Form::new(), |form, (key, value)| {
            form.text(key.to_string(), value.to_string())
        })
        .part(field_name.to_string(), part);

    Ok(form)
}

/// Runs a request with the loading indicator and failure reporting
async fn execute<T>(
    ctx: &ClientContext,
    path: &str,
    request: RequestBuilder,
    show_loading: bool,
    loading_text: &str,
    silent: bool,
) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let _loading = LoadingGuard::show(ctx.notifier.as_ref(), show_loading, loading_text);
    let result = send_request(ctx, request).await;
    report(ctx, path, silent, result)
}

/// Sends the request and parses the body of a 200 response
async fn send_request<T>(ctx: &ClientContext, request: RequestBuilder) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let response = request
        .timeout(ctx.config.timeout)
        .send()
        .await
        .map_err(|err| ApiError::Transport(TransportError::from(err)))?;

    let status = response.status();
    debug!("Response Status: {}", status);

    if status != StatusCode::OK {
        return Err(ApiError::Status(status));
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| ApiError::Transport(TransportError::from(err)))?;

    serde_json::from_slice(&body).map_err(ApiError::Parse)
}

/// Classifies a failed result and shows the notice for it
fn report<T>(
    ctx: &ClientContext,
    path: &str,
    silent: bool,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    if let Err(err) = &result {
        let message = handle_error(path, err);
        if !silent {
            ctx.notifier
                .show_notice(&message, ctx.config.notice_duration);
        }
    }
    result
}
