//! Fixed path requests for the backend endpoints used by the app

use super::{api_get, ApiError, RequestOptions};
use crate::ctx::ClientContext;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Endpoint listing the available courses
pub const COURSES_ENDPOINT: &str = "/courses";
/// Endpoint for the user learning statistics
pub const STATS_ENDPOINT: &str = "/stats";
/// Endpoint for the weekly mood report
pub const MOOD_WEEKLY_ENDPOINT: &str = "/mood/weekly";
/// Endpoint for the words the user struggles with
pub const WEAK_WORDS_ENDPOINT: &str = "/weak_words";
/// Endpoint for the learning records
pub const RECORDS_ENDPOINT: &str = "/records";
/// Endpoint providing a random story
pub const STORY_ENDPOINT: &str = "/chat/story";
/// Endpoint listing the story categories
pub const STORY_CATEGORIES_ENDPOINT: &str = "/chat/categories";

/// Default number of entries requested from list endpoints
pub const DEFAULT_LIMIT: u32 = 50;

/// Outcome of [test_connection]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
}

pub async fn fetch_courses(ctx: &ClientContext) -> Result<Value, ApiError> {
    api_get(ctx, COURSES_ENDPOINT, RequestOptions::silent()).await
}

pub async fn fetch_stats(ctx: &ClientContext) -> Result<Value, ApiError> {
    let path = format!("{}?user_id={}", STATS_ENDPOINT, ctx.user_id());
    api_get(ctx, &path, RequestOptions::silent()).await
}

pub async fn fetch_mood_weekly(ctx: &ClientContext) -> Result<Value, ApiError> {
    let path = format!("{}?user_id={}", MOOD_WEEKLY_ENDPOINT, ctx.user_id());
    api_get(ctx, &path, RequestOptions::silent()).await
}

/// Words the user most often gets wrong
///
/// ## Arguments
/// * `ctx`   - The client context
/// * `limit` - Maximum number of words
pub async fn fetch_weak_words(ctx: &ClientContext, limit: u32) -> Result<Value, ApiError> {
    let path = format!(
        "{}?user_id={}&limit={}",
        WEAK_WORDS_ENDPOINT,
        ctx.user_id(),
        limit
    );
    api_get(ctx, &path, RequestOptions::silent()).await
}

/// Recent learning records for the user
///
/// ## Arguments
/// * `ctx`   - The client context
/// * `limit` - Maximum number of records
pub async fn fetch_records(ctx: &ClientContext, limit: u32) -> Result<Value, ApiError> {
    let path = format!(
        "{}?user_id={}&limit={}",
        RECORDS_ENDPOINT,
        ctx.user_id(),
        limit
    );
    api_get(ctx, &path, RequestOptions::silent()).await
}

/// Obtains a random story, optionally restricted to a category. Shows the
/// loading indicator and reports failures to the user
///
/// ## Arguments
/// * `ctx`      - The client context
/// * `category` - Optional category to pick the story from
pub async fn fetch_story(ctx: &ClientContext, category: Option<&str>) -> Result<Value, ApiError> {
    let path = match category.filter(|value| !value.is_empty()) {
        Some(category) => {
            let encoded: String = form_urlencoded::byte_serialize(category.as_bytes()).collect();
            format!("{}?category={}", STORY_ENDPOINT, encoded)
        }
        None => STORY_ENDPOINT.to_string(),
    };
    api_get(ctx, &path, RequestOptions::loading("preparing story...")).await
}

pub async fn fetch_story_categories(ctx: &ClientContext) -> Result<Value, ApiError> {
    api_get(ctx, STORY_CATEGORIES_ENDPOINT, RequestOptions::silent()).await
}

/// Checks whether the backend can be reached, never fails
pub async fn test_connection(ctx: &ClientContext) -> ConnectionStatus {
    match api_get::<Value>(ctx, COURSES_ENDPOINT, RequestOptions::silent()).await {
        Ok(_) => ConnectionStatus {
            success: true,
            message: "connection succeeded".to_string(),
        },
        Err(err) => ConnectionStatus {
            success: false,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::context;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_user_scoped_calls_send_user_id() {
        let mut server = mockito::Server::new_async().await;
        let stats = server
            .mock("GET", "/stats")
            .match_query(Matcher::UrlEncoded("user_id".into(), "4".into()))
            .with_status(200)
            .with_body(r#"{"streak": 3}"#)
            .create_async()
            .await;
        let words = server
            .mock("GET", "/weak_words")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "4".into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(r#"["ni", "hao"]"#)
            .create_async()
            .await;

        let (ctx, notifier) = context(&server.url());
        ctx.set_user_id(4.0).unwrap();

        assert_eq!(fetch_stats(&ctx).await.unwrap(), json!({"streak": 3}));
        assert_eq!(
            fetch_weak_words(&ctx, 10).await.unwrap(),
            json!(["ni", "hao"])
        );

        stats.assert_async().await;
        words.assert_async().await;
        assert!(notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_records_and_mood() {
        let mut server = mockito::Server::new_async().await;
        let records = server
            .mock("GET", "/records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("user_id".into(), "1".into()),
                Matcher::UrlEncoded("limit".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let mood = server
            .mock("GET", "/mood/weekly")
            .match_query(Matcher::UrlEncoded("user_id".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"happy": 2}"#)
            .create_async()
            .await;

        let (ctx, _notifier) = context(&server.url());

        assert_eq!(fetch_records(&ctx, DEFAULT_LIMIT).await.unwrap(), json!([]));
        assert_eq!(fetch_mood_weekly(&ctx).await.unwrap(), json!({"happy": 2}));

        records.assert_async().await;
        mood.assert_async().await;
    }

    #[tokio::test]
    async fn test_story_category_is_encoded() {
        let mut server = mockito::Server::new_async().await;
        let story = server
            .mock("GET", "/chat/story")
            .match_query(Matcher::UrlEncoded("category".into(), "daily life".into()))
            .with_status(200)
            .with_body(r#"{"title": "At the market"}"#)
            .create_async()
            .await;

        let (ctx, notifier) = context(&server.url());
        let value = fetch_story(&ctx, Some("daily life")).await.unwrap();

        story.assert_async().await;
        assert_eq!(value, json!({"title": "At the market"}));
        assert_eq!(notifier.count_shown(), 1);
        assert_eq!(notifier.count_hidden(), 1);
    }

    #[tokio::test]
    async fn test_story_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/chat/story")
            .with_status(500)
            .create_async()
            .await;

        let (ctx, notifier) = context(&server.url());
        let err = fetch_story(&ctx, None).await.unwrap_err();

        assert_eq!(err.to_string(), "internal server error");
        assert_eq!(notifier.notices(), vec!["internal server error".to_string()]);
    }

    #[tokio::test]
    async fn test_courses_and_categories_are_silent() {
        let mut server = mockito::Server::new_async().await;
        let _courses = server
            .mock("GET", "/courses")
            .with_status(404)
            .create_async()
            .await;
        let _categories = server
            .mock("GET", "/chat/categories")
            .with_status(200)
            .with_body(r#"["travel"]"#)
            .create_async()
            .await;

        let (ctx, notifier) = context(&server.url());

        assert!(fetch_courses(&ctx).await.is_err());
        assert_eq!(
            fetch_story_categories(&ctx).await.unwrap(),
            json!(["travel"])
        );
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_connection_reports_success() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/courses")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (ctx, _notifier) = context(&server.url());
        let status = test_connection(&ctx).await;

        assert!(status.success);
        assert_eq!(status.message, "connection succeeded");
    }

    #[tokio::test]
    async fn test_connection_reports_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/courses")
            .with_status(500)
            .create_async()
            .await;

        let (ctx, notifier) = context(&server.url());
        let status = test_connection(&ctx).await;

        assert_eq!(
            status,
            ConnectionStatus {
                success: false,
                message: "internal server error".to_string()
            }
        );
        assert!(notifier.notices().is_empty());
    }
}
