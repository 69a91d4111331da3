use super::types::{
    CommentSubmission, Envelope, EpisodeDetail, EpisodeKey, Novel, NovelDetail,
};
use crate::feed::{FetchError, PageFetcher, QueryContext};
use futures::StreamExt;
use lru::LruCache;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://prpropertystore.com/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const API_KEY_HEADER: &str = "X-API-KEY";
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const DETAIL_CACHE_CAPACITY: usize = 32;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from the detail, episode and comment endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] FetchError),
    #[error("Missing required field: {0}")]
    InvalidInput(&'static str),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

impl ApiError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Request(e) => e.user_message(),
            Self::InvalidInput(field) => format!("Please fill in the {} field", field),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// Redirect policy: at most 3 hops, no loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// Parse `base` and enforce HTTPS. Plain HTTP is accepted only for
/// localhost/127.0.0.1, which is what test servers bind to.
pub fn validate_base_url(base: &str) -> Result<Url, ApiError> {
    let url = Url::parse(base).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;
    match url.scheme() {
        "https" => Ok(url),
        "http" if matches!(url.host_str(), Some("localhost") | Some("127.0.0.1")) => {
            tracing::warn!(base_url = %base, "Using non-HTTPS API base URL (localhost only)");
            Ok(url)
        }
        "http" => {
            tracing::error!(base_url = %base, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
            Err(ApiError::InsecureBaseUrl)
        }
        other => Err(ApiError::InvalidBaseUrl(format!("unsupported scheme {}", other))),
    }
}

// ============================================================================
// Catalog Client
// ============================================================================

/// HTTP client for the catalog API.
///
/// Cheap to share behind an `Arc`; the detail cache is internally locked.
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
    timeout: Duration,
    details: Mutex<LruCache<String, NovelDetail>>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CatalogClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)?;

        let http = reqwest::Client::builder()
            .redirect(create_redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if api_key.is_none() {
            tracing::warn!("No API key configured; the catalog server may reject requests");
        }

        let capacity = NonZeroUsize::new(DETAIL_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            http,
            base_url,
            api_key,
            timeout,
            details: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{segments...}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL for one page of `context`, or `None` when the context has no such
    /// page (search is a single unpaged result set).
    pub fn page_url(&self, context: &QueryContext, page: u32) -> Result<Option<Url>, FetchError> {
        let url = match context {
            QueryContext::Catalog => {
                let mut url = self.endpoint(&["novels"])?;
                url.query_pairs_mut().append_pair("page", &page.to_string());
                url
            }
            QueryContext::TypeFilter(genre) => {
                let mut url = self.endpoint(&["type"])?;
                url.query_pairs_mut()
                    .append_pair("type", genre)
                    .append_pair("page", &page.to_string());
                url
            }
            QueryContext::SearchTerm(_) if page > 1 => return Ok(None),
            QueryContext::SearchTerm(term) => {
                let mut url = self.endpoint(&["search"])?;
                url.query_pairs_mut()
                    .append_pair("query", &term.to_lowercase());
                url
            }
        };
        Ok(Some(url))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }

    /// Send `request` and return the body, bounded by the configured timeout
    /// and the response size cap.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>, FetchError> {
        let request = self.authorize(request);
        let exchange = async {
            let response = request.send().await.map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Server(status.as_u16()));
            }
            read_limited_bytes(response, MAX_RESPONSE_SIZE).await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                FetchError::Transport(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
    }

    async fn get_data<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        tracing::debug!(url = %url, "GET");
        let body = self.execute(self.http.get(url)).await?;
        decode_data(&body)
    }

    /// One page of novels for `context`.
    pub async fn fetch_novels(
        &self,
        context: &QueryContext,
        page: u32,
    ) -> Result<Vec<Novel>, FetchError> {
        let Some(url) = self.page_url(context, page)? else {
            tracing::debug!(context = %context, page, "Context is unpaged, reporting end of data");
            return Ok(Vec::new());
        };
        let novels: Vec<Novel> = self.get_data(url).await?;
        tracing::debug!(context = %context, page, count = novels.len(), "Fetched novels");
        Ok(novels)
    }

    /// Detail page for the novel titled `title`, served from the session
    /// cache when present.
    pub async fn fetch_detail(&self, title: &str) -> Result<NovelDetail, ApiError> {
        if title.trim().is_empty() {
            return Err(ApiError::InvalidInput("title"));
        }
        if let Some(hit) = self.cached_detail(title) {
            tracing::debug!(title = %title, "Detail cache hit");
            return Ok(hit);
        }

        let mut url = self.endpoint(&["detail"])?;
        url.query_pairs_mut().append_pair("title", title);
        let mut detail: NovelDetail = self.get_data(url).await?;
        detail.sort_episodes();

        self.cache_detail(title, &detail);
        Ok(detail)
    }

    pub async fn fetch_episode(&self, key: &EpisodeKey) -> Result<EpisodeDetail, ApiError> {
        let episode = key.episode_no.to_string();
        let url = self.endpoint(&["episodedetail", &key.novel_id.0, &episode])?;
        Ok(self.get_data(url).await?)
    }

    /// Post a comment. Blank fields are rejected before any request is made.
    pub async fn submit_comment(&self, submission: &CommentSubmission) -> Result<(), ApiError> {
        if let Some(field) = submission.missing_field() {
            return Err(ApiError::InvalidInput(field));
        }
        let url = self.endpoint(&["submitcomment"])?;
        let body = serde_json::to_vec(submission)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        tracing::debug!(novel_id = %submission.id, episode = %submission.episode_id, "POST comment");

        let request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        self.execute(request).await?;
        Ok(())
    }

    fn cached_detail(&self, title: &str) -> Option<NovelDetail> {
        match self.details.lock() {
            Ok(mut cache) => cache.get(title).cloned(),
            Err(poisoned) => poisoned.into_inner().get(title).cloned(),
        }
    }

    fn cache_detail(&self, title: &str, detail: &NovelDetail) {
        let mut cache = match self.details.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.put(title.to_string(), detail.clone());
    }
}

impl PageFetcher<Novel> for CatalogClient {
    async fn fetch_page(
        &self,
        context: &QueryContext,
        page: u32,
    ) -> Result<Vec<Novel>, FetchError> {
        self.fetch_novels(context, page).await
    }
}

// ============================================================================
// Response Handling
// ============================================================================

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport("request timed out".to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Unwrap `{"data": ...}`. A missing or null `data` is malformed.
fn decode_data<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    let envelope: Envelope<T> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    envelope
        .data
        .ok_or_else(|| FetchError::Decode("response has no `data` field".to_string()))
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let too_large = || FetchError::Transport(format!("response exceeds {} bytes", limit));

    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(too_large());
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(transport_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Public web page for a novel, for handing to the system browser.
pub fn novel_page_url(site_url: &str, title: &str) -> Option<Url> {
    let mut url = Url::parse(site_url).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["novel", "item"]);
    url.query_pairs_mut().append_pair("title", title);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::NovelId;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> CatalogClient {
        CatalogClient::new(
            &format!("{}/api", server.uri()),
            Some(SecretString::from("test-key".to_string())),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_http_base_url_rejected() {
        let result = CatalogClient::new("http://evil.com/api", None, DEFAULT_TIMEOUT);
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[test]
    fn test_localhost_base_url_allowed() {
        assert!(validate_base_url("http://127.0.0.1:8080/api").is_ok());
        assert!(validate_base_url("http://localhost/api").is_ok());
        assert!(validate_base_url(DEFAULT_BASE_URL).is_ok());
    }

    #[test]
    fn test_garbage_base_url_rejected() {
        assert!(matches!(
            validate_base_url("not a url"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            validate_base_url("ftp://example.com"),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_page_urls() {
        let client = CatalogClient::new(DEFAULT_BASE_URL, None, DEFAULT_TIMEOUT).unwrap();

        let url = client.page_url(&QueryContext::Catalog, 3).unwrap().unwrap();
        assert_eq!(url.as_str(), "https://prpropertystore.com/api/novels?page=3");

        let url = client
            .page_url(&QueryContext::type_filter("시대/역사"), 1)
            .unwrap()
            .unwrap();
        assert_eq!(url.path(), "/api/type");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("type".to_string(), "시대/역사".to_string()),
                ("page".to_string(), "1".to_string())
            ]
        );

        let url = client
            .page_url(&QueryContext::SearchTerm("Dragon".into()), 1)
            .unwrap()
            .unwrap();
        assert_eq!(url.as_str(), "https://prpropertystore.com/api/search?query=dragon");
        assert!(client
            .page_url(&QueryContext::search("dragon"), 2)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_debug_masks_api_key() {
        let client = CatalogClient::new(
            DEFAULT_BASE_URL,
            Some(SecretString::from("super-secret".to_string())),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let out = format!("{:?}", client);
        assert!(!out.contains("super-secret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn test_novel_page_url() {
        let url = novel_page_url("https://example.com", "My Novel").unwrap();
        assert_eq!(url.as_str(), "https://example.com/novel/item?title=My+Novel");
    }

    #[tokio::test]
    async fn test_fetch_catalog_page_sends_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/novels"))
            .and(query_param("page", "2"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"id": 1, "title": "A", "img": null}, {"id": 2, "title": "B"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let novels = client_for(&server)
            .fetch_novels(&QueryContext::Catalog, 2)
            .await
            .unwrap();
        assert_eq!(novels.len(), 2);
        assert_eq!(novels[1].id, NovelId::from(2u64));
    }

    #[tokio::test]
    async fn test_fetch_genre_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/type"))
            .and(query_param("type", "무협"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": [{"id": "x1", "title": "Sword"}]})),
            )
            .mount(&server)
            .await;

        let novels = client_for(&server)
            .fetch_novels(&QueryContext::type_filter("무협"), 1)
            .await
            .unwrap();
        assert_eq!(novels[0].title, "Sword");
    }

    #[tokio::test]
    async fn test_search_second_page_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let novels = client_for(&server)
            .fetch_novels(&QueryContext::search("hero"), 2)
            .await
            .unwrap();
        assert!(novels.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_maps_to_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_novels(&QueryContext::Catalog, 1)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Server(503));
    }

    #[tokio::test]
    async fn test_null_data_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": null})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_novels(&QueryContext::Catalog, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_novels(&QueryContext::Catalog, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out_as_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = CatalogClient::new(
            &format!("{}/api", server.uri()),
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client
            .fetch_novels(&QueryContext::Catalog, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_oversized_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_SIZE + 1)))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_novels(&QueryContext::Catalog, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_fetch_detail_sorts_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/detail"))
            .and(query_param("title", "Moon Blade"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": 9, "title": "Moon Blade", "description": "d", "img": null,
                    "viewer_counts": [
                        {"episode_no": 1, "viewer_count": 5},
                        {"episode_no": 2, "viewer_count": 3}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let detail = client.fetch_detail("Moon Blade").await.unwrap();
        assert_eq!(detail.viewer_counts[0].episode_no, 2);

        // Second call is served from the cache; the mock expects one hit
        let again = client.fetch_detail("Moon Blade").await.unwrap();
        assert_eq!(again, detail);
    }

    #[tokio::test]
    async fn test_fetch_episode_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/episodedetail/9/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "episode": {"episode_titles": "Dawn", "description": "line1\nline2"},
                    "episode_count": 5, "count": 12, "title": "Moon Blade",
                    "description": "d", "comments": [{"name": "a", "comment": "b"}]
                }
            })))
            .mount(&server)
            .await;

        let key = EpisodeKey::new(NovelId::from(9u64), 3);
        let episode = client_for(&server).fetch_episode(&key).await.unwrap();
        assert_eq!(episode.heading(3), "Episode 3 - Dawn");
        assert_eq!(episode.body_lines(), vec!["line1", "line2"]);
        assert_eq!(episode.comments.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_comment_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/submitcomment"))
            .and(header("X-API-KEY", "test-key"))
            .and(body_json(serde_json::json!({
                "name": "kim", "email": "k@example.com", "comment": "nice",
                "episodeId": "3", "id": "9"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let key = EpisodeKey::new(NovelId::from(9u64), 3);
        let submission = CommentSubmission::new(&key, "kim", "k@example.com", "nice");
        client_for(&server).submit_comment(&submission).await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_comment_rejects_blank_fields_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let key = EpisodeKey::new(NovelId::from(9u64), 3);
        let submission = CommentSubmission::new(&key, "kim", "", "nice");
        let err = client_for(&server)
            .submit_comment(&submission)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput("email")));
    }
}
