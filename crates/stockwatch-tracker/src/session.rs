//! Session management — browser-like HTTP client, cookie jar, wholesale refresh.
//!
//! A session is never patched in place. `refresh()` builds a complete
//! replacement and swaps it in, so a request always runs against a session
//! that was fully initialized with the current cookie set.

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::config::CookieConfig;
use stockwatch_core::error::{FetchError, Result, StockwatchError};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Desktop Chrome on macOS.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// What the stock checker needs from a session.
#[async_trait]
pub trait ProductSession: Send + Sync {
    /// Issue a GET with the given headers plus the session's own identity
    /// and cookies.
    async fn fetch(&self, url: &str, headers: HeaderMap) -> std::result::Result<RawResponse, FetchError>;

    /// Throw away the current session and start a fresh one. Never fails.
    fn refresh(&mut self);
}

/// One HTTP client with its installed cookies.
struct Session {
    client: reqwest::Client,
    cookie_count: usize,
}

impl Session {
    fn build(cookies: &CookieConfig, site: &reqwest::Url) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let pairs = cookies.pairs();
        for (name, value) in &pairs {
            jar.add_cookie_str(&cookie_string(name, value, &cookies.domain), site);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .cookie_provider(jar)
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| StockwatchError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            cookie_count: pairs.len(),
        })
    }
}

/// Owns the live session and replaces it on demand.
pub struct SessionManager {
    cookies: CookieConfig,
    site: reqwest::Url,
    current: Session,
    generation: u64,
}

impl SessionManager {
    /// Build the first session for `site_url` with the configured cookies.
    pub fn initialize(cookies: CookieConfig, site_url: &str) -> Result<Self> {
        let site = reqwest::Url::parse(site_url)
            .map_err(|e| StockwatchError::Http(format!("Invalid site URL {site_url}: {e}")))?;
        let current = Session::build(&cookies, &site)?;
        tracing::info!("🍪 Initialized {} cookies in session", current.cookie_count);
        Ok(Self {
            cookies,
            site,
            current,
            generation: 1,
        })
    }

    /// Number of sessions created so far, the first one included.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cookies installed in the live session.
    pub fn cookie_count(&self) -> usize {
        self.current.cookie_count
    }
}

#[async_trait]
impl ProductSession for SessionManager {
    async fn fetch(&self, url: &str, headers: HeaderMap) -> std::result::Result<RawResponse, FetchError> {
        let response = self
            .current
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(fetch_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(fetch_error)?;
        Ok(RawResponse { status, body })
    }

    fn refresh(&mut self) {
        tracing::info!("🔄 Refreshing session and cookies...");
        match Session::build(&self.cookies, &self.site) {
            Ok(fresh) => {
                // Old client and jar are dropped here
                self.current = fresh;
                self.generation += 1;
                tracing::info!(
                    "✅ Session refreshed successfully ({} cookies, generation {})",
                    self.current.cookie_count,
                    self.generation
                );
            }
            Err(e) => {
                tracing::warn!("⚠️ Session refresh failed, keeping previous session: {e}");
            }
        }
    }
}

/// `Set-Cookie` style string. An empty domain makes a host-only cookie.
fn cookie_string(name: &str, value: &str, domain: &str) -> String {
    if domain.trim().is_empty() {
        format!("{name}={value}; Path=/")
    } else {
        format!("{name}={value}; Domain={domain}; Path=/")
    }
}

/// Client-hint headers matching [`USER_AGENT`].
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"macOS\""));
    headers
}

/// Map a reqwest failure onto the fetch taxonomy.
fn fetch_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Status(status.as_u16())
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else if e.is_decode() || e.is_body() {
        FetchError::Decode(e.to_string())
    } else {
        FetchError::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::HeaderMap as AxumHeaders, routing::get};

    async fn spawn_echo() -> String {
        // Echoes the request's Cookie and User-Agent headers
        let app = Router::new().route(
            "/echo",
            get(|headers: AxumHeaders| async move {
                let cookie = headers
                    .get("cookie")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let ua = headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                format!("{cookie}\n{ua}")
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn local_cookies() -> CookieConfig {
        CookieConfig {
            domain: String::new(),
            cf_clearance: "clear-123".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cookie_string() {
        assert_eq!(
            cookie_string("__cf_bm", "abc", ".shop.amul.com"),
            "__cf_bm=abc; Domain=.shop.amul.com; Path=/"
        );
        assert_eq!(cookie_string("ext_name", "x", ""), "ext_name=x; Path=/");
    }

    #[test]
    fn test_initialize_counts_cookies() {
        let manager = SessionManager::initialize(local_cookies(), "http://127.0.0.1").unwrap();
        assert_eq!(manager.generation(), 1);
        // ext_name default + cf_clearance
        assert_eq!(manager.cookie_count(), 2);
    }

    #[test]
    fn test_invalid_site_url() {
        assert!(SessionManager::initialize(CookieConfig::default(), "not a url").is_err());
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let mut manager =
            SessionManager::initialize(CookieConfig::default(), "https://shop.amul.com").unwrap();
        for _ in 0..5 {
            manager.refresh();
        }
        assert_eq!(manager.generation(), 6);
        assert_eq!(manager.cookie_count(), 1);
    }

    #[tokio::test]
    async fn test_cookies_and_identity_sent() {
        let base = spawn_echo().await;
        let manager = SessionManager::initialize(local_cookies(), &base).unwrap();
        let response = manager
            .fetch(&format!("{base}/echo"), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.contains("cf_clearance=clear-123"));
        assert!(response.body.contains("ext_name=ojplmecpdpgccookcobabopnaifgidhf"));
        assert!(response.body.contains("Macintosh"));
    }

    #[tokio::test]
    async fn test_usable_after_refresh() {
        let base = spawn_echo().await;
        let mut manager = SessionManager::initialize(local_cookies(), &base).unwrap();
        manager.refresh();
        manager.refresh();
        let response = manager
            .fetch(&format!("{base}/echo"), HeaderMap::new())
            .await
            .unwrap();
        assert!(response.body.contains("cf_clearance=clear-123"));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connect() {
        let manager = SessionManager::initialize(local_cookies(), "http://127.0.0.1:9").unwrap();
        let err = manager
            .fetch("http://127.0.0.1:9/", HeaderMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connection");
    }
}
