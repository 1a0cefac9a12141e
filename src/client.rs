//! Google Drive API client: metadata lookups, paginated child listing,
//! shortcut resolution and download requests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListResponse, ResourceKind, ResourceRef};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for every resource lookup.
const RESOURCE_FIELDS: &str = "id, name, mimeType, size, shortcutDetails";

/// Page size for files.list requests.
const PAGE_SIZE: &str = "1000";

/// Connection timeout for every remote call.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Idle read timeout; bounds stalled streaming downloads without
/// capping total transfer time.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Bounded, capped exponential backoff applied to rate-limited calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(32),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying while it fails with a rate-limit signal and
    /// attempts remain. Delay doubles per retry up to `max_delay`.
    /// Every other error surfaces immediately.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;
        loop {
            match op().await {
                Err(e) if e.is_rate_limit() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Metadata surface of the Drive API, the seam the walker and the
/// orchestrator are written against.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch a single resource's metadata.
    async fn get_resource(&self, id: &str) -> Result<ResourceRef>;

    /// Return the complete child set of a folder, pagination resolved.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<ResourceRef>>;

    /// Follow a shortcut to its concrete target.
    ///
    /// The remote never chains shortcuts; a target that is itself a
    /// shortcut is treated as missing rather than followed, so
    /// resolution always terminates after one hop.
    async fn resolve_shortcut(&self, shortcut: &ResourceRef) -> Result<ResourceRef> {
        debug_assert_eq!(shortcut.kind(), ResourceKind::Shortcut);

        let details = shortcut.shortcut_details.as_ref().ok_or_else(|| {
            DriveError::NotFound(format!("shortcut {} has no recorded target", shortcut.id))
        })?;

        let target = self.get_resource(&details.target_id).await?;
        if target.kind() == ResourceKind::Shortcut {
            return Err(DriveError::NotFound(format!(
                "shortcut {} points at another shortcut {}",
                shortcut.id, target.id
            )));
        }
        Ok(target)
    }
}

/// HTTP client for the Drive API, authorized by a service-account
/// [`Authenticator`].
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl DriveClient {
    pub fn new(auth: Authenticator) -> Self {
        Self::with_base_url(auth, DRIVE_API_BASE.to_string())
    }

    /// Point the client at an alternative API endpoint. Tests use this
    /// with a local mock server.
    pub fn with_base_url(auth: Authenticator, base_url: String) -> Self {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .build()
            .expect("static reqwest client options");
        Self {
            auth,
            http,
            base_url,
            retry: RetryPolicy::default(),
        }
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Request a resource's native bytes. The caller streams the body.
    pub async fn download_native(&self, id: &str) -> Result<Response> {
        let token = self.auth.get_access_token().await?;
        let token = token.as_str();
        let http = &self.http;
        let url = format!("{}/files/{}", self.base_url, id);
        let url = url.as_str();

        debug!(id, "native download");
        self.retry
            .run(move || async move {
                let response = http
                    .get(url)
                    .bearer_auth(token)
                    .query(&[("alt", "media"), ("supportsAllDrives", "true")])
                    .send()
                    .await?;
                ensure_success(response).await
            })
            .await
    }

    /// Request a Google-native document converted to `export_mime`.
    pub async fn download_export(&self, id: &str, export_mime: &str) -> Result<Response> {
        let token = self.auth.get_access_token().await?;
        let token = token.as_str();
        let http = &self.http;
        let url = format!("{}/files/{}/export", self.base_url, id);
        let url = url.as_str();

        debug!(id, export_mime, "export download");
        self.retry
            .run(move || async move {
                let response = http
                    .get(url)
                    .bearer_auth(token)
                    .query(&[("mimeType", export_mime)])
                    .send()
                    .await?;
                ensure_success(response).await
            })
            .await
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn get_resource(&self, id: &str) -> Result<ResourceRef> {
        let token = self.auth.get_access_token().await?;
        let token = token.as_str();
        let http = &self.http;
        let url = format!("{}/files/{}", self.base_url, id);
        let url = url.as_str();

        let response = self
            .retry
            .run(move || async move {
                let response = http
                    .get(url)
                    .bearer_auth(token)
                    .query(&[("supportsAllDrives", "true"), ("fields", RESOURCE_FIELDS)])
                    .send()
                    .await?;
                ensure_success(response).await
            })
            .await?;

        let resource: ResourceRef = response.json().await?;
        Ok(resource)
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<ResourceRef>> {
        let token = self.auth.get_access_token().await?;
        let token = token.as_str();
        let http = &self.http;
        let url = format!("{}/files", self.base_url);
        let url = url.as_str();
        let query = format!("'{}' in parents and trashed = false", folder_id);
        let query = query.as_str();
        let fields = format!("nextPageToken, files({})", RESOURCE_FIELDS);
        let fields = fields.as_str();

        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = page_token.as_deref();
            let response = self
                .retry
                .run(move || async move {
                    let mut request = http.get(url).bearer_auth(token).query(&[
                        ("q", query),
                        ("includeItemsFromAllDrives", "true"),
                        ("supportsAllDrives", "true"),
                        ("spaces", "drive"),
                        ("pageSize", PAGE_SIZE),
                        ("fields", fields),
                    ]);

                    if let Some(page) = page {
                        request = request.query(&[("pageToken", page)]);
                    }

                    ensure_success(request.send().await?).await
                })
                .await?;

            let list_response: FileListResponse = response.json().await?;
            debug!(folder_id, page_len = list_response.files.len(), "listed page");
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(all_files)
    }
}

/// Map a non-success response onto the error taxonomy.
///
/// The Drive API signals quota exhaustion both as plain 429 and as 403
/// with a `rateLimitExceeded` reason; both become [`DriveError::RateLimited`].
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    let (message, reasons) = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api) => (
            api.error.message,
            api.error
                .errors
                .into_iter()
                .map(|e| e.reason)
                .collect::<Vec<_>>(),
        ),
        Err(_) => (body, Vec::new()),
    };

    let rate_limited = reasons
        .iter()
        .any(|r| r == "rateLimitExceeded" || r == "userRateLimitExceeded");

    Err(match status {
        404 => DriveError::NotFound(message),
        429 => DriveError::RateLimited,
        403 if rate_limited => DriveError::RateLimited,
        403 => DriveError::PermissionDenied(message),
        _ => DriveError::ApiError { status, message },
    })
}
