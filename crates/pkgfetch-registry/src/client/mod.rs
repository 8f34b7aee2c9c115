//! HTTP client implementation with connection pooling and retry logic

use std::path::Path;
use std::time::Duration;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};
use url::Url;

use pkgfetch_cache::AtomicFile;
use pkgfetch_config::FetchConfig;
use pkgfetch_core::error::FetchError;
use pkgfetch_core::types::PackageName;
use pkgfetch_core::utils::IntegrityHasher;
use crate::api::{Manifest, Packument};
use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Authentication configuration for registry access
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Basic auth username
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
}

/// Main HTTP client for npm registry operations
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Retry configuration
    retry_config: RetryConfig,
    /// Base registry URL (ends with '/')
    base_url: Url,
}

impl RegistryClient {
    /// Create new registry client for the public npm registry
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(FetchConfig::default().registry, None, RetryConfig::default(), Duration::from_secs(30))
    }

    /// Create registry client from resolved configuration
    pub fn from_config(config: &FetchConfig) -> RegistryResult<Self> {
        let auth = AuthConfig {
            token: config.token.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        };
        let retry_config = RetryConfig {
            max_retries: config.max_retries,
            ..RetryConfig::default()
        };

        Self::with_config(
            config.registry.clone(),
            Some(auth),
            retry_config,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Create registry client with custom configuration
    fn with_config(
        base_url: Url,
        auth: Option<AuthConfig>,
        retry_config: RetryConfig,
        timeout: Duration,
    ) -> RegistryResult<Self> {
        let mut builder = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            // Request timeout
            .timeout(timeout)
            // Enable gzip compression
            .gzip(true)
            // User agent
            .user_agent(concat!("pkgfetch/", env!("CARGO_PKG_VERSION")));

        // Configure authentication if provided
        if let Some(auth_value) = auth.and_then(authorization_value) {
            let mut headers = reqwest::header::HeaderMap::new();
            let mut value = reqwest::header::HeaderValue::from_str(&auth_value)
                .map_err(|e| FetchError::initialization("Invalid registry credentials".to_string(), e))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let client = builder.build()
            .map_err(|e| FetchError::initialization("Failed to create HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            retry_config,
            base_url,
        })
    }

    /// Point the client at another registry
    pub fn with_registry(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Replace the retry policy
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Registry this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute HTTP request with exponential backoff retry logic
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    // Don't retry on final attempt or on errors a retry cannot fix
                    let final_attempt = attempt == self.retry_config.max_retries;
                    let permanent = matches!(
                        error,
                        FetchError::PackageNotFound { .. }
                            | FetchError::PermissionDenied { .. }
                            | FetchError::DestinationWrite { .. }
                    );
                    if final_attempt || permanent {
                        return Err(error);
                    }

                    warn!("Registry request failed (attempt {}): {}", attempt + 1, error);
                    last_error = Some(error);

                    // Wait before retry
                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64
                        ),
                        self.retry_config.max_delay
                    );
                }
            }
        }

        Err(last_error.unwrap_or_else(||
            FetchError::Network {
                message: "Retry operation failed without error".to_string(),
                source: None
            }
        ))
    }

    /// Fetch the full package document with retry logic
    pub async fn fetch_packument(&self, package_name: &PackageName) -> RegistryResult<Packument> {
        let url = self.package_url(package_name)?;
        debug!("Fetching metadata from {}", url);

        self.with_retry(|| async {
            let response = self.client
                .get(url.clone())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| FetchError::network(format!("Failed to fetch metadata: {}", e), e))?;

            match response.status() {
                reqwest::StatusCode::OK => {
                    let packument = response.json::<Packument>()
                        .await
                        .map_err(|e| FetchError::network(format!("Failed to parse metadata: {}", e), e))?;
                    Ok(packument.normalize())
                }
                reqwest::StatusCode::NOT_FOUND => {
                    Err(FetchError::PackageNotFound { name: package_name.to_string() })
                }
                reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                    Err(FetchError::PermissionDenied {
                        permission: "read".to_string(),
                        resource: package_name.to_string(),
                    })
                }
                status => {
                    Err(FetchError::Network {
                        message: format!("Registry returned status {}: {}", status, package_name),
                        source: None
                    })
                }
            }
        }).await
    }

    /// Stream a package tarball into `dest`, verifying integrity before it
    /// becomes visible. Returns the number of bytes written.
    pub async fn download_tarball(&self, manifest: &Manifest, dest: &Path) -> RegistryResult<u64> {
        let dist = manifest.dist.as_ref().ok_or_else(|| {
            FetchError::cache_add(manifest.id(), "registry manifest has no dist.tarball")
        })?;
        debug!("Downloading {} from {}", manifest.id(), dist.tarball);

        self.with_retry(|| async {
            let mut response = self.client
                .get(&dist.tarball)
                .send()
                .await
                .map_err(|e| FetchError::network(format!("Failed to download tarball: {}", e), e))?;

            if !response.status().is_success() {
                return Err(FetchError::Network {
                    message: format!("Failed to download tarball: {}", response.status()),
                    source: None
                });
            }

            // Dropped without commit on any error below
            let mut file = AtomicFile::create(dest)?;
            let mut hasher = IntegrityHasher::new();

            while let Some(chunk) = response.chunk()
                .await
                .map_err(|e| FetchError::network(format!("Failed to read tarball: {}", e), e))?
            {
                hasher.update(&chunk);
                file.write(&chunk).await?;
            }

            hasher.verify(&manifest.id(), dist.integrity.as_deref(), dist.shasum.as_deref())?;
            file.commit().await
        }).await
    }

    /// URL of a package document
    ///
    /// The name is appended as a single path segment, so `@scope/pkg` is sent
    /// as `@scope%2Fpkg` and a name can never leave the registry.
    fn package_url(&self, package_name: &PackageName) -> RegistryResult<Url> {
        let invalid = |message: &str| FetchError::Query {
            package: package_name.to_string(),
            message: message.to_string(),
        };

        if matches!(package_name.as_str(), "" | "." | "..") {
            return Err(invalid("Not a valid package name"));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| invalid("Registry URL cannot carry a package path"))?
            .pop_if_empty()
            .push(package_name.as_str());
        Ok(url)
    }
}

/// `Authorization` header value for the configured credentials
fn authorization_value(auth: AuthConfig) -> Option<String> {
    if let Some(token) = auth.token {
        return Some(format!("Bearer {}", token));
    }

    if let (Some(username), Some(password)) = (auth.username, auth.password) {
        use base64::{Engine as _, engine::general_purpose};
        let encoded = general_purpose::STANDARD.encode(format!("{}:{}", username, password));
        return Some(format!("Basic {}", encoded));
    }

    None
}
