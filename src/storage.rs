//! Remote object store access.
//!
//! The catalog only reads from the bucket: paginated listings and presigned
//! GET URLs. Errors are surfaced to the caller as-is and never retried here,
//! so expired credentials show up immediately instead of being masked.

use crate::config::CatalogConfig;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::{config::Region, Client};
use std::time::Duration;
use thiserror::Error;

/// Separator used to group keys into folders
pub const FOLDER_DELIMITER: &str = "/";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to list s3://{bucket}/{prefix}: {message}")]
    Listing {
        bucket: String,
        prefix: String,
        message: String,
    },
    #[error("Failed to sign URL for {key}: {message}")]
    Signing { key: String, message: String },
    #[error("Listing of s3://{bucket}/{prefix} is truncated but has no continuation token")]
    MissingContinuationToken { bucket: String, prefix: String },
}

/// Parameters of a single `ListObjectsV2` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub continuation_token: Option<String>,
}

impl ListRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub fn prefix(mut self, prefix: Option<&str>) -> Self {
        self.prefix = prefix.map(str::to_string);
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = Some(delimiter.to_string());
        self
    }

    pub fn continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// One page of a remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Common prefixes, only populated when a delimiter was requested
    pub common_prefixes: Vec<String>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

/// Read-only view of a remote object store.
///
/// Implementors provide the two primitive calls; full listings are built on
/// top of them by the provided methods.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of a listing
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, GatewayError>;

    /// Issue a time-limited GET URL for one object
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, GatewayError>;

    /// List every key under `prefix`, following continuation tokens until the
    /// store reports the listing as complete. The first failing page aborts
    /// the whole listing.
    async fn list_all(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>, GatewayError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let request = ListRequest::new(bucket)
                .prefix(prefix)
                .continuation_token(token.take());
            let page = self.list_page(&request).await?;
            keys.extend(page.keys);

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => {
                    return Err(GatewayError::MissingContinuationToken {
                        bucket: bucket.to_string(),
                        prefix: prefix.unwrap_or_default().to_string(),
                    })
                }
            }
        }

        log::debug!(
            "[ObjectStore] Listed {} keys under s3://{}/{}",
            keys.len(),
            bucket,
            prefix.unwrap_or_default()
        );
        Ok(keys)
    }

    /// List the top-level folders of a bucket, in remote order, with the
    /// trailing delimiter stripped.
    async fn list_folders(&self, bucket: &str) -> Result<Vec<String>, GatewayError> {
        let mut folders = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let request = ListRequest::new(bucket)
                .delimiter(FOLDER_DELIMITER)
                .continuation_token(token.take());
            let page = self.list_page(&request).await?;
            folders.extend(page.common_prefixes.into_iter().map(|prefix| {
                prefix
                    .strip_suffix(FOLDER_DELIMITER)
                    .map(str::to_string)
                    .unwrap_or(prefix)
            }));

            if !page.is_truncated {
                break;
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => {
                    return Err(GatewayError::MissingContinuationToken {
                        bucket: bucket.to_string(),
                        prefix: String::new(),
                    })
                }
            }
        }

        Ok(folders)
    }
}

/// `ObjectStore` backed by S3 (or any S3-compatible endpoint)
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub async fn new(config: &CatalogConfig) -> Self {
        let region_provider = RegionProviderChain::first_try(Region::new(config.region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        // Static credentials from the catalog config, not the ambient chain
        let credentials = aws_sdk_s3::config::Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "photo-cursor",
        );

        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared_config).credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, request: &ListRequest) -> Result<ListPage, GatewayError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(|err| GatewayError::Listing {
                bucket: request.bucket.clone(),
                prefix: request.prefix.clone().unwrap_or_default(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|prefix| prefix.prefix().map(str::to_string))
            .collect();

        Ok(ListPage {
            keys,
            common_prefixes,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_token: output.next_continuation_token().map(str::to_string),
        })
    }

    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, GatewayError> {
        let signing_error = |message: String| GatewayError::Signing {
            key: key.to_string(),
            message,
        };

        let config = PresigningConfig::expires_in(ttl)
            .map_err(|err| signing_error(format!("Invalid presign ttl: {}", err)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|err| signing_error(DisplayErrorContext(&err).to_string()))?;

        Ok(presigned.uri().to_string())
    }
}
