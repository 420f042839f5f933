// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

use super::client::{HeadObject, ListingPage, ObjectClient, ObjectEntry, UploadOptions};
use super::config::{canonical_option_key, StorageSettings};
use super::error::{ServiceError, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use object_store::{
    aws::AmazonS3Builder, path::Path as ObjectPath, ClientOptions, ObjectStore, PutPayload,
    RetryConfig, WriteMultipart,
};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Objects returned per listing page unless `max_keys` says otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Bodies up to this many MB go up in a single request.
pub const DEFAULT_MAX_BUFFER_SIZE_MB: u64 = 100;

/// Multipart part size in MB.
pub const DEFAULT_PART_SIZE_MB: u64 = 10;

/// Parts in flight during a multipart upload.
pub const DEFAULT_MAX_THREAD: usize = 5;

const MB: u64 = 1024 * 1024;

/// Format of the `Last-Modified` header (RFC 1123, always GMT).
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Object path holding `key` verbatim, without percent-encoding any segment.
fn string_to_path(key: &str) -> Result<ObjectPath, ServiceError> {
    ObjectPath::parse(key).map_err(|e| ServiceError::new(400, "InvalidObjectName", e.to_string()))
}

/// [`ObjectClient`] backed by any `object_store` implementation.
///
/// [`from_settings`](Self::from_settings) talks to COS through its
/// S3-compatible API; [`new`](Self::new) wraps an existing store such as
/// `object_store::memory::InMemory`.
///
/// `object_store` paths have no empty segments, so directory marker objects
/// (keys ending in `/`) cannot be stored. Listings report every ancestor
/// directory of a listed key as a marker entry instead, in key order.
pub struct ObjectStoreClient {
    bucket: String,
    store: Arc<dyn ObjectStore>,
    base_url: Url,
    page_size: usize,
}

impl ObjectStoreClient {
    /// Wrap an existing store.
    ///
    /// # Arguments
    ///
    /// * `bucket` - Bucket name reported by [`ObjectClient::bucket`]
    /// * `store` - The store every call goes to, listing in key order
    /// * `base_url` - URL object keys are appended to by [`ObjectClient::uri`]
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>, base_url: Url) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            base_url,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Limit the number of entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a COS client from settings.
    ///
    /// # Arguments
    ///
    /// * `settings` - Bucket and client options (region, credentials, endpoint, ...)
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(ObjectStoreClient)` - A client bound to the configured bucket
    /// * `Err(StorageError)` - If the store cannot be built
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Neither `region` nor `endpoint` is configured
    /// * `max_keys` or the endpoint is malformed
    /// * The S3 builder rejects the configuration
    pub fn from_settings(settings: &StorageSettings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&settings.bucket)
            .with_client_options(Self::build_connection_options(settings));
        if let Some(retry) = Self::build_retry_options(settings) {
            builder = builder.with_retry(retry);
        }

        let mut region: Option<&String> = None;
        let mut endpoint: Option<&String> = None;
        let mut scheme = "https";
        let mut virtual_hosted = false;
        let mut page_size = DEFAULT_PAGE_SIZE;

        for (key, value) in &settings.options {
            match canonical_option_key(key) {
                "region" => {
                    region = Some(value);
                    builder = builder.with_region(value);
                }
                "secret_id" => builder = builder.with_access_key_id(value),
                "secret_key" => builder = builder.with_secret_access_key(value),
                "token" => builder = builder.with_token(value),
                "endpoint" => endpoint = Some(value),
                "scheme" => {
                    if value.eq_ignore_ascii_case("http") {
                        scheme = "http";
                        builder = builder.with_allow_http(true);
                    }
                }
                "allow_http" => {
                    if value.to_lowercase() == "true" {
                        builder = builder.with_allow_http(true);
                    }
                }
                "virtual_hosted_style_request" => {
                    virtual_hosted = value.to_lowercase() == "true";
                }
                "max_keys" => {
                    page_size = value.parse::<usize>().map_err(|_| {
                        StorageError::ConfigError(format!("Invalid max_keys: {}", value))
                    })?;
                }
                // Already handled by `build_connection_options` and `build_retry_options`
                "timeout"
                | "connect_timeout"
                | "max_retries"
                | "retry_timeout"
                | "pool_idle_timeout"
                | "pool_max_idle_per_host" => (),
                _ => {
                    tracing::warn!("Unknown COS option: {}", key);
                }
            }
        }

        let base_url = match (endpoint, region) {
            (Some(endpoint), _) => {
                let endpoint = endpoint.trim_end_matches('/');
                builder = builder
                    .with_endpoint(endpoint)
                    .with_virtual_hosted_style_request(virtual_hosted);
                if virtual_hosted {
                    format!("{}/", endpoint)
                } else {
                    format!("{}/{}/", endpoint, settings.bucket)
                }
            }
            (None, Some(region)) => {
                let endpoint = format!(
                    "{}://{}.cos.{}.myqcloud.com",
                    scheme, settings.bucket, region
                );
                builder = builder
                    .with_endpoint(&endpoint)
                    .with_virtual_hosted_style_request(true);
                format!("{}/", endpoint)
            }
            (None, None) => return Err(StorageError::MissingSettings(vec!["region".to_string()])),
        };
        let base_url = Url::parse(&base_url)?;

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to create COS store: {}", e)))?;

        Ok(Self::new(settings.bucket.clone(), Arc::new(store), base_url).with_page_size(page_size))
    }

    /// Build connection options from settings.
    ///
    /// # Arguments
    ///
    /// * `settings` - Settings with optional timeout and connection pool options
    ///
    /// # Returns
    ///
    /// A `ClientOptions` instance configured with timeout and connection settings.
    fn build_connection_options(settings: &StorageSettings) -> ClientOptions {
        let mut client_options = ClientOptions::default();
        if let Some(timeout_str) = settings.option("timeout") {
            if timeout_str == "0" || timeout_str == "disabled" {
                client_options = client_options.with_timeout_disabled();
            } else if let Ok(sec) = timeout_str.parse::<u64>() {
                client_options = client_options.with_timeout(Duration::from_secs(sec))
            }
        };
        if let Some(connect_timeout_str) = settings.option("connect_timeout") {
            if connect_timeout_str == "0" || connect_timeout_str == "disabled" {
                client_options = client_options.with_connect_timeout_disabled();
            } else if let Ok(sec) = connect_timeout_str.parse::<u64>() {
                client_options = client_options.with_connect_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_idle_timeout_str) = settings.option("pool_idle_timeout") {
            if let Ok(sec) = pool_idle_timeout_str.parse::<u64>() {
                client_options = client_options.with_pool_idle_timeout(Duration::from_secs(sec))
            }
        }
        if let Some(pool_max_idle_per_host_str) = settings.option("pool_max_idle_per_host") {
            if let Ok(max_idle) = pool_max_idle_per_host_str.parse::<usize>() {
                client_options = client_options.with_pool_max_idle_per_host(max_idle)
            }
        }
        client_options
    }

    /// Build retry options from settings.
    ///
    /// # Returns
    ///
    /// `None` when neither `max_retries` nor `retry_timeout` is set, leaving the
    /// store's own defaults in place.
    fn build_retry_options(settings: &StorageSettings) -> Option<RetryConfig> {
        let max_retries = settings.option("max_retries");
        let retry_timeout = settings.option("retry_timeout");
        if max_retries.is_none() && retry_timeout.is_none() {
            return None;
        }

        let default_retry_config = RetryConfig::default();
        let max_retries = max_retries
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(default_retry_config.max_retries);
        let retry_timeout = retry_timeout
            .and_then(|s| Some(Duration::from_secs(s.parse::<u64>().ok()?)))
            .unwrap_or(default_retry_config.retry_timeout);
        Some(RetryConfig {
            backoff: Default::default(),
            max_retries,
            retry_timeout,
        })
    }

    async fn upload_multipart(
        &self,
        path: &ObjectPath,
        content: Bytes,
        part_size: usize,
        max_thread: usize,
    ) -> StorageResult<()> {
        let upload = self.store.put_multipart(path).await.map_err(service_error)?;
        let mut writer = WriteMultipart::new_with_chunk_size(upload, part_size);

        let written = async {
            for chunk in content.chunks(part_size) {
                writer.wait_for_capacity(max_thread).await?;
                writer.write(chunk);
            }
            Ok::<(), object_store::Error>(())
        }
        .await;

        match written {
            Ok(()) => {
                writer.finish().await.map_err(service_error)?;
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!("Failed to abort multipart upload of {}: {}", path, abort);
                }
                Err(service_error(e).into())
            }
        }
    }
}

/// Directory markers implied by `key`: every ancestor not shared with `previous`.
fn implied_directories<'a>(key: &'a str, previous: &str) -> impl Iterator<Item = &'a str> + 'a {
    let previous = previous.to_string();
    key.match_indices('/')
        .map(move |(idx, _)| &key[..=idx])
        .filter(move |dir| !previous.starts_with(dir))
}

/// Translate an `object_store` failure into the service's status/code pair.
pub fn service_error(err: object_store::Error) -> ServiceError {
    let message = err.to_string();
    match err {
        object_store::Error::NotFound { .. } => ServiceError::not_found(message),
        object_store::Error::PermissionDenied { .. } => {
            ServiceError::new(403, "AccessDenied", message)
        }
        object_store::Error::Unauthenticated { .. } => {
            ServiceError::new(401, "Unauthenticated", message)
        }
        object_store::Error::AlreadyExists { .. } => ServiceError::new(409, "AlreadyExists", message),
        object_store::Error::Precondition { .. } => {
            ServiceError::new(412, "PreconditionFailed", message)
        }
        object_store::Error::NotModified { .. } => ServiceError::new(304, "NotModified", message),
        object_store::Error::NotImplemented { .. } | object_store::Error::NotSupported { .. } => {
            ServiceError::new(501, "NotImplemented", message)
        }
        _ => ServiceError::new(500, "InternalError", message),
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_object(&self, key: &str) -> StorageResult<HeadObject> {
        let meta = self
            .store
            .head(&string_to_path(key)?)
            .await
            .map_err(service_error)?;

        Ok(HeadObject {
            content_length: meta.size,
            last_modified: meta.last_modified.format(HTTP_DATE_FORMAT).to_string(),
            etag: meta.e_tag,
        })
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        let result = self
            .store
            .get(&string_to_path(key)?)
            .await
            .map_err(service_error)?;
        let bytes = result.bytes().await.map_err(service_error)?;
        Ok(bytes)
    }

    async fn upload_from_buffer(
        &self,
        key: &str,
        content: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        if key.ends_with('/') {
            return Err(ServiceError::new(
                400,
                "InvalidObjectName",
                format!("Directory marker {} cannot hold content", key),
            )
            .into());
        }

        let path = string_to_path(key)?;
        let max_buffer_size = options
            .max_buffer_size
            .unwrap_or(DEFAULT_MAX_BUFFER_SIZE_MB)
            .saturating_mul(MB);

        if content.len() as u64 <= max_buffer_size {
            self.store
                .put(&path, PutPayload::from(content))
                .await
                .map_err(service_error)?;
            return Ok(());
        }

        let part_size = options
            .part_size
            .unwrap_or(DEFAULT_PART_SIZE_MB)
            .saturating_mul(MB)
            .max(1);
        let part_size = usize::try_from(part_size).unwrap_or(usize::MAX);
        let max_thread = options.max_thread.unwrap_or(DEFAULT_MAX_THREAD).max(1);
        self.upload_multipart(&path, content, part_size, max_thread)
            .await
    }

    async fn list_objects(&self, prefix: &str, marker: &str) -> StorageResult<ListingPage> {
        // object_store lists whole path segments, so start from the directory
        // holding the prefix and filter by plain string prefix.
        let parent = prefix
            .rfind('/')
            .map(|idx| string_to_path(&prefix[..idx]))
            .transpose()?;

        let mut stream = if marker.is_empty() {
            self.store.list(parent.as_ref())
        } else {
            let offset = string_to_path(marker)?;
            self.store.list_with_offset(parent.as_ref(), &offset)
        };

        let mut contents: Vec<ObjectEntry> = Vec::new();
        let mut previous = marker.to_string();
        let mut is_truncated = false;

        'listing: while let Some(meta) = stream.next().await {
            let meta = meta.map_err(service_error)?;
            let key = meta.location.to_string();

            let entries = implied_directories(&key, &previous)
                .map(ObjectEntry::new)
                .chain(std::iter::once(ObjectEntry {
                    key: key.clone(),
                    size: Some(meta.size),
                }));
            for entry in entries {
                if !entry.key.starts_with(prefix) || entry.key.as_str() <= marker {
                    continue;
                }
                if contents.len() == self.page_size {
                    is_truncated = true;
                    break 'listing;
                }
                contents.push(entry);
            }
            previous = key;
        }

        let next_marker = if is_truncated {
            contents.last().map(|entry| entry.key.clone())
        } else {
            None
        };

        Ok(ListingPage {
            contents,
            is_truncated,
            next_marker,
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.store
            .delete(&string_to_path(key)?)
            .await
            .map_err(service_error)?;
        Ok(())
    }

    fn uri(&self, key: &str) -> StorageResult<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                StorageError::ConfigError(format!("Base URL cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(key.trim_start_matches('/').split('/'));
        Ok(url.to_string())
    }
}

impl Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ObjectStoreClient(bucket={}, store={}, base_url={})",
            self.bucket, self.store, self.base_url
        )
    }
}
