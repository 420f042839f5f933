// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;

use super::client::UploadOptions;
use super::error::{StorageError, StorageResult};
use super::path::RootPath;

/// Client options that must be present, in the order they are reported.
pub const REQUIRED_OPTIONS: [&str; 3] = ["region", "secret_id", "secret_key"];

/// Options whose values never show up in `Debug` output.
const SECRET_OPTIONS: [&str; 3] = ["secret_id", "secret_key", "token"];

/// Map the COS SDK spelling of an option onto the one used here.
pub fn canonical_option_key(key: &str) -> &str {
    match key {
        "Region" => "region",
        "SecretId" => "secret_id",
        "SecretKey" => "secret_key",
        "Token" => "token",
        "Endpoint" => "endpoint",
        "Scheme" => "scheme",
        other => other,
    }
}

fn default_root_path() -> String {
    "/".to_string()
}

fn default_use_tz() -> bool {
    true
}

/// Settings for a [`CosStorage`](super::cos::CosStorage).
///
/// Client options are kept as a string map, the same way they are handed to
/// the `object_store` builder. Common options:
///
/// - region: COS region (e.g. "ap-guangzhou"), required
/// - secret_id: API secret id, required
/// - secret_key: API secret key, required
/// - token: temporary session token
/// - endpoint: custom endpoint URL, overrides the region-derived one
/// - scheme: "https" (default) or "http" for the region-derived endpoint
/// - allow_http: "true" to allow plain HTTP connections
/// - max_keys: page size for listings (default 1000)
/// - timeout, connect_timeout, pool_idle_timeout, pool_max_idle_per_host
/// - max_retries, retry_timeout: transport retries inside the client
///
/// When loaded from JSON the framework-style upper-case keys (`BUCKET`,
/// `ROOT_PATH`, `CONFIG`, `Region`, `SecretId`, ...) are accepted as well.
///
/// # Examples
///
/// ```
/// use cos_storage::storage::StorageSettings;
///
/// let settings = StorageSettings::new("examplebucket-1250000000")
///     .with_root_path("/media")
///     .with_option("region", "ap-guangzhou")
///     .with_option("secret_id", "SECRET_ID")
///     .with_option("secret_key", "SECRET_KEY");
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Bucket name
    #[serde(default, alias = "BUCKET")]
    pub bucket: String,

    /// Prefix every key lives under
    #[serde(default = "default_root_path", alias = "ROOT_PATH")]
    pub root_path: String,

    /// Largest single-request upload, in MB
    #[serde(
        default,
        alias = "UPLOAD_MAX_BUFFER_SIZE",
        skip_serializing_if = "Option::is_none"
    )]
    pub upload_max_buffer_size: Option<u64>,

    /// Multipart part size, in MB
    #[serde(
        default,
        alias = "UPLOAD_PART_SIZE",
        skip_serializing_if = "Option::is_none"
    )]
    pub upload_part_size: Option<u64>,

    /// Parts uploaded concurrently
    #[serde(
        default,
        alias = "UPLOAD_MAX_THREAD",
        skip_serializing_if = "Option::is_none"
    )]
    pub upload_max_thread: Option<usize>,

    /// Return timezone-aware timestamps
    #[serde(default = "default_use_tz", alias = "USE_TZ")]
    pub use_tz: bool,

    /// Client connection and credential options
    #[serde(default = "StorageSettings::default_options", alias = "CONFIG")]
    pub options: HashMap<String, String>,
}

impl StorageSettings {
    /// Create settings for a bucket with default options.
    ///
    /// # Arguments
    ///
    /// * `bucket` - The bucket name
    ///
    /// # Returns
    ///
    /// A new `StorageSettings` rooted at `/` with timezone support on.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            root_path: default_root_path(),
            upload_max_buffer_size: None,
            upload_part_size: None,
            upload_max_thread: None,
            use_tz: default_use_tz(),
            options: Self::default_options(),
        }
    }

    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StorageError::ConfigError(format!("Invalid settings JSON: {}", e)))
    }

    /// Read settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Default transport options for the client.
    ///
    /// # Returns
    ///
    /// A HashMap containing default timeout and connection pool settings.
    pub fn default_options() -> HashMap<String, String> {
        [
            ("timeout", "300"),
            ("connect_timeout", "30"),
            ("pool_idle_timeout", "15"),
            ("pool_max_idle_per_host", "5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = root_path.into();
        self
    }

    pub fn with_upload_max_buffer_size(mut self, megabytes: u64) -> Self {
        self.upload_max_buffer_size = Some(megabytes);
        self
    }

    pub fn with_upload_part_size(mut self, megabytes: u64) -> Self {
        self.upload_part_size = Some(megabytes);
        self
    }

    pub fn with_upload_max_thread(mut self, threads: usize) -> Self {
        self.upload_max_thread = Some(threads);
        self
    }

    pub fn with_use_tz(mut self, use_tz: bool) -> Self {
        self.use_tz = use_tz;
        self
    }

    /// Add a client option.
    ///
    /// SDK-style keys (`Region`, `SecretId`, ...) are stored under their
    /// canonical name.
    ///
    /// # Arguments
    ///
    /// * `key` - The option key
    /// * `value` - The option value
    ///
    /// # Returns
    ///
    /// The `StorageSettings` instance with the added option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.options
            .insert(canonical_option_key(&key).to_string(), value.into());
        self
    }

    /// Add multiple client options.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        for (key, value) in options {
            self = self.with_option(key, value);
        }
        self
    }

    /// Look up a client option by its canonical name.
    ///
    /// Falls back to the SDK spelling for settings that were deserialized
    /// rather than built.
    pub fn option(&self, key: &str) -> Option<&String> {
        self.options.get(key).or_else(|| {
            self.options
                .iter()
                .find(|(k, _)| canonical_option_key(k) == key)
                .map(|(_, v)| v)
        })
    }

    /// Check every required setting.
    ///
    /// All missing fields are reported together, in the order bucket, region,
    /// secret_id, secret_key. The root path is validated as well.
    ///
    /// # Errors
    ///
    /// * [`StorageError::MissingSettings`] - one or more required values are absent or empty
    /// * [`StorageError::ConfigError`] - the root path is malformed
    pub fn validate(&self) -> StorageResult<()> {
        let mut missing = Vec::new();
        if self.bucket.trim().is_empty() {
            missing.push("bucket".to_string());
        }
        for key in REQUIRED_OPTIONS {
            if self.option(key).is_none_or(|v| v.trim().is_empty()) {
                missing.push(key.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(StorageError::MissingSettings(missing));
        }

        self.root()?;
        Ok(())
    }

    /// The normalized root prefix.
    pub fn root(&self) -> StorageResult<RootPath> {
        RootPath::new(&self.root_path)
    }

    /// Upload knobs, only those that were configured.
    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            max_buffer_size: self.upload_max_buffer_size,
            part_size: self.upload_part_size,
            max_thread: self.upload_max_thread,
        }
    }

    /// Options with credentials masked, safe to print.
    pub fn redacted_options(&self) -> HashMap<String, String> {
        self.options
            .iter()
            .map(|(k, v)| {
                if SECRET_OPTIONS.contains(&canonical_option_key(k)) {
                    (k.clone(), "********".to_string())
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect()
    }
}

impl Debug for StorageSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("bucket", &self.bucket)
            .field("root_path", &self.root_path)
            .field("upload_max_buffer_size", &self.upload_max_buffer_size)
            .field("upload_part_size", &self.upload_part_size)
            .field("upload_max_thread", &self.upload_max_thread)
            .field("use_tz", &self.use_tz)
            .field("options", &self.redacted_options())
            .finish()
    }
}
