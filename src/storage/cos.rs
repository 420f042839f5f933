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

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::client::{ObjectClient, ObjectEntry, UploadOptions};
use super::config::StorageSettings;
use super::error::{StorageError, StorageResult};
use super::file::LazyRemoteFile;
use super::object_store::ObjectStoreClient;
use super::path::PathResolver;
use super::provider::{find_available_name, Storage, StorageTimestamp};
use crate::util::timing::timed;

/// [`Storage`] backed by a COS bucket.
///
/// Every name is resolved under the configured root before it reaches the
/// client. Operations make their remote calls one after another and keep no
/// state between calls.
///
/// # Examples
///
/// ```no_run
/// use cos_storage::storage::{CosStorage, Storage, StorageSettings};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
/// let settings = StorageSettings::new("examplebucket-1250000000")
///     .with_root_path("/media")
///     .with_option("region", "ap-guangzhou")
///     .with_option("secret_id", "SECRET_ID")
///     .with_option("secret_key", "SECRET_KEY");
///
/// let storage = CosStorage::from_settings(settings)?;
/// let (dirs, files) = storage.listdir("uploads/").await?;
/// println!("{:?} {:?}", dirs, files);
/// # Ok(())
/// # }
/// ```
pub struct CosStorage {
    settings: StorageSettings,
    resolver: PathResolver,
    upload: UploadOptions,
    client: Arc<dyn ObjectClient>,
}

impl CosStorage {
    /// Create a storage over an existing client.
    ///
    /// # Arguments
    ///
    /// * `settings` - Bucket, root and upload settings
    /// * `client` - The object client every remote call goes through
    ///
    /// # Errors
    ///
    /// Fails when the settings do not validate; see [`StorageSettings::validate`].
    pub fn new(settings: StorageSettings, client: Arc<dyn ObjectClient>) -> StorageResult<Self> {
        settings.validate()?;
        let resolver = PathResolver::new(settings.root()?);
        let upload = settings.upload_options();

        info!(
            "Created COS storage for bucket={}, root={}",
            settings.bucket,
            resolver.root()
        );

        Ok(Self {
            settings,
            resolver,
            upload,
            client,
        })
    }

    /// Create a storage talking to COS through an [`ObjectStoreClient`].
    pub fn from_settings(settings: StorageSettings) -> StorageResult<Self> {
        settings.validate()?;
        let client = ObjectStoreClient::from_settings(&settings)?;
        Self::new(settings, Arc::new(client))
    }

    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    pub fn settings(&self) -> &StorageSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn client(&self) -> &Arc<dyn ObjectClient> {
        &self.client
    }

    /// Resolve a name to its object key under the root.
    pub fn full_path(&self, name: &str) -> StorageResult<String> {
        self.resolver.resolve(name)
    }

    /// Collect every page of a listing, following continuation markers.
    async fn list_all(&self, prefix: &str) -> StorageResult<Vec<ObjectEntry>> {
        let mut contents = Vec::new();
        let mut marker = String::new();
        loop {
            let page = timed(
                "list_objects",
                prefix,
                self.client.list_objects(prefix, &marker),
            )
            .await?;
            if !page.is_truncated {
                contents.extend(page.contents);
                return Ok(contents);
            }
            marker = match page.continuation() {
                Some(next) if next > marker.as_str() => next.to_string(),
                Some(next) => {
                    return Err(StorageError::InvalidListing(format!(
                        "continuation marker '{}' does not advance past '{}' for prefix '{}'",
                        next, marker, prefix
                    )))
                }
                None => {
                    return Err(StorageError::InvalidListing(format!(
                        "truncated page without a continuation marker for prefix '{}'",
                        prefix
                    )))
                }
            };
            contents.extend(page.contents);
        }
    }
}

/// Parse an RFC 1123 `Last-Modified` header into the configured flavor of time.
fn parse_last_modified(value: &str, use_tz: bool) -> StorageResult<StorageTimestamp> {
    let parsed = DateTime::parse_from_rfc2822(value).map_err(|source| {
        StorageError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })?;
    let utc = parsed.with_timezone(&Utc);
    if use_tz {
        Ok(StorageTimestamp::Aware(utc))
    } else {
        Ok(StorageTimestamp::Naive(utc.with_timezone(&Local).naive_local()))
    }
}

/// Split entries into directory and file keys, first appearance wins.
fn partition_entries(entries: Vec<ObjectEntry>) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut directories = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        if !seen.insert(entry.key.clone()) {
            continue;
        }
        if entry.is_directory() {
            directories.push(entry.key);
        } else {
            files.push(entry.key);
        }
    }
    (directories, files)
}

#[async_trait]
impl Storage for CosStorage {
    type File = LazyRemoteFile;

    fn open(&self, name: &str) -> StorageResult<LazyRemoteFile> {
        let key = self.resolver.resolve(name)?;
        Ok(LazyRemoteFile::new(key, Arc::clone(&self.client)))
    }

    async fn save(&self, name: &str, content: Bytes) -> StorageResult<String> {
        let key = self.resolver.resolve(name)?;
        timed(
            "upload_from_buffer",
            &key,
            self.client.upload_from_buffer(&key, content, self.upload),
        )
        .await?;
        Ok(self.resolver.relative(&key).to_string())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let key = self.resolver.resolve(name)?;
        match timed("delete_object", &key, self.client.delete_object(&key)).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let key = self.resolver.resolve(name)?;
        match timed("head_object", &key, self.client.head_object(&key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn listdir(&self, path: &str) -> StorageResult<(Vec<String>, Vec<String>)> {
        let key = self.resolver.resolve(path)?;
        let prefix = key.trim_start_matches('/');
        let entries = self.list_all(prefix).await?;
        Ok(partition_entries(entries))
    }

    async fn size(&self, name: &str) -> StorageResult<u64> {
        let key = self.resolver.resolve(name)?;
        let head = timed("head_object", &key, self.client.head_object(&key)).await?;
        Ok(head.content_length)
    }

    async fn get_modified_time(&self, name: &str) -> StorageResult<StorageTimestamp> {
        let key = self.resolver.resolve(name)?;
        let head = timed("head_object", &key, self.client.head_object(&key)).await?;
        parse_last_modified(&head.last_modified, self.settings.use_tz)
    }

    async fn get_accessed_time(&self, _name: &str) -> StorageResult<StorageTimestamp> {
        Err(StorageError::NotImplemented("get_accessed_time"))
    }

    async fn get_created_time(&self, _name: &str) -> StorageResult<StorageTimestamp> {
        Err(StorageError::NotImplemented("get_created_time"))
    }

    fn path(&self, _name: &str) -> StorageResult<PathBuf> {
        Err(StorageError::NotImplemented("path"))
    }

    fn url(&self, name: &str) -> StorageResult<String> {
        let key = self.resolver.resolve(name)?;
        self.client.uri(&key)
    }

    async fn get_available_name(
        &self,
        name: &str,
        max_length: Option<usize>,
    ) -> StorageResult<String> {
        let key = self.resolver.resolve(name)?;
        find_available_name(self, &key, max_length).await
    }
}

impl Debug for CosStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CosStorage(bucket={}, root={}, client={:?})",
            self.settings.bucket,
            self.resolver.root(),
            self.client
        )
    }
}
