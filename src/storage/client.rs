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
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::StorageResult;

/// Metadata returned by a head-object request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadObject {
    /// Object size in bytes
    pub content_length: u64,

    /// Raw `Last-Modified` header, e.g. `Sun, 22 Aug 2021 04:18:16 GMT`
    pub last_modified: String,

    /// ETag, when the service reports one
    pub etag: Option<String>,
}

/// One object returned by a list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: Option<u64>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
        }
    }

    /// Directory markers are plain objects whose key ends with `/`.
    pub fn is_directory(&self) -> bool {
        self.key.ends_with('/')
    }
}

/// A single page of a paginated listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Entries in key order
    pub contents: Vec<ObjectEntry>,

    /// Whether more entries remain after this page
    pub is_truncated: bool,

    /// Marker to echo back for the next page
    pub next_marker: Option<String>,
}

impl ListingPage {
    /// The marker to continue from: the reported one, else the last key seen.
    pub fn continuation(&self) -> Option<&str> {
        self.next_marker
            .as_deref()
            .or_else(|| self.contents.last().map(|entry| entry.key.as_str()))
    }
}

/// Upload tuning knobs, forwarded to the client untouched.
///
/// Sizes are in megabytes, matching the COS SDK conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Largest body sent in a single request before switching to multipart
    pub max_buffer_size: Option<u64>,

    /// Size of each multipart part
    pub part_size: Option<u64>,

    /// Number of parts uploaded concurrently
    pub max_thread: Option<usize>,
}

impl UploadOptions {
    pub fn is_empty(&self) -> bool {
        self.max_buffer_size.is_none() && self.part_size.is_none() && self.max_thread.is_none()
    }
}

/// The object-storage client the storage adapter delegates to.
///
/// A client is bound to one bucket. Keys are passed exactly as the adapter
/// resolved them (leading `/` included); stripping it for the wire is the
/// client's concern. Remote failures surface as
/// [`StorageError::Service`](super::error::StorageError::Service).
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Name of the bucket this client talks to.
    fn bucket(&self) -> &str;

    /// Fetch object metadata.
    async fn head_object(&self, key: &str) -> StorageResult<HeadObject>;

    /// Fetch the whole object body.
    async fn get_object(&self, key: &str) -> StorageResult<Bytes>;

    /// Upload `content` as the object body.
    ///
    /// How (and whether) the tuning options split the upload is up to the
    /// client.
    async fn upload_from_buffer(
        &self,
        key: &str,
        content: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()>;

    /// List one page of objects whose key starts with `prefix`, strictly after
    /// `marker` (empty for the first page).
    async fn list_objects(&self, prefix: &str, marker: &str) -> StorageResult<ListingPage>;

    /// Delete an object.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Build the public URL of an object.
    fn uri(&self, key: &str) -> StorageResult<String>;
}

impl Debug for dyn ObjectClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "ObjectClient(bucket={})", self.bucket())
    }
}
