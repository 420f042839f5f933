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

//! Lazily fetched remote files.

use bytes::Bytes;
use std::fmt::{Debug, Formatter};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::SpooledTempFile;

use super::client::ObjectClient;
use super::error::StorageResult;
use crate::util::timing::timed;

/// Bytes kept in memory before a fetched body spills to a temporary file.
pub const DEFAULT_SPOOL_LIMIT: usize = 5 * 1024 * 1024;

/// Anything that can stand in as file content.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Content held by a [`LazyRemoteFile`].
pub enum FileContent {
    /// Body fetched from the service
    Spooled(SpooledTempFile),
    /// Content handed in by the caller
    Supplied(Box<dyn ReadSeek>),
}

impl FileContent {
    pub fn is_spooled(&self) -> bool {
        matches!(self, FileContent::Spooled(_))
    }

    /// True once a spooled body has moved from memory to disk.
    pub fn is_rolled(&self) -> bool {
        match self {
            FileContent::Spooled(file) => file.is_rolled(),
            FileContent::Supplied(_) => false,
        }
    }
}

impl Read for FileContent {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            FileContent::Spooled(file) => file.read(buf),
            FileContent::Supplied(reader) => reader.read(buf),
        }
    }
}

impl Seek for FileContent {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            FileContent::Spooled(file) => file.seek(pos),
            FileContent::Supplied(reader) => reader.seek(pos),
        }
    }
}

impl Debug for FileContent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileContent::Spooled(file) => write!(f, "Spooled(rolled={})", file.is_rolled()),
            FileContent::Supplied(_) => write!(f, "Supplied"),
        }
    }
}

enum FileState {
    Unfetched,
    Loaded(FileContent),
}

/// A remote object opened for reading.
///
/// Nothing is fetched on construction. The first call to
/// [`content`](Self::content) downloads the body into a spooled buffer; every
/// later call reuses it. Supplying content with
/// [`set_content`](Self::set_content) skips the download for good.
pub struct LazyRemoteFile {
    name: String,
    client: Arc<dyn ObjectClient>,
    spool_limit: usize,
    state: FileState,
}

impl LazyRemoteFile {
    /// Bind a file to an object key.
    ///
    /// # Arguments
    ///
    /// * `name` - Fully resolved object key
    /// * `client` - Client used for the (single) download
    pub fn new(name: impl Into<String>, client: Arc<dyn ObjectClient>) -> Self {
        Self {
            name: name.into(),
            client,
            spool_limit: DEFAULT_SPOOL_LIMIT,
            state: FileState::Unfetched,
        }
    }

    /// Change how many bytes stay in memory before spilling to disk.
    pub fn with_spool_limit(mut self, spool_limit: usize) -> Self {
        self.spool_limit = spool_limit;
        self
    }

    /// The object key this file is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether content is held, fetched or supplied.
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, FileState::Loaded(_))
    }

    /// The file content, downloading it on first access.
    ///
    /// The returned content is positioned at offset zero right after the
    /// download; afterwards its position is whatever the caller left it at.
    ///
    /// # Errors
    ///
    /// Returns the client's error when the download fails, in which case the
    /// file stays unfetched. Spooling failures surface as
    /// [`StorageError::IoError`](super::error::StorageError::IoError).
    pub async fn content(&mut self) -> StorageResult<&mut FileContent> {
        if let FileState::Unfetched = self.state {
            let spooled = fetch(self.client.as_ref(), &self.name, self.spool_limit).await?;
            self.state = FileState::Loaded(FileContent::Spooled(spooled));
        }
        match &mut self.state {
            FileState::Loaded(content) => Ok(content),
            FileState::Unfetched => unreachable!("content is loaded above"),
        }
    }

    /// Replace the content with caller-supplied data.
    ///
    /// No validation happens and the remote object is never fetched afterwards.
    pub fn set_content(&mut self, content: impl Read + Seek + Send + 'static) {
        self.state = FileState::Loaded(FileContent::Supplied(Box::new(content)));
    }

    /// Read everything from the current position onwards.
    pub async fn read_all(&mut self) -> StorageResult<Vec<u8>> {
        let content = self.content().await?;
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Debug for LazyRemoteFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            FileState::Unfetched => "unfetched".to_string(),
            FileState::Loaded(content) => format!("{:?}", content),
        };
        write!(f, "LazyRemoteFile(name={}, state={})", self.name, state)
    }
}

/// Download a body and spool it.
///
/// Holding `&LazyRemoteFile` across the await would require `Sync` content.
async fn fetch(
    client: &dyn ObjectClient,
    name: &str,
    spool_limit: usize,
) -> StorageResult<SpooledTempFile> {
    let body = timed("get_object", name, client.get_object(name)).await?;
    let spooled = spool(body, spool_limit).await?;
    Ok(spooled)
}

/// Copy a body into a spooled temporary file and rewind it.
async fn spool(body: Bytes, spool_limit: usize) -> io::Result<SpooledTempFile> {
    tokio::task::spawn_blocking(move || -> io::Result<SpooledTempFile> {
        let mut file = SpooledTempFile::new(spool_limit);
        file.write_all(&body)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::{ServiceError, StorageError};
    use crate::storage::testing::{Call, MockClient};
    use std::io::Cursor;

    fn gets(client: &MockClient) -> usize {
        client.count(|c| matches!(c, Call::Get(_)))
    }

    #[tokio::test]
    async fn test_open_does_not_fetch() {
        let client = Arc::new(MockClient::new().with_body(b"test file content"));
        let file = LazyRemoteFile::new("/test-file", client.clone());

        assert!(!file.is_loaded());
        assert_eq!(file.name(), "/test-file");
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_file() {
        let client = Arc::new(MockClient::new().with_body(b"test file content"));
        let mut file = LazyRemoteFile::new("/test-file", client.clone());

        let content = file.content().await.unwrap();
        assert!(content.is_spooled());
        let mut buf = Vec::new();
        content.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"test file content");

        assert!(file.is_loaded());
        assert_eq!(client.calls(), vec![Call::Get("/test-file".to_string())]);
    }

    #[tokio::test]
    async fn test_fetches_at_most_once() {
        let client = Arc::new(MockClient::new().with_body(b"abc"));
        let mut file = LazyRemoteFile::new("/k", client.clone());

        assert_eq!(file.read_all().await.unwrap(), b"abc");
        // Position stays at the end, nothing is re-downloaded.
        assert_eq!(file.read_all().await.unwrap(), b"");
        file.content().await.unwrap().rewind().unwrap();
        assert_eq!(file.read_all().await.unwrap(), b"abc");

        assert_eq!(gets(&client), 1);
    }

    #[tokio::test]
    async fn test_set_file() {
        let client = Arc::new(MockClient::new().with_body(b"remote"));
        let mut file = LazyRemoteFile::new("/test-file", client.clone());

        file.set_content(Cursor::new(b"test file content".to_vec()));
        assert!(file.is_loaded());

        let content = file.content().await.unwrap();
        assert!(!content.is_spooled());
        assert_eq!(file.read_all().await.unwrap(), b"test file content");
        assert_eq!(gets(&client), 0);
    }

    #[tokio::test]
    async fn test_set_content_after_fetch_replaces_it() {
        let client = Arc::new(MockClient::new().with_body(b"remote"));
        let mut file = LazyRemoteFile::new("/k", client.clone());

        assert_eq!(file.read_all().await.unwrap(), b"remote");
        file.set_content(Cursor::new(b"local".to_vec()));
        assert_eq!(file.read_all().await.unwrap(), b"local");
        assert_eq!(gets(&client), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_stays_unfetched() {
        let client = Arc::new(
            MockClient::new().with_body_error(ServiceError::new(403, "AccessDenied", "denied")),
        );
        let mut file = LazyRemoteFile::new("/k", client.clone());

        match file.content().await {
            Err(StorageError::Service(e)) => assert_eq!(e.status_code, 403),
            other => panic!("Expected service error, got {:?}", other.map(|_| ())),
        }
        assert!(!file.is_loaded());
    }

    #[tokio::test]
    async fn test_large_body_spills_to_disk() {
        let client = Arc::new(MockClient::new().with_body(b"0123456789abcdef"));
        let mut file = LazyRemoteFile::new("/big", client).with_spool_limit(8);

        let content = file.content().await.unwrap();
        assert!(content.is_rolled());
        assert_eq!(file.read_all().await.unwrap(), b"0123456789abcdef");
    }

    #[tokio::test]
    async fn test_small_body_stays_in_memory() {
        let client = Arc::new(MockClient::new().with_body(b"tiny"));
        let mut file = LazyRemoteFile::new("/small", client);

        assert!(!file.content().await.unwrap().is_rolled());
    }

    #[test]
    fn test_debug() {
        let client = Arc::new(MockClient::new());
        let mut file = LazyRemoteFile::new("/k", client);
        assert_eq!(
            format!("{:?}", file),
            "LazyRemoteFile(name=/k, state=unfetched)"
        );
        file.set_content(Cursor::new(Vec::new()));
        assert!(format!("{:?}", file).contains("Supplied"));
    }
}
