//! Recording [`ObjectClient`] double used by the unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::client::{HeadObject, ListingPage, ObjectClient, ObjectEntry, UploadOptions};
use super::error::{ServiceError, StorageResult};

/// A call the adapter made against the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Head(String),
    Get(String),
    Upload {
        key: String,
        content: Bytes,
        options: UploadOptions,
    },
    List {
        prefix: String,
        marker: String,
    },
    Delete(String),
    Uri(String),
}

pub struct MockClient {
    bucket: String,
    calls: Mutex<Vec<Call>>,
    head: Result<HeadObject, ServiceError>,
    body: Result<Bytes, ServiceError>,
    pages: Mutex<VecDeque<ListingPage>>,
    delete: Result<(), ServiceError>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            bucket: "test-bucket".to_string(),
            calls: Mutex::new(Vec::new()),
            head: Ok(HeadObject {
                content_length: 0,
                last_modified: "Sun, 22 Aug 2021 04:18:16 GMT".to_string(),
                etag: None,
            }),
            body: Ok(Bytes::new()),
            pages: Mutex::new(VecDeque::new()),
            delete: Ok(()),
        }
    }

    pub fn with_head(mut self, head: HeadObject) -> Self {
        self.head = Ok(head);
        self
    }

    pub fn with_head_error(mut self, error: ServiceError) -> Self {
        self.head = Err(error);
        self
    }

    pub fn with_body(mut self, body: &'static [u8]) -> Self {
        self.body = Ok(Bytes::from_static(body));
        self
    }

    pub fn with_body_error(mut self, error: ServiceError) -> Self {
        self.body = Err(error);
        self
    }

    pub fn with_pages(self, pages: Vec<ListingPage>) -> Self {
        *self.pages.lock().unwrap() = pages.into();
        self
    }

    pub fn with_delete_error(mut self, error: ServiceError) -> Self {
        self.delete = Err(error);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Build a listing page from bare keys.
pub fn page(keys: &[&str], is_truncated: bool, next_marker: Option<&str>) -> ListingPage {
    ListingPage {
        contents: keys.iter().map(|k| ObjectEntry::new(*k)).collect(),
        is_truncated,
        next_marker: next_marker.map(str::to_string),
    }
}

#[async_trait]
impl ObjectClient for MockClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_object(&self, key: &str) -> StorageResult<HeadObject> {
        self.record(Call::Head(key.to_string()));
        Ok(self.head.clone()?)
    }

    async fn get_object(&self, key: &str) -> StorageResult<Bytes> {
        self.record(Call::Get(key.to_string()));
        Ok(self.body.clone()?)
    }

    async fn upload_from_buffer(
        &self,
        key: &str,
        content: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        self.record(Call::Upload {
            key: key.to_string(),
            content,
            options,
        });
        Ok(())
    }

    async fn list_objects(&self, prefix: &str, marker: &str) -> StorageResult<ListingPage> {
        self.record(Call::List {
            prefix: prefix.to_string(),
            marker: marker.to_string(),
        });
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.record(Call::Delete(key.to_string()));
        Ok(self.delete.clone()?)
    }

    fn uri(&self, key: &str) -> StorageResult<String> {
        self.record(Call::Uri(key.to_string()));
        Ok(format!(
            "https://{}.cos.region.myqcloud.com{}",
            self.bucket, key
        ))
    }
}
