// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use std::path::PathBuf;

use super::error::{StorageError, StorageResult};

/// Length of the random part appended by [`find_available_name`].
pub const RANDOM_SUFFIX_LEN: usize = 7;

/// A point in time reported by a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTimestamp {
    /// UTC time, returned when timezone support is enabled
    Aware(DateTime<Utc>),
    /// Local wall-clock time, returned when timezone support is disabled
    Naive(NaiveDateTime),
}

impl StorageTimestamp {
    pub fn is_aware(&self) -> bool {
        matches!(self, StorageTimestamp::Aware(_))
    }
}

/// File storage contract implemented by every backend.
///
/// Names are relative to the backend's root; how they map to the underlying
/// store is up to the backend. There are no default method bodies: a backend
/// that cannot support an operation must say so with
/// [`StorageError::NotImplemented`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Handle returned by [`open`](Self::open).
    type File: Send;

    /// Open a file for reading.
    ///
    /// # Arguments
    ///
    /// * `name` - The file name, relative to the root
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(Self::File)` - A handle; backends may defer fetching content until it is read
    /// * `Err(StorageError)` - If the name is invalid
    fn open(&self, name: &str) -> StorageResult<Self::File>;

    /// Store `content` under `name`.
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(String)` - The name the content was stored under, relative to the root
    /// * `Err(StorageError)` - If the name is invalid or the upload fails
    async fn save(&self, name: &str, content: Bytes) -> StorageResult<String>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// Check if a file exists.
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok(true)` - The file exists
    /// * `Ok(false)` - The file does not exist
    /// * `Err(StorageError)` - If the existence check fails (not including not-found)
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// List the contents of a directory.
    ///
    /// # Returns
    ///
    /// A `Result` containing:
    /// * `Ok((directories, files))` - Both in listing order
    /// * `Err(StorageError)` - If listing fails
    async fn listdir(&self, path: &str) -> StorageResult<(Vec<String>, Vec<String>)>;

    /// Size of a file in bytes.
    async fn size(&self, name: &str) -> StorageResult<u64>;

    /// Last modification time of a file.
    async fn get_modified_time(&self, name: &str) -> StorageResult<StorageTimestamp>;

    /// Last access time of a file.
    async fn get_accessed_time(&self, name: &str) -> StorageResult<StorageTimestamp>;

    /// Creation time of a file.
    async fn get_created_time(&self, name: &str) -> StorageResult<StorageTimestamp>;

    /// Absolute local filesystem path of a file.
    fn path(&self, name: &str) -> StorageResult<PathBuf>;

    /// URL where the file can be fetched.
    fn url(&self, name: &str) -> StorageResult<String>;

    /// A name based on `name` that is free for new content.
    ///
    /// # Arguments
    ///
    /// * `name` - The desired name
    /// * `max_length` - Optional limit on the returned name's length, in characters
    async fn get_available_name(&self, name: &str, max_length: Option<usize>)
        -> StorageResult<String>;
}

/// Find a name that is not taken yet, starting from `name`.
///
/// While `name` exists (or is longer than `max_length`) a random suffix is put
/// between the file stem and its extensions: `photo.tar.gz` becomes
/// `photo_a1B2c3D.tar.gz`. When the candidate is too long the stem is
/// shortened to fit.
///
/// # Errors
///
/// * [`StorageError::InvalidName`] - `name` has a `..` directory segment or no usable file name
/// * [`StorageError::NoAvailableName`] - the stem had to be truncated to nothing
/// * any error from [`Storage::exists`]
pub async fn find_available_name<S>(
    storage: &S,
    name: &str,
    max_length: Option<usize>,
) -> StorageResult<String>
where
    S: Storage + ?Sized,
{
    let (dir_name, file_name) = split_name(name);
    if dir_name.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
            reason: "path traversal in directory",
        });
    }
    validate_file_name(file_name)?;

    let (file_root, file_ext) = split_extension(file_name);
    let mut file_root = file_root.to_string();
    let mut candidate = name.to_string();

    while storage.exists(&candidate).await? || exceeds(&candidate, max_length) {
        candidate = format!("{}{}", dir_name, alternative_name(&file_root, file_ext));
        let Some(max_length) = max_length else {
            continue;
        };
        let truncation = candidate.chars().count().saturating_sub(max_length);
        if truncation > 0 {
            let keep = file_root.chars().count().saturating_sub(truncation);
            file_root = file_root.chars().take(keep).collect();
            if file_root.is_empty() {
                return Err(StorageError::NoAvailableName(candidate));
            }
            candidate = format!("{}{}", dir_name, alternative_name(&file_root, file_ext));
        }
    }

    Ok(candidate)
}

fn exceeds(name: &str, max_length: Option<usize>) -> bool {
    max_length.is_some_and(|max| name.chars().count() > max)
}

/// Split into the directory part (trailing `/` kept) and the file name.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    }
}

fn validate_file_name(file_name: &str) -> StorageResult<()> {
    if matches!(file_name, "" | "." | "..") {
        return Err(StorageError::InvalidName {
            name: file_name.to_string(),
            reason: "not a file name",
        });
    }
    Ok(())
}

/// Split a file name into its stem and all of its extensions.
///
/// Leading dots belong to the stem (`.bashrc` has no extension) and a name
/// ending in a dot has none either.
fn split_extension(file_name: &str) -> (&str, &str) {
    if file_name.ends_with('.') {
        return (file_name, "");
    }
    let leading = file_name.len() - file_name.trim_start_matches('.').len();
    match file_name[leading..].find('.') {
        Some(idx) => file_name.split_at(leading + idx),
        None => (file_name, ""),
    }
}

fn alternative_name(file_root: &str, file_ext: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}_{}{}", file_root, suffix, file_ext)
}
