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

use thiserror::Error;

/// Error codes the service uses to say "no such object".
const NOT_FOUND_CODES: [&str; 2] = ["NoSuchResource", "NoSuchKey"];

/// Error reported by the remote object-storage service.
///
/// Mirrors what the service puts on the wire: an HTTP status plus a short
/// string code (`NoSuchResource`, `AccessDenied`, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Service error {status_code} {error_code}: {message}")]
pub struct ServiceError {
    pub status_code: u16,
    pub error_code: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(status_code: u16, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            error_code: error_code.into(),
            message: message.into(),
        }
    }

    /// Shorthand for the distinguished "object does not exist" reply.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, NOT_FOUND_CODES[0], message)
    }

    /// True only for a 404 carrying one of the not-found codes.
    pub fn is_not_found(&self) -> bool {
        self.status_code == 404 && NOT_FOUND_CODES.contains(&self.error_code.as_str())
    }
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Suspicious path: '{path}' is located outside of the root '{root}'")]
    SuspiciousPath { path: String, root: String },

    #[error("Invalid file name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Could not find an available name for '{0}', allow a longer maximum length")]
    NoAvailableName(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Operation not implemented by this backend: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid timestamp '{value}': {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid listing response: {0}")]
    InvalidListing(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl StorageError {
    /// True when this is a remote not-found reply.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Service(e) if e.is_not_found())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
