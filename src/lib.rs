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

//! # COS Storage
//!
//! A file storage backend for Tencent Cloud Object Storage (COS) and other
//! S3-compatible services.
//!
//! It maps filesystem-like operations (open, save, delete, exists, listdir,
//! size, modification time, URL) onto object-storage calls, keeping every key
//! under a configured root prefix.
//!
//! ## Features
//!
//! - **Path safety**: names are normalized against the root and traversal outside it is rejected
//! - **Paginated listings**: directory listings follow continuation markers until exhausted
//! - **Lazy reads**: files are fetched on first access into a spooled temporary buffer
//! - **Upload tuning**: buffer size, part size and upload concurrency pass through to the client
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use cos_storage::{CosStorage, Storage, StorageSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let settings = StorageSettings::new("examplebucket-1250000000")
//!     .with_root_path("/media")
//!     .with_option("region", "ap-guangzhou")
//!     .with_option("secret_id", "SECRET_ID")
//!     .with_option("secret_key", "SECRET_KEY");
//!
//! let storage = CosStorage::from_settings(settings)?;
//!
//! let name = storage.get_available_name("avatars/me.png", Some(100)).await?;
//! let saved = storage.save(&name, Bytes::from_static(b"...")).await?;
//! println!("{} -> {}", saved, storage.url(&saved)?);
//!
//! let mut file = storage.open(&saved)?;
//! let content = file.read_all().await?;
//! assert_eq!(content, b"...");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`storage`] - Storage trait, COS adapter, object clients and configuration
//! - [`util`] - Utility functions and helpers

pub mod storage;
pub mod util;

// Re-export commonly used types
pub use storage::{CosStorage, Storage, StorageError, StorageSettings};
