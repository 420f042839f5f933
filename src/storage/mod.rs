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

//! Object storage behind a filesystem-like interface
//!
//! [`CosStorage`] implements the [`Storage`] trait on top of an
//! [`ObjectClient`]. Names are resolved under a configured root by
//! [`PathResolver`], so a caller can never reach keys outside of it.
//!
//! The shipped client, [`ObjectStoreClient`], uses the `object_store` crate:
//! its S3-compatible builder for COS, or any store handed in directly.

pub mod client;
pub mod config;
pub mod cos;
pub mod error;
pub mod file;
pub mod object_store;
pub mod path;
pub mod provider;

#[cfg(test)]
pub(crate) mod testing;

// Public exports
pub use client::{HeadObject, ListingPage, ObjectClient, ObjectEntry, UploadOptions};
pub use config::StorageSettings;
pub use cos::CosStorage;
pub use error::{ServiceError, StorageError, StorageResult};
pub use file::{FileContent, LazyRemoteFile};
pub use self::object_store::ObjectStoreClient;
pub use path::{PathResolver, RootPath};
pub use provider::{find_available_name, Storage, StorageTimestamp};
