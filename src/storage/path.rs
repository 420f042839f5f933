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

//! Mapping between storage names and object keys.
//!
//! Every key this crate sends to the service lives under a configured root
//! prefix. [`PathResolver`] joins caller-supplied names onto that prefix and
//! refuses any name that would climb out of it.

use std::fmt::{Display, Formatter};

use super::error::{StorageError, StorageResult};

/// Separator used by object keys.
pub const SEPARATOR: char = '/';

/// Normalized root prefix: always starts and ends with a single `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPath(String);

impl RootPath {
    /// Normalize a configured root.
    ///
    /// `""` and `"/"` become `/`, `namespace` and `/namespace` both become
    /// `/namespace/`. Repeated separators and `.` segments are dropped, `..`
    /// is refused because the root must name a fixed prefix.
    pub fn new(raw: &str) -> StorageResult<Self> {
        let mut segments = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(StorageError::ConfigError(format!(
                        "Root path '{}' must not contain '..' segments",
                        raw
                    )))
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            Ok(Self(SEPARATOR.to_string()))
        } else {
            Ok(Self(format!("/{}/", segments.join("/"))))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the bucket-wide `/` root.
    pub fn is_bucket_root(&self) -> bool {
        self.0.len() == 1
    }
}

impl Default for RootPath {
    fn default() -> Self {
        Self(SEPARATOR.to_string())
    }
}

impl Display for RootPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RootPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Resolves storage names to object keys under a [`RootPath`].
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    root: RootPath,
}

impl PathResolver {
    pub fn new(root: RootPath) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &RootPath {
        &self.root
    }

    /// Resolve `name` to a fully qualified object key.
    ///
    /// Relative names are joined onto the root, absolute names replace it but
    /// must still fall inside it, so a key that was already resolved maps to
    /// itself. Names that normalize to the root return the root unchanged
    /// (trailing separator included). A trailing separator on any other name is
    /// kept since it marks a directory key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SuspiciousPath`] when the normalized name would
    /// sit above the root. A `..` that pops past `/` is always an escape, even
    /// when the root is `/` itself.
    pub fn resolve(&self, name: &str) -> StorageResult<String> {
        if name.is_empty() || name == "/" {
            return Ok(self.root.0.clone());
        }

        let joined = if name.starts_with(SEPARATOR) {
            name.to_string()
        } else {
            format!("{}{}", self.root.0, name)
        };

        let mut stack: Vec<&str> = Vec::new();
        for segment in joined.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    if stack.pop().is_none() {
                        return Err(self.suspicious(name));
                    }
                }
                other => stack.push(other),
            }
        }

        let mut resolved = format!("/{}", stack.join("/"));
        // The root itself, reached through `.`, `dir/..` and friends.
        if resolved.len() + 1 == self.root.0.len() && self.root.0.starts_with(&resolved)
            || resolved == self.root.0
        {
            return Ok(self.root.0.clone());
        }
        if !resolved.starts_with(&self.root.0) {
            return Err(self.suspicious(name));
        }
        if name.ends_with(SEPARATOR) && !stack.is_empty() {
            resolved.push(SEPARATOR);
        }
        Ok(resolved)
    }

    /// Strip the root off an already resolved key.
    ///
    /// Keys outside the root are returned untouched.
    pub fn relative<'a>(&self, key: &'a str) -> &'a str {
        key.strip_prefix(self.root.as_str()).unwrap_or(key)
    }

    fn suspicious(&self, name: &str) -> StorageError {
        StorageError::SuspiciousPath {
            path: name.to_string(),
            root: self.root.0.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(root: &str) -> PathResolver {
        PathResolver::new(RootPath::new(root).unwrap())
    }

    #[test]
    fn test_root_path_normalization() {
        assert_eq!(RootPath::new("").unwrap().as_str(), "/");
        assert_eq!(RootPath::new("/").unwrap().as_str(), "/");
        assert_eq!(RootPath::new("//").unwrap().as_str(), "/");
        assert_eq!(RootPath::new("/namespace").unwrap().as_str(), "/namespace/");
        assert_eq!(RootPath::new("namespace").unwrap().as_str(), "/namespace/");
        assert_eq!(RootPath::new("/namespace/").unwrap().as_str(), "/namespace/");
        assert_eq!(RootPath::new("/a//./b/").unwrap().as_str(), "/a/b/");
    }

    #[test]
    fn test_root_path_rejects_parent_segments() {
        match RootPath::new("/a/../b") {
            Err(StorageError::ConfigError(msg)) => assert!(msg.contains("..")),
            other => panic!("Expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_root_path_bucket_root() {
        assert!(RootPath::default().is_bucket_root());
        assert!(!RootPath::new("ns").unwrap().is_bucket_root());
        assert_eq!(RootPath::new("ns").unwrap().to_string(), "/ns/");
    }

    #[test]
    fn test_resolve_root_aliases() {
        for root in ["/", "/namespace", "/a/b/"] {
            let r = resolver(root);
            let expected = r.root().as_str().to_string();
            assert_eq!(r.resolve("/").unwrap(), expected);
            assert_eq!(r.resolve("").unwrap(), expected);
            assert_eq!(r.resolve(".").unwrap(), expected);
            assert_eq!(r.resolve("./").unwrap(), expected);
            assert_eq!(r.resolve("dir/..").unwrap(), expected);
        }
    }

    #[test]
    fn test_resolve_relative_names() {
        let r = resolver("/");
        assert_eq!(r.resolve("file").unwrap(), "/file");
        assert_eq!(r.resolve("a/b/c.txt").unwrap(), "/a/b/c.txt");
        assert_eq!(r.resolve("a/./b//c.txt").unwrap(), "/a/b/c.txt");
        assert_eq!(r.resolve("a/x/../b.txt").unwrap(), "/a/b.txt");

        let r = resolver("/namespace");
        assert_eq!(r.resolve("file").unwrap(), "/namespace/file");
        assert_eq!(r.resolve("a/b").unwrap(), "/namespace/a/b");
    }

    #[test]
    fn test_resolve_keeps_directory_separator() {
        let r = resolver("/namespace");
        assert_eq!(r.resolve("dir/").unwrap(), "/namespace/dir/");
        assert_eq!(r.resolve("dir").unwrap(), "/namespace/dir");
    }

    #[test]
    fn test_resolve_absolute_names_inside_root() {
        let r = resolver("/namespace");
        assert_eq!(r.resolve("/namespace/file").unwrap(), "/namespace/file");
        assert_eq!(r.resolve("/namespace").unwrap(), "/namespace/");
        assert!(matches!(
            r.resolve("/other/file"),
            Err(StorageError::SuspiciousPath { .. })
        ));
        // Sibling sharing the textual prefix is still outside.
        assert!(matches!(
            r.resolve("/namespace2/file"),
            Err(StorageError::SuspiciousPath { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_traversal_from_bucket_root() {
        let r = resolver("/");
        for name in ["..", "../..", "../file", "a/../../b", "/.."] {
            match r.resolve(name) {
                Err(StorageError::SuspiciousPath { path, root }) => {
                    assert_eq!(path, name);
                    assert_eq!(root, "/");
                }
                other => panic!("Expected SuspiciousPath for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_resolve_rejects_traversal_from_nested_root() {
        let r = resolver("/namespace");
        for name in ["..", "../..", "../namespace2/x", "a/../../x"] {
            assert!(
                matches!(r.resolve(name), Err(StorageError::SuspiciousPath { .. })),
                "{} should be rejected",
                name
            );
        }
        // Climbing out and back in is fine.
        assert_eq!(r.resolve("../namespace/x").unwrap(), "/namespace/x");
    }

    #[test]
    fn test_resolved_keys_stay_under_root() {
        let names = [
            "a", "a/b", "./a", "a/./b", "a//b", "a/b/../c", "x.tar.gz", "dir/", "deep/er/still",
        ];
        for root in ["/", "/ns", "/ns/inner"] {
            let r = resolver(root);
            for name in names {
                let key = r.resolve(name).unwrap();
                assert!(
                    key.starts_with(r.root().as_str()),
                    "{} resolved to {} outside {}",
                    name,
                    key,
                    r.root()
                );
            }
        }
    }

    #[test]
    fn test_resolve_is_idempotent_on_keys() {
        let r = resolver("/ns");
        let key = r.resolve("a/b.txt").unwrap();
        assert_eq!(r.resolve(&key).unwrap(), key);
    }

    #[test]
    fn test_relative() {
        let r = resolver("/namespace");
        assert_eq!(r.relative("/namespace/a/b.txt"), "a/b.txt");
        assert_eq!(r.relative("/elsewhere"), "/elsewhere");

        let r = resolver("/");
        assert_eq!(r.relative("/file"), "file");
    }
}
