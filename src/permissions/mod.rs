//! Platform media permissions
//!
//! This module handles:
//! - The permission identifiers the platform understands (matrix.rs)
//! - The version-banded capability table mapping media kind + access mode
//!   to required permissions (matrix.rs)
//! - Checking a required set against the platform-owned grant cache

pub mod matrix;

pub use matrix::{PermissionMatrix, VersionBand};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single platform permission identifier.
///
/// The set is closed: these are the only permissions the media library
/// ever needs, across all supported platform versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Coarse storage read (pre-scoped-media platforms).
    ReadExternalStorage,
    /// Coarse storage write (pre-scoped-media platforms).
    WriteExternalStorage,
    /// Location metadata embedded in images (EXIF GPS).
    AccessMediaLocation,
    /// Fine-grained image access (scoped-media platforms).
    ReadMediaImages,
    /// Fine-grained video access (scoped-media platforms).
    ReadMediaVideo,
}

impl Permission {
    /// Stable platform identifier string for this permission.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadExternalStorage => "android.permission.READ_EXTERNAL_STORAGE",
            Self::WriteExternalStorage => "android.permission.WRITE_EXTERNAL_STORAGE",
            Self::AccessMediaLocation => "android.permission.ACCESS_MEDIA_LOCATION",
            Self::ReadMediaImages => "android.permission.READ_MEDIA_IMAGES",
            Self::ReadMediaVideo => "android.permission.READ_MEDIA_VIDEO",
        }
    }
}

/// Kind of media an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Whether an operation reads from or writes to the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// An immutable set of required permissions.
///
/// Always recomputed from (kind, mode, version) at request time; never
/// mutated in place once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.0.contains(&permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    /// Union with another set, consuming both.
    pub fn union(mut self, other: PermissionSet) -> PermissionSet {
        self.0.extend(other.0);
        self
    }

    /// Insert a single permission (used while the matrix builds a result).
    pub(crate) fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Platform-owned grant cache and permission-request entry point.
///
/// The grant state is owned and mutated by the platform; the core only
/// ever reads it, and re-checks on every call rather than caching grants.
pub trait PlatformPermissions: Send + Sync {
    /// Whether the permission is currently granted.
    fn is_granted(&self, permission: Permission) -> bool;

    /// Trigger the asynchronous OS-level permission dialog.
    ///
    /// The grant decision may require user interaction of indefinite
    /// duration; the platform later reports the outcome through the
    /// dispatcher's permission-result callback, keyed by `request_code`.
    fn request(&self, request_code: u32, permissions: &[Permission]);
}

/// True iff at least one permission in the set is not currently granted.
/// Short-circuits on the first missing permission.
pub fn is_missing(required: &PermissionSet, platform: &dyn PlatformPermissions) -> bool {
    required.iter().any(|p| !platform.is_granted(p))
}

/// All permissions in the set that are not currently granted, for
/// diagnostic reporting.
pub fn missing(required: &PermissionSet, platform: &dyn PlatformPermissions) -> Vec<Permission> {
    required.iter().filter(|&p| !platform.is_granted(p)).collect()
}
