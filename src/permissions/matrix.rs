//! Version-banded permission capability table
//!
//! The platform changed its media-permission model twice: version 29
//! added the location-metadata permission for image reads, and version 33
//! replaced the coarse storage permissions with per-media-kind scoped
//! permissions. Rather than branching on the version at call sites, the
//! table is an ordered list of additive version bands; resolving a
//! requirement unions every band whose version range contains the
//! platform version. New bands can be appended without touching the
//! results existing bands produce.

use super::{AccessMode, MediaKind, Permission, PermissionSet};

/// First version with the location-metadata permission.
pub const VERSION_MEDIA_LOCATION: u32 = 29;
/// First version with scoped per-media-kind permissions.
pub const VERSION_SCOPED_MEDIA: u32 = 33;

/// One contiguous range of platform versions sharing the same additions
/// to the required-permission sets.
#[derive(Debug, Clone, Copy)]
pub struct VersionBand {
    /// Band label used in diagnostics.
    pub name: &'static str,
    /// First platform version the band applies to.
    pub min_version: u32,
    /// First platform version the band no longer applies to, if bounded.
    pub max_version: Option<u32>,
    /// Additive grants, one slot per (kind, mode) pair.
    grants: BandGrants,
}

#[derive(Debug, Clone, Copy)]
struct BandGrants {
    image_read: &'static [Permission],
    image_write: &'static [Permission],
    video_read: &'static [Permission],
    video_write: &'static [Permission],
}

impl VersionBand {
    fn applies_to(&self, version: u32) -> bool {
        version >= self.min_version && self.max_version.map_or(true, |max| version < max)
    }

    fn additions(&self, kind: MediaKind, mode: AccessMode) -> &'static [Permission] {
        match (kind, mode) {
            (MediaKind::Image, AccessMode::Read) => self.grants.image_read,
            (MediaKind::Image, AccessMode::Write) => self.grants.image_write,
            (MediaKind::Video, AccessMode::Read) => self.grants.video_read,
            (MediaKind::Video, AccessMode::Write) => self.grants.video_write,
        }
    }
}

/// The capability table. Order within the list carries no meaning; every
/// matching band contributes its additions.
///
/// The `media-location-write-compat` band exists because on pre-33
/// platforms a write requirement accumulates the full read set, so image
/// writes there also need the location permission. From 33 on, writes
/// require only the scoped image permission.
const BANDS: &[VersionBand] = &[
    VersionBand {
        name: "legacy-storage",
        min_version: 0,
        max_version: Some(VERSION_SCOPED_MEDIA),
        grants: BandGrants {
            image_read: &[Permission::ReadExternalStorage],
            image_write: &[Permission::ReadExternalStorage, Permission::WriteExternalStorage],
            video_read: &[Permission::ReadExternalStorage],
            video_write: &[Permission::ReadExternalStorage, Permission::WriteExternalStorage],
        },
    },
    VersionBand {
        name: "media-location",
        min_version: VERSION_MEDIA_LOCATION,
        max_version: None,
        grants: BandGrants {
            image_read: &[Permission::AccessMediaLocation],
            image_write: &[],
            video_read: &[],
            video_write: &[],
        },
    },
    VersionBand {
        name: "media-location-write-compat",
        min_version: VERSION_MEDIA_LOCATION,
        max_version: Some(VERSION_SCOPED_MEDIA),
        grants: BandGrants {
            image_read: &[],
            image_write: &[Permission::AccessMediaLocation],
            video_read: &[],
            video_write: &[],
        },
    },
    VersionBand {
        name: "scoped-media",
        min_version: VERSION_SCOPED_MEDIA,
        max_version: None,
        grants: BandGrants {
            image_read: &[Permission::ReadMediaImages],
            image_write: &[Permission::ReadMediaImages],
            video_read: &[Permission::ReadMediaVideo],
            video_write: &[Permission::ReadMediaVideo],
        },
    },
];

/// Pure accessor over the fixed capability table.
///
/// Holds the platform version it was built for; requirement sets are
/// recomputed on every call, never cached.
#[derive(Debug, Clone, Copy)]
pub struct PermissionMatrix {
    platform_version: u32,
}

impl PermissionMatrix {
    pub fn new(platform_version: u32) -> Self {
        Self { platform_version }
    }

    pub fn platform_version(&self) -> u32 {
        self.platform_version
    }

    /// Permissions required to perform `mode` on `kind` media on this
    /// platform version: the union of every matching band's additions.
    pub fn required(&self, kind: MediaKind, mode: AccessMode) -> PermissionSet {
        let mut set = PermissionSet::new();
        for band in BANDS {
            if band.applies_to(self.platform_version) {
                for &permission in band.additions(kind, mode) {
                    set.insert(permission);
                }
            }
        }
        set
    }

    /// Union of requirements over several (kind, mode) pairs, as used by
    /// actions that touch more than one media kind.
    pub fn required_for(&self, pairs: &[(MediaKind, AccessMode)]) -> PermissionSet {
        pairs
            .iter()
            .fold(PermissionSet::new(), |acc, &(kind, mode)| {
                acc.union(self.required(kind, mode))
            })
    }
}
