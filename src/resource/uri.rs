//! Custom-scheme resource URI resolver
//!
//! The renderer fetches library media through URIs like
//! `cdvphotolibrary://thumbnail?photoId=42&width=512&height=384&quality=0.5`
//! and `cdvphotolibrary://photo?photoId=42`. The resource kind rides in
//! the authority; rendering parameters ride in the query. Some renderer
//! asset loaders deliver the same request path-encoded
//! (`cdvphotolibrary/thumbnail/photoId=42&...`), which a pure string
//! rewrite folds back into the canonical query form before parsing.

use crate::error::BridgeError;
use url::Url;

/// Custom scheme the renderer routes to this library.
pub const PHOTO_LIBRARY_SCHEME: &str = "cdvphotolibrary";

pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 384;
pub const DEFAULT_QUALITY: f64 = 0.5;

/// A validated thumbnail fetch: bounded dimensions, quality in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRequest {
    pub photo_id: String,
    pub width: u32,
    pub height: u32,
    pub quality: f64,
}

/// A validated full-photo fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRequest {
    pub photo_id: String,
}

/// A resource URI resolved into its typed request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    Thumbnail(ThumbnailRequest),
    Photo(PhotoRequest),
}

impl ResourceRequest {
    pub fn photo_id(&self) -> &str {
        match self {
            Self::Thumbnail(req) => &req.photo_id,
            Self::Photo(req) => &req.photo_id,
        }
    }
}

/// Parse a resource URI into a typed request.
///
/// Unset numeric parameters take the documented defaults rather than
/// erroring; present-but-malformed (or out-of-range) parameters fail with
/// `InvalidParameter` naming the offender.
pub fn resolve(uri: &str) -> Result<ResourceRequest, BridgeError> {
    let url =
        Url::parse(uri).map_err(|_| BridgeError::UnsupportedResourceKind(uri.to_string()))?;

    if url.scheme() != PHOTO_LIBRARY_SCHEME {
        return Err(BridgeError::UnsupportedResourceKind(uri.to_string()));
    }

    let kind = url.host_str().unwrap_or_default().to_ascii_lowercase();
    // The authority is the whole resource kind; extra path segments mean
    // the URI is not ours.
    if !url.path().is_empty() && url.path() != "/" {
        return Err(BridgeError::UnsupportedResourceKind(uri.to_string()));
    }

    // Kind precedence first: an unknown kind is unsupported even when
    // other parameters are also wrong.
    if kind != "thumbnail" && kind != "photo" {
        return Err(BridgeError::UnsupportedResourceKind(uri.to_string()));
    }

    let photo_id = query_param(&url, "photoId")
        .filter(|id| !id.is_empty())
        .ok_or(BridgeError::MissingIdentifier)?;

    match kind.as_str() {
        "thumbnail" => {
            let width = numeric_param(&url, "width", DEFAULT_WIDTH, |w: u32| w > 0)?;
            let height = numeric_param(&url, "height", DEFAULT_HEIGHT, |h: u32| h > 0)?;
            let quality =
                numeric_param(&url, "quality", DEFAULT_QUALITY, |q: f64| (0.0..=1.0).contains(&q))?;

            Ok(ResourceRequest::Thumbnail(ThumbnailRequest {
                photo_id,
                width,
                height,
                quality,
            }))
        }
        "photo" => Ok(ResourceRequest::Photo(PhotoRequest { photo_id })),
        _ => Err(BridgeError::UnsupportedResourceKind(uri.to_string())),
    }
}

/// Rewrite the path-encoded form into the canonical query form.
///
/// `cdvphotolibrary/thumbnail/photoId=42&width=512` becomes
/// `cdvphotolibrary://thumbnail?photoId=42&width=512`. Pure string
/// transform; applied only when the path starts with the scheme prefix,
/// otherwise the input is not ours and `None` is returned.
pub fn rewrite_path_form(path: &str) -> Option<String> {
    let rest = path.strip_prefix("cdvphotolibrary/")?;
    let mut rewritten = format!("{PHOTO_LIBRARY_SCHEME}://{rest}");
    rewritten = rewritten.replacen("thumbnail/", "thumbnail?", 1);
    rewritten = rewritten.replacen("photo/", "photo?", 1);
    Some(rewritten)
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Numeric query parameter with a default for absent/empty values and a
/// validity predicate for present ones.
fn numeric_param<T: std::str::FromStr + Copy>(
    url: &Url,
    name: &'static str,
    default: T,
    valid: impl Fn(T) -> bool,
) -> Result<T, BridgeError> {
    match query_param(url, name) {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => {
            let value: T = raw.parse().map_err(|_| BridgeError::InvalidParameter(name))?;
            if valid(value) {
                Ok(value)
            } else {
                Err(BridgeError::InvalidParameter(name))
            }
        }
    }
}
