//! Destination filename derivation for order images.
//!
//! Delivery photos are named after the order timestamp, thumbnails after the
//! last path segment of their URL. Both functions are pure; the caller joins
//! the result onto the matching output directory.

use crate::error::FetchError;
use url::Url;

/// Directory (under the save root) holding delivery photos
pub const DELIVERY_PHOTOS_DIR: &str = "delivery_photos";
/// Directory (under the save root) holding product thumbnails
pub const PRODUCT_THUMBNAILS_DIR: &str = "product_thumbnails";

/// Builds the file name of a delivery photo.
///
/// Spaces in `date_time` become colons, then every colon becomes a hyphen.
/// The extension of the URL's last path segment is appended with a single dot.
///
/// # Arguments
/// * `date_time` - Textual order timestamp, e.g. `2024-01-01 10:00:00`
/// * `url` - Delivery photo URL
///
/// # Returns
/// File name such as `2024-01-01-10-00-00.jpg`
pub fn delivery_photo_file_name(date_time: &str, url: &str) -> Result<String, FetchError> {
    if date_time.trim().is_empty() {
        return Err(FetchError::InvalidName(date_time.to_string()));
    }
    let stem = date_time.replace(' ', ":").replace(':', "-");
    if stem.contains(['/', '\\']) || stem == "." || stem == ".." {
        return Err(FetchError::InvalidName(date_time.to_string()));
    }

    let parsed = parse(url)?;
    match last_segment(&parsed).and_then(extension) {
        Some(ext) => Ok(format!("{stem}.{ext}")),
        None => Ok(stem),
    }
}

/// Builds the file name of a product thumbnail: the last non-empty path
/// segment of `url`, without query string or fragment.
pub fn thumbnail_file_name(url: &str) -> Result<String, FetchError> {
    let parsed = parse(url)?;
    last_segment(&parsed)
        .map(str::to_string)
        .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))
}

fn parse(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))
}

fn last_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}

/// Extension without its leading dot. A leading dot on the segment itself
/// (`.hidden`) does not start an extension.
fn extension(segment: &str) -> Option<&str> {
    match segment.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&segment[idx + 1..]).filter(|ext| !ext.is_empty()),
    }
}
