//! Media type gating for fetched resources.

/// Image media types accepted for storage.
const ACCEPTED_MEDIA_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/svg+xml",
];

/// Strips parameters (`; charset=...`), surrounding whitespace and case.
#[must_use]
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Returns true when the declared media type is an accepted image format.
///
/// Unknown or empty types are rejected.
///
/// # Examples
///
/// ```
/// use image_fetcher::is_acceptable_media_type;
///
/// assert!(is_acceptable_media_type("image/PNG; charset=binary"));
/// assert!(!is_acceptable_media_type("text/html"));
/// assert!(!is_acceptable_media_type(""));
/// ```
#[must_use]
pub fn is_acceptable_media_type(media_type: &str) -> bool {
    let normalized = normalize_media_type(media_type);
    ACCEPTED_MEDIA_TYPES.contains(&normalized.as_str())
}

/// Canonical file extension for an accepted image media type.
pub(crate) fn extension_for_media_type(media_type: &str) -> Option<&'static str> {
    match normalize_media_type(media_type).as_str() {
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        "image/bmp" => Some(".bmp"),
        "image/tiff" => Some(".tiff"),
        "image/svg+xml" => Some(".svg"),
        _ => None,
    }
}
