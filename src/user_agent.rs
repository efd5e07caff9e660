//! Identifying request headers sent with every probe and retrieval.
//!
//! One source for the User-Agent format and the header set so probe and
//! retrieval traffic always identify the tool the same way.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue};

/// Product comment identifying the tool's purpose to server operators.
const UA_COMMENT: &str = "respectful-fetcher";

/// Accept header restricting responses to images, with a low-weight fallback.
pub(crate) const ACCEPT_IMAGES: &str = "image/*,*/*;q=0.8";

const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// Default User-Agent for probe and retrieval requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("image-fetcher/{version} ({UA_COMMENT})")
}

/// Headers attached to every request besides the User-Agent.
///
/// Includes the Do-Not-Track opt-out signal.
#[must_use]
pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_IMAGES));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers
}
