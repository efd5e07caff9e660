//! Safe, collision-free file names for fetched images.
//!
//! Names come from the decoded last URL path segment when it looks like a
//! file name (contains a `.`), otherwise from a short digest of the URL plus
//! an extension inferred from the declared media type.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tracing::debug;
use url::Url;

use super::classify::extension_for_media_type;
use super::constants::FALLBACK_EXTENSION;

/// Digest function applied to the URL for synthesized names.
pub type UrlDigest = fn(&str) -> String;

/// Number of digest characters used in a synthesized name.
const SYNTHESIZED_DIGEST_CHARS: usize = 8;

/// Lowercase hex SHA-256 of the URL string.
#[must_use]
pub fn default_url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Derives file names inside one destination directory.
#[derive(Debug, Clone)]
pub struct NameAllocator {
    dir: PathBuf,
    url_digest: UrlDigest,
}

impl NameAllocator {
    /// Creates an allocator for `dir` using the default URL digest.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_url_digest(dir, default_url_digest)
    }

    /// Creates an allocator with a custom URL digest.
    #[must_use]
    pub fn with_url_digest(dir: impl Into<PathBuf>, url_digest: UrlDigest) -> Self {
        Self {
            dir: dir.into(),
            url_digest,
        }
    }

    /// Destination directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sanitized base name before collision handling.
    #[must_use]
    pub fn candidate_name(&self, url: &str, media_type: Option<&str>) -> String {
        url_file_name(url)
            .map(|name| sanitize_file_name(&name))
            .filter(|name| !is_degenerate(name))
            .unwrap_or_else(|| self.synthesized_name(url, media_type))
    }

    /// Returns a name not occupied in the directory at call time.
    ///
    /// Check-then-use: a concurrent writer may claim the name before it is
    /// used. [`create_unique`](Self::create_unique) is the race-free variant.
    #[must_use]
    pub fn allocate(&self, url: &str, media_type: Option<&str>) -> String {
        let candidate = self.candidate_name(url, media_type);
        if !self.dir.join(&candidate).exists() {
            return candidate;
        }
        (1u64..)
            .map(|counter| with_suffix(&candidate, counter))
            .find(|name| !self.dir.join(name).exists())
            .unwrap_or(candidate)
    }

    /// Creates a new, empty file under a free name and returns it open for writing.
    ///
    /// Uses create-if-absent, moving on to the next `_N` suffix whenever the
    /// name already exists.
    ///
    /// # Errors
    ///
    /// Returns any IO error other than `AlreadyExists`.
    pub async fn create_unique(
        &self,
        url: &str,
        media_type: Option<&str>,
    ) -> io::Result<(String, PathBuf, File)> {
        let candidate = self.candidate_name(url, media_type);
        let mut counter = 0u64;
        loop {
            let name = if counter == 0 {
                candidate.clone()
            } else {
                with_suffix(&candidate, counter)
            };
            let path = self.dir.join(&name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((name, path, file)),
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(name = %name, "name taken, trying next suffix");
                    counter += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn synthesized_name(&self, url: &str, media_type: Option<&str>) -> String {
        let digest: String = (self.url_digest)(url)
            .chars()
            .take(SYNTHESIZED_DIGEST_CHARS)
            .collect();
        let extension = media_type
            .and_then(extension_for_media_type)
            .unwrap_or(FALLBACK_EXTENSION);
        sanitize_file_name(&format!("image_{digest}{extension}"))
    }
}

/// Decoded last path segment, when it contains a `.`.
fn url_file_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let decoded = urlencoding::decode(parsed.path())
        .map_or_else(|_| parsed.path().to_string(), |path| path.into_owned());
    let last = decoded.rsplit('/').next()?;
    last.contains('.').then(|| last.to_string())
}

/// Keeps only alphanumerics, `.`, `_` and `-`.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Empty or dot-only names cannot be used as files.
fn is_degenerate(name: &str) -> bool {
    name.chars().all(|c| c == '.')
}

/// Inserts `_N` before the extension: `cat.png` → `cat_1.png`.
fn with_suffix(name: &str, counter: u64) -> String {
    match name.rfind('.') {
        Some(pos) if pos > 0 => format!("{}_{counter}{}", &name[..pos], &name[pos..]),
        _ => format!("{name}_{counter}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn colliding_digest(_url: &str) -> String {
        "deadbeefcafef00d".to_string()
    }

    #[test]
    fn test_candidate_uses_url_file_name() {
        let allocator = NameAllocator::new("/unused");
        assert_eq!(
            allocator.candidate_name("https://x/y/photo.JPG", None),
            "photo.JPG"
        );
    }

    #[test]
    fn test_candidate_percent_decodes_and_sanitizes() {
        let allocator = NameAllocator::new("/unused");
        assert_eq!(
            allocator.candidate_name("https://x/a/my%20cat%21.png", Some("image/png")),
            "mycat.png"
        );
        assert_eq!(
            allocator.candidate_name("https://x/%E7%8C%AB.gif", None),
            "猫.gif"
        );
    }

    #[test]
    fn test_candidate_synthesizes_for_root_url() {
        let allocator = NameAllocator::new("/unused");
        let name = allocator.candidate_name("https://x/", Some("image/png"));
        assert!(name.starts_with("image_"), "{name}");
        assert!(name.ends_with(".png"), "{name}");
        assert_eq!(name.len(), "image_".len() + 8 + ".png".len());
    }

    #[test]
    fn test_candidate_synthesizes_for_extensionless_segment() {
        let allocator = NameAllocator::new("/unused");
        let name = allocator.candidate_name("https://picsum.photos/800/600", Some("image/jpeg"));
        assert!(name.starts_with("image_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_candidate_fallback_extension() {
        let allocator = NameAllocator::new("/unused");
        assert!(allocator.candidate_name("https://x/img", None).ends_with(".jpg"));
        assert!(
            allocator
                .candidate_name("https://x/img", Some("application/weird"))
                .ends_with(".jpg")
        );
    }

    #[test]
    fn test_candidate_is_deterministic_per_url() {
        let allocator = NameAllocator::new("/unused");
        let a = allocator.candidate_name("https://x/a", None);
        let b = allocator.candidate_name("https://x/a", None);
        let c = allocator.candidate_name("https://x/b", None);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_candidate_degenerate_name_falls_back_to_synthesized() {
        let allocator = NameAllocator::with_url_digest("/unused", colliding_digest);
        // Decodes to "?.!" which sanitizes to "."
        assert_eq!(
            allocator.candidate_name("https://x/%3F.%21", Some("image/gif")),
            "image_deadbeef.gif"
        );
        assert_eq!(
            allocator.candidate_name("https://x/%2A%2A.%2A", None),
            "image_deadbeef.jpg"
        );
    }

    #[test]
    fn test_candidate_unparseable_url_is_synthesized() {
        let allocator = NameAllocator::with_url_digest("/unused", colliding_digest);
        assert_eq!(
            allocator.candidate_name("not a url/cat.png", None),
            "image_deadbeef.jpg"
        );
    }

    #[test]
    fn test_allocate_appends_counter_on_collision() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = NameAllocator::new(temp_dir.path());

        assert_eq!(allocator.allocate("https://x/cat.png", None), "cat.png");
        std::fs::write(temp_dir.path().join("cat.png"), b"1").unwrap();
        assert_eq!(allocator.allocate("https://x/cat.png", None), "cat_1.png");
        std::fs::write(temp_dir.path().join("cat_1.png"), b"2").unwrap();
        assert_eq!(allocator.allocate("https://x/cat.png", None), "cat_2.png");
    }

    #[test]
    fn test_allocate_forced_digest_collision_yields_distinct_names() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = NameAllocator::with_url_digest(temp_dir.path(), colliding_digest);

        let first = allocator.allocate("https://a.example/one", Some("image/png"));
        std::fs::write(temp_dir.path().join(&first), b"one").unwrap();
        let second = allocator.allocate("https://b.example/two", Some("image/png"));

        assert_eq!(first, "image_deadbeef.png");
        assert_eq!(second, "image_deadbeef_1.png");
    }

    #[tokio::test]
    async fn test_create_unique_never_reuses_a_name() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = NameAllocator::with_url_digest(temp_dir.path(), colliding_digest);

        let (first, _, _) = allocator
            .create_unique("https://a.example/x", Some("image/png"))
            .await
            .unwrap();
        let (second, _, _) = allocator
            .create_unique("https://b.example/y", Some("image/png"))
            .await
            .unwrap();

        assert_eq!(first, "image_deadbeef.png");
        assert_eq!(second, "image_deadbeef_1.png");
    }

    #[tokio::test]
    async fn test_create_unique_concurrent_callers_get_distinct_names() {
        let temp_dir = TempDir::new().unwrap();
        let allocator = NameAllocator::with_url_digest(temp_dir.path(), colliding_digest);

        let mut handles = Vec::new();
        for i in 0..8 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://x/{i}");
                allocator.create_unique(&url, None).await.unwrap().0
            }));
        }
        let mut names = Vec::new();
        for handle in handles {
            names.push(handle.await.unwrap());
        }
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("cat.png", 1), "cat_1.png");
        assert_eq!(with_suffix("archive.tar.gz", 2), "archive.tar_2.gz");
        assert_eq!(with_suffix("noext", 3), "noext_3");
        assert_eq!(with_suffix(".hidden", 1), ".hidden_1");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a b/c:d*e.png"), "abcde.png");
        assert_eq!(sanitize_file_name("ok-name_1.webp"), "ok-name_1.webp");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "....etcpasswd");
    }
}
