#[path = "../../src/test_support/loopback.rs"]
#[allow(dead_code)]
pub mod loopback;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts HEAD and GET handlers serving `body` as `media_type` at `route`.
#[allow(dead_code)]
pub async fn mount_image(server: &MockServer, route: &str, media_type: &str, body: &[u8]) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", media_type)
                .insert_header("Content-Length", body.len().to_string().as_str()),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", media_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

/// Names of the regular files in `dir`, sorted.
#[allow(dead_code)]
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| entry.path().is_file())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
