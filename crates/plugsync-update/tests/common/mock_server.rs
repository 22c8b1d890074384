//! Mock server helpers for the commit-list and archive endpoints

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::constants::*;

/// API prefix the updater is pointed at
pub fn api_url(server: &MockServer) -> String {
    format!("{}/repos", server.uri())
}

/// Commit-list path for the default repository
pub fn commits_path() -> String {
    format!("/repos/{}/{}/commits", OWNER, NAME)
}

/// Archive path for the default repository
pub fn zipball_path() -> String {
    format!("/repos/{}/{}/zipball/master", OWNER, NAME)
}

/// Commit-list payload, newest first
pub fn commits_body(shas: &[&str]) -> Value {
    Value::Array(
        shas.iter()
            .map(|sha| json!({ "sha": sha, "commit": { "message": "change" } }))
            .collect(),
    )
}

/// Serve a commit list for every request
pub async fn mock_commits(server: &MockServer, shas: &[&str]) {
    Mock::given(method("GET"))
        .and(path(commits_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits_body(shas)))
        .mount(server)
        .await;
}

/// Serve a commit list for the next request only
pub async fn mock_commits_once(server: &MockServer, shas: &[&str]) {
    Mock::given(method("GET"))
        .and(path(commits_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits_body(shas)))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

/// Serve an error object from the commit-list endpoint
pub async fn mock_commits_error(server: &MockServer, status: u16, message: &str) {
    Mock::given(method("GET"))
        .and(path(commits_path()))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "message": message,
            "documentation_url": "https://docs.example.com"
        })))
        .mount(server)
        .await;
}

/// Archive response with a Content-Disposition file name
pub fn archive_response(bytes: Vec<u8>, file_name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header(
            "Content-Disposition",
            format!("attachment; filename={}", file_name).as_str(),
        )
        .insert_header("Content-Type", "application/zip")
        .set_body_bytes(bytes)
}

/// Serve an archive from the zipball endpoint, expecting `times` requests
pub async fn mock_archive(server: &MockServer, bytes: Vec<u8>, times: u64) {
    let file_name = format!("{}.zip", archive_folder(SHA_V1));
    Mock::given(method("GET"))
        .and(path(zipball_path()))
        .respond_with(archive_response(bytes, &file_name))
        .expect(times)
        .mount(server)
        .await;
}

/// Serve an archive once, holding the response back for `delay`
pub async fn mock_slow_archive(server: &MockServer, bytes: Vec<u8>, delay: Duration) {
    let file_name = format!("{}.zip", archive_folder(SHA_V1));
    Mock::given(method("GET"))
        .and(path(zipball_path()))
        .respond_with(archive_response(bytes, &file_name).set_delay(delay))
        .expect(1)
        .mount(server)
        .await;
}

/// Redirect response pointing at `location`
pub fn redirect(status: u16, location: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("Location", location)
}
