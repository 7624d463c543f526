//! Minecraft version manifest lookups
//!
//! All three server JAR sources serve the same layout: a top-level
//! `version_manifest.json` listing every version with a link to its detail
//! document, and a detail document whose `downloads.server` entry names the
//! server JAR and its SHA-1.

use crate::core::config::ServerJarSource;
use crate::core::error::ManifestError;
use serde::Deserialize;

use super::http::{self, GetJsonError};

const MANIFEST_PATH: &str = "/mc/game/version_manifest.json";

#[derive(Debug, Deserialize)]
struct VersionManifest {
    latest: Latest,
    versions: Vec<VersionEntry>,
}

#[derive(Debug, Deserialize)]
struct Latest {
    release: String,
}

#[derive(Debug, Deserialize)]
struct VersionEntry {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct VersionDetail {
    downloads: Downloads,
}

#[derive(Debug, Deserialize)]
struct Downloads {
    server: Option<DownloadEntry>,
}

#[derive(Debug, Deserialize)]
struct DownloadEntry {
    url: String,
    sha1: String,
}

/// Where to get a version's server JAR and what it must hash to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDownload {
    pub version: String,
    pub url: String,
    pub sha1: String,
}

/// Reads version manifests from one server JAR source.
pub struct ManifestClient {
    agent: ureq::Agent,
    base: String,
    source_name: String,
}

impl ManifestClient {
    pub fn new(agent: ureq::Agent, source: ServerJarSource) -> Self {
        Self {
            agent,
            base: source.base_url().to_string(),
            source_name: source.to_string(),
        }
    }

    /// Point at an arbitrary base URL (a local mock server in tests).
    pub fn with_base(agent: ureq::Agent, base: impl Into<String>) -> Self {
        Self {
            agent,
            base: base.into().trim_end_matches('/').to_string(),
            source_name: "custom".to_string(),
        }
    }

    fn manifest_url(&self) -> String {
        format!("{}{}", self.base, MANIFEST_PATH)
    }

    fn manifest(&self) -> Result<VersionManifest, ManifestError> {
        let url = self.manifest_url();
        http::get_json(&self.agent, &url).map_err(|e| self.map_error(&url, e))
    }

    /// Id of the newest release (snapshots excluded).
    pub fn latest_release(&self) -> Result<String, ManifestError> {
        Ok(self.manifest()?.latest.release)
    }

    /// Server JAR location and SHA-1 for `version`.
    pub fn server_download(&self, version: &str) -> Result<ServerDownload, ManifestError> {
        let manifest = self.manifest()?;
        let entry = manifest
            .versions
            .into_iter()
            .find(|v| v.id == version)
            .ok_or_else(|| self.not_found(version))?;

        let detail: VersionDetail = http::get_json(&self.agent, &entry.url).map_err(|e| match e {
            GetJsonError::NotFound => self.not_found(version),
            other => self.map_error(&entry.url, other),
        })?;

        let server = detail.downloads.server.ok_or_else(|| self.not_found(version))?;
        Ok(ServerDownload {
            version: version.to_string(),
            url: server.url,
            sha1: server.sha1,
        })
    }

    fn not_found(&self, version: &str) -> ManifestError {
        ManifestError::ResourceNotFound {
            version: version.to_string(),
            source_name: self.source_name.clone(),
        }
    }

    fn map_error(&self, url: &str, err: GetJsonError) -> ManifestError {
        match err {
            GetJsonError::NotFound => ManifestError::Transfer {
                url: url.to_string(),
                reason: "server returned HTTP 404".to_string(),
            },
            GetJsonError::Transfer(reason) => ManifestError::Transfer {
                url: url.to_string(),
                reason,
            },
            GetJsonError::Malformed(reason) => ManifestError::Malformed {
                url: url.to_string(),
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn manifest_server() -> MockServer {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(method("GET"))
            .and(path(MANIFEST_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latest": { "release": "1.20.1", "snapshot": "23w31a" },
                "versions": [
                    { "id": "23w31a", "type": "snapshot", "url": format!("{}/v/23w31a.json", uri) },
                    { "id": "1.20.1", "type": "release", "url": format!("{}/v/1.20.1.json", uri) },
                    { "id": "b1.7.3", "type": "old_beta", "url": format!("{}/v/b1.7.3.json", uri) }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v/1.20.1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1.20.1",
                "downloads": {
                    "client": { "url": format!("{}/client.jar", uri), "sha1": "aaaa", "size": 1 },
                    "server": { "url": format!("{}/server.jar", uri), "sha1": "84194A2F286EF7C14ED7CE0090DBA59902951553", "size": 1 }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v/b1.7.3.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "b1.7.3",
                "downloads": {
                    "client": { "url": format!("{}/client.jar", uri), "sha1": "bbbb", "size": 1 }
                }
            })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> ManifestClient {
        ManifestClient::with_base(http::agent(Duration::from_secs(5)), server.uri())
    }

    #[tokio::test]
    async fn test_latest_release() {
        let server = manifest_server().await;
        assert_eq!(client(&server).latest_release().unwrap(), "1.20.1");
    }

    #[tokio::test]
    async fn test_server_download() {
        let server = manifest_server().await;
        let download = client(&server).server_download("1.20.1").unwrap();
        assert_eq!(download.version, "1.20.1");
        assert_eq!(download.url, format!("{}/server.jar", server.uri()));
        assert_eq!(download.sha1, "84194A2F286EF7C14ED7CE0090DBA59902951553");
    }

    #[tokio::test]
    async fn test_unknown_version_is_not_found() {
        let server = manifest_server().await;
        let err = client(&server).server_download("9.9.9").unwrap_err();
        assert!(matches!(err, ManifestError::ResourceNotFound { version, .. } if version == "9.9.9"));
    }

    #[tokio::test]
    async fn test_version_without_server_jar_is_not_found() {
        let server = manifest_server().await;
        let err = client(&server).server_download("b1.7.3").unwrap_err();
        assert!(matches!(err, ManifestError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_detail_document_is_not_found() {
        let server = manifest_server().await;
        let err = client(&server).server_download("23w31a").unwrap_err();
        assert!(matches!(err, ManifestError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_manifest_unavailable_is_transfer_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let err = client(&server).latest_release().unwrap_err();
        assert!(matches!(err, ManifestError::Transfer { .. }));
    }

    #[tokio::test]
    async fn test_garbage_manifest_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"nope": 1})))
            .mount(&server)
            .await;
        let err = client(&server).latest_release().unwrap_err();
        assert!(matches!(err, ManifestError::Malformed { .. }));
    }

    #[test]
    fn test_with_base_trims_trailing_slash() {
        let client = ManifestClient::with_base(http::agent(Duration::from_secs(5)), "http://x/");
        assert_eq!(client.manifest_url(), "http://x/mc/game/version_manifest.json");
    }
}
