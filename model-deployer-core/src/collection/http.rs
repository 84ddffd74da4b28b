//! HTTP client for a PMML scoring server's model collection

use super::ModelCollection;
use crate::error::CollectionError;
use crate::identifier::ModelId;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Error payload returned by the scoring server
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Model collection reached over HTTP.
///
/// Deploy is `PUT {base}/{id}` with the model file as body, undeploy is
/// `DELETE {base}/{id}`.
pub struct HttpCollection {
    client: Client,
    base_url: Url,
}

impl HttpCollection {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CollectionError> {
        let parsed = Url::parse(base_url).map_err(|e| CollectionError::invalid_url(base_url, e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(CollectionError::invalid_url(base_url, "URL cannot be used as a base"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| CollectionError::Request { url: base_url.to_string(), source })?;

        Ok(Self { client, base_url: parsed })
    }

    /// `{base}/{id}`, with the identifier as a single escaped path segment
    pub fn model_url(&self, id: &ModelId) -> Result<Url, CollectionError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CollectionError::invalid_url(self.base_url.as_str(), "URL cannot be used as a base"))?
            .pop_if_empty()
            .push(id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl ModelCollection for HttpCollection {
    fn target(&self, id: &ModelId) -> String {
        match self.model_url(id) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}/{}", self.base_url, id),
        }
    }

    async fn deploy(&self, id: &ModelId, file: &Path) -> Result<(), CollectionError> {
        let url = self.model_url(id)?;
        let body = tokio::fs::read(file)
            .await
            .map_err(|source| CollectionError::File { path: file.to_path_buf(), source })?;

        debug!("PUT {} ({} bytes from {:?})", url, body.len(), file);

        let response = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| CollectionError::Request { url: url.to_string(), source })?;

        check_response(response, &url, false).await
    }

    async fn undeploy(&self, id: &ModelId) -> Result<(), CollectionError> {
        let url = self.model_url(id)?;

        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| CollectionError::Request { url: url.to_string(), source })?;

        check_response(response, &url, true).await
    }
}

/// Map a non-success response to a status error. `missing_ok` accepts 404.
async fn check_response(response: Response, url: &Url, missing_ok: bool) -> Result<(), CollectionError> {
    let status = response.status();
    if status.is_success() {
        trace!("{} answered {}", url, status);
        return Ok(());
    }

    if missing_ok && status == StatusCode::NOT_FOUND {
        debug!("{} is already gone", url);
        return Ok(());
    }

    let text = response.text().await.unwrap_or_default();
    Err(CollectionError::status(url.as_str(), status.as_u16(), error_message(status, &text)))
}

/// Prefer the server's `message` field, then the raw body, then the reason phrase
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(message) = serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.message) {
        return message;
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status.canonical_reason().unwrap_or("unknown status").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Request line, headers and body as seen by the fake server
    struct Captured {
        request_line: String,
        headers: String,
        body: Vec<u8>,
    }

    /// Accept one connection, capture the request and answer with `status` and `body`
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before headers were complete");
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);

            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let mut lines = head.lines();
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers = lines.collect::<Vec<_>>().join("\n").to_lowercase();
            Captured { request_line, headers, body: buf[header_end..].to_vec() }
        });

        (format!("http://{}/openscoring/model", addr), handle)
    }

    fn id(s: &str) -> ModelId {
        ModelId::new(s).unwrap()
    }

    #[test]
    fn test_model_url_composition() {
        let collection = HttpCollection::new("http://localhost:8080/openscoring/model", Duration::from_secs(1)).unwrap();
        assert_eq!(
            collection.model_url(&id("iris")).unwrap().as_str(),
            "http://localhost:8080/openscoring/model/iris"
        );

        let trailing = HttpCollection::new("http://localhost:8080/model/", Duration::from_secs(1)).unwrap();
        assert_eq!(trailing.target(&id("iris")), "http://localhost:8080/model/iris");
    }

    #[test]
    fn test_model_url_escapes_identifier() {
        let collection = HttpCollection::new("http://localhost/model", Duration::from_secs(1)).unwrap();
        assert_eq!(collection.target(&id("my model")), "http://localhost/model/my%20model");
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(matches!(
            HttpCollection::new("not a url", Duration::from_secs(1)),
            Err(CollectionError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpCollection::new("mailto:ops@example.com", Duration::from_secs(1)),
            Err(CollectionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message":"Invalid PMML"}"#), "Invalid PMML");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "  upstream down \n"), "upstream down");
        assert_eq!(error_message(StatusCode::SERVICE_UNAVAILABLE, ""), "Service Unavailable");
    }

    #[tokio::test]
    async fn test_deploy_puts_file_contents() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("iris.pmml");
        std::fs::write(&file, "<PMML/>").unwrap();

        let (base, server) = serve_once("201 Created", r#"{"id":"iris"}"#).await;
        let collection = HttpCollection::new(&base, Duration::from_secs(5)).unwrap();

        collection.deploy(&id("iris"), &file).await.unwrap();

        let captured = server.await.unwrap();
        assert_eq!(captured.request_line, "PUT /openscoring/model/iris HTTP/1.1");
        assert!(captured.headers.contains("content-type: text/xml"));
        assert_eq!(captured.body, b"<PMML/>");
    }

    #[tokio::test]
    async fn test_deploy_reports_server_message() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("broken.pmml");
        std::fs::write(&file, "not pmml").unwrap();

        let (base, server) = serve_once("400 Bad Request", r#"{"message":"Unparseable PMML"}"#).await;
        let collection = HttpCollection::new(&base, Duration::from_secs(5)).unwrap();

        let err = collection.deploy(&id("broken"), &file).await.unwrap_err();
        server.await.unwrap();

        match err {
            CollectionError::Status { status, message, url } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Unparseable PMML");
                assert!(url.ends_with("/openscoring/model/broken"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deploy_missing_file_is_file_error() {
        let temp_dir = TempDir::new().unwrap();
        let collection = HttpCollection::new("http://127.0.0.1:9/model", Duration::from_secs(1)).unwrap();

        let err = collection.deploy(&id("gone"), &temp_dir.path().join("gone.pmml")).await.unwrap_err();
        assert!(matches!(err, CollectionError::File { .. }));
    }

    #[tokio::test]
    async fn test_undeploy_sends_delete() {
        let (base, server) = serve_once("200 OK", r#"{}"#).await;
        let collection = HttpCollection::new(&base, Duration::from_secs(5)).unwrap();

        collection.undeploy(&id("iris")).await.unwrap();

        let captured = server.await.unwrap();
        assert_eq!(captured.request_line, "DELETE /openscoring/model/iris HTTP/1.1");
    }

    #[tokio::test]
    async fn test_undeploy_of_missing_model_succeeds() {
        let (base, server) = serve_once("404 Not Found", r#"{"message":"Model \"iris\" not found"}"#).await;
        let collection = HttpCollection::new(&base, Duration::from_secs(5)).unwrap();

        collection.undeploy(&id("iris")).await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let collection = HttpCollection::new(&format!("http://{}/model", addr), Duration::from_secs(2)).unwrap();
        let err = collection.undeploy(&id("iris")).await.unwrap_err();
        assert!(matches!(err, CollectionError::Request { .. }));
    }
}
