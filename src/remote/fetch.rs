use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::Result;

/// Body of `POST /getfile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRequest {
    pub file_name: String,
}

#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Downloads the generated file called `file_name`.
    async fn fetch(&self, file_name: &str) -> Result<Vec<u8>>;
}

pub struct HttpFileFetcher {
    client: Client,
    url: Url,
}

impl HttpFileFetcher {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.file_url()?))
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, file_name: &str) -> Result<Vec<u8>> {
        debug!("Sending file request: {}", file_name);
        let response = self
            .client
            .post(self.url.clone())
            .json(&FileRequest {
                file_name: file_name.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::post,
    };
    use std::sync::{Arc, Mutex};

    type Requests = Arc<Mutex<Vec<FileRequest>>>;

    async fn getfile(State(requests): State<Requests>, Json(request): Json<FileRequest>) -> Response {
        let found = request.file_name == "track42.mid";
        requests.lock().unwrap().push(request);
        if found {
            ([("content-type", "audio/midi")], b"MThd-bytes".to_vec()).into_response()
        } else {
            (StatusCode::NOT_FOUND, "File not found.").into_response()
        }
    }

    async fn serve() -> (Url, Requests) {
        let requests: Requests = Arc::default();
        let app = Router::new()
            .route("/getfile", post(getfile))
            .with_state(requests.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let url = Url::parse(&format!("http://{}/getfile", addr)).unwrap();
        (url, requests)
    }

    #[test]
    fn request_body_names_the_file() {
        let body = serde_json::to_value(FileRequest {
            file_name: "track42.mid".to_string(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "file_name": "track42.mid" }));
    }

    #[tokio::test]
    async fn downloads_file_bytes() {
        let (url, requests) = serve().await;
        let fetcher = HttpFileFetcher::new(url);

        let bytes = fetcher.fetch("track42.mid").await.unwrap();
        assert_eq!(bytes, b"MThd-bytes");
        assert_eq!(
            *requests.lock().unwrap(),
            vec![FileRequest {
                file_name: "track42.mid".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let (url, _) = serve().await;
        let fetcher = HttpFileFetcher::new(url);
        assert!(matches!(
            fetcher.fetch("nope.mid").await,
            Err(Error::Http(_))
        ));
    }
}
