use crate::domain::model::{FetchError, FetchErrorKind, ProductRecord};
use crate::domain::ports::RecordFetcher;
use crate::utils::error::Result;
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::OnceLock;

/// Fetches one product listing from the JSON API. The URL template carries
/// an `{id}` placeholder, e.g. `https://shop.example/api/v2/products/{id}`.
pub struct HttpFetcher {
    client: Client,
    url_template: String,
}

impl HttpFetcher {
    pub fn new(url_template: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("catalog-fetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }

    fn url_for(&self, id: &str) -> String {
        self.url_template.replace("{id}", id)
    }
}

#[async_trait]
impl RecordFetcher for HttpFetcher {
    async fn fetch(&self, id: &str) -> std::result::Result<ProductRecord, FetchError> {
        let response = self
            .client
            .get(self.url_for(id))
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    FetchErrorKind::Timeout
                } else {
                    FetchErrorKind::Connect
                };
                FetchError::new(kind, e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let payload: ProductPayload = response.json().await.map_err(|e| {
                FetchError::new(FetchErrorKind::Malformed, format!("invalid body: {}", e))
            })?;
            return Ok(payload.into_record(id));
        }

        Err(match status {
            StatusCode::NOT_FOUND => {
                FetchError::new(FetchErrorKind::NotFound, "product not found (404)")
            }
            StatusCode::TOO_MANY_REQUESTS => {
                FetchError::new(FetchErrorKind::RateLimited, "rate limited (429)")
            }
            s if s.is_server_error() => {
                FetchError::new(FetchErrorKind::ServerError, format!("server error ({})", s))
            }
            s => FetchError::new(
                FetchErrorKind::ClientError,
                format!("unexpected status ({})", s),
            ),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProductPayload {
    name: Option<String>,
    url_key: Option<String>,
    price: Option<f64>,
    description: Option<String>,
    #[serde(default)]
    images: Vec<ImagePayload>,
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    base_url: Option<String>,
}

impl ProductPayload {
    /// The record is keyed by the identifier we asked for, not whatever the
    /// payload echoes back, so checkpoint bookkeeping always lines up.
    fn into_record(self, requested_id: &str) -> ProductRecord {
        ProductRecord {
            id: requested_id.to_string(),
            name: self.name.unwrap_or_default(),
            url_key: self.url_key,
            price: self.price,
            description: strip_html(self.description.as_deref().unwrap_or("")),
            images: self
                .images
                .into_iter()
                .filter_map(|image| image.base_url)
                .collect(),
        }
    }
}

/// Product descriptions arrive as HTML fragments; the output wants plain
/// text with single spaces.
fn strip_html(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));

    let text = tag.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    spaces.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher_for(server: &MockServer) -> HttpFetcher {
        HttpFetcher::new(server.url("/products/{id}")).unwrap()
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Great <b>phone</b></p>\n<ul><li>128GB</li></ul>"),
            "Great phone 128GB"
        );
        assert_eq!(strip_html("Tom &amp; Jerry&nbsp;set"), "Tom & Jerry set");
        assert_eq!(strip_html(""), "");
    }

    #[tokio::test]
    async fn test_fetch_parses_product_payload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/products/42");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "id": 42,
                    "name": "USB-C Cable",
                    "url_key": "usb-c-cable",
                    "price": 9.99,
                    "description": "<p>Fast &amp; durable</p>",
                    "images": [
                        {"base_url": "https://img.example/1.jpg"},
                        {"base_url": "https://img.example/2.jpg"}
                    ]
                }));
        });

        let record = fetcher_for(&server).fetch("42").await.unwrap();

        mock.assert();
        assert_eq!(record.id, "42");
        assert_eq!(record.name, "USB-C Cable");
        assert_eq!(record.url_key.as_deref(), Some("usb-c-cable"));
        assert_eq!(record.price, Some(9.99));
        assert_eq!(record.description, "Fast & durable");
        assert_eq!(record.images.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_tolerates_sparse_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products/7");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"name": "Bare"}));
        });

        let record = fetcher_for(&server).fetch("7").await.unwrap();
        assert_eq!(record.id, "7");
        assert_eq!(record.name, "Bare");
        assert!(record.images.is_empty());
        assert_eq!(record.description, "");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start();
        for (id, status, kind) in [
            ("404", 404, FetchErrorKind::NotFound),
            ("429", 429, FetchErrorKind::RateLimited),
            ("500", 500, FetchErrorKind::ServerError),
            ("503", 503, FetchErrorKind::ServerError),
            ("403", 403, FetchErrorKind::ClientError),
        ] {
            server.mock(|when, then| {
                when.method(GET).path(format!("/products/{}", id));
                then.status(status);
            });
            let error = fetcher_for(&server).fetch(id).await.unwrap_err();
            assert_eq!(error.kind, kind, "status {}", status);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_permanent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products/1");
            then.status(200)
                .header("Content-Type", "application/json")
                .body("<html>not json</html>");
        });

        let error = fetcher_for(&server).fetch("1").await.unwrap_err();
        assert_eq!(error.kind, FetchErrorKind::Malformed);
    }
}
