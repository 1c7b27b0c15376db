use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::KeggError;

pub const DEFAULT_BASE_URL: &str = "https://rest.kegg.jp";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_RETRIES: u32 = 3;
const RETRY_STEP: Duration = Duration::from_millis(200);

/// Body of a `get/<id>/image` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// True when the media type (parameters ignored) is `image/png`.
    pub fn is_png(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|value| value.split(';').next())
            .map(|essence| essence.trim().eq_ignore_ascii_case("image/png"))
            .unwrap_or(false)
    }
}

/// The three KEGG REST operations the mapper consumes.
pub trait KeggClient: Send + Sync {
    fn find(&self, database: &str, query: &str) -> Result<String, KeggError>;
    fn get(&self, id: &str) -> Result<String, KeggError>;
    fn get_image(&self, id: &str) -> Result<ImagePayload, KeggError>;
}

impl<C: KeggClient + ?Sized> KeggClient for &C {
    fn find(&self, database: &str, query: &str) -> Result<String, KeggError> {
        (**self).find(database, query)
    }

    fn get(&self, id: &str) -> Result<String, KeggError> {
        (**self).get(id)
    }

    fn get_image(&self, id: &str) -> Result<ImagePayload, KeggError> {
        (**self).get_image(id)
    }
}

#[derive(Clone)]
pub struct KeggHttpClient {
    client: Client,
    base_url: Url,
}

impl KeggHttpClient {
    pub fn new() -> Result<Self, KeggError> {
        Self::with_settings(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_settings(base_url: &str, timeout: Duration) -> Result<Self, KeggError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kegg-map/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KeggError::KeggHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| KeggError::KeggHttp(err.to_string()))?;
        let base_url = Url::parse(base_url)
            .map_err(|err| KeggError::KeggHttp(format!("invalid base URL {base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(KeggError::KeggHttp(format!(
                "invalid base URL {base_url}: not a hierarchical URL"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn find_url(&self, database: &str, query: &str) -> Url {
        self.endpoint(&["find", database, query])
    }

    pub fn get_url(&self, id: &str) -> Url {
        self.endpoint(&["get", id])
    }

    pub fn image_url(&self, id: &str) -> Url {
        self.endpoint(&["get", id, "image"])
    }

    /// Appends `segments` to the base path, percent-encoding each one so a
    /// query containing `/`, `?` or `#` stays a single segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn handle_status(response: Response) -> Result<Response, KeggError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .ok()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| "KEGG request failed".to_string());
        Err(KeggError::KeggStatus {
            status,
            message: message.trim().to_string(),
        })
    }

    fn fetch_text(&self, url: Url) -> Result<String, KeggError> {
        debug!(url = %url, "KEGG request");
        let response = Self::send_with_retries(|| self.client.get(url.clone()))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| KeggError::KeggHttp(err.to_string()))
    }

    /// Retries throttling, gateway errors, timeouts and refused
    /// connections with a linear backoff. Other outcomes return at once.
    fn send_with_retries<F>(make_req: F) -> Result<Response, KeggError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let outcome = make_req().send();
            let retryable = match &outcome {
                Ok(resp) => is_retryable_status(resp.status().as_u16()),
                Err(err) => err.is_timeout() || err.is_connect(),
            };
            if !retryable || attempt >= MAX_RETRIES {
                return outcome.map_err(|err| KeggError::KeggHttp(err.to_string()));
            }
            attempt += 1;
            let delay = retry_delay(attempt);
            match &outcome {
                Ok(resp) => {
                    debug!(status = resp.status().as_u16(), attempt, ?delay, "retrying KEGG request")
                }
                Err(err) => debug!(error = %err, attempt, ?delay, "retrying KEGG request"),
            }
            thread::sleep(delay);
        }
    }
}

impl KeggClient for KeggHttpClient {
    fn find(&self, database: &str, query: &str) -> Result<String, KeggError> {
        self.fetch_text(self.find_url(database, query))
    }

    fn get(&self, id: &str) -> Result<String, KeggError> {
        self.fetch_text(self.get_url(id))
    }

    fn get_image(&self, id: &str) -> Result<ImagePayload, KeggError> {
        let url = self.image_url(id);
        debug!(url = %url, "KEGG image request");
        let response = Self::send_with_retries(|| self.client.get(url.clone()))?;
        let response = Self::handle_status(response)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response
            .bytes()
            .map_err(|err| KeggError::KeggHttp(err.to_string()))?;
        Ok(ImagePayload {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_STEP * attempt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> KeggHttpClient {
        KeggHttpClient::with_settings(base_url, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn urls_follow_rest_layout() {
        let client = client("https://rest.kegg.jp/");
        assert_eq!(
            client.find_url("genes", "BRCA1").as_str(),
            "https://rest.kegg.jp/find/genes/BRCA1"
        );
        assert_eq!(
            client.get_url("hsa:672").as_str(),
            "https://rest.kegg.jp/get/hsa:672"
        );
        assert_eq!(
            client.image_url("hsa04110").as_str(),
            "https://rest.kegg.jp/get/hsa04110/image"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let client = client("http://localhost:8080/kegg");
        assert_eq!(
            client.get_url("hsa:672").as_str(),
            "http://localhost:8080/kegg/get/hsa:672"
        );
    }

    #[test]
    fn query_special_characters_stay_in_one_segment() {
        let client = client(DEFAULT_BASE_URL);

        let url = client.find_url("genes", "A#B");
        assert_eq!(url.path(), "/find/genes/A%23B");
        assert_eq!(url.fragment(), None);

        let url = client.find_url("genes", "HLA-A/B?x");
        assert_eq!(url.path(), "/find/genes/HLA-A%2FB%3Fx");
        assert_eq!(url.query(), None);

        let url = client.find_url("genes", "p53 protein");
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = KeggHttpClient::with_settings("not a url", DEFAULT_TIMEOUT).err();
        assert!(matches!(err, Some(KeggError::KeggHttp(_))));
        assert!(KeggHttpClient::with_settings("mailto:someone", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(403));
        assert_eq!(retry_delay(1), Duration::from_millis(200));
        assert_eq!(retry_delay(3), Duration::from_millis(600));
    }

    #[test]
    fn png_detection_ignores_parameters() {
        let payload = ImagePayload {
            content_type: Some("Image/PNG; charset=binary".to_string()),
            bytes: Vec::new(),
        };
        assert!(payload.is_png());

        let text = ImagePayload {
            content_type: Some("text/plain".to_string()),
            bytes: Vec::new(),
        };
        assert!(!text.is_png());
    }
}
