//! HTTP OCR client
//!
//! Posts a base64 PNG to an OCR sidecar (e.g. a Tesseract HTTP wrapper) and
//! returns the recognized text. One attempt per image; any failure degrades
//! to an empty string.

use crate::services::OcrService;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// OCR service over HTTP
pub struct HttpOcrClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

impl HttpOcrClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    async fn try_recognize(&self, image_png: &[u8], languages: &str) -> Option<String> {
        let body = json!({
            "image_base64": base64::engine::general_purpose::STANDARD.encode(image_png),
            "languages": languages,
        });

        let request = self.client.post(&self.url).json(&body).send();

        let response = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) => {
                warn!("OCR request failed: {}", e);
                return None;
            }
            Err(_) => {
                warn!("OCR request timed out after {:?}", self.timeout);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("OCR service returned status {}", response.status());
            return None;
        }

        match response.json::<OcrResponse>().await {
            Ok(parsed) => Some(parsed.text),
            Err(e) => {
                warn!("OCR response decode failed: {}", e);
                None
            }
        }
    }
}

impl OcrService for HttpOcrClient {
    async fn recognize(&self, image_png: &[u8], languages: &str) -> String {
        self.try_recognize(image_png, languages)
            .await
            .unwrap_or_default()
    }
}
