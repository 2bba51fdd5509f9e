//! HTTP vision-model client
//!
//! Sends a question crop to an OpenAI-compatible chat-completions endpoint
//! with a structured-JSON prompt and parses the reply into
//! [`VisionAnalysis`]. Calls are time-bounded with a small retry budget and
//! degrade to a default analysis on any failure.

use crate::services::{VisionAnalysis, VisionService};
use base64::Engine;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "Sen bir sınav sorusu analiz uzmanısın. Verilen \
soru görüntüsünü incele ve JSON formatında döndür.

Kurallar:
1. Soru metnini (text) ve soru kökünü (stem) çıkar
2. Şıkları (A, B, C, D, E) label/value çiftleri olarak çıkar
3. Mümkünse dersi (subject), konuyu (topic) ve alt konuyu (subtopic) tahmin et
4. Zorluk seviyesini tahmin et (easy/medium/hard)
5. Görüntüde doğru cevap işaretliyse answer alanına yaz, yoksa boş bırak

JSON formatı:
{
  \"text\": \"...\",
  \"stem\": \"...\",
  \"options\": [{\"label\": \"A\", \"value\": \"...\"}],
  \"subject\": \"Matematik\",
  \"topic\": \"Fonksiyonlar\",
  \"subtopic\": \"\",
  \"difficulty\": \"medium\",
  \"answer\": \"\"
}

ÖNEMLİ: Sadece JSON döndür, başka açıklama ekleme.";

/// Vision service over an OpenAI-compatible chat-completions API
pub struct HttpVisionClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    retries: u32,
}

impl HttpVisionClient {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
            model: model.into(),
            timeout,
            retries,
        }
    }

    async fn try_analyze(&self, image_png: &[u8]) -> Option<VisionAnalysis> {
        let data_url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(image_png)
        );

        let body = json!({
            "model": self.model,
            "temperature": 0.2,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "Bu soruyu analiz et:" },
                        { "type": "image_url", "image_url": { "url": data_url } }
                    ]
                }
            ]
        });

        let mut attempt = 0u32;
        let mut delay_ms = 750u64;

        loop {
            attempt += 1;

            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let outcome = tokio::time::timeout(self.timeout, request.send()).await;

            match outcome {
                Ok(Ok(response)) if response.status().is_success() => {
                    return self.parse_response(response).await;
                }
                Ok(Ok(response)) => {
                    warn!(
                        "vision service returned status {} on attempt {}",
                        response.status(),
                        attempt
                    );
                }
                Ok(Err(e)) => warn!("vision request failed on attempt {}: {}", attempt, e),
                Err(_) => warn!(
                    "vision request timed out after {:?} on attempt {}",
                    self.timeout, attempt
                ),
            }

            if attempt > self.retries {
                return None;
            }

            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            delay_ms = (delay_ms as f64 * 1.75).min(5000.0) as u64;
        }
    }

    async fn parse_response(&self, response: reqwest::Response) -> Option<VisionAnalysis> {
        let value: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("vision response decode failed: {}", e);
                return None;
            }
        };

        let content = value
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?;

        match serde_json::from_str::<VisionAnalysis>(content) {
            Ok(analysis) => {
                debug!(
                    "vision analysis: text={} options={}",
                    analysis.text.as_deref().map(str::len).unwrap_or(0),
                    analysis.options.len()
                );
                Some(analysis)
            }
            Err(e) => {
                warn!("vision content is not the expected JSON: {}", e);
                None
            }
        }
    }
}

impl VisionService for HttpVisionClient {
    async fn analyze(&self, image_png: &[u8]) -> VisionAnalysis {
        self.try_analyze(image_png).await.unwrap_or_default()
    }
}
