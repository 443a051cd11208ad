//! Translation capability and the batched, cached translation service.
//!
//! The wire client is optional: when no `TRANSLATOR_URL` is configured every translation is
//! the identity, which keeps the pipeline functional in a single-language deployment. The
//! HTTP client speaks the LibreTranslate JSON shape. Long inputs are chunked at sentence
//! boundaries before hitting the wire so provider limits never truncate a clause.

use crate::cache::SingleFlightCache;
use crate::config::get_config;
use crate::language::Lang;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Inputs longer than this are split at sentence boundaries before translation.
const SENTENCE_CHUNK_THRESHOLD: usize = 500;

/// Errors surfaced by translation providers.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Provider endpoint could not be reached.
    #[error("Translation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to translate: {0}")]
    TranslationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by translation backends.
///
/// Implementations are order-preserving: output `i` is the translation of input `i`.
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Translate every text in `texts` from `source` into `target`.
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Lang,
        source: Lang,
    ) -> Result<Vec<String>, TranslationError>;
}

/// Pass-through client used when no provider is configured.
pub struct IdentityTranslationClient;

#[async_trait]
impl TranslationClient for IdentityTranslationClient {
    async fn translate_batch(
        &self,
        texts: &[String],
        _target: Lang,
        _source: Lang,
    ) -> Result<Vec<String>, TranslationError> {
        Ok(texts.to_vec())
    }
}

/// Build a translation client based on configuration.
pub fn get_translation_client() -> Box<dyn TranslationClient + Send + Sync> {
    match get_config().translator_url.clone() {
        Some(base_url) => Box::new(HttpTranslationClient::new(base_url)),
        None => Box::new(IdentityTranslationClient),
    }
}

/// LibreTranslate-compatible HTTP client.
pub struct HttpTranslationClient {
    http: Client,
    base_url: String,
}

impl HttpTranslationClient {
    /// Construct a client targeting `base_url`.
    pub fn new(base_url: String) -> Self {
        let http = Client::builder()
            .user_agent("clausewise/translate")
            .build()
            .expect("Failed to construct reqwest::Client for translation");
        Self { http, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/translate", self.base_url.trim_end_matches('/'))
    }

    async fn translate_one(
        &self,
        text: &str,
        target: Lang,
        source: Lang,
    ) -> Result<String, TranslationError> {
        let payload = json!({
            "q": text,
            "source": source.code(),
            "target": target.code(),
            "format": "text",
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                TranslationError::ProviderUnavailable(format!(
                    "failed to reach translator at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::TranslationFailed(format!(
                "translator returned {status}: {body}"
            )));
        }

        let body: TranslateResponse = response.json().await.map_err(|error| {
            TranslationError::InvalidResponse(format!(
                "failed to decode translator response: {error}"
            ))
        })?;

        Ok(body.translated_text)
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[async_trait]
impl TranslationClient for HttpTranslationClient {
    async fn translate_batch(
        &self,
        texts: &[String],
        target: Lang,
        source: Lang,
    ) -> Result<Vec<String>, TranslationError> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            let sentences = chunk_sentences(text);
            if sentences.len() == 1 {
                translated.push(self.translate_one(text, target, source).await?);
                continue;
            }
            let mut parts = Vec::with_capacity(sentences.len());
            for sentence in sentences {
                parts.push(self.translate_one(&sentence, target, source).await?);
            }
            translated.push(parts.join(". "));
        }
        Ok(translated)
    }
}

/// Split `text` at sentence boundaries once it exceeds the provider-safe length.
fn chunk_sentences(text: &str) -> Vec<String> {
    if text.len() <= SENTENCE_CHUNK_THRESHOLD {
        return vec![text.to_string()];
    }
    text.split(". ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cache key: the source text paired with the target language.
pub type TranslationKey = (String, Lang);

/// Translation front-end owning the wire client and the bounded cache.
///
/// All user-facing response fields go through [`TranslationService::translate_all`], which
/// batches cache misses into a single provider call and degrades per item to the original
/// text when the provider fails. Single-text lookups and single-miss batches populate
/// through the single-flight primitive, so concurrent misses of one key join the in-flight
/// provider call. Multi-miss batches stay one wire call and fill their cells set-once
/// afterwards, so racing writers can never leave divergent values behind.
pub struct TranslationService {
    client: Box<dyn TranslationClient + Send + Sync>,
    cache: SingleFlightCache<TranslationKey, String>,
}

impl TranslationService {
    /// Build a service around `client` with a cache bounded at `cache_capacity` entries.
    pub fn new(client: Box<dyn TranslationClient + Send + Sync>, cache_capacity: usize) -> Self {
        Self {
            client,
            cache: SingleFlightCache::new(cache_capacity),
        }
    }

    /// Translate a single text, consulting the cache first.
    ///
    /// Concurrent callers missing the same `(text, target)` key join one in-flight provider
    /// call instead of each issuing their own. Provider failure leaves the slot empty for a
    /// later retry and falls back to the original text.
    pub async fn translate(&self, text: &str, target: Lang, source: Lang) -> String {
        if target == source || text.is_empty() {
            return text.to_string();
        }

        let key = (text.to_string(), target);
        let outcome = self
            .cache
            .get_or_try_compute(key, || async {
                let mut translated = self
                    .client
                    .translate_batch(&[text.to_string()], target, source)
                    .await?;
                translated.pop().ok_or_else(|| {
                    TranslationError::InvalidResponse("empty batch from provider".to_string())
                })
            })
            .await;

        match outcome {
            Ok(translated) => translated,
            Err(error) => {
                tracing::warn!(error = %error, target = target.code(), "Translation failed; keeping original text");
                text.to_string()
            }
        }
    }

    /// Translate a batch of texts, preserving order.
    ///
    /// Identity when `target == source`. Cache misses are sent to the provider in one call;
    /// if the provider fails, every miss falls back to its untranslated source text. This
    /// method never errors.
    pub async fn translate_all(&self, texts: Vec<String>, target: Lang, source: Lang) -> Vec<String> {
        if target == source || texts.is_empty() {
            return texts;
        }

        let mut results: Vec<Option<String>> = Vec::with_capacity(texts.len());
        let mut miss_indices = Vec::new();
        for (idx, text) in texts.iter().enumerate() {
            let key = (text.clone(), target);
            match self.cache.get(&key) {
                Some(hit) => results.push(Some(hit)),
                None => {
                    results.push(None);
                    miss_indices.push(idx);
                }
            }
        }

        if miss_indices.len() == 1 {
            // A lone miss goes through the single-flight path so concurrent lookups of the
            // same key share one provider call.
            let idx = miss_indices[0];
            let value = self.translate(&texts[idx], target, source).await;
            results[idx] = Some(value);
        } else if !miss_indices.is_empty() {
            let misses: Vec<String> = miss_indices.iter().map(|&i| texts[i].clone()).collect();
            match self.client.translate_batch(&misses, target, source).await {
                Ok(translated) if translated.len() == misses.len() => {
                    for (&idx, value) in miss_indices.iter().zip(translated.into_iter()) {
                        self.cache.insert((texts[idx].clone(), target), value.clone());
                        results[idx] = Some(value);
                    }
                }
                Ok(translated) => {
                    tracing::warn!(
                        expected = misses.len(),
                        actual = translated.len(),
                        "Translator returned a misaligned batch; keeping original text"
                    );
                }
                Err(error) => {
                    tracing::warn!(error = %error, target = target.code(), "Translation failed; keeping original text");
                }
            }
        }

        results
            .into_iter()
            .zip(texts)
            .map(|(translated, original)| translated.unwrap_or(original))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn http_client(base_url: String) -> HttpTranslationClient {
        HttpTranslationClient {
            http: Client::builder()
                .user_agent("clausewise-test")
                .build()
                .expect("client"),
            base_url,
        }
    }

    #[test]
    fn chunk_sentences_passes_short_text_through() {
        let chunks = chunk_sentences("Short sentence.");
        assert_eq!(chunks, vec!["Short sentence.".to_string()]);
    }

    #[test]
    fn chunk_sentences_splits_long_text_at_boundaries() {
        let long = "First part. ".repeat(60);
        let chunks = chunk_sentences(&long);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.starts_with("First part")));
    }

    #[tokio::test]
    async fn http_client_translates_a_batch() {
        let server = MockServer::start_async().await;
        let client = http_client(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(200)
                    .json_body(json!({ "translatedText": "Aprobado" }));
            })
            .await;

        let translated = client
            .translate_batch(&["Approved".to_string()], Lang::Es, Lang::En)
            .await
            .expect("translation");

        mock.assert();
        assert_eq!(translated, vec!["Aprobado".to_string()]);
    }

    #[tokio::test]
    async fn http_client_surfaces_error_status() {
        let server = MockServer::start_async().await;
        let client = http_client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .translate_batch(&["Approved".to_string()], Lang::Es, Lang::En)
            .await
            .expect_err("error response");
        assert!(matches!(error, TranslationError::TranslationFailed(_)));
    }

    struct FailingClient;

    #[async_trait]
    impl TranslationClient for FailingClient {
        async fn translate_batch(
            &self,
            _texts: &[String],
            _target: Lang,
            _source: Lang,
        ) -> Result<Vec<String>, TranslationError> {
            Err(TranslationError::ProviderUnavailable("down".into()))
        }
    }

    struct UppercaseClient;

    #[async_trait]
    impl TranslationClient for UppercaseClient {
        async fn translate_batch(
            &self,
            texts: &[String],
            _target: Lang,
            _source: Lang,
        ) -> Result<Vec<String>, TranslationError> {
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    #[tokio::test]
    async fn service_is_identity_for_matching_languages() {
        let service = TranslationService::new(Box::new(UppercaseClient), 8);
        let out = service
            .translate_all(vec!["hello".to_string()], Lang::En, Lang::En)
            .await;
        assert_eq!(out, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn service_falls_back_to_original_text_on_provider_failure() {
        let service = TranslationService::new(Box::new(FailingClient), 8);
        let out = service
            .translate_all(
                vec!["Rejected".to_string(), "No coverage".to_string()],
                Lang::Es,
                Lang::En,
            )
            .await;
        assert_eq!(out, vec!["Rejected".to_string(), "No coverage".to_string()]);
    }

    struct CountingClient {
        calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl TranslationClient for CountingClient {
        async fn translate_batch(
            &self,
            texts: &[String],
            _target: Lang,
            _source: Lang,
        ) -> Result<Vec<String>, TranslationError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    #[tokio::test]
    async fn concurrent_identical_lookups_share_one_provider_call() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let service = Arc::new(TranslationService::new(
            Box::new(CountingClient {
                calls: Arc::clone(&calls),
            }),
            8,
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.translate("approved", Lang::Es, Lang::En).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("join"), "APPROVED");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn service_caches_translations_per_text_and_language() {
        let service = TranslationService::new(Box::new(UppercaseClient), 8);

        let first = service.translate("approved", Lang::Es, Lang::En).await;
        assert_eq!(first, "APPROVED");

        // Second call must hit the cache; a cache miss would call the client again,
        // which is observable through the cache length staying at one entry.
        let second = service.translate("approved", Lang::Es, Lang::En).await;
        assert_eq!(second, "APPROVED");
    }
}
