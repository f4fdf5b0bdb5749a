// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Optional feedback text refinement.
//!
//! A [`TextRefiner`] takes a raw feedback string and returns a possibly
//! improved one. Refinement is strictly best-effort: every implementation
//! falls back to the input text on failure, and nothing in this module can
//! touch a numeric score or pass/fail result. Callers check [`TextRefiner::available`]
//! and [`TextRefiner::reason_unavailable`] to make deliberate fallback
//! decisions instead of probing for errors.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use sha2::{Digest, Sha256};

/// Default capacity of the refinement result cache.
const CACHE_SIZE: usize = 128;

/// A request to refine one feedback string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineRequest {
    /// The raw feedback text.
    pub text: String,
    /// Locale the text was generated in.
    pub locale: String,
    /// Optional style hint (e.g. "encouraging", "terse").
    pub style: Option<String>,
}

impl RefineRequest {
    /// Create a request without a style hint.
    #[must_use]
    pub fn new(text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            style: None,
        }
    }

    /// Attach a style hint.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Deterministic hash of the full request payload.
    ///
    /// Distinct inputs get distinct keys, so a cache keyed on this can never
    /// serve a stale entry for a changed input.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.locale.as_bytes());
        hasher.update([0u8]);
        if let Some(style) = &self.style {
            hasher.update(style.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

/// Best-effort natural-language polishing of feedback strings.
pub trait TextRefiner: Send + Sync {
    /// Refine `request.text`, returning it unchanged on any failure.
    fn refine(&self, request: &RefineRequest) -> String;

    /// Whether this refiner can do useful work right now.
    fn available(&self) -> bool {
        true
    }

    /// Why the refiner is unavailable, when it is.
    fn reason_unavailable(&self) -> Option<String> {
        None
    }
}

/// No-op refiner: returns the input text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRefiner;

impl TextRefiner for DisabledRefiner {
    fn refine(&self, request: &RefineRequest) -> String {
        request.text.clone()
    }

    fn available(&self) -> bool {
        false
    }

    fn reason_unavailable(&self) -> Option<String> {
        Some("refinement disabled".to_string())
    }
}

/// Deterministic local refiner: structural enrichment without any I/O.
///
/// Adds a locale-appropriate header and, when a style hint is present, a
/// marker line. The body text passes through verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRefiner;

impl TextRefiner for LocalRefiner {
    fn refine(&self, request: &RefineRequest) -> String {
        let header = match request.locale.as_str() {
            "zh" => "技术反馈要点",
            _ => "Technique feedback",
        };
        let mut out = format!("{header}\n\n{}", request.text);
        if let Some(style) = &request.style {
            out.push_str(&format!("\n\n[{style}]"));
        }
        out
    }
}

/// Caching wrapper around any refiner.
///
/// Results are kept in an LRU cache keyed by [`RefineRequest::cache_key`],
/// so a hit is observably identical to a fresh call with the same input.
pub struct CachedRefiner<R: TextRefiner> {
    inner: R,
    cache: Mutex<LruCache<String, String>>,
}

impl<R: TextRefiner> CachedRefiner<R> {
    /// Wrap a refiner with the default cache capacity.
    ///
    /// # Panics
    ///
    /// Never panics: the default capacity is a nonzero constant.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, CACHE_SIZE)
    }

    /// Wrap a refiner with an explicit cache capacity.
    ///
    /// Capacities below 1 are raised to 1.
    #[must_use]
    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }
}

impl<R: TextRefiner> TextRefiner for CachedRefiner<R> {
    fn refine(&self, request: &RefineRequest) -> String {
        let key = request.cache_key();
        // A poisoned lock degrades to uncached refinement
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                return hit.clone();
            }
            let refined = self.inner.refine(request);
            cache.put(key, refined.clone());
            refined
        } else {
            self.inner.refine(request)
        }
    }

    fn available(&self) -> bool {
        self.inner.available()
    }

    fn reason_unavailable(&self) -> Option<String> {
        self.inner.reason_unavailable()
    }
}

#[cfg(feature = "llm")]
pub use llm::LlmRefiner;

#[cfg(feature = "llm")]
mod llm {
    use std::time::Duration;

    use super::{RefineRequest, TextRefiner};
    use crate::error::{Result, TechniqueError};

    /// Connection timeout in seconds.
    const CONNECT_TIMEOUT: u64 = 5;
    /// Read timeout in seconds.
    const READ_TIMEOUT: u64 = 20;

    /// Network-backed refiner calling an LLM endpoint.
    ///
    /// Transport or parse failures fall back to the raw text; the scoring
    /// pipeline never observes an error from this type.
    pub struct LlmRefiner {
        endpoint: String,
        model: String,
        api_key: Option<String>,
    }

    impl LlmRefiner {
        /// Create a refiner for the given endpoint and model.
        #[must_use]
        pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
            Self {
                endpoint: endpoint.into(),
                model: model.into(),
                api_key: None,
            }
        }

        /// Attach an API key.
        #[must_use]
        pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
            self.api_key = Some(api_key.into());
            self
        }

        fn call(&self, request: &RefineRequest) -> Result<String> {
            let Some(api_key) = &self.api_key else {
                return Err(TechniqueError::RefineError("no API key".to_string()));
            };

            let config = ureq::Agent::config_builder()
                .timeout_connect(Some(Duration::from_secs(CONNECT_TIMEOUT)))
                .timeout_recv_body(Some(Duration::from_secs(READ_TIMEOUT)))
                .build();
            let agent = ureq::Agent::new_with_config(config);

            let payload = serde_json::json!({
                "model": self.model,
                "locale": request.locale,
                "style": request.style,
                "text": request.text,
            });

            let auth = format!("Bearer {api_key}");
            let body = payload.to_string();
            let response = agent
                .post(&self.endpoint)
                .header("authorization", auth.as_str())
                .header("content-type", "application/json")
                .send(body.as_str())
                .map_err(|e| TechniqueError::RefineError(e.to_string()))?;

            let body = response
                .into_body()
                .read_to_string()
                .map_err(|e| TechniqueError::RefineError(e.to_string()))?;

            let parsed: serde_json::Value = serde_json::from_str(&body)
                .map_err(|e| TechniqueError::RefineError(e.to_string()))?;
            parsed
                .get("text")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| {
                    TechniqueError::RefineError("response missing 'text' field".to_string())
                })
        }
    }

    impl TextRefiner for LlmRefiner {
        fn refine(&self, request: &RefineRequest) -> String {
            match self.call(request) {
                Ok(refined) => refined,
                Err(err) => {
                    tracing::warn!(
                        target: "technique::refine",
                        error = %err,
                        "refinement failed, returning raw text"
                    );
                    request.text.clone()
                }
            }
        }

        fn available(&self) -> bool {
            !self.endpoint.is_empty() && self.api_key.is_some()
        }

        fn reason_unavailable(&self) -> Option<String> {
            if self.endpoint.is_empty() {
                Some("no endpoint configured".to_string())
            } else if self.api_key.is_none() {
                Some("no API key configured".to_string())
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_disabled_refiner_is_identity() {
        let refiner = DisabledRefiner;
        let request = RefineRequest::new("raw feedback", "en");
        assert_eq!(refiner.refine(&request), "raw feedback");
        assert!(!refiner.available());
        assert!(refiner.reason_unavailable().unwrap().contains("disabled"));
    }

    #[test]
    fn test_local_refiner_is_deterministic_and_preserves_body() {
        let refiner = LocalRefiner;
        let request = RefineRequest::new("keep this text intact", "en").with_style("terse");
        let first = refiner.refine(&request);
        let second = refiner.refine(&request);
        assert_eq!(first, second);
        assert!(first.contains("keep this text intact"));
        assert!(first.starts_with("Technique feedback"));
        assert!(first.contains("[terse]"));

        let zh = refiner.refine(&RefineRequest::new("保持原文", "zh"));
        assert!(zh.starts_with("技术反馈要点"));
    }

    #[test]
    fn test_cache_key_distinguishes_fields() {
        let a = RefineRequest::new("text", "en");
        let b = RefineRequest::new("text", "zh");
        let c = RefineRequest::new("text", "en").with_style("terse");
        assert_ne!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key(), RefineRequest::new("text", "en").cache_key());
    }

    struct CountingRefiner {
        calls: AtomicUsize,
    }

    impl TextRefiner for CountingRefiner {
        fn refine(&self, request: &RefineRequest) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("refined: {}", request.text)
        }
    }

    #[test]
    fn test_cached_refiner_hits_are_equivalent() {
        let refiner = CachedRefiner::new(CountingRefiner {
            calls: AtomicUsize::new(0),
        });
        let request = RefineRequest::new("hello", "en");

        let fresh = refiner.refine(&request);
        let hit = refiner.refine(&request);
        assert_eq!(fresh, hit);
        assert_eq!(refiner.inner.calls.load(Ordering::SeqCst), 1);

        // A different input misses
        let other = refiner.refine(&RefineRequest::new("goodbye", "en"));
        assert_eq!(other, "refined: goodbye");
        assert_eq!(refiner.inner.calls.load(Ordering::SeqCst), 2);
    }
}
