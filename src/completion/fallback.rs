use super::{CompletionClient, CompletionRequest, CompletionResult, ModelBackend};
use crate::error::CompletionError;
use arc_swap::ArcSwapOption;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts against the same candidate on rate-limit-class errors.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay_ms: u64, multiplier: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay_ms.max(1),
            multiplier: multiplier.max(1),
        }
    }

    /// Delay before retry number `attempt` (0-based): D, D·M, D·M², … capped.
    /// Monotonically non-decreasing.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt)
            .unwrap_or(u32::MAX);
        let millis = self
            .base_delay_ms
            .saturating_mul(u64::from(factor))
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 500, 2)
    }
}

/// Injected, invalidatable cache of the resolved working model. Replaces the
/// original's process-wide mutable global. Volatile aliases are never cached.
pub struct ModelSelection {
    resolved: ArcSwapOption<String>,
    volatile_markers: Vec<String>,
}

impl ModelSelection {
    #[must_use]
    pub fn new(volatile_markers: Vec<String>) -> Self {
        Self {
            resolved: ArcSwapOption::empty(),
            volatile_markers,
        }
    }

    #[must_use]
    pub fn resolved(&self) -> Option<String> {
        self.resolved.load_full().map(|m| (*m).clone())
    }

    pub fn record(&self, model: &str) {
        if self.is_volatile(model) {
            return;
        }
        self.resolved.store(Some(Arc::new(model.to_string())));
    }

    pub fn invalidate(&self) {
        self.resolved.store(None);
    }

    #[must_use]
    pub fn is_volatile(&self, model: &str) -> bool {
        self.volatile_markers.iter().any(|m| model.contains(m))
    }
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self::new(vec!["-exp".into(), "-latest".into()])
    }
}

/// Completion client with ordered-candidate fallback and per-candidate retry.
///
/// Rate-limit-class errors retry the same candidate with exponential backoff;
/// any other error class moves immediately to the next candidate. The first
/// success short-circuits and records the working model in the selection
/// cache; exhaustion surfaces the most severe classified error observed.
pub struct FallbackClient {
    backend: Arc<dyn ModelBackend>,
    candidates: Vec<String>,
    policy: RetryPolicy,
    selection: Arc<ModelSelection>,
}

impl FallbackClient {
    #[must_use]
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        candidates: Vec<String>,
        policy: RetryPolicy,
        selection: Arc<ModelSelection>,
    ) -> Self {
        Self {
            backend,
            candidates,
            policy,
            selection,
        }
    }

    /// Candidate order for this call: a cached resolved model is tried
    /// first, the configured order follows.
    fn candidate_order(&self) -> Vec<String> {
        let mut ordered = Vec::with_capacity(self.candidates.len());
        if let Some(cached) = self.selection.resolved()
            && self.candidates.contains(&cached)
        {
            ordered.push(cached);
        }
        for candidate in &self.candidates {
            if !ordered.contains(candidate) {
                ordered.push(candidate.clone());
            }
        }
        ordered
    }
}

impl CompletionClient for FallbackClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = CompletionResult> + Send + 'a>> {
        Box::pin(async move {
            let mut worst: Option<CompletionError> = None;

            for model in self.candidate_order() {
                let mut attempt: u32 = 0;
                loop {
                    match self.backend.generate(&model, request).await {
                        Ok(response) => {
                            if attempt > 0 {
                                tracing::info!(
                                    model = model.as_str(),
                                    attempt,
                                    "Candidate recovered after retries"
                                );
                            }
                            self.selection.record(&model);
                            return Ok(response);
                        }
                        Err(err) => {
                            let retry_same =
                                err.retries_same_candidate() && attempt < self.policy.max_retries;
                            if worst
                                .as_ref()
                                .is_none_or(|w| err.severity() >= w.severity())
                            {
                                worst = Some(err.clone());
                            }

                            if retry_same {
                                let delay = self.policy.delay_for(attempt);
                                tracing::warn!(
                                    model = model.as_str(),
                                    attempt = attempt + 1,
                                    max_retries = self.policy.max_retries,
                                    delay_ms = delay.as_millis() as u64,
                                    "Rate limited, retrying same candidate"
                                );
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                                continue;
                            }

                            tracing::warn!(
                                model = model.as_str(),
                                error = %err,
                                "Candidate failed, moving to next"
                            );
                            break;
                        }
                    }
                }
            }

            Err(worst.unwrap_or_else(|| {
                CompletionError::Unknown("no model candidates configured".into())
            }))
        })
    }
}
