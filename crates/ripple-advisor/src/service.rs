//! Advisory service: one timed call, one retry, then degrade

use std::sync::Arc;
use std::time::Duration;

use ripple_domain::SemanticInsights;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::advisor::{HttpSemanticAdvisor, SemanticAdvisor};
use crate::config::AdvisorConfig;
use crate::context::ContextPayload;
use crate::error::{AdvisorError, Result};
use crate::reconciler::reconcile;

/// Wraps a `SemanticAdvisor` so that an analysis never fails on it.
///
/// Each attempt is bounded by `timeout`. A transient failure is retried
/// once after `retry_backoff`; any other outcome that is not a reply yields
/// degraded insights.
pub struct AdvisoryService {
    advisor: Option<Arc<dyn SemanticAdvisor>>,
    timeout: Duration,
    retry_backoff: Duration,
}

impl AdvisoryService {
    pub fn new(advisor: Arc<dyn SemanticAdvisor>, timeout: Duration, retry_backoff: Duration) -> Self {
        Self {
            advisor: Some(advisor),
            timeout,
            retry_backoff,
        }
    }

    /// A service whose every call is degraded
    pub fn disabled() -> Self {
        Self {
            advisor: None,
            timeout: Duration::ZERO,
            retry_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        if !config.enabled {
            info!("Semantic advisor disabled by configuration");
            return Ok(Self::disabled());
        }
        config.validate()?;
        Ok(Self::new(
            Arc::new(HttpSemanticAdvisor::from_config(config)),
            config.timeout(),
            config.retry_backoff(),
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.advisor.is_some()
    }

    /// Ask the advisor about `payload` and reconcile its reply
    pub async fn advise(&self, payload: &ContextPayload) -> SemanticInsights {
        let Some(advisor) = &self.advisor else {
            return SemanticInsights::degraded();
        };

        let reply = match self.attempt(advisor.as_ref(), payload).await {
            Ok(reply) => Ok(reply),
            Err(e) if e.is_transient() => {
                warn!(error = %e, backoff_ms = self.retry_backoff.as_millis() as u64, "Semantic advisor call failed, retrying once");
                tokio::time::sleep(self.retry_backoff).await;
                self.attempt(advisor.as_ref(), payload).await
            }
            Err(e) => Err(e),
        };

        match reply {
            Ok(raw) => {
                debug!(reply_len = raw.len(), "Semantic advisor replied");
                reconcile(&raw)
            }
            Err(e) => {
                warn!(error = %e, "Semantic advisor unavailable, continuing without insights");
                SemanticInsights::degraded()
            }
        }
    }

    async fn attempt(&self, advisor: &dyn SemanticAdvisor, payload: &ContextPayload) -> Result<String> {
        match timeout(self.timeout, advisor.advise(payload)).await {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Reply(&'static str),
        Fail(u16),
        Hang,
    }

    struct ScriptedAdvisor {
        steps: Mutex<Vec<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedAdvisor {
        fn new(mut steps: Vec<Step>) -> Arc<Self> {
            steps.reverse();
            Arc::new(Self {
                steps: Mutex::new(steps),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SemanticAdvisor for ScriptedAdvisor {
        async fn advise(&self, _payload: &ContextPayload) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop();
            match step {
                Some(Step::Reply(raw)) => Ok(raw.to_string()),
                Some(Step::Fail(status)) => Err(AdvisorError::api_error(status, "scripted")),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
                None => Err(AdvisorError::InvalidResponse("script exhausted".to_string())),
            }
        }
    }

    fn service(advisor: Arc<ScriptedAdvisor>) -> AdvisoryService {
        AdvisoryService::new(advisor, Duration::from_millis(200), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_reply_is_reconciled() {
        let advisor = ScriptedAdvisor::new(vec![Step::Reply(r#"{"summary": "fine", "risks": []}"#)]);
        let insights = service(advisor.clone()).advise(&ContextPayload::default()).await;
        assert_eq!(insights.summary, "fine");
        assert!(!insights.advisor_degraded);
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let advisor = ScriptedAdvisor::new(vec![Step::Fail(503), Step::Reply(r#"{"summary": "second"}"#)]);
        let insights = service(advisor.clone()).advise(&ContextPayload::default()).await;
        assert_eq!(insights.summary, "second");
        assert_eq!(advisor.calls(), 2);
    }

    #[tokio::test]
    async fn test_two_transient_failures_degrade() {
        let advisor = ScriptedAdvisor::new(vec![Step::Fail(502), Step::Fail(500), Step::Reply("{}")]);
        let insights = service(advisor.clone()).advise(&ContextPayload::default()).await;
        assert!(insights.advisor_degraded);
        assert!(insights.semantic_parse_degraded);
        assert_eq!(advisor.calls(), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let advisor = ScriptedAdvisor::new(vec![Step::Fail(401), Step::Reply(r#"{"summary": "x"}"#)]);
        let insights = service(advisor.clone()).advise(&ContextPayload::default()).await;
        assert!(insights.advisor_degraded);
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_degrades() {
        let advisor = ScriptedAdvisor::new(vec![Step::Hang, Step::Hang]);
        let insights = service(advisor.clone()).advise(&ContextPayload::default()).await;
        assert!(insights.advisor_degraded);
        assert_eq!(advisor.calls(), 2);
    }

    #[tokio::test]
    async fn test_disabled_service_degrades_without_calling() {
        let service = AdvisoryService::disabled();
        assert!(!service.is_enabled());
        let insights = service.advise(&ContextPayload::default()).await;
        assert!(insights.advisor_degraded);
    }

    #[test]
    fn test_disabled_config_skips_validation() {
        let config = AdvisorConfig {
            enabled: false,
            base_url: String::new(),
            ..Default::default()
        };
        let service = AdvisoryService::from_config(&config).unwrap();
        assert!(!service.is_enabled());
    }
}
