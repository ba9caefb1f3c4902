//! Post-remediation verification.
//!
//! A [`Verifier`] dispatches a [`VerificationSpec`] to the check registered
//! for its type. Checks for which no real probe exists yet are registered as
//! [`NoopCheck`], and types with no registration at all resolve through an
//! explicit [`UnknownCheckPolicy`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use heal_types::VerificationSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// A check could not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("check could not run: {0}")]
pub struct CheckError(pub String);

/// Outcome used for verification types with no registered check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCheckPolicy {
    /// Treat the verification as passed.
    #[default]
    Pass,

    /// Treat the verification as failed.
    Fail,
}

impl UnknownCheckPolicy {
    pub fn outcome(&self) -> bool {
        matches!(self, UnknownCheckPolicy::Pass)
    }
}

/// A named post-remediation check.
#[async_trait]
pub trait VerificationCheck: Send + Sync {
    /// Does the failure condition no longer hold?
    async fn check(&self, spec: &VerificationSpec) -> Result<bool, CheckError>;
}

/// Check that always passes.
///
/// Stands in for checks whose probe has not been wired up, so that the
/// always-pass behaviour is visible in configuration rather than implied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCheck;

#[async_trait]
impl VerificationCheck for NoopCheck {
    async fn check(&self, spec: &VerificationSpec) -> Result<bool, CheckError> {
        debug!(check_type = %spec.check_type, "No-op check passes unconditionally");
        Ok(true)
    }
}

/// Check type that is always registered and never passes.
pub const MANUAL_CHECK: &str = "manual";

/// Check that never passes.
///
/// Used by runbooks whose actions only notify people (paging, alerting):
/// running them cannot by itself resolve the failure, so the incident
/// runs out of attempts and follows the runbook's escalation policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualCheck;

#[async_trait]
impl VerificationCheck for ManualCheck {
    async fn check(&self, _spec: &VerificationSpec) -> Result<bool, CheckError> {
        Ok(false)
    }
}

/// Source of a numeric reading, such as memory usage percent.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Take one reading.
    async fn read(&self) -> Result<f64, CheckError>;
}

/// Passes when a metric reading is strictly below a threshold.
///
/// The threshold comes from the verification parameters under
/// `threshold_key`, falling back to `default_threshold`.
pub struct ThresholdCheck {
    source: Arc<dyn MetricSource>,
    threshold_key: String,
    default_threshold: f64,
}

impl ThresholdCheck {
    pub fn new(
        source: Arc<dyn MetricSource>,
        threshold_key: impl Into<String>,
        default_threshold: f64,
    ) -> Self {
        Self {
            source,
            threshold_key: threshold_key.into(),
            default_threshold,
        }
    }
}

#[async_trait]
impl VerificationCheck for ThresholdCheck {
    async fn check(&self, spec: &VerificationSpec) -> Result<bool, CheckError> {
        let threshold = spec
            .param_f64(&self.threshold_key)
            .unwrap_or(self.default_threshold);
        let value = self.source.read().await?;
        debug!(
            check_type = %spec.check_type,
            value,
            threshold,
            "Threshold check reading"
        );
        Ok(value < threshold)
    }
}

/// Registry of verification checks keyed by check type.
pub struct Verifier {
    /// Registered checks.
    checks: DashMap<String, Arc<dyn VerificationCheck>>,

    /// Outcome for unregistered types.
    unknown_policy: UnknownCheckPolicy,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(UnknownCheckPolicy::default())
    }
}

impl Verifier {
    /// Create a verifier with only the [`MANUAL_CHECK`] registered.
    pub fn new(unknown_policy: UnknownCheckPolicy) -> Self {
        let checks: DashMap<String, Arc<dyn VerificationCheck>> = DashMap::new();
        checks.insert(MANUAL_CHECK.to_string(), Arc::new(ManualCheck));
        Self {
            checks,
            unknown_policy,
        }
    }

    /// Register a check, returning the one it replaced.
    pub fn register(
        &self,
        check_type: impl Into<String>,
        check: Arc<dyn VerificationCheck>,
    ) -> Option<Arc<dyn VerificationCheck>> {
        self.checks.insert(check_type.into(), check)
    }

    /// Builder-style registration.
    pub fn with_check(
        self,
        check_type: impl Into<String>,
        check: Arc<dyn VerificationCheck>,
    ) -> Self {
        self.register(check_type, check);
        self
    }

    pub fn unknown_policy(&self) -> UnknownCheckPolicy {
        self.unknown_policy
    }

    /// Registered check types, sorted.
    pub fn check_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.checks.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Run the check named by `spec`.
    ///
    /// A check that cannot run counts as a failed verification.
    #[instrument(skip(self, spec), fields(check_type = %spec.check_type))]
    pub async fn verify(&self, spec: &VerificationSpec) -> bool {
        let check = match self.checks.get(&spec.check_type) {
            Some(entry) => entry.value().clone(),
            None => {
                let outcome = self.unknown_policy.outcome();
                warn!(
                    check_type = %spec.check_type,
                    policy = ?self.unknown_policy,
                    outcome,
                    "No check registered for verification type"
                );
                return outcome;
            }
        };

        match check.check(spec).await {
            Ok(passed) => passed,
            Err(e) => {
                warn!(error = %e, "Verification check failed to run");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedMetric;

    #[tokio::test]
    async fn test_unknown_check_policy() {
        let spec = VerificationSpec::new("error_rate");

        let lenient = Verifier::new(UnknownCheckPolicy::Pass);
        assert!(lenient.verify(&spec).await);

        let strict = Verifier::new(UnknownCheckPolicy::Fail);
        assert!(!strict.verify(&spec).await);
    }

    #[tokio::test]
    async fn test_noop_check_passes() {
        let verifier =
            Verifier::new(UnknownCheckPolicy::Fail).with_check("health_check", Arc::new(NoopCheck));
        assert!(verifier.verify(&VerificationSpec::new("health_check")).await);
        assert_eq!(verifier.check_types(), vec!["health_check", "manual"]);
    }

    #[tokio::test]
    async fn test_manual_check_never_passes() {
        let verifier = Verifier::new(UnknownCheckPolicy::Pass);
        assert!(!verifier.verify(&VerificationSpec::new(MANUAL_CHECK)).await);
    }

    #[tokio::test]
    async fn test_threshold_check_uses_spec_threshold() {
        let check = ThresholdCheck::new(Arc::new(FixedMetric::new(72.5)), "threshold", 50.0);
        let verifier = Verifier::default().with_check("memory_check", Arc::new(check));

        let under = VerificationSpec::new("memory_check").with_param("threshold", 80);
        assert!(verifier.verify(&under).await);

        let over = VerificationSpec::new("memory_check").with_param("threshold", 70);
        assert!(!verifier.verify(&over).await);

        // falls back to the default threshold of 50
        assert!(!verifier.verify(&VerificationSpec::new("memory_check")).await);
    }

    #[tokio::test]
    async fn test_unreadable_metric_fails_verification() {
        let check = ThresholdCheck::new(Arc::new(FixedMetric::unavailable()), "threshold", 80.0);
        let verifier = Verifier::default().with_check("memory_check", Arc::new(check));
        assert!(!verifier.verify(&VerificationSpec::new("memory_check")).await);
    }
}
