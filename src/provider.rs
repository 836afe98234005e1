use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::capability::Resource;
use crate::error::{BoxError, Violation};
use crate::request::Principal;

/// Outcome of one policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationOutcome {
    succeeded: bool,
    failure_reasons: Vec<String>,
}

impl AuthorizationOutcome {
    /// Access granted.
    pub fn success() -> Self {
        Self {
            succeeded: true,
            failure_reasons: Vec::new(),
        }
    }

    /// Access denied for the given reasons, in order.
    pub fn failure<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            succeeded: false,
            failure_reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if access was granted.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// The reasons reported for a denial.
    pub fn failure_reasons(&self) -> &[String] {
        &self.failure_reasons
    }

    /// Converts a denial into the violation for `policy`.
    ///
    /// Returns `None` when access was granted.
    pub fn into_violation(self, policy: &str) -> Option<Violation> {
        if self.succeeded {
            return None;
        }
        Some(Violation::denied(policy, self.failure_reasons))
    }
}

/// Evaluates named policies. The gate treats it as opaque.
///
/// Implementations may perform I/O and should observe `cancel`; the gate
/// also stops waiting as soon as it fires. The gate never retries and
/// never caches decisions.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Evaluates `policy` for `principal`, optionally against `resource`.
    ///
    /// # Errors
    ///
    /// Errors are surfaced to the gate's caller as
    /// [`Error::Provider`](crate::Error::Provider), unchanged.
    async fn evaluate(
        &self,
        principal: &Principal,
        policy: &str,
        resource: Option<&Resource>,
        cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome, BoxError>;
}
