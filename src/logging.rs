use crate::classifier::RequirementSource;
use crate::error::{Error, Violation};
use crate::request::Principal;
use crate::resolution::ResolutionStrategy;

/// Structured decision logging for one gate invocation.
///
/// Every event carries the request type and, when the principal supplier
/// knows it, the request ID. Pass-through events are logged without
/// consulting the supplier. Resource contents are never logged.
#[derive(Debug)]
pub(crate) struct DecisionLog<'a> {
    request_type: &'static str,
    request_id: &'a str,
}

impl<'a> DecisionLog<'a> {
    pub(crate) fn new(request_type: &'static str, request_id: Option<&'a str>) -> Self {
        Self {
            request_type,
            request_id: request_id.unwrap_or("-"),
        }
    }

    pub(crate) fn pass_through(&self) {
        tracing::trace!(
            request_type = self.request_type,
            request_id = %self.request_id,
            "no authorization requirement"
        );
    }

    pub(crate) fn authenticated(&self, principal: &Principal, source: RequirementSource) {
        tracing::debug!(
            request_type = self.request_type,
            request_id = %self.request_id,
            principal = %principal.id,
            %source,
            "authenticated"
        );
    }

    pub(crate) fn resolved(&self, policy: &str, strategy: ResolutionStrategy) {
        tracing::debug!(
            request_type = self.request_type,
            request_id = %self.request_id,
            policy,
            %strategy,
            "resource resolution finished"
        );
    }

    pub(crate) fn granted(&self, principal: &Principal, policy: &str) {
        tracing::debug!(
            request_type = self.request_type,
            request_id = %self.request_id,
            principal = %principal.id,
            policy,
            "authorized"
        );
    }

    pub(crate) fn denied(&self, violation: &Violation) {
        tracing::warn!(
            request_type = self.request_type,
            request_id = %self.request_id,
            requirement = %violation.requirement,
            reasons = violation.errors.len(),
            "authorization failed"
        );
    }

    pub(crate) fn fault(&self, error: &Error) {
        match error {
            Error::Cancelled => tracing::debug!(
                request_type = self.request_type,
                request_id = %self.request_id,
                "authorization cancelled"
            ),
            other => tracing::error!(
                request_type = self.request_type,
                request_id = %self.request_id,
                error = %other,
                "authorization aborted"
            ),
        }
    }
}
