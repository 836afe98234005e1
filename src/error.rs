use std::fmt;

/// Error type raised by resource resolvers and authorization providers.
///
/// The gate carries these values as the source of [`Error::Resolver`] and
/// [`Error::Provider`] without inspecting or rewrapping them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Sole reason attached to every authentication failure.
pub const UNAUTHENTICATED_REASON: &str = "principal is not authenticated";

/// Reason used when a provider denies access without saying why.
pub const DEFAULT_DENIAL_REASON: &str = "authorization failed";

/// Errors that can occur while authorizing a request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Access was refused: the principal is unauthenticated or a policy denied it.
    #[error("policy violation: {0}")]
    Violation(#[from] Violation),

    /// The authorization metadata or wiring is wrong. This is a programming
    /// error, never an access-control decision.
    #[error("authorization misconfigured: {0}")]
    Configuration(#[from] ConfigError),

    /// A resource resolver failed.
    #[error("resource resolver failed: {0}")]
    Resolver(#[source] BoxError),

    /// The authorization provider failed to produce a decision.
    #[error("authorization provider failed: {0}")]
    Provider(#[source] BoxError),

    /// The caller cancelled the invocation while it was suspended.
    #[error("authorization cancelled")]
    Cancelled,
}

impl Error {
    /// Returns the violation if this error is an access-control refusal.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            Error::Violation(v) => Some(v),
            _ => None,
        }
    }

    /// Returns `true` if the principal was missing or not authenticated.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Error::Violation(Violation {
                requirement: FailedRequirement::Authentication,
                ..
            })
        )
    }

    /// Returns `true` for misconfiguration errors.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// A refused request with the requirement that failed and the reasons why.
///
/// This is the only failure artifact a presentation layer needs to map to
/// its own representation (for example an HTTP 401 or 403).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{requirement}: {}", .errors.join("; "))]
pub struct Violation {
    /// The requirement that was not met
    pub requirement: FailedRequirement,
    /// Ordered, human-readable reasons
    pub errors: Vec<String>,
}

impl Violation {
    /// Creates the violation raised when no authenticated principal is present.
    pub fn unauthenticated() -> Self {
        Self {
            requirement: FailedRequirement::Authentication,
            errors: vec![UNAUTHENTICATED_REASON.to_string()],
        }
    }

    /// Creates the violation raised when `policy` denies access.
    ///
    /// An empty `reasons` list is replaced with [`DEFAULT_DENIAL_REASON`].
    pub fn denied(policy: impl Into<String>, reasons: Vec<String>) -> Self {
        let errors = if reasons.is_empty() {
            vec![DEFAULT_DENIAL_REASON.to_string()]
        } else {
            reasons
        };
        Self {
            requirement: FailedRequirement::Policy(policy.into()),
            errors,
        }
    }
}

/// The requirement a [`Violation`] reports as failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailedRequirement {
    /// Authentication was required but no authenticated principal was present
    Authentication,
    /// The named policy denied access
    Policy(String),
}

impl FailedRequirement {
    /// Returns the external name: `"Authentication"` or the policy name.
    pub fn as_str(&self) -> &str {
        match self {
            FailedRequirement::Authentication => "Authentication",
            FailedRequirement::Policy(name) => name,
        }
    }
}

impl fmt::Display for FailedRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed authorization metadata or wiring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A policy marker was given an explicitly empty name.
    #[error("policy name must not be empty; omit it to require authentication only")]
    EmptyPolicyName,

    /// A request type was given two markers of the same kind.
    #[error("`{request}` already declares a {marker} marker")]
    DuplicateMarker {
        /// Request type name
        request: &'static str,
        /// Marker kind (`authentication` or `resolver`)
        marker: &'static str,
    },

    /// A request type was declared twice in one catalog.
    #[error("`{request}` is declared more than once")]
    DuplicateDeclaration {
        /// Request type name
        request: &'static str,
    },

    /// A declared resolver has no instance in the resolver services.
    #[error("resolver `{resolver}` declared on `{request}` is not registered")]
    ResolverNotRegistered {
        /// Request type name
        request: &'static str,
        /// Resolver type name
        resolver: &'static str,
    },

    /// A resolver produced a resource the request's slot cannot hold.
    #[error("resource slot holds `{expected}` but was given `{actual}`")]
    ResourceTypeMismatch {
        /// Type advertised by the slot
        expected: &'static str,
        /// Type that was produced
        actual: &'static str,
    },

    /// A resolver was invoked with a request of the wrong type.
    #[error("resolver for `{expected}` invoked with another request type")]
    RequestTypeMismatch {
        /// Request type the resolver was registered for
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_violation_has_fixed_reason() {
        let v = Violation::unauthenticated();
        assert_eq!(v.requirement, FailedRequirement::Authentication);
        assert_eq!(v.errors, vec![UNAUTHENTICATED_REASON.to_string()]);
        assert_eq!(v.to_string(), "Authentication: principal is not authenticated");
    }

    #[test]
    fn denied_without_reasons_uses_default() {
        let v = Violation::denied("documents.update", Vec::new());
        assert_eq!(v.errors, vec![DEFAULT_DENIAL_REASON.to_string()]);
        assert_eq!(v.requirement.as_str(), "documents.update");
    }

    #[test]
    fn denied_keeps_reason_order() {
        let v = Violation::denied("x", vec!["b".to_string(), "a".to_string()]);
        assert_eq!(v.errors, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(v.to_string(), "x: b; a");
    }

    #[test]
    fn error_classification_helpers() {
        let auth: Error = Violation::unauthenticated().into();
        assert!(auth.is_authentication_failure());
        assert!(!auth.is_configuration_error());

        let denied: Error = Violation::denied("p", Vec::new()).into();
        assert!(!denied.is_authentication_failure());
        assert!(denied.violation().is_some());

        let config: Error = ConfigError::EmptyPolicyName.into();
        assert!(config.is_configuration_error());
        assert!(config.violation().is_none());
    }

    #[test]
    fn fault_keeps_source() {
        let source: BoxError = "disk on fire".into();
        let err = Error::Resolver(source);
        let inner = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(inner.as_deref(), Some("disk on fire"));
    }
}
