use std::fmt;

use crate::error::ConfigError;

/// A policy name that is known to be non-empty.
///
/// Whitespace-only names are accepted here and treated as "no policy" by
/// [`AuthorizationRequirement::policy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyName(String);

impl PolicyName {
    /// Validates a policy name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPolicyName`] if `name` is the empty string.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyPolicyName);
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Marker requiring an authenticated principal and nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated;

/// Marker requiring an authenticated principal and, optionally, a policy.
///
/// # Examples
///
/// ```
/// use request_authz::Authorized;
///
/// let marker = Authorized::policy("documents.update").expect("non-empty");
/// assert_eq!(marker.policy_name(), Some("documents.update"));
///
/// assert!(Authorized::policy("").is_err());
/// assert_eq!(Authorized::any().policy_name(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    policy: Option<PolicyName>,
}

impl Authorized {
    /// Requires the named policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyPolicyName`] if `name` is empty. Use
    /// [`Authorized::any`] when no policy is intended.
    pub fn policy(name: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            policy: Some(PolicyName::new(name)?),
        })
    }

    /// Requires authorization with the policy omitted.
    pub fn any() -> Self {
        Self { policy: None }
    }

    /// Returns the declared policy name, if any.
    pub fn policy_name(&self) -> Option<&str> {
        self.policy.as_ref().map(PolicyName::as_str)
    }
}

/// An authentication-kind marker attached to a request type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMarker {
    /// Authenticated principal required, no policy
    Authenticated,
    /// Authenticated principal required, policy evaluated when present
    Authorized(Option<PolicyName>),
}

impl From<Authenticated> for AuthMarker {
    fn from(_: Authenticated) -> Self {
        AuthMarker::Authenticated
    }
}

impl From<Authorized> for AuthMarker {
    fn from(auth: Authorized) -> Self {
        AuthMarker::Authorized(auth.policy)
    }
}

/// The normalized authorization requirement of one request.
///
/// A present policy name always implies that authentication is required;
/// the constructors are the only way to build a value, so the invariant
/// cannot be broken.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorizationRequirement {
    requires_authentication: bool,
    policy_name: Option<String>,
}

impl AuthorizationRequirement {
    /// No authentication, no policy: the request passes through.
    pub fn none() -> Self {
        Self::default()
    }

    /// Authentication required, no policy evaluation.
    pub fn authentication_only() -> Self {
        Self {
            requires_authentication: true,
            policy_name: None,
        }
    }

    /// Authentication required and `name` evaluated.
    ///
    /// Empty or whitespace-only names degrade to
    /// [`authentication_only`](Self::authentication_only).
    pub fn policy(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.trim().is_empty() {
            return Self::authentication_only();
        }
        Self {
            requires_authentication: true,
            policy_name: Some(name),
        }
    }

    /// Same as [`policy`](Self::policy) for an optional name.
    pub fn maybe_policy(name: Option<&str>) -> Self {
        name.map_or_else(Self::authentication_only, Self::policy)
    }

    /// Returns `true` if a principal must be authenticated.
    pub fn requires_authentication(&self) -> bool {
        self.requires_authentication
    }

    /// Returns the policy to evaluate, if any.
    pub fn policy_name(&self) -> Option<&str> {
        self.policy_name.as_deref()
    }

    /// Returns `true` when the gate has nothing to enforce.
    pub fn is_pass_through(&self) -> bool {
        !self.requires_authentication
    }
}
