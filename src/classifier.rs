//! Maps a request to its [`AuthorizationRequirement`].
//!
//! The precedence between declaration mechanisms is a table, evaluated
//! top to bottom, first match wins:
//!
//! | # | Source                  | Requirement                         |
//! |---|-------------------------|-------------------------------------|
//! | 1 | `Authenticated` marker  | authentication only                 |
//! | 2 | `Authorized` marker     | authentication + marker's policy    |
//! | 3 | [`PolicyRequest`] impl  | authentication + runtime policy     |
//! | - | nothing matched         | pass through                        |
//!
//! [`PolicyRequest`]: crate::PolicyRequest

use std::fmt;

use crate::catalog::RequestDescriptor;
use crate::policy::{AuthMarker, AuthorizationRequirement};
use crate::request::Request;

/// Which declaration produced a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementSource {
    /// The request type carries the `Authenticated` marker
    AuthenticatedMarker,
    /// The request type carries the `Authorized` marker
    AuthorizedMarker,
    /// The request implements the policy-name capability
    PolicyCapability,
    /// Nothing declared
    Undeclared,
}

impl fmt::Display for RequirementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementSource::AuthenticatedMarker => write!(f, "authenticated-marker"),
            RequirementSource::AuthorizedMarker => write!(f, "authorized-marker"),
            RequirementSource::PolicyCapability => write!(f, "policy-capability"),
            RequirementSource::Undeclared => write!(f, "undeclared"),
        }
    }
}

type Rule = fn(Option<&RequestDescriptor>, &dyn Request) -> Option<AuthorizationRequirement>;

const PRECEDENCE: [(RequirementSource, Rule); 3] = [
    (RequirementSource::AuthenticatedMarker, authenticated_marker),
    (RequirementSource::AuthorizedMarker, authorized_marker),
    (RequirementSource::PolicyCapability, policy_capability),
];

fn authenticated_marker(
    descriptor: Option<&RequestDescriptor>,
    _request: &dyn Request,
) -> Option<AuthorizationRequirement> {
    match descriptor?.auth_marker()? {
        AuthMarker::Authenticated => Some(AuthorizationRequirement::authentication_only()),
        AuthMarker::Authorized(_) => None,
    }
}

fn authorized_marker(
    descriptor: Option<&RequestDescriptor>,
    _request: &dyn Request,
) -> Option<AuthorizationRequirement> {
    match descriptor?.auth_marker()? {
        AuthMarker::Authorized(policy) => Some(AuthorizationRequirement::maybe_policy(
            policy.as_ref().map(|p| p.as_str()),
        )),
        AuthMarker::Authenticated => None,
    }
}

fn policy_capability(
    _descriptor: Option<&RequestDescriptor>,
    request: &dyn Request,
) -> Option<AuthorizationRequirement> {
    let capability = request.policy()?;
    Some(AuthorizationRequirement::maybe_policy(capability.policy_name()))
}

/// A requirement together with the declaration it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    requirement: AuthorizationRequirement,
    source: RequirementSource,
}

impl Classification {
    /// The normalized requirement.
    pub fn requirement(&self) -> &AuthorizationRequirement {
        &self.requirement
    }

    /// Which declaration matched.
    pub fn source(&self) -> RequirementSource {
        self.source
    }

    /// Consumes the classification, keeping the requirement.
    pub fn into_requirement(self) -> AuthorizationRequirement {
        self.requirement
    }
}

/// Classifies `request` using the markers in `descriptor`, if any.
///
/// # Examples
///
/// ```
/// use request_authz::{classify, PolicyRequest, Request, RequirementSource};
///
/// struct Rename {
///     policy: String,
/// }
///
/// impl PolicyRequest for Rename {
///     fn policy_name(&self) -> Option<&str> {
///         Some(&self.policy)
///     }
/// }
///
/// impl Request for Rename {
///     fn policy(&self) -> Option<&dyn PolicyRequest> {
///         Some(self)
///     }
/// }
///
/// let c = classify(None, &Rename { policy: "files.rename".into() });
/// assert_eq!(c.source(), RequirementSource::PolicyCapability);
/// assert_eq!(c.requirement().policy_name(), Some("files.rename"));
///
/// let blank = classify(None, &Rename { policy: "  ".into() });
/// assert!(blank.requirement().requires_authentication());
/// assert_eq!(blank.requirement().policy_name(), None);
/// ```
pub fn classify(descriptor: Option<&RequestDescriptor>, request: &dyn Request) -> Classification {
    PRECEDENCE
        .iter()
        .find_map(|(source, rule)| {
            rule(descriptor, request).map(|requirement| Classification {
                requirement,
                source: *source,
            })
        })
        .unwrap_or(Classification {
            requirement: AuthorizationRequirement::none(),
            source: RequirementSource::Undeclared,
        })
}

/// The order in which declaration sources are consulted.
pub fn precedence() -> impl Iterator<Item = RequirementSource> {
    PRECEDENCE.into_iter().map(|(source, _)| source)
}
