use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::RequestCatalog;
use crate::classifier::{classify, Classification};
use crate::error::{Error, Violation};
use crate::logging::DecisionLog;
use crate::provider::AuthorizationProvider;
use crate::registry::ResolverRegistry;
use crate::request::{PrincipalSupplier, Request};
use crate::resolution::{resolve_resource, until_cancelled, Resolution};
use crate::services::ResolverServices;

/// How a request got through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to enforce
    PassThrough,
    /// An authenticated principal was required and present
    Authenticated,
    /// The named policy granted access
    Authorized {
        /// The evaluated policy
        policy: String,
    },
}

/// The policy enforcement gate.
///
/// `PolicyGate` is the pipeline stage placed in front of request handlers.
/// For each request it:
/// 1. classifies the request's authorization requirement
/// 2. checks that the principal is authenticated, if required
/// 3. resolves the resource, if a policy is named and the request carries a slot
/// 4. asks the [`AuthorizationProvider`] to evaluate the policy
///
/// The gate keeps no per-invocation state and may be cloned and shared
/// freely between tasks.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use async_trait::async_trait;
/// use request_authz::{
///     Authenticated, AuthorizationOutcome, AuthorizationProvider, BoxError, Declaration, Error,
///     PolicyGate, Principal, Request, RequestCatalog, RequestMeta, Resource,
/// };
/// use tokio_util::sync::CancellationToken;
///
/// struct AllowAll;
///
/// #[async_trait]
/// impl AuthorizationProvider for AllowAll {
///     async fn evaluate(
///         &self,
///         _principal: &Principal,
///         _policy: &str,
///         _resource: Option<&Resource>,
///         _cancel: &CancellationToken,
///     ) -> Result<AuthorizationOutcome, BoxError> {
///         Ok(AuthorizationOutcome::success())
///     }
/// }
///
/// struct WhoAmI;
/// impl Request for WhoAmI {}
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Error> {
/// let catalog = RequestCatalog::builder()
///     .declare(Declaration::<WhoAmI>::new().require(Authenticated)?)?
///     .build();
/// let gate = PolicyGate::builder(Arc::new(AllowAll)).catalog(catalog).build();
///
/// let meta = RequestMeta::new("req-1").with_principal(Principal::authenticated("u1", "Alice"));
/// let cancel = CancellationToken::new();
///
/// let name = gate
///     .handle(WhoAmI, &meta, &cancel, |_req| async { Ok::<_, Error>("Alice") })
///     .await?;
/// assert_eq!(name, "Alice");
///
/// let anonymous = RequestMeta::new("req-2");
/// let err = gate
///     .handle(WhoAmI, &anonymous, &cancel, |_req| async { Ok::<_, Error>("unreachable") })
///     .await
///     .unwrap_err();
/// assert!(err.is_authentication_failure());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PolicyGate {
    catalog: Arc<RequestCatalog>,
    registry: Arc<ResolverRegistry>,
    services: Arc<ResolverServices>,
    provider: Arc<dyn AuthorizationProvider>,
}

impl PolicyGate {
    /// Starts building a gate around `provider`.
    pub fn builder(provider: Arc<dyn AuthorizationProvider>) -> PolicyGateBuilder {
        PolicyGateBuilder {
            provider,
            catalog: None,
            registry: None,
            services: None,
        }
    }

    /// The declarations this gate reads.
    pub fn catalog(&self) -> &RequestCatalog {
        &self.catalog
    }

    /// The resolver registry this gate reads.
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Classifies `request` without enforcing anything.
    pub fn classify<R: Request>(&self, request: &R) -> Classification {
        classify(self.catalog.descriptor_of::<R>(), request)
    }

    /// Resolves the resource for `request` without evaluating any policy.
    ///
    /// # Errors
    ///
    /// See [`resolve_resource`](crate::resolve_resource).
    pub async fn resolve_resource<R: Request>(
        &self,
        request: &mut R,
        cancel: &CancellationToken,
    ) -> Result<Resolution, Error> {
        resolve_resource(
            request,
            self.catalog.descriptor_of::<R>(),
            &self.registry,
            &self.services,
            cancel,
        )
        .await
    }

    /// Authorizes `request` without forwarding it.
    ///
    /// The principal supplier is not touched at all for pass-through
    /// requests; otherwise its principal is read exactly once. Resolvers and the provider run only
    /// after authentication succeeded and only when a policy is named.
    ///
    /// # Errors
    ///
    /// - [`Error::Violation`] with [`FailedRequirement::Authentication`] if
    ///   no authenticated principal is present
    /// - [`Error::Violation`] with [`FailedRequirement::Policy`] if the
    ///   provider denies access
    /// - [`Error::Configuration`], [`Error::Resolver`], [`Error::Provider`]
    ///   or [`Error::Cancelled`] from resolution and evaluation, unchanged
    ///
    /// [`FailedRequirement::Authentication`]: crate::FailedRequirement::Authentication
    /// [`FailedRequirement::Policy`]: crate::FailedRequirement::Policy
    pub async fn authorize<R: Request>(
        &self,
        request: &mut R,
        principals: &dyn PrincipalSupplier,
        cancel: &CancellationToken,
    ) -> Result<Decision, Error> {
        let classification = self.classify(request);
        let requirement = classification.requirement();

        if !requirement.requires_authentication() {
            DecisionLog::new(type_name::<R>(), None).pass_through();
            return Ok(Decision::PassThrough);
        }

        let log = DecisionLog::new(type_name::<R>(), principals.request_id());
        let principal = match principals.principal() {
            Some(principal) if principal.is_authenticated() => principal,
            _ => {
                let violation = Violation::unauthenticated();
                log.denied(&violation);
                return Err(violation.into());
            }
        };

        let Some(policy) = requirement.policy_name() else {
            log.authenticated(&principal, classification.source());
            return Ok(Decision::Authenticated);
        };

        let resolution = match self.resolve_resource(request, cancel).await {
            Ok(resolution) => resolution,
            Err(err) => {
                log.fault(&err);
                return Err(err);
            }
        };
        log.resolved(policy, resolution.strategy());
        let resource = resolution.into_resource();

        let evaluation = until_cancelled(cancel, async {
            self.provider
                .evaluate(&principal, policy, resource.as_ref(), cancel)
                .await
                .map_err(Error::Provider)
        })
        .await;
        let outcome = match evaluation {
            Ok(outcome) => outcome,
            Err(err) => {
                log.fault(&err);
                return Err(err);
            }
        };

        match outcome.into_violation(policy) {
            None => {
                log.granted(&principal, policy);
                Ok(Decision::Authorized {
                    policy: policy.to_string(),
                })
            }
            Some(violation) => {
                log.denied(&violation);
                Err(violation.into())
            }
        }
    }

    /// Authorizes `request` and, if it passes, forwards it to `next`.
    ///
    /// `next` runs exactly once when authorization passes and never when it
    /// fails. Its result is returned unchanged.
    ///
    /// # Errors
    ///
    /// Everything [`authorize`](Self::authorize) returns, converted into
    /// `E`, plus whatever `next` returns.
    pub async fn handle<R, T, E, F, Fut>(
        &self,
        mut request: R,
        principals: &dyn PrincipalSupplier,
        cancel: &CancellationToken,
        next: F,
    ) -> Result<T, E>
    where
        R: Request,
        F: FnOnce(R) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Error>,
    {
        self.authorize(&mut request, principals, cancel).await?;
        next(request).await
    }
}

impl fmt::Debug for PolicyGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyGate")
            .field("catalog", &self.catalog)
            .field("registry", &self.registry)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`PolicyGate`] at startup.
///
/// Components left unset default to empty.
pub struct PolicyGateBuilder {
    provider: Arc<dyn AuthorizationProvider>,
    catalog: Option<Arc<RequestCatalog>>,
    registry: Option<Arc<ResolverRegistry>>,
    services: Option<Arc<ResolverServices>>,
}

impl PolicyGateBuilder {
    /// Sets the declarations.
    #[must_use]
    pub fn catalog(mut self, catalog: impl Into<Arc<RequestCatalog>>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    /// Sets the resolver registry.
    #[must_use]
    pub fn registry(mut self, registry: impl Into<Arc<ResolverRegistry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Sets the resolver instances used by declared resolvers.
    #[must_use]
    pub fn services(mut self, services: impl Into<Arc<ResolverServices>>) -> Self {
        self.services = Some(services.into());
        self
    }

    /// Builds the gate.
    pub fn build(self) -> PolicyGate {
        let gate = PolicyGate {
            catalog: self.catalog.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
            services: self.services.unwrap_or_default(),
            provider: self.provider,
        };
        tracing::debug!(
            requests = gate.catalog.len(),
            resolvers = gate.registry.len(),
            services = gate.services.len(),
            "policy gate ready"
        );
        gate
    }
}

impl fmt::Debug for PolicyGateBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyGateBuilder")
            .field("catalog", &self.catalog)
            .field("registry", &self.registry)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}
