//! Selects and runs the strategy that supplies a request's resource.
//!
//! Strategies are tried in order and the first applicable one wins:
//! 1. the request's slot already holds a resource
//! 2. the request type declares a resolver
//! 3. the registry has a resolver for (request type, slot resource type)
//! 4. nothing: the resource stays absent

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::capability::Resource;
use crate::catalog::RequestDescriptor;
use crate::error::{ConfigError, Error};
use crate::registry::ResolverRegistry;
use crate::request::Request;
use crate::resolver::ErasedResolver;
use crate::services::ResolverServices;

/// The strategy that supplied (or failed to supply) a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStrategy {
    /// The resource was already set on the request
    AlreadyPopulated,
    /// A resolver declared on the request type ran
    Declared,
    /// A resolver found in the registry ran
    Registry,
    /// No resource was available
    Unavailable,
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::AlreadyPopulated => write!(f, "already-populated"),
            ResolutionStrategy::Declared => write!(f, "declared"),
            ResolutionStrategy::Registry => write!(f, "registry"),
            ResolutionStrategy::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Result of resource resolution for one request.
#[derive(Debug, Clone)]
pub struct Resolution {
    strategy: ResolutionStrategy,
    resource: Option<Resource>,
}

impl Resolution {
    fn unavailable() -> Self {
        Self {
            strategy: ResolutionStrategy::Unavailable,
            resource: None,
        }
    }

    /// The strategy that applied.
    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    /// The resolved resource, if any.
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Consumes the resolution, keeping the resource.
    pub fn into_resource(self) -> Option<Resource> {
        self.resource
    }
}

/// Runs `fut` unless `cancel` fires first.
///
/// Cancellation drops the in-flight future and yields [`Error::Cancelled`].
pub(crate) async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = fut => result,
    }
}

/// Resolves the resource for `request`.
///
/// Requests without a resource slot always resolve to
/// [`ResolutionStrategy::Unavailable`]. When a resolver produces a
/// resource it is also written into the request's slot.
///
/// # Errors
///
/// - [`ConfigError::ResolverNotRegistered`] if a declared resolver has no
///   instance in `services`
/// - [`ConfigError::ResourceTypeMismatch`] if the resolver's resource does
///   not fit the slot; a declared resolver is checked before it runs
/// - [`Error::Resolver`] if the resolver fails
/// - [`Error::Cancelled`] if `cancel` fires while the resolver runs
pub async fn resolve_resource<R: Request>(
    request: &mut R,
    descriptor: Option<&RequestDescriptor>,
    registry: &ResolverRegistry,
    services: &ResolverServices,
    cancel: &CancellationToken,
) -> Result<Resolution, Error> {
    let Some(slot) = request.resource_slot() else {
        return Ok(Resolution::unavailable());
    };
    if let Some(resource) = slot.current() {
        return Ok(Resolution {
            strategy: ResolutionStrategy::AlreadyPopulated,
            resource: Some(resource),
        });
    }
    let slot_type = slot.resource_type();

    if let Some(declared) = descriptor.and_then(RequestDescriptor::declared_resolver) {
        if declared.resource_type().id() != slot_type.id() {
            return Err(ConfigError::ResourceTypeMismatch {
                expected: slot_type.name(),
                actual: declared.resource_type().name(),
            }
            .into());
        }
        let resolver = declared
            .locate(services)
            .ok_or(ConfigError::ResolverNotRegistered {
                request: type_name::<R>(),
                resolver: declared.resolver_type().name(),
            })?;
        let resource = invoke(resolver.as_ref(), request, cancel).await?;
        return Ok(Resolution {
            strategy: ResolutionStrategy::Declared,
            resource,
        });
    }

    if let Some(registration) = registry.find(TypeId::of::<R>(), slot_type.id()) {
        let resource = invoke(registration.resolver(), request, cancel).await?;
        return Ok(Resolution {
            strategy: ResolutionStrategy::Registry,
            resource,
        });
    }

    Ok(Resolution::unavailable())
}

async fn invoke<R: Request>(
    resolver: &dyn ErasedResolver,
    request: &mut R,
    cancel: &CancellationToken,
) -> Result<Option<Resource>, Error> {
    let erased: &(dyn Any + Send + Sync) = &*request;
    let pending = resolver.resolve(erased, cancel);
    let resource = until_cancelled(cancel, pending).await?;
    if let Some(resource) = &resource {
        if let Some(slot) = request.resource_slot() {
            slot.fill(resource.clone())?;
        }
    }
    Ok(resource)
}
