//! Resource resolvers and their type-erased registrations.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::capability::{Resource, TypeTag};
use crate::error::{BoxError, ConfigError, Error};
use crate::request::Request;

/// Produces the resource a request of type `R` acts upon.
///
/// Returning `Ok(None)` is a normal outcome: the policy is then evaluated
/// without a resource. Returning `Err` aborts the invocation and the error
/// reaches the caller unchanged as [`Error::Resolver`].
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use request_authz::{BoxError, Request, ResourceResolver};
/// use tokio_util::sync::CancellationToken;
///
/// struct Document {
///     id: u64,
/// }
///
/// struct GetDocument {
///     id: u64,
/// }
///
/// impl Request for GetDocument {}
///
/// struct DocumentResolver;
///
/// #[async_trait]
/// impl ResourceResolver<GetDocument> for DocumentResolver {
///     type Resource = Document;
///
///     async fn resolve(
///         &self,
///         request: &GetDocument,
///         _cancel: &CancellationToken,
///     ) -> Result<Option<Document>, BoxError> {
///         Ok(Some(Document { id: request.id }))
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceResolver<R: Request>: Send + Sync + 'static {
    /// The resource type produced.
    type Resource: Send + Sync + 'static;

    /// Resolves the resource for `request`.
    ///
    /// # Errors
    ///
    /// Any error is propagated to the gate's caller unchanged.
    async fn resolve(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::Resource>, BoxError>;
}

/// A resolver backed by a closure.
///
/// The closure receives the request and a clone of the cancellation token
/// and returns a boxed future that owns everything it needs.
pub struct FnResolver<F, T> {
    f: F,
    _resource: PhantomData<fn() -> T>,
}

impl<F, T> FnResolver<F, T> {
    /// Wraps a resolving closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<R, T, F> ResourceResolver<R> for FnResolver<F, T>
where
    R: Request,
    T: Send + Sync + 'static,
    F: Fn(&R, CancellationToken) -> BoxFuture<'static, Result<Option<T>, BoxError>>
        + Send
        + Sync
        + 'static,
{
    type Resource = T;

    async fn resolve(
        &self,
        request: &R,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, BoxError> {
        (self.f)(request, cancel.clone()).await
    }
}

pub(crate) type ResolveFuture<'a> = BoxFuture<'a, Result<Option<Resource>, Error>>;

/// Object-safe view of a resolver with request and resource types erased.
pub(crate) trait ErasedResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        request: &'a (dyn Any + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> ResolveFuture<'a>;
}

pub(crate) struct TypedResolver<R, Res> {
    resolver: Arc<Res>,
    _request: PhantomData<fn(&R)>,
}

impl<R, Res> TypedResolver<R, Res> {
    pub(crate) fn new(resolver: Arc<Res>) -> Self {
        Self {
            resolver,
            _request: PhantomData,
        }
    }
}

impl<R, Res> ErasedResolver for TypedResolver<R, Res>
where
    R: Request,
    Res: ResourceResolver<R>,
{
    fn resolve<'a>(
        &'a self,
        request: &'a (dyn Any + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let request = request
                .downcast_ref::<R>()
                .ok_or(ConfigError::RequestTypeMismatch {
                    expected: type_name::<R>(),
                })?;
            let resolved = self
                .resolver
                .resolve(request, cancel)
                .await
                .map_err(Error::Resolver)?;
            Ok(resolved.map(Resource::new))
        })
    }
}

/// One (request type, resource type, resolver) entry of a
/// [`ResolverRegistry`](crate::ResolverRegistry).
#[derive(Clone)]
pub struct ResolverRegistration {
    request: TypeTag,
    resource: TypeTag,
    resolver: Arc<dyn ErasedResolver>,
}

impl ResolverRegistration {
    /// Registers `resolver` for requests of type `R`.
    pub fn new<R, Res>(resolver: Res) -> Self
    where
        R: Request,
        Res: ResourceResolver<R>,
    {
        Self {
            request: TypeTag::of::<R>(),
            resource: TypeTag::of::<Res::Resource>(),
            resolver: Arc::new(TypedResolver::<R, Res>::new(Arc::new(resolver))),
        }
    }

    /// Registers a resolving closure for requests of type `R`.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::FutureExt;
    /// use request_authz::{Request, ResolverRegistration};
    ///
    /// struct Ping;
    /// impl Request for Ping {}
    ///
    /// let registration = ResolverRegistration::from_fn(|_: &Ping, _cancel| {
    ///     async move { Ok(Some("pong".to_string())) }.boxed()
    /// });
    /// assert_eq!(registration.resource_type().name(), "alloc::string::String");
    /// ```
    pub fn from_fn<R, T, F>(f: F) -> Self
    where
        R: Request,
        T: Send + Sync + 'static,
        F: Fn(&R, CancellationToken) -> BoxFuture<'static, Result<Option<T>, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        Self::new::<R, _>(FnResolver::<F, T>::new(f))
    }

    /// The request type this registration serves.
    pub fn request_type(&self) -> TypeTag {
        self.request
    }

    /// The resource type this registration produces.
    pub fn resource_type(&self) -> TypeTag {
        self.resource
    }

    pub(crate) fn resolver(&self) -> &dyn ErasedResolver {
        self.resolver.as_ref()
    }
}

impl fmt::Debug for ResolverRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistration")
            .field("request", &self.request.name())
            .field("resource", &self.resource.name())
            .finish_non_exhaustive()
    }
}

/// A group of registrations contributed by one module.
///
/// Stands in for convention scanning: each module lists the resolvers it
/// provides and the registry builder absorbs them with
/// [`scan`](crate::ResolverRegistryBuilder::scan).
pub trait ResolverSet {
    /// Returns this module's registrations.
    fn registrations(&self) -> Vec<ResolverRegistration>;
}

impl ResolverSet for Vec<ResolverRegistration> {
    fn registrations(&self) -> Vec<ResolverRegistration> {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Lookup {
        id: u64,
    }

    impl Request for Lookup {}

    struct Other;

    impl Request for Other {}

    struct Doubler;

    #[async_trait]
    impl ResourceResolver<Lookup> for Doubler {
        type Resource = u64;

        async fn resolve(
            &self,
            request: &Lookup,
            _cancel: &CancellationToken,
        ) -> Result<Option<u64>, BoxError> {
            Ok(Some(request.id * 2))
        }
    }

    #[test]
    fn registration_records_types() {
        let reg = ResolverRegistration::new::<Lookup, _>(Doubler);
        assert_eq!(reg.request_type(), TypeTag::of::<Lookup>());
        assert_eq!(reg.resource_type(), TypeTag::of::<u64>());
    }

    #[tokio::test]
    async fn erased_resolver_produces_resource() {
        let reg = ResolverRegistration::new::<Lookup, _>(Doubler);
        let request = Lookup { id: 21 };
        let cancel = CancellationToken::new();

        let resource = reg
            .resolver()
            .resolve(&request, &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resource.downcast_ref::<u64>(), Some(&42));
    }

    #[tokio::test]
    async fn erased_resolver_rejects_wrong_request_type() {
        let reg = ResolverRegistration::new::<Lookup, _>(Doubler);
        let cancel = CancellationToken::new();

        let err = reg.resolver().resolve(&Other, &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::RequestTypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn closure_resolver_errors_surface_as_resolver_faults() {
        let reg = ResolverRegistration::from_fn(|_: &Lookup, _cancel| {
            async move { Err::<Option<String>, BoxError>("backend down".into()) }.boxed()
        });
        let cancel = CancellationToken::new();

        let err = reg
            .resolver()
            .resolve(&Lookup { id: 1 }, &cancel)
            .await
            .unwrap_err();
        match err {
            Error::Resolver(source) => assert_eq!(source.to_string(), "backend down"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn closure_resolver_may_resolve_nothing() {
        let reg = ResolverRegistration::from_fn(|_: &Lookup, _cancel| {
            async move { Ok::<Option<String>, BoxError>(None) }.boxed()
        });
        let cancel = CancellationToken::new();

        let resolved = reg
            .resolver()
            .resolve(&Lookup { id: 1 }, &cancel)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }
}
