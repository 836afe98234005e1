//! Declarative authorization metadata attached to request types.
//!
//! Markers are declared once at startup and read by type afterwards:
//!
//! ```
//! use request_authz::{Authenticated, Authorized, Declaration, Request, RequestCatalog};
//!
//! struct ListDocuments;
//! impl Request for ListDocuments {}
//!
//! struct ArchiveDocument;
//! impl Request for ArchiveDocument {}
//!
//! # fn main() -> Result<(), request_authz::ConfigError> {
//! let archive = Authorized::policy("documents.archive")?;
//! let catalog = RequestCatalog::builder()
//!     .declare(Declaration::<ListDocuments>::new().require(Authenticated)?)?
//!     .declare(Declaration::<ArchiveDocument>::new().require(archive)?)?
//!     .build();
//!
//! assert!(catalog.descriptor_of::<ListDocuments>().is_some());
//! # Ok(())
//! # }
//! ```

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::TypeTag;
use crate::error::ConfigError;
use crate::policy::AuthMarker;
use crate::request::Request;
use crate::resolver::{ErasedResolver, ResourceResolver, TypedResolver};
use crate::services::ResolverServices;

type Locate = fn(&ResolverServices) -> Option<Arc<dyn ErasedResolver>>;

fn locate<R, Res>(services: &ResolverServices) -> Option<Arc<dyn ErasedResolver>>
where
    R: Request,
    Res: ResourceResolver<R>,
{
    let resolver = services.get::<Res>()?;
    Some(Arc::new(TypedResolver::<R, Res>::new(resolver)))
}

/// A resolver bound to a request type by a declarative marker.
#[derive(Clone, Copy)]
pub struct DeclaredResolver {
    resolver: TypeTag,
    resource: TypeTag,
    locate: Locate,
}

impl DeclaredResolver {
    /// The resolver type.
    pub fn resolver_type(&self) -> TypeTag {
        self.resolver
    }

    /// The resource type the resolver produces.
    pub fn resource_type(&self) -> TypeTag {
        self.resource
    }

    pub(crate) fn locate(&self, services: &ResolverServices) -> Option<Arc<dyn ErasedResolver>> {
        (self.locate)(services)
    }
}

impl fmt::Debug for DeclaredResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredResolver")
            .field("resolver", &self.resolver.name())
            .field("resource", &self.resource.name())
            .finish()
    }
}

/// The markers declared for one request type.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    auth: Option<AuthMarker>,
    resolver: Option<DeclaredResolver>,
}

impl RequestDescriptor {
    /// The authentication-kind marker, if declared.
    pub fn auth_marker(&self) -> Option<&AuthMarker> {
        self.auth.as_ref()
    }

    /// The declared resolver, if any.
    pub fn declared_resolver(&self) -> Option<&DeclaredResolver> {
        self.resolver.as_ref()
    }
}

/// Markers for request type `R`, checked as they are added.
///
/// At most one authentication-kind marker ([`Authenticated`] or
/// [`Authorized`]) and at most one resolver may be declared.
///
/// [`Authenticated`]: crate::Authenticated
/// [`Authorized`]: crate::Authorized
pub struct Declaration<R> {
    descriptor: RequestDescriptor,
    _request: PhantomData<fn(&R)>,
}

impl<R: Request> Declaration<R> {
    /// Starts an empty declaration.
    pub fn new() -> Self {
        Self {
            descriptor: RequestDescriptor::default(),
            _request: PhantomData,
        }
    }

    /// Adds an authentication-kind marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateMarker`] if one is already declared.
    pub fn require(mut self, marker: impl Into<AuthMarker>) -> Result<Self, ConfigError> {
        if self.descriptor.auth.is_some() {
            return Err(ConfigError::DuplicateMarker {
                request: type_name::<R>(),
                marker: "authentication",
            });
        }
        self.descriptor.auth = Some(marker.into());
        Ok(self)
    }

    /// Binds resolver type `Res` to this request type.
    ///
    /// The instance is taken from [`ResolverServices`] when a request is
    /// authorized.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateMarker`] if a resolver is already declared.
    pub fn resolve_with<Res: ResourceResolver<R>>(mut self) -> Result<Self, ConfigError> {
        if self.descriptor.resolver.is_some() {
            return Err(ConfigError::DuplicateMarker {
                request: type_name::<R>(),
                marker: "resolver",
            });
        }
        self.descriptor.resolver = Some(DeclaredResolver {
            resolver: TypeTag::of::<Res>(),
            resource: TypeTag::of::<Res::Resource>(),
            locate: locate::<R, Res>,
        });
        Ok(self)
    }
}

impl<R: Request> Default for Declaration<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Declaration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("request", &type_name::<R>())
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// Collects declarations during startup.
#[derive(Debug, Default)]
pub struct RequestCatalogBuilder {
    entries: HashMap<TypeId, (&'static str, RequestDescriptor)>,
}

impl RequestCatalogBuilder {
    /// Adds the declaration for `R`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateDeclaration`] if `R` was already declared.
    pub fn declare<R: Request>(mut self, declaration: Declaration<R>) -> Result<Self, ConfigError> {
        let request = type_name::<R>();
        if self.entries.contains_key(&TypeId::of::<R>()) {
            return Err(ConfigError::DuplicateDeclaration { request });
        }
        self.entries
            .insert(TypeId::of::<R>(), (request, declaration.descriptor));
        Ok(self)
    }

    /// Freezes the catalog.
    pub fn build(self) -> RequestCatalog {
        tracing::debug!(requests = self.entries.len(), "request catalog built");
        RequestCatalog {
            entries: self.entries,
        }
    }
}

/// Read-only table of request type → declared markers.
///
/// Request types that were never declared have no markers; the gate then
/// falls back to their capability interfaces.
#[derive(Debug, Default)]
pub struct RequestCatalog {
    entries: HashMap<TypeId, (&'static str, RequestDescriptor)>,
}

impl RequestCatalog {
    /// Starts building a catalog.
    pub fn builder() -> RequestCatalogBuilder {
        RequestCatalogBuilder::default()
    }

    /// Creates a catalog with no declarations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the markers declared for `R`.
    pub fn descriptor_of<R: 'static>(&self) -> Option<&RequestDescriptor> {
        self.descriptor(TypeId::of::<R>())
    }

    /// Returns the markers declared for the request type `id`.
    pub fn descriptor(&self, id: TypeId) -> Option<&RequestDescriptor> {
        self.entries.get(&id).map(|(_, descriptor)| descriptor)
    }

    /// Number of declared request types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the declared request types, sorted.
    pub fn request_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names
    }
}
