//! Registry of resolvers keyed by (request type, resource type).

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::capability::TypeTag;
use crate::error::BoxError;
use crate::request::Request;
use crate::resolver::{ResolverRegistration, ResolverSet, ResourceResolver};

type Key = (TypeId, TypeId);

fn key_of(registration: &ResolverRegistration) -> Key {
    (
        registration.request_type().id(),
        registration.resource_type().id(),
    )
}

/// Collects resolver registrations during startup.
///
/// Every insertion is "add if absent": registering the same
/// (request type, resource type) pair again keeps the first resolver and
/// reports `false`, so configuration code can run more than once.
///
/// # Examples
///
/// ```
/// use futures::FutureExt;
/// use request_authz::{Request, ResolverRegistry};
///
/// struct ReadNote {
///     id: u32,
/// }
/// impl Request for ReadNote {}
///
/// let mut builder = ResolverRegistry::builder();
/// let first = builder.try_add_fn(|req: &ReadNote, _cancel| {
///     let id = req.id;
///     async move { Ok(Some(format!("note-{id}"))) }.boxed()
/// });
/// let again = builder.try_add_fn(|_: &ReadNote, _cancel| {
///     async move { Ok(Some(String::new())) }.boxed()
/// });
/// assert!(first);
/// assert!(!again);
///
/// let registry = builder.build();
/// assert!(registry.contains::<ReadNote, String>());
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Default)]
pub struct ResolverRegistryBuilder {
    entries: HashMap<Key, ResolverRegistration>,
}

impl ResolverRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `registration` unless its type pair is already registered.
    ///
    /// Returns `true` if it was added.
    pub fn add(&mut self, registration: ResolverRegistration) -> bool {
        let key = key_of(&registration);
        if self.entries.contains_key(&key) {
            tracing::debug!(
                request = registration.request_type().name(),
                resource = registration.resource_type().name(),
                "resolver already registered; keeping the first"
            );
            return false;
        }
        self.entries.insert(key, registration);
        true
    }

    /// Registers `resolver` for requests of type `R`.
    pub fn try_add<R, Res>(&mut self, resolver: Res) -> bool
    where
        R: Request,
        Res: ResourceResolver<R>,
    {
        self.add(ResolverRegistration::new::<R, Res>(resolver))
    }

    /// Registers a resolving closure for requests of type `R`.
    pub fn try_add_fn<R, T, F>(&mut self, f: F) -> bool
    where
        R: Request,
        T: Send + Sync + 'static,
        F: Fn(&R, CancellationToken) -> BoxFuture<'static, Result<Option<T>, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        self.add(ResolverRegistration::from_fn(f))
    }

    /// Adds every registration, skipping pairs already present.
    ///
    /// Returns how many were added.
    pub fn extend<I>(&mut self, registrations: I) -> usize
    where
        I: IntoIterator<Item = ResolverRegistration>,
    {
        let mut added = 0;
        for registration in registrations {
            if self.add(registration) {
                added += 1;
            }
        }
        added
    }

    /// Adds the registrations a module provides.
    ///
    /// Returns how many were added.
    pub fn scan(&mut self, set: &dyn ResolverSet) -> usize {
        self.extend(set.registrations())
    }

    /// Freezes the builder into a read-only registry.
    pub fn build(self) -> ResolverRegistry {
        tracing::debug!(resolvers = self.entries.len(), "resolver registry built");
        ResolverRegistry {
            entries: self.entries,
        }
    }
}

/// Read-only lookup table of resolvers.
///
/// Built once at startup and shared between invocations; it has no
/// interior mutability, so concurrent lookups need no synchronization.
#[derive(Default)]
pub struct ResolverRegistry {
    entries: HashMap<Key, ResolverRegistration>,
}

impl ResolverRegistry {
    /// Starts building a registry.
    pub fn builder() -> ResolverRegistryBuilder {
        ResolverRegistryBuilder::new()
    }

    /// Creates a registry with no resolvers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Finds the resolver for an exact (request type, resource type) pair.
    pub fn find(&self, request: TypeId, resource: TypeId) -> Option<&ResolverRegistration> {
        self.entries.get(&(request, resource))
    }

    /// Returns `true` if a resolver exists for requests `R` producing `T`.
    pub fn contains<R: 'static, T: 'static>(&self) -> bool {
        self.find(TypeId::of::<R>(), TypeId::of::<T>()).is_some()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lists (request type, resource type) pairs in no particular order.
    pub fn registrations(&self) -> impl Iterator<Item = (TypeTag, TypeTag)> + '_ {
        self.entries
            .values()
            .map(|r| (r.request_type(), r.resource_type()))
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .registrations()
            .map(|(request, resource)| format!("{request} -> {resource}"))
            .collect();
        pairs.sort();
        f.debug_struct("ResolverRegistry")
            .field("registered_count", &self.entries.len())
            .field("registrations", &pairs)
            .finish()
    }
}
