use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Instances of resolver types named by declarative markers.
///
/// A request type declared with
/// [`resolve_with::<Res>()`](crate::Declaration::resolve_with) gets its
/// resolver from here at invocation time, looked up by type. A missing
/// instance is a configuration error, not an authorization failure.
#[derive(Default)]
pub struct ResolverServices {
    services: HashMap<TypeId, (&'static str, Arc<dyn Any + Send + Sync>)>,
}

impl ResolverServices {
    /// Creates an empty set of services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `service`, replacing any earlier instance of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.insert_arc(Arc::new(service));
    }

    /// Stores an already shared `service`.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        let service: Arc<dyn Any + Send + Sync> = service;
        self.services
            .insert(TypeId::of::<T>(), (type_name::<T>(), service));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Returns the instance of `T`, if one was stored.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let (_, service) = self.services.get(&TypeId::of::<T>())?;
        Arc::clone(service).downcast::<T>().ok()
    }

    /// Returns `true` if an instance of `T` was stored.
    pub fn contains<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ResolverServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.services.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("ResolverServices")
            .field("services", &names)
            .finish()
    }
}
