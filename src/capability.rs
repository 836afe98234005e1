//! Capability interfaces a request type implements explicitly.
//!
//! A request exposes authorization-relevant data through two small
//! interfaces instead of being probed at runtime:
//! - [`PolicyRequest`]: the policy name to evaluate
//! - [`ResourceSlot`]: the resource the policy is evaluated against,
//!   usually a [`Slot<T>`] field on the request

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

/// Capability of a request that names its own policy at runtime.
pub trait PolicyRequest {
    /// Returns the policy to evaluate. `None`, empty and whitespace-only
    /// values all mean "authentication only".
    fn policy_name(&self) -> Option<&str>;
}

/// A Rust type identified by its [`TypeId`], with its name kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Returns the tag of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Returns the type id.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A shared handle to a resource of any type.
///
/// Cloning is cheap and preserves identity: two clones are
/// [`ptr_eq`](Resource::ptr_eq). `Debug` prints only the type name so
/// resource contents never reach logs.
#[derive(Clone)]
pub struct Resource {
    value: Arc<dyn Any + Send + Sync>,
    tag: TypeTag,
}

impl Resource {
    /// Wraps a resource value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared resource without copying it.
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            tag: TypeTag::of::<T>(),
        }
    }

    /// Returns the concrete type of the resource.
    pub fn resource_type(&self) -> TypeTag {
        self.tag
    }

    /// Borrows the resource as `T`, if it is one.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Returns the shared `T`, if the resource is one.
    pub fn downcast_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Returns `true` if both handles point at the same resource.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.tag.name).finish()
    }
}

/// Capability of a request that carries the resource it acts upon.
pub trait ResourceSlot: Send + Sync {
    /// The resource type this slot holds, known without a value.
    fn resource_type(&self) -> TypeTag;

    /// Returns the current resource, if one is set.
    fn current(&self) -> Option<Resource>;

    /// Stores `resource` in the slot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ResourceTypeMismatch`] if `resource` is not of
    /// the slot's type.
    fn fill(&mut self, resource: Resource) -> Result<(), ConfigError>;
}

/// A typed resource slot to embed in request types.
///
/// # Examples
///
/// ```
/// use request_authz::{Resource, ResourceSlot, Slot};
///
/// let mut slot: Slot<String> = Slot::empty();
/// assert!(slot.current().is_none());
///
/// slot.fill(Resource::new("readme".to_string())).unwrap();
/// assert_eq!(slot.get().map(String::as_str), Some("readme"));
///
/// assert!(slot.fill(Resource::new(42_u32)).is_err());
/// ```
pub struct Slot<T> {
    value: Option<Arc<T>>,
}

impl<T: Send + Sync + 'static> Slot<T> {
    /// Creates an empty slot.
    pub fn empty() -> Self {
        Self { value: None }
    }

    /// Creates a slot that already holds `value`.
    pub fn with(value: T) -> Self {
        Self {
            value: Some(Arc::new(value)),
        }
    }

    /// Creates a slot that shares an existing resource.
    pub fn with_arc(value: Arc<T>) -> Self {
        Self { value: Some(value) }
    }

    /// Borrows the resource, if set.
    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    /// Returns the shared resource, if set.
    pub fn get_arc(&self) -> Option<&Arc<T>> {
        self.value.as_ref()
    }

    /// Replaces the resource.
    pub fn set(&mut self, value: T) {
        self.value = Some(Arc::new(value));
    }

    /// Returns `true` if a resource is set.
    pub fn is_filled(&self) -> bool {
        self.value.is_some()
    }
}

impl<T: Send + Sync + 'static> ResourceSlot for Slot<T> {
    fn resource_type(&self) -> TypeTag {
        TypeTag::of::<T>()
    }

    fn current(&self) -> Option<Resource> {
        self.value.clone().map(Resource::from_arc)
    }

    fn fill(&mut self, resource: Resource) -> Result<(), ConfigError> {
        let value = resource
            .downcast_arc::<T>()
            .ok_or(ConfigError::ResourceTypeMismatch {
                expected: type_name::<T>(),
                actual: resource.resource_type().name(),
            })?;
        self.value = Some(value);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> Default for Slot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("resource", &type_name::<T>())
            .field("filled", &self.value.is_some())
            .finish()
    }
}
