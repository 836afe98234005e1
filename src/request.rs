use crate::capability::{PolicyRequest, ResourceSlot};

/// A command or query submitted to the pipeline.
///
/// The trait has no required methods. A request type opts into the
/// capability interfaces by overriding the accessors below; everything
/// else about its authorization lives in the
/// [`RequestCatalog`](crate::RequestCatalog).
///
/// # Examples
///
/// ```
/// use request_authz::{PolicyRequest, Request, ResourceSlot, Slot};
///
/// struct Document {
///     id: u64,
/// }
///
/// struct UpdateDocument {
///     id: u64,
///     document: Slot<Document>,
/// }
///
/// impl PolicyRequest for UpdateDocument {
///     fn policy_name(&self) -> Option<&str> {
///         Some("documents.update")
///     }
/// }
///
/// impl Request for UpdateDocument {
///     fn policy(&self) -> Option<&dyn PolicyRequest> {
///         Some(self)
///     }
///
///     fn resource_slot(&mut self) -> Option<&mut dyn ResourceSlot> {
///         Some(&mut self.document)
///     }
/// }
/// ```
pub trait Request: Send + Sync + 'static {
    /// The policy-name capability, if this request carries one.
    fn policy(&self) -> Option<&dyn PolicyRequest> {
        None
    }

    /// The resource slot, if this request is resource-bearing.
    fn resource_slot(&mut self) -> Option<&mut dyn ResourceSlot> {
        None
    }
}

/// An authenticated user or service principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifier for this principal
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether the identity was verified by an authentication scheme
    pub authenticated: bool,
}

impl Principal {
    /// Creates an authenticated principal.
    pub fn authenticated(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            authenticated: true,
        }
    }

    /// Creates an anonymous, unauthenticated principal.
    pub fn anonymous() -> Self {
        Self {
            id: String::new(),
            name: "anonymous".to_string(),
            authenticated: false,
        }
    }

    /// Returns `true` if this identity is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

/// Supplies the principal of the current invocation.
///
/// The gate reads it at most once per invocation and only when the
/// request requires authentication.
pub trait PrincipalSupplier: Send + Sync {
    /// Returns the current principal, or `None` if there is none.
    fn principal(&self) -> Option<Principal>;

    /// Returns an identifier for log correlation, if known.
    fn request_id(&self) -> Option<&str> {
        None
    }
}

impl<F> PrincipalSupplier for F
where
    F: Fn() -> Option<Principal> + Send + Sync,
{
    fn principal(&self) -> Option<Principal> {
        self()
    }
}

/// Metadata about an incoming request or operation.
///
/// Contains the request identifier and optional principal. This is the
/// default [`PrincipalSupplier`] for callers that already hold both.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Unique identifier for this request
    pub request_id: String,
    /// Principal, if any
    pub principal: Option<Principal>,
}

impl RequestMeta {
    /// Creates metadata for an anonymous invocation.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            principal: None,
        }
    }

    /// Attaches a principal.
    #[must_use]
    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }
}

impl PrincipalSupplier for RequestMeta {
    fn principal(&self) -> Option<Principal> {
        self.principal.clone()
    }

    fn request_id(&self) -> Option<&str> {
        Some(&self.request_id)
    }
}
