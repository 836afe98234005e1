//! Authentication and resource-aware authorization for request pipelines.
//!
//! This crate provides the pipeline stage that sits in front of command and
//! query handlers and decides whether a request may proceed:
//! - **Classification**: declarative markers and capability interfaces are
//!   folded into one [`AuthorizationRequirement`] by a fixed precedence
//! - **Resource resolution**: when a policy is evaluated against a specific
//!   resource, the resource is taken from the request, a declared resolver,
//!   or the [`ResolverRegistry`], in that order
//! - **Enforcement**: [`PolicyGate`] checks authentication, calls the
//!   [`AuthorizationProvider`] and forwards the request only on success
//!
//! # Core Types
//!
//! - [`Request`]: a command or query, with optional [`PolicyRequest`] and
//!   [`ResourceSlot`] capabilities
//! - [`RequestCatalog`]: declarative markers ([`Authenticated`],
//!   [`Authorized`], resolver bindings) per request type
//! - [`ResourceResolver`]: produces the resource a request acts upon
//! - [`PolicyGate`]: the orchestrator
//! - [`Violation`]: the structured failure a presentation layer maps to a
//!   response
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use request_authz::{
//!     AuthorizationOutcome, AuthorizationProvider, Authorized, BoxError, Declaration, Error,
//!     PolicyGate, Principal, Request, RequestCatalog, RequestMeta, Resource, ResourceResolver,
//!     ResourceSlot, ResolverRegistry, Slot,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct Document {
//!     owner: String,
//! }
//!
//! struct UpdateDocument {
//!     id: u64,
//!     document: Slot<Document>,
//! }
//!
//! impl Request for UpdateDocument {
//!     fn resource_slot(&mut self) -> Option<&mut dyn ResourceSlot> {
//!         Some(&mut self.document)
//!     }
//! }
//!
//! struct DocumentStore;
//!
//! #[async_trait]
//! impl ResourceResolver<UpdateDocument> for DocumentStore {
//!     type Resource = Document;
//!
//!     async fn resolve(
//!         &self,
//!         _request: &UpdateDocument,
//!         _cancel: &CancellationToken,
//!     ) -> Result<Option<Document>, BoxError> {
//!         Ok(Some(Document { owner: "u1".into() }))
//!     }
//! }
//!
//! struct OwnerOnly;
//!
//! #[async_trait]
//! impl AuthorizationProvider for OwnerOnly {
//!     async fn evaluate(
//!         &self,
//!         principal: &Principal,
//!         _policy: &str,
//!         resource: Option<&Resource>,
//!         _cancel: &CancellationToken,
//!     ) -> Result<AuthorizationOutcome, BoxError> {
//!         let owner = resource
//!             .and_then(|r| r.downcast_ref::<Document>())
//!             .map(|d| d.owner.as_str());
//!         if owner == Some(principal.id.as_str()) {
//!             Ok(AuthorizationOutcome::success())
//!         } else {
//!             Ok(AuthorizationOutcome::failure(["not owner"]))
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Error> {
//! let catalog = RequestCatalog::builder()
//!     .declare(
//!         Declaration::<UpdateDocument>::new().require(Authorized::policy("documents.update")?)?,
//!     )?
//!     .build();
//! let mut registry = ResolverRegistry::builder();
//! registry.try_add::<UpdateDocument, _>(DocumentStore);
//!
//! let gate = PolicyGate::builder(Arc::new(OwnerOnly))
//!     .catalog(catalog)
//!     .registry(registry.build())
//!     .build();
//!
//! let cancel = CancellationToken::new();
//! let owner = RequestMeta::new("req-1").with_principal(Principal::authenticated("u1", "Alice"));
//! let request = UpdateDocument { id: 42, document: Slot::empty() };
//!
//! let updated = gate
//!     .handle(request, &owner, &cancel, |req| async move { Ok::<_, Error>(req.id) })
//!     .await?;
//! assert_eq!(updated, 42);
//!
//! let stranger = RequestMeta::new("req-2").with_principal(Principal::authenticated("u2", "Bob"));
//! let request = UpdateDocument { id: 42, document: Slot::empty() };
//! let err = gate
//!     .handle(request, &stranger, &cancel, |req| async move { Ok::<_, Error>(req.id) })
//!     .await
//!     .unwrap_err();
//! let violation = err.violation().expect("denied");
//! assert_eq!(violation.requirement.as_str(), "documents.update");
//! assert_eq!(violation.errors, vec!["not owner".to_string()]);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod capability;
mod catalog;
mod classifier;
mod error;
mod gate;
mod logging;
mod policy;
mod provider;
mod registry;
mod request;
mod resolution;
mod resolver;
mod services;

pub use capability::{PolicyRequest, Resource, ResourceSlot, Slot, TypeTag};
pub use catalog::{
    Declaration, DeclaredResolver, RequestCatalog, RequestCatalogBuilder, RequestDescriptor,
};
pub use classifier::{classify, precedence, Classification, RequirementSource};
pub use error::{
    BoxError, ConfigError, Error, FailedRequirement, Violation, DEFAULT_DENIAL_REASON,
    UNAUTHENTICATED_REASON,
};
pub use gate::{Decision, PolicyGate, PolicyGateBuilder};
pub use policy::{AuthMarker, Authenticated, AuthorizationRequirement, Authorized, PolicyName};
pub use provider::{AuthorizationOutcome, AuthorizationProvider};
pub use registry::{ResolverRegistry, ResolverRegistryBuilder};
pub use request::{Principal, PrincipalSupplier, Request, RequestMeta};
pub use resolution::{resolve_resource, Resolution, ResolutionStrategy};
pub use resolver::{FnResolver, ResolverRegistration, ResolverSet, ResourceResolver};
pub use services::ResolverServices;
