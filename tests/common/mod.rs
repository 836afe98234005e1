//! Shared fixtures: a small document domain and counting fakes.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use request_authz::{
    AuthorizationOutcome, AuthorizationProvider, BoxError, PolicyRequest, Principal,
    PrincipalSupplier, Request, Resource, ResourceResolver, ResourceSlot, Slot,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: u64,
    pub owner: String,
}

/// Resource-bearing command with no policy capability of its own.
#[derive(Debug, Default)]
pub struct UpdateDocument {
    pub id: u64,
    pub document: Slot<Document>,
}

impl UpdateDocument {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            document: Slot::empty(),
        }
    }
}

impl Request for UpdateDocument {
    fn resource_slot(&mut self) -> Option<&mut dyn ResourceSlot> {
        Some(&mut self.document)
    }
}

/// Command naming its policy at runtime and carrying a document slot.
#[derive(Debug, Default)]
pub struct DynamicCommand {
    pub id: u64,
    pub policy: String,
    pub document: Slot<Document>,
}

impl DynamicCommand {
    pub fn new(id: u64, policy: &str) -> Self {
        Self {
            id,
            policy: policy.to_string(),
            document: Slot::empty(),
        }
    }
}

impl PolicyRequest for DynamicCommand {
    fn policy_name(&self) -> Option<&str> {
        Some(&self.policy)
    }
}

impl Request for DynamicCommand {
    fn policy(&self) -> Option<&dyn PolicyRequest> {
        Some(self)
    }

    fn resource_slot(&mut self) -> Option<&mut dyn ResourceSlot> {
        Some(&mut self.document)
    }
}

/// Query with a policy but no resource slot.
#[derive(Debug, Default)]
pub struct ListDocuments;

impl Request for ListDocuments {}

/// Resolver returning a document owned by `owner` for the requested id.
pub struct DocumentStore {
    pub owner: String,
    pub calls: AtomicUsize,
}

impl DocumentStore {
    pub fn owned_by(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceResolver<UpdateDocument> for DocumentStore {
    type Resource = Document;

    async fn resolve(
        &self,
        request: &UpdateDocument,
        _cancel: &CancellationToken,
    ) -> Result<Option<Document>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Document {
            id: request.id,
            owner: self.owner.clone(),
        }))
    }
}

#[async_trait]
impl ResourceResolver<DynamicCommand> for DocumentStore {
    type Resource = Document;

    async fn resolve(
        &self,
        request: &DynamicCommand,
        _cancel: &CancellationToken,
    ) -> Result<Option<Document>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Document {
            id: request.id,
            owner: self.owner.clone(),
        }))
    }
}

/// Shares a [`DocumentStore`] so tests can keep a handle on its counters.
#[derive(Clone)]
pub struct SharedStore(pub Arc<DocumentStore>);

#[async_trait]
impl ResourceResolver<UpdateDocument> for SharedStore {
    type Resource = Document;

    async fn resolve(
        &self,
        request: &UpdateDocument,
        cancel: &CancellationToken,
    ) -> Result<Option<Document>, BoxError> {
        ResourceResolver::<UpdateDocument>::resolve(self.0.as_ref(), request, cancel).await
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub principal: String,
    pub policy: String,
    pub resource: Option<Resource>,
}

/// Provider that records every call and answers with a fixed outcome.
pub struct RecordingProvider {
    outcome: AuthorizationOutcome,
    calls: Mutex<Vec<Evaluation>>,
}

impl RecordingProvider {
    pub fn allowing() -> Arc<Self> {
        Arc::new(Self {
            outcome: AuthorizationOutcome::success(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn denying(reasons: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outcome: AuthorizationOutcome::failure(reasons.iter().copied()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Evaluation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthorizationProvider for RecordingProvider {
    async fn evaluate(
        &self,
        principal: &Principal,
        policy: &str,
        resource: Option<&Resource>,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome, BoxError> {
        self.calls.lock().unwrap().push(Evaluation {
            principal: principal.id.clone(),
            policy: policy.to_string(),
            resource: resource.cloned(),
        });
        Ok(self.outcome.clone())
    }
}

/// Provider that denies unless the resource is a document owned by the principal.
pub struct OwnershipProvider;

#[async_trait]
impl AuthorizationProvider for OwnershipProvider {
    async fn evaluate(
        &self,
        principal: &Principal,
        _policy: &str,
        resource: Option<&Resource>,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome, BoxError> {
        match resource.and_then(|r| r.downcast_ref::<Document>()) {
            Some(doc) if doc.owner == principal.id => Ok(AuthorizationOutcome::success()),
            Some(_) => Ok(AuthorizationOutcome::failure(["not owner"])),
            None => Ok(AuthorizationOutcome::failure(["no document"])),
        }
    }
}

/// Principal supplier that counts how often each of its methods is called.
pub struct CountingPrincipals {
    principal: Option<Principal>,
    principal_calls: AtomicUsize,
    request_id_calls: AtomicUsize,
}

impl CountingPrincipals {
    pub fn authenticated(id: &str) -> Self {
        Self::of(Some(Principal::authenticated(id, id)))
    }

    pub fn anonymous() -> Self {
        Self::of(Some(Principal::anonymous()))
    }

    pub fn absent() -> Self {
        Self::of(None)
    }

    fn of(principal: Option<Principal>) -> Self {
        Self {
            principal,
            principal_calls: AtomicUsize::new(0),
            request_id_calls: AtomicUsize::new(0),
        }
    }

    /// Calls to `principal()`.
    pub fn principal_calls(&self) -> usize {
        self.principal_calls.load(Ordering::SeqCst)
    }

    /// Calls to any supplier method.
    pub fn calls(&self) -> usize {
        self.principal_calls() + self.request_id_calls.load(Ordering::SeqCst)
    }
}

impl PrincipalSupplier for CountingPrincipals {
    fn principal(&self) -> Option<Principal> {
        self.principal_calls.fetch_add(1, Ordering::SeqCst);
        self.principal.clone()
    }

    fn request_id(&self) -> Option<&str> {
        self.request_id_calls.fetch_add(1, Ordering::SeqCst);
        Some("req-test")
    }
}

/// Provider that always fails with an evaluator error.
pub struct FailingProvider;

#[async_trait]
impl AuthorizationProvider for FailingProvider {
    async fn evaluate(
        &self,
        _principal: &Principal,
        _policy: &str,
        _resource: Option<&Resource>,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome, BoxError> {
        Err("policy engine down".into())
    }
}

/// Provider that signals `started` and then never answers.
#[derive(Default)]
pub struct StalledProvider {
    pub started: Arc<Notify>,
    calls: AtomicUsize,
}

impl StalledProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationProvider for StalledProvider {
    async fn evaluate(
        &self,
        _principal: &Principal,
        _policy: &str,
        _resource: Option<&Resource>,
        _cancel: &CancellationToken,
    ) -> Result<AuthorizationOutcome, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        std::future::pending().await
    }
}
