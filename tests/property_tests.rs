//! Property tests for classification and gate decisions.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{
    CountingPrincipals, DocumentStore, DynamicCommand, RecordingProvider, SharedStore,
    UpdateDocument,
};
use proptest::prelude::*;
use request_authz::{
    classify, AuthorizationRequirement, Authorized, Declaration, Error, PolicyGate,
    RequestCatalog, RequirementSource, ResolverRegistry,
};
use tokio_util::sync::CancellationToken;

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(fut)
}

fn marker_catalog(policy: &str) -> RequestCatalog {
    RequestCatalog::builder()
        .declare(
            Declaration::<DynamicCommand>::new()
                .require(Authorized::policy(policy).unwrap())
                .unwrap(),
        )
        .unwrap()
        .build()
}

proptest! {
    #[test]
    fn policy_name_implies_authentication(name in ".*") {
        let requirement = AuthorizationRequirement::policy(name.clone());
        prop_assert!(requirement.requires_authentication());
        if name.trim().is_empty() {
            prop_assert_eq!(requirement.policy_name(), None);
        } else {
            prop_assert_eq!(requirement.policy_name(), Some(name.as_str()));
        }
    }

    #[test]
    fn blank_runtime_policy_means_authentication_only(blank in "[ \t\n]{0,8}") {
        let command = DynamicCommand::new(1, &blank);
        let classification = classify(None, &command);

        prop_assert_eq!(classification.source(), RequirementSource::PolicyCapability);
        prop_assert_eq!(
            classification.requirement(),
            &AuthorizationRequirement::authentication_only()
        );
    }

    #[test]
    fn marker_wins_over_runtime_policy(
        marker in "[a-z]{1,8}\\.[a-z]{1,8}",
        runtime in "[a-z.]{0,12}",
    ) {
        let catalog = marker_catalog(&marker);
        let command = DynamicCommand::new(1, &runtime);
        let classification = classify(catalog.descriptor_of::<DynamicCommand>(), &command);

        prop_assert_eq!(classification.source(), RequirementSource::AuthorizedMarker);
        prop_assert_eq!(classification.requirement().policy_name(), Some(marker.as_str()));
    }

    #[test]
    fn denied_requests_never_reach_the_handler(
        reasons in prop::collection::vec("[a-z ]{1,16}", 0..4),
    ) {
        let reason_refs: Vec<&str> = reasons.iter().map(String::as_str).collect();
        let gate = PolicyGate::builder(RecordingProvider::denying(&reason_refs))
            .catalog(marker_catalog("documents.update"))
            .build();
        let cancel = CancellationToken::new();
        let principals = CountingPrincipals::authenticated("alice");
        let forwarded = AtomicUsize::new(0);

        let result = block_on(gate.handle(
            DynamicCommand::new(1, ""),
            &principals,
            &cancel,
            |_req| async {
                forwarded.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(())
            },
        ));

        prop_assert_eq!(forwarded.load(Ordering::SeqCst), 0);
        let err = result.unwrap_err();
        let violation = err.violation().unwrap();
        prop_assert_eq!(violation.requirement.as_str(), "documents.update");
        prop_assert!(!violation.errors.is_empty());
        if !reasons.is_empty() {
            prop_assert_eq!(&violation.errors, &reasons);
        }
    }

    #[test]
    fn identical_requests_get_identical_decisions(id in any::<u64>(), owner in "[a-z]{1,6}") {
        let store = Arc::new(DocumentStore::owned_by(&owner));
        let mut registry = ResolverRegistry::builder();
        registry.try_add::<UpdateDocument, _>(SharedStore(Arc::clone(&store)));
        let catalog = RequestCatalog::builder()
            .declare(
                Declaration::<UpdateDocument>::new()
                    .require(Authorized::policy("documents.update").unwrap())
                    .unwrap(),
            )
            .unwrap()
            .build();
        let provider = RecordingProvider::allowing();
        let gate = PolicyGate::builder(provider.clone())
            .catalog(catalog)
            .registry(registry.build())
            .build();
        let cancel = CancellationToken::new();
        let principals = CountingPrincipals::authenticated("alice");

        let first = block_on(gate.authorize(&mut UpdateDocument::new(id), &principals, &cancel));
        let second = block_on(gate.authorize(&mut UpdateDocument::new(id), &principals, &cancel));

        prop_assert_eq!(first.unwrap(), second.unwrap());
        prop_assert_eq!(store.calls(), 2);
        let calls = provider.calls();
        prop_assert_eq!(calls.len(), 2);
        prop_assert_eq!(
            calls[0].resource.as_ref().and_then(|r| r.downcast_ref::<common::Document>()),
            calls[1].resource.as_ref().and_then(|r| r.downcast_ref::<common::Document>())
        );
    }
}
