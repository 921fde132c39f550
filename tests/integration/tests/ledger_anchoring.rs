//! Integration test: sequence allocation and ledger anchoring under
//! concurrency, restarts and ledger faults.

use std::collections::HashSet;
use std::sync::Arc;

use vcanchor_credentials::{LedgerCheck, MemoryCounterStore};
use vcanchor_integration_tests::{Harness, ISSUER_SEED};
use vcanchor_ledger::{PropertyKey, Registration};

#[tokio::test]
async fn test_concurrent_issuances_get_distinct_gap_free_ids() {
    let h = Harness::new();
    h.set_balance("1");
    let issuer = h.issuer();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let service = issuer.service.clone();
        let req = h.request().await;
        handles.push(tokio::spawn(async move { service.issue(req).await }));
    }

    let mut ids = HashSet::new();
    let mut credentials = Vec::new();
    for handle in handles {
        let credential = handle.await.unwrap().unwrap();
        assert!(ids.insert(credential.sequence_id().unwrap()));
        credentials.push(credential);
    }
    assert_eq!(ids, (1..=32).collect::<HashSet<u64>>());

    // One registration no matter how many issuances raced for it.
    assert_eq!(h.ledger.submission_count("setProperties"), 1);
    assert_eq!(h.ledger.submission_count("setVCProperty"), 32);

    let verifier = h.verifier();
    for credential in &credentials {
        let verdict = verifier.verify(&credential.to_value().unwrap()).await;
        assert!(verdict.is_corroborated());
    }
}

#[tokio::test]
async fn test_reregistration_is_idempotent_across_processes() {
    let h = Harness::new();
    let first = h.issuer();
    let second = h.issuer();
    let keys = [PropertyKey::signature()];

    assert!(matches!(
        first.anchor.register_properties(&keys).await.unwrap(),
        Registration::Registered { .. }
    ));
    assert_eq!(
        second.anchor.register_properties(&keys).await.unwrap(),
        Registration::AlreadyRegistered
    );
    assert_eq!(
        first.anchor.register_properties(&keys).await.unwrap(),
        Registration::AlreadyRegistered
    );

    assert_eq!(h.ledger.registered_properties().await, keys.to_vec());
    assert_eq!(h.ledger.submission_count("setProperties"), 1);
}

#[tokio::test]
async fn test_registration_keeps_existing_properties() {
    let h = Harness::new();
    let issuer = h.issuer();
    let extra = PropertyKey::from_name("revocation").unwrap();

    issuer.anchor.register_properties(&[extra]).await.unwrap();
    issuer
        .anchor
        .register_properties(&[PropertyKey::signature()])
        .await
        .unwrap();

    assert_eq!(
        h.ledger.registered_properties().await,
        vec![extra, PropertyKey::signature()]
    );
}

#[tokio::test]
async fn test_restart_continues_sequence() {
    let h = Harness::new();
    h.set_balance("1");

    // The previous run allocated up to 41.
    let issuer = h.issuer_with(ISSUER_SEED, Arc::new(MemoryCounterStore::starting_at(41)));
    let credential = issuer.service.issue(h.request().await).await.unwrap();
    assert_eq!(credential.sequence_id(), Some(42));
}

#[tokio::test]
async fn test_tampered_record_is_a_ledger_mismatch() {
    let h = Harness::new();
    h.set_balance("1");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();

    h.ledger
        .tamper_record(1, PropertyKey::signature(), b"0xdeadbeef");
    let verdict = h.verifier().verify(&credential.to_value().unwrap()).await;
    assert!(verdict.crypto_valid);
    assert!(matches!(verdict.ledger, LedgerCheck::Invalid(_)));
    assert!(!verdict.is_corroborated());
}

#[tokio::test]
async fn test_unreadable_ledger_is_unavailable_not_invalid() {
    let h = Harness::new();
    h.set_balance("1");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();

    h.ledger.set_reads_unavailable(true);
    let verdict = h.verifier().verify(&credential.to_value().unwrap()).await;
    assert!(verdict.crypto_valid);
    assert!(matches!(verdict.ledger, LedgerCheck::Unavailable(_)));
}

#[tokio::test]
async fn test_distinct_issuers_have_distinct_dids() {
    let h = Harness::new();
    h.set_balance("1");
    let a = h.issuer();
    let b = h.issuer_with(
        "0x0000000000000000000000000000000000000000000000000000000000000001",
        Arc::new(MemoryCounterStore::new()),
    );

    let ca = a.service.issue(h.request().await).await.unwrap();
    let cb = b.service.issue(h.request().await).await.unwrap();
    assert_ne!(ca.issuer(), cb.issuer());
    // Both processes wrote sequence id 1; the second write wins on the ledger.
    let verdict = h.verifier().verify(&cb.to_value().unwrap()).await;
    assert!(verdict.is_corroborated());
}
