//! Integration test: issue → anchor → verify across crates.

use serde_json::{json, Value};

use vcanchor_credentials::{CredentialVerifier, IssuanceError, LedgerCheck};
use vcanchor_integration_tests::{Harness, SUBJECT};
use vcanchor_ledger::PropertyKey;

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_issue_anchor_verify() {
    let h = Harness::new();
    h.set_balance("0.5");
    let issuer = h.issuer();

    let credential = issuer.service.issue(h.request().await).await.unwrap();
    assert_eq!(credential.sequence_id(), Some(1));
    assert!(credential.payload.assertion.result);
    assert!(credential.issuer().starts_with("did:vcanchor:0x"));
    assert!(credential.subject().ends_with(SUBJECT));

    let verdict = h.verifier().verify(&credential.to_value().unwrap()).await;
    assert!(verdict.crypto_valid, "{:?}", verdict.crypto_failure);
    assert_eq!(verdict.ledger, LedgerCheck::Valid);
    assert_eq!(verdict.sequence_id, Some(1));
}

#[tokio::test]
async fn test_verify_from_json_text() {
    let h = Harness::new();
    h.set_balance("2");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();

    let text = serde_json::to_string_pretty(&credential).unwrap();
    let verdict = h.verifier().verify_json(&text).await;
    assert!(verdict.is_corroborated());
}

#[tokio::test]
async fn test_anchored_record_contains_proof_value() {
    let h = Harness::new();
    h.set_balance("1");
    let issuer = h.issuer();
    let credential = issuer.service.issue(h.request().await).await.unwrap();

    let record = issuer.anchor.read_record(1).await.unwrap();
    assert!(record.contains(&credential.proof.proof_value));

    let raw = issuer
        .anchor
        .read_property(1, PropertyKey::signature())
        .await
        .unwrap();
    assert_eq!(raw, credential.proof.proof_value.as_bytes());
}

#[tokio::test]
async fn test_predicate_boundaries() {
    let h = Harness::new();
    let issuer = h.issuer();

    h.set_balance("0.05");
    let below = issuer.service.issue(h.request().await).await.unwrap();
    assert!(!below.payload.assertion.result);

    h.set_balance("0.1");
    let equal = issuer.service.issue(h.request().await).await.unwrap();
    assert!(!equal.payload.assertion.result);

    let mut req = h.request().await;
    req.operator = Some(">=".into());
    let equal_inclusive = issuer.service.issue(req).await.unwrap();
    assert!(equal_inclusive.payload.assertion.result);

    // A false result is still a signed, anchored statement.
    let verdict = h.verifier().verify(&below.to_value().unwrap()).await;
    assert!(verdict.is_corroborated());
}

// =========================================================================
// Tampering
// =========================================================================

#[tokio::test]
async fn test_tampering_breaks_signature_but_not_ledger() {
    let h = Harness::new();
    h.set_balance("1");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();
    let original = credential.to_value().unwrap();
    let verifier = h.verifier();

    let edits: Vec<(&str, Box<dyn Fn(&mut Value)>)> = vec![
        ("subject", Box::new(|v: &mut Value| v["credentialSubject"]["id"] = json!("did:pubkey:0xbeef"))),
        ("result", Box::new(|v: &mut Value| v["assertion"]["result"] = json!(false))),
        ("threshold", Box::new(|v: &mut Value| v["assertion"]["threshold"] = json!("0.0"))),
        ("claim", Box::new(|v: &mut Value| v["assertion"]["claim"] = json!("somethingElse"))),
        ("issuanceDate", Box::new(|v: &mut Value| v["issuanceDate"] = json!("2020-01-01T00:00:00.000Z"))),
        ("extra member", Box::new(|v: &mut Value| v["note"] = json!("added"))),
    ];

    for (what, edit) in edits {
        let mut tampered = original.clone();
        edit(&mut tampered);
        let verdict = verifier.verify(&tampered).await;
        assert!(!verdict.crypto_valid, "tampered {} still verified", what);
        // Same sequence ID and proof value, so the ledger still matches.
        assert_eq!(verdict.ledger, LedgerCheck::Valid, "{}", what);
    }
}

#[tokio::test]
async fn test_moved_sequence_id_fails_both_signals() {
    let h = Harness::new();
    h.set_balance("1");
    let issuer = h.issuer();
    let first = issuer.service.issue(h.request().await).await.unwrap();
    issuer.service.issue(h.request().await).await.unwrap();

    let mut tampered = first.to_value().unwrap();
    tampered["sequenceId"] = json!(2);
    let verdict = h.verifier().verify(&tampered).await;
    assert!(!verdict.crypto_valid);
    assert!(matches!(verdict.ledger, LedgerCheck::Invalid(_)));
}

#[tokio::test]
async fn test_malformed_issuer_is_reported() {
    let h = Harness::new();
    h.set_balance("1");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();

    for issuer in ["did:vcanchor", "did:vcanchor:0xab:extra", "not-a-did"] {
        let mut tampered = credential.to_value().unwrap();
        tampered["issuer"] = json!(issuer);
        let verdict = h.verifier().verify(&tampered).await;
        assert!(!verdict.crypto_valid);
        assert!(verdict
            .checks
            .iter()
            .any(|c| c.name == "issuer_did" && !c.passed));
    }
}

#[tokio::test]
async fn test_verifier_without_ledger_still_checks_signature() {
    let h = Harness::new();
    h.set_balance("1");
    let credential = h.issuer().service.issue(h.request().await).await.unwrap();

    let verdict = CredentialVerifier::new()
        .verify(&credential.to_value().unwrap())
        .await;
    assert!(verdict.crypto_valid);
    assert!(matches!(verdict.ledger, LedgerCheck::Unavailable(_)));
}

// =========================================================================
// Rejections
// =========================================================================

#[tokio::test]
async fn test_attestation_for_other_subject_rejected() {
    let h = Harness::new();
    h.set_balance("1");
    let issuer = h.issuer();

    let mut req = h.request_for("someone-else").await;
    req.subject_identifier = SUBJECT.into();
    assert!(matches!(
        issuer.service.issue(req).await,
        Err(IssuanceError::Authentication(_))
    ));
    assert_eq!(issuer.service.sequence().current().unwrap(), None);
    assert_eq!(h.ledger.submission_count("setVCProperty"), 0);
}

#[tokio::test]
async fn test_ledger_outage_returns_no_credential() {
    let h = Harness::new();
    h.set_balance("1");
    let issuer = h.issuer();
    h.ledger.set_stalled(true);

    assert!(matches!(
        issuer.service.issue(h.request().await).await,
        Err(IssuanceError::Ledger(_))
    ));
}
