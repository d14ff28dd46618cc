//! End-to-end agreement lifecycle tests against a real RocksDB instance

use agreements::{
    AgreementStatus, Bid, BidStatus, Config, DomainEvent, EscrowStatus, Marketplace, Project,
    ProjectStatus, TermsUpdate,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use uuid::Uuid;

fn marketplace() -> (Marketplace, TempDir) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.ledger.data_dir = dir.path().to_path_buf();
    (Marketplace::open(config).unwrap(), dir)
}

struct Parties {
    client: Uuid,
    freelancer: Uuid,
    project_id: Uuid,
    bid_id: Uuid,
}

/// Seed a project with one bid and a funded client wallet
fn seed(mp: &Marketplace, deposit: Decimal, bid_amount: Decimal) -> Parties {
    let client = Uuid::new_v4();
    let freelancer = Uuid::new_v4();
    let project_id = Uuid::new_v4();
    let bid_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    mp.upsert_project(Project {
        project_id,
        client_id: client,
        title: "Website redesign".to_string(),
        description: "Rework the marketing site".to_string(),
        status: ProjectStatus::Open,
        created_at: now,
        updated_at: now,
    })
    .unwrap();
    mp.upsert_bid(Bid {
        bid_id,
        project_id,
        freelancer_id: freelancer,
        amount: bid_amount,
        status: BidStatus::Submitted,
        created_at: now,
    })
    .unwrap();
    mp.record_deposit(client, deposit, "pay_seed_1").unwrap();

    Parties {
        client,
        freelancer,
        project_id,
        bid_id,
    }
}

/// Drive an agreement from draft through both signatures
fn sign_through(mp: &Marketplace, p: &Parties) -> agreements::Agreement {
    let agreement = mp
        .create_agreement(p.client, p.project_id, p.bid_id)
        .unwrap();
    mp.send_for_signing(p.client, agreement.agreement_id).unwrap();
    mp.sign_as_freelancer(p.freelancer, agreement.agreement_id, "10.0.0.2", "cli/1.0")
        .unwrap();
    mp.sign_as_client(p.client, agreement.agreement_id, "10.0.0.1", "cli/1.0")
        .unwrap()
}

#[test]
fn full_happy_path_releases_escrow_to_freelancer() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(1000), dec!(500));

    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    let agreement = sign_through(&mp, &p);
    assert_eq!(agreement.status, AgreementStatus::Active);
    assert!(agreement.is_fully_signed());
    assert_eq!(agreement.platform_fee, dec!(50));
    assert_eq!(agreement.total_amount, dec!(550));

    let escrow = mp.escrow(p.project_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Funded);
    assert_eq!(escrow.agreement_id, Some(agreement.agreement_id));
    assert!(mp.engagement(p.project_id).unwrap().is_some());

    let completed = mp.complete_and_release(p.client, p.project_id).unwrap();
    assert_eq!(completed.status, AgreementStatus::Completed);

    let client_wallet = mp.wallet(p.client).unwrap().unwrap();
    assert_eq!(client_wallet.balance, dec!(500));
    assert_eq!(client_wallet.escrow_balance, dec!(0));
    let freelancer_wallet = mp.wallet(p.freelancer).unwrap().unwrap();
    assert_eq!(freelancer_wallet.balance, dec!(500));

    assert_eq!(mp.escrow(p.project_id).unwrap().status, EscrowStatus::Released);
    assert!(mp.engagement(p.project_id).unwrap().is_none());

    // Accepting twice must not pay twice
    let err = mp.complete_and_release(p.client, p.project_id).unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(500)
    );
}

#[test]
fn overfunded_escrow_refunds_excess_at_signing() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(600), dec!(500));

    mp.fund_escrow(p.client, p.project_id, dec!(600)).unwrap();
    assert_eq!(mp.wallet(p.client).unwrap().unwrap().balance, dec!(0));

    sign_through(&mp, &p);

    let escrow = mp.escrow(p.project_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::PartialRefund);
    assert_eq!(escrow.amount, dec!(500));
    assert_eq!(escrow.adjusted_amount, Some(dec!(500)));
    assert_eq!(escrow.adjustment_history.len(), 1);
    assert_eq!(escrow.adjustment_history[0].refund_amount, dec!(100));

    let wallet = mp.wallet(p.client).unwrap().unwrap();
    assert_eq!(wallet.balance, dec!(100));
    assert_eq!(wallet.escrow_balance, dec!(500));
}

#[test]
fn underfunded_escrow_flags_without_topping_up() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(400), dec!(500));

    mp.fund_escrow(p.client, p.project_id, dec!(400)).unwrap();
    sign_through(&mp, &p);

    let escrow = mp.escrow(p.project_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::Adjusted);
    assert_eq!(escrow.amount, dec!(400));
    // No funds moved at reconciliation
    assert_eq!(mp.wallet(p.client).unwrap().unwrap().escrow_balance, dec!(400));

    // An underfunded escrow is not releasable until manually resolved
    let err = mp.complete_and_release(p.client, p.project_id).unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn signing_order_is_freelancer_first() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();

    let agreement = mp
        .create_agreement(p.client, p.project_id, p.bid_id)
        .unwrap();
    mp.send_for_signing(p.client, agreement.agreement_id).unwrap();

    let err = mp
        .sign_as_client(p.client, agreement.agreement_id, "10.0.0.1", "cli/1.0")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));

    let stored = mp.agreement(agreement.agreement_id).unwrap();
    assert!(stored.freelancer_signature.is_none());
    assert!(stored.client_signature.is_none());
    assert_eq!(stored.status, AgreementStatus::PendingFreelancer);
}

#[test]
fn only_named_parties_may_act() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    let stranger = Uuid::new_v4();

    let err = mp.fund_escrow(stranger, p.project_id, dec!(500)).unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();

    let err = mp
        .create_agreement(p.freelancer, p.project_id, p.bid_id)
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));

    let agreement = mp
        .create_agreement(p.client, p.project_id, p.bid_id)
        .unwrap();
    mp.send_for_signing(p.client, agreement.agreement_id).unwrap();
    let err = mp
        .sign_as_freelancer(stranger, agreement.agreement_id, "10.0.0.9", "cli/1.0")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn second_agreement_for_project_is_rejected() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    sign_through(&mp, &p);

    let other_bid = Uuid::new_v4();
    mp.upsert_bid(Bid {
        bid_id: other_bid,
        project_id: p.project_id,
        freelancer_id: Uuid::new_v4(),
        amount: dec!(300),
        status: BidStatus::Submitted,
        created_at: chrono::Utc::now(),
    })
    .unwrap();

    let err = mp
        .create_agreement(p.client, p.project_id, other_bid)
        .unwrap_err();
    assert!(matches!(err, agreements::Error::DuplicateActiveAgreement(_)));
}

#[test]
fn update_terms_recomputes_totals_and_hash() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(900), dec!(500));

    let agreement = mp
        .create_agreement(p.client, p.project_id, p.bid_id)
        .unwrap();
    let original_hash = agreement.content_hash.clone();
    assert!(mp.verify_integrity(agreement.agreement_id).unwrap());

    let updated = mp
        .update_terms(
            p.client,
            agreement.agreement_id,
            TermsUpdate {
                agreed_amount: Some(dec!(800)),
                terms: Some("Net 14 payment".to_string()),
                ..TermsUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.agreed_amount, dec!(800));
    assert_eq!(updated.platform_fee, dec!(80));
    assert_eq!(updated.total_amount, dec!(880));
    assert_ne!(updated.content_hash, original_hash);
    assert!(mp.verify_integrity(agreement.agreement_id).unwrap());

    // Terms freeze once signing starts
    mp.send_for_signing(p.client, agreement.agreement_id).unwrap();
    let err = mp
        .update_terms(p.client, agreement.agreement_id, TermsUpdate::default())
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn amendment_supersedes_and_cancel_restores_parent() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    let parent = sign_through(&mp, &p);

    let child = mp
        .create_amendment(p.client, parent.agreement_id, dec!(700), "Scope grew")
        .unwrap();
    assert_eq!(child.version, 2);
    assert_eq!(child.status, AgreementStatus::Draft);
    assert_eq!(child.parent_agreement_id, Some(parent.agreement_id));
    assert!(child.freelancer_signature.is_none());
    assert!(child.client_signature.is_none());
    assert_eq!(child.amendment_history.len(), 1);
    assert_eq!(child.amendment_history[0].previous_amount, dec!(500));
    assert_eq!(child.amendment_history[0].new_amount, dec!(700));

    assert_eq!(
        mp.agreement(parent.agreement_id).unwrap().status,
        AgreementStatus::Amended
    );

    // While superseded, a completion attempt has no active agreement
    let err = mp.complete_and_release(p.client, p.project_id).unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));

    // Cancelling the draft amendment restores the parent
    let cancelled = mp
        .cancel_with_rollback(p.freelancer, child.agreement_id, "Changed my mind")
        .unwrap();
    assert_eq!(cancelled.status, AgreementStatus::Cancelled);
    assert!(cancelled.cancellation.is_some());

    let restored = mp.agreement(parent.agreement_id).unwrap();
    assert_eq!(restored.status, AgreementStatus::Active);

    // Work closes out under the original terms
    mp.complete_and_release(p.client, p.project_id).unwrap();
    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(500)
    );
}

#[test]
fn cancel_rollback_yields_when_another_agreement_went_active() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(1000), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    let parent = sign_through(&mp, &p);

    let child = mp
        .create_amendment(p.client, parent.agreement_id, dec!(700), "Scope grew")
        .unwrap();

    // With the project up for grabs, a rival agreement is signed through
    let rival_freelancer = Uuid::new_v4();
    let rival_bid = Uuid::new_v4();
    mp.upsert_bid(Bid {
        bid_id: rival_bid,
        project_id: p.project_id,
        freelancer_id: rival_freelancer,
        amount: dec!(400),
        status: BidStatus::Submitted,
        created_at: chrono::Utc::now(),
    })
    .unwrap();
    let rival = mp
        .create_agreement(p.client, p.project_id, rival_bid)
        .unwrap();
    mp.send_for_signing(p.client, rival.agreement_id).unwrap();
    mp.sign_as_freelancer(rival_freelancer, rival.agreement_id, "10.0.0.3", "cli/1.0")
        .unwrap();
    mp.sign_as_client(p.client, rival.agreement_id, "10.0.0.1", "cli/1.0")
        .unwrap();

    // Cancelling the stale amendment draft must not resurrect the parent
    // alongside the rival
    mp.cancel_with_rollback(p.freelancer, child.agreement_id, "Stale")
        .unwrap();
    assert_eq!(
        mp.agreement(parent.agreement_id).unwrap().status,
        AgreementStatus::Amended
    );
    assert_eq!(
        mp.engagement(p.project_id).unwrap().unwrap().agreement_id,
        rival.agreement_id
    );

    // Completion settles under the rival's terms
    let completed = mp.complete_and_release(p.client, p.project_id).unwrap();
    assert_eq!(completed.agreement_id, rival.agreement_id);
    assert_eq!(
        mp.wallet(rival_freelancer).unwrap().unwrap().balance,
        dec!(400)
    );
    assert!(mp.wallet(p.freelancer).unwrap().is_none());
}

#[test]
fn tampered_terms_fail_integrity_and_signing() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    let agreement = mp
        .create_agreement(p.client, p.project_id, p.bid_id)
        .unwrap();
    mp.send_for_signing(p.client, agreement.agreement_id).unwrap();

    // Out-of-band edit to a hashed field, bypassing the workflow
    let mut doctored = mp.agreement(agreement.agreement_id).unwrap();
    doctored.agreed_amount = dec!(1);
    let mut txn = mp.storage().begin();
    agreements::store::put_agreement(&mut txn, &doctored).unwrap();
    txn.commit().unwrap();

    assert!(!mp.verify_integrity(agreement.agreement_id).unwrap());

    let err = mp
        .sign_as_freelancer(p.freelancer, agreement.agreement_id, "10.0.0.2", "cli/1.0")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::IntegrityMismatch(_)));
    let stored = mp.agreement(agreement.agreement_id).unwrap();
    assert!(stored.freelancer_signature.is_none());
    assert_eq!(stored.status, AgreementStatus::PendingFreelancer);
}

#[test]
fn cancelling_an_active_agreement_is_rejected() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    let agreement = sign_through(&mp, &p);

    let err = mp
        .cancel_with_rollback(p.client, agreement.agreement_id, "Too late")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn all_versions_listed_for_project() {
    let (mp, _dir) = marketplace();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    let parent = sign_through(&mp, &p);
    mp.create_amendment(p.client, parent.agreement_id, dec!(700), "Scope grew")
        .unwrap();

    let versions = mp.agreements_for_project(p.project_id).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].version, 1);
    assert_eq!(versions[1].version, 2);
}

#[test]
fn lifecycle_events_are_published() {
    let (mp, _dir) = marketplace();
    let mut rx = mp.events().subscribe();
    let p = seed(&mp, dec!(500), dec!(500));
    mp.fund_escrow(p.client, p.project_id, dec!(500)).unwrap();
    sign_through(&mp, &p);

    let mut seen = vec![];
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    assert!(seen
        .iter()
        .any(|e| matches!(e, DomainEvent::DepositCredited { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, DomainEvent::EscrowFunded { .. })));
    assert!(seen
        .iter()
        .any(|e| matches!(e, DomainEvent::AgreementActivated { .. })));
}

#[test]
fn withdrawal_roundtrip_through_marketplace() {
    let (mp, _dir) = marketplace();
    let user = Uuid::new_v4();
    mp.record_deposit(user, dec!(250), "pay_w_1").unwrap();

    let (wallet, row) = mp.request_withdrawal(user, dec!(100), "payout_1").unwrap();
    assert_eq!(wallet.balance, dec!(150));

    mp.complete_withdrawal(row.transaction_id).unwrap();
    let history = mp.transactions(user, 0, 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].amount, dec!(-100));
}
