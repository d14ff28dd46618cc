//! Dispute settlement tests: each decision path and its money movement

use agreements::{
    AgreementStatus, Bid, BidStatus, Config, DisputeDecision, DisputeStatus, EscrowStatus,
    Marketplace, Project, ProjectStatus,
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
    admin: Uuid,
}

/// Set up a project with a fully signed agreement over the given amount
fn active_agreement(mp: &Marketplace, amount: Decimal) -> Parties {
    let client = Uuid::new_v4();
    let freelancer = Uuid::new_v4();
    let project_id = Uuid::new_v4();
    let bid_id = Uuid::new_v4();
    let now = chrono::Utc::now();

    mp.upsert_project(Project {
        project_id,
        client_id: client,
        title: "Logo design".to_string(),
        description: "Brand refresh".to_string(),
        status: ProjectStatus::Open,
        created_at: now,
        updated_at: now,
    })
    .unwrap();
    mp.upsert_bid(Bid {
        bid_id,
        project_id,
        freelancer_id: freelancer,
        amount,
        status: BidStatus::Submitted,
        created_at: now,
    })
    .unwrap();
    mp.record_deposit(client, amount, "pay_d_1").unwrap();
    mp.fund_escrow(client, project_id, amount).unwrap();

    let agreement = mp.create_agreement(client, project_id, bid_id).unwrap();
    mp.send_for_signing(client, agreement.agreement_id).unwrap();
    mp.sign_as_freelancer(freelancer, agreement.agreement_id, "10.0.0.2", "cli/1.0")
        .unwrap();
    mp.sign_as_client(client, agreement.agreement_id, "10.0.0.1", "cli/1.0")
        .unwrap();

    Parties {
        client,
        freelancer,
        project_id,
        admin: Uuid::new_v4(),
    }
}

#[test]
fn open_dispute_pauses_the_agreement() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));

    let dispute = mp
        .open_dispute(p.freelancer, p.project_id, "Client unresponsive")
        .unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);

    let agreement = mp.agreement(dispute.agreement_id).unwrap();
    assert_eq!(agreement.status, AgreementStatus::Disputed);

    // The paused agreement can neither complete nor be amended
    let err = mp.complete_and_release(p.client, p.project_id).unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
    let err = mp
        .create_amendment(p.client, dispute.agreement_id, dec!(700), "More scope")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn outsider_cannot_raise_a_dispute() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));

    let err = mp
        .open_dispute(Uuid::new_v4(), p.project_id, "Not my project")
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
}

#[test]
fn freelancer_favor_releases_the_award() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.freelancer, p.project_id, "Work delivered, no payment")
        .unwrap();

    let resolved = mp
        .resolve_dispute(
            p.admin,
            dispute.dispute_id,
            DisputeDecision::FreelancerFavor,
            dec!(500),
            dec!(0),
            "Delivery verified",
        )
        .unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(
        resolved.resolution.as_ref().unwrap().awarded_amount,
        dec!(500)
    );

    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(500)
    );
    assert_eq!(
        mp.wallet(p.client).unwrap().unwrap().escrow_balance,
        dec!(0)
    );
    assert_eq!(mp.escrow(p.project_id).unwrap().status, EscrowStatus::Released);
    assert_eq!(
        mp.agreement(dispute.agreement_id).unwrap().status,
        AgreementStatus::Completed
    );
    assert!(mp.engagement(p.project_id).unwrap().is_none());
}

#[test]
fn partial_freelancer_favor_award_must_be_a_split() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.freelancer, p.project_id, "Partial delivery")
        .unwrap();

    // A full-favor decision that strands part of the escrow is rejected
    let err = mp
        .resolve_dispute(
            p.admin,
            dispute.dispute_id,
            DisputeDecision::FreelancerFavor,
            dec!(300),
            dec!(0),
            "Most milestones shipped",
        )
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));

    // Nothing moved and the dispute is still open for the correct filing
    assert!(mp.wallet(p.freelancer).unwrap().is_none());
    assert_eq!(mp.escrow(p.project_id).unwrap().amount, dec!(500));
    assert_eq!(
        mp.dispute(dispute.dispute_id).unwrap().status,
        DisputeStatus::Open
    );

    mp.resolve_dispute(
        p.admin,
        dispute.dispute_id,
        DisputeDecision::Split,
        dec!(300),
        dec!(200),
        "Most milestones shipped",
    )
    .unwrap();
    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(300)
    );
}

#[test]
fn client_favor_records_without_moving_wallet_funds() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.client, p.project_id, "Nothing delivered")
        .unwrap();

    mp.resolve_dispute(
        p.admin,
        dispute.dispute_id,
        DisputeDecision::ClientFavor,
        dec!(0),
        dec!(500),
        "No delivery evidence",
    )
    .unwrap();

    // The refund runs through the gateway; the ledger is untouched
    assert!(mp.wallet(p.freelancer).unwrap().is_none());
    assert_eq!(mp.escrow(p.project_id).unwrap().status, EscrowStatus::Refunded);
    let agreement = mp.agreement(dispute.agreement_id).unwrap();
    assert_eq!(agreement.status, AgreementStatus::Cancelled);
    assert!(agreement.cancellation.is_some());
}

#[test]
fn split_decision_awards_part_of_the_escrow() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.client, p.project_id, "Partial delivery")
        .unwrap();

    mp.resolve_dispute(
        p.admin,
        dispute.dispute_id,
        DisputeDecision::Split,
        dec!(300),
        dec!(200),
        "Half the milestones shipped",
    )
    .unwrap();

    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(300)
    );
    let escrow = mp.escrow(p.project_id).unwrap();
    assert_eq!(escrow.status, EscrowStatus::PartialRefund);
    assert_eq!(escrow.amount, dec!(200));
    assert_eq!(escrow.adjustment_history.len(), 1);
}

#[test]
fn dismissed_dispute_resumes_the_agreement() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.client, p.project_id, "Spurious complaint")
        .unwrap();

    mp.resolve_dispute(
        p.admin,
        dispute.dispute_id,
        DisputeDecision::Dismissed,
        dec!(0),
        dec!(0),
        "No merit",
    )
    .unwrap();

    assert_eq!(
        mp.agreement(dispute.agreement_id).unwrap().status,
        AgreementStatus::Active
    );
    assert_eq!(mp.escrow(p.project_id).unwrap().status, EscrowStatus::Funded);

    // Work then closes out normally
    mp.complete_and_release(p.client, p.project_id).unwrap();
    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(500)
    );
}

#[test]
fn settlement_runs_exactly_once() {
    let (mp, _dir) = marketplace();
    let p = active_agreement(&mp, dec!(500));
    let dispute = mp
        .open_dispute(p.freelancer, p.project_id, "Payment overdue")
        .unwrap();

    mp.resolve_dispute(
        p.admin,
        dispute.dispute_id,
        DisputeDecision::FreelancerFavor,
        dec!(500),
        dec!(0),
        "Delivery verified",
    )
    .unwrap();

    let err = mp
        .resolve_dispute(
            p.admin,
            dispute.dispute_id,
            DisputeDecision::FreelancerFavor,
            dec!(500),
            dec!(0),
            "Replay",
        )
        .unwrap_err();
    assert!(matches!(err, agreements::Error::StateConflict(_)));
    assert_eq!(
        mp.wallet(p.freelancer).unwrap().unwrap().balance,
        dec!(500)
    );
}
