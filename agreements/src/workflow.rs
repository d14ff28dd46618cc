//! Agreement lifecycle orchestration
//!
//! [`Marketplace`] ties the document store, the wallet ledger and the event
//! bus into the public API. Every mutating method opens one
//! [`wallet_ledger::LedgerTxn`] before reading state, so status guards are
//! checked under the commit lock: two racing attempts at the same
//! transition produce exactly one success and one state-conflict error.

use crate::{
    config::Config,
    events::{DomainEvent, EventBus},
    hash, reconcile, store,
    types::{
        Agreement, AgreementStatus, Bid, BidStatus, CancellationRecord, Engagement, Escrow,
        EscrowStatus, Project, ProjectStatus, SignatureRecord, TermsUpdate,
    },
    Error, Result,
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use wallet_ledger::{Storage, TxnReference, Wallet, WalletTransaction};

/// Marketplace core: agreements, escrows and the wallets behind them
pub struct Marketplace {
    pub(crate) storage: Arc<Storage>,
    pub(crate) events: EventBus,
    pub(crate) config: Config,
}

impl Marketplace {
    /// Open the marketplace core with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.ledger, store::DOCUMENT_CFS)?);
        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            storage,
            events,
            config,
        })
    }

    /// Event bus for the notification collaborator
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Shared storage handle
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    fn platform_fee(&self, amount: Decimal) -> Decimal {
        (amount * self.config.platform_fee_percent / Decimal::ONE_HUNDRED).round_dp(2)
    }

    fn generate_agreement_number() -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..8)
            .map(|_| {
                let chars = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
                chars[rng.gen_range(0..chars.len())] as char
            })
            .collect();
        format!("AGR-{}-{}", Utc::now().format("%Y"), suffix)
    }

    // Collaborator records (identity/project/bid are owned externally; the
    // core stores the snapshots it needs to reference)

    /// Insert or replace a project record
    pub fn upsert_project(&self, project: Project) -> Result<()> {
        let mut txn = self.storage.begin();
        store::put_project(&mut txn, &project)?;
        txn.commit()?;
        Ok(())
    }

    /// Insert or replace a bid record
    pub fn upsert_bid(&self, bid: Bid) -> Result<()> {
        let mut txn = self.storage.begin();
        store::put_bid(&mut txn, &bid)?;
        txn.commit()?;
        Ok(())
    }

    // Deposits and escrow funding

    /// Credit an externally verified deposit.
    ///
    /// Idempotency for redelivered confirmations is the caller's
    /// responsibility; the external payment id is carried on the row for
    /// that check.
    pub fn record_deposit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        external_payment_id: &str,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.credit(
            user_id,
            amount,
            "Deposit confirmed by payment gateway",
            Some(TxnReference::ExternalPayment(external_payment_id.to_string())),
        )?;
        txn.commit()?;

        self.events.publish(DomainEvent::DepositCredited { user_id, amount });
        Ok(wallet)
    }

    /// Lock client funds into the project escrow (creating or topping it up)
    pub fn fund_escrow(&self, actor: Uuid, project_id: Uuid, amount: Decimal) -> Result<Escrow> {
        let mut txn = self.storage.begin();

        let project = store::get_project(&self.storage, project_id)?;
        if actor != project.client_id {
            return Err(Error::StateConflict(format!(
                "Only the project client may fund escrow for project {}",
                project_id
            )));
        }

        let mut escrow = match store::try_get_escrow(&self.storage, project_id)? {
            Some(escrow) => {
                if escrow.status != EscrowStatus::Funded {
                    return Err(Error::StateConflict(format!(
                        "Escrow for project {} is not accepting funds",
                        project_id
                    )));
                }
                escrow
            }
            None => {
                let now = Utc::now();
                Escrow {
                    escrow_id: Uuid::new_v4(),
                    project_id,
                    client_id: project.client_id,
                    amount: Decimal::ZERO,
                    adjusted_amount: None,
                    status: EscrowStatus::Funded,
                    agreement_id: None,
                    adjustment_history: vec![],
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        txn.hold_escrow(
            project.client_id,
            amount,
            escrow.escrow_id,
            project_id,
            "Escrow funding",
        )?;
        escrow.amount += amount;
        escrow.updated_at = Utc::now();
        store::put_escrow(&mut txn, &escrow)?;
        txn.commit()?;

        self.events.publish(DomainEvent::EscrowFunded {
            project_id,
            amount: escrow.amount,
        });
        Ok(escrow)
    }

    // Agreement lifecycle

    /// Create a draft agreement from a bid; paying party only
    pub fn create_agreement(&self, actor: Uuid, project_id: Uuid, bid_id: Uuid) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let project = store::get_project(&self.storage, project_id)?;
        let bid = store::get_bid(&self.storage, bid_id)?;

        if actor != project.client_id {
            return Err(Error::StateConflict(
                "Only the project client may create an agreement".to_string(),
            ));
        }
        if bid.project_id != project_id {
            return Err(Error::StateConflict(format!(
                "Bid {} does not belong to project {}",
                bid_id, project_id
            )));
        }
        if let Some(active) = store::active_agreement_id(&self.storage, project_id)? {
            return Err(Error::DuplicateActiveAgreement(format!(
                "{} (agreement {})",
                project_id, active
            )));
        }

        let platform_fee = self.platform_fee(bid.amount);
        let now = Utc::now();
        let mut agreement = Agreement {
            agreement_id: Uuid::new_v4(),
            agreement_number: Self::generate_agreement_number(),
            project_id,
            bid_id,
            parent_agreement_id: None,
            client_id: project.client_id,
            freelancer_id: bid.freelancer_id,
            version: 1,
            agreed_amount: bid.amount,
            platform_fee,
            total_amount: bid.amount + platform_fee,
            currency: self.config.ledger.default_currency,
            deadline: None,
            deliverables: vec![],
            project_title: project.title.clone(),
            project_description: project.description.clone(),
            terms: String::new(),
            freelancer_signature: None,
            client_signature: None,
            status: AgreementStatus::Draft,
            content_hash: String::new(),
            amendment_history: vec![],
            cancellation: None,
            created_at: now,
            updated_at: now,
        };
        agreement.content_hash = hash::content_hash(&agreement);

        store::put_agreement(&mut txn, &agreement)?;
        txn.commit()?;

        tracing::info!(
            agreement_id = %agreement.agreement_id,
            agreement_number = %agreement.agreement_number,
            project_id = %project_id,
            "Agreement drafted"
        );
        self.events.publish(DomainEvent::AgreementCreated {
            agreement_id: agreement.agreement_id,
            project_id,
        });
        Ok(agreement)
    }

    /// Edit draft terms; recomputes totals and the content hash
    pub fn update_terms(
        &self,
        actor: Uuid,
        agreement_id: Uuid,
        update: TermsUpdate,
    ) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.status != AgreementStatus::Draft {
            return Err(Error::StateConflict(format!(
                "Agreement {} is no longer editable",
                agreement.agreement_number
            )));
        }
        if actor != agreement.client_id {
            return Err(Error::StateConflict(
                "Only the client may edit draft terms".to_string(),
            ));
        }

        if let Some(amount) = update.agreed_amount {
            if amount <= Decimal::ZERO {
                return Err(Error::Ledger(wallet_ledger::Error::InvalidAmount(format!(
                    "Agreed amount must be positive, got {}",
                    amount
                ))));
            }
            agreement.agreed_amount = amount;
            agreement.platform_fee = self.platform_fee(amount);
            agreement.total_amount = amount + agreement.platform_fee;
        }
        if let Some(deadline) = update.deadline {
            agreement.deadline = Some(deadline);
        }
        if let Some(deliverables) = update.deliverables {
            agreement.deliverables = deliverables;
        }
        if let Some(terms) = update.terms {
            agreement.terms = terms;
        }

        agreement.content_hash = hash::content_hash(&agreement);
        agreement.updated_at = Utc::now();

        store::put_agreement(&mut txn, &agreement)?;
        txn.commit()?;
        Ok(agreement)
    }

    /// Freeze the terms and hand the agreement to the freelancer to sign
    pub fn send_for_signing(&self, actor: Uuid, agreement_id: Uuid) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.status != AgreementStatus::Draft {
            return Err(Error::StateConflict(format!(
                "Agreement {} cannot be sent for signing from {:?}",
                agreement.agreement_number, agreement.status
            )));
        }
        if actor != agreement.client_id {
            return Err(Error::StateConflict(
                "Only the client may send for signing".to_string(),
            ));
        }

        agreement.status = AgreementStatus::PendingFreelancer;
        agreement.updated_at = Utc::now();
        store::put_agreement(&mut txn, &agreement)?;
        txn.commit()?;

        self.events
            .publish(DomainEvent::AgreementSentForSigning { agreement_id });
        Ok(agreement)
    }

    /// Freelancer signature; signing order is fixed freelancer-first
    pub fn sign_as_freelancer(
        &self,
        actor: Uuid,
        agreement_id: Uuid,
        ip: &str,
        user_agent: &str,
    ) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.freelancer_signature.is_some() {
            return Err(Error::AlreadySigned(format!(
                "Freelancer already signed agreement {}",
                agreement.agreement_number
            )));
        }
        if agreement.status != AgreementStatus::PendingFreelancer {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not awaiting the freelancer signature",
                agreement.agreement_number
            )));
        }
        if actor != agreement.freelancer_id {
            return Err(Error::StateConflict(
                "Only the named freelancer may sign".to_string(),
            ));
        }
        self.check_integrity(&agreement)?;

        let signed_at = Utc::now();
        agreement.freelancer_signature = Some(SignatureRecord {
            signed_at,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            signature_hash: hash::signature_hash(
                &agreement.content_hash,
                "freelancer",
                actor,
                signed_at,
            ),
        });
        agreement.status = AgreementStatus::PendingClient;
        agreement.updated_at = signed_at;

        store::put_agreement(&mut txn, &agreement)?;
        txn.commit()?;

        self.events.publish(DomainEvent::FreelancerSigned { agreement_id });
        Ok(agreement)
    }

    /// Client signature: activates the agreement and, in the same atomic
    /// unit, reconciles the escrow, accepts the bid, flips the project to
    /// in-progress and materializes the ongoing-work row.
    pub fn sign_as_client(
        &self,
        actor: Uuid,
        agreement_id: Uuid,
        ip: &str,
        user_agent: &str,
    ) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.client_signature.is_some() {
            return Err(Error::AlreadySigned(format!(
                "Client already signed agreement {}",
                agreement.agreement_number
            )));
        }
        if agreement.status != AgreementStatus::PendingClient {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not awaiting the client signature",
                agreement.agreement_number
            )));
        }
        if actor != agreement.client_id {
            return Err(Error::StateConflict(
                "Only the named client may sign".to_string(),
            ));
        }
        // The state already implies this; kept as defense in depth
        if agreement.freelancer_signature.is_none() {
            return Err(Error::StateConflict(
                "Freelancer signature missing".to_string(),
            ));
        }
        self.check_integrity(&agreement)?;

        // Uniqueness backstop, checked under the commit lock
        if let Some(active) = store::active_agreement_id(&self.storage, agreement.project_id)? {
            return Err(Error::DuplicateActiveAgreement(format!(
                "{} (agreement {})",
                agreement.project_id, active
            )));
        }

        let signed_at = Utc::now();
        agreement.client_signature = Some(SignatureRecord {
            signed_at,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            signature_hash: hash::signature_hash(
                &agreement.content_hash,
                "client",
                actor,
                signed_at,
            ),
        });
        agreement.status = AgreementStatus::Active;
        agreement.updated_at = signed_at;

        // Escrow reconciliation, same transaction
        let escrow = store::get_escrow(&self.storage, agreement.project_id)?;
        let escrow = reconcile::reconcile_escrow(&mut txn, escrow, &agreement)?;
        store::put_escrow(&mut txn, &escrow)?;

        // Bid accepted only now, not at agreement creation
        let mut bid = store::get_bid(&self.storage, agreement.bid_id)?;
        bid.status = BidStatus::Accepted;
        store::put_bid(&mut txn, &bid)?;

        let mut project = store::get_project(&self.storage, agreement.project_id)?;
        project.status = ProjectStatus::InProgress;
        project.updated_at = signed_at;
        store::put_project(&mut txn, &project)?;

        store::put_engagement(
            &mut txn,
            &Engagement {
                project_id: agreement.project_id,
                agreement_id,
                client_id: agreement.client_id,
                freelancer_id: agreement.freelancer_id,
                agreed_amount: agreement.agreed_amount,
                started_at: signed_at,
            },
        )?;
        store::set_active_agreement(&mut txn, agreement.project_id, agreement_id)?;
        store::put_agreement(&mut txn, &agreement)?;
        txn.commit()?;

        tracing::info!(
            agreement_id = %agreement_id,
            project_id = %agreement.project_id,
            agreed_amount = %agreement.agreed_amount,
            "Agreement fully signed and active"
        );
        self.events.publish(DomainEvent::AgreementActivated {
            agreement_id,
            project_id: agreement.project_id,
        });
        Ok(agreement)
    }

    /// Cancel a not-yet-active agreement. Cancelling an amendment draft
    /// restores its fully-signed parent to active, unless another
    /// agreement has since claimed the project.
    pub fn cancel_with_rollback(
        &self,
        actor: Uuid,
        agreement_id: Uuid,
        reason: &str,
    ) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if !matches!(
            agreement.status,
            AgreementStatus::Draft
                | AgreementStatus::PendingFreelancer
                | AgreementStatus::PendingClient
        ) {
            return Err(Error::StateConflict(format!(
                "Agreement {} cannot be cancelled from {:?}",
                agreement.agreement_number, agreement.status
            )));
        }
        if actor != agreement.client_id && actor != agreement.freelancer_id {
            return Err(Error::StateConflict(
                "Only a party to the agreement may cancel it".to_string(),
            ));
        }

        agreement.status = AgreementStatus::Cancelled;
        agreement.cancellation = Some(CancellationRecord {
            reason: reason.to_string(),
            cancelled_by: actor,
            cancelled_at: Utc::now(),
        });
        agreement.updated_at = Utc::now();
        store::put_agreement(&mut txn, &agreement)?;

        // Rollback of the supersede side-effect: restore the amended parent.
        // The uniqueness key went up for grabs when the amendment was
        // drafted; if another agreement claimed it since, the parent stays
        // superseded rather than producing two active agreements.
        if let Some(parent_id) = agreement.parent_agreement_id {
            let mut parent = store::get_agreement(&self.storage, parent_id)?;
            if parent.status == AgreementStatus::Amended
                && parent.is_fully_signed()
                && store::active_agreement_id(&self.storage, parent.project_id)?.is_none()
            {
                parent.status = AgreementStatus::Active;
                parent.updated_at = Utc::now();
                store::put_agreement(&mut txn, &parent)?;
                store::set_active_agreement(&mut txn, parent.project_id, parent_id)?;
                store::put_engagement(
                    &mut txn,
                    &Engagement {
                        project_id: parent.project_id,
                        agreement_id: parent_id,
                        client_id: parent.client_id,
                        freelancer_id: parent.freelancer_id,
                        agreed_amount: parent.agreed_amount,
                        started_at: Utc::now(),
                    },
                )?;

                tracing::info!(
                    parent_id = %parent_id,
                    cancelled_id = %agreement_id,
                    "Amendment cancelled, parent agreement restored to active"
                );
            }
        }

        txn.commit()?;
        self.events.publish(DomainEvent::AgreementCancelled { agreement_id });
        Ok(agreement)
    }

    /// Supersede an active agreement with a new draft version; both parties
    /// must re-sign from scratch.
    pub fn create_amendment(
        &self,
        actor: Uuid,
        agreement_id: Uuid,
        new_amount: Decimal,
        reason: &str,
    ) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let mut parent = store::get_agreement(&self.storage, agreement_id)?;
        if parent.status != AgreementStatus::Active || !parent.is_fully_signed() {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not active and fully signed",
                parent.agreement_number
            )));
        }
        if actor != parent.client_id && actor != parent.freelancer_id {
            return Err(Error::StateConflict(
                "Only a party to the agreement may amend it".to_string(),
            ));
        }
        if new_amount <= Decimal::ZERO {
            return Err(Error::Ledger(wallet_ledger::Error::InvalidAmount(format!(
                "Amendment amount must be positive, got {}",
                new_amount
            ))));
        }

        let now = Utc::now();
        let version = parent.version + 1;
        let platform_fee = self.platform_fee(new_amount);

        let mut amendment_history = parent.amendment_history.clone();
        amendment_history.push(crate::types::AmendmentRecord {
            from_version: parent.version,
            to_version: version,
            previous_amount: parent.agreed_amount,
            new_amount,
            reason: reason.to_string(),
            amended_by: actor,
            amended_at: now,
        });

        let base_number = parent
            .agreement_number
            .split("-v")
            .next()
            .unwrap_or(&parent.agreement_number)
            .to_string();

        let mut child = Agreement {
            agreement_id: Uuid::new_v4(),
            agreement_number: format!("{}-v{}", base_number, version),
            project_id: parent.project_id,
            bid_id: parent.bid_id,
            parent_agreement_id: Some(parent.agreement_id),
            client_id: parent.client_id,
            freelancer_id: parent.freelancer_id,
            version,
            agreed_amount: new_amount,
            platform_fee,
            total_amount: new_amount + platform_fee,
            currency: parent.currency,
            deadline: parent.deadline,
            deliverables: parent.deliverables.clone(),
            project_title: parent.project_title.clone(),
            project_description: parent.project_description.clone(),
            terms: parent.terms.clone(),
            freelancer_signature: None,
            client_signature: None,
            status: AgreementStatus::Draft,
            content_hash: String::new(),
            amendment_history,
            cancellation: None,
            created_at: now,
            updated_at: now,
        };
        child.content_hash = hash::content_hash(&child);

        parent.status = AgreementStatus::Amended;
        parent.updated_at = now;
        store::put_agreement(&mut txn, &parent)?;
        store::clear_active_agreement(&mut txn, parent.project_id)?;
        store::put_agreement(&mut txn, &child)?;
        txn.commit()?;

        tracing::info!(
            original_id = %agreement_id,
            amendment_id = %child.agreement_id,
            version = version,
            "Amendment drafted, original superseded"
        );
        self.events.publish(DomainEvent::AgreementAmended {
            original_id: agreement_id,
            amendment_id: child.agreement_id,
        });
        Ok(child)
    }

    /// Recompute the content hash and compare to the stored value.
    ///
    /// Never auto-corrects: a false return means the stored terms were
    /// tampered with out of band and the agreement is untrustworthy until
    /// manually reviewed.
    pub fn verify_integrity(&self, agreement_id: Uuid) -> Result<bool> {
        let agreement = store::get_agreement(&self.storage, agreement_id)?;
        Ok(hash::content_hash(&agreement) == agreement.content_hash)
    }

    fn check_integrity(&self, agreement: &Agreement) -> Result<()> {
        if hash::content_hash(agreement) != agreement.content_hash {
            return Err(Error::IntegrityMismatch(agreement.agreement_number.clone()));
        }
        Ok(())
    }

    /// Accept delivered work: release the escrow to the freelancer and
    /// close out the agreement, project and engagement in one unit.
    pub fn complete_and_release(&self, actor: Uuid, project_id: Uuid) -> Result<Agreement> {
        let mut txn = self.storage.begin();

        let agreement_id = store::active_agreement_id(&self.storage, project_id)?
            .ok_or_else(|| {
                Error::StateConflict(format!("No active agreement for project {}", project_id))
            })?;
        let mut agreement = store::get_agreement(&self.storage, agreement_id)?;
        if agreement.status != AgreementStatus::Active {
            return Err(Error::StateConflict(format!(
                "Agreement {} is not active",
                agreement.agreement_number
            )));
        }
        if actor != agreement.client_id {
            return Err(Error::StateConflict(
                "Only the client may accept delivery".to_string(),
            ));
        }

        let mut escrow = store::get_escrow(&self.storage, project_id)?;
        if !matches!(
            escrow.status,
            EscrowStatus::Funded | EscrowStatus::PartialRefund
        ) {
            return Err(Error::StateConflict(format!(
                "Escrow for project {} is not releasable ({:?})",
                project_id, escrow.status
            )));
        }

        txn.release_escrow(
            agreement.client_id,
            agreement.freelancer_id,
            escrow.amount,
            escrow.escrow_id,
            TxnReference::Agreement(agreement_id),
            "Work accepted, escrow released",
        )?;

        escrow.status = EscrowStatus::Released;
        escrow.updated_at = Utc::now();
        store::put_escrow(&mut txn, &escrow)?;

        agreement.status = AgreementStatus::Completed;
        agreement.updated_at = Utc::now();
        store::put_agreement(&mut txn, &agreement)?;

        let mut project = store::get_project(&self.storage, project_id)?;
        project.status = ProjectStatus::Completed;
        project.updated_at = Utc::now();
        store::put_project(&mut txn, &project)?;

        store::delete_engagement(&mut txn, project_id)?;
        store::clear_active_agreement(&mut txn, project_id)?;
        txn.commit()?;

        tracing::info!(
            agreement_id = %agreement_id,
            project_id = %project_id,
            released = %escrow.amount,
            "Agreement completed, escrow released"
        );
        self.events.publish(DomainEvent::AgreementCompleted { agreement_id });
        Ok(agreement)
    }

    // Wallet passthroughs (withdrawals, administrative paths)

    /// Request a withdrawal; the debit is recorded Pending until the
    /// external payout settles.
    pub fn request_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
        payout_ref: &str,
    ) -> Result<(Wallet, WalletTransaction)> {
        let mut txn = self.storage.begin();
        let out = txn.debit_wallet(
            user_id,
            amount,
            TxnReference::ExternalPayment(payout_ref.to_string()),
            "Withdrawal requested",
        )?;
        txn.commit()?;
        Ok(out)
    }

    /// Mark a pending withdrawal settled
    pub fn complete_withdrawal(&self, withdrawal_id: Uuid) -> Result<WalletTransaction> {
        let mut txn = self.storage.begin();
        let row = txn.complete_withdrawal(withdrawal_id)?;
        txn.commit()?;
        Ok(row)
    }

    /// Undo a withdrawal the payout rail rejected
    pub fn reverse_withdrawal(
        &self,
        user_id: Uuid,
        amount: Decimal,
        withdrawal_id: Uuid,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.reverse_withdrawal(user_id, amount, withdrawal_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Administrative balance correction
    pub fn admin_adjust_wallet(
        &self,
        user_id: Uuid,
        delta: Decimal,
        admin_id: Uuid,
        description: &str,
    ) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.admin_adjust_wallet(user_id, delta, admin_id, description)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Administrative clawback of credited funds
    pub fn admin_clawback(
        &self,
        freelancer_id: Uuid,
        client_id: Uuid,
        amount: Decimal,
        project_id: Uuid,
        admin_id: Uuid,
        reason: &str,
    ) -> Result<(Wallet, Wallet)> {
        let mut txn = self.storage.begin();
        let wallets =
            txn.admin_clawback(freelancer_id, client_id, amount, project_id, admin_id, reason)?;
        txn.commit()?;
        Ok(wallets)
    }

    /// Freeze withdrawals for a wallet
    pub fn block_withdrawals(&self, user_id: Uuid, reason: &str, admin_id: Uuid) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.block_withdrawals(user_id, reason, admin_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    /// Lift a withdrawal freeze
    pub fn unblock_withdrawals(&self, user_id: Uuid) -> Result<Wallet> {
        let mut txn = self.storage.begin();
        let wallet = txn.unblock_withdrawals(user_id)?;
        txn.commit()?;
        Ok(wallet)
    }

    // Read surfaces

    /// Wallet snapshot
    pub fn wallet(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.storage.get_wallet(user_id)?)
    }

    /// Paginated transaction history, oldest first
    pub fn transactions(
        &self,
        user_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<WalletTransaction>> {
        Ok(self.storage.wallet_transactions(user_id, offset, limit)?)
    }

    /// Agreement detail
    pub fn agreement(&self, agreement_id: Uuid) -> Result<Agreement> {
        store::get_agreement(&self.storage, agreement_id)
    }

    /// All agreement versions for a project, oldest first
    pub fn agreements_for_project(&self, project_id: Uuid) -> Result<Vec<Agreement>> {
        store::agreements_for_project(&self.storage, project_id)
    }

    /// Escrow detail for a project
    pub fn escrow(&self, project_id: Uuid) -> Result<Escrow> {
        store::get_escrow(&self.storage, project_id)
    }

    /// Ongoing-work row for a project, if any
    pub fn engagement(&self, project_id: Uuid) -> Result<Option<Engagement>> {
        store::get_engagement(&self.storage, project_id)
    }
}
