//! Insurance claim submission workflow.
//!
//! One submission persists a `pending` claim, stamps the bill with the claim
//! number, encodes the interchange and hands it to the clearinghouse, all
//! inside a single store transaction. A clearinghouse rejection is a business
//! outcome and is committed (claim and bill both marked `failed`); any other
//! error rolls the transaction back.

use crate::clearinghouse::Clearinghouse;
use crate::edi;
use crate::error::{BillingError, BillingResult};
use crate::models::{BillClaimUpdate, BillId, ClaimId, ClaimStatus, NewClaim};
use crate::store::{BillingStore, ClaimTransaction};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const SUBMITTED_MESSAGE: &str = "Claim submitted successfully";

/// Validated claim request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSubmission {
    pub bill_id: BillId,
    pub payer_id: String,
    pub payer_name: String,
    pub subscriber_id: String,
    pub subscriber_name: String,
    pub subscriber_dob: NaiveDate,
    pub relationship_to_subscriber: String,
    pub date_of_service: NaiveDate,
    pub place_of_service: String,
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub claim_id: ClaimId,
    pub claim_number: String,
    pub message: String,
    pub clearinghouse_message: String,
}

enum Outcome {
    Accepted(SubmissionReceipt),
    Rejected(String),
}

/// `CLM-{YYYYMMDD}-{bill id}`
pub fn claim_number(date: NaiveDate, bill_id: BillId) -> String {
    format!("CLM-{}-{}", date.format("%Y%m%d"), bill_id)
}

pub struct ClaimSubmissionService {
    store: Arc<dyn BillingStore>,
    clearinghouse: Arc<dyn Clearinghouse>,
}

impl ClaimSubmissionService {
    pub fn new(store: Arc<dyn BillingStore>, clearinghouse: Arc<dyn Clearinghouse>) -> Self {
        Self {
            store,
            clearinghouse,
        }
    }

    /// Submit a claim now.
    ///
    /// # Errors
    ///
    /// See [`ClaimSubmissionService::submit_at`].
    pub async fn submit(&self, request: ClaimSubmission) -> BillingResult<SubmissionReceipt> {
        self.submit_at(request, Utc::now()).await
    }

    /// Submit a claim as of `now` (claim number date, EDI timestamps, bill
    /// submission date).
    ///
    /// # Errors
    ///
    /// - [`BillingError::NotFound`]: no such bill; nothing is written
    /// - [`BillingError::Validation`]: the bill carries no insurance
    /// - [`BillingError::MalformedName`]: subscriber name cannot be split; rolled back
    /// - [`BillingError::Clearinghouse`]: rejected upstream; the failure is committed
    /// - anything else: rolled back
    pub async fn submit_at(
        &self,
        request: ClaimSubmission,
        now: DateTime<Utc>,
    ) -> BillingResult<SubmissionReceipt> {
        let bill_id = request.bill_id;
        let details = self
            .store
            .get_bill(bill_id)
            .await?
            .ok_or_else(|| BillingError::NotFound("Bill".to_string()))?;

        if !details.bill.has_insurance() {
            return Err(BillingError::Validation(
                "This bill does not have insurance information".to_string(),
            ));
        }

        let number = claim_number(now.date_naive(), bill_id);
        let mut tx = self.store.begin().await?;

        match self
            .run(tx.as_mut(), request, &details.procedures, &number, now)
            .await
        {
            Ok(outcome) => {
                tx.commit().await?;
                match outcome {
                    Outcome::Accepted(receipt) => {
                        info!(bill_id, claim_number = %receipt.claim_number, "Claim submitted");
                        Ok(receipt)
                    }
                    Outcome::Rejected(message) => {
                        warn!(bill_id, claim_number = %number, "Claim rejected by clearinghouse");
                        Err(BillingError::Clearinghouse(message))
                    }
                }
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(bill_id, "Failed to roll back claim submission: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut dyn ClaimTransaction,
        request: ClaimSubmission,
        procedures: &[crate::models::Procedure],
        number: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<Outcome> {
        let bill_id = request.bill_id;
        let claim = tx
            .insert_claim(NewClaim {
                bill_id,
                payer_id: request.payer_id,
                payer_name: request.payer_name,
                subscriber_id: request.subscriber_id,
                subscriber_name: request.subscriber_name,
                subscriber_dob: request.subscriber_dob,
                relationship_to_subscriber: request.relationship_to_subscriber,
                date_of_service: request.date_of_service,
                place_of_service: request.place_of_service,
                claim_number: number.to_string(),
                submitted_at: now,
            })
            .await?;

        tx.update_bill_claim(bill_id, BillClaimUpdate::submitted(number, now))
            .await?;

        let interchange = edi::encode_claim(&claim, procedures, now)?;

        match self.clearinghouse.submit(&interchange).await {
            Ok(message) => {
                tx.finish_claim(claim.id, ClaimStatus::Submitted, &message)
                    .await?;
                Ok(Outcome::Accepted(SubmissionReceipt {
                    claim_id: claim.id,
                    claim_number: number.to_string(),
                    message: SUBMITTED_MESSAGE.to_string(),
                    clearinghouse_message: message,
                }))
            }
            Err(rejection) => {
                tx.finish_claim(claim.id, ClaimStatus::Failed, &rejection.message)
                    .await?;
                tx.update_bill_claim(bill_id, BillClaimUpdate::status(ClaimStatus::Failed))
                    .await?;
                Ok(Outcome::Rejected(rejection.message))
            }
        }
    }
}
