//! Persistence seam for bills and claims.
//!
//! [`BillingStore`] covers the plain CRUD the HTTP surface needs; claim
//! submission goes through a [`ClaimTransaction`] so the claim row and the
//! bill's claim fields are written together or not at all.

pub mod memory;
pub mod postgres;

use crate::error::BillingResult;
use crate::models::{
    BillClaimUpdate, BillDetails, BillId, Bill, ClaimId, ClaimStatus, InsuranceClaim, NewBill,
    NewClaim,
};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PgBillingStore;

#[async_trait]
pub trait BillingStore: Send + Sync {
    /// All bills, newest first
    async fn list_bills(&self) -> BillingResult<Vec<Bill>>;

    async fn get_bill(&self, id: BillId) -> BillingResult<Option<BillDetails>>;

    async fn create_bill(&self, bill: NewBill) -> BillingResult<BillDetails>;

    /// Delete a bill and its line items.
    ///
    /// # Errors
    ///
    /// [`crate::BillingError::NotFound`] for an unknown id,
    /// [`crate::BillingError::Conflict`] while claims still reference the bill.
    async fn delete_bill(&self, id: BillId) -> BillingResult<()>;

    /// Claims filed against a bill, newest first
    async fn claims_for_bill(&self, id: BillId) -> BillingResult<Vec<InsuranceClaim>>;

    async fn is_healthy(&self) -> bool;

    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    async fn begin(&self) -> BillingResult<Box<dyn ClaimTransaction>>;
}

/// Unit of work for one claim submission. Dropping it uncommitted discards
/// every write made through it.
#[async_trait]
pub trait ClaimTransaction: Send {
    async fn insert_claim(&mut self, claim: NewClaim) -> BillingResult<InsuranceClaim>;

    async fn update_bill_claim(&mut self, bill_id: BillId, update: BillClaimUpdate) -> BillingResult<()>;

    async fn finish_claim(&mut self, claim_id: ClaimId, status: ClaimStatus, response_message: &str) -> BillingResult<()>;

    async fn commit(self: Box<Self>) -> BillingResult<()>;

    async fn rollback(self: Box<Self>) -> BillingResult<()>;
}
