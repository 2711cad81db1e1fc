// In-process store used when no database is configured, and by tests
use super::{BillingStore, ClaimTransaction};
use crate::error::{BillingError, BillingResult};
use crate::models::{
    Bill, BillClaimUpdate, BillDetails, BillId, ClaimId, ClaimStatus, Diagnosis, InsuranceClaim,
    NewBill, NewClaim, Procedure,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct MemoryState {
    next_bill_id: BillId,
    next_line_id: i64,
    next_claim_id: ClaimId,
    bills: BTreeMap<BillId, Bill>,
    diagnoses: Vec<Diagnosis>,
    procedures: Vec<Procedure>,
    claims: Vec<InsuranceClaim>,
}

impl MemoryState {
    fn starting_at(first_bill_id: BillId) -> Self {
        Self {
            next_bill_id: first_bill_id,
            next_line_id: 1,
            next_claim_id: 1,
            bills: BTreeMap::new(),
            diagnoses: Vec::new(),
            procedures: Vec::new(),
            claims: Vec::new(),
        }
    }

    fn details(&self, id: BillId) -> Option<BillDetails> {
        let bill = self.bills.get(&id)?.clone();
        Some(BillDetails {
            bill,
            diagnoses: self.diagnoses.iter().filter(|d| d.bill_id == id).cloned().collect(),
            procedures: self.procedures.iter().filter(|p| p.bill_id == id).cloned().collect(),
        })
    }

    fn apply(&mut self, op: StagedOp) -> BillingResult<()> {
        match op {
            StagedOp::InsertClaim(claim) => {
                if !self.bills.contains_key(&claim.bill_id) {
                    return Err(BillingError::NotFound("Bill".to_string()));
                }
                self.claims.push(claim);
            }
            StagedOp::UpdateBill(bill_id, update) => {
                if let Some(bill) = self.bills.get_mut(&bill_id) {
                    bill.claim_status = update.status;
                    if let Some(at) = update.submission_date {
                        bill.claim_submission_date = Some(at);
                    }
                    if let Some(number) = update.claim_number {
                        bill.claim_number = Some(number);
                    }
                }
            }
            StagedOp::FinishClaim(claim_id, status, message) => {
                if let Some(claim) = self.claims.iter_mut().find(|c| c.id == claim_id) {
                    claim.status = status;
                    claim.response_message = Some(message);
                }
            }
        }
        Ok(())
    }
}

/// Bills and claims held behind a single mutex.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Store whose first bill gets `first_bill_id`
    pub fn starting_at(first_bill_id: BillId) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::starting_at(first_bill_id))),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn list_bills(&self) -> BillingResult<Vec<Bill>> {
        let state = self.state.lock();
        let mut bills: Vec<Bill> = state.bills.values().cloned().collect();
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bills)
    }

    async fn get_bill(&self, id: BillId) -> BillingResult<Option<BillDetails>> {
        Ok(self.state.lock().details(id))
    }

    async fn create_bill(&self, new_bill: NewBill) -> BillingResult<BillDetails> {
        let total_amount = new_bill.total_amount()?;
        let mut state = self.state.lock();
        let id = state.next_bill_id;
        state.next_bill_id += 1;

        let bill = Bill {
            id,
            total_amount,
            patient_name: new_bill.patient_name,
            patient_dob: new_bill.patient_dob,
            insurance_provider: new_bill.insurance_provider,
            policy_number: new_bill.policy_number,
            email: new_bill.email,
            created_at: Utc::now(),
            payment_status: "pending".to_string(),
            payment_method: new_bill.payment_method,
            transaction_hash: None,
            payment_currency: None,
            crypto_amount: None,
            bank_name: None,
            account_number: None,
            routing_number: None,
            bank_currency: None,
            bank_exchange_rate: None,
            claim_status: ClaimStatus::Pending,
            claim_submission_date: None,
            claim_number: None,
        };
        state.bills.insert(id, bill);

        for diagnosis in new_bill.diagnoses {
            let line_id = state.next_line_id;
            state.next_line_id += 1;
            state.diagnoses.push(Diagnosis {
                id: line_id,
                bill_id: id,
                icd10_code: diagnosis.icd10_code,
                description: diagnosis.description,
                amount: diagnosis.amount,
            });
        }
        for procedure in new_bill.procedures {
            let line_id = state.next_line_id;
            state.next_line_id += 1;
            state.procedures.push(Procedure {
                id: line_id,
                bill_id: id,
                cpt_code: procedure.cpt_code,
                description: procedure.description,
                amount: procedure.amount,
            });
        }

        debug!(bill_id = id, "Bill created in memory store");
        state
            .details(id)
            .ok_or_else(|| BillingError::NotFound("Bill".to_string()))
    }

    async fn delete_bill(&self, id: BillId) -> BillingResult<()> {
        let mut state = self.state.lock();
        if !state.bills.contains_key(&id) {
            return Err(BillingError::NotFound("Bill".to_string()));
        }
        if state.claims.iter().any(|c| c.bill_id == id) {
            return Err(BillingError::Conflict(format!(
                "bill {} has insurance claims and cannot be deleted",
                id
            )));
        }
        state.bills.remove(&id);
        state.diagnoses.retain(|d| d.bill_id != id);
        state.procedures.retain(|p| p.bill_id != id);
        Ok(())
    }

    async fn claims_for_bill(&self, id: BillId) -> BillingResult<Vec<InsuranceClaim>> {
        let state = self.state.lock();
        let mut claims: Vec<InsuranceClaim> =
            state.claims.iter().filter(|c| c.bill_id == id).cloned().collect();
        claims.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(claims)
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> BillingResult<Box<dyn ClaimTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

#[derive(Debug)]
enum StagedOp {
    InsertClaim(InsuranceClaim),
    UpdateBill(BillId, BillClaimUpdate),
    FinishClaim(ClaimId, ClaimStatus, String),
}

/// Writes are staged and applied under one lock acquisition on commit.
struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<StagedOp>,
}

#[async_trait]
impl ClaimTransaction for MemoryTransaction {
    async fn insert_claim(&mut self, claim: NewClaim) -> BillingResult<InsuranceClaim> {
        let id = {
            let mut state = self.state.lock();
            if !state.bills.contains_key(&claim.bill_id) {
                return Err(BillingError::NotFound("Bill".to_string()));
            }
            let id = state.next_claim_id;
            state.next_claim_id += 1;
            id
        };

        let row = InsuranceClaim {
            id,
            bill_id: claim.bill_id,
            payer_id: claim.payer_id,
            payer_name: claim.payer_name,
            subscriber_id: claim.subscriber_id,
            subscriber_name: claim.subscriber_name,
            subscriber_dob: claim.subscriber_dob,
            relationship_to_subscriber: claim.relationship_to_subscriber,
            date_of_service: claim.date_of_service,
            place_of_service: claim.place_of_service,
            status: ClaimStatus::Pending,
            submitted_at: claim.submitted_at,
            claim_number: Some(claim.claim_number),
            response_message: None,
        };
        self.staged.push(StagedOp::InsertClaim(row.clone()));
        Ok(row)
    }

    async fn update_bill_claim(&mut self, bill_id: BillId, update: BillClaimUpdate) -> BillingResult<()> {
        self.staged.push(StagedOp::UpdateBill(bill_id, update));
        Ok(())
    }

    async fn finish_claim(&mut self, claim_id: ClaimId, status: ClaimStatus, response_message: &str) -> BillingResult<()> {
        self.staged
            .push(StagedOp::FinishClaim(claim_id, status, response_message.to_string()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BillingResult<()> {
        let mut state = self.state.lock();
        // validate first so a failing op leaves nothing half-applied
        for op in &self.staged {
            if let StagedOp::InsertClaim(claim) = op {
                if !state.bills.contains_key(&claim.bill_id) {
                    return Err(BillingError::NotFound("Bill".to_string()));
                }
            }
        }
        for op in self.staged {
            state.apply(op)?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> BillingResult<()> {
        debug!(discarded = self.staged.len(), "Memory transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{NewDiagnosis, NewProcedure};
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;

    pub(crate) fn sample_bill(id: BillId) -> Bill {
        Bill {
            id,
            patient_name: "Jane Doe".to_string(),
            patient_dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            insurance_provider: Some("Aetna".to_string()),
            policy_number: Some("W123456789".to_string()),
            total_amount: Decimal::new(22550, 2),
            email: "jane@example.com".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            payment_status: "pending".to_string(),
            payment_method: None,
            transaction_hash: None,
            payment_currency: None,
            crypto_amount: None,
            bank_name: None,
            account_number: None,
            routing_number: None,
            bank_currency: None,
            bank_exchange_rate: None,
            claim_status: ClaimStatus::Pending,
            claim_submission_date: None,
            claim_number: None,
        }
    }

    fn new_bill(name: &str) -> NewBill {
        NewBill {
            patient_name: name.to_string(),
            patient_dob: NaiveDate::from_ymd_opt(1975, 1, 2).unwrap(),
            insurance_provider: Some("Aetna".to_string()),
            policy_number: None,
            email: "patient@example.com".to_string(),
            payment_method: None,
            diagnoses: vec![NewDiagnosis {
                icd10_code: "E11.9".to_string(),
                description: Some("Type 2 diabetes".to_string()),
                amount: Decimal::ZERO,
            }],
            procedures: vec![NewProcedure {
                cpt_code: "99213".to_string(),
                description: Some("Office visit".to_string()),
                amount: Decimal::new(15000, 2),
            }],
        }
    }

    fn new_claim(bill_id: BillId) -> NewClaim {
        NewClaim {
            bill_id,
            payer_id: "60054".to_string(),
            payer_name: "Aetna".to_string(),
            subscriber_id: "W123456789".to_string(),
            subscriber_name: "Jane Doe".to_string(),
            subscriber_dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            relationship_to_subscriber: "self".to_string(),
            date_of_service: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            place_of_service: "11".to_string(),
            claim_number: format!("CLM-20240301-{}", bill_id),
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_totals() {
        let store = MemoryStore::starting_at(42);
        let details = store.create_bill(new_bill("Jane Doe")).await.unwrap();

        assert_eq!(details.bill.id, 42);
        assert_eq!(details.bill.total_amount, Decimal::new(15000, 2));
        assert_eq!(details.diagnoses.len(), 1);
        assert_eq!(details.procedures[0].bill_id, 42);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        store.create_bill(new_bill("First Patient")).await.unwrap();
        store.create_bill(new_bill("Second Patient")).await.unwrap();

        let bills = store.list_bills().await.unwrap();
        assert_eq!(bills[0].patient_name, "Second Patient");
        assert_eq!(bills[1].patient_name, "First Patient");
    }

    #[tokio::test]
    async fn delete_cascades_line_items() {
        let store = MemoryStore::new();
        let id = store.create_bill(new_bill("Jane Doe")).await.unwrap().bill.id;

        store.delete_bill(id).await.unwrap();

        assert!(store.get_bill(id).await.unwrap().is_none());
        let state = store.state.lock();
        assert!(state.diagnoses.is_empty());
        assert!(state.procedures.is_empty());
    }

    #[tokio::test]
    async fn delete_with_claims_conflicts() {
        let store = MemoryStore::new();
        let id = store.create_bill(new_bill("Jane Doe")).await.unwrap().bill.id;
        let mut tx = store.begin().await.unwrap();
        tx.insert_claim(new_claim(id)).await.unwrap();
        tx.commit().await.unwrap();

        assert!(matches!(store.delete_bill(id).await, Err(BillingError::Conflict(_))));
        assert!(matches!(store.delete_bill(id + 100).await, Err(BillingError::NotFound(_))));
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = MemoryStore::new();
        let id = store.create_bill(new_bill("Jane Doe")).await.unwrap().bill.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_claim(new_claim(id)).await.unwrap();
        tx.update_bill_claim(id, BillClaimUpdate::status(ClaimStatus::Failed))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(store.claims_for_bill(id).await.unwrap().is_empty());
        let bill = store.get_bill(id).await.unwrap().unwrap().bill;
        assert_eq!(bill.claim_status, ClaimStatus::Pending);
    }

    #[tokio::test]
    async fn claim_for_unknown_bill_is_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.insert_claim(new_claim(9)).await,
            Err(BillingError::NotFound(_))
        ));
    }
}
