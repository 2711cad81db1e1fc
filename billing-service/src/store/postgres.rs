// PostgreSQL-backed store
use super::{BillingStore, ClaimTransaction};
use crate::error::{BillingError, BillingResult};
use crate::models::{
    Bill, BillClaimUpdate, BillDetails, BillId, ClaimId, ClaimStatus, Diagnosis, InsuranceClaim,
    NewBill, NewClaim, Procedure,
};
use async_trait::async_trait;
use database_layer::{DatabaseError, DatabasePool, PgTransaction, TransactionManager};
use sqlx::PgConnection;
use tracing::{debug, info};

#[derive(Clone)]
pub struct PgBillingStore {
    pool: DatabasePool,
    transactions: TransactionManager,
}

impl PgBillingStore {
    pub fn new(pool: DatabasePool) -> Self {
        let transactions = TransactionManager::new(pool.clone());
        Self { pool, transactions }
    }

    async fn line_items(
        conn: &mut PgConnection,
        id: BillId,
    ) -> BillingResult<(Vec<Diagnosis>, Vec<Procedure>)> {
        let diagnoses = sqlx::query_as::<_, Diagnosis>(
            "SELECT * FROM diagnosis WHERE bill_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let procedures = sqlx::query_as::<_, Procedure>(
            "SELECT * FROM procedure WHERE bill_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok((diagnoses, procedures))
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn list_bills(&self) -> BillingResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>("SELECT * FROM bill ORDER BY created_at DESC, id DESC")
            .fetch_all(self.pool.pool())
            .await?;
        Ok(bills)
    }

    async fn get_bill(&self, id: BillId) -> BillingResult<Option<BillDetails>> {
        let mut conn = self.pool.pool().acquire().await?;

        let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bill WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(bill) = bill else {
            return Ok(None);
        };

        let (diagnoses, procedures) = Self::line_items(&mut conn, id).await?;
        Ok(Some(BillDetails {
            bill,
            diagnoses,
            procedures,
        }))
    }

    async fn create_bill(&self, new_bill: NewBill) -> BillingResult<BillDetails> {
        let total_amount = new_bill.total_amount()?;
        let mut tx = self.transactions.begin().await?;

        let bill = sqlx::query_as::<_, Bill>(
            r#"
            INSERT INTO bill (patient_name, patient_dob, insurance_provider, policy_number,
                              total_amount, email, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&new_bill.patient_name)
        .bind(new_bill.patient_dob)
        .bind(&new_bill.insurance_provider)
        .bind(&new_bill.policy_number)
        .bind(total_amount)
        .bind(&new_bill.email)
        .bind(&new_bill.payment_method)
        .fetch_one(&mut *tx)
        .await?;

        let mut diagnoses = Vec::with_capacity(new_bill.diagnoses.len());
        for diagnosis in &new_bill.diagnoses {
            let row = sqlx::query_as::<_, Diagnosis>(
                "INSERT INTO diagnosis (bill_id, icd10_code, description, amount) VALUES ($1, $2, $3, $4) RETURNING *",
            )
            .bind(bill.id)
            .bind(&diagnosis.icd10_code)
            .bind(&diagnosis.description)
            .bind(diagnosis.amount)
            .fetch_one(&mut *tx)
            .await?;
            diagnoses.push(row);
        }

        let mut procedures = Vec::with_capacity(new_bill.procedures.len());
        for procedure in &new_bill.procedures {
            let row = sqlx::query_as::<_, Procedure>(
                "INSERT INTO procedure (bill_id, cpt_code, description, amount) VALUES ($1, $2, $3, $4) RETURNING *",
            )
            .bind(bill.id)
            .bind(&procedure.cpt_code)
            .bind(&procedure.description)
            .bind(procedure.amount)
            .fetch_one(&mut *tx)
            .await?;
            procedures.push(row);
        }

        tx.commit().await?;
        info!(bill_id = bill.id, "Bill created");

        Ok(BillDetails {
            bill,
            diagnoses,
            procedures,
        })
    }

    async fn delete_bill(&self, id: BillId) -> BillingResult<()> {
        let result = sqlx::query("DELETE FROM bill WHERE id = $1")
            .bind(id)
            .execute(self.pool.pool())
            .await
            .map_err(DatabaseError::from_query);

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(BillingError::NotFound("Bill".to_string())),
            Ok(_) => Ok(()),
            Err(DatabaseError::ForeignKeyViolation(_)) => Err(BillingError::Conflict(format!(
                "bill {} has insurance claims and cannot be deleted",
                id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn claims_for_bill(&self, id: BillId) -> BillingResult<Vec<InsuranceClaim>> {
        let claims = sqlx::query_as::<_, InsuranceClaim>(
            "SELECT * FROM insurance_claim WHERE bill_id = $1 ORDER BY submitted_at DESC, id DESC",
        )
        .bind(id)
        .fetch_all(self.pool.pool())
        .await?;
        Ok(claims)
    }

    async fn is_healthy(&self) -> bool {
        self.pool.is_healthy().await
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> BillingResult<Box<dyn ClaimTransaction>> {
        let tx = self.transactions.begin().await?;
        Ok(Box::new(PgClaimTransaction { tx }))
    }
}

struct PgClaimTransaction {
    tx: PgTransaction,
}

#[async_trait]
impl ClaimTransaction for PgClaimTransaction {
    async fn insert_claim(&mut self, claim: NewClaim) -> BillingResult<InsuranceClaim> {
        let row = sqlx::query_as::<_, InsuranceClaim>(
            r#"
            INSERT INTO insurance_claim (bill_id, payer_id, payer_name, subscriber_id, subscriber_name,
                                         subscriber_dob, relationship_to_subscriber, date_of_service,
                                         place_of_service, status, submitted_at, claim_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(claim.bill_id)
        .bind(&claim.payer_id)
        .bind(&claim.payer_name)
        .bind(&claim.subscriber_id)
        .bind(&claim.subscriber_name)
        .bind(claim.subscriber_dob)
        .bind(&claim.relationship_to_subscriber)
        .bind(claim.date_of_service)
        .bind(&claim.place_of_service)
        .bind(ClaimStatus::Pending.as_str())
        .bind(claim.submitted_at)
        .bind(&claim.claim_number)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn update_bill_claim(&mut self, bill_id: BillId, update: BillClaimUpdate) -> BillingResult<()> {
        sqlx::query(
            r#"
            UPDATE bill
            SET claim_status = $2,
                claim_submission_date = COALESCE($3, claim_submission_date),
                claim_number = COALESCE($4, claim_number)
            WHERE id = $1
            "#,
        )
        .bind(bill_id)
        .bind(update.status.as_str())
        .bind(update.submission_date)
        .bind(update.claim_number)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn finish_claim(&mut self, claim_id: ClaimId, status: ClaimStatus, response_message: &str) -> BillingResult<()> {
        sqlx::query("UPDATE insurance_claim SET status = $2, response_message = $3 WHERE id = $1")
            .bind(claim_id)
            .bind(status.as_str())
            .bind(response_message)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> BillingResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> BillingResult<()> {
        self.tx.rollback().await?;
        debug!("Claim transaction rolled back");
        Ok(())
    }
}
