use crate::error::{BillingError, BillingResult};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

pub type BillId = i64;
pub type ClaimId = i64;

/// Largest value a `NUMERIC(10, 2)` money column holds: 99,999,999.99
// mantissa 9_999_999_999 = 2 * 2^32 + 1_410_065_407
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Sum money amounts, `None` on overflow
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
}

/// Patient bill with payment and insurance-claim state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Bill {
    pub id: BillId,
    pub patient_name: String,
    pub patient_dob: NaiveDate,
    pub insurance_provider: Option<String>,
    pub policy_number: Option<String>,
    pub total_amount: Decimal,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub payment_status: String,
    pub payment_method: Option<String>,

    // Crypto payment
    pub transaction_hash: Option<String>,
    pub payment_currency: Option<String>,
    pub crypto_amount: Option<Decimal>,

    // Bank transfer
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub routing_number: Option<String>,
    pub bank_currency: Option<String>,
    pub bank_exchange_rate: Option<Decimal>,

    #[sqlx(try_from = "String")]
    pub claim_status: ClaimStatus,
    pub claim_submission_date: Option<DateTime<Utc>>,
    pub claim_number: Option<String>,
}

impl Bill {
    /// A claim can only be filed against a bill that names an insurer.
    pub fn has_insurance(&self) -> bool {
        self.insurance_provider
            .as_deref()
            .is_some_and(|provider| !provider.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Diagnosis {
    pub id: i64,
    pub bill_id: BillId,
    pub icd10_code: String,
    pub description: Option<String>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Procedure {
    pub id: i64,
    pub bill_id: BillId,
    pub cpt_code: String,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// Insurance claim filed against a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct InsuranceClaim {
    pub id: ClaimId,
    pub bill_id: BillId,
    pub payer_id: String,
    pub payer_name: String,
    pub subscriber_id: String,
    pub subscriber_name: String,
    pub subscriber_dob: NaiveDate,
    pub relationship_to_subscriber: String,
    pub date_of_service: NaiveDate,
    pub place_of_service: String,
    #[sqlx(try_from = "String")]
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
    pub claim_number: Option<String>,
    pub response_message: Option<String>,
}

/// Claim lifecycle: `pending` until the clearinghouse answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    #[default]
    Pending,
    Submitted,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Submitted => "submitted",
            ClaimStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown claim status: {0}")]
pub struct UnknownClaimStatus(pub String);

impl FromStr for ClaimStatus {
    type Err = UnknownClaimStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "submitted" => Ok(ClaimStatus::Submitted),
            "failed" => Ok(ClaimStatus::Failed),
            other => Err(UnknownClaimStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ClaimStatus {
    type Error = UnknownClaimStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A bill together with its line items
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BillDetails {
    #[serde(flatten)]
    pub bill: Bill,
    pub diagnoses: Vec<Diagnosis>,
    pub procedures: Vec<Procedure>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewDiagnosis {
    pub icd10_code: String,
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProcedure {
    pub cpt_code: String,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// Bill to be created, with its line items
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewBill {
    pub patient_name: String,
    pub patient_dob: NaiveDate,
    pub insurance_provider: Option<String>,
    pub policy_number: Option<String>,
    pub email: String,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub diagnoses: Vec<NewDiagnosis>,
    #[serde(default)]
    pub procedures: Vec<NewProcedure>,
}

impl NewBill {
    /// Bill total: every diagnosis charge plus every procedure charge.
    ///
    /// # Errors
    ///
    /// [`BillingError::Validation`] when the total does not fit the bill's
    /// money column.
    pub fn total_amount(&self) -> BillingResult<Decimal> {
        let amounts = self
            .diagnoses
            .iter()
            .map(|d| d.amount)
            .chain(self.procedures.iter().map(|p| p.amount));

        match checked_total(amounts).map(|total| total.round_dp(2)) {
            Some(total) if total.abs() <= MAX_AMOUNT => Ok(total),
            _ => Err(BillingError::Validation(format!(
                "Bill total cannot exceed {}",
                MAX_AMOUNT
            ))),
        }
    }
}

/// Claim row as first written, before the clearinghouse has answered
#[derive(Debug, Clone)]
pub struct NewClaim {
    pub bill_id: BillId,
    pub payer_id: String,
    pub payer_name: String,
    pub subscriber_id: String,
    pub subscriber_name: String,
    pub subscriber_dob: NaiveDate,
    pub relationship_to_subscriber: String,
    pub date_of_service: NaiveDate,
    pub place_of_service: String,
    pub claim_number: String,
    pub submitted_at: DateTime<Utc>,
}

/// Change to a bill's claim fields. `None` leaves the column untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BillClaimUpdate {
    pub status: ClaimStatus,
    pub submission_date: Option<DateTime<Utc>>,
    pub claim_number: Option<String>,
}

impl BillClaimUpdate {
    pub fn submitted(claim_number: &str, at: DateTime<Utc>) -> Self {
        Self {
            status: ClaimStatus::Submitted,
            submission_date: Some(at),
            claim_number: Some(claim_number.to_string()),
        }
    }

    pub fn status(status: ClaimStatus) -> Self {
        Self {
            status,
            submission_date: None,
            claim_number: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_status_round_trips_through_text() {
        for status in [ClaimStatus::Pending, ClaimStatus::Submitted, ClaimStatus::Failed] {
            assert_eq!(status.as_str().parse::<ClaimStatus>().unwrap(), status);
        }
        assert!("accepted".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn new_bill_total_sums_all_line_items() {
        let bill = NewBill {
            patient_name: "Jane Doe".to_string(),
            patient_dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            insurance_provider: Some("Aetna".to_string()),
            policy_number: None,
            email: "jane@example.com".to_string(),
            payment_method: None,
            diagnoses: vec![NewDiagnosis {
                icd10_code: "J10.1".to_string(),
                description: None,
                amount: Decimal::new(2500, 2),
            }],
            procedures: vec![
                NewProcedure {
                    cpt_code: "99213".to_string(),
                    description: None,
                    amount: Decimal::new(15000, 2),
                },
                NewProcedure {
                    cpt_code: "87804".to_string(),
                    description: None,
                    amount: Decimal::new(7550, 2),
                },
            ],
        };

        assert_eq!(bill.total_amount().unwrap(), Decimal::new(25050, 2));
    }

    #[test]
    fn oversized_total_is_a_validation_error() {
        let huge = Decimal::MAX;
        let bill = NewBill {
            patient_name: "Jane Doe".to_string(),
            patient_dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            insurance_provider: None,
            policy_number: None,
            email: "jane@example.com".to_string(),
            payment_method: None,
            diagnoses: vec![],
            procedures: vec![
                NewProcedure {
                    cpt_code: "99213".to_string(),
                    description: None,
                    amount: huge,
                },
                NewProcedure {
                    cpt_code: "99214".to_string(),
                    description: None,
                    amount: huge,
                },
            ],
        };

        assert!(matches!(bill.total_amount(), Err(BillingError::Validation(_))));

        let mut fits = bill;
        fits.procedures.truncate(1);
        fits.procedures[0].amount = MAX_AMOUNT;
        assert_eq!(fits.total_amount().unwrap(), MAX_AMOUNT);
        fits.procedures[0].amount = MAX_AMOUNT + Decimal::new(1, 2);
        assert!(fits.total_amount().is_err());
    }

    #[test]
    fn max_amount_matches_money_column() {
        assert_eq!(MAX_AMOUNT.to_string(), "99999999.99");
    }

    #[test]
    fn checked_total_reports_overflow() {
        assert_eq!(checked_total([Decimal::ONE, Decimal::TWO]), Some(Decimal::new(3, 0)));
        assert_eq!(checked_total([Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn bill_without_provider_has_no_insurance() {
        let mut bill = crate::store::memory::tests::sample_bill(1);
        bill.insurance_provider = Some("   ".to_string());
        assert!(!bill.has_insurance());
        bill.insurance_provider = Some("Aetna".to_string());
        assert!(bill.has_insurance());
    }
}
