//! Request validation utilities for consistent validation across handlers
//!
//! This module provides a `RequestValidation` trait and helper macros to
//! centralize validation logic and ensure consistent error messages.

use crate::error::ApiError;
use billing_service::{BillId, ClaimSubmission, NewBill, MAX_AMOUNT};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Trait for validating request payloads
///
/// Implement this trait for all create request types so handlers reject
/// bad input with the same 400 envelope.
pub trait RequestValidation {
    /// Validates the request and returns an error if validation fails
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] naming the first offending field.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Macro for validating fields with custom predicates
///
/// # Usage
///
/// ```rust,ignore
/// validate_field!(self.email, self.email.contains('@'), "Invalid email format");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Macro for validating required fields (non-empty strings)
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Macro for validating string length in characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Macro for validating email format (basic check)
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, $field.contains('@') && $field.contains('.'), $message);
    };
}

fn validate_amount(amount: Decimal, what: &str) -> Result<(), ApiError> {
    validate_field!(
        amount,
        amount >= Decimal::ZERO,
        format!("{} amount cannot be negative", what)
    );
    validate_field!(
        amount,
        amount <= MAX_AMOUNT,
        format!("{} amount cannot exceed {}", what, MAX_AMOUNT)
    );
    validate_field!(
        amount,
        amount.normalize().scale() <= 2,
        format!("{} amount cannot have more than 2 decimal places", what)
    );
    Ok(())
}

fn validate_optional(value: Option<&String>, max: usize, message: &str) -> Result<(), ApiError> {
    if let Some(value) = value {
        validate_field!(value, value.chars().count() <= max, message);
    }
    Ok(())
}

impl RequestValidation for NewBill {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.patient_name, "Patient name is required");
        validate_length!(self.patient_name, 1, 100, "Patient name must be at most 100 characters");
        validate_email!(self.email, "Invalid email format");
        validate_length!(self.email, 1, 120, "Email must be at most 120 characters");
        validate_optional(
            self.insurance_provider.as_ref(),
            100,
            "Insurance provider must be at most 100 characters",
        )?;
        validate_optional(
            self.policy_number.as_ref(),
            50,
            "Policy number must be at most 50 characters",
        )?;

        if let Some(method) = &self.payment_method {
            validate_field!(
                method,
                matches!(method.as_str(), "crypto" | "bank"),
                "Payment method must be 'crypto' or 'bank'"
            );
        }

        for diagnosis in &self.diagnoses {
            validate_required!(diagnosis.icd10_code, "ICD-10 code is required");
            validate_length!(diagnosis.icd10_code, 1, 10, "ICD-10 code must be at most 10 characters");
            validate_optional(
                diagnosis.description.as_ref(),
                200,
                "Diagnosis description must be at most 200 characters",
            )?;
            validate_amount(diagnosis.amount, "Diagnosis")?;
        }

        for procedure in &self.procedures {
            validate_required!(procedure.cpt_code, "CPT code is required");
            validate_length!(procedure.cpt_code, 1, 10, "CPT code must be at most 10 characters");
            validate_optional(
                procedure.description.as_ref(),
                200,
                "Procedure description must be at most 200 characters",
            )?;
            validate_amount(procedure.amount, "Procedure")?;
        }

        self.total_amount()?;
        Ok(())
    }
}

/// Body of `POST /api/submit_claim`
///
/// Every field is optional at the wire level so missing fields produce a
/// precise 400 instead of a generic deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimRequest {
    /// Bill id, as a number or a numeric string
    #[schema(value_type = Option<i64>, example = 42)]
    pub bill_id: Option<Value>,
    #[schema(example = "60054")]
    pub payer_id: Option<String>,
    #[schema(example = "Aetna")]
    pub payer_name: Option<String>,
    pub subscriber_id: Option<String>,
    #[schema(example = "John Doe")]
    pub subscriber_name: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(rename = "subscriberDOB")]
    pub subscriber_dob: Option<String>,
    pub relationship_to_subscriber: Option<String>,
    /// `YYYY-MM-DD`
    pub date_of_service: Option<String>,
    /// Two-character place of service code
    #[schema(example = "11")]
    pub place_of_service: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::validation(format!("Missing required field: {}", field))),
    }
}

/// Required field of at most `max` characters
fn bounded<'a>(value: &'a Option<String>, field: &str, max: usize) -> Result<&'a str, ApiError> {
    let value = required(value, field)?;
    validate_length!(
        value,
        1,
        max,
        format!("{} must be at most {} characters", field, max)
    );
    Ok(value)
}

fn date(value: &Option<String>, field: &str) -> Result<NaiveDate, ApiError> {
    let raw = required(value, field)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::validation(format!("Invalid date for {}: expected YYYY-MM-DD", field))
    })
}

impl SubmitClaimRequest {
    /// The bill the claim is filed against.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] "Missing bill ID" when absent, null, blank
    /// or `0`, and a separate message when it is not an integer.
    pub fn bill_id(&self) -> Result<BillId, ApiError> {
        let id = match &self.bill_id {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_i64() {
                Some(id) => Some(id),
                None => return Err(ApiError::validation("Bill ID must be an integer")),
            },
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => return Err(ApiError::validation("Bill ID must be an integer")),
            },
            Some(_) => return Err(ApiError::validation("Bill ID must be an integer")),
        };

        // 0 is what an unset form field posts
        match id {
            None | Some(0) => Err(ApiError::validation("Missing bill ID")),
            Some(id) => Ok(id),
        }
    }

    /// Validate and convert into the workflow's typed request.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] for a missing bill id, a missing or blank
    /// field, a field longer than its column, or an unparseable date.
    pub fn into_submission(self) -> Result<ClaimSubmission, ApiError> {
        let bill_id = self.bill_id()?;

        Ok(ClaimSubmission {
            bill_id,
            payer_id: bounded(&self.payer_id, "payerId", 50)?.to_string(),
            payer_name: bounded(&self.payer_name, "payerName", 100)?.to_string(),
            subscriber_id: bounded(&self.subscriber_id, "subscriberId", 50)?.to_string(),
            subscriber_name: bounded(&self.subscriber_name, "subscriberName", 100)?.to_string(),
            subscriber_dob: date(&self.subscriber_dob, "subscriberDOB")?,
            relationship_to_subscriber: bounded(
                &self.relationship_to_subscriber,
                "relationshipToSubscriber",
                20,
            )?
            .to_string(),
            date_of_service: date(&self.date_of_service, "dateOfService")?,
            place_of_service: bounded(&self.place_of_service, "placeOfService", 2)?.to_string(),
        })
    }
}

impl RequestValidation for SubmitClaimRequest {
    fn validate(&self) -> Result<(), ApiError> {
        self.clone().into_submission().map(|_| ())
    }
}
