//! X12 837-style claim encoding.
//!
//! The interchange is a fabricated professional claim: the envelope, the
//! subscriber and billing-provider loops, and one `LX`/`SV1` pair per billed
//! procedure. Segments are newline separated. Free-text fields are written
//! as-is; delimiter characters inside them are not escaped.

use crate::error::{BillingError, BillingResult};
use crate::models::{InsuranceClaim, Procedure};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

pub const BILLING_PROVIDER_SEGMENT: &str = "NM1*85*2*BILLINGDOG HEALTHCARE*****XX*1234567890";

/// Segments between the interchange header and the first service line
pub const HEADER_SEGMENTS: usize = 6;

/// An encoded claim interchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdiInterchange {
    segments: Vec<String>,
}

impl EdiInterchange {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Count written into the `SE` trailer
    pub fn transaction_segment_count(&self) -> usize {
        self.segments.len().saturating_sub(3)
    }
}

impl fmt::Display for EdiInterchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("\n"))
    }
}

/// Encode a claim and the bill's procedures as of `now`.
///
/// # Errors
///
/// Returns [`BillingError::MalformedName`] when the subscriber name does not
/// have at least a first and a last token.
pub fn encode_claim(
    claim: &InsuranceClaim,
    procedures: &[Procedure],
    now: DateTime<Utc>,
) -> BillingResult<EdiInterchange> {
    let (first, last) = split_subscriber_name(&claim.subscriber_name)?;

    let short_date = now.format("%y%m%d");
    let date = now.format("%Y%m%d");
    let time = now.format("%H%M");
    let claim_number = claim.claim_number.as_deref().unwrap_or_default();

    let mut segments = Vec::with_capacity(HEADER_SEGMENTS + 2 * procedures.len() + 3);
    segments.push(format!(
        "ISA*00*          *00*          *ZZ*{}*ZZ*BILLING  *{}*{}*^*00501*000000001*0*P*>",
        claim.payer_id, short_date, time
    ));
    segments.push(format!(
        "GS*HC*{}*BILLING*{}*{}*1*X*005010X222A1",
        claim.payer_id, date, time
    ));
    segments.push("ST*837*0001*005010X222A1".to_string());
    segments.push(format!("BHT*0019*00*{}*{}*{}*CH", claim_number, date, time));
    segments.push(format!(
        "NM1*IL*1*{}*{}****MI*{}",
        last, first, claim.subscriber_id
    ));
    segments.push(BILLING_PROVIDER_SEGMENT.to_string());

    for (line, procedure) in procedures.iter().enumerate() {
        segments.push(format!("LX*{}", line + 1));
        segments.push(format!(
            "SV1*HC:{}*{}*UN*1***1",
            procedure.cpt_code,
            format_amount(procedure.amount)
        ));
    }

    segments.push(format!("SE*{}*0001", segments.len()));
    segments.push("GE*1*1".to_string());
    segments.push("IEA*1*000000001".to_string());

    Ok(EdiInterchange { segments })
}

/// First whitespace token is the first name, second is the last name.
/// Any further tokens are ignored.
fn split_subscriber_name(name: &str) -> BillingResult<(&str, &str)> {
    let mut tokens = name.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(BillingError::MalformedName(format!(
            "subscriber name needs a first and last name, got {} token(s)",
            name.split_whitespace().count()
        ))),
    }
}

/// Render a charge with trailing zeros dropped but at least one fractional digit.
pub fn format_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        format!("{}.0", normalized)
    } else {
        normalized.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClaimStatus;
    use chrono::{NaiveDate, TimeZone};

    fn claim(subscriber_name: &str) -> InsuranceClaim {
        InsuranceClaim {
            id: 1,
            bill_id: 42,
            payer_id: "60054".to_string(),
            payer_name: "Aetna".to_string(),
            subscriber_id: "W123456789".to_string(),
            subscriber_name: subscriber_name.to_string(),
            subscriber_dob: NaiveDate::from_ymd_opt(1980, 5, 17).unwrap(),
            relationship_to_subscriber: "self".to_string(),
            date_of_service: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            place_of_service: "11".to_string(),
            status: ClaimStatus::Pending,
            submitted_at: Utc.with_ymd_and_hms(2024, 3, 4, 14, 5, 0).unwrap(),
            claim_number: Some("CLM-20240304-42".to_string()),
            response_message: None,
        }
    }

    fn procedure(cpt_code: &str, amount: Decimal) -> Procedure {
        Procedure {
            id: 1,
            bill_id: 42,
            cpt_code: cpt_code.to_string(),
            description: None,
            amount,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 14, 5, 0).unwrap()
    }

    #[test]
    fn encodes_full_interchange() {
        let procedures = vec![
            procedure("99213", Decimal::new(15000, 2)),
            procedure("87804", Decimal::new(7550, 2)),
        ];
        let edi = encode_claim(&claim("Jane Doe"), &procedures, now()).unwrap();

        let expected = [
            "ISA*00*          *00*          *ZZ*60054*ZZ*BILLING  *240304*1405*^*00501*000000001*0*P*>",
            "GS*HC*60054*BILLING*20240304*1405*1*X*005010X222A1",
            "ST*837*0001*005010X222A1",
            "BHT*0019*00*CLM-20240304-42*20240304*1405*CH",
            "NM1*IL*1*Doe*Jane****MI*W123456789",
            "NM1*85*2*BILLINGDOG HEALTHCARE*****XX*1234567890",
            "LX*1",
            "SV1*HC:99213*150.0*UN*1***1",
            "LX*2",
            "SV1*HC:87804*75.5*UN*1***1",
            "SE*10*0001",
            "GE*1*1",
            "IEA*1*000000001",
        ];
        assert_eq!(edi.segments(), expected);
        assert_eq!(edi.to_string(), expected.join("\n"));
    }

    #[test]
    fn two_segments_per_procedure() {
        for count in 0..6 {
            let procedures: Vec<Procedure> = (0..count)
                .map(|i| procedure(&format!("9921{}", i), Decimal::new(1000, 2)))
                .collect();
            let edi = encode_claim(&claim("Jane Doe"), &procedures, now()).unwrap();

            assert_eq!(edi.transaction_segment_count(), HEADER_SEGMENTS + 2 * count);
            assert_eq!(edi.segments().len(), HEADER_SEGMENTS + 2 * count + 3);
            let trailer = format!("SE*{}*0001", HEADER_SEGMENTS + 2 * count);
            assert_eq!(edi.segments()[HEADER_SEGMENTS + 2 * count], trailer);
        }
    }

    #[test]
    fn single_token_name_is_malformed() {
        let err = encode_claim(&claim("Cher"), &[], now()).unwrap_err();
        assert!(matches!(err, BillingError::MalformedName(_)));

        let err = encode_claim(&claim("   "), &[], now()).unwrap_err();
        assert!(matches!(err, BillingError::MalformedName(_)));
    }

    #[test]
    fn extra_name_tokens_are_ignored() {
        let edi = encode_claim(&claim("Mary Ann Smith"), &[], now()).unwrap();
        assert_eq!(edi.segments()[4], "NM1*IL*1*Ann*Mary****MI*W123456789");
    }

    #[test]
    fn amounts_keep_one_fractional_digit() {
        assert_eq!(format_amount(Decimal::new(15000, 2)), "150.0");
        assert_eq!(format_amount(Decimal::new(7550, 2)), "75.5");
        assert_eq!(format_amount(Decimal::new(1999, 2)), "19.99");
        assert_eq!(format_amount(Decimal::ZERO), "0.0");
    }
}
