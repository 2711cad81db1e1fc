//! PDF invoice rendering.

use crate::error::{BillingError, BillingResult};
use crate::models::{checked_total, BillDetails};
use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use rust_decimal::Decimal;
use std::io::BufWriter;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: Mm = Mm(280.0);
const BOTTOM_MARGIN: f32 = 25.0;

/// Render the patient invoice for a bill.
///
/// # Errors
///
/// Returns [`BillingError::Invoice`] if the PDF cannot be assembled.
pub fn render_invoice(details: &BillDetails, generated_at: DateTime<Utc>) -> BillingResult<Vec<u8>> {
    let bill = &details.bill;
    let title = format!("BillingDog Invoice #{}", bill.id);
    let mut page = InvoicePage::new(&title)?;

    page.text("BillingDog", 24.0, Mm(20.0), Style::Bold);
    page.advance(8.0);
    page.text("Healthcare Billing Report", 12.0, Mm(20.0), Style::Regular);
    page.advance(14.0);

    page.text("Patient Information", 14.0, Mm(20.0), Style::Bold);
    page.advance(7.0);
    page.text(format!("Name: {}", bill.patient_name), 11.0, Mm(20.0), Style::Regular);
    page.advance(6.0);
    page.text(
        format!("DOB: {}", bill.patient_dob.format("%m/%d/%Y")),
        11.0,
        Mm(20.0),
        Style::Regular,
    );
    page.advance(6.0);
    page.text(
        format!("Insurance: {}", bill.insurance_provider.as_deref().unwrap_or("Self Pay")),
        11.0,
        Mm(20.0),
        Style::Regular,
    );
    page.advance(6.0);
    if let Some(policy) = &bill.policy_number {
        page.text(format!("Policy Number: {}", policy), 11.0, Mm(20.0), Style::Regular);
        page.advance(6.0);
    }
    if let Some(claim_number) = &bill.claim_number {
        page.text(
            format!("Claim: {} ({})", claim_number, bill.claim_status),
            11.0,
            Mm(20.0),
            Style::Regular,
        );
        page.advance(6.0);
    }
    page.advance(8.0);

    page.section("Diagnoses", "ICD-10 Code");
    for diagnosis in &details.diagnoses {
        page.row(&diagnosis.icd10_code, diagnosis.description.as_deref(), diagnosis.amount);
    }
    page.advance(8.0);

    page.section("Procedures and Charges", "CPT Code");
    for procedure in &details.procedures {
        page.row(&procedure.cpt_code, procedure.description.as_deref(), procedure.amount);
    }
    page.advance(10.0);

    let diagnoses_total = checked_total(details.diagnoses.iter().map(|d| d.amount))
        .ok_or_else(|| BillingError::Invoice("diagnosis subtotal overflows".to_string()))?;
    let procedures_total = checked_total(details.procedures.iter().map(|p| p.amount))
        .ok_or_else(|| BillingError::Invoice("procedure subtotal overflows".to_string()))?;
    page.text(
        format!("Diagnoses Subtotal: {}", money(diagnoses_total)),
        11.0,
        Mm(120.0),
        Style::Regular,
    );
    page.advance(6.0);
    page.text(
        format!("Procedures Subtotal: {}", money(procedures_total)),
        11.0,
        Mm(120.0),
        Style::Regular,
    );
    page.advance(7.0);
    page.text(
        format!("Total Amount: {}", money(bill.total_amount)),
        13.0,
        Mm(120.0),
        Style::Bold,
    );

    page.footer(generated_at);
    page.finish()
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[derive(Clone, Copy)]
enum Style {
    Regular,
    Bold,
}

struct InvoicePage {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: Mm,
}

impl InvoicePage {
    fn new(title: &str) -> BillingResult<Self> {
        let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| BillingError::Invoice(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| BillingError::Invoice(format!("PDF font error: {e}")))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
        })
    }

    fn text(&self, text: impl Into<String>, size: f32, x: Mm, style: Style) {
        let font = match style {
            Style::Regular => &self.regular,
            Style::Bold => &self.bold,
        };
        self.layer.use_text(text, size, x, self.y, font);
    }

    /// Move down, starting a new page when the bottom margin is reached.
    fn advance(&mut self, mm: f32) {
        self.y -= Mm(mm);
        if self.y.0 < BOTTOM_MARGIN {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn section(&mut self, heading: &str, code_label: &str) {
        self.text(heading, 14.0, Mm(20.0), Style::Bold);
        self.advance(7.0);
        self.text(code_label, 10.0, Mm(20.0), Style::Bold);
        self.text("Description", 10.0, Mm(50.0), Style::Bold);
        self.text("Amount", 10.0, Mm(170.0), Style::Bold);
        self.advance(6.0);
    }

    fn row(&mut self, code: &str, description: Option<&str>, amount: Decimal) {
        self.text(code, 10.0, Mm(20.0), Style::Regular);
        self.text(truncate(description.unwrap_or(""), 60), 10.0, Mm(50.0), Style::Regular);
        self.text(money(amount), 10.0, Mm(170.0), Style::Regular);
        self.advance(5.0);
    }

    fn footer(&self, generated_at: DateTime<Utc>) {
        self.layer.use_text(
            "This is a computer-generated document and does not require a signature.",
            9.0,
            Mm(20.0),
            Mm(18.0),
            &self.regular,
        );
        self.layer.use_text(
            format!("Generated on: {}", generated_at.format("%m/%d/%Y %H:%M:%S")),
            9.0,
            Mm(20.0),
            Mm(11.0),
            &self.regular,
        );
        self.layer.use_text(
            "BillingDog Healthcare Billing System",
            9.0,
            Mm(130.0),
            Mm(11.0),
            &self.regular,
        );
    }

    fn finish(self) -> BillingResult<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| BillingError::Invoice(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| BillingError::Invoice(format!("PDF buffer error: {e}")))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diagnosis, Procedure};
    use crate::store::memory::tests::sample_bill;

    fn details(procedures: usize) -> BillDetails {
        BillDetails {
            bill: sample_bill(42),
            diagnoses: vec![Diagnosis {
                id: 1,
                bill_id: 42,
                icd10_code: "J10.1".to_string(),
                description: Some("Influenza".to_string()),
                amount: Decimal::new(2500, 2),
            }],
            procedures: (0..procedures)
                .map(|i| Procedure {
                    id: i64::try_from(i).unwrap() + 10,
                    bill_id: 42,
                    cpt_code: "99213".to_string(),
                    description: Some("Office visit, established patient".to_string()),
                    amount: Decimal::new(15000, 2),
                })
                .collect(),
        }
    }

    #[test]
    fn renders_pdf_bytes() {
        let bytes = render_invoice(&details(2), Utc::now()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_bills_spill_onto_more_pages() {
        let short = render_invoice(&details(1), Utc::now()).unwrap();
        let long = render_invoice(&details(120), Utc::now()).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(Decimal::new(1505, 1)), "$150.50");
        assert_eq!(money(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}
