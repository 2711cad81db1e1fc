//! Billing Service for BillingDog
//!
//! Provides:
//! - Bill, diagnosis, procedure and insurance-claim models
//! - Persistence behind [`BillingStore`] (in-memory or PostgreSQL)
//! - 837-style claim encoding ([`edi`])
//! - The claim submission workflow with a pluggable [`Clearinghouse`]
//! - PDF invoices

pub mod clearinghouse;
pub mod edi;
pub mod error;
pub mod invoice;
pub mod models;
pub mod store;
pub mod submission;

pub use clearinghouse::*;
pub use edi::{encode_claim, EdiInterchange};
pub use error::*;
pub use invoice::render_invoice;
pub use models::*;
pub use store::{BillingStore, ClaimTransaction, MemoryStore, PgBillingStore};
pub use submission::*;
