//! Logging with automatic PII redaction for BillingDog Engine
//!
//! Billing logs routinely touch patient names, member ids, email addresses
//! and client addresses. This crate owns two things:
//!
//! - [`PiiRedactor`]: regex based redaction of emails, phone numbers, SSNs,
//!   card numbers, IP addresses and the subscriber segment of EDI 837
//!   interchanges. Redacted values can be hashed so repeated occurrences
//!   still correlate across log lines.
//! - [`init`]: installs the global `tracing` subscriber, pretty for
//!   development and JSON for production.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{redact, PiiRedactor, RedactionConfig};
//!
//! let line = redact("NM1*IL*1*Doe*John****MI*W000123");
//! assert!(!line.contains("Doe"));
//!
//! let redactor = PiiRedactor::new(RedactionConfig {
//!     hash_for_correlation: false,
//!     ..Default::default()
//! });
//! assert_eq!(redactor.redact("from 10.0.0.7"), "from 10.***.***.7");
//! ```

pub mod config;
pub mod macros;
pub mod redactor;
pub mod subscriber;

pub use config::*;
pub use redactor::*;
pub use subscriber::{init, LoggerError};
