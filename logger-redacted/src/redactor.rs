use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

mod patterns {
    #![allow(clippy::unwrap_used)]

    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
        pub static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+1[-.\s]?)?\(?\b([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})\b").unwrap();
        pub static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
        pub static ref CREDIT_CARD_REGEX: Regex = Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap();
        pub static ref IP_REGEX: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();
        // Subscriber segment of an 837 interchange: NM1*IL*1*{last}*{first}****MI*{member id}
        pub static ref EDI_SUBSCRIBER_REGEX: Regex = Regex::new(r"NM1\*IL\*1\*([^*\n]*)\*([^*\n]*)\*\*\*\*MI\*([^*~\n]*)").unwrap();
    }
}

use patterns::{CREDIT_CARD_REGEX, EDI_SUBSCRIBER_REGEX, EMAIL_REGEX, IP_REGEX, PHONE_REGEX, SSN_REGEX};

lazy_static! {
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// Redact `text` with the default configuration.
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_credit_cards: bool,
    pub redact_ip_addresses: bool,
    pub redact_edi_subscribers: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl RedactionConfig {
    pub fn with_custom_pattern(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_credit_cards: true,
            redact_ip_addresses: true,
            redact_edi_subscribers: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log messages
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        // EDI first: member ids inside the segment would otherwise be mangled by the digit patterns
        if self.config.redact_edi_subscribers {
            result = self.redact_edi_subscribers(&result);
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_ssn {
            result = self.redact_ssn(&result);
        }

        if self.config.redact_credit_cards {
            result = self.redact_credit_cards(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_edi_subscribers(&self, text: &str) -> String {
        EDI_SUBSCRIBER_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                if self.config.hash_for_correlation {
                    format!("NM1*IL*1*[NAME]*[NAME]****MI*ID[{}]", self.hash_value(&caps[3]))
                } else {
                    "NM1*IL*1*[NAME]*[NAME]****MI*[ID]".to_string()
                }
            })
            .to_string()
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", self.hash_value(email))
                } else {
                    match email.split_once('@') {
                        Some((local, domain)) => format!(
                            "{}***@{}***",
                            local.chars().next().unwrap_or('*'),
                            domain.chars().next().unwrap_or('*')
                        ),
                        None => "***@***.com".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", self.hash_value(&caps[0]))
                } else {
                    "(***) ***-****".to_string()
                }
            })
            .to_string()
    }

    fn redact_ssn(&self, text: &str) -> String {
        SSN_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                if self.config.hash_for_correlation {
                    format!("SSN[{}]", self.hash_value(&caps[0]))
                } else {
                    "***-**-****".to_string()
                }
            })
            .to_string()
    }

    fn redact_credit_cards(&self, text: &str) -> String {
        CREDIT_CARD_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                if self.config.hash_for_correlation {
                    format!("CC[{}]", self.hash_value(&caps[0]))
                } else {
                    "****-****-****-****".to_string()
                }
            })
            .to_string()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        IP_REGEX
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let ip = &caps[0];
                if self.config.hash_for_correlation {
                    format!("IP[{}]", self.hash_value(ip))
                } else {
                    let parts: Vec<&str> = ip.split('.').collect();
                    match (parts.first(), parts.last()) {
                        (Some(first), Some(last)) if parts.len() == 4 => {
                            format!("{first}.***.***.{last}")
                        }
                        _ => "***.***.***.***".to_string(),
                    }
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        let result = hasher.finalize();
        general_purpose::STANDARD.encode(&result[..8]) // first 8 bytes keep the tag short
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = plain().redact("Invoice sent to john.doe@example.com");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("john.doe"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = plain().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
    }

    #[test]
    fn test_ip_redaction_keeps_outer_octets() {
        let redacted = plain().redact("client=192.168.1.100 rejected");
        assert_eq!(redacted, "client=192.***.***.100 rejected");
    }

    #[test]
    fn test_edi_subscriber_redaction() {
        let edi = "ST*837*0001*005010X222A1\nNM1*IL*1*Doe*John****MI*W123456789\nNM1*85*2*BILLINGDOG HEALTHCARE*****XX*1234567890";
        let redacted = plain().redact(edi);
        assert!(redacted.contains("NM1*IL*1*[NAME]*[NAME]****MI*[ID]"));
        assert!(!redacted.contains("Doe"));
        assert!(!redacted.contains("W123456789"));
        // billing provider segment is not PHI
        assert!(redacted.contains("NM1*85*2*BILLINGDOG HEALTHCARE"));
    }

    #[test]
    fn test_hashed_values_correlate() {
        let redactor = PiiRedactor::new(RedactionConfig::default());
        let first = redactor.redact("jane@example.org");
        let second = redactor.redact("jane@example.org");
        assert_eq!(first, second);
        assert!(first.starts_with("EMAIL["));
    }

    #[test]
    fn test_custom_pattern() {
        let config = RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        }
        .with_custom_pattern(Regex::new(r"POL-\d+").unwrap(), "POL-[REDACTED]");
        let redacted = PiiRedactor::new(config).redact("policy POL-99812 on file");
        assert_eq!(redacted, "policy POL-[REDACTED] on file");
    }
}
