//! Domain model for a single-use redemption code.
use chrono::{DateTime, Utc};
use shared::CodeType;

use super::scope::Scope;

#[derive(Debug, Clone, PartialEq)]
pub struct DomainCode {
    pub value: String,
    pub code_type: CodeType,
    /// Opaque rendering (SVG for QR and barcodes, empty for digital codes)
    pub content: Vec<u8>,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
    pub expiration: DateTime<Utc>,
    pub owner_id: i64,
    pub scope: Scope,
}

impl DomainCode {
    /// Build the opaque value `T:{1|2}-N:{scope_id}-U:{owner_id}-{suffix}`
    pub fn generate_value(scope: Scope, owner_id: i64, suffix: u32) -> String {
        format!("T:{}-N:{}-U:{}-{}", scope.type_tag(), scope.id(), owner_id, suffix)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// A code can be redeemed iff it was never consumed and has not expired
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_valid && !self.is_expired_at(now)
    }
}

pub fn code_type_to_str(code_type: CodeType) -> &'static str {
    match code_type {
        CodeType::Qr => "qr",
        CodeType::Barcode => "barcode",
        CodeType::Digital => "digital",
    }
}

pub fn code_type_from_str(value: &str) -> Option<CodeType> {
    match value {
        "qr" => Some(CodeType::Qr),
        "barcode" => Some(CodeType::Barcode),
        "digital" => Some(CodeType::Digital),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample(now: DateTime<Utc>) -> DomainCode {
        DomainCode {
            value: DomainCode::generate_value(Scope::Goal(42), 9, 123456),
            code_type: CodeType::Qr,
            content: Vec::new(),
            is_valid: true,
            created_at: now,
            expiration: now + Duration::seconds(300),
            owner_id: 9,
            scope: Scope::Goal(42),
        }
    }

    #[test]
    fn value_follows_the_published_format() {
        assert_eq!(
            DomainCode::generate_value(Scope::Goal(42), 9, 123456),
            "T:1-N:42-U:9-123456"
        );
        assert_eq!(
            DomainCode::generate_value(Scope::Organization(8), 5, 654321),
            "T:2-N:8-U:5-654321"
        );
    }

    #[test]
    fn expiry_is_exclusive_of_the_expiration_instant() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let code = sample(now);

        assert!(code.is_redeemable_at(now));
        assert!(code.is_redeemable_at(now + Duration::seconds(299)));
        assert!(!code.is_redeemable_at(now + Duration::seconds(300)));
    }

    #[test]
    fn invalid_code_is_never_redeemable() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let mut code = sample(now);
        code.is_valid = false;
        assert!(!code.is_redeemable_at(now));
    }

    #[test]
    fn code_type_round_trips_through_storage_names() {
        for code_type in [CodeType::Qr, CodeType::Barcode, CodeType::Digital] {
            assert_eq!(code_type_from_str(code_type_to_str(code_type)), Some(code_type));
        }
        assert_eq!(code_type_from_str("hologram"), None);
    }
}
