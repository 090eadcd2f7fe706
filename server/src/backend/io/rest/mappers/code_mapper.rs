use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{IssueCodeResponse, OrganizationSummary, RedemptionCode};

use crate::backend::domain::models::{DomainCode, Organization};

pub struct CodeMapper;

impl CodeMapper {
    /// Convert domain DomainCode to shared RedemptionCode DTO
    pub fn to_dto(domain: DomainCode) -> RedemptionCode {
        RedemptionCode {
            value: domain.value,
            code_type: domain.code_type,
            is_valid: domain.is_valid,
            created_at: domain.created_at.to_rfc3339(),
            expiration: domain.expiration.to_rfc3339(),
            owner_id: domain.owner_id,
            goal_id: domain.scope.goal_id(),
            organization_id: domain.scope.organization_id(),
        }
    }

    /// Response to a fresh issuance; the rendering travels base64 encoded
    pub fn to_issue_response(domain: DomainCode) -> IssueCodeResponse {
        IssueCodeResponse {
            detail: "Code issued".to_string(),
            barcode: STANDARD.encode(&domain.content),
            expiration: domain.expiration.to_rfc3339(),
            value: domain.value,
        }
    }

    pub fn organization_to_summary(domain: Organization) -> OrganizationSummary {
        OrganizationSummary {
            id: domain.id,
            name: domain.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::Scope;
    use chrono::{Duration, TimeZone, Utc};
    use shared::CodeType;

    #[test]
    fn scope_is_split_into_nullable_ids() {
        let created_at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let code = DomainCode {
            value: "T:1-N:42-U:9-123456".to_string(),
            code_type: CodeType::Qr,
            content: b"<svg/>".to_vec(),
            is_valid: true,
            created_at,
            expiration: created_at + Duration::seconds(300),
            owner_id: 9,
            scope: Scope::Goal(42),
        };

        let issued = CodeMapper::to_issue_response(code.clone());
        assert_eq!(issued.barcode, "PHN2Zy8+");
        assert_eq!(issued.expiration, "2026-05-01T12:05:00+00:00");

        let dto = CodeMapper::to_dto(code);
        assert_eq!(dto.goal_id, Some(42));
        assert_eq!(dto.organization_id, None);
    }
}
