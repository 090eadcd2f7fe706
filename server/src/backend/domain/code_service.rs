//! Code registry: issues, validates and invalidates single-use redemption codes.
//!
//! ## Business Rules
//!
//! - A code is redeemable iff it was never consumed and `now < expiration`
//! - `is_valid` goes from true to false exactly once and never back
//! - Codes are never deleted; consumed codes back the visited-organizations list
//! - Consumption is a conditional UPDATE, so concurrent redeems of one value
//!   have exactly one winner

use barcoders::generators::svg::SVG;
use barcoders::sym::code128::Code128;
use chrono::{DateTime, Duration, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use rand::Rng;
use shared::CodeType;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::domain::clock::Clock;
use crate::backend::domain::error::{LoyaltyError, LoyaltyResult};
use crate::backend::domain::models::{DomainCode, Organization, Scope};
use crate::backend::storage::{CodeRepository, DbConnection, OrganizationRepository};

/// Attempts at finding an unused value before giving up
const MAX_ISSUE_ATTEMPTS: usize = 5;

/// Code128 start character selecting code set B
const CODE128_SET_B: char = 'Ɓ';
const BARCODE_HEIGHT: u32 = 80;

#[derive(Clone)]
pub struct CodeService {
    db: DbConnection,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CodeService {
    pub fn new(db: DbConnection, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { db, clock, ttl }
    }

    /// Issue a fresh code for `owner_id`, attached to a goal or an organization
    pub async fn issue(
        &self,
        scope: Scope,
        owner_id: i64,
        code_type: CodeType,
    ) -> LoyaltyResult<DomainCode> {
        info!("Issuing {:?} code for user {} on {:?}", code_type, owner_id, scope);

        let mut conn = self.db.pool().acquire().await?;
        Self::ensure_scope_exists(&mut conn, scope).await?;

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let suffix = rand::thread_rng().gen_range(100_000..=999_999);
            let value = DomainCode::generate_value(scope, owner_id, suffix);
            let now = self.clock.now();
            let expiration = now.checked_add_signed(self.ttl).ok_or_else(|| {
                LoyaltyError::Internal(format!("code lifetime {} overflows the clock", self.ttl))
            })?;
            let code = DomainCode {
                content: render(&value, code_type)?,
                value,
                code_type,
                is_valid: true,
                created_at: now,
                expiration,
                owner_id,
                scope,
            };

            match CodeRepository::insert(&mut conn, &code).await {
                Ok(()) => {
                    info!("Issued code {} expiring at {}", code.value, code.expiration);
                    return Ok(code);
                }
                Err(LoyaltyError::Storage(sqlx::Error::Database(e))) if e.is_unique_violation() => {
                    warn!("Code value {} already taken, retrying", code.value);
                }
                Err(e) => return Err(e),
            }
        }

        Err(LoyaltyError::Internal(format!(
            "could not find a free code value for user {} after {} attempts",
            owner_id, MAX_ISSUE_ATTEMPTS
        )))
    }

    /// Look up a code regardless of its validity
    pub async fn validate(&self, value: &str) -> LoyaltyResult<DomainCode> {
        info!("Validating code {}", value);
        let mut conn = self.db.pool().acquire().await?;
        CodeRepository::find_by_value(&mut conn, value)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Code {}", value)))
    }

    /// Consume a code that must be attached to `expected_scope`
    pub async fn redeem(&self, value: &str, expected_scope: Scope) -> LoyaltyResult<DomainCode> {
        info!("Redeeming code {} for {:?}", value, expected_scope);
        let mut conn = self.db.pool().acquire().await?;
        Self::redeem_in(&mut conn, value, expected_scope, self.clock.now()).await
    }

    /// Returns the code as stored after consumption
    async fn redeem_in(
        conn: &mut SqliteConnection,
        value: &str,
        expected_scope: Scope,
        now: DateTime<Utc>,
    ) -> LoyaltyResult<DomainCode> {
        if CodeRepository::consume(conn, value, expected_scope, now).await? {
            return CodeRepository::find_by_value(conn, value)
                .await?
                .ok_or_else(|| LoyaltyError::NotFound(format!("Code {}", value)));
        }

        let code = CodeRepository::find_by_value(conn, value)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Code {}", value)))?;

        let reason = if code.scope != expected_scope {
            "code is attached to another goal or organization"
        } else if code.is_expired_at(now) {
            "code has expired"
        } else {
            "code was already used"
        };
        warn!("Rejected redemption of {}: {}", value, reason);
        Err(LoyaltyError::InvalidCode(reason.to_string()))
    }

    /// Check a code presented at `verifying_organization_id` and blacklist it.
    /// Returns the code as it was before blacklisting.
    pub async fn verify_and_blacklist(
        &self,
        value: &str,
        verifying_organization_id: i64,
    ) -> LoyaltyResult<DomainCode> {
        info!("Organization {} verifying code {}", verifying_organization_id, value);
        let now = self.clock.now();
        let mut conn = self.db.pool().acquire().await?;

        let code = CodeRepository::find_by_value(&mut conn, value)
            .await?
            .ok_or_else(|| LoyaltyError::NotFound(format!("Code {}", value)))?;

        if !code.is_redeemable_at(now) {
            warn!("Code {} is no longer valid", value);
            return Err(LoyaltyError::InvalidCode("code has expired or was already used".to_string()));
        }

        let owning_organization = match code.scope {
            Scope::Organization(id) => id,
            Scope::Goal(goal_id) => OrganizationRepository::goal_owner(&mut conn, goal_id).await?,
        };
        if owning_organization != verifying_organization_id {
            warn!(
                "Code {} belongs to organization {}, not {}",
                value, owning_organization, verifying_organization_id
            );
            return Err(LoyaltyError::ScopeMismatch);
        }

        if !CodeRepository::blacklist(&mut conn, value, now).await? {
            warn!("Code {} was consumed concurrently", value);
            return Err(LoyaltyError::InvalidCode("code was already used".to_string()));
        }

        info!("Code {} blacklisted", value);
        Ok(code)
    }

    /// Organizations where `user_id` has consumed at least one code
    pub async fn visited_organizations(&self, user_id: i64) -> LoyaltyResult<Vec<Organization>> {
        let mut conn = self.db.pool().acquire().await?;
        CodeRepository::visited_organizations(&mut conn, user_id).await
    }

    async fn ensure_scope_exists(conn: &mut SqliteConnection, scope: Scope) -> LoyaltyResult<()> {
        match scope {
            Scope::Goal(goal_id) => {
                OrganizationRepository::goal_owner(conn, goal_id).await?;
            }
            Scope::Organization(organization_id) => {
                OrganizationRepository::find_by_id(conn, organization_id)
                    .await?
                    .ok_or_else(|| LoyaltyError::NotFound(format!("Organization {}", organization_id)))?;
            }
        }
        Ok(())
    }
}

/// Render the scannable payload as SVG
fn render(value: &str, code_type: CodeType) -> LoyaltyResult<Vec<u8>> {
    match code_type {
        CodeType::Digital => Ok(Vec::new()),
        CodeType::Qr => {
            let qr = QrCode::new(value.as_bytes())
                .map_err(|e| LoyaltyError::Internal(format!("failed to render code {}: {}", value, e)))?;
            let image = qr.render::<svg::Color>().min_dimensions(200, 200).build();
            Ok(image.into_bytes())
        }
        CodeType::Barcode => {
            let barcode = Code128::new(format!("{}{}", CODE128_SET_B, value))
                .map_err(|e| LoyaltyError::Internal(format!("failed to encode barcode {}: {:?}", value, e)))?;
            let image = SVG::new(BARCODE_HEIGHT)
                .generate(&barcode.encode()[..])
                .map_err(|e| LoyaltyError::Internal(format!("failed to render barcode {}: {:?}", value, e)))?;
            Ok(image.into_bytes())
        }
    }
}
