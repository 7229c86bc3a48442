//! `SeaORM` implementation of the `CodeService` trait.

use async_trait::async_trait;
use rand::Rng;

use crate::db::Store;
use crate::entities::auth_codes;
use crate::services::code_service::{
    CodeDto, CodeError, CodeService, CodeStatus, CodeUsageDto,
};

/// Unambiguous uppercase alphabet: no 0/O, 1/I/L to survive being read aloud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 12;

/// Strips hyphens and whitespace, uppercases. Idempotent.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Hyphen-grouped display form: XXXX-XXXX-XXXX.
#[must_use]
pub fn display_code(code: &str) -> String {
    code.as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).to_string())
        .collect::<Vec<_>>()
        .join("-")
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            char::from(CODE_ALPHABET[idx])
        })
        .collect()
}

/// Derived state. Check order matters for error reporting: revoked first,
/// then expired, then exhausted.
pub(crate) fn derive_status(model: &auth_codes::Model, now: &str) -> CodeStatus {
    if !model.is_active {
        return CodeStatus::Revoked;
    }
    if let Some(expires_at) = &model.expires_at
        && expires_at.as_str() <= now
    {
        return CodeStatus::Expired;
    }
    if model.current_uses >= model.max_uses {
        return CodeStatus::Exhausted;
    }
    CodeStatus::Active
}

fn to_dto(model: auth_codes::Model, now: &str) -> CodeDto {
    let status = derive_status(&model, now);
    CodeDto {
        display_code: display_code(&model.code),
        id: model.id,
        code: model.code,
        status,
        created_by: model.created_by,
        expires_at: model.expires_at,
        max_uses: model.max_uses,
        current_uses: model.current_uses,
        notes: model.notes,
        created_at: model.created_at,
    }
}

pub struct SeaOrmCodeService {
    store: Store,
}

impl SeaOrmCodeService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CodeService for SeaOrmCodeService {
    async fn create_code(
        &self,
        created_by: i32,
        expires_in_days: Option<i64>,
        max_uses: i32,
        notes: Option<&str>,
    ) -> Result<CodeDto, CodeError> {
        if max_uses < 1 {
            return Err(CodeError::Validation(
                "max_uses must be at least 1".to_string(),
            ));
        }

        let expires_at = expires_in_days.map(|days| {
            (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339()
        });

        // Retry on the astronomically unlikely collision with an existing code.
        let mut last_err = None;
        for _ in 0..3 {
            let code = generate_code();
            match self
                .store
                .code_repo()
                .insert(&code, created_by, expires_at.clone(), max_uses, notes)
                .await
            {
                Ok(model) => {
                    let now = chrono::Utc::now().to_rfc3339();
                    return Ok(to_dto(model, &now));
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(CodeError::Internal(
            last_err.map_or_else(|| "code generation failed".to_string(), |e| e.to_string()),
        ))
    }

    async fn validate(&self, raw_code: &str) -> Result<CodeDto, CodeError> {
        let normalized = normalize_code(raw_code);
        if normalized.len() != CODE_LENGTH {
            return Err(CodeError::InvalidCode);
        }

        let model = self
            .store
            .code_repo()
            .get_by_code(&normalized)
            .await?
            .ok_or(CodeError::InvalidCode)?;

        let now = chrono::Utc::now().to_rfc3339();
        match derive_status(&model, &now) {
            CodeStatus::Revoked => Err(CodeError::RevokedCode),
            CodeStatus::Expired => Err(CodeError::ExpiredCode),
            CodeStatus::Exhausted => Err(CodeError::ExhaustedCode),
            CodeStatus::Active => Ok(to_dto(model, &now)),
        }
    }

    async fn revoke(&self, id: i32) -> Result<(), CodeError> {
        let found = self.store.code_repo().revoke(id).await?;
        if found {
            Ok(())
        } else {
            Err(CodeError::NotFound(id))
        }
    }

    async fn list(&self, limit: u64, offset: u64) -> Result<(Vec<CodeDto>, u64), CodeError> {
        let (rows, total) = self.store.code_repo().list(limit, offset).await?;
        let now = chrono::Utc::now().to_rfc3339();
        Ok((rows.into_iter().map(|m| to_dto(m, &now)).collect(), total))
    }

    async fn get(&self, id: i32) -> Result<(CodeDto, Vec<CodeUsageDto>), CodeError> {
        let model = self
            .store
            .code_repo()
            .get(id)
            .await?
            .ok_or(CodeError::NotFound(id))?;

        let usages = self
            .store
            .code_repo()
            .usages(id)
            .await?
            .into_iter()
            .map(|u| CodeUsageDto {
                user_id: u.user_id,
                used_at: u.used_at,
            })
            .collect();

        let now = chrono::Utc::now().to_rfc3339();
        Ok((to_dto(model, &now), usages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> auth_codes::Model {
        auth_codes::Model {
            id: 1,
            code: "A3B79K2M5PQ8".to_string(),
            created_by: 1,
            expires_at: None,
            max_uses: 1,
            current_uses: 0,
            is_active: true,
            notes: None,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_normalization_is_case_and_hyphen_insensitive() {
        let canonical = "A3B79K2M5PQ8";
        assert_eq!(normalize_code("A3B7-9K2M-5PQ8"), canonical);
        assert_eq!(normalize_code("a3b79k2m5pq8"), canonical);
        assert_eq!(normalize_code("A3B79K2M5PQ8"), canonical);
        // Idempotent
        assert_eq!(normalize_code(&normalize_code("a3b7-9k2m-5pq8")), canonical);
    }

    #[test]
    fn test_display_code_grouping() {
        assert_eq!(display_code("A3B79K2M5PQ8"), "A3B7-9K2M-5PQ8");
    }

    #[test]
    fn test_generated_codes_are_canonical() {
        let code = generate_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert_eq!(normalize_code(&code), code);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_status_check_order_revoked_before_expired_before_exhausted() {
        let now = "2026-06-01T00:00:00+00:00";

        // Expired AND exhausted AND revoked: revoked wins.
        let mut model = sample_model();
        model.is_active = false;
        model.expires_at = Some("2026-01-02T00:00:00+00:00".to_string());
        model.current_uses = 1;
        assert_eq!(derive_status(&model, now), CodeStatus::Revoked);

        // Expired AND exhausted: expired wins.
        let mut model = sample_model();
        model.expires_at = Some("2026-01-02T00:00:00+00:00".to_string());
        model.current_uses = 1;
        assert_eq!(derive_status(&model, now), CodeStatus::Expired);

        // Only exhausted.
        let mut model = sample_model();
        model.current_uses = 1;
        assert_eq!(derive_status(&model, now), CodeStatus::Exhausted);

        assert_eq!(derive_status(&sample_model(), now), CodeStatus::Active);
    }

    #[test]
    fn test_unexpired_code_is_active() {
        let mut model = sample_model();
        model.expires_at = Some("2099-01-01T00:00:00+00:00".to_string());
        assert_eq!(
            derive_status(&model, "2026-06-01T00:00:00+00:00"),
            CodeStatus::Active
        );
    }
}
