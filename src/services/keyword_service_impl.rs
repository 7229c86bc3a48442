//! `SeaORM` implementation of the `KeywordService` trait.

use async_trait::async_trait;

use crate::db::Store;
use crate::entities::keywords;
use crate::services::client_service::KeywordDto;
use crate::services::keyword_service::{KeywordError, KeywordService, UpdateKeyword};

fn to_dto(model: keywords::Model) -> KeywordDto {
    KeywordDto {
        id: model.id,
        term: model.term,
        category: model.category,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub struct SeaOrmKeywordService {
    store: Store,
}

impl SeaOrmKeywordService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl KeywordService for SeaOrmKeywordService {
    async fn create(&self, term: &str, category: Option<&str>) -> Result<KeywordDto, KeywordError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(KeywordError::Validation("Term is required".to_string()));
        }

        if self.store.keyword_repo().get_by_term(term).await?.is_some() {
            return Err(KeywordError::DuplicateTerm(term.to_string()));
        }

        let model = self.store.keyword_repo().create(term, category).await?;
        Ok(to_dto(model))
    }

    async fn get(&self, id: i32) -> Result<KeywordDto, KeywordError> {
        let model = self
            .store
            .keyword_repo()
            .get(id)
            .await?
            .ok_or(KeywordError::NotFound(id))?;
        Ok(to_dto(model))
    }

    async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<KeywordDto>, u64), KeywordError> {
        let (rows, total) = self
            .store
            .keyword_repo()
            .list(include_inactive, limit, offset)
            .await?;

        Ok((rows.into_iter().map(to_dto).collect(), total))
    }

    async fn update(&self, id: i32, update: UpdateKeyword) -> Result<KeywordDto, KeywordError> {
        if let Some(term) = &update.term {
            let term = term.trim();
            if term.is_empty() {
                return Err(KeywordError::Validation("Term cannot be empty".to_string()));
            }
            if let Some(existing) = self.store.keyword_repo().get_by_term(term).await?
                && existing.id != id
            {
                return Err(KeywordError::DuplicateTerm(term.to_string()));
            }
        }

        let updated = self
            .store
            .keyword_repo()
            .update(
                id,
                update.term.as_deref().map(str::trim),
                update.category.as_ref().map(Option::as_deref),
            )
            .await?
            .ok_or(KeywordError::NotFound(id))?;

        Ok(to_dto(updated))
    }

    async fn deactivate(&self, id: i32) -> Result<(), KeywordError> {
        let found = self.store.keyword_repo().set_active(id, false).await?;
        if found {
            Ok(())
        } else {
            Err(KeywordError::NotFound(id))
        }
    }
}
