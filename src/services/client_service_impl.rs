//! `SeaORM` implementation of the `ClientService` trait.

use async_trait::async_trait;
use url::Url;

use crate::db::Store;
use crate::domain::ClientId;
use crate::entities::{client_sources, clients, keywords};
use crate::services::client_service::{
    ClientDto, ClientError, ClientService, KeywordDto, SourceDto, UpdateClient,
};

fn to_client_dto(model: clients::Model) -> ClientDto {
    ClientDto {
        id: model.id,
        name: model.name,
        description: model.description,
        is_active: model.is_active,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn to_source_dto(model: client_sources::Model) -> SourceDto {
    SourceDto {
        id: model.id,
        client_id: model.client_id,
        url: model.url,
        label: model.label,
        created_at: model.created_at,
    }
}

fn to_keyword_dto(model: keywords::Model) -> KeywordDto {
    KeywordDto {
        id: model.id,
        term: model.term,
        category: model.category,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub struct SeaOrmClientService {
    store: Store,
}

impl SeaOrmClientService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn require_client(&self, id: ClientId) -> Result<clients::Model, ClientError> {
        self.store
            .client_repo()
            .get(id.value())
            .await?
            .ok_or(ClientError::NotFound(id))
    }
}

#[async_trait]
impl ClientService for SeaOrmClientService {
    async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        created_by: i32,
    ) -> Result<ClientDto, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("Name is required".to_string()));
        }

        if self.store.client_repo().get_by_name(name).await?.is_some() {
            return Err(ClientError::DuplicateName(name.to_string()));
        }

        let model = self
            .store
            .client_repo()
            .create(name, description, created_by)
            .await?;

        Ok(to_client_dto(model))
    }

    async fn get(&self, id: ClientId) -> Result<ClientDto, ClientError> {
        Ok(to_client_dto(self.require_client(id).await?))
    }

    async fn list(
        &self,
        include_inactive: bool,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<ClientDto>, u64), ClientError> {
        let (rows, total) = self
            .store
            .client_repo()
            .list(include_inactive, limit, offset)
            .await?;

        Ok((rows.into_iter().map(to_client_dto).collect(), total))
    }

    async fn update(&self, id: ClientId, update: UpdateClient) -> Result<ClientDto, ClientError> {
        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ClientError::Validation("Name cannot be empty".to_string()));
            }
            if let Some(existing) = self.store.client_repo().get_by_name(name).await?
                && existing.id != id.value()
            {
                return Err(ClientError::DuplicateName(name.to_string()));
            }
        }

        let updated = self
            .store
            .client_repo()
            .update(
                id.value(),
                update.name.as_deref().map(str::trim),
                update.description.as_ref().map(Option::as_deref),
            )
            .await?
            .ok_or(ClientError::NotFound(id))?;

        Ok(to_client_dto(updated))
    }

    async fn deactivate(&self, id: ClientId) -> Result<(), ClientError> {
        let found = self.store.client_repo().set_active(id.value(), false).await?;
        if found {
            Ok(())
        } else {
            Err(ClientError::NotFound(id))
        }
    }

    async fn add_source(
        &self,
        id: ClientId,
        url: &str,
        label: Option<&str>,
    ) -> Result<SourceDto, ClientError> {
        self.require_client(id).await?;

        let parsed = Url::parse(url)
            .map_err(|e| ClientError::Validation(format!("Invalid source URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Validation(
                "Source URL must be http or https".to_string(),
            ));
        }

        let model = self
            .store
            .client_repo()
            .add_source(id.value(), parsed.as_str(), label)
            .await?;

        Ok(to_source_dto(model))
    }

    async fn remove_source(&self, id: ClientId, source_id: i32) -> Result<(), ClientError> {
        let removed = self
            .store
            .client_repo()
            .remove_source(id.value(), source_id)
            .await?;

        if removed {
            Ok(())
        } else {
            Err(ClientError::SourceNotFound(source_id))
        }
    }

    async fn sources(&self, id: ClientId) -> Result<Vec<SourceDto>, ClientError> {
        self.require_client(id).await?;

        let rows = self.store.client_repo().sources(id.value()).await?;
        Ok(rows.into_iter().map(to_source_dto).collect())
    }

    async fn link_keyword(&self, id: ClientId, keyword_id: i32) -> Result<(), ClientError> {
        self.require_client(id).await?;

        if self.store.keyword_repo().get(keyword_id).await?.is_none() {
            return Err(ClientError::Validation(format!(
                "Keyword {keyword_id} not found"
            )));
        }

        self.store
            .client_repo()
            .link_keyword(id.value(), keyword_id)
            .await?;
        Ok(())
    }

    async fn unlink_keyword(&self, id: ClientId, keyword_id: i32) -> Result<(), ClientError> {
        self.store
            .client_repo()
            .unlink_keyword(id.value(), keyword_id)
            .await?;
        Ok(())
    }

    async fn keywords(&self, id: ClientId) -> Result<Vec<KeywordDto>, ClientError> {
        self.require_client(id).await?;

        let rows = self.store.client_repo().active_keywords(id.value()).await?;
        Ok(rows.into_iter().map(to_keyword_dto).collect())
    }

    async fn add_favorite(&self, user_id: i32, id: ClientId) -> Result<(), ClientError> {
        self.require_client(id).await?;

        self.store.favorite_repo().add(user_id, id.value()).await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: i32, id: ClientId) -> Result<bool, ClientError> {
        Ok(self.store.favorite_repo().remove(user_id, id.value()).await?)
    }

    async fn toggle_favorite(&self, user_id: i32, id: ClientId) -> Result<bool, ClientError> {
        self.require_client(id).await?;

        let favorites = self.store.favorite_repo();
        if favorites.is_favorited(user_id, id.value()).await? {
            favorites.remove(user_id, id.value()).await?;
            Ok(false)
        } else {
            favorites.add(user_id, id.value()).await?;
            Ok(true)
        }
    }

    async fn favorites(&self, user_id: i32) -> Result<Vec<ClientDto>, ClientError> {
        let rows = self.store.favorite_repo().clients_for_user(user_id).await?;
        Ok(rows.into_iter().map(to_client_dto).collect())
    }
}
