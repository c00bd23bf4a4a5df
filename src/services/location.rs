//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::{CreateLocationInput, Location, UpdateLocationInput, LOCATION_NAME_MAX_LEN};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LocationServiceError {
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Staff-managed geotags
pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Location>, LocationServiceError> {
        Ok(self.repo.list().await.context("Failed to list locations")?)
    }

    pub async fn create(&self, input: CreateLocationInput) -> Result<Location, LocationServiceError> {
        let input = CreateLocationInput {
            name: validate_name(&input.name)?,
            ..input
        };
        let location = self
            .repo
            .create(&input)
            .await
            .context("Failed to create location")?;

        tracing::info!(location_id = location.id, "Location created");
        Ok(location)
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdateLocationInput,
    ) -> Result<Location, LocationServiceError> {
        let input = UpdateLocationInput {
            name: input.name.as_deref().map(validate_name).transpose()?,
            ..input
        };
        let location = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update location")?
            .ok_or_else(|| LocationServiceError::NotFound(id.to_string()))?;

        tracing::info!(location_id = id, "Location updated");
        Ok(location)
    }

    /// Delete a location; posts tagged with it keep existing untagged
    pub async fn delete(&self, id: i64) -> Result<(), LocationServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete location")? {
            return Err(LocationServiceError::NotFound(id.to_string()));
        }
        tracing::info!(location_id = id, "Location deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, LocationServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LocationServiceError::ValidationError(
            "Location name cannot be empty".to_string(),
        ));
    }
    if name.chars().count() > LOCATION_NAME_MAX_LEN {
        return Err(LocationServiceError::ValidationError(format!(
            "Location name cannot exceed {} characters",
            LOCATION_NAME_MAX_LEN
        )));
    }
    Ok(name.to_string())
}
