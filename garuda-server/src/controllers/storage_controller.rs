//! Storage Controller: dispatches CRUD operations to the first registered
//! storage plugin that claims the resource, in registration order. A
//! resource no plugin claims fails with NOTFOUND, surfaced to the caller as
//! `Ok(None)` (for reads) or a NOTFOUND `ErrorList` (for mutations) rather
//! than a transport-level error.

use crate::error::GarudaError;
use garuda_sdk::{EntityInstance, ErrorList, ErrorType};

pub struct StorageController {
    plugins: Vec<Box<dyn crate::plugins::StoragePlugin>>,
}

impl StorageController {
    pub fn new(plugins: Vec<Box<dyn crate::plugins::StoragePlugin>>) -> Self {
        Self { plugins }
    }

    fn claim(&self, resource_name: &str, identifier: Option<&str>) -> Option<&dyn crate::plugins::StoragePlugin> {
        self.plugins
            .iter()
            .find(|p| p.should_manage(resource_name, identifier))
            .map(|p| p.as_ref())
    }

    fn not_found(resource_name: &str) -> ErrorList {
        let mut errors = ErrorList::new();
        errors.add_error(
            "",
            format!("no storage plugin claims resource '{resource_name}'"),
            ErrorType::NotFound,
        );
        errors
    }

    pub fn instantiate(&self, resource_name: &str) -> Result<EntityInstance, GarudaError> {
        match self.claim(resource_name, None) {
            Some(plugin) => plugin.instantiate(resource_name),
            None => Err(GarudaError::Storage {
                message: format!("no storage plugin claims resource '{resource_name}'"),
            }),
        }
    }

    pub async fn get(
        &self,
        resource_name: &str,
        identifier: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Option<EntityInstance>, GarudaError> {
        match self.claim(resource_name, identifier) {
            Some(plugin) => plugin.get(resource_name, identifier, filter).await,
            None => Ok(None),
        }
    }

    pub async fn get_all(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        page: Option<usize>,
        page_size: Option<usize>,
        filter: Option<&str>,
        order_by: Option<&str>,
    ) -> Result<(Vec<EntityInstance>, usize), GarudaError> {
        match self.claim(resource_name, None) {
            Some(plugin) => {
                plugin
                    .get_all(parent, resource_name, page, page_size, filter, order_by)
                    .await
            }
            None => Ok((Vec::new(), 0)),
        }
    }

    pub async fn count(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        filter: Option<&str>,
    ) -> Result<usize, GarudaError> {
        match self.claim(resource_name, None) {
            Some(plugin) => plugin.count(parent, resource_name, filter).await,
            None => Ok(0),
        }
    }

    pub async fn create(
        &self,
        entity: &mut EntityInstance,
        parent: Option<&mut EntityInstance>,
    ) -> Result<Option<ErrorList>, GarudaError> {
        let rest_name = entity.rest_name().to_string();
        match self.claim(&rest_name, None) {
            Some(plugin) => plugin.create(entity, parent).await,
            None => Ok(Some(Self::not_found(&rest_name))),
        }
    }

    pub async fn update(&self, entity: &mut EntityInstance) -> Result<Option<ErrorList>, GarudaError> {
        let rest_name = entity.rest_name().to_string();
        match self.claim(&rest_name, entity.id()) {
            Some(plugin) => plugin.update(entity).await,
            None => Ok(Some(Self::not_found(&rest_name))),
        }
    }

    pub async fn delete(
        &self,
        entity: &EntityInstance,
        cascade: bool,
    ) -> Result<Option<ErrorList>, GarudaError> {
        let rest_name = entity.rest_name().to_string();
        match self.claim(&rest_name, entity.id()) {
            Some(plugin) => plugin.delete(entity, cascade).await,
            None => Ok(Some(Self::not_found(&rest_name))),
        }
    }

    pub async fn assign(
        &self,
        resource_name: &str,
        entities: Vec<EntityInstance>,
        parent: &mut EntityInstance,
    ) -> Result<Option<ErrorList>, GarudaError> {
        match self.claim(resource_name, None) {
            Some(plugin) => plugin.assign(resource_name, entities, parent).await,
            None => Ok(Some(Self::not_found(resource_name))),
        }
    }
}
