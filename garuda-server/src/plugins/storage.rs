//! Storage plugin contract and the in-memory
//! reference implementation. Grounded directly on
//! `garuda/plugins/storage/mongodb.py`'s `GAMongoStoragePlugin`: same method
//! set, same children-list-under-parent / association-list-under-parent
//! convention for `child` vs `related` relationships, same cascade-delete
//! walk over `children_rest_names`, same "no changes to modify" CONFLICT on
//! a no-op update. Swaps MongoDB collections for `DashMap` tables, since no
//! concrete production storage backend is in scope.

use super::{CoreHandle, Plugin, PluginManifest};
use crate::error::GarudaError;
use crate::filter::Filter;
use async_trait::async_trait;
use dashmap::DashMap;
use garuda_sdk::{entity::RelationKind, ErrorList, ErrorType, SdkBundle};
use garuda_sdk::EntityInstance;
use std::sync::atomic::{AtomicU64, Ordering};

#[async_trait]
pub trait StoragePlugin: Plugin {
    fn should_manage(&self, resource_name: &str, identifier: Option<&str>) -> bool;

    fn instantiate(&self, resource_name: &str) -> Result<EntityInstance, GarudaError>;

    async fn get(
        &self,
        resource_name: &str,
        identifier: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Option<EntityInstance>, GarudaError>;

    async fn get_all(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        page: Option<usize>,
        page_size: Option<usize>,
        filter: Option<&str>,
        order_by: Option<&str>,
    ) -> Result<(Vec<EntityInstance>, usize), GarudaError>;

    async fn count(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        filter: Option<&str>,
    ) -> Result<usize, GarudaError>;

    async fn create(
        &self,
        entity: &mut EntityInstance,
        parent: Option<&mut EntityInstance>,
    ) -> Result<Option<ErrorList>, GarudaError>;

    async fn update(&self, entity: &mut EntityInstance) -> Result<Option<ErrorList>, GarudaError>;

    /// Replaces the association set under `resource_name` on `parent`.
    async fn delete(
        &self,
        entity: &EntityInstance,
        cascade: bool,
    ) -> Result<Option<ErrorList>, GarudaError>;

    async fn assign(
        &self,
        resource_name: &str,
        entities: Vec<EntityInstance>,
        parent: &mut EntityInstance,
    ) -> Result<Option<ErrorList>, GarudaError>;
}

fn relation_key(parent_rest_name: &str, parent_id: &str, resource_name: &str) -> String {
    format!("{parent_rest_name}:{parent_id}:{resource_name}")
}

/// In-process reference storage backend: one `DashMap` table per rest name,
/// plus two side tables for `child` children-lists and `related` association
/// sets, mirroring the two list kinds `mongodb.py` keeps under
/// `_<rest_name>` and `_rel_<rest_name>` parent document keys.
pub struct InMemoryStoragePlugin {
    manifest: PluginManifest,
    bundle: SdkBundle,
    tables: DashMap<String, DashMap<String, EntityInstance>>,
    children: DashMap<String, Vec<String>>,
    associations: DashMap<String, Vec<String>>,
    next_id: AtomicU64,
}

impl InMemoryStoragePlugin {
    pub fn new(identifier: impl Into<String>, bundle: SdkBundle) -> Self {
        Self {
            manifest: PluginManifest::new("in-memory-storage", "1.0.0", identifier),
            bundle,
            tables: DashMap::new(),
            children: DashMap::new(),
            associations: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn table(&self, resource_name: &str) -> dashmap::mapref::one::Ref<'_, String, DashMap<String, EntityInstance>> {
        self.tables
            .entry(resource_name.to_string())
            .or_insert_with(DashMap::new)
            .downgrade()
    }

    fn candidates(&self, parent: Option<&EntityInstance>, resource_name: &str) -> Vec<EntityInstance> {
        match parent {
            None => self
                .table(resource_name)
                .iter()
                .map(|e| e.value().clone())
                .collect(),
            Some(parent) => match parent.fetcher_for_rest_name(resource_name) {
                Some(meta) if meta.kind == RelationKind::Child => self
                    .table(resource_name)
                    .iter()
                    .filter(|e| e.value().parent() == Some((parent.rest_name(), parent.id().unwrap_or(""))))
                    .map(|e| e.value().clone())
                    .collect(),
                _ => {
                    let key = relation_key(
                        parent.rest_name(),
                        parent.id().unwrap_or(""),
                        resource_name,
                    );
                    let ids = self.associations.get(&key).map(|v| v.clone()).unwrap_or_default();
                    let table = self.table(resource_name);
                    ids.iter()
                        .filter_map(|id| table.get(id).map(|e| e.value().clone()))
                        .collect()
                }
            },
        }
    }

    fn filtered(&self, entities: Vec<EntityInstance>, filter: Option<&str>) -> Result<Vec<EntityInstance>, GarudaError> {
        let Some(raw) = filter else {
            return Ok(entities);
        };
        let parsed = Filter::parse(raw).ok_or_else(|| GarudaError::Storage {
            message: format!("invalid filter expression: {raw}"),
        })?;
        Ok(entities
            .into_iter()
            .filter(|e| parsed.matches(&e.to_dict()))
            .collect())
    }

    fn sorted(&self, mut entities: Vec<EntityInstance>, order_by: Option<&str>) -> Vec<EntityInstance> {
        let Some(order_by) = order_by else {
            return entities;
        };
        let (field, descending) = match order_by.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (order_by, false),
        };
        entities.sort_by(|a, b| {
            let a_val = a.to_dict().get(field).cloned().unwrap_or_default();
            let b_val = b.to_dict().get(field).cloned().unwrap_or_default();
            a_val.to_string().cmp(&b_val.to_string())
        });
        if descending {
            entities.reverse();
        }
        entities
    }

    fn paginated(
        &self,
        entities: Vec<EntityInstance>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> Vec<EntityInstance> {
        let Some(page_size) = page_size else {
            return entities;
        };
        let skip = page.unwrap_or(0) * page_size;
        entities.into_iter().skip(skip).take(page_size).collect()
    }

    fn remove_from_children_list(&self, entity: &EntityInstance) {
        if let Some((parent_rest_name, parent_id)) = entity.parent() {
            let key = relation_key(parent_rest_name, parent_id, entity.rest_name());
            if let Some(mut ids) = self.children.get_mut(&key) {
                ids.retain(|id| Some(id.as_str()) != entity.id());
            }
        }
    }

    fn delete_cascade(&self, entity: &EntityInstance) {
        for child_rest_name in entity.children_rest_names() {
            let key = relation_key(
                entity.rest_name(),
                entity.id().unwrap_or(""),
                child_rest_name,
            );
            let Some((_, child_ids)) = self.children.remove(&key) else {
                continue;
            };
            for child_id in child_ids {
                let removed = self
                    .table(child_rest_name)
                    .remove(&child_id)
                    .map(|(_, entity)| entity);
                if let Some(child) = removed {
                    self.delete_cascade(&child);
                }
            }
        }
    }
}

#[async_trait]
impl Plugin for InMemoryStoragePlugin {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn did_register(&mut self, core: CoreHandle) -> Result<(), GarudaError> {
        let _ = core;
        tracing::info!(plugin = %self.manifest.identifier, "storage plugin registered");
        Ok(())
    }
}

#[async_trait]
impl StoragePlugin for InMemoryStoragePlugin {
    fn should_manage(&self, _resource_name: &str, _identifier: Option<&str>) -> bool {
        true
    }

    fn instantiate(&self, resource_name: &str) -> Result<EntityInstance, GarudaError> {
        Ok(self.bundle.instantiate(resource_name)?)
    }

    async fn get(
        &self,
        resource_name: &str,
        identifier: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Option<EntityInstance>, GarudaError> {
        if let Some(identifier) = identifier {
            let entity = self.table(resource_name).get(identifier).map(|e| e.value().clone());
            let Some(entity) = entity else {
                return Ok(None);
            };
            if let Some(raw) = filter {
                let parsed = Filter::parse(raw).ok_or_else(|| GarudaError::Storage {
                    message: format!("invalid filter expression: {raw}"),
                })?;
                if !parsed.matches(&entity.to_dict()) {
                    return Ok(None);
                }
            }
            return Ok(Some(entity));
        }

        let all: Vec<EntityInstance> = self
            .table(resource_name)
            .iter()
            .map(|e| e.value().clone())
            .collect();
        Ok(self.filtered(all, filter)?.into_iter().next())
    }

    async fn get_all(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        page: Option<usize>,
        page_size: Option<usize>,
        filter: Option<&str>,
        order_by: Option<&str>,
    ) -> Result<(Vec<EntityInstance>, usize), GarudaError> {
        let candidates = self.candidates(parent, resource_name);
        let filtered = self.filtered(candidates, filter)?;
        let total = filtered.len();
        let sorted = self.sorted(filtered, order_by);
        let page = self.paginated(sorted, page, page_size);
        Ok((page, total))
    }

    async fn count(
        &self,
        parent: Option<&EntityInstance>,
        resource_name: &str,
        filter: Option<&str>,
    ) -> Result<usize, GarudaError> {
        let candidates = self.candidates(parent, resource_name);
        Ok(self.filtered(candidates, filter)?.len())
    }

    async fn create(
        &self,
        entity: &mut EntityInstance,
        parent: Option<&mut EntityInstance>,
    ) -> Result<Option<ErrorList>, GarudaError> {
        let mut errors = ErrorList::new();
        entity.validate(&mut errors);
        if errors.has_errors() {
            return Ok(Some(errors));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        entity.set_id(id.clone());

        if let Some(parent) = parent.as_ref() {
            entity.set_parent(parent.rest_name().to_string(), parent.id().unwrap_or("").to_string());
        }

        self.table(entity.rest_name()).insert(id.clone(), entity.clone());

        if let Some(parent) = parent {
            let key = relation_key(parent.rest_name(), parent.id().unwrap_or(""), entity.rest_name());
            self.children.entry(key).or_default().push(id);
        }

        Ok(None)
    }

    async fn update(&self, entity: &mut EntityInstance) -> Result<Option<ErrorList>, GarudaError> {
        let mut errors = ErrorList::new();
        entity.validate(&mut errors);
        if errors.has_errors() {
            return Ok(Some(errors));
        }

        let Some(id) = entity.id() else {
            let mut errors = ErrorList::new();
            errors.add_error("ID", "entity has no identifier", ErrorType::Invalid);
            return Ok(Some(errors));
        };

        let table = self.table(entity.rest_name());
        if let Some(stored) = table.get(id) {
            if stored.rest_equals(entity.as_ref()) {
                let mut errors = ErrorList::new();
                errors.add_error("", "No changes to modify the entity", ErrorType::Conflict);
                return Ok(Some(errors));
            }
        }

        table.insert(id.to_string(), entity.clone());
        Ok(None)
    }

    async fn delete(
        &self,
        entity: &EntityInstance,
        cascade: bool,
    ) -> Result<Option<ErrorList>, GarudaError> {
        self.remove_from_children_list(entity);
        if cascade {
            self.delete_cascade(entity);
        }
        if let Some(id) = entity.id() {
            self.table(entity.rest_name()).remove(id);
        }
        Ok(None)
    }

    async fn assign(
        &self,
        resource_name: &str,
        entities: Vec<EntityInstance>,
        parent: &mut EntityInstance,
    ) -> Result<Option<ErrorList>, GarudaError> {
        let key = relation_key(parent.rest_name(), parent.id().unwrap_or(""), resource_name);
        let ids = entities
            .iter()
            .filter_map(|e| e.id().map(str::to_string))
            .collect();
        self.associations.insert(key, ids);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garuda_sdk::entities::reference_bundle;
    use garuda_sdk::entities::{Domain, Enterprise, RootUser};

    fn plugin() -> InMemoryStoragePlugin {
        InMemoryStoragePlugin::new("test.in-memory", reference_bundle())
    }

    fn named_enterprise(name: &str) -> EntityInstance {
        Box::new(Enterprise {
            name: name.to_string(),
            ..Enterprise::default()
        })
    }

    fn enterprise_with(name: &str, description: &str) -> EntityInstance {
        Box::new(Enterprise {
            name: name.to_string(),
            description: description.to_string(),
            ..Enterprise::default()
        })
    }

    fn domain_with(name: &str, cidr: &str) -> EntityInstance {
        Box::new(Domain {
            name: name.to_string(),
            cidr: cidr.to_string(),
            ..Domain::default()
        })
    }

    #[tokio::test]
    async fn create_assigns_id_and_is_retrievable() {
        let plugin = plugin();
        let mut enterprise = named_enterprise("acme");
        let result = plugin.create(&mut enterprise, None).await.unwrap();
        assert!(result.is_none());
        let id = enterprise.id().unwrap().to_string();

        let fetched = plugin.get("enterprise", Some(&id), None).await.unwrap();
        assert!(fetched.is_some());
    }

    #[tokio::test]
    async fn create_under_parent_registers_child() {
        let plugin = plugin();
        let mut root: EntityInstance = Box::new(RootUser::default());
        root.set_id("root-1".to_string());

        let mut enterprise = named_enterprise("acme");
        plugin.create(&mut enterprise, Some(&mut root)).await.unwrap();

        let (children, total) = plugin
            .get_all(Some(&root), "enterprise", None, None, None, None)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(children.len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_unchanged_entity() {
        let plugin = plugin();
        let mut enterprise = named_enterprise("acme");
        plugin.create(&mut enterprise, None).await.unwrap();

        let result = plugin.update(&mut enterprise).await.unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().error_type(), Some(ErrorType::Conflict));
    }

    #[tokio::test]
    async fn update_accepts_changed_entity() {
        let plugin = plugin();
        let mut enterprise = enterprise_with("acme", "v1");
        plugin.create(&mut enterprise, None).await.unwrap();
        let id = enterprise.id().unwrap().to_string();

        let mut updated = enterprise_with("acme", "v2");
        updated.set_id(id);
        let result = plugin.update(&mut updated).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn cascade_delete_removes_children() {
        let plugin = plugin();
        let mut enterprise = named_enterprise("acme");
        plugin.create(&mut enterprise, None).await.unwrap();

        let mut domain = domain_with("dc1", "10.0.0.0/8");
        plugin.create(&mut domain, Some(&mut enterprise)).await.unwrap();
        let domain_id = domain.id().unwrap().to_string();

        plugin.delete(&enterprise, true).await.unwrap();

        let fetched = plugin.get("domain", Some(&domain_id), None).await.unwrap();
        assert!(fetched.is_none());
    }
}
