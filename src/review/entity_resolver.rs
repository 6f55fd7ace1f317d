use crate::remote::{Filter, RemoteManager};
use crate::review::error::ReviewError;
use crate::review::types::RemoteEntity;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const TASK_TEMPLATE_TYPE: &str = "TaskTemplate";

const CREATED_DESCRIPTION: &str = "Created by the review export integration.";

type ResolveKey = (String, String, i64);

/// Outcome of a find-or-create
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub entity: RemoteEntity,
    /// True when this call created the entity
    pub created: bool,
}

/// Finds a parent entity by name within a project, creating it when absent.
///
/// Resolution for the same `(type, name, project)` key is serialized within this
/// process so two publish jobs referencing a brand-new name create it once.
/// Jobs running in other processes still rely on the remote service rejecting
/// duplicates.
#[derive(Debug)]
pub struct EntityResolver {
    remote: RemoteManager,
    key_locks: Mutex<HashMap<ResolveKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl EntityResolver {
    pub fn new(remote: RemoteManager) -> Self {
        Self {
            remote,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: ResolveKey) -> Arc<tokio::sync::Mutex<()>> {
        self.key_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_default()
            .clone()
    }

    /// Look up a task template by name. A named template that does not exist is
    /// a configuration error.
    pub async fn resolve_template(&self, template_name: &str) -> Result<RemoteEntity, ReviewError> {
        let template = self
            .remote
            .find_one(TASK_TEMPLATE_TYPE, &[Filter::is("code", template_name)])
            .await?;

        template.map(|record| record.entity()).ok_or_else(|| {
            ReviewError::Configuration(format!(
                "The task template '{}' does not exist",
                template_name
            ))
        })
    }

    pub async fn resolve(
        &self,
        entity_type: &str,
        name: &str,
        project_id: i64,
        template_name: Option<&str>,
    ) -> Result<Resolution, ReviewError> {
        let key = (entity_type.to_string(), name.to_string(), project_id);
        let lock = self.lock_for(key.clone());
        let result = {
            let _guard = lock.lock().await;
            self.find_or_create(entity_type, name, project_id, template_name)
                .await
        };
        self.release(&key, lock);
        result
    }

    /// Drop the key's lock once no other resolve is holding or waiting on it
    fn release(&self, key: &ResolveKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.key_locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    async fn find_or_create(
        &self,
        entity_type: &str,
        name: &str,
        project_id: i64,
        template_name: Option<&str>,
    ) -> Result<Resolution, ReviewError> {

        let project = RemoteEntity::new("Project", project_id);
        let filters = [Filter::is("code", name), Filter::is("project", project.link())];

        if let Some(existing) = self.remote.find_one(entity_type, &filters).await? {
            debug!("Found existing {} '{}' ({})", entity_type, name, existing.id);
            return Ok(Resolution {
                entity: existing.entity(),
                created: false,
            });
        }

        let template = match template_name {
            Some(template_name) => Some(self.resolve_template(template_name).await?),
            None => None,
        };

        let mut fields = Map::new();
        fields.insert("code".into(), json!(name));
        fields.insert("description".into(), json!(CREATED_DESCRIPTION));
        fields.insert(
            "task_template".into(),
            template.as_ref().map(RemoteEntity::link).unwrap_or(Value::Null),
        );
        fields.insert("project".into(), project.link());

        let created = self.remote.create(entity_type, fields).await?;
        info!("Created {} '{}' ({})", entity_type, name, created.id);

        Ok(Resolution {
            entity: created.entity(),
            created: true,
        })
    }
}
