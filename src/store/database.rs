use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entities::{Client, Id, Project};

/// The whole persisted document: `{ clients: {id -> Client}, projects: {id -> Project} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub clients: BTreeMap<Id, Client>,
    #[serde(default)]
    pub projects: BTreeMap<Id, Project>,
}

impl Database {
    pub fn client_name(&self, id: &str) -> Option<&str> {
        self.clients.get(id).map(|c| c.name.as_str())
    }

    /// Projects whose `client_id` points at a client that doesn't exist.
    pub fn dangling_client_refs(&self) -> Vec<&Id> {
        self.projects
            .values()
            .filter(|p| {
                p.client_id
                    .as_ref()
                    .is_some_and(|id| !self.clients.contains_key(id))
            })
            .map(|p| &p.id)
            .collect()
    }

    /// Nulls every dangling client reference. Returns how many projects were touched.
    pub fn repair_client_refs(&mut self) -> usize {
        let clients = &self.clients;
        let mut repaired = 0;
        for project in self.projects.values_mut() {
            if project
                .client_id
                .as_ref()
                .is_some_and(|id| !clients.contains_key(id))
            {
                project.client_id = None;
                repaired += 1;
            }
        }
        repaired
    }
}
