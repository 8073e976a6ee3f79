//! Async facade over the store and the query functions. This is what presentation code talks
//! to. Every call optionally waits a configured latency before answering, which emulates a
//! remote backend during development. The wait never fails and isn't a retry mechanism.

use std::{sync::Arc, time::Duration};

use tracing::instrument;

use crate::{
    error::StoreResult,
    query::{self, PagedResult, Pagination, StatusFilter},
    store::{
        entities::{Client, ClientPatch, Id, NewClient, NewProject, Project, ProjectPatch},
        persistence::PersistenceAdapter,
        DocumentStore,
    },
    utils::clock::Clock,
};

pub struct TimeflowApi<P: PersistenceAdapter> {
    store: DocumentStore<P>,
    clock: Arc<dyn Clock>,
    latency: Duration,
}

impl<P: PersistenceAdapter> TimeflowApi<P> {
    pub fn new(store: DocumentStore<P>, clock: Arc<dyn Clock>, latency: Duration) -> Self {
        Self {
            store,
            clock,
            latency,
        }
    }

    pub fn store(&self) -> &DocumentStore<P> {
        &self.store
    }

    async fn simulate<T>(&self, value: T) -> T {
        if !self.latency.is_zero() {
            self.clock.sleep(self.latency).await;
        }
        value
    }

    #[instrument(skip(self))]
    pub async fn list_clients(&self, query: &str, pagination: Pagination) -> PagedResult<Client> {
        let result = query::list_clients(self.store.database(), query, pagination);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn list_projects(
        &self,
        query: &str,
        status: StatusFilter,
        pagination: Pagination,
    ) -> PagedResult<Project> {
        let result = query::list_projects(self.store.database(), query, status, pagination);
        self.simulate(result).await
    }

    pub async fn get_all_clients(&self) -> Vec<Client> {
        let clients = query::sorted_clients(self.store.database())
            .into_iter()
            .cloned()
            .collect();
        self.simulate(clients).await
    }

    pub async fn projects_for_client(&self, client_id: &str) -> Vec<Project> {
        let projects = query::projects_for_client(self.store.database(), client_id);
        self.simulate(projects).await
    }

    #[instrument(skip(self))]
    pub async fn create_client(&mut self, client: NewClient) -> StoreResult<Client> {
        let result = self.store.create_client(client);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn update_client(&mut self, id: &str, patch: ClientPatch) -> StoreResult<Client> {
        let result = self.store.update_client(id, patch);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn delete_client(&mut self, id: &str) -> StoreResult<()> {
        let result = self.store.delete_client(id).map(|_| ());
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn create_project(&mut self, project: NewProject) -> StoreResult<Project> {
        let result = self.store.create_project(project);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn update_project(&mut self, id: &str, patch: ProjectPatch) -> StoreResult<Project> {
        let result = self.store.update_project(id, patch);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&mut self, id: &str) -> StoreResult<()> {
        let result = self.store.delete_project(id);
        self.simulate(result).await
    }

    #[instrument(skip(self))]
    pub async fn assign_projects(
        &mut self,
        client_id: &str,
        project_ids: &[Id],
    ) -> StoreResult<Vec<Project>> {
        let result = self.store.assign_projects(client_id, project_ids);
        self.simulate(result).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::Utc;

    use super::TimeflowApi;
    use crate::{
        query::{Pagination, StatusFilter},
        store::{persistence::MemoryPersistence, seed::Seed, DocumentStore},
        utils::{
            clock::{Clock, ManualClock},
            ids::SequentialIdGenerator,
        },
    };

    #[tokio::test]
    async fn test_latency_goes_through_clock() -> Result<()> {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = DocumentStore::open(
            MemoryPersistence::new(),
            clock.clone(),
            Arc::new(SequentialIdGenerator::new("id")),
            Seed::Demo,
        )?;
        let api = TimeflowApi::new(store, clock.clone(), Duration::from_millis(200));

        let before = clock.instant();
        let page = api
            .list_projects("", StatusFilter::Active, Pagination::default())
            .await;
        assert_eq!(page.total, 2);
        assert_eq!(clock.instant() - before, Duration::from_millis(200));

        api.get_all_clients().await;
        assert_eq!(clock.instant() - before, Duration::from_millis(400));
        Ok(())
    }
}
