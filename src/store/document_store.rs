use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::{
    error::{EntityKind, StoreError, StoreResult},
    tags::dedup_tags,
    utils::{clock::Clock, ids::IdGenerator},
};

use super::{
    database::Database,
    entities::{Client, ClientPatch, Id, NewClient, NewProject, Project, ProjectPatch},
    persistence::PersistenceAdapter,
    seed::Seed,
};

/// Owns every client and project. Each mutation prepares the next snapshot, writes it through
/// the [PersistenceAdapter] and only then makes it current, so a failed write changes nothing.
///
/// There is no locking, callers are expected to serialize their writes.
pub struct DocumentStore<P: PersistenceAdapter> {
    database: Database,
    persistence: P,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<P: PersistenceAdapter> DocumentStore<P> {
    /// Loads the stored snapshot, or writes `seed` when there is none.
    pub fn open(
        persistence: P,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        seed: Seed,
    ) -> Result<Self> {
        let database = match persistence.load()? {
            Some(mut database) => {
                let repaired = database.repair_client_refs();
                if repaired > 0 {
                    warn!("Unassigned {repaired} projects referencing missing clients");
                    persistence.save(&database)?;
                }
                database
            }
            None => {
                info!("No snapshot found, seeding {seed:?}");
                let database = seed.build(clock.as_ref(), ids.as_ref());
                persistence.save(&database)?;
                database
            }
        };

        Ok(Self {
            database,
            persistence,
            clock,
            ids,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn get_client(&self, id: &str) -> Option<&Client> {
        self.database.clients.get(id)
    }

    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.database.projects.get(id)
    }

    fn commit(&mut self, next: Database) -> StoreResult<()> {
        self.persistence.save(&next)?;
        self.database = next;
        Ok(())
    }

    fn check_client_ref(&self, client_id: Option<&Id>) -> StoreResult<()> {
        match client_id {
            Some(id) if !self.database.clients.contains_key(id) => {
                Err(StoreError::UnknownClient(id.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn create_client(&mut self, new: NewClient) -> StoreResult<Client> {
        let now = self.clock.time();
        let client = Client {
            id: self.ids.next_id(),
            name: new.name,
            company: new.company,
            contact: new.contact,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.database.clone();
        next.clients.insert(client.id.clone(), client.clone());
        self.commit(next)?;
        debug!("Created client {}", client.id);
        Ok(client)
    }

    pub fn update_client(&mut self, id: &str, patch: ClientPatch) -> StoreResult<Client> {
        let mut next = self.database.clone();
        let client = next
            .clients
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Client, id))?;
        patch.apply(client);
        client.updated_at = self.clock.time();
        let client = client.clone();

        self.commit(next)?;
        debug!("Updated client {id}");
        Ok(client)
    }

    /// Removes the client and unassigns its projects as a single write. Returns how many
    /// projects were unassigned.
    pub fn delete_client(&mut self, id: &str) -> StoreResult<usize> {
        let mut next = self.database.clone();
        if next.clients.remove(id).is_none() {
            return Err(StoreError::not_found(EntityKind::Client, id));
        }
        let mut unassigned = 0;
        for project in next.projects.values_mut() {
            if project.client_id.as_deref() == Some(id) {
                project.client_id = None;
                unassigned += 1;
            }
        }

        self.commit(next)?;
        debug!("Deleted client {id}, unassigned {unassigned} projects");
        Ok(unassigned)
    }

    pub fn create_project(&mut self, new: NewProject) -> StoreResult<Project> {
        self.check_client_ref(new.client_id.as_ref())?;
        let now = self.clock.time();
        let project = Project {
            id: self.ids.next_id(),
            name: new.name,
            client_id: new.client_id,
            status: new.status,
            rate_per_hour: new.rate_per_hour,
            tags: dedup_tags(new.tags),
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let mut next = self.database.clone();
        next.projects.insert(project.id.clone(), project.clone());
        self.commit(next)?;
        debug!("Created project {}", project.id);
        Ok(project)
    }

    pub fn update_project(&mut self, id: &str, mut patch: ProjectPatch) -> StoreResult<Project> {
        if let Some(client_id) = &patch.client_id {
            self.check_client_ref(client_id.as_ref())?;
        }
        patch.tags = patch.tags.map(dedup_tags);

        let mut next = self.database.clone();
        let project = next
            .projects
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Project, id))?;
        patch.apply(project);
        project.updated_at = self.clock.time();
        let project = project.clone();

        self.commit(next)?;
        debug!("Updated project {id}");
        Ok(project)
    }

    pub fn delete_project(&mut self, id: &str) -> StoreResult<()> {
        let mut next = self.database.clone();
        if next.projects.remove(id).is_none() {
            return Err(StoreError::not_found(EntityKind::Project, id));
        }
        self.commit(next)?;
        debug!("Deleted project {id}");
        Ok(())
    }

    /// Makes `project_ids` exactly the set of projects assigned to the client. Projects of the
    /// client that aren't listed get unassigned. Everything is written at once.
    pub fn assign_projects(
        &mut self,
        client_id: &str,
        project_ids: &[Id],
    ) -> StoreResult<Vec<Project>> {
        if !self.database.clients.contains_key(client_id) {
            return Err(StoreError::not_found(EntityKind::Client, client_id));
        }
        if let Some(missing) = project_ids
            .iter()
            .find(|id| !self.database.projects.contains_key(*id))
        {
            return Err(StoreError::not_found(EntityKind::Project, missing.clone()));
        }

        let now = self.clock.time();
        let mut next = self.database.clone();
        let mut assigned = Vec::new();
        for project in next.projects.values_mut() {
            let listed = project_ids.contains(&project.id);
            let owned = project.client_id.as_deref() == Some(client_id);
            if listed && !owned {
                project.client_id = Some(client_id.to_string());
                project.updated_at = now;
            } else if !listed && owned {
                project.client_id = None;
                project.updated_at = now;
            }
            if listed {
                assigned.push(project.clone());
            }
        }

        self.commit(next)?;
        debug!("Client {client_id} now has {} projects", assigned.len());
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};

    use super::DocumentStore;
    use crate::{
        error::{EntityKind, StoreError},
        store::{
            entities::{ClientContact, ClientPatch, NewClient, NewProject, ProjectPatch},
            persistence::{MemoryPersistence, MockPersistenceAdapter, PersistenceAdapter},
            seed::Seed,
        },
        utils::{clock::ManualClock, ids::SequentialIdGenerator, logging::TEST_LOGGING},
    };

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap(),
        ))
    }

    fn open<P: PersistenceAdapter>(
        persistence: P,
        clock: Arc<ManualClock>,
    ) -> Result<DocumentStore<P>> {
        *TEST_LOGGING;
        DocumentStore::open(
            persistence,
            clock,
            Arc::new(SequentialIdGenerator::new("id")),
            Seed::Empty,
        )
    }

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.into(),
            ..Default::default()
        }
    }

    fn project_for(name: &str, client_id: Option<&str>) -> NewProject {
        NewProject {
            client_id: client_id.map(Into::into),
            ..NewProject::named(name)
        }
    }

    #[test]
    fn test_open_seeds_once() -> Result<()> {
        let memory = Arc::new(MemoryPersistence::new());
        let store = DocumentStore::open(
            memory.clone(),
            clock(),
            Arc::new(SequentialIdGenerator::new("id")),
            Seed::Demo,
        )?;
        assert_eq!(store.database().clients.len(), 2);
        assert_eq!(memory.writes(), 1);

        let reopened = DocumentStore::open(
            memory.clone(),
            clock(),
            Arc::new(SequentialIdGenerator::new("other")),
            Seed::Demo,
        )?;
        assert_eq!(reopened.database(), store.database());
        assert_eq!(memory.writes(), 1);
        Ok(())
    }

    #[test]
    fn test_open_repairs_dangling_refs() -> Result<()> {
        let memory = Arc::new(MemoryPersistence::new());
        {
            let mut store = open(memory.clone(), clock())?;
            store.create_project(NewProject::named("Orphan"))?;
        }
        let mut database = memory.load()?.unwrap();
        for project in database.projects.values_mut() {
            project.client_id = Some("gone".into());
        }
        memory.save(&database)?;

        let store = open(memory.clone(), clock())?;
        assert!(store.database().dangling_client_refs().is_empty());
        assert_eq!(memory.load()?.as_ref(), Some(store.database()));
        Ok(())
    }

    #[test]
    fn test_create_sets_ids_and_timestamps() -> Result<()> {
        let clock = clock();
        let mut store = open(MemoryPersistence::new(), clock.clone())?;
        let client = store.create_client(NewClient {
            name: "Acme Corp".into(),
            contact: ClientContact {
                email: Some("hello@acme.com".into()),
                ..Default::default()
            },
            ..Default::default()
        })?;
        assert_eq!(client.id, "id-1");
        assert_eq!(client.created_at, client.updated_at);
        assert_eq!(store.get_client("id-1"), Some(&client));

        clock.advance(Duration::from_secs(60));
        let updated = store.update_client(
            &client.id,
            ClientPatch {
                company: Some(Some("Acme".into())),
                ..Default::default()
            },
        )?;
        assert_eq!(updated.created_at, client.created_at);
        assert_eq!(updated.updated_at, client.created_at + chrono::Duration::minutes(1));
        assert_eq!(updated.company.as_deref(), Some("Acme"));
        assert_eq!(updated.contact.email.as_deref(), Some("hello@acme.com"));
        Ok(())
    }

    #[test]
    fn test_delete_client_unassigns_projects() -> Result<()> {
        let mut store = open(MemoryPersistence::new(), clock())?;
        let acme = store.create_client(new_client("Acme Corp"))?;
        let globex = store.create_client(new_client("Globex"))?;
        let a = store.create_project(project_for("A", Some(&acme.id)))?;
        let b = store.create_project(project_for("B", Some(&acme.id)))?;
        let c = store.create_project(project_for("C", Some(&globex.id)))?;
        store.create_project(project_for("D", None))?;

        let unassigned = store.delete_client(&acme.id)?;

        assert_eq!(unassigned, 2);
        assert!(store.get_client(&acme.id).is_none());
        assert_eq!(store.database().projects.len(), 4);
        assert_eq!(store.get_project(&a.id).unwrap().client_id, None);
        assert_eq!(store.get_project(&b.id).unwrap().client_id, None);
        assert_eq!(
            store.get_project(&c.id).unwrap().client_id.as_deref(),
            Some(globex.id.as_str())
        );
        assert!(store.database().dangling_client_refs().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_ids_are_not_found() -> Result<()> {
        let mut store = open(MemoryPersistence::new(), clock())?;
        assert!(matches!(
            store.update_client("nope", ClientPatch::default()),
            Err(StoreError::NotFound {
                kind: EntityKind::Client,
                ..
            })
        ));
        assert!(matches!(
            store.delete_client("nope"),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update_project("nope", ProjectPatch::default()),
            Err(StoreError::NotFound {
                kind: EntityKind::Project,
                ..
            })
        ));
        assert!(matches!(
            store.delete_project("nope"),
            Err(StoreError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_client_reference_is_rejected() -> Result<()> {
        let mut store = open(MemoryPersistence::new(), clock())?;
        assert!(matches!(
            store.create_project(project_for("A", Some("ghost"))),
            Err(StoreError::UnknownClient(id)) if id == "ghost"
        ));
        let project = store.create_project(project_for("A", None))?;
        assert!(matches!(
            store.update_project(
                &project.id,
                ProjectPatch {
                    client_id: Some(Some("ghost".into())),
                    ..Default::default()
                }
            ),
            Err(StoreError::UnknownClient(_))
        ));
        Ok(())
    }

    #[test]
    fn test_project_tags_are_a_set() -> Result<()> {
        let mut store = open(MemoryPersistence::new(), clock())?;
        let project = store.create_project(NewProject {
            tags: vec!["web".into(), "design".into(), "web".into()],
            ..NewProject::named("Website")
        })?;
        assert_eq!(project.tags, vec!["web", "design"]);
        Ok(())
    }

    #[test]
    fn test_assign_projects() -> Result<()> {
        let mut store = open(MemoryPersistence::new(), clock())?;
        let acme = store.create_client(new_client("Acme Corp"))?;
        let a = store.create_project(project_for("A", Some(&acme.id)))?;
        let b = store.create_project(project_for("B", None))?;
        let c = store.create_project(project_for("C", None))?;

        let assigned = store.assign_projects(&acme.id, &[b.id.clone(), c.id.clone()])?;

        assert_eq!(assigned.len(), 2);
        assert_eq!(store.get_project(&a.id).unwrap().client_id, None);
        for id in [&b.id, &c.id] {
            assert_eq!(
                store.get_project(id).unwrap().client_id.as_deref(),
                Some(acme.id.as_str())
            );
        }

        assert!(matches!(
            store.assign_projects(&acme.id, &["ghost".into()]),
            Err(StoreError::NotFound {
                kind: EntityKind::Project,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_every_mutation_writes_once() -> Result<()> {
        let mut persistence = MockPersistenceAdapter::new();
        persistence.expect_load().times(1).returning(|| Ok(None));
        // seed + 2 creates + update + delete
        persistence.expect_save().times(5).returning(|_| Ok(()));

        let mut store = open(persistence, clock())?;
        let client = store.create_client(new_client("Acme Corp"))?;
        store.create_project(project_for("A", Some(&client.id)))?;
        store.update_client(&client.id, ClientPatch::default())?;
        store.delete_client(&client.id)?;
        Ok(())
    }

    #[test]
    fn test_cascade_is_a_single_write() -> Result<()> {
        let memory = MemoryPersistence::new();
        let seeded = {
            let mut store = open(&memory, clock())?;
            let client = store.create_client(new_client("Acme Corp"))?;
            store.create_project(project_for("A", Some(&client.id)))?;
            store.create_project(project_for("B", Some(&client.id)))?;
            store.database().clone()
        };
        let mut persistence = MockPersistenceAdapter::new();
        let loaded = seeded.clone();
        persistence
            .expect_load()
            .returning(move || Ok(Some(loaded.clone())));
        persistence
            .expect_save()
            .times(1)
            .withf(|db| db.clients.is_empty() && db.dangling_client_refs().is_empty())
            .returning(|_| Ok(()));

        let mut store = open(persistence, clock())?;
        let client_id = seeded.clients.keys().next().unwrap().clone();
        assert_eq!(store.delete_client(&client_id)?, 2);
        Ok(())
    }

    #[test]
    fn test_failed_write_changes_nothing() -> Result<()> {
        let mut persistence = MockPersistenceAdapter::new();
        persistence.expect_load().returning(|| Ok(None));
        let mut calls = 0;
        persistence.expect_save().returning(move |_| {
            calls += 1;
            // seed and both creates go through
            if calls <= 3 {
                Ok(())
            } else {
                Err(anyhow!("disk full"))
            }
        });

        let mut store = open(persistence, clock())?;
        let client = store.create_client(new_client("Acme Corp"))?;
        store.create_project(project_for("A", Some(&client.id)))?;
        let before = store.database().clone();

        assert!(matches!(
            store.delete_client(&client.id),
            Err(StoreError::Persistence(_))
        ));
        assert_eq!(store.database(), &before);
        assert!(store.create_client(new_client("Globex")).is_err());
        assert_eq!(store.database(), &before);
        Ok(())
    }
}
