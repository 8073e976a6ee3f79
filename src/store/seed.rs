use crate::utils::{clock::Clock, ids::IdGenerator};

use super::{
    database::Database,
    entities::{Client, ClientContact, Project, ProjectStatus},
};

/// What a store starts with when nothing was persisted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    /// A couple of clients and projects to explore the commands with.
    Demo,
    Empty,
}

impl Seed {
    pub fn build(self, clock: &dyn Clock, ids: &dyn IdGenerator) -> Database {
        match self {
            Seed::Demo => demo_database(clock, ids),
            Seed::Empty => Database::default(),
        }
    }
}

fn demo_database(clock: &dyn Clock, ids: &dyn IdGenerator) -> Database {
    let now = clock.time();
    let acme = Client {
        id: ids.next_id(),
        name: "Acme Corp".into(),
        company: Some("Acme Corp".into()),
        contact: ClientContact {
            email: Some("hello@acme.com".into()),
            phone: Some("+1 555 000".into()),
            website: Some("https://acme.com".into()),
        },
        notes: Some("VIP client".into()),
        created_at: now,
        updated_at: now,
    };
    let globex = Client {
        id: ids.next_id(),
        name: "Globex".into(),
        company: Some("Globex LLC".into()),
        contact: ClientContact {
            email: Some("info@globex.io".into()),
            ..Default::default()
        },
        notes: None,
        created_at: now,
        updated_at: now,
    };

    let project = |name: &str, client: &Client, status, rate, tags: &[&str], notes: Option<&str>| {
        Project {
            id: ids.next_id(),
            name: name.into(),
            client_id: Some(client.id.clone()),
            status,
            rate_per_hour: rate,
            tags: tags.iter().map(|v| v.to_string()).collect(),
            notes: notes.map(Into::into),
            created_at: now,
            updated_at: now,
        }
    };
    let projects = [
        project(
            "Website Redesign",
            &acme,
            ProjectStatus::Active,
            Some(95.),
            &["web", "design"],
            Some("Priority Q3"),
        ),
        project("Mobile App", &acme, ProjectStatus::Active, Some(120.), &["mobile"], None),
        project(
            "Consulting Retainer",
            &globex,
            ProjectStatus::Archived,
            None,
            &["consulting"],
            None,
        ),
    ];

    Database {
        clients: [acme, globex].into_iter().map(|c| (c.id.clone(), c)).collect(),
        projects: projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
    }
}
