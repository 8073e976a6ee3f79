use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Archived,
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(anyhow!("Unknown project status {s}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub contact: ClientContact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Id,
    pub name: String,
    pub client_id: Option<Id>,
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_per_hour: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client fields supplied by the caller. The store fills in id and timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewClient {
    pub name: String,
    pub company: Option<String>,
    pub contact: ClientContact,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub client_id: Option<Id>,
    pub status: ProjectStatus,
    pub rate_per_hour: Option<f64>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl NewProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client_id: None,
            status: ProjectStatus::Active,
            rate_per_hour: None,
            tags: vec![],
            notes: None,
        }
    }
}

/// Partial update of a client. `None` leaves a field alone, for optional fields `Some(None)`
/// clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub company: Option<Option<String>>,
    pub contact: Option<ClientContact>,
    pub notes: Option<Option<String>>,
}

impl ClientPatch {
    pub fn apply(self, client: &mut Client) {
        if let Some(name) = self.name {
            client.name = name;
        }
        if let Some(company) = self.company {
            client.company = company;
        }
        if let Some(contact) = self.contact {
            client.contact = contact;
        }
        if let Some(notes) = self.notes {
            client.notes = notes;
        }
    }
}

impl From<NewClient> for ClientPatch {
    fn from(value: NewClient) -> Self {
        Self {
            name: Some(value.name),
            company: Some(value.company),
            contact: Some(value.contact),
            notes: Some(value.notes),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub client_id: Option<Option<Id>>,
    pub status: Option<ProjectStatus>,
    pub rate_per_hour: Option<Option<f64>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
}

impl ProjectPatch {
    pub fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(client_id) = self.client_id {
            project.client_id = client_id;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(rate) = self.rate_per_hour {
            project.rate_per_hour = rate;
        }
        if let Some(tags) = self.tags {
            project.tags = tags;
        }
        if let Some(notes) = self.notes {
            project.notes = notes;
        }
    }
}

impl From<NewProject> for ProjectPatch {
    fn from(value: NewProject) -> Self {
        Self {
            name: Some(value.name),
            client_id: Some(value.client_id),
            status: Some(value.status),
            rate_per_hour: Some(value.rate_per_hour),
            tags: Some(value.tags),
            notes: Some(value.notes),
        }
    }
}
