//! Read side of the store: searching, status filtering and pagination over a [Database]
//! snapshot. Nothing here mutates.

use std::fmt::Display;

use anyhow::bail;
use clap::ValueEnum;
use serde::Serialize;

use crate::store::{
    database::Database,
    entities::{Client, Project, ProjectStatus},
};

pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// 1-indexed page request. Both values are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    page_size: u32,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> anyhow::Result<Self> {
        if page == 0 {
            bail!("Page starts at 1");
        }
        if page_size == 0 {
            bail!("Page size must be at least 1");
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Number of matches before slicing.
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size as usize).max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        (self.page as usize) < self.total_pages()
    }
}

/// Slices an already filtered and sorted sequence. A page past the end is empty, never an error.
pub fn paginate<T>(items: Vec<T>, pagination: Pagination) -> PagedResult<T> {
    let total = items.len();
    let items = items
        .into_iter()
        .skip(pagination.offset())
        .take(pagination.page_size as usize)
        .collect();
    PagedResult {
        items,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StatusFilter {
    Active,
    Archived,
    #[default]
    All,
}

impl StatusFilter {
    fn matches(&self, status: ProjectStatus) -> bool {
        match self {
            StatusFilter::Active => status == ProjectStatus::Active,
            StatusFilter::Archived => status == ProjectStatus::Archived,
            StatusFilter::All => true,
        }
    }
}

impl Display for StatusFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusFilter::Active => write!(f, "active"),
            StatusFilter::Archived => write!(f, "archived"),
            StatusFilter::All => write!(f, "all"),
        }
    }
}

/// Case-insensitive substring search. The needle is used as typed, surrounding whitespace
/// included. Only an empty needle matches everything.
struct TextQuery(Option<String>);

impl TextQuery {
    fn new(query: &str) -> Self {
        Self((!query.is_empty()).then(|| query.to_lowercase()))
    }

    fn matches_any<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        match &self.0 {
            None => true,
            Some(needle) => fields
                .into_iter()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
        }
    }
}

pub fn sorted_clients(database: &Database) -> Vec<&Client> {
    let mut clients = database.clients.values().collect::<Vec<_>>();
    clients.sort_by(|a, b| {
        (a.created_at, &a.name, &a.id).cmp(&(b.created_at, &b.name, &b.id))
    });
    clients
}

fn sorted_projects(database: &Database) -> Vec<&Project> {
    let mut projects = database.projects.values().collect::<Vec<_>>();
    projects.sort_by(|a, b| {
        (a.created_at, &a.name, &a.id).cmp(&(b.created_at, &b.name, &b.id))
    });
    projects
}

/// Matches `query` against name, company, email and phone.
pub fn list_clients(
    database: &Database,
    query: &str,
    pagination: Pagination,
) -> PagedResult<Client> {
    let query = TextQuery::new(query);
    let matches = sorted_clients(database)
        .into_iter()
        .filter(|c| {
            query.matches_any([
                c.name.as_str(),
                c.company.as_deref().unwrap_or_default(),
                c.contact.email.as_deref().unwrap_or_default(),
                c.contact.phone.as_deref().unwrap_or_default(),
            ])
        })
        .cloned()
        .collect();
    paginate(matches, pagination)
}

/// Filters by status first, then matches `query` against the name, the tags joined by spaces
/// and the owning client's name.
pub fn list_projects(
    database: &Database,
    query: &str,
    status: StatusFilter,
    pagination: Pagination,
) -> PagedResult<Project> {
    let query = TextQuery::new(query);
    let matches = sorted_projects(database)
        .into_iter()
        .filter(|p| status.matches(p.status))
        .filter(|p| {
            let tags = p.tags.join(" ");
            let client_name = p
                .client_id
                .as_deref()
                .and_then(|id| database.client_name(id))
                .unwrap_or_default();
            query.matches_any([p.name.as_str(), tags.as_str(), client_name])
        })
        .cloned()
        .collect();
    paginate(matches, pagination)
}

pub fn projects_for_client(database: &Database, client_id: &str) -> Vec<Project> {
    sorted_projects(database)
        .into_iter()
        .filter(|p| p.client_id.as_deref() == Some(client_id))
        .cloned()
        .collect()
}
