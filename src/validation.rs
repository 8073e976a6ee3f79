//! Form style validation. Every field is checked and all problems are reported at once as a map
//! from field path (`contact.email`) to a human readable message.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;

use crate::{
    store::entities::{ClientContact, Id, NewClient, NewProject, ProjectStatus},
    tags::{dedup_tags, parse_tags},
};

pub const MAX_ENTRY_NAME_LEN: usize = 80;
const MIN_NAME_LEN: usize = 2;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s/?#]+(?:[/?#]\S*)?$").expect("url pattern is valid")
});

pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(FieldErrors),
}

impl<T> Validation<T> {
    fn from_parts(value: T, errors: FieldErrors) -> Self {
        if errors.is_empty() {
            Self::Valid(value)
        } else {
            Self::Invalid(errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self {
            Self::Valid(v) => Ok(v),
            Self::Invalid(errors) => Err(errors),
        }
    }
}

/// Raw client form input. Empty strings mean "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientDraft {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub client_id: Option<Id>,
    pub status: ProjectStatus,
    pub rate_per_hour: String,
    pub tags: String,
    pub notes: String,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            client_id: None,
            status: ProjectStatus::Active,
            rate_per_hour: String::new(),
            tags: String::new(),
            notes: String::new(),
        }
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn check_name(name: &str, errors: &mut FieldErrors) -> String {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        errors.insert(
            "name".into(),
            format!("Name must be at least {MIN_NAME_LEN} characters"),
        );
    }
    name.to_string()
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_url(value: &str) -> bool {
    URL.is_match(value)
}

pub fn validate_client(draft: &ClientDraft) -> Validation<NewClient> {
    let mut errors = FieldErrors::new();
    let name = check_name(&draft.name, &mut errors);

    let email = optional(&draft.email);
    if email.as_deref().is_some_and(|v| !is_email(v)) {
        errors.insert("contact.email".into(), "Invalid email".into());
    }
    let website = optional(&draft.website);
    if website.as_deref().is_some_and(|v| !is_url(v)) {
        errors.insert("contact.website".into(), "Invalid URL".into());
    }

    Validation::from_parts(
        NewClient {
            name,
            company: optional(&draft.company),
            contact: ClientContact {
                email,
                phone: optional(&draft.phone),
                website,
            },
            notes: optional(&draft.notes),
        },
        errors,
    )
}

fn check_rate(raw: &str, errors: &mut FieldErrors) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if !v.is_finite() => {
            errors.insert("ratePerHour".into(), "Expected a finite number".into());
            None
        }
        Ok(v) if v < 0. => {
            errors.insert(
                "ratePerHour".into(),
                "Number must be greater than or equal to 0".into(),
            );
            None
        }
        Ok(v) => Some(v),
        Err(_) => {
            errors.insert("ratePerHour".into(), "Expected number".into());
            None
        }
    }
}

pub fn validate_project(draft: &ProjectDraft) -> Validation<NewProject> {
    let mut errors = FieldErrors::new();
    let name = check_name(&draft.name, &mut errors);
    let rate_per_hour = check_rate(&draft.rate_per_hour, &mut errors);

    Validation::from_parts(
        NewProject {
            name,
            client_id: draft.client_id.clone().filter(|v| !v.trim().is_empty()),
            status: draft.status,
            rate_per_hour,
            tags: dedup_tags(parse_tags(&draft.tags)),
            notes: optional(&draft.notes),
        },
        errors,
    )
}

/// Message for a timer entry name that is too long. Long names are flagged, never refused.
pub fn validate_entry_name(name: &str) -> Option<String> {
    (name.chars().count() > MAX_ENTRY_NAME_LEN)
        .then(|| format!("Name is too long (max {MAX_ENTRY_NAME_LEN} characters)."))
}
