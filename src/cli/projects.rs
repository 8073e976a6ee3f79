use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;

use crate::{
    config::AppConfig,
    query::StatusFilter,
    store::entities::{Project, ProjectPatch, ProjectStatus},
    utils::clock::DefaultClock,
    validation::{validate_project, ProjectDraft, Validation},
};

use super::{
    output::{print_field_errors, print_projects, project_line},
    PageArgs,
};

#[derive(Debug, Subcommand)]
pub enum ProjectsCommand {
    #[command(about = "List projects matching an optional search")]
    List {
        #[arg(help = "Matched against name, tags and client name")]
        query: Option<String>,
        #[arg(long, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        #[command(flatten)]
        page: PageArgs,
    },
    #[command(about = "Create a project")]
    Create {
        #[command(flatten)]
        fields: ProjectFields,
    },
    #[command(about = "Change fields of a project. Empty values clear optional fields")]
    Update {
        id: String,
        #[command(flatten)]
        fields: ProjectFields,
    },
    #[command(about = "Delete a project")]
    Delete { id: String },
}

#[derive(Debug, Default, clap::Args)]
pub struct ProjectFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "client", help = "Id of the owning client")]
    client_id: Option<String>,
    #[arg(long, conflicts_with = "client_id", help = "Remove the project from its client")]
    no_client: bool,
    #[arg(long, help = "active or archived")]
    status: Option<String>,
    #[arg(long = "rate", help = "Hourly rate, a number >= 0")]
    rate_per_hour: Option<String>,
    #[arg(long, help = "Comma or space separated, e.g. \"web, design\"")]
    tags: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl ProjectFields {
    /// Overlays the given flags on top of `base`.
    fn into_draft(self, base: ProjectDraft) -> Result<ProjectDraft> {
        let status = match self.status {
            Some(status) => status.parse::<ProjectStatus>()?,
            None => base.status,
        };
        let client_id = if self.no_client {
            None
        } else {
            self.client_id.or(base.client_id)
        };
        Ok(ProjectDraft {
            name: self.name.unwrap_or(base.name),
            client_id,
            status,
            rate_per_hour: self.rate_per_hour.unwrap_or(base.rate_per_hour),
            tags: self.tags.unwrap_or(base.tags),
            notes: self.notes.unwrap_or(base.notes),
        })
    }
}

fn draft_from_project(project: &Project) -> ProjectDraft {
    ProjectDraft {
        name: project.name.clone(),
        client_id: project.client_id.clone(),
        status: project.status,
        rate_per_hour: project
            .rate_per_hour
            .map(|v| v.to_string())
            .unwrap_or_default(),
        tags: project.tags.join(", "),
        notes: project.notes.clone().unwrap_or_default(),
    }
}

pub async fn process_projects_command(
    command: ProjectsCommand,
    config: &AppConfig,
) -> Result<()> {
    let mut api = config.open_api(Arc::new(DefaultClock))?;
    match command {
        ProjectsCommand::List {
            query,
            status,
            page,
        } => {
            let result = api
                .list_projects(
                    query.as_deref().unwrap_or_default(),
                    status,
                    page.pagination()?,
                )
                .await;
            print_projects(&result, api.store().database());
        }
        ProjectsCommand::Create { fields } => {
            let draft = fields.into_draft(ProjectDraft::default())?;
            let new = match validate_project(&draft) {
                Validation::Valid(new) => new,
                Validation::Invalid(errors) => {
                    print_field_errors(&errors);
                    bail!("Project is invalid");
                }
            };
            let project = api.create_project(new).await?;
            println!("{}", project_line(&project, api.store().database()));
        }
        ProjectsCommand::Update { id, fields } => {
            let Some(existing) = api.store().get_project(&id) else {
                bail!("Project not found: {id}");
            };
            let draft = fields.into_draft(draft_from_project(existing))?;
            let new = match validate_project(&draft) {
                Validation::Valid(new) => new,
                Validation::Invalid(errors) => {
                    print_field_errors(&errors);
                    bail!("Project is invalid");
                }
            };
            let project = api.update_project(&id, ProjectPatch::from(new)).await?;
            println!("{}", project_line(&project, api.store().database()));
        }
        ProjectsCommand::Delete { id } => {
            api.delete_project(&id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
