use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::info;

use crate::{
    config::AppConfig,
    store::entities::{Client, ClientPatch},
    utils::clock::DefaultClock,
    validation::{validate_client, ClientDraft, Validation},
};

use super::{
    output::{print_client, print_clients, print_field_errors, project_line},
    PageArgs,
};

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    #[command(about = "List clients matching an optional search")]
    List {
        #[arg(help = "Matched against name, company, email and phone")]
        query: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    #[command(about = "Create a client")]
    Create {
        #[command(flatten)]
        fields: ClientFields,
    },
    #[command(about = "Change fields of a client. Empty values clear optional fields")]
    Update {
        id: String,
        #[command(flatten)]
        fields: ClientFields,
    },
    #[command(about = "Delete a client. Its projects become unassigned")]
    Delete { id: String },
    #[command(about = "Make the listed projects exactly the ones belonging to a client")]
    Assign {
        id: String,
        #[arg(help = "Project ids. Projects of the client that aren't listed get unassigned")]
        project_ids: Vec<String>,
    },
}

#[derive(Debug, Default, clap::Args)]
pub struct ClientFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

impl ClientFields {
    /// Overlays the given flags on top of `base`.
    fn into_draft(self, base: ClientDraft) -> ClientDraft {
        ClientDraft {
            name: self.name.unwrap_or(base.name),
            company: self.company.unwrap_or(base.company),
            email: self.email.unwrap_or(base.email),
            phone: self.phone.unwrap_or(base.phone),
            website: self.website.unwrap_or(base.website),
            notes: self.notes.unwrap_or(base.notes),
        }
    }
}

fn draft_from_client(client: &Client) -> ClientDraft {
    ClientDraft {
        name: client.name.clone(),
        company: client.company.clone().unwrap_or_default(),
        email: client.contact.email.clone().unwrap_or_default(),
        phone: client.contact.phone.clone().unwrap_or_default(),
        website: client.contact.website.clone().unwrap_or_default(),
        notes: client.notes.clone().unwrap_or_default(),
    }
}

pub async fn process_clients_command(command: ClientsCommand, config: &AppConfig) -> Result<()> {
    let mut api = config.open_api(Arc::new(DefaultClock))?;
    match command {
        ClientsCommand::List { query, page } => {
            let result = api
                .list_clients(query.as_deref().unwrap_or_default(), page.pagination()?)
                .await;
            print_clients(&result);
        }
        ClientsCommand::Create { fields } => {
            let draft = fields.into_draft(ClientDraft::default());
            let new = match validate_client(&draft) {
                Validation::Valid(new) => new,
                Validation::Invalid(errors) => {
                    print_field_errors(&errors);
                    bail!("Client is invalid");
                }
            };
            let client = api.create_client(new).await?;
            print_client(&client);
        }
        ClientsCommand::Update { id, fields } => {
            let Some(existing) = api.store().get_client(&id) else {
                bail!("Client not found: {id}");
            };
            let draft = fields.into_draft(draft_from_client(existing));
            let new = match validate_client(&draft) {
                Validation::Valid(new) => new,
                Validation::Invalid(errors) => {
                    print_field_errors(&errors);
                    bail!("Client is invalid");
                }
            };
            let client = api.update_client(&id, ClientPatch::from(new)).await?;
            print_client(&client);
        }
        ClientsCommand::Delete { id } => {
            let owned = api.projects_for_client(&id).await.len();
            api.delete_client(&id).await?;
            info!("Deleted client {id}");
            println!("Deleted {id}, {owned} projects are now unassigned");
        }
        ClientsCommand::Assign { id, project_ids } => {
            api.assign_projects(&id, &project_ids).await?;
            for project in api.projects_for_client(&id).await {
                println!("{}", project_line(&project, api.store().database()));
            }
        }
    }
    Ok(())
}
