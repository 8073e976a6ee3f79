use ansi_term::{Colour, Style};

use crate::{
    query::PagedResult,
    store::{
        database::Database,
        entities::{Client, Project, ProjectStatus},
    },
    timer::state::Lap,
    utils::time::format_elapsed_ms,
    validation::FieldErrors,
};

pub fn status_label(status: ProjectStatus) -> String {
    match status {
        ProjectStatus::Active => Colour::Green.paint(status.to_string()).to_string(),
        ProjectStatus::Archived => Style::new().dimmed().paint(status.to_string()).to_string(),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

pub fn page_footer<T>(page: &PagedResult<T>) -> String {
    format!(
        "Page {}/{} ({} total)",
        page.page,
        page.total_pages(),
        page.total
    )
}

pub fn print_clients(page: &PagedResult<Client>) {
    for client in &page.items {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            client.id,
            Style::new().bold().paint(client.name.as_str()),
            or_dash(client.company.as_deref()),
            or_dash(client.contact.email.as_deref()),
            or_dash(client.contact.phone.as_deref()),
        );
    }
    println!("{}", page_footer(page));
}

pub fn print_client(client: &Client) {
    println!("{}\t{}", client.id, Style::new().bold().paint(client.name.as_str()));
}

pub fn project_line(project: &Project, database: &Database) -> String {
    let client = project
        .client_id
        .as_deref()
        .and_then(|id| database.client_name(id))
        .unwrap_or("Unassigned");
    let rate = project
        .rate_per_hour
        .map(|v| format!("{v:.2}/h"))
        .unwrap_or_else(|| "-".into());
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        project.id,
        project.name,
        client,
        status_label(project.status),
        rate,
        project.tags.join(", "),
    )
}

pub fn print_projects(page: &PagedResult<Project>, database: &Database) {
    for project in &page.items {
        println!("{}", project_line(project, database));
    }
    println!("{}", page_footer(page));
}

pub fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors {
        eprintln!("{}: {message}", Colour::Red.paint(field.as_str()));
    }
}

pub fn lap_line(index: usize, lap: &Lap) -> String {
    let mut line = format!(
        "#{}\t{}\t+{}",
        index + 1,
        format_elapsed_ms(lap.at_ms),
        format_elapsed_ms(lap.delta_ms)
    );
    if let Some(note) = &lap.note {
        line.push('\t');
        line.push_str(note);
    }
    line
}
