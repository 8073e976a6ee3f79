use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    thread,
};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    store::database::Database,
    timer::{
        keys::{dispatch_key, Focus, Key, KeyCommand},
        scheduler::TokioTickScheduler,
        session::EntryDetails,
        state::Lap,
        TimerEngine,
    },
    utils::{
        clock::{Clock, DefaultClock},
        ids::UuidGenerator,
        time::{format_elapsed, format_elapsed_ms},
    },
};

use super::output::lap_line;

const HELP: &str = "space: start/pause  l: lap  r: reset  q: quit  \
:name TEXT  :tag TAGS  :untag TAG  :project [ID]  :note [TEXT]";

#[derive(Debug, clap::Args)]
pub struct TimerCommand {
    #[arg(long, help = "Name of the entry being tracked")]
    name: Option<String>,
    #[arg(long, help = "Id of the project the entry belongs to")]
    project: Option<String>,
    #[arg(long, help = "Comma or space separated tags")]
    tags: Option<String>,
    #[arg(long, help = "Print the session summary as json when quitting")]
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextCommand {
    Name(String),
    Tag(String),
    Untag(String),
    Project(Option<String>),
    /// Annotates the latest lap. An empty note removes it.
    Note(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TimerInput {
    Key(Key),
    Text(TextCommand),
    Quit,
    Unknown,
}

fn focus_of(line: &str) -> Focus {
    if line.starts_with(':') {
        Focus::TextEntry
    } else {
        Focus::Timer
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_input(line: &str) -> TimerInput {
    let line = line.trim_end_matches(['\r', '\n']);
    if focus_of(line) == Focus::TextEntry {
        let text = &line[1..];
        let (command, rest) = text.split_once(' ').unwrap_or((text, ""));
        return match command {
            "name" => TimerInput::Text(TextCommand::Name(rest.trim().to_string())),
            "tag" => TimerInput::Text(TextCommand::Tag(rest.to_string())),
            "untag" => TimerInput::Text(TextCommand::Untag(rest.trim().to_lowercase())),
            "project" => TimerInput::Text(TextCommand::Project(non_empty(rest))),
            "note" => TimerInput::Text(TextCommand::Note(non_empty(rest))),
            _ => TimerInput::Unknown,
        };
    }
    if line == " " || line.trim() == "space" {
        return TimerInput::Key(Key::Space);
    }
    let mut chars = line.trim().chars();
    match (chars.next(), chars.next()) {
        (Some('q' | 'Q'), None) => TimerInput::Quit,
        (Some(c), None) => TimerInput::Key(Key::Char(c)),
        _ => TimerInput::Unknown,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary<'a> {
    name: &'a str,
    project_id: Option<&'a str>,
    tags: &'a [String],
    elapsed_ms: u64,
    laps: Vec<Lap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Continue,
    Quit,
}

/// Interactive state of one `timer` invocation.
struct TimerSession {
    engine: TimerEngine,
    details: EntryDetails,
}

impl TimerSession {
    fn new(engine: TimerEngine) -> Self {
        Self {
            engine,
            details: EntryDetails::new(),
        }
    }

    fn set_project(&mut self, project_id: Option<String>, database: &Database) -> String {
        match project_id {
            None => {
                self.details.set_project(None);
                "Project cleared".into()
            }
            Some(id) => match database.projects.get(&id) {
                Some(project) => {
                    self.details.set_project(Some(id));
                    format!("Project: {}", project.name)
                }
                None => {
                    warn!("Ignoring unknown project {id}");
                    format!("Unknown project {id}")
                }
            },
        }
    }

    fn set_name(&mut self, name: String) -> String {
        match self.details.set_name(name) {
            Some(error) => error.to_string(),
            None => format!("Name: {}", self.details.name()),
        }
    }

    fn add_tags(&mut self, tags: String) -> String {
        self.details.set_tag_input(tags);
        self.details.commit_tags();
        format!("Tags: {}", self.details.tags().join(", "))
    }

    /// Applies one line of input. Returns what should be printed, if anything.
    fn handle_line(&mut self, line: &str, database: &Database) -> (Outcome, Option<String>) {
        let message = match parse_input(line) {
            TimerInput::Quit => return (Outcome::Quit, None),
            TimerInput::Unknown => Some(HELP.to_string()),
            TimerInput::Key(key) => match dispatch_key(&self.engine, key, focus_of(line)) {
                Some(KeyCommand::Lap) => {
                    let laps = self.engine.laps();
                    laps.last().map(|lap| lap_line(laps.len() - 1, lap))
                }
                Some(KeyCommand::Pause) => {
                    Some(format!("Paused at {}", format_elapsed_ms(self.engine.elapsed_ms())))
                }
                Some(KeyCommand::Start) => Some("Running".into()),
                Some(KeyCommand::Reset) => Some("Reset".into()),
                None => None,
            },
            TimerInput::Text(command) => Some(match command {
                TextCommand::Name(name) => self.set_name(name),
                TextCommand::Tag(tags) => self.add_tags(tags),
                TextCommand::Untag(tag) => {
                    self.details.remove_tag(&tag);
                    format!("Tags: {}", self.details.tags().join(", "))
                }
                TextCommand::Project(id) => self.set_project(id, database),
                TextCommand::Note(note) => {
                    let laps = self.engine.laps();
                    match laps.last() {
                        Some(lap) => {
                            self.engine.annotate_lap(&lap.id, note);
                            format!("Annotated lap {}", laps.len())
                        }
                        None => "No lap to annotate".into(),
                    }
                }
            }),
        };
        (Outcome::Continue, message)
    }

    fn summary(&self) -> SessionSummary<'_> {
        SessionSummary {
            name: self.details.name(),
            project_id: self.details.project_id(),
            tags: self.details.tags(),
            elapsed_ms: self.engine.elapsed_ms(),
            laps: self.engine.laps(),
        }
    }
}

fn print_line(message: &str) {
    // The running display doesn't end with a newline, start a fresh one.
    println!("\r{message}");
}

/// Lines typed on stdin. Reading happens on a plain thread, a read pending on the terminal
/// can't be cancelled and must not hold the runtime open once the session ends.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel(16);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if sender.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin {e}");
                    break;
                }
            }
        }
    });
    receiver
}

/// Feeds input lines into the session until `q`, the end of input or cancellation.
async fn run_session(
    session: &mut TimerSession,
    lines: &mut mpsc::Receiver<String>,
    token: &CancellationToken,
    database: &Database,
) {
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            break;
        };
        let (outcome, message) = session.handle_line(&line, database);
        if let Some(message) = message {
            print_line(&message);
        }
        if outcome == Outcome::Quit {
            break;
        }
    }
}

pub async fn process_timer_command(command: TimerCommand, config: &AppConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let api = config.open_api(clock.clone())?;
    let engine = TimerEngine::new(
        clock.clone(),
        Box::new(TokioTickScheduler::new(clock, config.frame_interval)),
        Arc::new(UuidGenerator),
    );

    let mut last_shown = String::new();
    engine.set_frame_observer(move |elapsed| {
        let shown = format_elapsed(elapsed);
        if shown != last_shown {
            print!("\r{shown}");
            let _ = io::stdout().flush();
            last_shown = shown;
        }
    });

    let mut session = TimerSession::new(engine.clone());
    if let Some(name) = command.name {
        print_line(&session.set_name(name));
    }
    if let Some(tags) = command.tags {
        print_line(&session.add_tags(tags));
    }
    if let Some(project) = command.project {
        print_line(&session.set_project(Some(project), api.store().database()));
    }
    print_line(HELP);

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted");
            interrupt.cancel();
        }
    });

    let mut lines = spawn_stdin_reader();
    run_session(&mut session, &mut lines, &token, api.store().database()).await;

    engine.stop();
    engine.teardown();
    let summary = session.summary();
    info!(
        "Timer session ended at {}ms with {} laps",
        summary.elapsed_ms,
        summary.laps.len()
    );
    if command.json {
        println!("\r{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_line(&format!("Total {}", format_elapsed_ms(summary.elapsed_ms)));
        for (index, lap) in summary.laps.iter().enumerate() {
            println!("{}", lap_line(index, lap));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::{parse_input, run_session, Outcome, TextCommand, TimerInput, TimerSession};
    use crate::{
        store::{database::Database, seed::Seed},
        timer::{keys::Key, scheduler::ManualTickScheduler, state::Phase, TimerEngine},
        utils::{clock::ManualClock, ids::SequentialIdGenerator},
    };

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input(" "), TimerInput::Key(Key::Space));
        assert_eq!(parse_input("space\r\n"), TimerInput::Key(Key::Space));
        assert_eq!(parse_input("l"), TimerInput::Key(Key::Char('l')));
        assert_eq!(parse_input("q"), TimerInput::Quit);
        assert_eq!(parse_input("lap"), TimerInput::Unknown);
        assert_eq!(
            parse_input(":name Writing docs"),
            TimerInput::Text(TextCommand::Name("Writing docs".into()))
        );
        assert_eq!(
            parse_input(":project"),
            TimerInput::Text(TextCommand::Project(None))
        );
        assert_eq!(parse_input(":r"), TimerInput::Unknown);
    }

    #[test]
    fn test_session_drives_engine() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (scheduler, _frames) = ManualTickScheduler::new();
        let ids = Arc::new(SequentialIdGenerator::new("id"));
        let engine = TimerEngine::new(clock.clone(), Box::new(scheduler), ids.clone());
        let mut session = TimerSession::new(engine.clone());
        let database = Seed::Demo.build(clock.as_ref(), ids.as_ref());

        session.handle_line(" ", &database);
        assert_eq!(engine.phase(), Phase::Running);
        clock.advance_ms(1000);
        session.handle_line("l", &database);
        session.handle_line(":note first", &database);
        assert_eq!(engine.laps()[0].note.as_deref(), Some("first"));

        // Text entry never triggers shortcuts.
        session.handle_line(":tag r, Work", &database);
        assert_eq!(engine.phase(), Phase::Running);
        assert_eq!(session.details.tags(), ["r", "work"]);

        let project_id = database.projects.keys().next().unwrap().clone();
        session.handle_line(&format!(":project {project_id}"), &database);
        assert_eq!(session.details.project_id(), Some(project_id.as_str()));
        session.handle_line(":project missing", &database);
        assert_eq!(session.details.project_id(), Some(project_id.as_str()));

        clock.advance_ms(500);
        session.handle_line("space", &database);
        assert_eq!(engine.phase(), Phase::Paused);
        assert_eq!(session.summary().elapsed_ms, 1500);

        let (outcome, _) = session.handle_line("q", &Database::default());
        assert_eq!(outcome, Outcome::Quit);
    }

    fn test_session() -> (TimerSession, TimerEngine) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let (scheduler, _frames) = ManualTickScheduler::new();
        let engine = TimerEngine::new(
            clock,
            Box::new(scheduler),
            Arc::new(SequentialIdGenerator::new("lap")),
        );
        (TimerSession::new(engine.clone()), engine)
    }

    #[tokio::test]
    async fn test_cancel_ends_session_with_input_open() -> Result<()> {
        let (mut session, _engine) = test_session();
        let (_sender, mut lines) = mpsc::channel::<String>(16);
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        tokio::time::timeout(
            Duration::from_secs(2),
            run_session(&mut session, &mut lines, &token, &Database::default()),
        )
        .await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_quit_ends_session_with_input_open() -> Result<()> {
        let (mut session, engine) = test_session();
        let (sender, mut lines) = mpsc::channel(16);
        for line in [" ", "l", "q", "r"] {
            sender.send(line.to_string()).await?;
        }

        tokio::time::timeout(
            Duration::from_secs(2),
            run_session(
                &mut session,
                &mut lines,
                &CancellationToken::new(),
                &Database::default(),
            ),
        )
        .await?;
        assert_eq!(engine.phase(), Phase::Running);
        assert_eq!(engine.laps().len(), 1);
        // Nothing after `q` is consumed.
        assert_eq!(lines.recv().await.as_deref(), Some("r"));
        Ok(())
    }
}
