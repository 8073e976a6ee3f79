use tracing::trace;

use super::{state::Phase, TimerEngine};

/// Where keyboard input currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Timer,
    TextEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Start,
    Pause,
    Lap,
    Reset,
}

/// Resolves a key press into the transition it triggers. Nothing is triggered while text is
/// being typed.
pub fn command_for_key(key: Key, focus: Focus, phase: Phase) -> Option<KeyCommand> {
    if focus == Focus::TextEntry {
        return None;
    }
    match key {
        Key::Space if phase == Phase::Running => Some(KeyCommand::Pause),
        Key::Space => Some(KeyCommand::Start),
        Key::Char(c) if c.eq_ignore_ascii_case(&'l') && phase == Phase::Running => {
            Some(KeyCommand::Lap)
        }
        Key::Char(c) if c.eq_ignore_ascii_case(&'r') => Some(KeyCommand::Reset),
        Key::Char(_) => None,
    }
}

/// Single entry point for keyboard shortcuts.
pub fn dispatch_key(engine: &TimerEngine, key: Key, focus: Focus) -> Option<KeyCommand> {
    let command = command_for_key(key, focus, engine.phase())?;
    trace!("Dispatching {command:?} for {key:?}");
    match command {
        KeyCommand::Start => engine.start(),
        KeyCommand::Pause => engine.pause(),
        KeyCommand::Lap => {
            engine.add_lap();
        }
        KeyCommand::Reset => engine.reset(),
    }
    Some(command)
}
