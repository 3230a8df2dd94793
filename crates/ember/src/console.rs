//! Line-based input console read from stdin.
//!
//! Stands in for a window's input events: each line is one command that
//! feeds the mod manager.

use ember_host::ModHandle;
use ember_mod_api::{EventData, KeyCode, Position};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::debug;

pub const HELP: &str = "\
commands:
  scroll <delta>        scroll by <delta> lines
  key <code>            send key <code> once
  press <code>          hold key <code> down and send it
  release <code>        let go of key <code>
  mouse <x> <y>         move the mouse
  emit <name> [text]    emit a named event, with optional text payload
  zoom                  print the current zoom
  camera                print the camera position and zoom
  clear                 clear the host log
  mods                  list loaded mods
  stats                 print host statistics
  reload [handle]       reload one library mod, or all of them
  unload <handle>       unload a mod
  help                  show this message
  quit                  shut down";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Scroll(f32),
    Key(KeyCode),
    Press(KeyCode),
    Release(KeyCode),
    Mouse(Position),
    Emit { name: String, data: EventData },
    Zoom,
    Camera,
    ClearLog,
    Mods,
    Stats,
    Reload(Option<ModHandle>),
    Unload(ModHandle),
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let Some((word, rest)) = split_word(line) else {
            return Ok(None);
        };

        let command = match word {
            "scroll" => {
                let delta = rest
                    .parse::<f32>()
                    .map_err(|_| format!("scroll expects a number, got {:?}", rest))?;
                ConsoleCommand::Scroll(delta)
            }
            "key" => ConsoleCommand::Key(parse_key(word, rest)?),
            "press" => ConsoleCommand::Press(parse_key(word, rest)?),
            "release" => ConsoleCommand::Release(parse_key(word, rest)?),
            "mouse" => {
                let coords: Vec<f32> = rest
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<Result<_, _>>()
                    .map_err(|_| format!("mouse expects two numbers, got {:?}", rest))?;
                match coords[..] {
                    [x, y] => ConsoleCommand::Mouse(Position::new(x, y)),
                    _ => return Err(format!("mouse expects two numbers, got {:?}", rest)),
                }
            }
            "emit" => {
                let (name, text) =
                    split_word(rest).ok_or_else(|| "emit expects an event name".to_string())?;
                let data = if text.is_empty() {
                    EventData::None
                } else {
                    EventData::from(text)
                };
                ConsoleCommand::Emit {
                    name: name.to_string(),
                    data,
                }
            }
            "zoom" => ConsoleCommand::Zoom,
            "camera" => ConsoleCommand::Camera,
            "clear" => ConsoleCommand::ClearLog,
            "mods" => ConsoleCommand::Mods,
            "stats" => ConsoleCommand::Stats,
            "reload" if rest.is_empty() => ConsoleCommand::Reload(None),
            "reload" => ConsoleCommand::Reload(Some(parse_handle(rest)?)),
            "unload" => ConsoleCommand::Unload(parse_handle(rest)?),
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command {:?}, try `help`", other)),
        };
        Ok(Some(command))
    }
}

/// Reads stdin on its own thread and forwards each line. The channel closes
/// at end of input. The thread is detached so a pending read never blocks
/// runtime shutdown.
pub fn spawn_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
        debug!("Console reader finished");
    });
    rx
}

/// Splits off the first whitespace-separated word.
fn split_word(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((text, "")),
    }
}

fn parse_key(command: &str, text: &str) -> Result<KeyCode, String> {
    text.parse::<u32>()
        .map(KeyCode)
        .map_err(|_| format!("{} expects a key code, got {:?}", command, text))
}

fn parse_handle(text: &str) -> Result<ModHandle, String> {
    let raw = text.strip_prefix("mod#").unwrap_or(text);
    raw.parse::<u64>()
        .map(ModHandle::from_raw)
        .map_err(|_| format!("expected a mod handle, got {:?}", text))
}
