//! Line-oriented command console on the serial port.
//!
//! The device's only command producer.  One command per line:
//!
//! | Line          | Command                         |
//! |---------------|---------------------------------|
//! | `toggle`      | [`AppCommand::TogglePresence`]  |
//! | `save`        | [`AppCommand::SaveConfig`]      |
//! | `{ ... }`     | [`AppCommand::UpdateConfig`]    |
//!
//! JSON bodies use the same keys and lenient per-field rules as
//! [`ConfigUpdate::from_json`].  Blank lines are ignored.  Commands land on
//! [`COMMANDS`](crate::events::COMMANDS) and are applied on the next tick.

use std::io::{BufRead, ErrorKind};

use log::{info, warn};

use crate::app::commands::AppCommand;
use crate::config::ConfigUpdate;
use crate::error::{Error, Result};

/// Reader thread stack; JSON parsing runs on it.
const CONSOLE_STACK_SIZE: usize = 6 * 1024;
/// Back-off when the UART has nothing buffered.
const IDLE_POLL: std::time::Duration = std::time::Duration::from_millis(50);

/// Map one console line to a command.  `Ok(None)` for blank lines.
pub fn parse_line(line: &str) -> Result<Option<AppCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        let parsed = ConfigUpdate::from_json(line)?;
        return Ok(Some(AppCommand::UpdateConfig(parsed.update)));
    }
    match line.to_ascii_lowercase().as_str() {
        "toggle" => Ok(Some(AppCommand::TogglePresence)),
        "save" => Ok(Some(AppCommand::SaveConfig)),
        _ => Err(Error::Parse("unknown console command")),
    }
}

/// Buffers partial input between reads so a line split across UART
/// reads is still parsed whole.
pub struct Console<R> {
    reader: R,
    line: String,
    queued: u32,
    refused: u32,
}

impl<R: BufRead> Console<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            queued: 0,
            refused: 0,
        }
    }

    /// Read every complete line currently available and hand the commands
    /// to `push`.  Returns when the reader is drained or would block.
    pub fn pump(&mut self, push: &mut impl FnMut(AppCommand) -> bool) {
        loop {
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return,
                Ok(_) if !self.line.ends_with('\n') => return,
                Ok(_) => {
                    let line = core::mem::take(&mut self.line);
                    self.dispatch(&line, push);
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    return;
                }
                Err(e) => {
                    warn!("Console: read failed ({}), line discarded", e);
                    self.line.clear();
                    return;
                }
            }
        }
    }

    fn dispatch(&mut self, line: &str, push: &mut impl FnMut(AppCommand) -> bool) {
        match parse_line(line) {
            Ok(None) => {}
            Ok(Some(cmd)) => {
                if push(cmd) {
                    self.queued += 1;
                    info!("Console: queued {:?}", cmd);
                } else {
                    self.refused += 1;
                    warn!("Console: command queue full, {:?} dropped", cmd);
                }
            }
            Err(e) => {
                self.refused += 1;
                warn!("Console: '{}' rejected ({})", line.trim(), e);
            }
        }
    }

    /// Commands accepted onto the queue.
    pub fn queued(&self) -> u32 {
        self.queued
    }

    /// Lines that did not become a queued command.
    pub fn refused(&self) -> u32 {
        self.refused
    }
}

/// Start the console reader on its own thread, feeding
/// [`push_command`](crate::events::push_command).
pub fn spawn() -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(CONSOLE_STACK_SIZE)
        .spawn(|| {
            info!("Console: ready (toggle | save | {{json}})");
            let mut console = Console::new(std::io::stdin().lock());
            loop {
                console.pump(&mut crate::events::push_command);
                std::thread::sleep(IDLE_POLL);
            }
        })
}
