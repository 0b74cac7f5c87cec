//! Bounded in-process queues between producer contexts and the tick loop.
//!
//! ```text
//! ┌──────────────────┐     ┌───────────────┐
//! │ BLE GAP callback │────▶│ PROBE_MATCHES │──┐
//! └──────────────────┘     └───────────────┘  │   ┌──────────────┐
//!                                             ├──▶│  Main Loop   │
//! ┌──────────────────┐     ┌───────────────┐  │   │  (consumer)  │
//! │ UART console     │────▶│   COMMANDS    │──┘   └──────────────┘
//! └──────────────────┘     └───────────────┘
//! ```
//!
//! Producers never block: a full queue drops the item and the push reports
//! `false`.  Dropped scan matches are counted rather than logged, since the
//! callback can fire for every advertisement in range.  The main loop drains
//! both queues once per tick, in FIFO order.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::commands::AppCommand;
use crate::presence::matcher::ProbeMatch;

/// Maximum number of probe matches buffered between two ticks.
pub const PROBE_QUEUE_CAP: usize = 16;
/// Maximum number of pending commands.
pub const COMMAND_QUEUE_CAP: usize = 8;

pub type ProbeChannel = Channel<CriticalSectionRawMutex, ProbeMatch, PROBE_QUEUE_CAP>;
pub type CommandChannel = Channel<CriticalSectionRawMutex, AppCommand, COMMAND_QUEUE_CAP>;

/// Matches raised by the scan transport.
pub static PROBE_MATCHES: ProbeChannel = Channel::new();
/// Commands from the configuration surface.
pub static COMMANDS: CommandChannel = Channel::new();

/// Matches dropped on a full queue since the last [`take_dropped_matches`].
static DROPPED_MATCHES: DropCounter = DropCounter::new();

/// Running count of items a producer had to drop.
pub struct DropCounter(AtomicU32);

impl DropCounter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Read and reset.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

impl Default for DropCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// `try_send` that bumps `dropped` instead of failing loudly.
pub fn send_or_count(channel: &ProbeChannel, item: ProbeMatch, dropped: &DropCounter) -> bool {
    let sent = channel.try_send(item).is_ok();
    if !sent {
        dropped.record();
    }
    sent
}

/// Queue a probe match.  Safe from the radio stack's callback context.
/// Returns `false` if the queue is full; the drop is counted, not logged.
pub fn push_probe(probe: ProbeMatch) -> bool {
    send_or_count(&PROBE_MATCHES, probe, &DROPPED_MATCHES)
}

/// Number of matches dropped since the previous call.
pub fn take_dropped_matches() -> u32 {
    DROPPED_MATCHES.take()
}

/// Queue a command.  Returns `false` if the queue is full.
pub fn push_command(cmd: AppCommand) -> bool {
    COMMANDS.try_send(cmd).is_ok()
}

/// Move every pending match into `out`, up to its capacity.  Matches that do
/// not fit stay queued for the next tick.
pub fn drain_probes<const N: usize>(
    channel: &ProbeChannel,
    out: &mut heapless::Vec<ProbeMatch, N>,
) {
    while !out.is_full() {
        match channel.try_receive() {
            Ok(probe) => {
                let _ = out.push(probe);
            }
            Err(_) => break,
        }
    }
}

/// Drain all pending commands into a callback, in FIFO order.
pub fn drain_commands(channel: &CommandChannel, mut handler: impl FnMut(AppCommand)) {
    while let Ok(cmd) = channel.try_receive() {
        handler(cmd);
    }
}
