//! Shared axis-lock state between operator input and the control loop.
//!
//! The current [`AxisLockCommand`] is stored packed into one atomic byte, so
//! a reader always observes a complete command: the old one or the new one,
//! never a mix. Writers replace the whole byte; nothing ever blocks the
//! control task.

pub mod console;
pub mod sequence;

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use omni_common::teleop::axis_lock::{AxisLockCommand, LockBits, RawAxisLockCommand};
use omni_common::teleop::error::TeleopError;
use tracing::debug;

pub use console::{ConsoleCommand, spawn_console};
pub use sequence::{AxisLockSequence, ScriptedLockTask};

/// Holder of the single current axis-lock command.
#[derive(Debug)]
pub struct AxisLockController {
    packed: AtomicU8,
    /// Bumped after every replacement.
    generation: AtomicU64,
}

impl AxisLockController {
    /// Controller holding the default command (WORLD, all axes floating).
    pub fn new() -> Self {
        Self::with_command(AxisLockCommand::default())
    }

    pub fn with_command(cmd: AxisLockCommand) -> Self {
        Self {
            packed: AtomicU8::new(cmd.pack().bits()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the stored command as a whole.
    pub fn set_command(&self, cmd: AxisLockCommand) {
        self.packed.store(cmd.pack().bits(), Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Axis lock set to {cmd}");
    }

    /// Validate an untyped command and store it.
    ///
    /// # Errors
    /// `InvalidArgument` for a bad frame code or lock lists that do not hold
    /// exactly three entries. The stored command is left unchanged.
    pub fn set_raw(&self, raw: RawAxisLockCommand) -> Result<(), TeleopError> {
        let cmd = AxisLockCommand::try_from(raw)?;
        self.set_command(cmd);
        Ok(())
    }

    /// Most recently stored command.
    #[inline]
    pub fn get_command(&self) -> AxisLockCommand {
        decode(self.packed.load(Ordering::Acquire))
    }

    /// Atomically derive the next command from the current one.
    ///
    /// Used for toggles, where a concurrent writer must not be lost between
    /// the read and the write. Returns the stored result.
    pub fn update<F>(&self, f: F) -> AxisLockCommand
    where
        F: Fn(AxisLockCommand) -> AxisLockCommand,
    {
        let prev = self
            .packed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(f(decode(bits)).pack().bits())
            })
            .unwrap_or_else(|bits| bits);
        self.generation.fetch_add(1, Ordering::AcqRel);
        let next = f(decode(prev));
        debug!("Axis lock updated to {next}");
        next
    }

    /// Generation and command, read in that order.
    ///
    /// The command is at least as recent as the generation, so a reader that
    /// remembers the generation never misses a change.
    #[inline]
    pub fn snapshot(&self) -> (u64, AxisLockCommand) {
        let generation = self.generation.load(Ordering::Acquire);
        (generation, self.get_command())
    }

    /// Number of replacements so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for AxisLockController {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn decode(bits: u8) -> AxisLockCommand {
    AxisLockCommand::unpack(LockBits::from_bits_truncate(bits))
}
