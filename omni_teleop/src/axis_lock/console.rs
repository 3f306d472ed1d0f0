//! Operator console: single-key axis-lock toggles.
//!
//! | Key         | Axis (WORLD) | Key         | Axis (TCP) |
//! |-------------|--------------|-------------|------------|
//! | `x` `y` `z` | X Y Z        | `X` `Y` `Z` | X Y Z      |
//! | `q` `w` `e` | Rx Ry Rz     | `Q` `W` `E` | Rx Ry Rz   |
//!
//! `m` prints the key map. A toggle flips one axis and switches the whole
//! command to the key's frame.

use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;
use std::thread::JoinHandle;

use omni_common::teleop::axis_lock::{AxisLockCommand, CartesianAxis, CoordinateFrame};
use omni_common::teleop::error::TeleopError;
use tracing::{info, warn};

use super::AxisLockController;
use crate::sched::RunState;

/// Key map printed for `m`.
pub const HELP: &str = "\
Axis lock keys (lower case = WORLD frame, upper case = TCP frame):
  x / X  toggle translation X      q / Q  toggle rotation X
  y / Y  toggle translation Y      w / W  toggle rotation Y
  z / Z  toggle translation Z      e / E  toggle rotation Z
  m      show this help";

/// One decoded operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Toggle {
        frame: CoordinateFrame,
        axis: CartesianAxis,
    },
}

impl ConsoleCommand {
    /// Replacement command for `current`, or `None` for non-lock commands.
    pub fn apply(self, current: AxisLockCommand) -> Option<AxisLockCommand> {
        match self {
            Self::Help => None,
            Self::Toggle { frame, axis } => Some(current.toggled(frame, axis)),
        }
    }
}

impl FromStr for ConsoleCommand {
    type Err = TeleopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (Some(key), None) = (chars.next(), chars.next()) else {
            return Err(TeleopError::invalid(format!(
                "expected a single key, got '{}'",
                s.trim()
            )));
        };
        if key == 'm' {
            return Ok(Self::Help);
        }

        let frame = if key.is_ascii_uppercase() {
            CoordinateFrame::Tcp
        } else {
            CoordinateFrame::World
        };
        let axis = match key.to_ascii_lowercase() {
            'x' => CartesianAxis::X,
            'y' => CartesianAxis::Y,
            'z' => CartesianAxis::Z,
            'q' => CartesianAxis::Rx,
            'w' => CartesianAxis::Ry,
            'e' => CartesianAxis::Rz,
            _ => return Err(TeleopError::invalid(format!("unknown key '{key}'"))),
        };
        Ok(Self::Toggle { frame, axis })
    }
}

/// Read operator keys line by line on a dedicated thread.
///
/// Every accepted toggle replaces the controller's command. The thread ends
/// when input is exhausted or unreadable, or at the first line read after a
/// stop was requested.
pub fn spawn_console<R>(
    reader: R,
    controller: Arc<AxisLockController>,
    run_state: Arc<RunState>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("omni-console".into())
        .spawn(move || {
            info!("{HELP}");
            for line in reader.lines() {
                if run_state.is_stop_requested() {
                    break;
                }
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Console input failed: {e}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(ConsoleCommand::Help) => info!("{HELP}"),
                    Ok(cmd) => {
                        let next = controller.update(|c| cmd.apply(c).unwrap_or(c));
                        info!("Axis lock: {next}");
                    }
                    Err(e) => warn!("{e} (press 'm' for help)"),
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_keys() {
        assert_eq!("m".parse::<ConsoleCommand>().unwrap(), ConsoleCommand::Help);
        assert_eq!(
            "x".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Toggle {
                frame: CoordinateFrame::World,
                axis: CartesianAxis::X
            }
        );
        assert_eq!(
            " E \n".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Toggle {
                frame: CoordinateFrame::Tcp,
                axis: CartesianAxis::Rz
            }
        );
    }

    #[test]
    fn rejects_unknown_input() {
        for bad in ["", "a", "M", "xy", "1"] {
            assert!(
                matches!(bad.parse::<ConsoleCommand>(), Err(TeleopError::InvalidArgument(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn toggle_switches_frame_and_keeps_other_axes() {
        let current = AxisLockCommand::unlocked(CoordinateFrame::World)
            .with_lock(CartesianAxis::Z, true);
        let next = "Q".parse::<ConsoleCommand>().unwrap().apply(current).unwrap();
        assert_eq!(next.frame, CoordinateFrame::Tcp);
        assert!(next.is_locked(CartesianAxis::Rx));
        assert!(next.is_locked(CartesianAxis::Z));
        assert_eq!(ConsoleCommand::Help.apply(current), None);
    }

    #[test]
    fn console_thread_applies_lines() {
        let controller = Arc::new(AxisLockController::new());
        let run_state = Arc::new(RunState::new());
        let input = Cursor::new("x\nbogus\n\nm\nW\n");
        spawn_console(input, Arc::clone(&controller), run_state)
            .unwrap()
            .join()
            .unwrap();

        let cmd = controller.get_command();
        assert_eq!(cmd.frame, CoordinateFrame::Tcp);
        assert!(cmd.is_locked(CartesianAxis::X));
        assert!(cmd.is_locked(CartesianAxis::Ry));
        assert_eq!(cmd.locked_count(), 2);
        assert_eq!(controller.generation(), 2);
    }
}
