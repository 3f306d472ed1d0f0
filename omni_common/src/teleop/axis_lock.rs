//! Axis-lock command model.
//!
//! An [`AxisLockCommand`] freezes any subset of the six Cartesian degrees of
//! freedom of the local robot's end-effector, interpreted in exactly one
//! [`CoordinateFrame`]. Commands are plain `Copy` values: a new command
//! replaces the previous one as a whole, there is no per-axis merge.
//!
//! ## Packed Representation
//!
//! A command packs into a single byte ([`LockBits`]): six lock bits plus one
//! frame bit. Publishing the packed byte through an atomic is what lets the
//! control loop read commands without tearing.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

use super::error::TeleopError;
use crate::consts::AXIS_COUNT;

// ─── Coordinate Frame ───────────────────────────────────────────────

/// Reference frame the lock list is expressed in.
///
/// Wire codes: `1` = TCP, `2` = WORLD. Code `0` ("unknown") and anything
/// above 2 are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum CoordinateFrame {
    /// Frame attached to the local robot's tool center point.
    Tcp = 1,
    /// Fixed base frame of the local robot.
    #[default]
    #[serde(alias = "BASE")]
    World = 2,
}

impl CoordinateFrame {
    /// Stable wire code.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Result<Self, TeleopError> {
        match code {
            1 => Ok(Self::Tcp),
            2 => Ok(Self::World),
            other => Err(TeleopError::invalid(format!(
                "coordinate frame code {other} out of range [1, 2]"
            ))),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::World => "WORLD",
        }
    }
}

impl fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoordinateFrame {
    type Err = TeleopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" => Ok(Self::Tcp),
            "WORLD" | "BASE" => Ok(Self::World),
            _ => Err(TeleopError::invalid(format!("unknown coordinate frame '{s}'"))),
        }
    }
}

// ─── Cartesian Axis ─────────────────────────────────────────────────

/// One lockable Cartesian degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartesianAxis {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
}

impl CartesianAxis {
    /// All axes in wire order `[X, Y, Z, Rx, Ry, Rz]`.
    pub const ALL: [Self; 6] = [Self::X, Self::Y, Self::Z, Self::Rx, Self::Ry, Self::Rz];

    /// Position inside its group (translation or rotation).
    #[inline]
    pub const fn group_index(self) -> usize {
        match self {
            Self::X | Self::Rx => 0,
            Self::Y | Self::Ry => 1,
            Self::Z | Self::Rz => 2,
        }
    }

    #[inline]
    pub const fn is_rotation(self) -> bool {
        matches!(self, Self::Rx | Self::Ry | Self::Rz)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::Rx => "Rx",
            Self::Ry => "Ry",
            Self::Rz => "Rz",
        }
    }

    const fn lock_bit(self) -> LockBits {
        match self {
            Self::X => LockBits::TRANS_X,
            Self::Y => LockBits::TRANS_Y,
            Self::Z => LockBits::TRANS_Z,
            Self::Rx => LockBits::ROT_X,
            Self::Ry => LockBits::ROT_Y,
            Self::Rz => LockBits::ROT_Z,
        }
    }
}

impl fmt::Display for CartesianAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Packed Bits ────────────────────────────────────────────────────

bitflags! {
    /// Single-byte packing of an [`AxisLockCommand`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LockBits: u8 {
        const TRANS_X   = 0x01;
        const TRANS_Y   = 0x02;
        const TRANS_Z   = 0x04;
        const ROT_X     = 0x08;
        const ROT_Y     = 0x10;
        const ROT_Z     = 0x20;
        /// Set = TCP frame, clear = WORLD frame.
        const FRAME_TCP = 0x40;
    }
}

const_assert_eq!(LockBits::all().bits(), 0x7F);

// ─── Axis Lock Command ──────────────────────────────────────────────

/// Complete axis-lock state: one frame plus six lock flags.
///
/// `true` = axis frozen, `false` = floating. The default is WORLD frame
/// with every axis floating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AxisLockCommand {
    /// Frame the lock lists are interpreted in.
    pub frame: CoordinateFrame,
    /// Translation locks `[X, Y, Z]`.
    pub translation: [bool; AXIS_COUNT],
    /// Rotation locks `[Rx, Ry, Rz]`.
    pub rotation: [bool; AXIS_COUNT],
}

impl AxisLockCommand {
    /// Every axis floating in `frame`.
    pub const fn unlocked(frame: CoordinateFrame) -> Self {
        Self {
            frame,
            translation: [false; AXIS_COUNT],
            rotation: [false; AXIS_COUNT],
        }
    }

    /// Every axis frozen in `frame`.
    pub const fn fully_locked(frame: CoordinateFrame) -> Self {
        Self {
            frame,
            translation: [true; AXIS_COUNT],
            rotation: [true; AXIS_COUNT],
        }
    }

    /// Every axis frozen except `axis`.
    pub fn floating_only(frame: CoordinateFrame, axis: CartesianAxis) -> Self {
        Self::fully_locked(frame).with_lock(axis, false)
    }

    #[inline]
    pub fn is_locked(&self, axis: CartesianAxis) -> bool {
        if axis.is_rotation() {
            self.rotation[axis.group_index()]
        } else {
            self.translation[axis.group_index()]
        }
    }

    /// Copy with one axis set to `locked`; the frame is unchanged.
    #[must_use]
    pub fn with_lock(mut self, axis: CartesianAxis, locked: bool) -> Self {
        if axis.is_rotation() {
            self.rotation[axis.group_index()] = locked;
        } else {
            self.translation[axis.group_index()] = locked;
        }
        self
    }

    /// Copy with `axis` flipped and the frame switched to `frame`.
    ///
    /// The remaining lock flags are carried over as they are, even when the
    /// frame changes.
    #[must_use]
    pub fn toggled(self, frame: CoordinateFrame, axis: CartesianAxis) -> Self {
        let locked = self.is_locked(axis);
        Self { frame, ..self.with_lock(axis, !locked) }
    }

    pub fn locked_count(&self) -> usize {
        self.translation
            .iter()
            .chain(self.rotation.iter())
            .filter(|locked| **locked)
            .count()
    }

    /// Pack into a single byte.
    pub fn pack(&self) -> LockBits {
        let mut bits = LockBits::empty();
        for axis in CartesianAxis::ALL {
            bits.set(axis.lock_bit(), self.is_locked(axis));
        }
        bits.set(LockBits::FRAME_TCP, self.frame == CoordinateFrame::Tcp);
        bits
    }

    /// Inverse of [`pack`](Self::pack). Unknown bits are ignored.
    pub fn unpack(bits: LockBits) -> Self {
        let frame = if bits.contains(LockBits::FRAME_TCP) {
            CoordinateFrame::Tcp
        } else {
            CoordinateFrame::World
        };
        CartesianAxis::ALL
            .into_iter()
            .fold(Self::unlocked(frame), |cmd, axis| {
                cmd.with_lock(axis, bits.contains(axis.lock_bit()))
            })
    }
}

impl fmt::Display for AxisLockCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.frame)?;
        for (i, axis) in CartesianAxis::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(if i == AXIS_COUNT { " | " } else { " " })?;
            }
            let state = if self.is_locked(axis) { "lock" } else { "free" };
            write!(f, "{axis}:{state}")?;
        }
        f.write_str("]")
    }
}

// ─── Raw (untyped) Command ──────────────────────────────────────────

/// Axis-lock command as received from an external producer.
///
/// Converting into [`AxisLockCommand`] checks the frame code and that each
/// lock list holds exactly three entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAxisLockCommand {
    pub frame: u8,
    pub translation: Vec<bool>,
    pub rotation: Vec<bool>,
}

impl TryFrom<RawAxisLockCommand> for AxisLockCommand {
    type Error = TeleopError;

    fn try_from(raw: RawAxisLockCommand) -> Result<Self, Self::Error> {
        let frame = CoordinateFrame::from_code(raw.frame)?;
        let translation = lock_triple("translation", &raw.translation)?;
        let rotation = lock_triple("rotation", &raw.rotation)?;
        Ok(Self { frame, translation, rotation })
    }
}

impl From<AxisLockCommand> for RawAxisLockCommand {
    fn from(cmd: AxisLockCommand) -> Self {
        Self {
            frame: cmd.frame.code(),
            translation: cmd.translation.to_vec(),
            rotation: cmd.rotation.to_vec(),
        }
    }
}

fn lock_triple(group: &str, values: &[bool]) -> Result<[bool; AXIS_COUNT], TeleopError> {
    <[bool; AXIS_COUNT]>::try_from(values).map_err(|_| {
        TeleopError::invalid(format!(
            "{group} lock list must have {AXIS_COUNT} entries, got {}",
            values.len()
        ))
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
