//! Pilot input.
//!
//! One `InputFrame` per tank per tick. Stick axes are `i8` and map onto
//! fixed-point through a precomputed table, so the same byte always yields
//! the same `Fixed`. Drones read their owner's frame to decide between AI
//! and pilot control.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::fixed::{Fixed, FIXED_ONE};
use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityHandle;

/// Axis value for a released stick.
pub const AXIS_RELEASED: i8 = i8::MIN;

const fn axis_entry(byte: usize) -> Fixed {
    let signed = byte as u8 as i8;
    if signed == AXIS_RELEASED {
        0
    } else {
        // Truncating division is odd-symmetric; ±127 lands on exactly ±1.0
        (signed as i32 * FIXED_ONE) / i8::MAX as i32
    }
}

/// `i8` axis → `Fixed` in [-1, 1], indexed by the axis byte.
///
/// Entry 128 (`-128`, released) is 0.
pub static MOVE_LUT: [Fixed; 256] = {
    let mut table = [0; 256];
    let mut byte = 0;
    while byte < 256 {
        table[byte] = axis_entry(byte);
        byte += 1;
    }
    table
};

/// Axis byte to fixed-point.
#[inline]
pub fn axis_to_fixed(axis: i8) -> Fixed {
    MOVE_LUT[axis as u8 as usize]
}

/// What a pilot holds down during one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Horizontal stick, [`AXIS_RELEASED`] when let go
    pub move_x: i8,
    /// Vertical stick, [`AXIS_RELEASED`] when let go
    pub move_y: i8,
    /// World point under the cursor
    pub aim: FixedVec2,
    /// [`InputFrame::FLAG_SHOOT`] | [`InputFrame::FLAG_REPEL`]
    pub flags: u8,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Shoot held.
    pub const FLAG_SHOOT: u8 = 1 << 0;
    /// Repel held.
    pub const FLAG_REPEL: u8 = 1 << 1;

    /// Sticks released, nothing held, aiming at the origin.
    pub const fn new() -> Self {
        Self::with_movement(AXIS_RELEASED, AXIS_RELEASED)
    }

    /// Frame with both stick axes set.
    pub const fn with_movement(move_x: i8, move_y: i8) -> Self {
        Self { move_x, move_y, aim: FixedVec2::ZERO, flags: 0 }
    }

    /// Same frame aiming at `aim`.
    pub const fn aiming_at(mut self, aim: FixedVec2) -> Self {
        self.aim = aim;
        self
    }

    /// Same frame with shoot held.
    pub const fn shooting(mut self) -> Self {
        self.flags |= Self::FLAG_SHOOT;
        self
    }

    /// Same frame with repel held.
    pub const fn repelling(mut self) -> Self {
        self.flags |= Self::FLAG_REPEL;
        self
    }

    /// Stick direction, not normalized. A released axis reads as 0.
    #[inline]
    pub fn move_direction(&self) -> FixedVec2 {
        FixedVec2::new(axis_to_fixed(self.move_x), axis_to_fixed(self.move_y))
    }

    /// Either stick axis is deflected.
    #[inline]
    pub fn has_movement(&self) -> bool {
        self.move_x != AXIS_RELEASED || self.move_y != AXIS_RELEASED
    }

    /// Shoot held.
    #[inline]
    pub fn shoot_pressed(&self) -> bool {
        self.flags & Self::FLAG_SHOOT != 0
    }

    /// Repel held.
    #[inline]
    pub fn repel_pressed(&self) -> bool {
        self.flags & Self::FLAG_REPEL != 0
    }

    /// Shoot or repel held; drones yield to the pilot.
    #[inline]
    pub fn wants_control(&self) -> bool {
        self.flags & (Self::FLAG_SHOOT | Self::FLAG_REPEL) != 0
    }

    /// Hold or release shoot.
    #[inline]
    pub fn set_shoot(&mut self, pressed: bool) {
        self.set_flag(Self::FLAG_SHOOT, pressed);
    }

    /// Hold or release repel.
    #[inline]
    pub fn set_repel(&mut self, pressed: bool) {
        self.set_flag(Self::FLAG_REPEL, pressed);
    }

    fn set_flag(&mut self, bit: u8, on: bool) {
        if on {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// A tank's inputs over a run, stored as change points.
///
/// A frame is kept only when it differs from the one before; lookups
/// return the latest change at or before the requested tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TankInputBuffer {
    /// Tank the inputs belong to
    pub tank: EntityHandle,
    /// Last tick passed to [`record`](Self::record)
    pub last_tick: u32,
    changes: Vec<(u32, InputFrame)>,
}

impl TankInputBuffer {
    /// Empty recording for `tank`.
    pub fn new(tank: EntityHandle) -> Self {
        Self { tank, last_tick: 0, changes: Vec::new() }
    }

    /// Record the frame used at `tick`. Ticks must be non-decreasing.
    pub fn record(&mut self, tick: u32, frame: InputFrame) {
        self.last_tick = tick;
        let current = self.changes.last().map_or(InputFrame::new(), |&(_, f)| f);
        if frame != current {
            self.changes.push((tick, frame));
        }
    }

    /// Frame in force at `tick`; released sticks before the first change.
    pub fn frame_at(&self, tick: u32) -> InputFrame {
        match self.changes.partition_point(|&(at, _)| at <= tick) {
            0 => InputFrame::new(),
            n => self.changes[n - 1].1,
        }
    }

    /// Stored change points.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// Per-tick input maps for ticks `1..=ticks`, as `replay` expects them.
pub fn expand_recordings(
    buffers: &[TankInputBuffer],
    ticks: u32,
) -> Vec<BTreeMap<EntityHandle, InputFrame>> {
    (1..=ticks)
        .map(|tick| {
            buffers
                .iter()
                .map(|buffer| (buffer.tank, buffer.frame_at(tick)))
                .collect()
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_table() {
        assert_eq!(axis_to_fixed(0), 0);
        assert_eq!(axis_to_fixed(i8::MAX), FIXED_ONE);
        assert_eq!(axis_to_fixed(-i8::MAX), -FIXED_ONE);
        assert_eq!(axis_to_fixed(AXIS_RELEASED), 0);
        // Odd around zero
        for axis in 1..=i8::MAX {
            assert_eq!(axis_to_fixed(axis), -axis_to_fixed(-axis), "axis {axis}");
        }
    }

    #[test]
    fn test_released_frame_has_no_movement() {
        let frame = InputFrame::new();
        assert!(!frame.has_movement());
        assert_eq!(frame.move_direction(), FixedVec2::ZERO);

        let strafe = InputFrame::with_movement(i8::MAX, AXIS_RELEASED);
        assert!(strafe.has_movement());
        assert_eq!(strafe.move_direction(), FixedVec2::new(FIXED_ONE, 0));
    }

    #[test]
    fn test_control_flags() {
        let mut frame = InputFrame::new().aiming_at(FixedVec2::from_ints(3, 4));
        assert!(!frame.wants_control());

        frame.set_shoot(true);
        assert!(frame.shoot_pressed() && frame.wants_control());

        frame.set_shoot(false);
        frame.set_repel(true);
        assert!(!frame.shoot_pressed());
        assert!(frame.repel_pressed() && frame.wants_control());
        assert_eq!(frame.aim, FixedVec2::from_ints(3, 4));

        assert_eq!(InputFrame::new().shooting().repelling().flags, 0b11);
    }

    #[test]
    fn test_recording_keeps_changes_only() {
        let mut buffer = TankInputBuffer::new(EntityHandle::default());
        let held = InputFrame::with_movement(40, -40).shooting();
        for tick in 1..=30 {
            buffer.record(tick, held);
        }
        // Idle at the start is not a change
        buffer.record(31, InputFrame::new());
        assert_eq!(buffer.change_count(), 2);
        assert_eq!(buffer.last_tick, 31);

        assert_eq!(buffer.frame_at(0), InputFrame::new());
        assert_eq!(buffer.frame_at(1), held);
        assert_eq!(buffer.frame_at(30), held);
        assert_eq!(buffer.frame_at(500), InputFrame::new());
    }

    #[test]
    fn test_expand_recordings() {
        let mut buffer = TankInputBuffer::new(EntityHandle::default());
        buffer.record(1, InputFrame::with_movement(10, 0));
        buffer.record(2, InputFrame::with_movement(10, 0));
        buffer.record(3, InputFrame::with_movement(20, 0));

        let frames = expand_recordings(&[buffer], 4);
        let x: Vec<i8> = frames
            .iter()
            .map(|m| m[&EntityHandle::default()].move_x)
            .collect();
        assert_eq!(x, vec![10, 10, 20, 20]);
    }
}
