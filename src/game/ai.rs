//! Drone Motion Controller
//!
//! Station-keeping for owner-tethered projectiles. Each tick the controller
//! picks one of four states and returns a heading plus an acceleration
//! divisor:
//!
//! | State           | When                                             |
//! |-----------------|--------------------------------------------------|
//! | PilotControlled | owner holds shoot or repel and the drone obeys   |
//! | Pursuing        | a target was acquired                            |
//! | IdleResting     | close to the owner and last tick set `rest_cycle` |
//! | IdleOrbiting    | otherwise                                        |
//!
//! The rest flag written while orbiting is only read on the following tick.
//! Every distance test is on squared lengths.

use serde::{Serialize, Deserialize};

use crate::config::DroneConfig;
use crate::core::fixed::{
    Fixed, WideFixed, FIXED_HALF, FIXED_HALF_PI, FIXED_ONE, FIXED_PI, FIXED_SCALE,
    fixed_mul, wide_div, wrap_angle,
};
use crate::core::vec2::FixedVec2;
use crate::game::entity::EntityHandle;
use crate::game::input::InputFrame;

/// Motion state of a drone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiMotionState {
    /// Drifting slowly near the owner
    IdleResting,
    /// Circling back toward the owner
    IdleOrbiting,
    /// Following the owner's aim
    PilotControlled,
    /// Chasing an acquired target
    Pursuing,
}

/// Inputs to one controller update.
#[derive(Clone, Copy, Debug)]
pub struct MotionContext {
    /// Drone position
    pub position: FixedVec2,
    /// Drone heading before the update
    pub heading: Fixed,
    /// Owner tank position
    pub owner_position: FixedVec2,
    /// Owner tank size
    pub owner_size: Fixed,
    /// Owner input this tick
    pub owner_input: Option<InputFrame>,
    /// Position of the acquired target
    pub target_position: Option<FixedVec2>,
}

/// Result of one controller update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionOutput {
    /// New heading
    pub heading: Fixed,
    /// Base acceleration is divided by this
    pub accel_divisor: i32,
}

/// Per-drone controller state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiController {
    /// State chosen on the last update
    pub state: AiMotionState,
    /// Rest/orbit oscillator, written for the next tick
    pub rest_cycle: bool,
    /// Owner input may take over
    pub can_control: bool,
    /// Target acquisition radius around the owner
    pub view_range: Fixed,
    /// Currently pursued entity
    pub target: Option<EntityHandle>,
}

impl AiController {
    /// Fresh controller, resting.
    pub fn new(can_control: bool, view_range: Fixed) -> Self {
        Self {
            state: AiMotionState::IdleResting,
            rest_cycle: true,
            can_control,
            view_range,
            target: None,
        }
    }

    /// Whether `input` hands steering to the pilot.
    pub fn pilot_active(&self, input: Option<&InputFrame>) -> bool {
        self.can_control && input.is_some_and(InputFrame::wants_control)
    }

    /// Run one tick of the state machine.
    pub fn update(&mut self, ctx: &MotionContext, config: &DroneConfig) -> MotionOutput {
        if self.pilot_active(ctx.owner_input.as_ref()) {
            return self.steer_pilot(ctx);
        }

        if let Some(target) = ctx.target_position {
            self.state = AiMotionState::Pursuing;
            self.rest_cycle = false;
            return MotionOutput {
                heading: (target - ctx.position).angle(),
                accel_divisor: 1,
            };
        }

        self.steer_idle(ctx, config)
    }

    fn steer_pilot(&mut self, ctx: &MotionContext) -> MotionOutput {
        self.state = AiMotionState::PilotControlled;
        self.rest_cycle = false;

        let input = ctx.owner_input.unwrap_or_default();
        let mut heading = (input.aim - ctx.position).angle();
        if input.repel_pressed() {
            heading = heading.wrapping_add(FIXED_PI);
        }

        MotionOutput {
            heading: wrap_angle(heading),
            accel_divisor: 1,
        }
    }

    fn steer_idle(&mut self, ctx: &MotionContext, config: &DroneConfig) -> MotionOutput {
        let delta = ctx.position - ctx.owner_position;
        let radius = config.max_resting_radius as WideFixed;
        let radius_sq = (radius * radius) >> FIXED_SCALE;
        // Squared distance relative to the resting radius; 1.0 at the edge
        let unit_dist = wide_div(delta.length_squared_wide(), radius_sq);

        if unit_dist <= FIXED_ONE && self.rest_cycle {
            self.state = AiMotionState::IdleResting;
            let drift = config
                .rest_drift_base
                .wrapping_add(fixed_mul(config.rest_drift_scale, unit_dist));
            return MotionOutput {
                heading: wrap_angle(ctx.heading.wrapping_add(drift)),
                accel_divisor: config.rest_accel_divisor.max(1),
            };
        }

        self.state = AiMotionState::IdleOrbiting;

        let offset = delta.angle().wrapping_add(FIXED_HALF_PI);
        let reach = fixed_mul(ctx.owner_size, config.orbit_radius_factor);
        let orbit_point = ctx.owner_position + FixedVec2::from_angle(offset).scale(reach);
        let to_orbit = orbit_point - ctx.position;

        let size = ctx.owner_size as WideFixed;
        let rest_sq = 4 * ((size * size) >> FIXED_SCALE);
        self.rest_cycle = to_orbit.length_squared_wide() <= rest_sq;

        let accel_divisor = if unit_dist < FIXED_HALF {
            config.orbit_close_accel_divisor.max(1)
        } else {
            1
        };

        MotionOutput {
            heading: to_orbit.angle(),
            accel_divisor,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, fixed_abs};

    fn idle_ctx(position: FixedVec2) -> MotionContext {
        MotionContext {
            position,
            heading: 0,
            owner_position: FixedVec2::ZERO,
            owner_size: to_fixed(5.0),
            owner_input: None,
            target_position: None,
        }
    }

    #[test]
    fn test_rest_at_owner_drifts_by_base() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(true, to_fixed(125.0));
        let out = ai.update(&idle_ctx(FixedVec2::ZERO), &config);

        assert_eq!(ai.state, AiMotionState::IdleResting);
        assert_eq!(out.heading, config.rest_drift_base);
        assert_eq!(out.accel_divisor, 6);
        assert!(ai.rest_cycle);
    }

    #[test]
    fn test_drift_grows_with_distance() {
        let config = DroneConfig::default();
        let mut near = AiController::new(false, 0);
        let mut far = AiController::new(false, 0);

        let a = near.update(&idle_ctx(FixedVec2::from_ints(5, 0)), &config);
        let b = far.update(&idle_ctx(FixedVec2::from_ints(30, 0)), &config);
        assert!(b.heading > a.heading);
    }

    #[test]
    fn test_outside_radius_orbits() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(false, 0);
        let out = ai.update(&idle_ctx(FixedVec2::from_ints(100, 0)), &config);

        assert_eq!(ai.state, AiMotionState::IdleOrbiting);
        assert_eq!(out.accel_divisor, 1);
        // Far from the orbit point, so no rest next tick
        assert!(!ai.rest_cycle);
        // Orbit point is ahead of the owner at +90°; the drone heads back west
        assert!(fixed_abs(out.heading) > FIXED_HALF_PI);
    }

    #[test]
    fn test_orbit_flag_is_read_next_tick() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(false, 0);
        ai.rest_cycle = false;

        // Inside the resting radius but the flag says orbit
        let ctx = idle_ctx(FixedVec2::from_ints(6, 0));
        let out = ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::IdleOrbiting);
        assert_eq!(out.accel_divisor, config.orbit_close_accel_divisor);
        // Close to the orbit point, so rest resumes on the following tick
        assert!(ai.rest_cycle);

        ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::IdleResting);
    }

    #[test]
    fn test_pilot_aim_and_repel() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(true, 0);
        let mut ctx = idle_ctx(FixedVec2::ZERO);
        ctx.owner_input = Some(InputFrame::new().aiming_at(FixedVec2::from_ints(10, 0)).shooting());

        let out = ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::PilotControlled);
        assert_eq!(out.heading, 0);
        assert_eq!(out.accel_divisor, 1);
        assert!(!ai.rest_cycle);

        ctx.owner_input = Some(InputFrame::new().aiming_at(FixedVec2::from_ints(10, 0)).repelling());
        let out = ai.update(&ctx, &config);
        assert_eq!(out.heading, wrap_angle(FIXED_PI));
    }

    #[test]
    fn test_uncontrollable_ignores_pilot() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(false, 0);
        let mut ctx = idle_ctx(FixedVec2::ZERO);
        ctx.owner_input = Some(InputFrame::new().shooting());
        ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::IdleResting);
    }

    #[test]
    fn test_pursuit_beats_idle_but_not_pilot() {
        let config = DroneConfig::default();
        let mut ai = AiController::new(true, 0);
        let mut ctx = idle_ctx(FixedVec2::ZERO);
        ctx.target_position = Some(FixedVec2::from_ints(0, 20));

        let out = ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::Pursuing);
        assert_eq!(out.heading, FIXED_HALF_PI);

        ctx.owner_input = Some(InputFrame::new().aiming_at(FixedVec2::from_ints(10, 0)).shooting());
        ai.update(&ctx, &config);
        assert_eq!(ai.state, AiMotionState::PilotControlled);
    }
}
