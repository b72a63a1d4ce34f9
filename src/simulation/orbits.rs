//! Orbit bookkeeping for the Earth system
//!
//! All motion is expressed per tick; [`FixedTimestep`] turns wall-clock time
//! into whole ticks so the animation speed does not depend on frame rate.

use cgmath::Vector3;

use crate::config::MotionConfig;

/// Converts elapsed time into a whole number of fixed ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedTimestep {
    /// `rate` ticks per second; at most `max_steps` ticks are produced per call
    pub fn new(rate: f32, max_steps: u32) -> Self {
        Self {
            step: 1.0 / rate.max(f32::EPSILON),
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Adds `delta_time` seconds and returns how many ticks are due
    ///
    /// After a long stall the surplus beyond `max_steps` is dropped instead of
    /// being replayed.
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        self.accumulator += delta_time.max(0.0);
        let due = (self.accumulator / self.step).floor();
        if due >= self.max_steps as f32 {
            self.accumulator = 0.0;
            return self.max_steps;
        }
        self.accumulator -= due * self.step;
        due as u32
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Rotation and orbit angles of every moving body, in radians
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub earth_rotation: f32,
    pub cloud_rotation: f32,
    pub moon_angle: f32,
    pub moon_orbit_enabled: bool,
    pub satellite_angle: f32,
    pub satellite_rotation: f32,
}

impl Default for OrbitState {
    fn default() -> Self {
        Self {
            earth_rotation: 0.0,
            cloud_rotation: 0.0,
            moon_angle: 0.0,
            moon_orbit_enabled: true,
            satellite_angle: 0.0,
            satellite_rotation: 0.0,
        }
    }
}

impl OrbitState {
    /// Advances one tick
    ///
    /// The satellite only moves once its model has arrived.
    pub fn tick(&mut self, motion: &MotionConfig, satellite_loaded: bool) {
        self.earth_rotation += motion.earth_spin;
        self.cloud_rotation += motion.cloud_spin;

        if self.moon_orbit_enabled {
            self.moon_angle += motion.moon_orbit_speed;
        }

        if satellite_loaded {
            self.satellite_angle += motion.satellite_orbit_speed;
            self.satellite_rotation += motion.satellite_spin;
        }
    }

    /// Flips the moon orbit and returns the new state
    pub fn toggle_moon_orbit(&mut self) -> bool {
        self.moon_orbit_enabled = !self.moon_orbit_enabled;
        self.moon_orbit_enabled
    }

    /// Moon on a flat circle around the Earth, starting on +X
    pub fn moon_position(&self, earth: Vector3<f32>, motion: &MotionConfig) -> Vector3<f32> {
        let r = motion.moon_orbit_radius;
        Vector3::new(
            earth.x + self.moon_angle.cos() * r,
            0.0,
            earth.z + self.moon_angle.sin() * r,
        )
    }

    /// Satellite circling the Earth while bobbing through the equator,
    /// starting on +Z
    pub fn satellite_position(&self, earth: Vector3<f32>, motion: &MotionConfig) -> Vector3<f32> {
        let r = motion.satellite_orbit_radius;
        let (sin, cos) = self.satellite_angle.sin_cos();
        Vector3::new(
            earth.x + sin * r,
            sin * motion.satellite_bob,
            earth.z + cos * r,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Zero};

    #[test]
    fn sixty_hertz_step_yields_one_tick_per_frame() {
        let mut timestep = FixedTimestep::new(60.0, 10);
        assert_eq!(timestep.advance(1.0 / 60.0 + 1e-6), 1);
        assert_eq!(timestep.advance(0.005), 0);
        assert_eq!(timestep.advance(0.012), 1);
    }

    #[test]
    fn slow_frames_catch_up_and_stalls_are_capped() {
        let mut timestep = FixedTimestep::new(60.0, 10);
        // a 30 Hz display runs two ticks per frame
        assert_eq!(timestep.advance(1.0 / 30.0 + 1e-6), 2);

        assert_eq!(timestep.advance(5.0), 10);
        assert_eq!(timestep.advance(0.0), 0);
    }

    #[test]
    fn tick_applies_reference_increments() {
        let motion = MotionConfig::default();
        let mut state = OrbitState::default();
        state.tick(&motion, false);

        assert_eq!(state.earth_rotation, 0.001);
        assert_eq!(state.cloud_rotation, 0.0012);
        assert_eq!(state.moon_angle, 0.002);
        assert_eq!(state.satellite_angle, 0.0);
        assert_eq!(state.satellite_rotation, 0.0);

        state.tick(&motion, true);
        assert_eq!(state.satellite_angle, 0.005);
        assert_eq!(state.satellite_rotation, 0.01);
    }

    #[test]
    fn paused_moon_keeps_its_angle() {
        let motion = MotionConfig::default();
        let mut state = OrbitState::default();
        state.tick(&motion, false);
        assert!(!state.toggle_moon_orbit());

        let angle = state.moon_angle;
        for _ in 0..100 {
            state.tick(&motion, false);
        }
        assert_eq!(state.moon_angle, angle);
        assert!(state.earth_rotation > 0.1);

        assert!(state.toggle_moon_orbit());
        state.tick(&motion, false);
        assert!(state.moon_angle > angle);
    }

    #[test]
    fn moon_circles_in_the_equatorial_plane() {
        let motion = MotionConfig::default();
        let mut state = OrbitState::default();
        assert_eq!(
            state.moon_position(Vector3::zero(), &motion),
            Vector3::new(3.0, 0.0, 0.0)
        );

        state.moon_angle = std::f32::consts::FRAC_PI_2;
        let p = state.moon_position(Vector3::zero(), &motion);
        assert!((p - Vector3::new(0.0, 0.0, 3.0)).magnitude() < 1e-5);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn satellite_bobs_with_its_orbit() {
        let motion = MotionConfig::default();
        let mut state = OrbitState::default();
        assert_eq!(
            state.satellite_position(Vector3::zero(), &motion),
            Vector3::new(0.0, 0.0, 4.0)
        );

        state.satellite_angle = std::f32::consts::FRAC_PI_2;
        let p = state.satellite_position(Vector3::new(1.0, 0.0, 0.0), &motion);
        assert!((p - Vector3::new(5.0, 1.0, 0.0)).magnitude() < 1e-5);
    }
}
