//! Ball integration and the sub-stepped frame driver

use glam::DVec2;

use super::collision::{ball_wall_collision, clamp_to_bounds, reflect_velocity};
use super::maze::Wall;
use super::state::Ball;
use crate::consts::*;

/// Tilt below this magnitude is amplified, above it compressed
const SHAPE_THRESHOLD: f64 = 0.3;

/// Response curve for one tilt axis.
///
/// Small tilts get a 1.5x boost so the ball reacts to gentle input; past the
/// threshold the slope drops to 0.8 so full tilt is not violent. The two
/// pieces meet at 0.45.
#[inline]
pub fn shape_axis(value: f64) -> f64 {
    let magnitude = value.abs();
    let shaped = if magnitude < SHAPE_THRESHOLD {
        magnitude * 1.5
    } else {
        0.45 + (magnitude - SHAPE_THRESHOLD) * 0.8
    };
    shaped.copysign(value)
}

/// Apply [`shape_axis`] to both components
#[inline]
pub fn shape_input(tilt: DVec2) -> DVec2 {
    DVec2::new(shape_axis(tilt.x), shape_axis(tilt.y))
}

/// Per-step friction so that `substeps` steps damp like one full frame
#[inline]
pub fn substep_friction(frame_friction: f64, substeps: u32) -> f64 {
    frame_friction.powf(1.0 / f64::from(substeps.max(1)))
}

impl Ball {
    /// Advance the ball by `dt` under tilt `accel`, resolving wall hits.
    ///
    /// Walls are resolved one after another against the tentative position;
    /// a ball wedged in a corner is pushed out of each wall in list order.
    /// Returns true if any wall was hit.
    pub fn update(&mut self, accel: DVec2, dt: f64, walls: &[Wall], friction: f64) -> bool {
        let shaped = shape_input(accel);
        self.vel += shaped * GRAVITY * self.sensitivity * dt;
        self.vel *= friction;

        let mut pos = self.pos + self.vel * dt;

        let mut collided = false;
        for wall in walls {
            let result = ball_wall_collision(pos, self.radius, wall);
            if !result.hit {
                continue;
            }
            pos = result.point + result.normal * self.radius;
            self.vel = reflect_velocity(self.vel, result.normal) * WALL_RESTITUTION;
            collided = true;
        }

        clamp_to_bounds(
            &mut pos,
            &mut self.vel,
            self.radius,
            self.bounds,
            BOUNDS_RESTITUTION,
        );

        self.pos = pos;
        collided
    }
}

/// Advance a ball through one rendered frame in `substeps` equal steps.
///
/// Splitting the frame keeps a fast ball from skipping over a 10px wall in a
/// single step. Friction is taken to the `substeps`-th root so total damping
/// per frame does not depend on the step count.
pub fn step_frame(
    ball: &mut Ball,
    accel: DVec2,
    frame_dt: f64,
    walls: &[Wall],
    substeps: u32,
) -> bool {
    let substeps = substeps.max(1);
    let dt = frame_dt / f64::from(substeps);
    let friction = substep_friction(FRICTION, substeps);

    let mut collided = false;
    for _ in 0..substeps {
        collided |= ball.update(accel, dt, walls, friction);
    }
    collided
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn open_ball(pos: DVec2, vel: DVec2) -> Ball {
        let mut ball = Ball::new(pos, DVec2::new(WORLD_WIDTH, WORLD_HEIGHT));
        ball.vel = vel;
        ball
    }

    #[test]
    fn test_shape_axis() {
        assert_eq!(shape_axis(0.0), 0.0);
        assert_relative_eq!(shape_axis(0.2), 0.3);
        assert_relative_eq!(shape_axis(-0.2), -0.3);
        assert_relative_eq!(shape_axis(0.3), 0.45);
        assert_relative_eq!(shape_axis(1.0), 0.45 + 0.7 * 0.8);
        assert_relative_eq!(shape_axis(-1.0), -(0.45 + 0.7 * 0.8));
    }

    #[test]
    fn test_shape_is_continuous_at_threshold() {
        let below = shape_axis(SHAPE_THRESHOLD - 1e-9);
        let above = shape_axis(SHAPE_THRESHOLD);
        assert!((above - below).abs() < 1e-6);
    }

    #[test]
    fn test_integration_step() {
        let mut ball = open_ball(DVec2::new(500.0, 400.0), DVec2::ZERO);
        let dt = 0.01;
        let collided = ball.update(DVec2::new(1.0, 0.0), dt, &[], 1.0);
        assert!(!collided);
        let expected_v = shape_axis(1.0) * GRAVITY * dt;
        assert_relative_eq!(ball.vel.x, expected_v);
        assert_relative_eq!(ball.pos.x, 500.0 + expected_v * dt);
        assert_eq!(ball.vel.y, 0.0);
    }

    #[test]
    fn test_sensitivity_scales_acceleration() {
        let mut slow = open_ball(DVec2::new(500.0, 400.0), DVec2::ZERO);
        let mut fast = slow.clone();
        fast.sensitivity = 2.0;
        slow.update(DVec2::new(0.0, 0.5), 0.01, &[], 1.0);
        fast.update(DVec2::new(0.0, 0.5), 0.01, &[], 1.0);
        assert_relative_eq!(fast.vel.y, slow.vel.y * 2.0);
    }

    #[test]
    fn test_friction_decay_independent_of_substeps() {
        let v0 = DVec2::new(300.0, -120.0);
        for substeps in [1, 2, 4, 8] {
            let mut ball = open_ball(DVec2::new(640.0, 360.0), v0);
            step_frame(&mut ball, DVec2::ZERO, FRAME_DT, &[], substeps);
            assert_relative_eq!(
                ball.vel.length(),
                v0.length() * FRICTION,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_wall_bounce_reflects_and_bleeds_energy() {
        // Vertical wall to the right of the ball
        let wall = Wall::new(600, 300, 10, 200);
        let mut ball = open_ball(DVec2::new(589.0, 400.0), DVec2::new(600.0, 0.0));

        let collided = ball.update(DVec2::ZERO, 1.0 / 240.0, &[wall], 1.0);
        assert!(collided);
        assert_relative_eq!(ball.pos.x, 590.0);
        assert_relative_eq!(ball.vel.x, -600.0 * WALL_RESTITUTION);
    }

    #[test]
    fn test_collision_containment_under_sustained_push() {
        let wall = Wall::new(600, 200, 10, 300);
        let mut ball = open_ball(DVec2::new(590.0, 350.0), DVec2::ZERO);

        for _ in 0..600 {
            step_frame(&mut ball, DVec2::new(1.0, 0.0), FRAME_DT, &[wall], SUBSTEPS);
            let closest = ball.pos.clamp(wall.top_left(), wall.bottom_right());
            let distance = (ball.pos - closest).length();
            assert!(distance >= ball.radius - 1e-6, "ball sank into wall: {}", distance);
            assert!(ball.pos.x < 600.0);
        }
    }

    #[test]
    fn test_fast_ball_does_not_tunnel_with_substeps() {
        let wall = Wall::new(600, 0, 10, 720);
        let mut ball = open_ball(DVec2::new(555.0, 360.0), DVec2::new(2400.0, 0.0));

        for _ in 0..10 {
            step_frame(&mut ball, DVec2::ZERO, FRAME_DT, &[wall], SUBSTEPS);
            assert!(ball.pos.x < 600.0, "ball crossed the wall at {}", ball.pos.x);
        }
    }

    #[test]
    fn test_boundary_clamp() {
        let radius = BALL_RADIUS;
        let mut ball = open_ball(DVec2::new(WORLD_WIDTH - radius - 1.0, 300.0), DVec2::new(500.0, 0.0));
        ball.update(DVec2::ZERO, FRAME_DT, &[], 1.0);
        assert_eq!(ball.pos.x, WORLD_WIDTH - radius);
        assert_relative_eq!(ball.vel.x, -250.0);

        let mut ball = open_ball(DVec2::new(radius + 1.0, radius + 1.0), DVec2::new(-300.0, -100.0));
        ball.update(DVec2::ZERO, FRAME_DT, &[], 1.0);
        assert_eq!(ball.pos, DVec2::new(radius, radius));
        assert_relative_eq!(ball.vel.x, 150.0);
        assert_relative_eq!(ball.vel.y, 50.0);
    }

    #[test]
    fn test_substep_friction() {
        assert_relative_eq!(substep_friction(0.98, 1), 0.98);
        assert_relative_eq!(substep_friction(0.98, 4).powi(4), 0.98);
        assert_relative_eq!(substep_friction(0.98, 0), 0.98);
    }
}
