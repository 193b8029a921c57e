//! Collision detection and response for the ball against maze walls
//!
//! Walls are axis-aligned rectangles, so the closest point on a wall to the
//! ball center is just the center clamped to the rectangle on each axis.

use glam::DVec2;

use super::maze::Wall;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Closest point on the wall (if hit)
    pub point: DVec2,
    /// Surface normal at collision (pointing toward ball center, for reflection)
    pub normal: DVec2,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: DVec2::ZERO,
            normal: DVec2::ZERO,
        }
    }
}

/// Closest point on a wall rectangle to `p`
#[inline]
pub fn closest_point(p: DVec2, wall: &Wall) -> DVec2 {
    p.clamp(wall.top_left(), wall.bottom_right())
}

/// Check a ball against one wall rectangle.
///
/// A center lying on or inside the rectangle has no defined direction, so the
/// normal falls back to +X.
pub fn ball_wall_collision(ball_pos: DVec2, ball_radius: f64, wall: &Wall) -> CollisionResult {
    let point = closest_point(ball_pos, wall);
    let delta = ball_pos - point;
    let distance = delta.length();

    if distance >= ball_radius {
        return CollisionResult::miss();
    }

    let normal = if distance > 0.0 {
        delta / distance
    } else {
        DVec2::X
    };

    CollisionResult {
        hit: true,
        point,
        normal,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: DVec2, normal: DVec2) -> DVec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Keep a ball inside `[0, bounds]`, bouncing softly off the edges.
///
/// Returns true if any edge was touched.
pub fn clamp_to_bounds(
    pos: &mut DVec2,
    vel: &mut DVec2,
    radius: f64,
    bounds: DVec2,
    restitution: f64,
) -> bool {
    let mut touched = false;

    if pos.x - radius < 0.0 {
        pos.x = radius;
        vel.x = -vel.x * restitution;
        touched = true;
    }
    if pos.x + radius > bounds.x {
        pos.x = bounds.x - radius;
        vel.x = -vel.x * restitution;
        touched = true;
    }
    if pos.y - radius < 0.0 {
        pos.y = radius;
        vel.y = -vel.y * restitution;
        touched = true;
    }
    if pos.y + radius > bounds.y {
        pos.y = bounds.y - radius;
        vel.y = -vel.y * restitution;
        touched = true;
    }

    touched
}

/// Check if the ball overlaps a circular target (goal hole, mine)
#[inline]
pub fn ball_circle_overlap(ball_pos: DVec2, center: DVec2, reach: f64) -> bool {
    (ball_pos - center).length() < reach
}
