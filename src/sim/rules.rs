use glam::Vec2;

use crate::boid::Boid;
use crate::config::FlockRules;

/// Everything one tick of steering needs besides the boids themselves.
#[derive(Debug, Clone, Copy)]
pub struct Tick<'a> {
    pub rules: &'a FlockRules,
    /// World extent; the world spans [0, bounds.x] x [0, bounds.y].
    pub bounds: Vec2,
    /// Elapsed seconds, non-negative.
    pub dt: f32,
}

/// Running sums gathered while scanning neighbours.
#[derive(Debug, Default)]
struct Neighbourhood {
    /// Sum of offsets to boids inside the protected range.
    close: Vec2,
    pos_sum: Vec2,
    vel_sum: Vec2,
    visible: u32,
}

impl Neighbourhood {
    fn scan<'b>(boid: &Boid, others: impl Iterator<Item = &'b Boid>, rules: &FlockRules) -> Self {
        let visual_sq = rules.visual_range * rules.visual_range;
        let protected_sq = rules.protected_range * rules.protected_range;
        let mut n = Self::default();

        for other in others {
            let d = boid.pos - other.pos;
            // Bounding-box reject before the distance test.
            if d.x.abs() >= rules.visual_range || d.y.abs() >= rules.visual_range {
                continue;
            }
            let dist_sq = d.x * d.x + d.y * d.y;
            if dist_sq < protected_sq {
                n.close += d;
            } else if dist_sq < visual_sq {
                n.pos_sum += other.pos;
                n.vel_sum += other.vel;
                n.visible += 1;
            }
        }
        n
    }
}

/// Compute the next state of `boid` given every other boid in the flock.
///
/// `others` must not contain `boid` itself. Cohesion, alignment, turning and
/// bias act on velocity directly; only separation and integration are scaled
/// by `tick.dt`.
pub fn steer<'b>(mut boid: Boid, others: impl Iterator<Item = &'b Boid>, tick: Tick<'_>) -> Boid {
    let rules = tick.rules;
    let n = Neighbourhood::scan(&boid, others, rules);

    // Cohesion + alignment
    if n.visible > 0 {
        let count = n.visible as f32;
        let avg_pos = n.pos_sum / count;
        let avg_vel = n.vel_sum / count;
        boid.vel += (avg_pos - boid.pos) * rules.centering_factor
            + (avg_vel - boid.vel) * rules.matching_factor;
    }

    // Separation
    boid.vel += n.close * rules.avoid_factor * tick.dt;

    // Soft bounds: each edge is checked independently.
    if boid.pos.x < 0.0 {
        boid.vel.x += rules.turn_factor;
    }
    if boid.pos.x > tick.bounds.x {
        boid.vel.x -= rules.turn_factor;
    }
    if boid.pos.y < 0.0 {
        boid.vel.y += rules.turn_factor;
    }
    if boid.pos.y > tick.bounds.y {
        boid.vel.y -= rules.turn_factor;
    }

    if let Some(direction) = boid.group.direction() {
        boid.bias = ratchet_bias(boid.bias, boid.vel.x * direction > 0.0, rules);
        boid.vel.x = (1.0 - boid.bias) * boid.vel.x + boid.bias * direction;
    }

    boid.vel = govern_speed(boid.vel, rules);
    boid.pos += boid.vel * tick.dt;
    boid
}

/// Step the bias one increment toward `max_bias` when the boid heads the
/// preferred way, otherwise toward `bias_increment`.
pub fn ratchet_bias(bias: f32, aligned: bool, rules: &FlockRules) -> f32 {
    if aligned {
        (bias + rules.bias_increment).min(rules.max_bias)
    } else {
        (bias - rules.bias_increment).max(rules.bias_increment)
    }
}

/// Rescale `vel` into [min_speed, max_speed] keeping its direction.
/// A zero velocity has no direction and is returned unchanged.
pub fn govern_speed(vel: Vec2, rules: &FlockRules) -> Vec2 {
    let speed = vel.length();
    if speed == 0.0 || (speed >= rules.min_speed && speed <= rules.max_speed) {
        return vel;
    }
    vel / speed * speed.clamp(rules.min_speed, rules.max_speed)
}

/// Update `batch` in place, in index order.
///
/// `lead` and `tail` are the boids before and after the batch. Boids inside
/// the batch see the already-updated state of earlier batch members, the same
/// way a single in-place pass over the flock does.
pub fn update_batch(lead: &[Boid], batch: &mut [Boid], tail: &[Boid], tick: Tick<'_>) {
    for i in 0..batch.len() {
        let view: &[Boid] = batch;
        let others = lead
            .iter()
            .chain(view[..i].iter())
            .chain(view[i + 1..].iter())
            .chain(tail.iter());
        let next = steer(view[i], others, tick);
        batch[i] = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boid::ScoutGroup;

    const EPS: f32 = 1e-4;

    fn tick(rules: &FlockRules, dt: f32) -> Tick<'_> {
        Tick {
            rules,
            bounds: Vec2::new(800.0, 600.0),
            dt,
        }
    }

    fn boid(x: f32, y: f32, vx: f32, vy: f32) -> Boid {
        Boid::new(Vec2::new(x, y), Vec2::new(vx, vy), ScoutGroup::None)
    }

    #[test]
    fn lone_boid_only_integrates() {
        let rules = FlockRules::default();
        let b = boid(400.0, 300.0, 20.0, -5.0);
        let next = steer(b, std::iter::empty(), tick(&rules, 0.5));

        assert_eq!(next.vel, b.vel);
        assert_eq!(next.pos, Vec2::new(410.0, 297.5));
    }

    #[test]
    fn left_of_world_turns_right_only() {
        let rules = FlockRules::default();
        let b = boid(-5.0, 300.0, 20.0, 0.0);
        let next = steer(b, std::iter::empty(), tick(&rules, 0.0));

        assert_eq!(next.vel.x, 20.0 + rules.turn_factor);
        assert_eq!(next.vel.y, 0.0);
    }

    #[test]
    fn corner_turns_on_both_axes() {
        let rules = FlockRules::default();
        let b = boid(810.0, 610.0, 20.0, 20.0);
        let next = steer(b, std::iter::empty(), tick(&rules, 0.0));

        assert_eq!(next.vel, Vec2::new(19.0, 19.0));
    }

    #[test]
    fn stacked_boids_do_not_produce_nan() {
        let rules = FlockRules::default();
        let a = boid(100.0, 100.0, 0.0, 0.0);
        let b = a;
        let next = steer(a, std::iter::once(&b), tick(&rules, 1.0 / 60.0));

        assert_eq!(next.vel, Vec2::ZERO);
        assert_eq!(next.pos, a.pos);
    }

    #[test]
    fn separation_scales_with_dt() {
        let rules = FlockRules::default();
        let a = boid(100.0, 100.0, 20.0, 0.0);
        let b = boid(110.0, 100.0, 20.0, 0.0);

        let frozen = steer(a, std::iter::once(&b), tick(&rules, 0.0));
        assert_eq!(frozen.vel, a.vel);
        assert_eq!(frozen.pos, a.pos);

        let moving = steer(a, std::iter::once(&b), tick(&rules, 1.0));
        // close offset (-10, 0) * avoid 0.05 * dt 1.0
        assert!((moving.vel.x - 19.5).abs() < EPS);
    }

    #[test]
    fn cohesion_and_alignment_ignore_dt() {
        let rules = FlockRules::default();
        let a = boid(100.0, 100.0, 20.0, 0.0);
        let b = boid(150.0, 100.0, 20.0, 10.0);
        let next = steer(a, std::iter::once(&b), tick(&rules, 0.0));

        // cohesion 50 * 0.005, alignment 10 * 0.05
        assert!((next.vel.x - 20.25).abs() < EPS);
        assert!((next.vel.y - 0.5).abs() < EPS);
        assert_eq!(next.pos, a.pos);
    }

    #[test]
    fn bounding_box_filters_diagonal_neighbours() {
        let rules = FlockRules::default();
        let a = boid(100.0, 100.0, 20.0, 0.0);
        // Inside the box on x, outside on y.
        let b = boid(110.0, 180.0, -20.0, 0.0);
        let next = steer(a, std::iter::once(&b), tick(&rules, 0.0));

        assert_eq!(next.vel, a.vel);
    }

    #[test]
    fn speed_is_clamped_into_range() {
        let rules = FlockRules::default();

        let slow = govern_speed(Vec2::new(3.0, 4.0), &rules);
        assert!((slow.length() - rules.min_speed).abs() < EPS);
        assert!((slow.x / slow.y - 0.75).abs() < EPS);

        let fast = govern_speed(Vec2::new(300.0, 400.0), &rules);
        assert!((fast.length() - rules.max_speed).abs() < EPS);

        let fine = Vec2::new(12.0, -9.0);
        assert_eq!(govern_speed(fine, &rules), fine);

        assert_eq!(govern_speed(Vec2::ZERO, &rules), Vec2::ZERO);
    }

    #[test]
    fn bias_ratchets_between_bounds() {
        let rules = FlockRules::default();

        assert!((ratchet_bias(0.0, true, &rules) - 0.005).abs() < 1e-7);
        assert!((ratchet_bias(0.0, false, &rules) - 0.005).abs() < 1e-7);
        assert!((ratchet_bias(0.1, false, &rules) - 0.095).abs() < 1e-7);
        assert_eq!(ratchet_bias(0.248, true, &rules), 0.25);
        assert_eq!(ratchet_bias(0.25, true, &rules), 0.25);
        assert_eq!(ratchet_bias(0.007, false, &rules), 0.005);
    }

    #[test]
    fn right_scout_pulls_velocity_right() {
        let rules = FlockRules::default();
        let mut b = boid(400.0, 300.0, 20.0, 0.0);
        b.group = ScoutGroup::Right;
        let next = steer(b, std::iter::empty(), tick(&rules, 0.0));

        assert!((next.bias - 0.005).abs() < 1e-7);
        let expected = (1.0 - next.bias) * 20.0 + next.bias;
        assert!((next.vel.x - expected).abs() < EPS);
    }

    #[test]
    fn left_scout_heading_right_is_misaligned() {
        let rules = FlockRules::default();
        let mut b = boid(400.0, 300.0, 20.0, 0.0);
        b.group = ScoutGroup::Left;
        b.bias = 0.1;
        let next = steer(b, std::iter::empty(), tick(&rules, 0.0));

        assert!((next.bias - 0.095).abs() < 1e-6);
        let expected = (1.0 - next.bias) * 20.0 - next.bias;
        assert!((next.vel.x - expected).abs() < EPS);
    }

    #[test]
    fn scout_bias_saturates_at_cap() {
        let rules = FlockRules::default();
        let mut b = boid(400.0, 300.0, 20.0, 0.0);
        b.group = ScoutGroup::Right;

        let mut prev = b.bias;
        for _ in 0..100 {
            b = steer(b, std::iter::empty(), tick(&rules, 0.0));
            let step = b.bias - prev;
            assert!(b.bias >= rules.bias_increment && b.bias <= rules.max_bias);
            assert!(step.abs() <= rules.bias_increment + 1e-6);
            prev = b.bias;
        }
        assert_eq!(b.bias, rules.max_bias);
    }

    #[test]
    fn batch_sees_earlier_updates() {
        let rules = FlockRules::default();
        let mut flock = vec![
            boid(100.0, 100.0, 20.0, 0.0),
            boid(130.0, 100.0, 20.0, 0.0),
        ];
        let before = flock.clone();
        update_batch(&[], &mut flock, &[], tick(&rules, 0.1));

        // Boid 1 against the pre-tick state of boid 0.
        let stale = steer(before[1], std::iter::once(&before[0]), tick(&rules, 0.1));
        // Boid 1 against the updated boid 0.
        let fresh = steer(before[1], std::iter::once(&flock[0]), tick(&rules, 0.1));

        assert_eq!(flock[1], fresh);
        assert_ne!(flock[1].vel, stale.vel);
    }
}
