use glam::Vec2;

use crate::config::WorldConfig;

/// Initial velocity is drawn per axis from [-LAUNCH_SPREAD, LAUNCH_SPREAD].
const LAUNCH_SPREAD: f32 = 2.0;

/// Persistent horizontal preference of a scout boid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScoutGroup {
    None,
    Right,
    Left,
}

impl ScoutGroup {
    /// Group for the boid at `index`: the first `right` boids lean right,
    /// the next `left` lean left, the rest are unbiased.
    pub fn for_index(index: usize, right: usize, left: usize) -> Self {
        if index < right {
            ScoutGroup::Right
        } else if index < right + left {
            ScoutGroup::Left
        } else {
            ScoutGroup::None
        }
    }

    /// Sign of the preferred x velocity, or `None` for unbiased boids.
    pub fn direction(self) -> Option<f32> {
        match self {
            ScoutGroup::None => None,
            ScoutGroup::Right => Some(1.0),
            ScoutGroup::Left => Some(-1.0),
        }
    }
}

/// One flocking agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boid {
    /// World position in pixels. May leave the bounds; turning pulls it back.
    pub pos: Vec2,
    /// Velocity in pixels/second.
    pub vel: Vec2,
    /// Strength of the scout's directional bias. Starts at 0.
    pub bias: f32,
    pub group: ScoutGroup,
}

impl Boid {
    pub fn new(pos: Vec2, vel: Vec2, group: ScoutGroup) -> Self {
        Self {
            pos,
            vel,
            bias: 0.0,
            group,
        }
    }
}

/// Dense, fixed-size population. Boids are never added or removed after spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Flock {
    boids: Vec<Boid>,
}

impl Flock {
    /// Spawn `config.boid_count` boids uniformly over the world with small
    /// random velocities. Scout groups are assigned by index.
    pub fn spawn(config: &WorldConfig, rng: &mut fastrand::Rng) -> Self {
        let boids = (0..config.boid_count)
            .map(|i| {
                let pos = Vec2::new(rng.f32() * config.width, rng.f32() * config.height);
                let vel = Vec2::new(spread(rng), spread(rng));
                let group = ScoutGroup::for_index(i, config.right_scouts, config.left_scouts);
                Boid::new(pos, vel, group)
            })
            .collect();
        Self { boids }
    }

    #[cfg(test)]
    pub fn from_boids(boids: Vec<Boid>) -> Self {
        Self { boids }
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn boids_mut(&mut self) -> &mut [Boid] {
        &mut self.boids
    }

    /// Position and group of every boid, in index order, for drawing.
    pub fn draw_list(&self) -> impl Iterator<Item = (Vec2, ScoutGroup)> + '_ {
        self.boids.iter().map(|b| (b.pos, b.group))
    }
}

fn spread(rng: &mut fastrand::Rng) -> f32 {
    -LAUNCH_SPREAD + rng.f32() * (2.0 * LAUNCH_SPREAD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_follow_index_partition() {
        let config = WorldConfig::default();
        let flock = Flock::spawn(&config, &mut fastrand::Rng::with_seed(7));

        assert_eq!(flock.len(), 200);
        for (i, boid) in flock.boids().iter().enumerate() {
            let expected = if i < 10 {
                ScoutGroup::Right
            } else if i < 20 {
                ScoutGroup::Left
            } else {
                ScoutGroup::None
            };
            assert_eq!(boid.group, expected, "boid {i}");
            assert_eq!(boid.bias, 0.0);
        }
    }

    #[test]
    fn spawn_stays_in_world_and_launch_range() {
        let config = WorldConfig::default();
        let flock = Flock::spawn(&config, &mut fastrand::Rng::with_seed(42));

        for boid in flock.boids() {
            assert!((0.0..=config.width).contains(&boid.pos.x));
            assert!((0.0..=config.height).contains(&boid.pos.y));
            assert!(boid.vel.x.abs() <= LAUNCH_SPREAD);
            assert!(boid.vel.y.abs() <= LAUNCH_SPREAD);
        }
    }

    #[test]
    fn same_seed_same_flock() {
        let config = WorldConfig::default();
        let a = Flock::spawn(&config, &mut fastrand::Rng::with_seed(1234));
        let b = Flock::spawn(&config, &mut fastrand::Rng::with_seed(1234));
        let c = Flock::spawn(&config, &mut fastrand::Rng::with_seed(4321));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn group_sizes_can_be_zero() {
        assert_eq!(ScoutGroup::for_index(0, 0, 0), ScoutGroup::None);
        assert_eq!(ScoutGroup::for_index(0, 0, 1), ScoutGroup::Left);
        assert_eq!(ScoutGroup::for_index(1, 0, 1), ScoutGroup::None);
    }
}
