use crate::config::{ArenaConfig, GenerationDirections, WORLD_HEIGHT, WORLD_WIDTH};
use crate::entity::Entity;
use crate::types::Point;
use crate::utils::{bucket_angle, gcd};
use rand::Rng;
use rand::seq::SliceRandom;
use std::f64::consts::TAU;

/// Walks the first generation direction of each reset through all `N`
/// buckets with a stride coprime to `N`, so no bucket repeats before every
/// bucket has been used once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionCursor {
    buckets: u32,
    multiplier: u32,
    resets: u64,
}

impl DirectionCursor {
    pub fn new(buckets: u32) -> Self {
        DirectionCursor {
            buckets,
            multiplier: coprime_multiplier(buckets),
            resets: 0,
        }
    }

    pub fn buckets(&self) -> u32 {
        self.buckets
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Bucket for the current reset, then advances to the next one.
    pub fn next_bucket(&mut self) -> u32 {
        let bucket = (self.resets * self.multiplier as u64) % self.buckets as u64;
        self.resets += 1;
        bucket as u32
    }
}

/// Smallest `m >= max(n / 4, 1)` with `gcd(m, n) == 1`, or 1 when `n <= 1`.
pub fn coprime_multiplier(n: u32) -> u32 {
    // n - 1 is always coprime with n, so the scan ends inside the range for n >= 2
    ((n / 4).max(1)..n).find(|&m| gcd(m, n) == 1).unwrap_or(1)
}

/// Chooses generation directions and spawns polygons along them.
#[derive(Debug, Clone)]
pub struct Generator {
    cursor: Option<DirectionCursor>,
}

impl Generator {
    pub fn new(mode: GenerationDirections) -> Self {
        let cursor = match mode {
            GenerationDirections::Continuous => None,
            GenerationDirections::Discrete(n) => Some(DirectionCursor::new(n)),
        };
        Generator { cursor }
    }

    pub fn cursor(&self) -> Option<&DirectionCursor> {
        self.cursor.as_ref()
    }

    /// Uniform hero position inside the world shrunk by the spawn margin.
    pub fn hero_position<R: Rng + ?Sized>(config: &ArenaConfig, rng: &mut R) -> Point {
        let margin = config.hero_spawn_margin;
        Point {
            x: rng.gen_range(margin..=WORLD_WIDTH - margin),
            y: rng.gen_range(margin..=WORLD_HEIGHT - margin),
        }
    }

    /// Generation directions (radians) for one episode.
    pub fn angles<R: Rng + ?Sized>(&mut self, config: &ArenaConfig, rng: &mut R) -> Vec<f64> {
        let count = config.directions_per_episode;
        let mut angles = Vec::with_capacity(count);
        match self.cursor.as_mut() {
            None => {
                for _ in 0..count {
                    angles.push(rng.gen_range(0.0..TAU));
                }
            }
            Some(cursor) => {
                let n = cursor.buckets();
                angles.push(bucket_angle(cursor.next_bucket(), n));
                for _ in 1..count {
                    angles.push(bucket_angle(rng.gen_range(0..n), n));
                }
            }
        }
        angles
    }

    /// Spawns `polygons_per_direction` polygons around each angle. The first
    /// `shootable_per_direction` use the tight jitter; positions outside the
    /// world are dropped, not retried.
    pub fn spawn_polygons<R: Rng + ?Sized>(
        config: &ArenaConfig,
        hero: Point,
        angles: &[f64],
        first_id: u32,
        rng: &mut R,
    ) -> Vec<Entity> {
        let mut polygons = Vec::with_capacity(angles.len() * config.polygons_per_direction);
        let mut next_id = first_id;
        for &theta in angles {
            for i in 0..config.polygons_per_direction {
                let divider = if i < config.shootable_per_direction {
                    config.shootable_jitter_divider
                } else {
                    config.wide_jitter_divider
                };
                let jitter = rng.gen_range(-1.0..=1.0) * TAU / divider / 2.0;
                let distance = rng.gen_range(config.spawn_min_distance..config.spawn_max_distance);
                let Some(profile) = config.polygon_profiles.choose(rng) else {
                    continue;
                };

                let position = Point::from_polar(hero, theta + jitter, distance);
                if !position.strictly_inside(WORLD_WIDTH, WORLD_HEIGHT) {
                    crate::debug_spawn!(
                        "Dropped {}-gon at ({:.1}, {:.1}): outside world",
                        profile.edges,
                        position.x,
                        position.y
                    );
                    continue;
                }

                crate::debug_spawn!(
                    "Polygon {} ({}-gon) at ({:.1}, {:.1}), {:.1} from hero",
                    next_id,
                    profile.edges,
                    position.x,
                    position.y,
                    distance
                );
                polygons.push(Entity::polygon(next_id, position, profile));
                next_id += 1;
            }
        }
        polygons
    }
}
