use crate::config::{
    ArenaConfig, FINISHING_BONUS, FIRST_POLYGON_ID, HERO_ID, REWARD_SHARE, Termination,
};
use crate::entity::{Entity, Role, WorldState};
use crate::error::SimError;
use crate::generation::Generator;
use log::info;
use rand::Rng;

/// Result of advancing the arena by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub tick: u64, // Tick counter after this step
    pub reward: f64, // Raw per-tick reward, after the termination rule
    pub done: bool,
    pub fired: bool, // Hero spawned a bullet this tick
    pub destroyed: usize, // Polygons destroyed this tick
}

/// Reward credited for one bullet hit on `target`, evaluated after the damage was applied.
///
/// A lethal hit pays a flat share of the target's value. A partial hit pays
/// the damage fraction weighted by how little health is left, so finishing a
/// weakened target is worth more than poking a fresh one.
pub fn hit_reward(target: &Entity, damage: f64) -> f64 {
    let body = &target.body;
    if target.is_destroyed() {
        body.rewarding_experience * REWARD_SHARE
    } else {
        body.rewarding_experience * damage / body.max_health
            * (FINISHING_BONUS - body.health / body.max_health)
            * REWARD_SHARE
    }
}

/// Reward paid if every live polygon in `world` is finished by a lethal hit.
pub fn lethal_reward_total(world: &WorldState) -> f64 {
    world.destroyable_reward() * REWARD_SHARE
}

/// The training arena: owns the world state and advances it one tick at a time.
#[derive(Debug)]
pub struct Arena {
    config: ArenaConfig,
    world: Option<WorldState>,
    generator: Generator,
    generation_angles: Vec<f64>,
    tick: u64,
    next_id: u32,
    resets: u64,
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Result<Self, SimError> {
        config.validate()?;
        let generator = Generator::new(config.generation);
        Ok(Arena {
            config,
            world: None,
            generator,
            generation_angles: Vec::new(),
            tick: 0,
            next_id: FIRST_POLYGON_ID,
            resets: 0,
        })
    }

    /// Arena starting from a hand-built world (scripted scenarios, replays).
    pub fn from_world(config: ArenaConfig, world: WorldState) -> Result<Self, SimError> {
        let mut arena = Arena::new(config)?;
        arena.next_id = world
            .polygons
            .iter()
            .chain(world.bullets.iter())
            .chain(world.enemy_heroes.iter())
            .map(|e| e.id() + 1)
            .chain(std::iter::once(world.hero.id() + 1))
            .max()
            .unwrap_or(FIRST_POLYGON_ID)
            .max(FIRST_POLYGON_ID);
        arena.world = Some(world);
        Ok(arena)
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Current world, `None` until the first reset.
    pub fn world(&self) -> Option<&WorldState> {
        self.world.as_ref()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Directions used to generate the current episode's polygons.
    pub fn generation_angles(&self) -> &[f64] {
        &self.generation_angles
    }

    /// Replaces the world with a freshly generated episode.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &WorldState {
        let hero_position = Generator::hero_position(&self.config, rng);
        let angles = self.generator.angles(&self.config, rng);
        let polygons =
            Generator::spawn_polygons(&self.config, hero_position, &angles, FIRST_POLYGON_ID, rng);

        let mut world = WorldState::new(Entity::hero(HERO_ID, hero_position, &self.config));
        world.polygons = polygons;

        info!(
            "Reset {}: hero at ({:.0}, {:.0}), {} polygons along {:?} ({:.2} from lethal hits on every spawned polygon)",
            self.resets,
            hero_position.x,
            hero_position.y,
            world.polygons.len(),
            angles,
            lethal_reward_total(&world)
        );

        self.next_id = FIRST_POLYGON_ID + world.polygons.len() as u32;
        self.generation_angles = angles;
        self.tick = 0;
        self.resets += 1;
        self.world.insert(world)
    }

    /// Advances the world by one tick, shooting toward `shoot_direction` (radians) if the cooldown allows.
    pub fn step(&mut self, shoot_direction: f64) -> Result<StepOutcome, SimError> {
        let Arena {
            config,
            world,
            tick,
            next_id,
            ..
        } = self;
        let world = world.as_mut().ok_or(SimError::NotReset)?;

        // Phase 1: shooting
        let fired = Self::fire(config, world, shoot_direction, *next_id);
        if fired {
            crate::debug_arena!(
                tick = *tick,
                "Hero fired bullet {} toward {:.3} rad",
                *next_id,
                shoot_direction
            );
            *next_id += 1;
        }

        // Phase 2: drop bullets whose lifetime ran out last tick, then advance the rest (the new one included)
        world.bullets.retain(|b| b.duration() != Some(0));
        Self::advance_bullets(&mut world.bullets);

        // Phase 3: bullet/polygon collisions
        let raw_reward = Self::resolve_collisions(world, *tick);

        // Phase 4: compact destroyed entities
        let polygons_before = world.polygons.len();
        world.polygons.retain(|p| !p.is_destroyed());
        world.bullets.retain(|b| !b.is_destroyed());
        let destroyed = polygons_before - world.polygons.len();

        // Phase 5: termination
        *tick += 1;
        let (reward, done) = match config.termination {
            Termination::FixedHorizon(total) => (raw_reward, *tick >= total),
            Termination::ShotOutcome {
                success_reward,
                miss_penalty,
            } => {
                if raw_reward > 0.0 {
                    (success_reward, true)
                } else {
                    (miss_penalty, false)
                }
            }
        };

        if raw_reward != 0.0 {
            info!(
                "Tick {}: reward {:.3} ({} polygons destroyed)",
                *tick, raw_reward, destroyed
            );
        }
        if done {
            crate::debug_arena!(tick = *tick, "Episode done");
        }

        Ok(StepOutcome {
            tick: *tick,
            reward,
            done,
            fired,
            destroyed,
        })
    }

    /// Spawns a bullet if the hero's cooldown is zero, otherwise counts the cooldown down.
    fn fire(config: &ArenaConfig, world: &mut WorldState, direction: f64, bullet_id: u32) -> bool {
        let hero_id = world.hero.id();
        let position = world.hero.position();
        let Role::Hero { cooldown } = &mut world.hero.role else {
            return false;
        };
        if *cooldown > 0 {
            *cooldown -= 1;
            return false;
        }
        *cooldown = config.cool_down;
        world
            .bullets
            .push(Entity::bullet(bullet_id, hero_id, position, direction, config));
        true
    }

    /// Counts down each bullet's lifetime and moves it one velocity step.
    /// A bullet reaching zero stays in the world until the next tick.
    fn advance_bullets(bullets: &mut [Entity]) {
        for bullet in bullets.iter_mut() {
            let Role::Bullet { duration, velocity } = &mut bullet.role else {
                continue;
            };
            *duration = duration.saturating_sub(1);
            bullet.body.position = bullet.body.position.offset(*velocity);
        }
    }

    /// Applies bidirectional damage for every overlapping (bullet, polygon)
    /// pair and returns the reward earned.
    fn resolve_collisions(world: &mut WorldState, tick: u64) -> f64 {
        let WorldState {
            bullets, polygons, ..
        } = world;
        let mut reward = 0.0;

        for bullet in bullets.iter_mut() {
            for polygon in polygons.iter_mut() {
                // Already destroyed earlier this tick
                if polygon.is_destroyed() || !bullet.collides_with(polygon) {
                    continue;
                }
                let damage = bullet.body.body_damage;
                polygon.body.health -= damage;
                bullet.body.health -= polygon.body.body_damage;
                let earned = hit_reward(polygon, damage);
                reward += earned;

                crate::debug_combat!(
                    tick = tick,
                    "Bullet {} hit polygon {} ({}-gon): health {:.0}/{:.0}, reward {:.3}",
                    bullet.id(),
                    polygon.id(),
                    polygon.edges().unwrap_or(0),
                    polygon.body.health.max(0.0),
                    polygon.body.max_health,
                    earned
                );
                if polygon.is_destroyed() {
                    crate::debug_combat!(tick = tick, "Polygon {} destroyed", polygon.id());
                }
            }
        }
        reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationDirections, POLYGON_PROFILES};
    use crate::types::Point;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::{HashMap, HashSet};
    use std::f64::consts::{FRAC_PI_2, TAU};

    const NORTH: f64 = -FRAC_PI_2; // Screen coordinates: y grows downward

    fn scenario(config: ArenaConfig, polygons: &[(u8, Point)]) -> Arena {
        let hero = Entity::hero(HERO_ID, Point::new(2500.0, 2000.0), &config);
        let mut world = WorldState::new(hero);
        for (i, (edges, position)) in polygons.iter().enumerate() {
            let profile = config.profile(*edges).copied().unwrap();
            world
                .polygons
                .push(Entity::polygon(FIRST_POLYGON_ID + i as u32, *position, &profile));
        }
        Arena::from_world(config, world).unwrap()
    }

    fn world(arena: &Arena) -> &WorldState {
        arena.world().unwrap()
    }

    #[test]
    fn test_step_before_reset_fails() {
        let mut arena = Arena::new(ArenaConfig::default()).unwrap();
        assert_eq!(arena.step(0.0), Err(SimError::NotReset));
        assert!(arena.world().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ArenaConfig::default();
        config.generation = GenerationDirections::Discrete(0);
        assert!(matches!(
            Arena::new(config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_reset_builds_fresh_world() {
        let mut arena = Arena::new(ArenaConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let world = arena.reset(&mut rng).clone();
        assert_eq!(world.hero.cooldown(), Some(0));
        assert_eq!(world.hero.body.health, world.hero.body.max_health);
        assert!(world.bullets.is_empty());
        assert!(world.enemy_heroes.is_empty());
        assert!(world.polygons.len() <= arena.config().polygons_per_direction);
        assert_eq!(arena.tick(), 0);
        assert_eq!(arena.generation_angles().len(), 1);

        // Ids stay unique across polygons and subsequently fired bullets
        arena.step(0.0).unwrap();
        let w = self::world(&arena);
        let ids: HashSet<u32> = w
            .polygons
            .iter()
            .chain(w.bullets.iter())
            .map(|e| e.id())
            .collect();
        assert_eq!(ids.len(), w.polygons.len() + w.bullets.len());
    }

    #[test]
    fn test_reset_is_deterministic_for_a_seed() {
        let mut config = ArenaConfig::default();
        config.generation = GenerationDirections::Discrete(16);
        config.directions_per_episode = 2;
        let mut a = Arena::new(config.clone()).unwrap();
        let mut b = Arena::new(config).unwrap();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        for _ in 0..3 {
            assert_eq!(a.reset(&mut rng_a), b.reset(&mut rng_b));
            for t in 0..40 {
                let dir = t as f64 * 0.3;
                assert_eq!(a.step(dir), b.step(dir));
            }
            assert_eq!(a.world(), b.world());
        }
    }

    #[test]
    fn test_first_direction_visits_every_bucket() {
        let n = 12;
        let mut config = ArenaConfig::default();
        config.generation = GenerationDirections::Discrete(n);
        config.directions_per_episode = 3;
        let mut arena = Arena::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        let buckets: Vec<u32> = (0..n)
            .map(|_| {
                arena.reset(&mut rng);
                (arena.generation_angles()[0] / TAU * n as f64).round() as u32
            })
            .collect();
        let distinct: HashSet<u32> = buckets.iter().copied().collect();
        assert_eq!(distinct.len(), n as usize);
        assert_eq!(buckets[0], 0);

        // Next reset starts the cycle again
        arena.reset(&mut rng);
        assert_approx_eq!(arena.generation_angles()[0], 0.0);
    }

    #[test]
    fn test_partial_hit_scenario() {
        // One triangle 150 units due north of the hero
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[(3, Point::new(2500.0, 1850.0))]);
        let travel_ticks = (150.0 / config.bullet_speed) as u64;

        // The bullet moves on its fire tick: 30, 60, 90, 120 miss, 150 hits
        for _ in 0..travel_ticks - 1 {
            let outcome = arena.step(NORTH).unwrap();
            assert_eq!(outcome.reward, 0.0);
            assert_eq!(world(&arena).polygons[0].body.health, 100.0);
        }

        let outcome = arena.step(NORTH).unwrap();
        let polygon = &world(&arena).polygons[0];
        assert_approx_eq!(polygon.body.health, 100.0 - config.bullet_damage);
        // 10 * 12 / 100 * (1.5 - 0.88) / 2
        assert_approx_eq!(outcome.reward, 0.372);
        assert_ne!(outcome.reward, 10.0 * REWARD_SHARE);
        assert_eq!(outcome.destroyed, 0);
        assert!(!outcome.done);

        // The bullet survived the triangle's 10 body damage and flew on
        let bullet = &world(&arena).bullets[0];
        assert_approx_eq!(bullet.body.health, config.bullet_health - 10.0);
        assert_eq!(arena.step(NORTH).unwrap().reward, 0.0);
    }

    #[test]
    fn test_lethal_hit_pays_flat_share() {
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[(4, Point::new(2560.0, 2000.0))]);
        if let Some(world) = arena.world.as_mut() {
            world.polygons[0].body.health = 5.0;
        }
        let outcome = arena.step(0.0).unwrap(); // fire east, bullet at +30
        assert_eq!(outcome.reward, 0.0);
        let outcome = arena.step(0.0).unwrap(); // bullet at +60: hit
        assert_approx_eq!(outcome.reward, 60.0 * REWARD_SHARE);
        assert_eq!(outcome.destroyed, 1);
        assert!(world(&arena).polygons.is_empty());
    }

    #[test]
    fn test_fired_bullet_moves_on_fire_tick() {
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[]);
        assert!(arena.step(0.0).unwrap().fired);
        let bullet = &world(&arena).bullets[0];
        assert_approx_eq!(bullet.position().x, 2500.0 + config.bullet_speed);
        assert_approx_eq!(bullet.position().y, 2000.0);
        assert_eq!(bullet.duration(), Some(config.bullet_duration - 1));
    }

    #[test]
    fn test_second_bullet_skips_polygon_killed_same_tick() {
        let config = ArenaConfig::default();
        let mut hero = Entity::hero(HERO_ID, Point::new(2500.0, 2000.0), &config);
        hero.role = Role::Hero { cooldown: 5 };
        let mut world = WorldState::new(hero);
        let mut triangle = Entity::polygon(FIRST_POLYGON_ID, Point::new(2600.0, 2000.0), &POLYGON_PROFILES[0]);
        triangle.body.health = 5.0;
        world.polygons.push(triangle);
        for id in [FIRST_POLYGON_ID + 1, FIRST_POLYGON_ID + 2] {
            world
                .bullets
                .push(Entity::bullet(id, HERO_ID, Point::new(2570.0, 2000.0), 0.0, &config));
        }
        let mut arena = Arena::from_world(config.clone(), world).unwrap();

        let outcome = arena.step(0.0).unwrap();
        assert!(!outcome.fired);
        assert_eq!(outcome.destroyed, 1);
        // Only the lethal hit pays: 10 * 0.5
        assert_approx_eq!(outcome.reward, 5.0);
        let w = self::world(&arena);
        assert!(w.polygons.is_empty());
        assert_eq!(w.bullets.len(), 2);
        assert_approx_eq!(w.bullets[0].body.health, config.bullet_health - 10.0);
        assert_approx_eq!(w.bullets[1].body.health, config.bullet_health);
    }

    #[test]
    fn test_bullet_destroyed_by_pentagon_same_tick() {
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[(5, Point::new(2530.0, 2000.0))]);
        let outcome = arena.step(0.0).unwrap();
        assert!(outcome.fired);
        assert!(outcome.reward > 0.0);
        // Pentagon body damage equals bullet health: both hits land, the bullet is gone
        assert!(world(&arena).bullets.is_empty());
        assert_approx_eq!(world(&arena).polygons[0].body.health, 1000.0 - 12.0);
    }

    #[test]
    fn test_hit_reward_formula() {
        let mut target = Entity::polygon(1, Point::default(), &POLYGON_PROFILES[2]);
        target.body.health = 500.0;
        // 360 * 12 / 1000 * (1.5 - 0.5) / 2
        assert_approx_eq!(hit_reward(&target, 12.0), 2.16);
        target.body.health = -3.0;
        assert_approx_eq!(hit_reward(&target, 12.0), 180.0);

        // Same damage is worth more on a weaker target
        let mut weak = Entity::polygon(1, Point::default(), &POLYGON_PROFILES[1]);
        let mut strong = weak.clone();
        weak.body.health = 50.0;
        strong.body.health = 250.0;
        assert!(hit_reward(&weak, 12.0) > hit_reward(&strong, 12.0));
    }

    #[test]
    fn test_lethal_reward_total_counts_spawned_polygons() {
        let config = ArenaConfig::default();
        let arena = scenario(
            config,
            &[(3, Point::new(2600.0, 2000.0)), (5, Point::new(2400.0, 2000.0))],
        );
        let w = world(&arena);
        assert_approx_eq!(lethal_reward_total(w), (10.0 + 360.0) * REWARD_SHARE);

        // Matches the sum of lethal hit rewards
        let paid: f64 = w
            .polygons
            .iter()
            .map(|p| {
                let mut dead = p.clone();
                dead.body.health = 0.0;
                hit_reward(&dead, 12.0)
            })
            .sum();
        assert_approx_eq!(paid, lethal_reward_total(w));
    }

    #[test]
    fn test_bullet_lifecycle() {
        let mut config = ArenaConfig::default();
        config.bullet_duration = 6;
        config.cool_down = 1000;
        let mut arena = scenario(config, &[]);

        let mut present = 0;
        for _ in 0..20 {
            arena.step(1.0).unwrap();
            if world(&arena).bullets.iter().any(|b| b.id() == FIRST_POLYGON_ID) {
                present += 1;
            }
        }
        assert_eq!(present, 6);
        assert!(world(&arena).bullets.is_empty());
    }

    #[test]
    fn test_bullet_duration_strictly_decreases() {
        let mut config = ArenaConfig::default();
        config.cool_down = 1000;
        let mut arena = scenario(config.clone(), &[]);
        arena.step(0.0).unwrap();
        let mut last = world(&arena).bullets[0].duration().unwrap();
        assert_eq!(last, config.bullet_duration - 1);
        loop {
            arena.step(0.0).unwrap();
            let Some(bullet) = world(&arena).bullets.first() else {
                break;
            };
            let d = bullet.duration().unwrap();
            assert_eq!(d, last - 1);
            last = d;
        }
        // Dropped on the tick after reaching zero
        assert_eq!(last, 0);
    }

    #[test]
    fn test_cooldown_gating() {
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[]);
        let mut fire_ticks = Vec::new();
        for t in 0..100u64 {
            if arena.step(0.5).unwrap().fired {
                fire_ticks.push(t);
            }
        }
        assert_eq!(fire_ticks[0], 0);
        assert!(fire_ticks.len() > 1);
        for pair in fire_ticks.windows(2) {
            assert_eq!(pair[1] - pair[0], config.cool_down as u64 + 1);
        }
    }

    #[test]
    fn test_cooldown_counts_down_without_queueing() {
        let config = ArenaConfig::default();
        let mut arena = scenario(config.clone(), &[]);
        arena.step(0.0).unwrap();
        assert_eq!(world(&arena).hero.cooldown(), Some(config.cool_down));
        arena.step(1.0).unwrap();
        assert_eq!(world(&arena).hero.cooldown(), Some(config.cool_down - 1));
        // The ignored request did not produce a bullet
        assert_eq!(world(&arena).bullets.len(), 1);
    }

    #[test]
    fn test_health_monotonic_and_dead_removed() {
        let mut config = ArenaConfig::default();
        config.cool_down = 2;
        let mut arena = Arena::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..3 {
            arena.reset(&mut rng);
            let aim = arena.generation_angles()[0];
            for _ in 0..300 {
                let before: HashMap<u32, f64> = {
                    let w = world(&arena);
                    w.polygons
                        .iter()
                        .chain(w.bullets.iter())
                        .map(|e| (e.id(), e.body.health))
                        .collect()
                };
                let hero_before = world(&arena).hero.body.health;
                arena.step(aim + rng.gen_range(-0.02..0.02)).unwrap();

                let w = world(&arena);
                assert!(w.hero.body.health <= hero_before);
                for e in w.polygons.iter().chain(w.bullets.iter()) {
                    assert!(e.body.health > 0.0);
                    if let Some(prev) = before.get(&e.id()) {
                        assert!(e.body.health <= *prev);
                    }
                }
            }
        }
    }

    #[test]
    fn test_fixed_horizon_termination() {
        let mut config = ArenaConfig::default();
        config.termination = Termination::FixedHorizon(5);
        let mut arena = scenario(config, &[]);
        for _ in 0..4 {
            assert!(!arena.step(0.0).unwrap().done);
        }
        let outcome = arena.step(0.0).unwrap();
        assert!(outcome.done);
        assert_eq!(outcome.tick, 5);
    }

    #[test]
    fn test_shot_outcome_termination() {
        let mut config = ArenaConfig::default();
        config.termination = Termination::ShotOutcome {
            success_reward: 40.0,
            miss_penalty: -20.0,
        };
        let mut arena = scenario(config, &[(3, Point::new(2560.0, 2000.0))]);
        let first = arena.step(0.0).unwrap();
        assert_eq!(first.reward, -20.0);
        assert!(!first.done);
        let second = arena.step(0.0).unwrap();
        assert_eq!(second.reward, 40.0);
        assert!(second.done);
    }

    #[test]
    fn test_from_world_allocates_fresh_bullet_ids() {
        let config = ArenaConfig::default();
        let mut arena = scenario(
            config,
            &[(3, Point::new(100.0, 100.0)), (4, Point::new(200.0, 100.0))],
        );
        arena.step(0.0).unwrap();
        assert_eq!(world(&arena).bullets[0].id(), FIRST_POLYGON_ID + 2);
    }
}
