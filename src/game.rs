use crate::arena::{Arena, StepOutcome};
use crate::config::{Config, REWARD_CLIP, REWARD_SCALE, SHOOT_BUCKETS, ShootControl, TOTAL_STEPS, Termination};
use crate::error::{ConfigError, SimError};
use crate::observation::{Observation, encode};
use crate::utils::{bucket_angle, normalize_angle};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

/// Maps a raw agent action onto a shoot direction in radians.
pub fn shoot_direction(control: ShootControl, action: f64) -> f64 {
    match control {
        ShootControl::Continuous => action * PI,
        ShootControl::Discrete(buckets) => action / buckets as f64 * TAU,
    }
}

/// Inverse of [`shoot_direction`]: the action that aims closest to `angle`.
pub fn action_for_angle(control: ShootControl, angle: f64) -> f64 {
    let angle = normalize_angle(angle);
    match control {
        ShootControl::Continuous => {
            let signed = if angle > PI { angle - TAU } else { angle };
            signed / PI
        }
        ShootControl::Discrete(buckets) => {
            let bucket = (angle / TAU * buckets as f64).round() as u32 % buckets;
            bucket as f64
        }
    }
}

/// Reward as seen by a learner: rescaled and clipped.
pub fn scaled_reward(raw: f64) -> f64 {
    (raw / REWARD_SCALE).clamp(-REWARD_CLIP, REWARD_CLIP)
}

/// Built-in action sources for demo and smoke-test episodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Random,
    /// Aims at the closest live polygon.
    Nearest,
    /// Always shoots toward one bucket.
    Fixed(u32),
}

impl FromStr for Policy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Policy::Random),
            "nearest" => Ok(Policy::Nearest),
            other => other
                .parse::<u32>()
                .map(Policy::Fixed)
                .map_err(|_| ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Random => write!(f, "random"),
            Policy::Nearest => write!(f, "nearest"),
            Policy::Fixed(bucket) => write!(f, "fixed({})", bucket),
        }
    }
}

/// Totals for one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u64,
    pub ticks: u64,
    pub reward: f64,
    pub scaled_reward: f64,
    pub shots: u64,
    pub destroyed: usize,
    pub polygons_left: usize,
    /// Cut off by the tick cap rather than by the termination rule
    pub truncated: bool,
}

/// Drives an [`Arena`] with a policy, encoding an observation after every tick.
pub struct Game {
    config: Config,
    arena: Arena,
    rng: StdRng,
    policy: Policy,
    episode: u64,
    episode_reward: f64,
    episode_scaled_reward: f64,
    shots: u64,
    destroyed: usize,
    observation: Option<Observation>,
    last_outcome: Option<StepOutcome>,
}

impl Game {
    pub fn new(config: Config, seed: u64, policy: Policy) -> Result<Self, SimError> {
        config.validate()?;
        let arena = Arena::new(config.arena.clone())?;
        info!(
            "Game created: seed {}, policy {}, {:?} encoding {}x{}",
            seed, policy, config.render.encoding, config.render.width, config.render.height
        );
        Ok(Game {
            config,
            arena,
            rng: StdRng::seed_from_u64(seed),
            policy,
            episode: 0,
            episode_reward: 0.0,
            episode_scaled_reward: 0.0,
            shots: 0,
            destroyed: 0,
            observation: None,
            last_outcome: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// 1-based episode number, 0 before the first reset.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn episode_reward(&self) -> f64 {
        self.episode_reward
    }

    pub fn observation(&self) -> Option<&Observation> {
        self.observation.as_ref()
    }

    pub fn last_outcome(&self) -> Option<&StepOutcome> {
        self.last_outcome.as_ref()
    }

    /// Ticks after which an episode is cut off even if the rule has not ended it.
    pub fn episode_cap(&self) -> u64 {
        match self.config.arena.termination {
            Termination::FixedHorizon(total) => total,
            Termination::ShotOutcome { .. } => TOTAL_STEPS,
        }
    }

    pub fn shoot_direction(&self, action: f64) -> f64 {
        shoot_direction(self.config.arena.shoot_control, action)
    }

    /// Starts a new episode and returns its first observation.
    pub fn reset(&mut self) -> &Observation {
        let world = self.arena.reset(&mut self.rng);
        let observation = encode(world, &self.config.render);
        self.episode += 1;
        self.episode_reward = 0.0;
        self.episode_scaled_reward = 0.0;
        self.shots = 0;
        self.destroyed = 0;
        self.last_outcome = None;
        crate::debug_game!(episode = self.episode, "Episode started");
        self.observation.insert(observation)
    }

    /// Applies one raw action and refreshes the observation.
    pub fn step(&mut self, action: f64) -> Result<StepOutcome, SimError> {
        let direction = self.shoot_direction(action);
        let outcome = self.arena.step(direction)?;
        let world = self.arena.world().ok_or(SimError::NotReset)?;
        self.observation = Some(encode(world, &self.config.render));

        self.episode_reward += outcome.reward;
        self.episode_scaled_reward += scaled_reward(outcome.reward);
        self.shots += u64::from(outcome.fired);
        self.destroyed += outcome.destroyed;
        self.last_outcome = Some(outcome);
        Ok(outcome)
    }

    /// Action chosen by the configured policy for the current world.
    pub fn next_action(&mut self) -> f64 {
        let control = self.config.arena.shoot_control;
        match self.policy {
            Policy::Random => self.random_action(),
            Policy::Fixed(bucket) => match control {
                ShootControl::Discrete(buckets) => (bucket % buckets) as f64,
                ShootControl::Continuous => {
                    action_for_angle(control, bucket_angle(bucket % SHOOT_BUCKETS, SHOOT_BUCKETS))
                }
            },
            Policy::Nearest => {
                let target = self.arena.world().and_then(|world| {
                    let hero = world.hero.position();
                    world
                        .polygons
                        .iter()
                        .min_by(|a, b| {
                            let da = a.position().distance_sq(&hero);
                            let db = b.position().distance_sq(&hero);
                            da.total_cmp(&db)
                        })
                        .map(|p| {
                            let to = p.position();
                            (to.y - hero.y).atan2(to.x - hero.x)
                        })
                });
                match target {
                    Some(angle) => action_for_angle(control, angle),
                    None => self.random_action(),
                }
            }
        }
    }

    fn random_action(&mut self) -> f64 {
        match self.config.arena.shoot_control {
            ShootControl::Continuous => self.rng.gen_range(-1.0..=1.0),
            ShootControl::Discrete(buckets) => self.rng.gen_range(0..buckets) as f64,
        }
    }

    /// Runs one policy tick, resetting first if needed. Returns a summary when
    /// the tick finished an episode; the next episode is started right away.
    pub fn update(&mut self) -> Result<Option<EpisodeSummary>, SimError> {
        if self.observation.is_none() {
            self.reset();
        }
        let action = self.next_action();
        let outcome = self.step(action)?;
        let truncated = !outcome.done && outcome.tick >= self.episode_cap();
        if !outcome.done && !truncated {
            return Ok(None);
        }

        let summary = EpisodeSummary {
            episode: self.episode,
            ticks: outcome.tick,
            reward: self.episode_reward,
            scaled_reward: self.episode_scaled_reward,
            shots: self.shots,
            destroyed: self.destroyed,
            polygons_left: self.arena.world().map_or(0, |w| w.polygons.len()),
            truncated,
        };
        info!(
            "Episode {} finished after {} ticks{}: reward {:.3} (scaled {:.3}), {} shots, {} destroyed, {} left",
            summary.episode,
            summary.ticks,
            if truncated { " (truncated)" } else { "" },
            summary.reward,
            summary.scaled_reward,
            summary.shots,
            summary.destroyed,
            summary.polygons_left
        );
        self.reset();
        Ok(Some(summary))
    }

    /// Plays `episodes` complete episodes without a window.
    pub fn run_headless(&mut self, episodes: u64) -> Result<Vec<EpisodeSummary>, SimError> {
        let mut summaries = Vec::with_capacity(episodes as usize);
        while (summaries.len() as u64) < episodes {
            if let Some(summary) = self.update()? {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }
}
