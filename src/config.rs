use crate::error::ConfigError;
use std::str::FromStr;

// World bounds (fixed, in world units)
pub const WORLD_WIDTH: f64 = 5000.0;
pub const WORLD_HEIGHT: f64 = 4000.0;

// Observation grid
pub const OUTPUT_WIDTH: usize = 80;
pub const OUTPUT_HEIGHT: usize = 80;
pub const WORLD_SCALE: f64 = 1600.0; // World units spanned by the output width
pub const BG_COLOR: u8 = 0;
pub const BOUNDARY_COLOR: u8 = 0;

// Episode
pub const TOTAL_STEPS: u64 = 2048;
pub const SUCCESS_REWARD: f64 = 40.0; // Shot-outcome mode: any hit ends the episode
pub const MISS_PENALTY: f64 = -20.0; // Shot-outcome mode: every non-rewarding tick
pub const REWARD_SCALE: f64 = 40.0; // Consumer-side rescale divisor
pub const REWARD_SHARE: f64 = 0.5; // Tunable: share of a hit's value credited to the shooter
pub const FINISHING_BONUS: f64 = 1.5; // Partial hits are weighted by (bonus - remaining health fraction)
pub const REWARD_CLIP: f64 = 10.0;

// Controls
pub const SHOOT_BUCKETS: u32 = 5;

// Hero
pub const HERO_ID: u32 = 1;
pub const HERO_RADIUS: f64 = 30.0;
pub const HERO_HEALTH: f64 = 1000.0;
pub const HERO_BODY_DAMAGE: f64 = 40.0;
pub const HERO_REWARD: f64 = 360.0;
pub const COOL_DOWN: u32 = 15; // Ticks between shots

// Bullets
pub const BULLET_SPEED: f64 = 30.0; // World units per tick
pub const BULLET_DURATION: u32 = 120; // Ticks
pub const BULLET_HEALTH: f64 = 40.0;
pub const BULLET_RADIUS: f64 = 10.0;
pub const BULLET_DAMAGE: f64 = 12.0;

// Procedural generation
pub const POLY_DIRS: usize = 1; // Directions used per episode
pub const POLY_GEN_NUM: usize = 15; // Polygons per direction
pub const POLY_SHOOTABLE_NUM: usize = 7; // Of which inside the shootable arc
pub const POLY_GEN_RANGE: f64 = 5.0; // Wide jitter: +/- 2pi / range / 2
pub const SHOOTABLE_RANGE: f64 = 120.0; // Tight jitter: +/- 2pi / range / 2
pub const SPAWN_MIN_DISTANCE: f64 = 100.0;
pub const SPAWN_MAX_DISTANCE: f64 = 800.0;
pub const HERO_SPAWN_MARGIN: f64 = 300.0;
pub const FIRST_POLYGON_ID: u32 = 100;

// Viewer window
pub const WINDOW_WIDTH: i32 = 1000;
pub const WINDOW_HEIGHT: i32 = 800;
pub const UI_PANEL_WIDTH: i32 = 200; // Width of the side panel
pub const VIEW_WIDTH: i32 = WINDOW_WIDTH - UI_PANEL_WIDTH; // Area the observation is scaled into
pub const TICKS_PER_SECOND: u32 = 30; // Viewer playback speed

/// Radius, damage, reward and health selected by a polygon's edge count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonProfile {
    pub edges: u8,
    pub radius: f64,
    pub body_damage: f64,
    pub reward: f64,
    pub health: f64,
}

pub const POLYGON_PROFILES: [PolygonProfile; 3] = [
    PolygonProfile {
        edges: 3,
        radius: 20.0,
        body_damage: 10.0,
        reward: 10.0,
        health: 100.0,
    },
    PolygonProfile {
        edges: 4,
        radius: 20.0,
        body_damage: 20.0,
        reward: 60.0,
        health: 300.0,
    },
    PolygonProfile {
        edges: 5,
        radius: 25.0,
        body_damage: 40.0,
        reward: 360.0,
        health: 1000.0,
    },
];

/// Observation channel semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Color,
    Gray,
    Layered,
}

impl Encoding {
    pub fn channels(&self) -> usize {
        match self {
            Encoding::Gray => 1,
            Encoding::Color | Encoding::Layered => 3,
        }
    }
}

impl FromStr for Encoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "color" | "colour" | "rgb" => Ok(Encoding::Color),
            "gray" | "grey" => Ok(Encoding::Gray),
            "layered" | "layer" => Ok(Encoding::Layered),
            other => Err(ConfigError::UnknownEncoding(other.to_string())),
        }
    }
}

/// How polygon generation directions are chosen on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationDirections {
    /// Uniform in [0, 2pi).
    Continuous,
    /// The circle is split into this many buckets; the first direction walks a coprime stride.
    Discrete(u32),
}

impl GenerationDirections {
    /// Maps the command-line count (`-1` for uniform) onto the enum.
    pub fn from_count(count: i64) -> Result<Self, ConfigError> {
        match count {
            -1 => Ok(GenerationDirections::Continuous),
            n if n > 0 && n <= u32::MAX as i64 => Ok(GenerationDirections::Discrete(n as u32)),
            _ => Err(ConfigError::ZeroGenerationDirections),
        }
    }
}

/// Episode termination rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Termination {
    /// Episode ends once the tick counter reaches the total.
    FixedHorizon(u64),
    /// Any positive reward ends the episode with `success_reward`; other ticks return `miss_penalty`.
    ShotOutcome {
        success_reward: f64,
        miss_penalty: f64,
    },
}

impl Termination {
    /// Maps the command-line length (`-1` to end on the first hit) onto the enum.
    pub fn from_total_steps(total_steps: i64) -> Result<Self, ConfigError> {
        match total_steps {
            -1 => Ok(Termination::ShotOutcome {
                success_reward: SUCCESS_REWARD,
                miss_penalty: MISS_PENALTY,
            }),
            n if n > 0 => Ok(Termination::FixedHorizon(n as u64)),
            _ => Err(ConfigError::ZeroEpisodeLength),
        }
    }
}

/// How a raw agent action maps onto a shoot direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootControl {
    /// Action in [-1, 1], scaled by pi.
    Continuous,
    /// Action is a bucket index out of this many equal directions.
    Discrete(u32),
}

impl ShootControl {
    pub fn from_buckets(buckets: i64) -> Result<Self, ConfigError> {
        match buckets {
            -1 => Ok(ShootControl::Continuous),
            n if n > 0 && n <= u32::MAX as i64 => Ok(ShootControl::Discrete(n as u32)),
            _ => Err(ConfigError::ZeroShootBuckets),
        }
    }
}

/// Simulator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaConfig {
    pub hero_radius: f64,
    pub hero_health: f64,
    pub hero_body_damage: f64,
    pub hero_reward: f64,
    pub cool_down: u32,
    pub bullet_speed: f64,
    pub bullet_duration: u32,
    pub bullet_health: f64,
    pub bullet_radius: f64,
    pub bullet_damage: f64,
    pub polygon_profiles: Vec<PolygonProfile>,
    pub generation: GenerationDirections,
    pub directions_per_episode: usize,
    pub polygons_per_direction: usize,
    pub shootable_per_direction: usize,
    pub wide_jitter_divider: f64,
    pub shootable_jitter_divider: f64,
    pub spawn_min_distance: f64,
    pub spawn_max_distance: f64,
    pub hero_spawn_margin: f64,
    pub termination: Termination,
    pub shoot_control: ShootControl,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            hero_radius: HERO_RADIUS,
            hero_health: HERO_HEALTH,
            hero_body_damage: HERO_BODY_DAMAGE,
            hero_reward: HERO_REWARD,
            cool_down: COOL_DOWN,
            bullet_speed: BULLET_SPEED,
            bullet_duration: BULLET_DURATION,
            bullet_health: BULLET_HEALTH,
            bullet_radius: BULLET_RADIUS,
            bullet_damage: BULLET_DAMAGE,
            polygon_profiles: POLYGON_PROFILES.to_vec(),
            generation: GenerationDirections::Continuous,
            directions_per_episode: POLY_DIRS,
            polygons_per_direction: POLY_GEN_NUM,
            shootable_per_direction: POLY_SHOOTABLE_NUM,
            wide_jitter_divider: POLY_GEN_RANGE,
            shootable_jitter_divider: SHOOTABLE_RANGE,
            spawn_min_distance: SPAWN_MIN_DISTANCE,
            spawn_max_distance: SPAWN_MAX_DISTANCE,
            hero_spawn_margin: HERO_SPAWN_MARGIN,
            termination: Termination::FixedHorizon(TOTAL_STEPS),
            shoot_control: ShootControl::Discrete(SHOOT_BUCKETS),
        }
    }
}

impl ArenaConfig {
    /// Profile for an edge count, if configured.
    pub fn profile(&self, edges: u8) -> Option<&PolygonProfile> {
        self.polygon_profiles.iter().find(|p| p.edges == edges)
    }

    pub fn largest_polygon_radius(&self) -> f64 {
        self.polygon_profiles
            .iter()
            .map(|p| p.radius)
            .fold(0.0, f64::max)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let constants = [
            ("hero_radius", self.hero_radius),
            ("hero_health", self.hero_health),
            ("bullet_speed", self.bullet_speed),
            ("bullet_health", self.bullet_health),
            ("bullet_radius", self.bullet_radius),
            ("bullet_damage", self.bullet_damage),
        ];
        for (name, value) in constants {
            if !(value > 0.0) {
                return Err(ConfigError::NonPositiveConstant(name));
            }
        }
        if self.bullet_duration == 0 {
            return Err(ConfigError::NonPositiveConstant("bullet_duration"));
        }

        let mut seen = Vec::with_capacity(self.polygon_profiles.len());
        for profile in &self.polygon_profiles {
            if !(3..=5).contains(&profile.edges) {
                return Err(ConfigError::InvalidEdgeCount(profile.edges));
            }
            if seen.contains(&profile.edges) {
                return Err(ConfigError::DuplicateEdgeProfile(profile.edges));
            }
            seen.push(profile.edges);
            let fields = [
                ("radius", profile.radius),
                ("body_damage", profile.body_damage),
                ("reward", profile.reward),
                ("health", profile.health),
            ];
            for (field, value) in fields {
                if !(value > 0.0) {
                    return Err(ConfigError::NonPositiveProfileValue {
                        edges: profile.edges,
                        field,
                    });
                }
            }
        }
        for edges in 3..=5 {
            if !seen.contains(&edges) {
                return Err(ConfigError::MissingEdgeProfile(edges));
            }
        }

        if let GenerationDirections::Discrete(0) = self.generation {
            return Err(ConfigError::ZeroGenerationDirections);
        }
        if self.directions_per_episode == 0 {
            return Err(ConfigError::ZeroDirectionsPerEpisode);
        }
        for divider in [self.wide_jitter_divider, self.shootable_jitter_divider] {
            if !(divider > 0.0) {
                return Err(ConfigError::InvalidJitterDivider(divider));
            }
        }
        if !(self.spawn_min_distance >= 0.0 && self.spawn_min_distance < self.spawn_max_distance) {
            return Err(ConfigError::EmptyDistanceBand {
                min: self.spawn_min_distance,
                max: self.spawn_max_distance,
            });
        }

        let radius = self.largest_polygon_radius();
        if self.hero_spawn_margin < radius {
            return Err(ConfigError::MarginTooSmall {
                margin: self.hero_spawn_margin,
                radius,
            });
        }
        if 2.0 * self.hero_spawn_margin >= WORLD_WIDTH.min(WORLD_HEIGHT) {
            return Err(ConfigError::MarginTooLarge(self.hero_spawn_margin));
        }

        if let Termination::FixedHorizon(0) = self.termination {
            return Err(ConfigError::ZeroEpisodeLength);
        }
        if let ShootControl::Discrete(0) = self.shoot_control {
            return Err(ConfigError::ZeroShootBuckets);
        }
        Ok(())
    }
}

/// Renderer settings. Independent of [`ArenaConfig`] so the renderer can be
/// driven by world states that did not come from the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    pub world_scale: f64,
    pub encoding: Encoding,
    pub bg_color: u8,
    pub boundary_color: u8,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: OUTPUT_WIDTH,
            height: OUTPUT_HEIGHT,
            world_scale: WORLD_SCALE,
            encoding: Encoding::Gray,
            bg_color: BG_COLOR,
            boundary_color: BOUNDARY_COLOR,
        }
    }
}

impl RenderConfig {
    /// World units per output pixel.
    pub fn quantize(&self) -> f64 {
        self.world_scale / self.width as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyOutput {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.world_scale > 0.0) {
            return Err(ConfigError::InvalidWorldScale(self.world_scale));
        }
        Ok(())
    }
}

/// The full configuration bundle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub arena: ArenaConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arena.validate()?;
        self.render.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_approx_eq!(config.render.quantize(), 20.0);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("color".parse::<Encoding>(), Ok(Encoding::Color));
        assert_eq!("RGB".parse::<Encoding>(), Ok(Encoding::Color));
        assert_eq!("gray".parse::<Encoding>(), Ok(Encoding::Gray));
        assert_eq!(" layer ".parse::<Encoding>(), Ok(Encoding::Layered));
        assert_eq!(
            "depth".parse::<Encoding>(),
            Err(ConfigError::UnknownEncoding("depth".to_string()))
        );
    }

    #[test]
    fn test_encoding_channels() {
        assert_eq!(Encoding::Gray.channels(), 1);
        assert_eq!(Encoding::Color.channels(), 3);
        assert_eq!(Encoding::Layered.channels(), 3);
    }

    #[test]
    fn test_zero_generation_directions_rejected() {
        let mut config = ArenaConfig::default();
        config.generation = GenerationDirections::Discrete(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroGenerationDirections));
        assert_eq!(
            GenerationDirections::from_count(0),
            Err(ConfigError::ZeroGenerationDirections)
        );
        assert_eq!(
            GenerationDirections::from_count(-1),
            Ok(GenerationDirections::Continuous)
        );
        assert_eq!(
            GenerationDirections::from_count(16),
            Ok(GenerationDirections::Discrete(16))
        );
    }

    #[test]
    fn test_edge_count_outside_range_rejected() {
        let mut config = ArenaConfig::default();
        config.polygon_profiles[0].edges = 6;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEdgeCount(6)));
    }

    #[test]
    fn test_missing_and_duplicate_profiles_rejected() {
        let mut config = ArenaConfig::default();
        config.polygon_profiles.pop();
        assert_eq!(config.validate(), Err(ConfigError::MissingEdgeProfile(5)));

        let mut config = ArenaConfig::default();
        config.polygon_profiles[1].edges = 3;
        assert_eq!(config.validate(), Err(ConfigError::DuplicateEdgeProfile(3)));
    }

    #[test]
    fn test_zero_profile_value_rejected() {
        let mut config = ArenaConfig::default();
        config.polygon_profiles[2].health = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveProfileValue {
                edges: 5,
                field: "health"
            })
        );
    }

    #[test]
    fn test_margin_checks() {
        let mut config = ArenaConfig::default();
        config.hero_spawn_margin = 10.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MarginTooSmall { .. })
        ));
        config.hero_spawn_margin = 2500.0;
        assert_eq!(config.validate(), Err(ConfigError::MarginTooLarge(2500.0)));
    }

    #[test]
    fn test_termination_from_total_steps() {
        assert_eq!(
            Termination::from_total_steps(100),
            Ok(Termination::FixedHorizon(100))
        );
        assert!(matches!(
            Termination::from_total_steps(-1),
            Ok(Termination::ShotOutcome { .. })
        ));
        assert_eq!(
            Termination::from_total_steps(0),
            Err(ConfigError::ZeroEpisodeLength)
        );
    }

    #[test]
    fn test_render_config_validation() {
        let mut render = RenderConfig::default();
        render.width = 0;
        assert!(matches!(
            render.validate(),
            Err(ConfigError::EmptyOutput { .. })
        ));
        let mut render = RenderConfig::default();
        render.world_scale = -1.0;
        assert_eq!(render.validate(), Err(ConfigError::InvalidWorldScale(-1.0)));
    }

    #[test]
    fn test_profile_lookup() {
        let config = ArenaConfig::default();
        assert_eq!(config.profile(5).map(|p| p.health), Some(1000.0));
        assert!(config.profile(7).is_none());
        assert_approx_eq!(config.largest_polygon_radius(), 25.0);
    }
}
