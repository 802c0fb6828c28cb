use clap::Parser;
use log::{error, info};
use polyarena::config::{
    self, Config, Encoding, GenerationDirections, ShootControl, Termination,
};
use polyarena::error::ConfigError;
use polyarena::game::{Game, Policy};
use polyarena::{logging, render};
use std::process;

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of episodes to play.
    #[arg(long, default_value_t = 10)]
    episodes: u64,

    /// Random seed (drawn from the OS when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Observation encoding: color, gray or layered.
    #[arg(long, default_value = "gray")]
    encoding: String,

    /// Observation width in pixels.
    #[arg(long, default_value_t = config::OUTPUT_WIDTH)]
    width: usize,

    /// Observation height in pixels.
    #[arg(long, default_value_t = config::OUTPUT_HEIGHT)]
    height: usize,

    /// Ticks per episode, or -1 to end each episode on the first rewarding hit.
    #[arg(long, default_value_t = config::TOTAL_STEPS as i64, allow_negative_numbers = true)]
    total_steps: i64,

    /// Generation direction buckets, or -1 for uniform directions.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    gen_dirs: i64,

    /// Generation directions per episode.
    #[arg(long, default_value_t = config::POLY_DIRS)]
    poly_dirs: usize,

    /// Shoot direction buckets, or -1 for a continuous action in [-1, 1].
    #[arg(long, default_value_t = config::SHOOT_BUCKETS as i64, allow_negative_numbers = true)]
    shoot_disc: i64,

    /// Action source: random, nearest, or a fixed bucket index.
    #[arg(long, default_value = "nearest")]
    policy: String,

    /// Run without a window and print episode summaries.
    #[arg(long)]
    headless: bool,

    /// Debug filter to specify log topics (e.g., "arena,combat")
    /// Available topics: arena, spawn, combat, render, game
    #[arg(long)]
    debug_filter: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Defaults overridden by the command line, validated before use.
fn build_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    config.render.encoding = args.encoding.parse::<Encoding>()?;
    config.render.width = args.width;
    config.render.height = args.height;
    config.arena.termination = Termination::from_total_steps(args.total_steps)?;
    config.arena.generation = GenerationDirections::from_count(args.gen_dirs)?;
    config.arena.directions_per_episode = args.poly_dirs;
    config.arena.shoot_control = ShootControl::from_buckets(args.shoot_disc)?;
    config.validate()?;
    Ok(config)
}

fn main() {
    let args = Args::parse();

    // Setup logger with debug filters if provided
    let log_level = logging::level_from_str(&args.log_level);
    if let Err(e) = logging::init_logger(log_level, args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    info!("Initializing Polygon Arena...");

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let policy = match args.policy.parse::<Policy>() {
        Ok(policy) => policy,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut game = match Game::new(config, seed, policy) {
        Ok(game) => game,
        Err(e) => {
            error!("Failed to create game: {}", e);
            process::exit(1);
        }
    };

    if args.headless {
        match game.run_headless(args.episodes) {
            Ok(summaries) => {
                let total: f64 = summaries.iter().map(|s| s.reward).sum();
                let destroyed: usize = summaries.iter().map(|s| s.destroyed).sum();
                info!(
                    "Played {} episodes: mean reward {:.3}, {} polygons destroyed",
                    summaries.len(),
                    total / summaries.len().max(1) as f64,
                    destroyed
                );
            }
            Err(e) => {
                error!("Simulation failed: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let episodes = args.episodes;
    info!("Initializing macroquad rendering system");
    macroquad::Window::from_config(render::window_conf(), async move {
        let mut viewer = render::Viewer::new();
        if let Err(e) = render::run(&mut game, &mut viewer, episodes).await {
            error!("Viewer loop failed: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["polyarena"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_default_args_build_default_config() {
        let config = build_config(&parse(&[])).unwrap();
        assert_eq!(config.render.encoding, Encoding::Gray);
        assert_eq!(config.arena.generation, GenerationDirections::Continuous);
        assert_eq!(config.arena.shoot_control, ShootControl::Discrete(5));
        assert_eq!(config.arena.termination, Termination::FixedHorizon(2048));
    }

    #[test]
    fn test_overrides() {
        let args = parse(&[
            "--encoding", "layered", "--total-steps", "-1", "--gen-dirs", "12", "--shoot-disc", "-1",
            "--width", "64", "--height", "48",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.render.encoding, Encoding::Layered);
        assert_eq!((config.render.width, config.render.height), (64, 48));
        assert!(matches!(config.arena.termination, Termination::ShotOutcome { .. }));
        assert_eq!(config.arena.generation, GenerationDirections::Discrete(12));
        assert_eq!(config.arena.shoot_control, ShootControl::Continuous);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_eq!(
            build_config(&parse(&["--encoding", "sepia"])),
            Err(ConfigError::UnknownEncoding("sepia".to_string()))
        );
        assert_eq!(
            build_config(&parse(&["--gen-dirs", "0"])),
            Err(ConfigError::ZeroGenerationDirections)
        );
        assert_eq!(
            build_config(&parse(&["--shoot-disc", "0"])),
            Err(ConfigError::ZeroShootBuckets)
        );
        assert!(build_config(&parse(&["--width", "0"])).is_err());
    }
}
