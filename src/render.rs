use crate::config::{TICKS_PER_SECOND, UI_PANEL_WIDTH, VIEW_WIDTH, WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::error::SimError;
use crate::game::{EpisodeSummary, Game};
use crate::observation::Observation;
use log::info;
use macroquad::prelude::*;

/// Window settings for the viewer.
pub fn window_conf() -> Conf {
    Conf {
        window_title: "Polygon Arena".to_owned(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        window_resizable: false,
        ..Default::default()
    }
}

/// Shows the latest observation scaled up, with a side panel of episode stats.
pub struct Viewer {
    texture: Option<Texture2D>,
    texture_size: (usize, usize),
    paused: bool,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewer {
    pub fn new() -> Self {
        Viewer {
            texture: None,
            texture_size: (0, 0),
            paused: false,
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        info!("Viewer {}", if self.paused { "paused" } else { "resumed" });
    }

    pub fn draw_frame(&mut self, game: &Game, last_summary: Option<&EpisodeSummary>) {
        clear_background(Color::from_rgba(10, 10, 20, 255));
        if let Some(observation) = game.observation() {
            self.draw_observation(observation);
        }
        self.draw_ui_panel(game, last_summary);
    }

    /// Uploads the display image, reusing the texture while the size is unchanged.
    fn upload(&mut self, observation: &Observation) -> &Texture2D {
        let rgba = observation.to_rgba();
        let size = (observation.width, observation.height);
        match self.texture.take() {
            Some(texture) if self.texture_size == size => {
                texture.update_from_bytes(size.0 as u32, size.1 as u32, &rgba);
                self.texture.insert(texture)
            }
            _ => {
                let texture = Texture2D::from_rgba8(size.0 as u16, size.1 as u16, &rgba);
                texture.set_filter(FilterMode::Nearest);
                self.texture_size = size;
                self.texture.insert(texture)
            }
        }
    }

    fn draw_observation(&mut self, observation: &Observation) {
        let (width, height) = (observation.width as f32, observation.height as f32);
        let scale = (VIEW_WIDTH as f32 / width).min(WINDOW_HEIGHT as f32 / height);
        let dest = vec2(width * scale, height * scale);
        let x = (VIEW_WIDTH as f32 - dest.x) / 2.0;
        let y = (WINDOW_HEIGHT as f32 - dest.y) / 2.0;

        let texture = self.upload(observation);
        draw_texture_ex(
            texture,
            x,
            y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(dest),
                ..Default::default()
            },
        );
        draw_rectangle_lines(x, y, dest.x, dest.y, 2.0, Color::from_rgba(60, 60, 110, 255));
    }

    fn draw_ui_panel(&self, game: &Game, last_summary: Option<&EpisodeSummary>) {
        let panel_x = VIEW_WIDTH as f32;
        let panel_width = UI_PANEL_WIDTH as f32;
        let padding = 12.0;
        let line_height = 20.0;
        let font_size = 18.0;

        draw_rectangle(panel_x, 0.0, panel_width, WINDOW_HEIGHT as f32, Color::from_rgba(20, 20, 50, 255));
        draw_text("POLYGON ARENA", panel_x + padding, 28.0, 22.0, GOLD);

        let arena = game.arena();
        let world = arena.world();
        let outcome = game.last_outcome();
        let config = game.config();

        let mut lines = vec![
            format!("Episode   {}", game.episode()),
            format!("Tick      {}", arena.tick()),
            format!("Reward    {:.3}", game.episode_reward()),
            format!("Last      {:.3}", outcome.map_or(0.0, |o| o.reward)),
            format!("Polygons  {}", world.map_or(0, |w| w.polygons.len())),
            format!("Bullets   {}", world.map_or(0, |w| w.bullets.len())),
            format!(
                "Cooldown  {}",
                world.and_then(|w| w.hero.cooldown()).unwrap_or(0)
            ),
            String::new(),
            format!("Policy    {}", game.policy()),
            format!("Encoding  {:?}", config.render.encoding),
            format!("Output    {}x{}", config.render.width, config.render.height),
        ];
        if let Some(summary) = last_summary {
            lines.push(String::new());
            lines.push(format!("Episode {} done", summary.episode));
            lines.push(format!("  ticks     {}", summary.ticks));
            lines.push(format!("  reward    {:.3}", summary.reward));
            lines.push(format!("  destroyed {}", summary.destroyed));
        }

        let mut y = 64.0;
        for line in &lines {
            draw_text(line, panel_x + padding, y, font_size, WHITE);
            y += line_height;
        }

        let hint = if self.paused {
            "PAUSED  [space] resume"
        } else {
            "[space] pause  [esc] quit"
        };
        draw_text(hint, panel_x + padding, WINDOW_HEIGHT as f32 - padding, 14.0, LIGHTGRAY);
    }

    pub fn window_should_close() -> bool {
        is_key_down(KeyCode::Escape) || is_quit_requested()
    }
}

/// Plays `episodes` episodes at a fixed tick rate, drawing every frame.
pub async fn run(game: &mut Game, viewer: &mut Viewer, episodes: u64) -> Result<(), SimError> {
    info!("Starting viewer loop...");
    let tick_duration = 1.0 / TICKS_PER_SECOND as f32;
    let mut time_accumulator = 0.0;
    let mut finished = 0;
    let mut last_summary: Option<EpisodeSummary> = None;

    game.reset();
    while !Viewer::window_should_close() && finished < episodes {
        if is_key_pressed(KeyCode::Space) {
            viewer.toggle_pause();
        }

        if !viewer.paused() {
            time_accumulator += get_frame_time();
            while time_accumulator >= tick_duration && finished < episodes {
                time_accumulator -= tick_duration;
                if let Some(summary) = game.update()? {
                    finished += 1;
                    last_summary = Some(summary);
                }
            }
        }

        viewer.draw_frame(game, last_summary.as_ref());
        next_frame().await;
    }
    info!("Exiting viewer after {} episodes.", finished);
    Ok(())
}
