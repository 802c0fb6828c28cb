//! Observation renderer. Storage is row-major with channels innermost.

use crate::config::{Encoding, RenderConfig, WORLD_HEIGHT, WORLD_WIDTH};
use crate::entity::{Entity, Role, WorldState};
use crate::types::Point;
use crate::utils::lerp;

// Layered encoding rescale constants (value / scale, then clamped to [-1, 1])
pub const DAMAGE_SCALE: f64 = 60.0;
pub const HEALTH_SCALE: f64 = 3000.0;
pub const REWARD_SCALE: f64 = 1000.0;

const CHANNEL_DAMAGE: usize = 0;
const CHANNEL_HEALTH: usize = 1;
const CHANNEL_REWARD: usize = 2;

// Fractional pixel radii that would flicker under plain rounding
const RADIUS_SNAP: [(f64, i64); 4] = [(0.5, 0), (1.0, 1), (1.25, 2), (1.5, 2)];

/// Start colour at full health, end colour at zero health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub start: [u8; 3],
    pub end: [u8; 3],
}

impl ColorRange {
    const fn new(start: [u8; 3], end: [u8; 3]) -> Self {
        ColorRange { start, end }
    }

    const fn gray(start: u8, end: u8) -> Self {
        ColorRange {
            start: [start; 3],
            end: [end; 3],
        }
    }

    /// Colour for a health ratio in [0, 1].
    pub fn at(&self, ratio: f64) -> [u8; 3] {
        let mut color = [0u8; 3];
        for (c, (start, end)) in color.iter_mut().zip(self.start.iter().zip(self.end.iter())) {
            *c = lerp(*end as f64, *start as f64, ratio) as u8;
        }
        color
    }
}

/// Role colours for one visual encoding.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub own: ColorRange,            // Hero and own bullets
    pub polygons: [ColorRange; 3], // Indexed by edge count - 3
    pub other: ColorRange,          // Enemy heroes and enemy bullets
}

pub const COLOR_PALETTE: Palette = Palette {
    own: ColorRange::new([16, 79, 15], [119, 226, 118]),
    polygons: [
        ColorRange::new([33, 47, 104], [96, 115, 196]),
        ColorRange::new([33, 23, 84], [112, 98, 188]),
        ColorRange::new([23, 63, 89], [89, 148, 186]),
    ],
    other: ColorRange::new([114, 11, 11], [239, 103, 103]),
};

pub const GRAY_PALETTE: Palette = Palette {
    own: ColorRange::gray(255, 50),
    polygons: [
        ColorRange::gray(130, 0),
        ColorRange::gray(80, 0),
        ColorRange::gray(200, 0),
    ],
    other: ColorRange::gray(180, 0),
};

impl Palette {
    fn range(&self, entity: &Entity, side: Side) -> ColorRange {
        match side {
            Side::Own => self.own,
            Side::Enemy => self.other,
            Side::Polygon => {
                let edges = entity.edges().unwrap_or(3).clamp(3, 5);
                self.polygons[(edges - 3) as usize]
            }
        }
    }
}

/// Which side of the viewpoint an entity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Own,
    Polygon,
    Enemy,
}

/// Rendered observation: float tensor plus an 8-bit RGB display image.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub tensor: Vec<f32>,
    pub image: Vec<u8>,
}

impl Observation {
    /// `(width, height, channels)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.channels)
    }

    pub fn value(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.tensor[(y * self.width + x) * self.channels + channel]
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.image[i], self.image[i + 1], self.image[i + 2]]
    }

    /// Display image with an opaque alpha channel appended.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width * self.height * 4);
        for px in self.image.chunks_exact(3) {
            rgba.extend_from_slice(px);
            rgba.push(255);
        }
        rgba
    }
}

/// World to pixel mapping centred on a viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    quantize: f64,
    half_width: f64,
    half_height: f64,
    viewpoint: Point,
}

impl ScreenTransform {
    pub fn new(viewpoint: Point, config: &RenderConfig) -> Self {
        ScreenTransform {
            quantize: config.quantize(),
            half_width: config.width as f64 / 2.0,
            half_height: config.height as f64 / 2.0,
            viewpoint,
        }
    }

    /// Pixel holding a world position (may lie outside the grid).
    pub fn to_screen(&self, p: Point) -> (i64, i64) {
        let q = self.quantize;
        let x = p.x / q + self.half_width - self.viewpoint.x / q;
        let y = p.y / q + self.half_height - self.viewpoint.y / q;
        (x.round_ties_even() as i64, y.round_ties_even() as i64)
    }

    /// World position under a pixel centre.
    pub fn to_world(&self, px: usize, py: usize) -> Point {
        Point {
            x: (px as f64 - self.half_width) * self.quantize + self.viewpoint.x,
            y: (py as f64 - self.half_height) * self.quantize + self.viewpoint.y,
        }
    }

    pub fn in_world(&self, px: usize, py: usize) -> bool {
        let p = self.to_world(px, py);
        (0.0..WORLD_WIDTH).contains(&p.x) && (0.0..WORLD_HEIGHT).contains(&p.y)
    }

    pub fn pixel_radius(&self, radius: f64) -> i64 {
        pixel_radius(radius, self.quantize)
    }
}

/// Draw radius in pixels: snapped for the common fractional cases, rounded up otherwise.
pub fn pixel_radius(radius: f64, quantize: f64) -> i64 {
    let r = radius / quantize;
    RADIUS_SNAP
        .iter()
        .find(|(key, _)| (r - key).abs() < 1e-9)
        .map(|&(_, snapped)| snapped)
        .unwrap_or_else(|| r.ceil() as i64)
}

/// Contiguous pixel buffer with bounds-checked disc stamping.
#[derive(Debug, Clone)]
struct Canvas<T> {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Copy> Canvas<T> {
    fn filled(width: usize, height: usize, channels: usize, value: T) -> Self {
        Canvas {
            width,
            height,
            channels,
            data: vec![value; width * height * channels],
        }
    }

    fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [T] {
        let i = (y * self.width + x) * self.channels;
        &mut self.data[i..i + self.channels]
    }

    /// Paints every pixel whose centre lies within `radius` of `(cx, cy)`, clipped to the grid.
    fn stamp(&mut self, (cx, cy): (i64, i64), radius: i64, mut paint: impl FnMut(&mut [T])) {
        let lx = (cx - radius).max(0);
        let rx = (cx + radius + 1).min(self.width as i64);
        let ly = (cy - radius).max(0);
        let ry = (cy + radius + 1).min(self.height as i64);
        for y in ly..ry {
            for x in lx..rx {
                if (x - cx).pow(2) + (y - cy).pow(2) <= radius * radius {
                    paint(self.pixel_mut(x as usize, y as usize));
                }
            }
        }
    }

    /// Paints every pixel whose world position is outside the arena.
    fn mask_outside(&mut self, transform: &ScreenTransform, value: T) {
        for y in 0..self.height {
            for x in 0..self.width {
                if !transform.in_world(x, y) {
                    self.pixel_mut(x, y).fill(value);
                }
            }
        }
    }
}

/// Entities in draw order: polygons, enemy bullets, enemy heroes, own bullets, hero.
fn draw_order(world: &WorldState) -> Vec<(&Entity, Side)> {
    let mut order = Vec::with_capacity(world.entity_count());
    order.extend(world.polygons.iter().map(|p| (p, Side::Polygon)));
    order.extend(world.enemy_bullets().map(|b| (b, Side::Enemy)));
    order.extend(world.enemy_heroes.iter().map(|h| (h, Side::Enemy)));
    order.extend(world.own_bullets().map(|b| (b, Side::Own)));
    order.push((&world.hero, Side::Own));
    order
}

/// Renders `world` centred on its hero.
pub fn encode(world: &WorldState, config: &RenderConfig) -> Observation {
    encode_at(world, world.hero.position(), config)
}

/// Renders `world` centred on an arbitrary viewpoint.
pub fn encode_at(world: &WorldState, viewpoint: Point, config: &RenderConfig) -> Observation {
    let transform = ScreenTransform::new(viewpoint, config);
    let entities = draw_order(world);
    crate::debug_render!(
        "Encoding {} entities as {:?} around ({:.0}, {:.0})",
        entities.len(),
        config.encoding,
        viewpoint.x,
        viewpoint.y
    );

    match config.encoding {
        Encoding::Color => {
            let image = rasterize_palette(&entities, &transform, config, &COLOR_PALETTE);
            let tensor = image.data.iter().map(|&v| v as f32 / 255.0).collect();
            Observation {
                width: config.width,
                height: config.height,
                channels: 3,
                tensor,
                image: image.data,
            }
        }
        Encoding::Gray => {
            let image = rasterize_palette(&entities, &transform, config, &GRAY_PALETTE);
            let tensor = image
                .data
                .chunks_exact(3)
                .map(|px| px[2] as f32 / 255.0)
                .collect();
            Observation {
                width: config.width,
                height: config.height,
                channels: 1,
                tensor,
                image: image.data,
            }
        }
        Encoding::Layered => {
            let layers = rasterize_layers(&entities, &transform, config);
            let image = layers
                .data
                .iter()
                .map(|&v| ((v.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8)
                .collect();
            Observation {
                width: config.width,
                height: config.height,
                channels: 3,
                tensor: layers.data,
                image,
            }
        }
    }
}

fn rasterize_palette(
    entities: &[(&Entity, Side)],
    transform: &ScreenTransform,
    config: &RenderConfig,
    palette: &Palette,
) -> Canvas<u8> {
    let mut canvas = Canvas::filled(config.width, config.height, 3, config.bg_color);
    for &(entity, side) in entities {
        let color = palette.range(entity, side).at(entity.health_ratio());
        canvas.stamp(
            transform.to_screen(entity.position()),
            transform.pixel_radius(entity.body.radius),
            |px| px.copy_from_slice(&color),
        );
    }
    canvas.mask_outside(transform, config.boundary_color);
    canvas
}

fn rescaled(value: f64, scale: f64) -> f32 {
    (value / scale).clamp(-1.0, 1.0) as f32
}

fn rasterize_layers(
    entities: &[(&Entity, Side)],
    transform: &ScreenTransform,
    config: &RenderConfig,
) -> Canvas<f32> {
    let mut canvas = Canvas::filled(config.width, config.height, 3, 0.0f32);

    for channel in [CHANNEL_DAMAGE, CHANNEL_HEALTH, CHANNEL_REWARD] {
        for &(entity, side) in entities {
            let body = &entity.body;
            let value = match channel {
                CHANNEL_DAMAGE => match side {
                    Side::Own => rescaled(body.body_damage, DAMAGE_SCALE),
                    Side::Polygon | Side::Enemy => rescaled(-body.body_damage, DAMAGE_SCALE),
                },
                CHANNEL_HEALTH => rescaled(body.health, HEALTH_SCALE),
                _ => match (side, &entity.role) {
                    (_, Role::Bullet { .. }) => continue,
                    // Self-marker: the hero's own value, negated
                    (Side::Own, _) => rescaled(-body.rewarding_experience, REWARD_SCALE),
                    _ => rescaled(body.rewarding_experience, REWARD_SCALE),
                },
            };
            canvas.stamp(
                transform.to_screen(entity.position()),
                transform.pixel_radius(body.radius),
                |px| px[channel] = value,
            );
        }
    }

    canvas.mask_outside(transform, config.boundary_color as f32 / 255.0);
    canvas
}
