use crate::config::{ArenaConfig, HERO_ID, PolygonProfile};
use crate::types::{Point, Vector};

/// Fields common to every entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub id: u32,
    pub owner_id: u32, // For bullets: the entity that fired it
    pub position: Point,
    pub radius: f64,
    pub health: f64,
    pub max_health: f64,
    pub body_damage: f64,
    pub rewarding_experience: f64,
}

/// Role tag with its role-specific payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Hero { cooldown: u32 },
    Polygon { edges: u8 },
    Bullet { duration: u32, velocity: Vector },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub body: Body,
    pub role: Role,
}

impl Entity {
    /// A hero at full health with no cooldown.
    pub fn hero(id: u32, position: Point, config: &ArenaConfig) -> Self {
        Entity {
            body: Body {
                id,
                owner_id: id,
                position,
                radius: config.hero_radius,
                health: config.hero_health,
                max_health: config.hero_health,
                body_damage: config.hero_body_damage,
                rewarding_experience: config.hero_reward,
            },
            role: Role::Hero { cooldown: 0 },
        }
    }

    /// A full-health polygon whose stats come from its edge-count profile.
    pub fn polygon(id: u32, position: Point, profile: &PolygonProfile) -> Self {
        Entity {
            body: Body {
                id,
                owner_id: id,
                position,
                radius: profile.radius,
                health: profile.health,
                max_health: profile.health,
                body_damage: profile.body_damage,
                rewarding_experience: profile.reward,
            },
            role: Role::Polygon {
                edges: profile.edges,
            },
        }
    }

    /// A bullet fired by `owner_id` from `position` along `direction` (radians).
    pub fn bullet(id: u32, owner_id: u32, position: Point, direction: f64, config: &ArenaConfig) -> Self {
        Entity {
            body: Body {
                id,
                owner_id,
                position,
                radius: config.bullet_radius,
                health: config.bullet_health,
                max_health: config.bullet_health,
                body_damage: config.bullet_damage,
                rewarding_experience: 0.0,
            },
            role: Role::Bullet {
                duration: config.bullet_duration,
                velocity: Vector::from_angle(direction, config.bullet_speed),
            },
        }
    }

    pub fn id(&self) -> u32 {
        self.body.id
    }

    pub fn position(&self) -> Point {
        self.body.position
    }

    pub fn health_ratio(&self) -> f64 {
        self.body.health / self.body.max_health
    }

    pub fn is_destroyed(&self) -> bool {
        self.body.health <= 0.0
    }

    /// Circle overlap using the larger of the two radii.
    pub fn collides_with(&self, other: &Entity) -> bool {
        let r = self.body.radius.max(other.body.radius);
        self.body.position.distance_sq(&other.body.position) <= r * r
    }

    pub fn cooldown(&self) -> Option<u32> {
        match self.role {
            Role::Hero { cooldown } => Some(cooldown),
            _ => None,
        }
    }

    pub fn edges(&self) -> Option<u8> {
        match self.role {
            Role::Polygon { edges } => Some(edges),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<u32> {
        match self.role {
            Role::Bullet { duration, .. } => Some(duration),
            _ => None,
        }
    }
}

/// Instantaneous world: one hero, enemy heroes (network-sourced only),
/// polygons and bullets, each in stable order within a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldState {
    pub hero: Entity,
    pub enemy_heroes: Vec<Entity>,
    pub polygons: Vec<Entity>,
    pub bullets: Vec<Entity>,
}

impl WorldState {
    pub fn new(hero: Entity) -> Self {
        WorldState {
            hero,
            enemy_heroes: Vec::new(),
            polygons: Vec::new(),
            bullets: Vec::new(),
        }
    }

    /// Bullets fired by the hero.
    pub fn own_bullets(&self) -> impl Iterator<Item = &Entity> {
        let hero_id = self.hero.id();
        self.bullets.iter().filter(move |b| b.body.owner_id == hero_id)
    }

    /// Bullets fired by anyone else.
    pub fn enemy_bullets(&self) -> impl Iterator<Item = &Entity> {
        let hero_id = self.hero.id();
        self.bullets.iter().filter(move |b| b.body.owner_id != hero_id)
    }

    pub fn entity_count(&self) -> usize {
        1 + self.enemy_heroes.len() + self.polygons.len() + self.bullets.len()
    }

    /// Sum of the reward released by destroying every remaining polygon.
    pub fn destroyable_reward(&self) -> f64 {
        self.polygons.iter().map(|p| p.body.rewarding_experience).sum()
    }
}

impl Default for WorldState {
    fn default() -> Self {
        WorldState::new(Entity::hero(
            HERO_ID,
            Point::default(),
            &ArenaConfig::default(),
        ))
    }
}
