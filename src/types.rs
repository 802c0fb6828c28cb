/// A position in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Returns this point translated by a per-tick displacement.
    pub fn offset(&self, v: Vector) -> Point {
        Point {
            x: self.x + v.dx,
            y: self.y + v.dy,
        }
    }

    /// Point at `radius` world units from `origin` along `angle` (radians).
    pub fn from_polar(origin: Point, angle: f64, radius: f64) -> Point {
        origin.offset(Vector::from_angle(angle, radius))
    }

    /// Whether the point lies strictly inside a `width` x `height` rectangle anchored at the origin.
    pub fn strictly_inside(&self, width: f64, height: f64) -> bool {
        self.x > 0.0 && self.x < width && self.y > 0.0 && self.y < height
    }
}

/// A constant displacement applied once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub fn from_angle(angle: f64, speed: f64) -> Self {
        Vector {
            dx: speed * angle.cos(),
            dy: speed * angle.sin(),
        }
    }

    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }
}
