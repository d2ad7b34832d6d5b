use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Below this magnitude velocities and impulses snap to zero.
pub const SMALL: f32 = 1e-5;

/// Map-plane vector in tile units. `y` grows southward on the map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit forward vector for a yaw in degrees; yaw 0 looks down +y.
    pub fn from_yaw(yaw_degrees: f32) -> Self {
        let (sin, cos) = yaw_degrees.to_radians().sin_cos();
        Self { x: -sin, y: cos }
    }

    /// Unit vector pointing to the viewer's right for a yaw in degrees.
    pub fn right_of_yaw(yaw_degrees: f32) -> Self {
        let (sin, cos) = yaw_degrees.to_radians().sin_cos();
        Self { x: -cos, y: -sin }
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Returns `None` for vectors too short to carry a direction.
    pub fn try_normalize(self) -> Option<Vec2> {
        let length = self.length();
        if !length.is_finite() || length <= f32::EPSILON {
            return None;
        }
        Some(self * (1.0 / length))
    }

    /// Polar angle in degrees measured from +x toward +y. Zero vectors yield 0.
    pub fn angle_degrees(self) -> f32 {
        if self.x == 0.0 && self.y == 0.0 {
            return 0.0;
        }
        self.y.atan2(self.x).to_degrees()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// World-space point; `z` is elevation above ground 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn from_plane(plane: Vec2, z: f32) -> Self {
        Self {
            x: plane.x,
            y: plane.y,
            z,
        }
    }

    pub fn plane(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Axis-aligned rectangle on the map plane. `top` is the smaller `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self {
            x: center.x - w / 2.0,
            y: center.y - h / 2.0,
            w,
            h,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn set_left(&mut self, left: f32) {
        self.x = left;
    }

    pub fn set_right(&mut self, right: f32) {
        self.x = right - self.w;
    }

    pub fn set_top(&mut self, top: f32) {
        self.y = top;
    }

    pub fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - self.h;
    }

    /// Strict overlap: rectangles that only share an edge do not collide.
    pub fn collides(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(
            self.x * factor,
            self.y * factor,
            self.w * factor,
            self.h * factor,
        )
    }

    /// Liang-Barsky clip of the segment `a..b` against this rectangle (edges inclusive).
    pub fn clip_segment(&self, a: Vec2, b: Vec2) -> Option<(Vec2, Vec2)> {
        let delta = b - a;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let edges = [
            (-delta.x, a.x - self.left()),
            (delta.x, self.right() - a.x),
            (-delta.y, a.y - self.top()),
            (delta.y, self.bottom() - a.y),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        Some((a + delta * t0, a + delta * t1))
    }
}
