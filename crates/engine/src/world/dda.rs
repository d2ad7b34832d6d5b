use super::math::Vec2;
use super::tile::{tile_key, TileKey};

/// Which family of grid lines a step crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// A line of constant x.
    X,
    /// A line of constant y.
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DdaStep {
    /// Tile entered by this step.
    pub tile: TileKey,
    /// Tile the ray was in before this step.
    pub previous: TileKey,
    /// Ray parameter at the crossing, in multiples of the ray direction.
    pub t: f32,
    pub side: Side,
    /// Crossing point on the map plane.
    pub point: Vec2,
}

/// Grid traversal that yields every tile boundary a ray crosses, nearest first.
///
/// The iterator is unbounded; callers stop it once `t` passes their range.
#[derive(Debug, Clone)]
pub struct GridRay {
    origin: Vec2,
    dir: Vec2,
    tile: TileKey,
    step: (i32, i32),
    t_delta: (f32, f32),
    t_max: (f32, f32),
}

impl GridRay {
    /// Returns `None` for a zero or non-finite direction.
    pub fn new(origin: Vec2, dir: Vec2) -> Option<Self> {
        if dir.is_zero() || !dir.x.is_finite() || !dir.y.is_finite() {
            return None;
        }
        let tile = tile_key(origin);
        let (step_x, t_delta_x, t_max_x) = axis_setup(origin.x, tile.0, dir.x);
        let (step_y, t_delta_y, t_max_y) = axis_setup(origin.y, tile.1, dir.y);
        Some(Self {
            origin,
            dir,
            tile,
            step: (step_x, step_y),
            t_delta: (t_delta_x, t_delta_y),
            t_max: (t_max_x, t_max_y),
        })
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn dir(&self) -> Vec2 {
        self.dir
    }

    /// Tile currently containing the ray front.
    pub fn tile(&self) -> TileKey {
        self.tile
    }

    /// Ray parameter of the next boundary crossing.
    pub fn next_t(&self) -> f32 {
        self.t_max.0.min(self.t_max.1)
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        self.origin + self.dir * t
    }
}

fn axis_setup(origin: f32, tile: i32, dir: f32) -> (i32, f32, f32) {
    if dir > 0.0 {
        let boundary = tile as f32 + 1.0;
        (1, 1.0 / dir, (boundary - origin) / dir)
    } else if dir < 0.0 {
        let boundary = tile as f32;
        (-1, -1.0 / dir, (origin - boundary) / -dir)
    } else {
        (0, f32::INFINITY, f32::INFINITY)
    }
}

impl Iterator for GridRay {
    type Item = DdaStep;

    fn next(&mut self) -> Option<DdaStep> {
        let previous = self.tile;
        let (t, side) = if self.t_max.0 < self.t_max.1 {
            let t = self.t_max.0;
            self.tile.0 += self.step.0;
            self.t_max.0 += self.t_delta.0;
            (t, Side::X)
        } else {
            let t = self.t_max.1;
            self.tile.1 += self.step.1;
            self.t_max.1 += self.t_delta.1;
            (t, Side::Y)
        };

        let mut point = self.point_at(t);
        // Snap the crossed coordinate onto the grid line to keep texture columns stable.
        match side {
            Side::X => point.x = previous.0.max(self.tile.0) as f32,
            Side::Y => point.y = previous.1.max(self.tile.1) as f32,
        }

        Some(DdaStep {
            tile: self.tile,
            previous,
            t,
            side,
            point,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_direction_is_rejected() {
        assert!(GridRay::new(Vec2::new(0.5, 0.5), Vec2::ZERO).is_none());
        assert!(GridRay::new(Vec2::new(0.5, 0.5), Vec2::new(f32::NAN, 1.0)).is_none());
    }

    #[test]
    fn axis_aligned_ray_steps_one_tile_at_a_time() {
        let ray = GridRay::new(Vec2::new(0.5, 0.5), Vec2::new(0.0, 1.0)).expect("ray");
        let steps: Vec<DdaStep> = ray.take(3).collect();
        assert_eq!(steps[0].tile, (0, 1));
        assert_eq!(steps[1].tile, (0, 2));
        assert_eq!(steps[2].tile, (0, 3));
        assert!((steps[0].t - 0.5).abs() < 1e-6);
        assert!(steps.iter().all(|step| step.side == Side::Y));
        assert_eq!(steps[0].point.y, 1.0);
    }

    #[test]
    fn parameter_is_monotonic_for_many_directions() {
        for i in 0..64 {
            let yaw = i as f32 * 360.0 / 64.0 + 0.37;
            let dir = Vec2::from_yaw(yaw);
            let ray = GridRay::new(Vec2::new(3.3, -1.7), dir).expect("ray");
            let mut last = 0.0f32;
            for step in ray.take(40) {
                assert!(step.t >= last, "t decreased at yaw {yaw}");
                last = step.t;
            }
        }
    }

    #[test]
    fn reaching_a_distance_takes_bounded_steps() {
        let max_distance = 8.0f32;
        for i in 0..32 {
            let dir = Vec2::from_yaw(i as f32 * 11.25 + 0.1);
            let ray = GridRay::new(Vec2::new(0.25, 0.75), dir).expect("ray");
            let bound = (max_distance * dir.x.abs()).ceil()
                + (max_distance * dir.y.abs()).ceil()
                + 2.0;
            let steps = ray.take_while(|step| step.t <= max_distance).count();
            assert!(steps as f32 <= bound);
        }
    }

    #[test]
    fn negative_direction_enters_lower_tiles() {
        let ray = GridRay::new(Vec2::new(0.5, 0.5), Vec2::new(-1.0, 0.0)).expect("ray");
        let first = ray.clone().next().expect("step");
        assert_eq!(first.tile, (-1, 0));
        assert_eq!(first.previous, (0, 0));
        assert_eq!(first.point.x, 0.0);
        assert_eq!(ray.tile(), (0, 0));
    }
}
