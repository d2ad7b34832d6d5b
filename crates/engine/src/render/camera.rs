use crate::entity::Entity;
use crate::world::Vec2;

/// Projection settings shared by every render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Horizontal field of view in degrees.
    pub fov: f32,
    /// Walls farther than this (perpendicular depth) are not drawn.
    pub render_distance: f32,
    /// Cap on a projected unit of height, in screen heights.
    pub max_line_height: f32,
    /// Sprites closer than this to the camera plane are skipped.
    pub min_entity_depth: f32,
    /// Horizon row as a fraction of the screen height.
    pub horizon: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 90.0,
            render_distance: 8.0,
            max_line_height: 10.0,
            min_entity_depth: 0.05,
            horizon: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pos: Vec2,
    pub yaw: f32,
    /// Eye height in world units.
    pub elevation: f32,
}

impl Camera {
    /// Eye of `entity`: the player's smoothed render elevation, or the body
    /// centre for anything else.
    pub fn from_entity(entity: &Entity) -> Self {
        let elevation = entity
            .player()
            .map(|player| player.render_elevation)
            .unwrap_or_else(|| entity.center_elevation());
        Self {
            pos: entity.pos,
            yaw: entity.yaw,
            elevation,
        }
    }
}

/// Per-frame screen mapping derived from a camera and a target size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Projection {
    pub width: i32,
    pub height: i32,
    pub semiwidth: f32,
    pub semiheight: f32,
    /// Horizon row in pixels.
    pub horizon: f32,
    /// `1 / tan(fov / 2)`.
    pub ym: f32,
    /// Pixels per world unit at depth 1.
    pub focal: f32,
    pub forward: Vec2,
    pub right: Vec2,
    pub camera: Camera,
    pub config: CameraConfig,
}

impl Projection {
    pub fn new(camera: Camera, config: CameraConfig, width: u32, height: u32) -> Self {
        let half_fov = (config.fov.clamp(1.0, 179.0) / 2.0).to_radians();
        let ym = 1.0 / half_fov.tan();
        let semiwidth = width as f32 / 2.0;
        Self {
            width: width as i32,
            height: height as i32,
            semiwidth,
            semiheight: height as f32 / 2.0,
            horizon: config.horizon.clamp(0.0, 1.0) * height as f32,
            ym,
            focal: semiwidth * ym,
            forward: Vec2::from_yaw(camera.yaw),
            right: Vec2::right_of_yaw(camera.yaw),
            camera,
            config,
        }
    }

    /// Unnormalised ray through column `x`; its forward component is `ym`,
    /// so a ray parameter `t` sits at perpendicular depth `t * ym`.
    pub fn column_ray(&self, x: i32) -> Vec2 {
        let lateral = 2.0 * x as f32 / self.width.max(1) as f32 - 1.0;
        self.forward * self.ym + self.right * lateral
    }

    pub fn depth_of(&self, t: f32) -> f32 {
        t * self.ym
    }

    /// Pixels per world unit at `depth`, clamped for walls right at the lens.
    pub fn scale_at(&self, depth: f32) -> f32 {
        let cap = self.config.max_line_height * self.height as f32;
        if depth <= 0.0 {
            return cap;
        }
        (self.focal / depth).min(cap)
    }

    pub fn screen_y(&self, elevation: f32, scale: f32) -> f32 {
        self.horizon - (elevation - self.camera.elevation) * scale
    }

    /// Camera-space `(lateral, depth)` of a world point.
    pub fn to_camera(&self, point: Vec2) -> (f32, f32) {
        let relative = point - self.camera.pos;
        (relative.dot(self.right), relative.dot(self.forward))
    }

    pub fn screen_x(&self, lateral: f32, depth: f32) -> f32 {
        self.semiwidth + self.ym * lateral / depth * self.semiwidth
    }
}

/// Brightness multiplier for distance fog.
pub(crate) fn fog_factor(distance: f32, darkness: f32) -> f32 {
    let darken = (-distance.max(0.0).powf(0.9) * darkness / 7.0).max(-1.0);
    1.0 + darken
}
