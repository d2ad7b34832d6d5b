use std::collections::BTreeMap;

use crate::world::{TextureId, Vec2};

pub const DEFAULT_STATE: &str = "default";

/// Index of the directional frame to show, given the entity's yaw and the
/// bearing from the entity to the viewer. `directions` equal wedges cover 360°.
pub fn direction_index(yaw: f32, entity_pos: Vec2, viewer_pos: Vec2, directions: usize) -> usize {
    if directions <= 1 {
        return 0;
    }
    let bucket = 360.0 / directions as f32;
    let to_viewer = (viewer_pos - entity_pos).angle_degrees();
    let wrapped = (yaw - to_viewer + bucket / 2.0 - 90.0).rem_euclid(360.0);
    ((wrapped / bucket) as usize).min(directions - 1)
}

/// One named animation: frames per direction bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    /// `textures[direction][frame]`.
    pub textures: Vec<Vec<TextureId>>,
    /// Game-speed units for one pass over the frames.
    pub animation_time: f32,
    /// When set the state keeps its own clock that starts at zero on entry;
    /// otherwise frames follow the level clock.
    pub trigger: bool,
    /// Extra repetitions before the state ends; `-1` loops forever.
    pub loops: i32,
}

impl AnimationState {
    pub fn looping(textures: Vec<Vec<TextureId>>, animation_time: f32) -> Self {
        Self {
            textures,
            animation_time,
            trigger: false,
            loops: -1,
        }
    }

    pub fn once(textures: Vec<Vec<TextureId>>, animation_time: f32) -> Self {
        Self {
            textures,
            animation_time,
            trigger: true,
            loops: 0,
        }
    }

    fn duration(&self) -> Option<f32> {
        (self.loops > -1).then(|| self.animation_time * (self.loops + 1) as f32)
    }

    fn frame_at(&self, direction: usize, timer: f32) -> Option<TextureId> {
        let frames = self.textures.get(direction).or_else(|| self.textures.first())?;
        if frames.is_empty() {
            return None;
        }
        if !(self.animation_time > 0.0) {
            return frames.first().copied();
        }
        let raw = (timer / self.animation_time * frames.len() as f32).floor();
        let index = (raw.max(0.0) as usize) % frames.len();
        frames.get(index).copied()
    }
}

/// Named animation states with a single active state and its clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Animator {
    states: BTreeMap<String, AnimationState>,
    current: String,
    timer: f32,
}

impl Animator {
    pub fn new(default_state: AnimationState) -> Self {
        let mut states = BTreeMap::new();
        states.insert(DEFAULT_STATE.to_string(), default_state);
        Self {
            states,
            current: DEFAULT_STATE.to_string(),
            timer: 0.0,
        }
    }

    pub fn with_state(mut self, name: &str, state: AnimationState) -> Self {
        self.states.insert(name.to_string(), state);
        self
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Switches state and restarts its clock. Unknown names are ignored.
    pub fn set_state(&mut self, name: &str) -> bool {
        if !self.states.contains_key(name) {
            return false;
        }
        self.current = name.to_string();
        self.timer = 0.0;
        true
    }

    pub fn advance(&mut self, dt: f32, level_timer: f32) {
        let Some(state) = self.states.get(&self.current) else {
            return;
        };
        self.timer = if state.trigger {
            self.timer + dt
        } else {
            level_timer
        };
        if let Some(duration) = state.duration() {
            self.timer = self.timer.min(duration);
        }
    }

    /// True once a finite state has played all of its repetitions.
    pub fn ended_loop(&self) -> bool {
        self.states
            .get(&self.current)
            .and_then(AnimationState::duration)
            .is_some_and(|duration| self.timer >= duration)
    }

    pub fn directions(&self) -> usize {
        self.states
            .get(&self.current)
            .map(|state| state.textures.len())
            .unwrap_or(0)
    }

    pub fn frame(&self, direction: usize) -> Option<TextureId> {
        self.states
            .get(&self.current)
            .and_then(|state| state.frame_at(direction, self.timer))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sprite {
    None,
    /// A flat list of direction frames.
    Directional(Vec<TextureId>),
    Animated(Animator),
}

impl Sprite {
    pub fn advance(&mut self, dt: f32, level_timer: f32) {
        if let Sprite::Animated(animator) = self {
            animator.advance(dt, level_timer);
        }
    }

    pub fn texture_for(&self, yaw: f32, entity_pos: Vec2, viewer_pos: Vec2) -> Option<TextureId> {
        match self {
            Sprite::None => None,
            Sprite::Directional(frames) => {
                let index = direction_index(yaw, entity_pos, viewer_pos, frames.len());
                frames.get(index).copied()
            }
            Sprite::Animated(animator) => {
                let index = direction_index(yaw, entity_pos, viewer_pos, animator.directions());
                animator.frame(index)
            }
        }
    }

    pub fn animator_mut(&mut self) -> Option<&mut Animator> {
        match self {
            Sprite::Animated(animator) => Some(animator),
            _ => None,
        }
    }

    pub fn animator(&self) -> Option<&Animator> {
        match self {
            Sprite::Animated(animator) => Some(animator),
            _ => None,
        }
    }
}
