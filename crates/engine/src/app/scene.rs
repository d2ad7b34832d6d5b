use tracing::{debug, info};

use crate::audio::SoundSink;
use crate::entity::{AttackOutcome, Entity, PlayerSettings};
use crate::level::{Level, LevelScript};
use crate::render::{render_frame, AssetTable, CameraConfig, FrameBuffer};

use super::{InputAction, InputSnapshot};

/// What the loop runner drives once per frame.
pub trait Scene {
    /// Advances the simulation by `dt` game ticks.
    fn update(&mut self, dt: f32, input: &InputSnapshot);
    fn render(&mut self, out: &mut FrameBuffer);
    fn entity_count(&self) -> usize;
    fn debug_title(&self) -> Option<String> {
        None
    }
    fn shutdown(&mut self) {}
}

/// A playable level: simulation, textures, level script and sound output.
pub struct LevelScene {
    level: Level,
    assets: AssetTable,
    script: Box<dyn LevelScript>,
    sounds: Box<dyn SoundSink>,
    camera: CameraConfig,
}

impl LevelScene {
    pub fn new(
        level: Level,
        assets: AssetTable,
        script: Box<dyn LevelScript>,
        sounds: Box<dyn SoundSink>,
    ) -> Self {
        Self {
            level,
            assets,
            script,
            sounds,
            camera: CameraConfig::default(),
        }
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    fn player_settings(&self) -> PlayerSettings {
        self.level
            .entities
            .player()
            .and_then(Entity::player)
            .map(|state| state.settings)
            .unwrap_or_default()
    }
}

impl Scene for LevelScene {
    fn update(&mut self, dt: f32, input: &InputSnapshot) {
        if let Some(slot) = input.weapon_slot_pressed() {
            self.level.switch_weapon(slot);
        }
        if input.interact_pressed() {
            self.level.player_interact();
        }
        if input.is_down(InputAction::Attack) {
            let outcome = self.level.player_attack(self.sounds.as_mut());
            if outcome != AttackOutcome::Unable {
                debug!(outcome = ?outcome, "player_attacked");
            }
        }

        let intent = input.move_intent(&self.player_settings(), dt);
        self.level
            .update(dt, &intent, self.sounds.as_mut(), self.script.as_mut());
    }

    fn render(&mut self, out: &mut FrameBuffer) {
        render_frame(&self.level, &self.assets, self.camera, out);
    }

    fn entity_count(&self) -> usize {
        self.level.entities.len()
    }

    fn debug_title(&self) -> Option<String> {
        let player = self.level.entities.player()?;
        let state = player.player()?;
        let ammo = state
            .weapon
            .map(|weapon| state.inventory.count(weapon))
            .unwrap_or(0);
        Some(format!(
            "hp {:.0} | ammo {} | ({:.1}, {:.1})",
            player.health, ammo, player.pos.x, player.pos.y
        ))
    }

    fn shutdown(&mut self) {
        info!(
            level_timer = self.level.timer(),
            entity_count = self.level.entities.len(),
            "level_scene_shutdown"
        );
    }
}
