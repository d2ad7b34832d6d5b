use std::f32::consts::PI;

use engine::world::{Rect, Semitile, SemitileAxis, TileKey, TilePatch, TileTarget, Vec2};
use engine::{Level, LevelScript};
use tracing::debug;

/// Level clock ticks per radian of platform motion.
const CYCLE_TICKS: f32 = 60.0;
const MIN_PISTON_HEIGHT: f32 = 0.01;

/// Animates the demo map: a lift that rises and falls, a piston that grows
/// and shrinks in step with it, and a sliding door panel. Only tiles the level
/// already defines are touched, so other maps run unchanged.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DemoScript {
    lift: TileKey,
    piston: TileKey,
    door: TileKey,
}

impl Default for DemoScript {
    fn default() -> Self {
        Self {
            lift: (8, 11),
            piston: (9, 11),
            door: (10, 8),
        }
    }
}

impl DemoScript {
    fn lift_patch(timer: f32) -> TilePatch {
        TilePatch {
            elevation: Some(((timer / CYCLE_TICKS + PI).sin() + 1.0).max(0.0)),
            ..TilePatch::default()
        }
    }

    fn piston_patch(timer: f32) -> TilePatch {
        TilePatch {
            height: Some(((timer / CYCLE_TICKS).sin() + 1.0).max(MIN_PISTON_HEIGHT)),
            ..TilePatch::default()
        }
    }

    fn door_patch(timer: f32) -> TilePatch {
        TilePatch {
            elevation: Some(0.0),
            height: Some(2.0),
            semitile: Some(Semitile {
                axis: SemitileAxis::Y,
                pos: Vec2::new(0.2, (timer / CYCLE_TICKS).rem_euclid(2.0) - 1.0),
                width: 1.0,
            }),
            rect: Some(Rect::new(0.2, 0.0, 0.0001, 1.0)),
            ..TilePatch::default()
        }
    }
}

impl LevelScript for DemoScript {
    fn tick(&mut self, level: &mut Level, _dt: f32) {
        let timer = level.timer();
        let patches = [
            (self.lift, Self::lift_patch(timer)),
            (self.piston, Self::piston_patch(timer)),
            (self.door, Self::door_patch(timer)),
        ];
        for (key, patch) in patches {
            if level.grid.get_static(key).is_none() {
                continue;
            }
            if let Err(err) = level.grid.set_tile(key, &patch, TileTarget::Dynamic) {
                debug!(x = key.0, y = key.1, error = %err, "demo_tile_patch_rejected");
            }
        }
    }
}
