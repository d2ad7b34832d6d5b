use crate::entity::{MoveIntent, PlayerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveForward,
    MoveBack,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
    Jump,
    Attack,
    Quit,
}

const ACTION_COUNT: usize = 9;

/// Number of weapon slots reachable from the number row.
pub const WEAPON_SLOTS: usize = 9;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveForward => 0,
            InputAction::MoveBack => 1,
            InputAction::StrafeLeft => 2,
            InputAction::StrafeRight => 3,
            InputAction::TurnLeft => 4,
            InputAction::TurnRight => 5,
            InputAction::Jump => 6,
            InputAction::Attack => 7,
            InputAction::Quit => 8,
        }
    }
}

/// Input state handed to a scene for one frame. Held actions stay down until
/// released; `interact` and weapon slot presses are edges seen by one frame only.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    interact_pressed: bool,
    weapon_slot_pressed: Option<usize>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        interact_pressed: bool,
        weapon_slot_pressed: Option<usize>,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            interact_pressed,
            weapon_slot_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_interact_pressed(mut self) -> Self {
        self.interact_pressed = true;
        self
    }

    pub fn with_weapon_slot(mut self, slot: usize) -> Self {
        self.weapon_slot_pressed = Some(slot);
        self
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn weapon_slot_pressed(&self) -> Option<usize> {
        self.weapon_slot_pressed
    }

    /// Converts held keys into a movement intent for a frame of `dt` ticks.
    pub fn move_intent(&self, settings: &PlayerSettings, dt: f32) -> MoveIntent {
        MoveIntent {
            forward: axis(
                self.is_down(InputAction::MoveForward),
                self.is_down(InputAction::MoveBack),
            ),
            right: axis(
                self.is_down(InputAction::StrafeRight),
                self.is_down(InputAction::StrafeLeft),
            ),
            // Yaw grows clockwise, toward the viewer's right.
            yaw_delta: axis(
                self.is_down(InputAction::TurnRight),
                self.is_down(InputAction::TurnLeft),
            ) * settings.turn_speed
                * dt,
            up: self
                .is_down(InputAction::Jump)
                .then_some(settings.jump_velocity),
        }
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_keys_cancel() {
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveForward, true)
            .with_action_down(InputAction::MoveBack, true)
            .with_action_down(InputAction::StrafeLeft, true);
        let intent = input.move_intent(&PlayerSettings::default(), 1.0);
        assert_eq!(intent.forward, 0.0);
        assert_eq!(intent.right, -1.0);
        assert_eq!(intent.up, None);
    }

    #[test]
    fn turning_scales_with_frame_ticks() {
        let settings = PlayerSettings::default();
        let input = InputSnapshot::empty().with_action_down(InputAction::TurnRight, true);
        let one = input.move_intent(&settings, 1.0);
        let two = input.move_intent(&settings, 2.0);
        assert!((one.yaw_delta - settings.turn_speed).abs() < 1e-6);
        assert!((two.yaw_delta - 2.0 * settings.turn_speed).abs() < 1e-6);

        let left = InputSnapshot::empty().with_action_down(InputAction::TurnLeft, true);
        assert!(left.move_intent(&settings, 1.0).yaw_delta < 0.0);
    }

    #[test]
    fn jump_requests_the_configured_impulse() {
        let settings = PlayerSettings::default();
        let input = InputSnapshot::empty().with_action_down(InputAction::Jump, true);
        assert_eq!(input.move_intent(&settings, 1.0).up, Some(settings.jump_velocity));
    }
}
