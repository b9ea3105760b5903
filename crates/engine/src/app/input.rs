use crate::game::TickInput;
use crate::motion::MotionInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    Jump,
    Restart,
    ToggleMute,
    Quit,
}

const ACTION_COUNT: usize = 6;

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
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::Jump => 2,
            InputAction::Restart => 3,
            InputAction::ToggleMute => 4,
            InputAction::Quit => 5,
        }
    }
}

/// Held keys plus the one-tick press edges for restart and mute.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    restart_pressed: bool,
    mute_pressed: bool,
}

impl InputSnapshot {
    pub(crate) fn new(actions: ActionStates, restart_pressed: bool, mute_pressed: bool) -> Self {
        Self {
            actions,
            restart_pressed,
            mute_pressed,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn restart_pressed(&self) -> bool {
        self.restart_pressed
    }

    pub fn mute_pressed(&self) -> bool {
        self.mute_pressed
    }

    pub fn tick_input(&self) -> TickInput {
        TickInput {
            motion: MotionInput {
                holds_right: self.is_down(InputAction::MoveRight),
                holds_left: self.is_down(InputAction::MoveLeft),
                holds_up: self.is_down(InputAction::Jump),
            },
            restart: self.restart_pressed,
            toggle_mute: self.mute_pressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_input_maps_held_actions_and_edges() {
        let mut actions = ActionStates::default();
        actions.set(InputAction::MoveRight, true);
        actions.set(InputAction::Jump, true);

        let input = InputSnapshot::new(actions, true, false).tick_input();

        assert!(input.motion.holds_right);
        assert!(!input.motion.holds_left);
        assert!(input.motion.holds_up);
        assert!(input.restart);
        assert!(!input.toggle_mute);
    }
}
