use serde::{Deserialize, Serialize};

/// Mode flags describing what the player is doing this tick.
///
/// `jumping` and `sliding` are private so the two can never be set together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlayerState {
    jumping: bool,
    sliding: bool,
    pub pushing_left: bool,
    pub pushing_right: bool,
    pub blinged: bool,
    pub surfing: bool,
    pub with_gun: bool,
    pub on_dashboard: bool,
    pub velocity_base: f32,
}

impl PlayerState {
    pub fn jumping(&self) -> bool {
        self.jumping
    }

    pub fn sliding(&self) -> bool {
        self.sliding
    }

    pub fn set_jumping(&mut self, jumping: bool) {
        self.jumping = jumping;
        if jumping {
            self.sliding = false;
        }
    }

    pub fn begin_slide(&mut self) {
        self.sliding = true;
        self.jumping = false;
    }

    pub fn end_slide(&mut self) {
        self.sliding = false;
    }

    pub fn clear_pushing(&mut self) {
        self.pushing_left = false;
        self.pushing_right = false;
    }

    /// Back to the freshly-started state. Pushing flags survive, matching the
    /// reset performed on restart where contacts re-derive them next tick.
    pub fn reset(&mut self, reset_velocity_x: f32) {
        let pushing_left = self.pushing_left;
        let pushing_right = self.pushing_right;
        *self = Self {
            pushing_left,
            pushing_right,
            velocity_base: reset_velocity_x,
            ..Self::default()
        };
    }

    pub fn body_profile(&self) -> BodyProfile {
        if self.surfing {
            BodyProfile::Surf
        } else if self.with_gun {
            BodyProfile::Gun
        } else {
            BodyProfile::Standard
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyProfile {
    #[default]
    Standard,
    Surf,
    Gun,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDimensions {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl BodyProfile {
    pub const fn dimensions(self) -> BodyDimensions {
        match self {
            BodyProfile::Standard => BodyDimensions {
                width: 56.0,
                height: 116.0,
                offset_x: -28.0,
                offset_y: -116.0,
            },
            BodyProfile::Surf => BodyDimensions {
                width: 176.0,
                height: 140.0,
                offset_x: -80.0,
                offset_y: -116.0,
            },
            BodyProfile::Gun => BodyDimensions {
                width: 104.0,
                height: 116.0,
                offset_x: -52.0,
                offset_y: -116.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAnimation {
    Idle,
    Run,
    Jump,
    Fall,
    Push,
    Slide,
}

impl PlayerAnimation {
    pub fn key(self, state: &PlayerState) -> String {
        let base = match self {
            PlayerAnimation::Idle => "player-idle",
            PlayerAnimation::Run => "player-run",
            PlayerAnimation::Jump => "player-jump",
            PlayerAnimation::Fall => return "player-fall".to_string(),
            PlayerAnimation::Push => return "player-push".to_string(),
            PlayerAnimation::Slide => return "player-slide".to_string(),
        };
        let variant = if state.surfing {
            "-surf"
        } else if state.with_gun {
            "-gun"
        } else {
            ""
        };
        format!("{base}{variant}")
    }
}

/// Physics constants, all expressed relative to the screen or sprite height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerTuning {
    pub run_from_height: f32,
    pub jump_from_sprite_height: f32,
    pub gravity_from_height: f32,
    pub surf_multiplier: f32,
    pub foreground: f32,
    pub sprite_height: f32,
    pub reset_velocity_x: f32,
    pub base_entry_offset: f32,
    pub board_offset_x: f32,
    pub board_stop_deceleration: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            run_from_height: 0.8,
            jump_from_sprite_height: -5.0,
            gravity_from_height: 3.0,
            surf_multiplier: 1.25,
            foreground: 0.1,
            sprite_height: 128.0,
            reset_velocity_x: 0.0,
            base_entry_offset: 4.0,
            board_offset_x: -12.0,
            board_stop_deceleration: 1.2,
        }
    }
}

impl PlayerTuning {
    fn surf_factor(&self, surfing: bool) -> f32 {
        if surfing {
            self.surf_multiplier
        } else {
            1.0
        }
    }

    pub fn run_velocity(&self, screen_height: f32, surfing: bool) -> f32 {
        self.run_from_height * screen_height * self.surf_factor(surfing)
    }

    pub fn jump_velocity(&self, surfing: bool) -> f32 {
        self.jump_from_sprite_height * self.sprite_height * self.surf_factor(surfing)
    }

    pub fn gravity(&self, screen_height: f32) -> f32 {
        self.gravity_from_height * screen_height
    }

    pub fn foreground_y(&self, screen_height: f32) -> f32 {
        screen_height * (1.0 - self.foreground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_velocity_matches_height_formula() {
        let tuning = PlayerTuning::default();

        assert!((tuning.run_velocity(640.0, false) - 512.0).abs() < 0.0001);
        assert!((tuning.run_velocity(640.0, true) - 640.0).abs() < 0.0001);
    }

    #[test]
    fn jump_velocity_scales_with_sprite_height_and_surf() {
        let tuning = PlayerTuning {
            sprite_height: 100.0,
            ..PlayerTuning::default()
        };

        assert!((tuning.jump_velocity(false) + 500.0).abs() < 0.0001);
        assert!((tuning.jump_velocity(true) + 625.0).abs() < 0.0001);
    }

    #[test]
    fn foreground_line_sits_above_bottom_band() {
        let tuning = PlayerTuning::default();
        assert!((tuning.foreground_y(640.0) - 576.0).abs() < 0.0001);
        assert!((tuning.gravity(640.0) - 1920.0).abs() < 0.0001);
    }

    #[test]
    fn jumping_and_sliding_are_mutually_exclusive() {
        let mut state = PlayerState::default();

        state.begin_slide();
        assert!(state.sliding() && !state.jumping());

        state.set_jumping(true);
        assert!(state.jumping() && !state.sliding());

        state.begin_slide();
        assert!(state.sliding() && !state.jumping());
    }

    #[test]
    fn reset_clears_modes_but_keeps_pushing() {
        let mut state = PlayerState {
            pushing_right: true,
            surfing: true,
            with_gun: true,
            velocity_base: 300.0,
            ..PlayerState::default()
        };
        state.set_jumping(true);

        state.reset(0.0);

        assert!(state.pushing_right);
        assert!(!state.surfing && !state.with_gun && !state.jumping());
        assert!(state.velocity_base.abs() < 0.0001);
    }

    #[test]
    fn body_profile_prefers_surf_over_gun() {
        let mut state = PlayerState {
            with_gun: true,
            ..PlayerState::default()
        };
        assert_eq!(state.body_profile(), BodyProfile::Gun);
        state.surfing = true;
        assert_eq!(state.body_profile(), BodyProfile::Surf);
        assert!((BodyProfile::Surf.dimensions().width - 176.0).abs() < 0.0001);
    }

    #[test]
    fn animation_keys_carry_mode_variant() {
        let mut state = PlayerState::default();
        assert_eq!(PlayerAnimation::Run.key(&state), "player-run");

        state.with_gun = true;
        assert_eq!(PlayerAnimation::Idle.key(&state), "player-idle-gun");

        state.surfing = true;
        assert_eq!(PlayerAnimation::Jump.key(&state), "player-jump-surf");
        assert_eq!(PlayerAnimation::Fall.key(&state), "player-fall");
    }
}
