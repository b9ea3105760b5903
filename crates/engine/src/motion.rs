use crate::context::{BoardCue, GameContext};
use crate::player::PlayerAnimation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionInput {
    pub holds_right: bool,
    pub holds_left: bool,
    pub holds_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionBranch {
    GameOver,
    Scripted,
    Right,
    Left,
    Standing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionOutcome {
    pub branch: MotionBranch,
    pub jumped: bool,
}

impl MotionOutcome {
    fn branch(branch: MotionBranch) -> Self {
        Self {
            branch,
            jumped: false,
        }
    }

    /// Moving left never reaches new triggers, so only the other live
    /// branches check the timeline.
    pub fn advances_timeline(&self) -> bool {
        matches!(
            self.branch,
            MotionBranch::Scripted | MotionBranch::Right | MotionBranch::Standing
        )
    }
}

/// Per-tick player resolution: horizontal branch, facing, animation, camera
/// follow and loop sounds, then the jump check.
pub fn resolve_motion(input: MotionInput, ctx: &mut GameContext) -> MotionOutcome {
    if ctx.is_game_over() {
        return MotionOutcome::branch(MotionBranch::GameOver);
    }
    if !ctx.input_enabled() {
        return MotionOutcome::branch(MotionBranch::Scripted);
    }

    let branch = if input.holds_right {
        move_right(ctx);
        MotionBranch::Right
    } else if input.holds_left && can_move_left(ctx) {
        move_left(ctx);
        MotionBranch::Left
    } else {
        stand(ctx);
        MotionBranch::Standing
    };

    let jumped = input.holds_up && try_jump(ctx);
    MotionOutcome { branch, jumped }
}

fn can_move_left(ctx: &GameContext) -> bool {
    let left_edge = ctx.body.x - ctx.body.width() / 2.0;
    left_edge > ctx.camera.scroll_x && !ctx.player.surfing
}

fn move_right(ctx: &mut GameContext) {
    let velocity = ctx.run_velocity() + ctx.player.velocity_base;
    ctx.set_velocity_x(velocity);
    ctx.flip_player(false);

    if !(ctx.player.jumping() || ctx.player.pushing_right) {
        if ctx.player.surfing {
            ctx.cue_board(BoardCue::Boost);
        } else {
            ctx.play_animation(PlayerAnimation::Run);
            ctx.audio.play("run");
        }
    }

    follow_past_center(ctx);
    ctx.player.pushing_left = false;
    if !ctx.player.pushing_right {
        ctx.audio.stop("push");
    }
}

fn move_left(ctx: &mut GameContext) {
    let velocity = -ctx.run_velocity() + ctx.player.velocity_base;
    ctx.set_velocity_x(velocity);
    ctx.flip_player(true);

    if !(ctx.player.jumping() || ctx.player.pushing_left) {
        ctx.play_animation(PlayerAnimation::Run);
        ctx.audio.play("run");
    }

    if !ctx.checkpoints().is_camera_locked(ctx.checkpoint()) {
        ctx.camera_stop_follow();
    }
    ctx.player.pushing_right = false;
    if !ctx.player.pushing_left {
        ctx.audio.stop("push");
    }
}

fn stand(ctx: &mut GameContext) {
    if !ctx.player.surfing {
        let base = ctx.player.velocity_base;
        ctx.set_velocity_x(base);
    }

    if !ctx.player.jumping() {
        ctx.play_animation(PlayerAnimation::Idle);
        if ctx.player.surfing {
            ctx.cue_board(BoardCue::Stop);
        } else {
            ctx.audio.stop("run");
        }
    }

    follow_past_center(ctx);
    ctx.player.clear_pushing();
    ctx.audio.stop("push");
}

fn follow_past_center(ctx: &mut GameContext) {
    let past_center = ctx.body.x - ctx.camera.scroll_x >= ctx.screen.width / 2.0;
    if past_center && ctx.camera.following_enabled {
        ctx.camera_start_follow();
    }
}

fn try_jump(ctx: &mut GameContext) -> bool {
    if ctx.player.jumping() || ctx.player.on_dashboard || !ctx.body.grounded() {
        return false;
    }

    let velocity = ctx.jump_velocity();
    ctx.set_velocity_y(velocity);
    ctx.play_animation(PlayerAnimation::Jump);
    if ctx.player.surfing {
        ctx.cue_board(BoardCue::Jump);
        ctx.audio.play_effect("jump-surf");
    } else {
        ctx.audio.play_effect("jump");
    }
    ctx.player.set_jumping(true);
    ctx.player.clear_pushing();
    ctx.audio.stop("run");
    true
}
