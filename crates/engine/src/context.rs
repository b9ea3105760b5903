use std::rc::Rc;

use tracing::info;

use crate::audio::AudioDirector;
use crate::checkpoint::{CheckpointId, CheckpointTable};
use crate::commands::{EngineCommand, ObjectHandle, Rect};
use crate::content::{LevelData, SpawnDescriptor, SpawnKind};
use crate::player::{BodyProfile, PlayerAnimation, PlayerState, PlayerTuning};
use crate::scene::SceneId;
use crate::schedule::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSize {
    pub width: f32,
    pub height: f32,
}

impl Default for SceneSize {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 640.0,
        }
    }
}

/// Player body as last reported by the physics backend. `x` is the body's
/// horizontal center, `y` its feet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodySnapshot {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub on_floor: bool,
    pub touching_down: bool,
    pub profile: BodyProfile,
}

impl BodySnapshot {
    pub fn grounded(&self) -> bool {
        self.on_floor || self.touching_down
    }

    pub fn width(&self) -> f32 {
        self.profile.dimensions().width
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub scroll_x: f32,
    pub following: bool,
    pub following_enabled: bool,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            scroll_x: 0.0,
            following: false,
            following_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfBoard {
    pub owner: SceneId,
    pub handle: ObjectHandle,
}

/// Objects one scene publishes for the core and other scenes to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneOutputs {
    pub surf_board: Option<SurfBoard>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardCue {
    Boost,
    Stop,
    Jump,
}

/// Where a restart resumes: the last checkpoint (after a game over) or the
/// very beginning (after the outro).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    FromCheckpoint,
    FromBeginning,
}

#[derive(Debug, Clone, Default)]
struct PlayerSprite {
    animation: Option<String>,
    flipped: bool,
}

/// Everything a tick, a scene handler or a delayed callback may read or
/// mutate. Presentation effects are queued as [`EngineCommand`]s.
pub struct GameContext {
    pub player: PlayerState,
    pub tuning: PlayerTuning,
    pub screen: SceneSize,
    pub body: BodySnapshot,
    pub camera: CameraRig,
    pub audio: AudioDirector,
    pub scheduler: Scheduler<GameContext>,
    pub outputs: SceneOutputs,
    checkpoint: CheckpointId,
    checkpoints: Rc<CheckpointTable>,
    level: Rc<LevelData>,
    input_enabled: bool,
    game_over: bool,
    sprite: PlayerSprite,
    commands: Vec<EngineCommand>,
    board_cues: Vec<BoardCue>,
    pending_seek: Option<String>,
    pending_restart: Option<RestartMode>,
    checkpoint_dirty: bool,
    next_handle: u32,
}

impl GameContext {
    pub fn new(
        screen: SceneSize,
        tuning: PlayerTuning,
        checkpoints: Rc<CheckpointTable>,
        level: Rc<LevelData>,
    ) -> Self {
        Self {
            player: PlayerState::default(),
            tuning,
            screen,
            body: BodySnapshot::default(),
            camera: CameraRig::default(),
            audio: AudioDirector::default(),
            scheduler: Scheduler::default(),
            outputs: SceneOutputs::default(),
            checkpoint: checkpoints.base,
            checkpoints,
            level,
            input_enabled: true,
            game_over: false,
            sprite: PlayerSprite::default(),
            commands: Vec::new(),
            board_cues: Vec::new(),
            pending_seek: None,
            pending_restart: None,
            checkpoint_dirty: false,
            next_handle: 0,
        }
    }

    pub fn level(&self) -> Rc<LevelData> {
        Rc::clone(&self.level)
    }

    pub fn checkpoints(&self) -> Rc<CheckpointTable> {
        Rc::clone(&self.checkpoints)
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn foreground_y(&self) -> f32 {
        self.tuning.foreground_y(self.screen.height)
    }

    pub fn run_velocity(&self) -> f32 {
        self.tuning
            .run_velocity(self.screen.height, self.player.surfing)
    }

    pub fn jump_velocity(&self) -> f32 {
        self.tuning.jump_velocity(self.player.surfing)
    }

    pub fn push(&mut self, command: EngineCommand) {
        self.commands.push(command);
    }

    pub fn drain_commands(&mut self) -> Vec<EngineCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn pending_commands(&self) -> &[EngineCommand] {
        &self.commands
    }

    pub fn observe_body(&mut self, body: BodySnapshot, camera_scroll_x: f32) {
        self.body = body;
        self.camera.scroll_x = camera_scroll_x;
    }

    // --- checkpoint bookkeeping ---

    pub fn checkpoint(&self) -> CheckpointId {
        self.checkpoint
    }

    /// Records a reached checkpoint; the driver persists it after the tick.
    pub fn set_checkpoint(&mut self, checkpoint: CheckpointId) {
        if self.checkpoint != checkpoint {
            info!(checkpoint = %checkpoint, "checkpoint_reached");
        }
        self.checkpoint = checkpoint;
        self.checkpoint_dirty = true;
    }

    /// Sets the checkpoint without scheduling a write.
    pub fn restore_checkpoint(&mut self, checkpoint: CheckpointId) {
        self.checkpoint = checkpoint;
    }

    pub fn take_checkpoint_dirty(&mut self) -> bool {
        std::mem::take(&mut self.checkpoint_dirty)
    }

    pub fn request_seek(&mut self, event: impl Into<String>) {
        self.pending_seek = Some(event.into());
    }

    pub fn take_pending_seek(&mut self) -> Option<String> {
        self.pending_seek.take()
    }

    pub fn request_restart(&mut self, mode: RestartMode) {
        self.pending_restart = Some(mode);
    }

    pub fn take_pending_restart(&mut self) -> Option<RestartMode> {
        self.pending_restart.take()
    }

    // --- velocity / position ---

    pub fn set_velocity_x(&mut self, velocity_x: f32) {
        self.body.velocity_x = velocity_x;
        self.push(EngineCommand::SetVelocityX(velocity_x));
    }

    pub fn set_velocity_y(&mut self, velocity_y: f32) {
        self.body.velocity_y = velocity_y;
        self.push(EngineCommand::SetVelocityY(velocity_y));
    }

    pub fn set_acceleration_x(&mut self, acceleration_x: f32) {
        self.push(EngineCommand::SetAccelerationX(acceleration_x));
    }

    pub fn set_player_position(&mut self, x: f32, y: f32) {
        self.body.x = x;
        self.body.y = y;
        self.push(EngineCommand::SetPlayerPosition { x, y });
    }

    /// Pushes the body profile implied by the current mode flags, if it changed.
    pub fn refresh_body_profile(&mut self) {
        let profile = self.player.body_profile();
        if self.body.profile != profile {
            self.body.profile = profile;
            self.push(EngineCommand::SetBodyProfile(profile));
        }
    }

    // --- sprite ---

    pub fn play_animation(&mut self, animation: PlayerAnimation) {
        let key = animation.key(&self.player);
        if self.sprite.animation.as_deref() == Some(key.as_str()) {
            return;
        }
        self.sprite.animation = Some(key.clone());
        self.push(EngineCommand::PlayAnimation(key));
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.sprite.animation.as_deref()
    }

    pub fn stop_animation(&mut self) {
        self.sprite.animation = None;
        self.push(EngineCommand::StopAnimation);
    }

    pub fn flip_player(&mut self, flipped: bool) {
        if self.sprite.flipped != flipped {
            self.sprite.flipped = flipped;
            self.push(EngineCommand::FlipPlayer(flipped));
        }
    }

    pub fn player_flipped(&self) -> bool {
        self.sprite.flipped
    }

    // --- camera ---

    pub fn camera_start_follow(&mut self) {
        if !self.camera.following {
            self.camera.following = true;
            self.push(EngineCommand::CameraFollow(true));
        }
    }

    pub fn camera_stop_follow(&mut self) {
        if self.camera.following {
            self.camera.following = false;
            self.push(EngineCommand::CameraFollow(false));
        }
    }

    pub fn camera_scroll_to(&mut self, scroll_x: f32) {
        self.camera.scroll_x = scroll_x;
        self.push(EngineCommand::CameraScrollTo(scroll_x));
    }

    // --- board ---

    pub fn cue_board(&mut self, cue: BoardCue) {
        self.board_cues.push(cue);
    }

    pub fn take_board_cues(&mut self) -> Vec<BoardCue> {
        std::mem::take(&mut self.board_cues)
    }

    // --- scene objects ---

    pub fn allocate_handle(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    pub fn spawn(&mut self, owner: SceneId, descriptor: &SpawnDescriptor) -> ObjectHandle {
        let handle = self.allocate_handle();
        self.push(EngineCommand::Spawn {
            handle,
            owner,
            kind: descriptor.kind.clone(),
            rect: descriptor.rect(),
            label: descriptor.name.clone(),
        });
        handle
    }

    pub fn spawn_rect(
        &mut self,
        owner: SceneId,
        kind: SpawnKind,
        rect: Rect,
        label: &str,
    ) -> ObjectHandle {
        let handle = self.allocate_handle();
        self.push(EngineCommand::Spawn {
            handle,
            owner,
            kind,
            rect,
            label: label.to_string(),
        });
        handle
    }

    pub fn despawn(&mut self, handle: ObjectHandle) {
        self.push(EngineCommand::Despawn(handle));
    }

    pub fn move_object(&mut self, handle: ObjectHandle, x: f32, y: f32) {
        self.push(EngineCommand::MoveObject { handle, x, y });
    }

    /// Drops a scene's objects that scrolled fully off the left edge.
    pub fn clear_passed(&mut self, owner: SceneId) {
        let before_x = self.camera.scroll_x;
        self.push(EngineCommand::ClearPassed { owner, before_x });
    }

    pub fn show_title(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!(title = text.as_str(), "title_shown");
        self.push(EngineCommand::ShowTitle(text));
    }

    pub fn hide_title(&mut self) {
        self.push(EngineCommand::HideTitle);
    }

    // --- shared player transitions ---

    /// The single path that ends a jump or a slide.
    pub fn land_player(&mut self) {
        if self.player.jumping() && self.body.grounded() {
            self.player.set_jumping(false);
            self.play_animation(PlayerAnimation::Idle);
        } else if self.player.sliding() {
            self.player.end_slide();
            self.play_animation(PlayerAnimation::Idle);
            let base = self.player.velocity_base;
            self.set_velocity_x(base);
            self.input_enabled = true;
        }
    }

    /// Landing on plain ground also cancels any conveyor drift.
    pub fn land_on_ground(&mut self) {
        self.land_player();
        self.player.velocity_base = self.tuning.reset_velocity_x;
    }

    pub fn take_control(&mut self) {
        self.input_enabled = false;
        let base = self.player.velocity_base;
        self.set_velocity_x(base);
        self.play_animation(PlayerAnimation::Idle);
    }

    pub fn give_control(&mut self) {
        self.input_enabled = true;
    }

    pub fn trigger_game_over(&mut self) {
        if self.game_over {
            return;
        }
        self.game_over = true;
        info!(checkpoint = %self.checkpoint, "game_over");
        self.push(EngineCommand::PausePhysics);
        self.scheduler.clear();
        self.stop_animation();
        self.audio.cancel_fades();
        self.audio.play_effect("game-over");
        self.audio.stop_long_sounds();
        self.show_title("GAME OVER");
    }

    /// State for a fresh (re)start of the level.
    pub fn reset_for_start(&mut self) {
        self.game_over = false;
        self.input_enabled = true;
        self.player.reset(self.tuning.reset_velocity_x);
        self.camera = CameraRig::default();
        self.outputs = SceneOutputs::default();
        self.sprite = PlayerSprite::default();
        self.scheduler.clear();
        self.audio.cancel_fades();
        self.board_cues.clear();
        self.pending_seek = None;
        self.pending_restart = None;
        self.body.profile = BodyProfile::Standard;
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> GameContext {
    GameContext::new(
        SceneSize::default(),
        PlayerTuning::default(),
        Rc::new(CheckpointTable::default()),
        Rc::new(LevelData::default()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn land_player_ends_jump_only_when_grounded() {
        let mut ctx = test_context();
        ctx.player.set_jumping(true);

        ctx.land_player();
        assert!(ctx.player.jumping());

        ctx.body.on_floor = true;
        ctx.land_player();
        assert!(!ctx.player.jumping());
        assert_eq!(ctx.current_animation(), Some("player-idle"));
    }

    #[test]
    fn land_player_ends_slide_and_restores_input() {
        let mut ctx = test_context();
        ctx.player.begin_slide();
        ctx.player.velocity_base = 120.0;
        ctx.set_input_enabled(false);

        ctx.land_player();

        assert!(!ctx.player.sliding());
        assert!(ctx.input_enabled());
        assert!(ctx
            .pending_commands()
            .contains(&EngineCommand::SetVelocityX(120.0)));
    }

    #[test]
    fn ground_landing_resets_base_velocity() {
        let mut ctx = test_context();
        ctx.player.velocity_base = 250.0;

        ctx.land_on_ground();

        assert!(ctx.player.velocity_base.abs() < 0.0001);
    }

    #[test]
    fn repeated_animation_is_not_reissued() {
        let mut ctx = test_context();
        ctx.play_animation(PlayerAnimation::Run);
        ctx.play_animation(PlayerAnimation::Run);

        let plays = ctx
            .drain_commands()
            .into_iter()
            .filter(|command| matches!(command, EngineCommand::PlayAnimation(_)))
            .count();
        assert_eq!(plays, 1);
    }

    #[test]
    fn camera_follow_commands_only_on_transition() {
        let mut ctx = test_context();
        ctx.camera_start_follow();
        ctx.camera_start_follow();
        ctx.camera_stop_follow();
        ctx.camera_stop_follow();

        assert_eq!(
            ctx.drain_commands(),
            vec![
                EngineCommand::CameraFollow(true),
                EngineCommand::CameraFollow(false)
            ]
        );
    }

    #[test]
    fn game_over_pauses_once_and_clears_timers() {
        let mut ctx = test_context();
        ctx.scheduler
            .after(std::time::Duration::from_secs(1), None, |_| {});
        ctx.audio.play("run");
        ctx.audio.drain();

        ctx.trigger_game_over();
        ctx.trigger_game_over();

        assert!(ctx.is_game_over());
        assert_eq!(ctx.scheduler.pending(), 0);
        assert!(!ctx.audio.is_playing("run"));
        let pauses = ctx
            .drain_commands()
            .into_iter()
            .filter(|command| *command == EngineCommand::PausePhysics)
            .count();
        assert_eq!(pauses, 1);
    }

    #[test]
    fn set_checkpoint_marks_dirty_once() {
        let mut ctx = test_context();
        ctx.set_checkpoint(CheckpointId(4.0));

        assert!(ctx.take_checkpoint_dirty());
        assert!(!ctx.take_checkpoint_dirty());
        assert_eq!(ctx.checkpoint(), CheckpointId(4.0));
    }

    #[test]
    fn body_profile_refresh_follows_mode_flags() {
        let mut ctx = test_context();
        ctx.player.surfing = true;
        ctx.refresh_body_profile();
        ctx.refresh_body_profile();

        assert_eq!(
            ctx.drain_commands(),
            vec![EngineCommand::SetBodyProfile(BodyProfile::Surf)]
        );
    }
}
