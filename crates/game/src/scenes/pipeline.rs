use datarun_engine::{
    CheckpointId, Contact, ContactSide, GameContext, ObjectHandle, PlayerAnimation, SceneId,
    SceneLifecycle, SpawnKind,
};
use tracing::info;

use super::kit::SceneKit;

/// Broken pipelines: landing on a pipe starts an uncontrolled slide that
/// the shared landing path ends.
pub(crate) struct PipelineScene {
    kit: SceneKit,
    last_pipe: Option<ObjectHandle>,
    slided: bool,
}

impl PipelineScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(3),
            last_pipe: None,
            slided: false,
        }
    }

    fn start_slide(&self, ctx: &mut GameContext) {
        ctx.set_input_enabled(false);
        ctx.player.begin_slide();
        let velocity = ctx.run_velocity();
        ctx.set_velocity_x(velocity);
        ctx.play_animation(PlayerAnimation::Slide);
        ctx.flip_player(false);
        if ctx.camera.following_enabled {
            ctx.camera_start_follow();
        }
        ctx.audio.play("slide");
        info!("slide_started");
    }

    fn on_pipe(&mut self, pipe: ObjectHandle, side: ContactSide, ctx: &mut GameContext) {
        let past_pipeline = ctx.checkpoint() > CheckpointId(3.0);
        if Some(pipe) == self.last_pipe || past_pipeline {
            self.slided = true;
            ctx.audio.stop("slide");
        }
        if self.slided {
            if ctx.player.sliding() || ctx.player.jumping() {
                ctx.land_player();
            }
            return;
        }
        if side == ContactSide::Down && !ctx.player.sliding() {
            self.start_slide(ctx);
        }
    }
}

impl SceneLifecycle for PipelineScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn has_clear(&self) -> bool {
        false
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.slided = false;
        self.kit.spawn_level_objects(ctx);
        self.last_pipe = self
            .kit
            .objects()
            .filter(|object| object.kind == SpawnKind::Slide)
            .max_by(|left, right| left.rect.x.total_cmp(&right.rect.x))
            .map(|object| object.handle);
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        self.last_pipe = None;
        ctx.audio.stop("slide");
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        match (contact.kind.as_ref(), contact.object) {
            (Some(SpawnKind::Slide), Some(pipe)) => self.on_pipe(pipe, contact.side, ctx),
            _ => ctx.land_on_ground(),
        }
    }
}
