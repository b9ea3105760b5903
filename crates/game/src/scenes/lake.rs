use std::time::Duration;

use datarun_engine::{
    BoardCue, Contact, ContactSide, EngineCommand, GameContext, ObjectHandle, PlayerAnimation,
    Rect, SceneId, SceneLifecycle, SpawnKind, SurfBoard,
};
use tracing::{debug, info};

use super::kit::{SceneKit, TITLE_DURATION};

const SURF_IN_FACTOR: f32 = 0.75;
const TSUNAMI_FACTOR: f32 = 1.075;
const TSUNAMI_WIDTH: f32 = 480.0;
const LAST_SAND: &str = "last-sand";
const SAND_JUMP_AT: f32 = 0.4;
const FADE: Duration = Duration::from_millis(500);
const BOOST_FADE: Duration = Duration::from_millis(50);

/// Data lake: the player surfs across on a board and outruns the wave.
pub(crate) struct LakeScene {
    kit: SceneKit,
    board: Option<ObjectHandle>,
    tsunami: Option<ObjectHandle>,
    braking: bool,
}

impl LakeScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(6),
            board: None,
            tsunami: None,
            braking: false,
        }
    }

    fn mount_board(&mut self, ctx: &mut GameContext) {
        ctx.player.surfing = true;
        ctx.land_player();
        ctx.refresh_body_profile();
        if let Some(board) = self.board.take() {
            self.kit.remove(ctx, board);
        }
        ctx.give_control();
        let velocity = ctx.run_velocity() * SURF_IN_FACTOR;
        ctx.set_velocity_x(velocity);
        info!("surfing_started");
    }

    fn release_wave(&mut self, ctx: &mut GameContext) {
        self.kit.flash_title(ctx, "BIG DATA WAVE", TITLE_DURATION);
        ctx.audio.fade_out_background();
        ctx.audio.fade_in("tsunami", 1.0, FADE);

        let height = ctx.screen.height * 0.8;
        let rect = Rect::new(
            ctx.camera.scroll_x - TSUNAMI_WIDTH,
            ctx.foreground_y() - height,
            TSUNAMI_WIDTH,
            height,
        );
        let handle = self.kit.spawn_extra(ctx, SpawnKind::Hazard, rect, "tsunami");
        let velocity_x = ctx.run_velocity() * TSUNAMI_FACTOR;
        ctx.push(EngineCommand::SetObjectVelocityX { handle, velocity_x });
        self.tsunami = Some(handle);
        info!(velocity_x, "tsunami_released");
    }

    fn jump_off_board(&mut self, ctx: &mut GameContext) {
        let run = ctx.run_velocity();
        let jump = ctx.jump_velocity();
        ctx.set_velocity_x(run);
        ctx.set_velocity_y(jump);
        ctx.set_acceleration_x(0.0);
        ctx.set_input_enabled(false);
        ctx.player.surfing = false;
        ctx.player.begin_slide();
        ctx.play_animation(PlayerAnimation::Jump);
        ctx.refresh_body_profile();
        ctx.audio.stop("motorboat");
        self.braking = false;
        if let Some(tsunami) = self.tsunami.take() {
            self.kit.remove(ctx, tsunami);
            ctx.audio.fade_out("tsunami", FADE);
        }
        info!("surfing_finished");
    }
}

impl SceneLifecycle for LakeScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn checkpoint_stages(&self) -> u8 {
        2
    }

    fn custom_events(&self) -> &'static [&'static str] {
        &["swamp", "wave"]
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
        self.board = self.kit.first_of(|kind| *kind == SpawnKind::Board);
        if let Some(handle) = self.board {
            ctx.outputs.surf_board = Some(SurfBoard {
                owner: self.kit.id(),
                handle,
            });
        }
    }

    fn on_checkpoint(&mut self, stage: u8, ctx: &mut GameContext) {
        debug!(stage, "lake_checkpoint");
        self.kit.enter_checkpoint(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        self.board = None;
        self.tsunami = None;
        self.braking = false;
        if ctx
            .outputs
            .surf_board
            .is_some_and(|board| board.owner == self.kit.id())
        {
            ctx.outputs.surf_board = None;
        }
        ctx.audio.stop("tsunami");
        ctx.audio.stop("motorboat");
    }

    fn on_custom(&mut self, event: &'static str, ctx: &mut GameContext) {
        match event {
            "swamp" => self.kit.flash_title(ctx, "DATA SWAMP", TITLE_DURATION),
            "wave" => self.release_wave(ctx),
            _ => {}
        }
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        match contact.kind {
            Some(SpawnKind::Hazard) => ctx.trigger_game_over(),
            Some(SpawnKind::Board) if !ctx.player.surfing => {
                if contact.side == ContactSide::Down {
                    self.mount_board(ctx);
                }
            }
            _ if ctx.player.surfing => ctx.land_player(),
            _ => ctx.land_on_ground(),
        }
    }

    fn on_board_cue(&mut self, cue: BoardCue, ctx: &mut GameContext) {
        match cue {
            BoardCue::Boost => {
                self.braking = false;
                ctx.audio.fade_in("motorboat", 1.0, BOOST_FADE);
            }
            BoardCue::Stop => {
                ctx.audio.fade_out("motorboat", FADE);
                let base = ctx.player.velocity_base;
                if ctx.body.velocity_x > base {
                    if !self.braking {
                        let deceleration =
                            ctx.tuning.board_stop_deceleration * ctx.screen.height;
                        ctx.set_acceleration_x(-deceleration);
                        self.braking = true;
                    }
                } else {
                    ctx.set_velocity_x(base);
                    ctx.set_acceleration_x(0.0);
                }
            }
            BoardCue::Jump => {
                self.braking = false;
                ctx.set_acceleration_x(0.0);
            }
        }
    }

    fn update(&mut self, _dt: Duration, ctx: &mut GameContext) {
        let base = ctx.player.velocity_base;
        if self.braking && ctx.body.velocity_x <= base {
            self.braking = false;
            ctx.set_velocity_x(base);
            ctx.set_acceleration_x(0.0);
        }

        if !ctx.player.surfing {
            return;
        }
        let Some(sand) = self.kit.named(LAST_SAND).map(|sand| sand.rect) else {
            return;
        };
        if ctx.body.x > sand.x + sand.width * SAND_JUMP_AT {
            self.jump_off_board(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenes::kit::test_support::{context_with, descriptor, despawned, titles};

    const DT: Duration = Duration::from_millis(10);

    fn loaded() -> (LakeScene, GameContext) {
        let mut ctx = context_with(vec![
            descriptor(6, "board", 14_000.0, SpawnKind::Board),
            descriptor(6, "water", 14_000.0, SpawnKind::Ground),
            descriptor(6, LAST_SAND, 18_000.0, SpawnKind::Ground),
        ]);
        let mut scene = LakeScene::new();
        scene.preload(&mut ctx);
        (scene, ctx)
    }

    fn contact(kind: SpawnKind, side: ContactSide) -> Contact {
        Contact {
            object: None,
            owner: Some(SceneId(6)),
            kind: Some(kind),
            side,
        }
    }

    fn surfing() -> (LakeScene, GameContext) {
        let (mut scene, mut ctx) = loaded();
        ctx.player.set_jumping(true);
        ctx.set_input_enabled(false);
        ctx.body.touching_down = true;
        scene.on_contact(&contact(SpawnKind::Board, ContactSide::Down), &mut ctx);
        (scene, ctx)
    }

    #[test]
    fn preload_publishes_the_board() {
        let (scene, ctx) = loaded();

        let board = ctx.outputs.surf_board.expect("board published");
        assert_eq!(board.owner, SceneId(6));
        assert_eq!(Some(board.handle), scene.board);
        assert_eq!(
            scene.registrations().len(),
            6,
            "load, two checkpoints, clear and two customs"
        );
    }

    #[test]
    fn landing_on_the_board_starts_surfing() {
        let (scene, ctx) = surfing();

        assert!(ctx.player.surfing);
        assert!(!ctx.player.jumping());
        assert!(ctx.input_enabled());
        assert!(scene.board.is_none());
        assert_eq!(despawned(&ctx).len(), 1);
        assert!(ctx.pending_commands().iter().any(|command| matches!(
            command,
            EngineCommand::SetBodyProfile(_)
        )));
        assert!(ctx.outputs.surf_board.is_some());
    }

    #[test]
    fn stop_cue_brakes_until_base_velocity() {
        let (mut scene, mut ctx) = surfing();
        ctx.body.velocity_x = 400.0;

        scene.on_board_cue(BoardCue::Stop, &mut ctx);
        assert!(scene.braking);
        assert!(ctx
            .pending_commands()
            .iter()
            .any(|command| matches!(command, EngineCommand::SetAccelerationX(a) if *a < 0.0)));

        ctx.body.velocity_x = -1.0;
        scene.update(DT, &mut ctx);
        assert!(!scene.braking);
        assert!(ctx.body.velocity_x.abs() < 0.0001);
        assert_eq!(
            ctx.pending_commands().last(),
            Some(&EngineCommand::SetAccelerationX(0.0))
        );
    }

    #[test]
    fn boost_cue_starts_the_motor_and_cancels_braking() {
        let (mut scene, mut ctx) = surfing();
        scene.braking = true;

        scene.on_board_cue(BoardCue::Boost, &mut ctx);

        assert!(!scene.braking);
        assert!(ctx.audio.is_playing("motorboat"));
    }

    #[test]
    fn wave_chases_the_player() {
        let (mut scene, mut ctx) = surfing();

        scene.on_custom("wave", &mut ctx);

        let tsunami = scene.tsunami.expect("tsunami spawned");
        assert!(titles(&ctx).contains(&"BIG DATA WAVE".to_string()));
        assert!(ctx.audio.is_playing("tsunami"));
        assert!(ctx.pending_commands().iter().any(|command| matches!(
            command,
            EngineCommand::SetObjectVelocityX { handle, velocity_x } if *handle == tsunami && *velocity_x > 0.0
        )));

        scene.on_contact(&contact(SpawnKind::Hazard, ContactSide::Overlap), &mut ctx);
        assert!(ctx.is_game_over());
    }

    #[test]
    fn reaching_the_sand_jumps_off_the_board() {
        let (mut scene, mut ctx) = surfing();
        scene.on_custom("wave", &mut ctx);
        let tsunami = scene.tsunami.expect("tsunami");
        ctx.body.x = 18_000.0 + 100.0 * SAND_JUMP_AT + 1.0;

        scene.update(DT, &mut ctx);

        assert!(!ctx.player.surfing);
        assert!(ctx.player.sliding());
        assert!(!ctx.input_enabled());
        assert!(scene.tsunami.is_none());
        assert!(despawned(&ctx).contains(&tsunami));

        ctx.body.touching_down = true;
        scene.on_contact(&contact(SpawnKind::Ground, ContactSide::Down), &mut ctx);
        assert!(!ctx.player.sliding());
        assert!(ctx.input_enabled());
    }

    #[test]
    fn clear_withdraws_the_board_and_sounds() {
        let (mut scene, mut ctx) = surfing();
        ctx.audio.play("motorboat");

        scene.on_clear(&mut ctx);

        assert!(ctx.outputs.surf_board.is_none());
        assert!(!ctx.audio.is_playing("motorboat"));
    }
}
