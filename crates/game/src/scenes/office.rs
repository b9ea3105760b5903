use std::time::Duration;

use datarun_engine::{
    Cutscene, CutsceneStatus, EngineCommand, GameContext, ObjectHandle, PlayerAnimation, Rect,
    SceneId, SceneLifecycle, SpawnKind, BACKGROUND_VOLUME,
};
use tracing::info;

use super::kit::SceneKit;

const INTRO_SCREEN: Duration = Duration::from_millis(1500);
const RUN_IN_FIRST: Duration = Duration::from_millis(2750);
const RUN_IN_SECOND: Duration = Duration::from_millis(2800);
const CLOUD_FIRST: Duration = Duration::from_millis(1200);
const CLOUD_SECOND: Duration = Duration::from_millis(2400);
const BETWEEN: Duration = Duration::from_millis(500);
const RUN_IN_FACTOR: f32 = 0.75;
const CLOUD_WIDTH: f32 = 220.0;
const CLOUD_HEIGHT: f32 = 140.0;

/// Opening office: the managers hand out the task before control is given.
pub(crate) struct OfficeScene {
    kit: SceneKit,
    clouds: Option<(ObjectHandle, ObjectHandle)>,
    intro: Option<Cutscene<GameContext>>,
}

impl OfficeScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(1),
            clouds: None,
            intro: None,
        }
    }

    fn spawn_clouds(&mut self, ctx: &mut GameContext) -> (ObjectHandle, ObjectHandle) {
        let office = self
            .kit
            .named("office")
            .map(|office| office.rect)
            .unwrap_or_else(|| {
                let height = ctx.screen.height * 0.6;
                Rect::new(0.0, ctx.foreground_y() - height, ctx.screen.width, height)
            });
        let first = Rect::new(
            office.x + office.width * 0.605,
            office.y - office.height * 0.4 + office.height,
            CLOUD_WIDTH,
            CLOUD_HEIGHT,
        );
        let second = Rect::new(
            office.x + office.width * 0.506,
            office.y - office.height * 0.42 + office.height,
            CLOUD_WIDTH,
            CLOUD_HEIGHT,
        );
        let first = self
            .kit
            .spawn_extra(ctx, SpawnKind::Image, first, "office-cloud1");
        let second = self
            .kit
            .spawn_extra(ctx, SpawnKind::Image, second, "office-cloud2");
        self.kit.set_visible_with_prefix(ctx, "office-cloud", false);
        (first, second)
    }
}

fn run_in(ctx: &mut GameContext) {
    let velocity = ctx.run_velocity() * RUN_IN_FACTOR;
    ctx.set_velocity_x(velocity);
    ctx.play_animation(PlayerAnimation::Run);
}

fn stop_running(ctx: &mut GameContext) {
    let base = ctx.player.velocity_base;
    ctx.set_velocity_x(base);
    ctx.play_animation(PlayerAnimation::Idle);
}

fn show(ctx: &mut GameContext, handle: ObjectHandle, visible: bool) {
    ctx.push(EngineCommand::SetObjectVisible { handle, visible });
}

fn intro(first: ObjectHandle, second: ObjectHandle) -> Cutscene<GameContext> {
    Cutscene::new("office_intro")
        .then(INTRO_SCREEN, |ctx: &mut GameContext| {
            ctx.hide_title();
            if ctx.camera.following_enabled {
                ctx.camera_start_follow();
            }
            ctx.audio
                .fade_in("background", BACKGROUND_VOLUME, Duration::from_secs(1));
            run_in(ctx);
        })
        .then(RUN_IN_FIRST, stop_running)
        .then(BETWEEN, move |ctx: &mut GameContext| {
            show(ctx, first, true);
            ctx.audio.play_effect("manager1");
        })
        .then(CLOUD_FIRST, move |ctx: &mut GameContext| show(ctx, first, false))
        .then(BETWEEN, move |ctx: &mut GameContext| {
            show(ctx, second, true);
            ctx.audio.play_effect("manager2");
            ctx.flip_player(true);
        })
        .then(CLOUD_SECOND, move |ctx: &mut GameContext| show(ctx, second, false))
        .then(BETWEEN, |ctx: &mut GameContext| {
            ctx.flip_player(false);
            run_in(ctx);
        })
        .then(RUN_IN_SECOND, |ctx: &mut GameContext| {
            stop_running(ctx);
            ctx.give_control();
            info!("intro_finished");
        })
}

impl SceneLifecycle for OfficeScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn starts_game(&self) -> bool {
        true
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
        self.clouds = Some(self.spawn_clouds(ctx));
    }

    fn on_checkpoint(&mut self, _stage: u8, _ctx: &mut GameContext) {}

    fn on_start(&mut self, ctx: &mut GameContext) {
        let Some((first, second)) = self.clouds else {
            return;
        };
        ctx.set_input_enabled(false);
        ctx.show_title("DATA RUN");
        self.intro = Some(intro(first, second));
        info!("intro_started");
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        if let Some(intro) = self.intro.as_mut() {
            intro.cancel();
        }
        self.intro = None;
        self.clouds = None;
        self.kit.despawn_all(ctx);
    }

    fn update(&mut self, dt: Duration, ctx: &mut GameContext) {
        let Some(intro) = self.intro.as_mut() else {
            return;
        };
        if intro.advance(dt, ctx) == CutsceneStatus::Finished {
            self.intro = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::scenes::kit::test_support::{context_with, descriptor, titles};
    use super::*;

    const DT: Duration = Duration::from_millis(10);

    fn started() -> (OfficeScene, GameContext) {
        let mut ctx = context_with(vec![descriptor(1, "office", 0.0, SpawnKind::Image)]);
        let mut scene = OfficeScene::new();
        scene.preload(&mut ctx);
        scene.on_start(&mut ctx);
        (scene, ctx)
    }

    fn run_for(scene: &mut OfficeScene, ctx: &mut GameContext, total: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            scene.update(DT, ctx);
            elapsed += DT;
        }
    }

    #[test]
    fn start_takes_input_away_and_shows_intro_title() {
        let (_scene, ctx) = started();

        assert!(!ctx.input_enabled());
        assert_eq!(titles(&ctx), vec!["DATA RUN".to_string()]);
    }

    #[test]
    fn intro_speaks_and_turns_around_mid_way() {
        let (mut scene, mut ctx) = started();

        run_for(
            &mut scene,
            &mut ctx,
            INTRO_SCREEN + RUN_IN_FIRST + BETWEEN * 2 + CLOUD_FIRST + Duration::from_millis(50),
        );

        assert!(ctx.player_flipped());
        assert!(!ctx.input_enabled());
        assert!(ctx.camera.following);
    }

    #[test]
    fn intro_gives_control_back_at_the_end() {
        let (mut scene, mut ctx) = started();

        run_for(&mut scene, &mut ctx, Duration::from_millis(12_500));

        assert!(ctx.input_enabled());
        assert!(!ctx.player_flipped());
        assert!(scene.intro.is_none());
        assert_eq!(ctx.current_animation(), Some("player-idle"));
    }

    #[test]
    fn clear_cancels_a_running_intro() {
        let (mut scene, mut ctx) = started();
        run_for(&mut scene, &mut ctx, Duration::from_millis(100));

        scene.on_clear(&mut ctx);
        scene.on_clear(&mut ctx);
        run_for(&mut scene, &mut ctx, Duration::from_millis(12_500));

        assert!(!ctx.input_enabled());
        assert!(scene.intro.is_none());
    }
}
