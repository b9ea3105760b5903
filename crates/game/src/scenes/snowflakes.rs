use std::time::Duration;

use datarun_engine::{
    Contact, GameContext, ObjectHandle, PickupItem, PlayerAnimation, Rect, RestartMode, SceneId,
    SceneLifecycle, SpawnKind,
};
use tracing::{debug, info};

use super::kit::{SceneKit, TITLE_DURATION};

const FLAKE_PREFIX: &str = "snowflake-";
const SNOW_POINTS: f32 = 100.0;
const MELT_PER_CONTACT: f32 = 4.0;
const FALL_DURATION: Duration = Duration::from_millis(3500);
const WALL_GAP: f32 = 300.0;
const WALL_WIDTH: f32 = 100.0;
const RESTART_DELAY: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone)]
struct Flake {
    handle: ObjectHandle,
    wave: u8,
    rect: Rect,
    points: f32,
    fall_speed: Option<f32>,
}

impl Flake {
    fn center_x(&self) -> f32 {
        self.rect.x + self.rect.width / 2.0
    }
}

/// `snowflake-<wave>-<n>` names the wave a flake falls with.
fn flake_wave(name: &str) -> Option<u8> {
    let rest = name.strip_prefix(FLAKE_PREFIX)?;
    let (wave, _) = rest.split_once('-')?;
    wave.parse().ok()
}

/// Secret level: melt every falling snowflake with the flamethrower.
pub(crate) struct SnowflakesScene {
    kit: SceneKit,
    flakes: Vec<Flake>,
    melted_all: bool,
}

impl SnowflakesScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(12),
            flakes: Vec::new(),
            melted_all: false,
        }
    }

    fn build_wall(&mut self, ctx: &mut GameContext) {
        let height = ctx.tuning.sprite_height * 1.5;
        let rect = Rect::new(
            ctx.body.x - WALL_GAP - WALL_WIDTH,
            ctx.foreground_y() - height,
            WALL_WIDTH,
            height,
        );
        self.kit.spawn_extra(ctx, SpawnKind::Ground, rect, "snow-wall");
    }

    fn release_wave(&mut self, wave: u8, ctx: &GameContext) {
        let ground = ctx.foreground_y();
        let mut released = 0;
        for flake in self.flakes.iter_mut().filter(|flake| flake.wave == wave) {
            let distance = (ground - flake.rect.bottom()).max(0.0);
            flake.fall_speed = Some(distance / FALL_DURATION.as_secs_f32());
            released += 1;
        }
        debug!(wave, released, "snowflakes_released");
    }

    fn pick_up_gun(&mut self, handle: Option<ObjectHandle>, ctx: &mut GameContext) {
        if let Some(handle) = handle {
            self.kit.remove(ctx, handle);
        }
        if ctx.player.with_gun {
            return;
        }
        ctx.player.with_gun = true;
        ctx.refresh_body_profile();
        ctx.audio.play("flamethrower");
        info!("gun_picked_up");
    }

    fn touch_flake(&mut self, index: usize, ctx: &mut GameContext) {
        let flake = &mut self.flakes[index];
        let ahead = flake.center_x() > ctx.body.x;
        let facing = ahead != ctx.player_flipped();
        if !(ctx.player.with_gun && facing) {
            ctx.trigger_game_over();
            return;
        }

        flake.points -= MELT_PER_CONTACT;
        if flake.points > 0.0 {
            return;
        }
        let flake = self.flakes.remove(index);
        self.kit.remove(ctx, flake.handle);
        debug!(remaining = self.flakes.len(), "snowflake_melted");
        if self.flakes.is_empty() {
            self.finish(ctx);
        }
    }

    fn finish(&mut self, ctx: &mut GameContext) {
        self.melted_all = true;
        ctx.player.with_gun = false;
        ctx.refresh_body_profile();
        ctx.audio.fade_out("flamethrower", Duration::from_millis(500));
        ctx.flip_player(false);
        ctx.play_animation(PlayerAnimation::Idle);
        ctx.audio.stop("run");
        let base = ctx.player.velocity_base;
        ctx.set_velocity_x(base);
        ctx.set_input_enabled(false);
        self.kit.flash_title(
            ctx,
            "CONGRATS! YOU'VE MELTED ALL THE SNOWFLAKES!",
            RESTART_DELAY,
        );
        ctx.scheduler
            .after(RESTART_DELAY, Some(self.kit.id()), |ctx: &mut GameContext| {
                ctx.request_restart(RestartMode::FromBeginning)
            });
        info!("snowflakes_melted");
    }
}

impl SceneLifecycle for SnowflakesScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn has_clear(&self) -> bool {
        false
    }

    fn custom_events(&self) -> &'static [&'static str] {
        &["snowflakes1", "snowflakes2", "snowflakes3"]
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
        self.melted_all = false;
        self.flakes = self
            .kit
            .objects()
            .filter(|object| object.kind == SpawnKind::Hazard)
            .filter_map(|object| {
                Some(Flake {
                    handle: object.handle,
                    wave: flake_wave(&object.name)?,
                    rect: object.rect,
                    points: SNOW_POINTS,
                    fall_speed: None,
                })
            })
            .collect();
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
        self.kit.flash_title(ctx, "SECRET LEVEL UNLOCKED!", TITLE_DURATION);
        self.build_wall(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        self.flakes.clear();
        ctx.audio.stop("flamethrower");
    }

    fn on_custom(&mut self, event: &'static str, ctx: &mut GameContext) {
        let wave = event
            .strip_prefix("snowflakes")
            .and_then(|wave| wave.parse().ok());
        if let Some(wave) = wave {
            self.release_wave(wave, ctx);
        }
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        let flake = contact
            .object
            .and_then(|handle| self.flakes.iter().position(|flake| flake.handle == handle));
        match (&contact.kind, flake) {
            (_, Some(index)) => self.touch_flake(index, ctx),
            (Some(SpawnKind::Pickup { item: PickupItem::Gun }), None) => {
                self.pick_up_gun(contact.object, ctx)
            }
            (Some(SpawnKind::Hazard), None) => ctx.trigger_game_over(),
            _ => ctx.land_on_ground(),
        }
    }

    fn update(&mut self, dt: Duration, ctx: &mut GameContext) {
        let ground = ctx.foreground_y();
        for flake in &mut self.flakes {
            let Some(speed) = flake.fall_speed else {
                continue;
            };
            let resting_y = ground - flake.rect.height;
            let y = (flake.rect.y + speed * dt.as_secs_f32()).min(resting_y);
            if (y - flake.rect.y).abs() > f32::EPSILON {
                flake.rect.y = y;
                ctx.move_object(flake.handle, flake.rect.x, y);
            }
            if y >= resting_y {
                flake.fall_speed = None;
            }
        }
    }
}
