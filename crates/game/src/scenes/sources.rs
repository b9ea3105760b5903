use std::time::Duration;

use datarun_engine::{
    Contact, ContactSide, GameContext, ObjectHandle, PlayerAnimation, Rect, SceneId,
    SceneLifecycle, SpawnKind,
};
use tracing::{debug, info};

use super::kit::SceneKit;

const SLOT_SUFFIX: &str = "-slot";
const BARRIER: &str = "barrier";
const SLOT_TOLERANCE: f32 = 24.0;
const SLOT_MARGIN: f32 = 12.0;
const SLOT_SINK: f32 = 20.0;
const SPEECH_DURATION: Duration = Duration::from_millis(3000);
const SPEECH_WIDTH: f32 = 240.0;
const SPEECH_HEIGHT: f32 = 160.0;

#[derive(Debug, Clone)]
struct Cube {
    handle: ObjectHandle,
    name: String,
    rect: Rect,
    slot: Rect,
    to_right: bool,
}

#[derive(Debug, Clone, Copy)]
struct Barrier {
    handle: ObjectHandle,
    rect: Rect,
}

/// Data sources: logo cubes pushed into their slots lower the barrier.
pub(crate) struct SourcesScene {
    kit: SceneKit,
    cubes: Vec<Cube>,
    placed: usize,
    barrier: Option<Barrier>,
}

impl SourcesScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(2),
            cubes: Vec::new(),
            placed: 0,
            barrier: None,
        }
    }

    fn collect_cubes(&mut self) {
        self.cubes = self
            .kit
            .objects()
            .filter(|object| object.kind == SpawnKind::PushBlock)
            .filter_map(|object| {
                let slot = self.kit.named(&format!("{}{SLOT_SUFFIX}", object.name))?;
                Some(Cube {
                    handle: object.handle,
                    name: object.name.clone(),
                    rect: object.rect,
                    slot: slot.rect,
                    to_right: slot.rect.x > object.rect.x,
                })
            })
            .collect();
        self.barrier = self.kit.named(BARRIER).map(|barrier| Barrier {
            handle: barrier.handle,
            rect: barrier.rect,
        });
    }

    fn push(&mut self, index: usize, side: ContactSide, ctx: &mut GameContext) {
        let cube = &self.cubes[index];
        let pushes_right = side == ContactSide::Right && cube.to_right;
        let pushes_left = side == ContactSide::Left && !cube.to_right;
        if !(pushes_right || pushes_left) {
            ctx.land_player();
            return;
        }

        ctx.play_animation(PlayerAnimation::Push);
        ctx.player.pushing_right = pushes_right;
        ctx.player.pushing_left = pushes_left;
        ctx.audio.play("push");
        ctx.audio.stop("run");

        let half_body = ctx.body.width() / 2.0;
        let cube_x = if pushes_right {
            ctx.body.x + half_body
        } else {
            ctx.body.x - half_body - cube.rect.width
        };
        let distance = cube.slot.right() - cube_x - cube.rect.width;
        if (0.0..=SLOT_TOLERANCE).contains(&distance) {
            self.place(index, ctx);
        }
    }

    /// Swaps the pushed cube for a static one resting in its slot.
    fn place(&mut self, index: usize, ctx: &mut GameContext) {
        let cube = self.cubes.remove(index);
        self.kit.remove(ctx, cube.handle);
        let placed = Rect::new(
            cube.slot.right() - cube.rect.width - SLOT_MARGIN,
            cube.slot.y - cube.rect.height + SLOT_SINK,
            cube.rect.width,
            cube.rect.height,
        );
        self.kit.spawn_extra(
            ctx,
            SpawnKind::Ground,
            placed,
            &format!("{}-placed", cube.name),
        );
        if cube.to_right {
            ctx.player.pushing_right = false;
        } else {
            ctx.player.pushing_left = false;
        }
        ctx.audio.stop("push");
        self.placed += 1;
        info!(cube = cube.name.as_str(), remaining = self.cubes.len(), "cube_placed");
        self.lower_barrier(ctx);
    }

    fn lower_barrier(&mut self, ctx: &mut GameContext) {
        let Some(barrier) = self.barrier.as_mut() else {
            return;
        };
        let step = barrier.rect.height / 8.0;
        let distance = if self.cubes.is_empty() {
            barrier.rect.height / 2.0 + step
        } else {
            step
        };
        barrier.rect.y += distance;
        ctx.move_object(barrier.handle, barrier.rect.x, barrier.rect.y);
        ctx.audio.play_effect("barrier");
        debug!(y = barrier.rect.y, open = self.cubes.is_empty(), "barrier_lowered");
    }

    fn show_speech(&mut self, ctx: &mut GameContext) {
        let body = ctx.body.profile.dimensions();
        let rect = Rect::new(
            ctx.body.x + SLOT_MARGIN * 2.0,
            ctx.body.y + body.offset_y - SPEECH_HEIGHT,
            SPEECH_WIDTH,
            SPEECH_HEIGHT,
        );
        let bubble = self
            .kit
            .spawn_extra(ctx, SpawnKind::Image, rect, "speech-broken-pipelines");
        ctx.scheduler.after(
            SPEECH_DURATION,
            Some(self.kit.id()),
            move |ctx: &mut GameContext| ctx.despawn(bubble),
        );
    }
}

impl SceneLifecycle for SourcesScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn custom_events(&self) -> &'static [&'static str] {
        &["speech"]
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
        self.placed = 0;
        self.collect_cubes();
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        self.cubes.clear();
        self.barrier = None;
        ctx.audio.stop("push");
    }

    fn on_custom(&mut self, event: &'static str, ctx: &mut GameContext) {
        if event == "speech" {
            self.show_speech(ctx);
        }
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        let cube = contact
            .object
            .and_then(|handle| self.cubes.iter().position(|cube| cube.handle == handle));
        match cube {
            Some(_) if ctx.player.jumping() && !ctx.body.touching_down => {}
            Some(index) => self.push(index, contact.side, ctx),
            None => ctx.land_on_ground(),
        }
    }
}
