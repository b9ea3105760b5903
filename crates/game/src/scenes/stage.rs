use std::time::Duration;

use datarun_engine::{
    Contact, Cutscene, CutsceneStatus, EngineCommand, GameContext, PlayerAnimation, Rect,
    SceneId, SceneLifecycle, SoundKey, SpawnKind,
};
use tracing::{debug, info};

use super::kit::{SceneKit, TITLE_DURATION};

const FLYBY_DURATION: Duration = Duration::from_millis(6000);
const FLYBY_SIZE: f32 = 160.0;
const SPEECH_DURATION: Duration = Duration::from_millis(3000);
const FIREWORKS_DELAY: Duration = Duration::from_millis(600);
const RUNNING_TIME: Duration = Duration::from_millis(3800);
const OUTRO_DELAY: Duration = Duration::from_millis(3000);
const CONTROL_DELAY: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageCue {
    Title(&'static str),
    /// Decoration crossing the screen right to left.
    Flyby(&'static str),
}

/// Static description of a scene that only needs titles, hazards and
/// optional ambience.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StageLayout {
    pub(crate) id: u8,
    pub(crate) has_clear: bool,
    pub(crate) events: &'static [&'static str],
    pub(crate) cues: &'static [(&'static str, StageCue)],
    pub(crate) loop_sound: Option<SoundKey>,
    pub(crate) outro: bool,
}

pub(crate) const CLOUDS: StageLayout = StageLayout {
    id: 5,
    has_clear: true,
    events: &[],
    cues: &[],
    loop_sound: Some("snakes"),
    outro: false,
};

pub(crate) const OIL: StageLayout = StageLayout {
    id: 7,
    has_clear: true,
    events: &["harry", "title"],
    cues: &[
        ("harry", StageCue::Flyby("harry")),
        ("title", StageCue::Title("DATA IS THE NEW OIL")),
    ],
    loop_sound: None,
    outro: false,
};

pub(crate) const QUOTES: StageLayout = StageLayout {
    id: 8,
    has_clear: false,
    events: &[],
    cues: &[],
    loop_sound: None,
    outro: false,
};

pub(crate) const BRICKS: StageLayout = StageLayout {
    id: 9,
    has_clear: true,
    events: &[],
    cues: &[],
    loop_sound: None,
    outro: false,
};

pub(crate) const END_OFFICE: StageLayout = StageLayout {
    id: 11,
    has_clear: false,
    events: &[],
    cues: &[],
    loop_sound: None,
    outro: true,
};

enum Outro {
    Idle,
    WaitingToLand,
    Running(Cutscene<GameContext>),
}

pub(crate) struct StageScene {
    layout: StageLayout,
    kit: SceneKit,
    outro: Outro,
}

impl StageScene {
    pub(crate) fn new(layout: StageLayout) -> Self {
        Self {
            kit: SceneKit::new(layout.id),
            layout,
            outro: Outro::Idle,
        }
    }

    fn flyby(&mut self, ctx: &mut GameContext, name: &'static str) {
        let rect = Rect::new(
            ctx.body.x + ctx.screen.width * 0.5,
            ctx.screen.height * 0.25,
            FLYBY_SIZE,
            FLYBY_SIZE,
        );
        let handle = self.kit.spawn_extra(ctx, SpawnKind::Image, rect, name);
        let distance = ctx.screen.width + FLYBY_SIZE;
        ctx.push(EngineCommand::SetObjectVelocityX {
            handle,
            velocity_x: -distance / FLYBY_DURATION.as_secs_f32(),
        });
        ctx.scheduler.after(
            FLYBY_DURATION,
            Some(self.kit.id()),
            move |ctx: &mut GameContext| ctx.despawn(handle),
        );
    }

    fn begin_outro(&mut self, ctx: &mut GameContext) {
        ctx.set_input_enabled(false);
        if ctx.body.grounded() {
            self.finish(ctx);
        } else {
            ctx.set_velocity_x(0.0);
            self.outro = Outro::WaitingToLand;
            debug!("outro_waiting_to_land");
        }
    }

    fn finish(&mut self, ctx: &mut GameContext) {
        let velocity = ctx.run_velocity();
        ctx.set_velocity_x(velocity);
        ctx.play_animation(PlayerAnimation::Run);
        ctx.audio.play("run");
        ctx.audio.fade_in("ovation", 1.0, Duration::from_millis(500));
        self.kit.flash_title(ctx, "I GOT THE DATA!", SPEECH_DURATION);

        let cutscene = Cutscene::new("outro")
            .then(FIREWORKS_DELAY, |ctx: &mut GameContext| {
                ctx.audio
                    .fade_in("fireworks", 1.0, Duration::from_millis(150));
            })
            .then(RUNNING_TIME - FIREWORKS_DELAY, |ctx: &mut GameContext| {
                let base = ctx.player.velocity_base;
                ctx.set_velocity_x(base);
                ctx.play_animation(PlayerAnimation::Idle);
                ctx.audio.stop("run");
                ctx.audio.fade_out("ovation", OUTRO_DELAY);
            })
            .then(OUTRO_DELAY, |ctx: &mut GameContext| {
                ctx.audio.stop("fireworks");
                ctx.show_title("THANKS FOR PLAYING");
            })
            .then(CONTROL_DELAY, |ctx: &mut GameContext| {
                ctx.hide_title();
                ctx.give_control();
                info!("outro_finished");
            });
        self.outro = Outro::Running(cutscene);
        info!("outro_started");
    }
}

impl SceneLifecycle for StageScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn has_clear(&self) -> bool {
        self.layout.has_clear
    }

    fn custom_events(&self) -> &'static [&'static str] {
        self.layout.events
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
        if let Some(sound) = self.layout.loop_sound {
            ctx.audio.play(sound);
        }
        if self.layout.outro {
            self.begin_outro(ctx);
        }
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        if let Some(sound) = self.layout.loop_sound {
            ctx.audio.stop(sound);
        }
        if let Outro::Running(cutscene) = &mut self.outro {
            cutscene.cancel();
        }
        self.outro = Outro::Idle;
    }

    fn on_custom(&mut self, event: &'static str, ctx: &mut GameContext) {
        let cue = self
            .layout
            .cues
            .iter()
            .find(|(name, _)| *name == event)
            .map(|(_, cue)| *cue);
        match cue {
            Some(StageCue::Title(text)) => self.kit.flash_title(ctx, text, TITLE_DURATION),
            Some(StageCue::Flyby(name)) => self.flyby(ctx, name),
            None => debug!(scene = %self.kit.id(), event, "stage_event_without_cue"),
        }
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        match contact.kind {
            Some(SpawnKind::Hazard) => ctx.trigger_game_over(),
            _ => ctx.land_on_ground(),
        }
    }

    fn update(&mut self, dt: Duration, ctx: &mut GameContext) {
        match &mut self.outro {
            Outro::Idle => {}
            Outro::WaitingToLand => {
                if ctx.body.grounded() {
                    self.finish(ctx);
                }
            }
            Outro::Running(cutscene) => {
                if cutscene.advance(dt, ctx) == CutsceneStatus::Finished {
                    self.outro = Outro::Idle;
                }
            }
        }
    }
}
