use std::rc::Rc;
use std::time::Duration;

use tracing::{info, warn};

use crate::checkpoint::{CheckpointId, CheckpointManager, LaunchParams, Placement};
use crate::commands::{Contact, EngineCommand};
use crate::content::{GameConfig, LevelData, Progress, ProgressStore};
use crate::context::{BodySnapshot, GameContext, RestartMode, SceneSize};
use crate::dispatch::{contain, DispatchOutcome, EventDispatcher};
use crate::motion::{resolve_motion, MotionInput, MotionOutcome};
use crate::scene::{RegistrationReport, SceneLifecycle, SceneRegistry};
use crate::timeline::{TimelineError, TimelineIndex};

/// Presentation side of the game: physics, camera and audio playback.
/// Commands are applied before the next physics step.
pub trait EngineBackend {
    fn apply(&mut self, commands: Vec<EngineCommand>);
    fn step(&mut self, dt: Duration);
    fn body(&self) -> BodySnapshot;
    fn camera_scroll_x(&self) -> f32;
    /// Contacts produced by the last physics step.
    fn take_contacts(&mut self) -> Vec<Contact>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub motion: MotionInput,
    pub restart: bool,
    pub toggle_mute: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub motion: Option<MotionOutcome>,
    pub fired: Option<(String, DispatchOutcome)>,
    pub restarted: bool,
}

pub struct GameSetup {
    pub config: GameConfig,
    pub level: LevelData,
    pub screen: SceneSize,
    pub launch: LaunchParams,
}

/// Owns the context, the timeline and the scene handlers, and runs one
/// tick at a time against an [`EngineBackend`].
pub struct Game {
    ctx: GameContext,
    timeline: TimelineIndex,
    dispatcher: EventDispatcher<GameContext>,
    registry: SceneRegistry,
    manager: CheckpointManager,
    store: Box<dyn ProgressStore>,
    launch: LaunchParams,
    report: RegistrationReport,
    persisted: Option<CheckpointId>,
    first_start: bool,
    ticks: u64,
}

impl Game {
    pub fn new(
        setup: GameSetup,
        scenes: Vec<Box<dyn SceneLifecycle>>,
        store: Box<dyn ProgressStore>,
    ) -> Self {
        let GameSetup {
            config,
            level,
            mut screen,
            launch,
        } = setup;

        if let Some(ratio) = launch.ratio {
            screen.width = screen.height * ratio;
            info!(ratio, width = screen.width, "screen_ratio_applied");
        }

        let progress = match store.load() {
            Ok(progress) => progress,
            Err(error) => {
                warn!(error = %error, "progress_load_failed");
                Progress::default()
            }
        };

        let timeline =
            TimelineIndex::build(level.events.clone()).with_seek_policy(config.seek_policy);
        let checkpoints = Rc::new(config.checkpoints);
        let mut ctx = GameContext::new(
            screen,
            config.tuning,
            Rc::clone(&checkpoints),
            Rc::new(level),
        );
        ctx.audio.set_muted(progress.sound_muted);

        let mut registry = SceneRegistry::new();
        for scene in scenes {
            registry.insert(scene);
        }
        let mut dispatcher = EventDispatcher::new();
        let mut report = registry.install(&mut dispatcher);
        report.check_timeline(&timeline, &dispatcher);

        Self {
            ctx,
            timeline,
            dispatcher,
            registry,
            manager: CheckpointManager::new(checkpoints),
            store,
            launch,
            report,
            persisted: progress.checkpoint,
            first_start: true,
            ticks: 0,
        }
    }

    pub fn ctx(&self) -> &GameContext {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut GameContext {
        &mut self.ctx
    }

    pub fn timeline(&self) -> &TimelineIndex {
        &self.timeline
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn registration_report(&self) -> &RegistrationReport {
        &self.report
    }

    pub fn launch(&self) -> &LaunchParams {
        &self.launch
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Places the player at the resolved checkpoint. A start event missing
    /// from the timeline under a strict seek policy falls back to the base
    /// checkpoint once before giving up.
    pub fn start(&mut self, backend: &mut dyn EngineBackend) -> Result<Placement, TimelineError> {
        self.ctx.reset_for_start();
        self.ctx.push(EngineCommand::ResetWorld);
        self.ctx.hide_title();

        let checkpoint = self
            .manager
            .resolve_start(&self.launch, self.persisted, self.first_start);
        self.ctx.restore_checkpoint(checkpoint);
        if self.persisted != Some(checkpoint) {
            self.persist();
        }

        let base_event = self
            .manager
            .event_for(self.manager.table().base)
            .unwrap_or_default()
            .to_string();
        let event = match self.launch.debug_event.clone() {
            Some(debug_event) if self.first_start => debug_event,
            _ => self
                .manager
                .event_for(checkpoint)
                .map(str::to_string)
                .unwrap_or_else(|| base_event.clone()),
        };
        self.first_start = false;
        info!(checkpoint = %checkpoint, event = event.as_str(), "game_start");

        let placement = match self.move_to(&event) {
            Ok(placement) => Ok(placement),
            Err(error) if event != base_event => {
                warn!(event = event.as_str(), error = %error, "start_event_unavailable");
                self.move_to(&base_event)
            }
            Err(error) => Err(error),
        };
        self.flush(backend);
        placement
    }

    fn move_to(&mut self, event: &str) -> Result<Placement, TimelineError> {
        self.manager
            .move_to_event(event, &mut self.timeline, &mut self.dispatcher, &mut self.ctx)
    }

    /// Clears every loaded scene and starts again.
    pub fn restart(
        &mut self,
        mode: RestartMode,
        backend: &mut dyn EngineBackend,
    ) -> Result<Placement, TimelineError> {
        info!(mode = ?mode, checkpoint = %self.ctx.checkpoint(), "game_restart");
        self.registry.clear_loaded(&mut self.ctx);
        self.ctx.audio.stop_long_sounds();
        if mode == RestartMode::FromBeginning {
            let base = self.manager.table().base;
            self.ctx.restore_checkpoint(base);
            self.persist();
        }
        self.ctx.push(EngineCommand::ResumePhysics);
        self.start(backend)
    }

    pub fn toggle_mute(&mut self) -> bool {
        let muted = self.ctx.audio.toggle_muted();
        info!(muted, "sound_mute_toggled");
        self.persist();
        muted
    }

    /// One simulation step: contacts and timers first, then motion, then at
    /// most one timeline event, then effects go to the backend.
    pub fn tick(
        &mut self,
        input: TickInput,
        dt: Duration,
        backend: &mut dyn EngineBackend,
    ) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport::default();

        if input.toggle_mute {
            self.toggle_mute();
        }
        if input.restart && self.ctx.is_game_over() {
            self.ctx.request_restart(RestartMode::FromCheckpoint);
        }
        if let Some(mode) = self.ctx.take_pending_restart() {
            if let Err(error) = self.restart(mode, backend) {
                warn!(error = %error, "restart_failed");
            }
            report.restarted = true;
            return report;
        }

        self.ctx
            .observe_body(backend.body(), backend.camera_scroll_x());
        for contact in backend.take_contacts() {
            if self.ctx.is_game_over() {
                break;
            }
            self.registry.route_contact(&contact, &mut self.ctx);
        }

        // Game over freezes timers, scene updates and fades until restart.
        if !self.ctx.is_game_over() {
            for action in self.ctx.scheduler.advance(dt) {
                if self.ctx.is_game_over() {
                    break;
                }
                let ctx = &mut self.ctx;
                contain("delayed_action", || action(ctx));
            }
        }
        if !self.ctx.is_game_over() {
            self.registry.update_loaded(dt, &mut self.ctx);
            self.ctx.audio.update(dt);
        }

        let outcome = resolve_motion(input.motion, &mut self.ctx);
        report.motion = Some(outcome);
        for cue in self.ctx.take_board_cues() {
            self.registry.route_board_cue(cue, &mut self.ctx);
        }

        if outcome.advances_timeline() {
            let player_x = self.ctx.body.x;
            let dispatcher = &mut self.dispatcher;
            let ctx = &mut self.ctx;
            let mut fired = None;
            self.timeline.check_advance(player_x, |event| {
                let result = dispatcher.dispatch(&event.name, ctx);
                fired = Some((event.name.clone(), result));
            });
            report.fired = fired;
        }

        if let Some(event) = self.ctx.take_pending_seek() {
            if let Err(error) = self.timeline.seek(&event) {
                warn!(event = event.as_str(), error = %error, "requested_seek_failed");
            }
        }
        if self.ctx.take_checkpoint_dirty() {
            self.persist();
        }

        self.flush(backend);
        backend.step(dt);
        report
    }

    fn flush(&mut self, backend: &mut dyn EngineBackend) {
        let mut commands = self.ctx.drain_commands();
        commands.extend(self.ctx.audio.drain().into_iter().map(EngineCommand::Audio));
        if !commands.is_empty() {
            backend.apply(commands);
        }
    }

    fn persist(&mut self) {
        let progress = Progress {
            checkpoint: Some(self.ctx.checkpoint()),
            sound_muted: self.ctx.audio.muted(),
        };
        match self.store.save(&progress) {
            Ok(()) => self.persisted = progress.checkpoint,
            Err(error) => warn!(error = %error, "checkpoint_persist_failed"),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_backend {
    use super::*;

    /// Backend that records commands and lets tests move the body directly.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub(crate) body: BodySnapshot,
        pub(crate) scroll_x: f32,
        pub(crate) contacts: Vec<Contact>,
        pub(crate) applied: Vec<EngineCommand>,
        pub(crate) steps: usize,
    }

    impl EngineBackend for RecordingBackend {
        fn apply(&mut self, commands: Vec<EngineCommand>) {
            for command in &commands {
                match command {
                    EngineCommand::SetPlayerPosition { x, y } => {
                        self.body.x = *x;
                        self.body.y = *y;
                    }
                    EngineCommand::CameraScrollTo(scroll_x) => self.scroll_x = *scroll_x,
                    _ => {}
                }
            }
            self.applied.extend(commands);
        }

        fn step(&mut self, _dt: Duration) {
            self.steps += 1;
        }

        fn body(&self) -> BodySnapshot {
            self.body
        }

        fn camera_scroll_x(&self) -> f32 {
            self.scroll_x
        }

        fn take_contacts(&mut self) -> Vec<Contact> {
            std::mem::take(&mut self.contacts)
        }
    }
}
