use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::commands::Contact;
use crate::context::{BoardCue, GameContext};
use crate::dispatch::{contain, EventDispatcher};
use crate::timeline::TimelineIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub u8);

impl SceneId {
    /// Leading number of a `"<scene>-<kind>"` event name.
    pub fn from_event_name(name: &str) -> Option<SceneId> {
        let (prefix, _) = name.split_once('-')?;
        prefix.parse().ok().map(SceneId)
    }

    pub fn event(self, suffix: &str) -> String {
        format!("{}-{suffix}", self.0)
    }

    pub fn load_event(self) -> String {
        self.event("load")
    }

    pub fn start_event(self) -> String {
        self.event("start")
    }

    pub fn previous(self) -> Option<SceneId> {
        self.0.checked_sub(1).map(SceneId)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneAction {
    Load,
    Checkpoint(u8),
    Clear,
    Start,
    Custom(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneRegistration {
    pub event: String,
    pub action: SceneAction,
}

/// Contract every level section implements. The registrations it returns are
/// the only way its handlers reach the dispatcher.
pub trait SceneLifecycle {
    fn id(&self) -> SceneId;

    /// Number of `-checkpoint` events; above one they are numbered from 1.
    fn checkpoint_stages(&self) -> u8 {
        1
    }

    fn has_clear(&self) -> bool {
        true
    }

    /// Whether the scene runs the opening sequence for the base checkpoint.
    fn starts_game(&self) -> bool {
        false
    }

    /// Suffixes of scene-specific events, e.g. `"swamp"` for `"6-swamp"`.
    fn custom_events(&self) -> &'static [&'static str] {
        &[]
    }

    /// World-building; runs at most once between clears.
    fn preload(&mut self, ctx: &mut GameContext);

    fn on_checkpoint(&mut self, stage: u8, ctx: &mut GameContext);

    /// Releases whatever `preload` allocated. Must tolerate repeat calls.
    fn on_clear(&mut self, ctx: &mut GameContext);

    fn on_start(&mut self, _ctx: &mut GameContext) {}

    fn on_custom(&mut self, _event: &'static str, _ctx: &mut GameContext) {}

    fn on_contact(&mut self, _contact: &Contact, ctx: &mut GameContext) {
        ctx.land_on_ground();
    }

    fn on_board_cue(&mut self, _cue: BoardCue, _ctx: &mut GameContext) {}

    fn update(&mut self, _dt: Duration, _ctx: &mut GameContext) {}

    fn registrations(&self) -> Vec<SceneRegistration> {
        let id = self.id();
        let mut registrations = vec![SceneRegistration {
            event: id.load_event(),
            action: SceneAction::Load,
        }];
        match self.checkpoint_stages() {
            0 => {}
            1 => registrations.push(SceneRegistration {
                event: id.event("checkpoint"),
                action: SceneAction::Checkpoint(1),
            }),
            stages => {
                for stage in 1..=stages {
                    registrations.push(SceneRegistration {
                        event: id.event(&format!("checkpoint{stage}")),
                        action: SceneAction::Checkpoint(stage),
                    });
                }
            }
        }
        if self.has_clear() {
            registrations.push(SceneRegistration {
                event: id.event("clear"),
                action: SceneAction::Clear,
            });
        }
        if self.starts_game() {
            registrations.push(SceneRegistration {
                event: id.start_event(),
                action: SceneAction::Start,
            });
        }
        for suffix in self.custom_events() {
            registrations.push(SceneRegistration {
                event: id.event(suffix),
                action: SceneAction::Custom(*suffix),
            });
        }
        registrations
    }
}

struct SceneSlot {
    module: Box<dyn SceneLifecycle>,
    loaded: bool,
}

impl SceneSlot {
    fn run(&mut self, event: &str, action: SceneAction, ctx: &mut GameContext) {
        let scene = self.module.id();
        match action {
            SceneAction::Load => {
                if self.loaded {
                    debug!(scene = %scene, "scene_already_loaded");
                    return;
                }
                self.module.preload(ctx);
                self.loaded = true;
                info!(scene = %scene, "scene_preloaded");
            }
            SceneAction::Checkpoint(stage) => {
                if let Some(checkpoint) = ctx.checkpoints().id_for_event(event) {
                    ctx.set_checkpoint(checkpoint);
                }
                self.module.on_checkpoint(stage, ctx);
            }
            SceneAction::Clear => {
                self.module.on_clear(ctx);
                let cancelled = ctx.scheduler.cancel_owned_by(scene);
                self.loaded = false;
                info!(scene = %scene, cancelled_timers = cancelled, "scene_cleared");
            }
            SceneAction::Start => self.module.on_start(ctx),
            SceneAction::Custom(name) => self.module.on_custom(name, ctx),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub registered: usize,
    pub duplicates: Vec<String>,
    pub unhandled: Vec<String>,
}

impl RegistrationReport {
    /// Lists timeline events no scene registered a handler for.
    pub fn check_timeline(
        &mut self,
        timeline: &TimelineIndex,
        dispatcher: &EventDispatcher<GameContext>,
    ) {
        for event in timeline.events() {
            if !dispatcher.contains(&event.name) && !self.unhandled.contains(&event.name) {
                warn!(event = event.name.as_str(), "registration_unhandled_event");
                self.unhandled.push(event.name.clone());
            }
        }
    }
}

/// Owns the scene modules and tracks which ones are currently loaded.
#[derive(Default)]
pub struct SceneRegistry {
    slots: BTreeMap<SceneId, Rc<RefCell<SceneSlot>>>,
}

impl fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneRegistry")
            .field("scenes", &self.slots.keys().collect::<Vec<_>>())
            .field("loaded", &self.loaded_ids())
            .finish()
    }
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Box<dyn SceneLifecycle>) {
        let id = module.id();
        let slot = Rc::new(RefCell::new(SceneSlot {
            module,
            loaded: false,
        }));
        if self.slots.insert(id, slot).is_some() {
            warn!(scene = %id, "scene_module_replaced");
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn is_loaded(&self, id: SceneId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.borrow().loaded)
    }

    pub fn loaded_ids(&self) -> Vec<SceneId> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.borrow().loaded)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Registers every scene's handlers; duplicated event names are reported
    /// and the later scene wins.
    pub fn install(&self, dispatcher: &mut EventDispatcher<GameContext>) -> RegistrationReport {
        let mut report = RegistrationReport::default();
        let mut seen = HashSet::new();
        for slot in self.slots.values() {
            let registrations = slot.borrow().module.registrations();
            for registration in registrations {
                if !seen.insert(registration.event.clone()) {
                    warn!(event = registration.event.as_str(), "registration_duplicate");
                    report.duplicates.push(registration.event.clone());
                }
                let slot = Rc::clone(slot);
                let event = registration.event.clone();
                let action = registration.action;
                dispatcher.register(registration.event, move |ctx: &mut GameContext| {
                    slot.borrow_mut().run(&event, action, ctx);
                });
                report.registered += 1;
            }
        }
        info!(
            scenes = self.slots.len(),
            handlers = report.registered,
            duplicates = report.duplicates.len(),
            "scene_handlers_installed"
        );
        report
    }

    pub fn route_contact(&self, contact: &Contact, ctx: &mut GameContext) {
        match contact.owner.and_then(|owner| self.slots.get(&owner)) {
            Some(slot) => {
                let name = slot.borrow().module.id().event("contact");
                contain(&name, || slot.borrow_mut().module.on_contact(contact, ctx));
            }
            None => ctx.land_on_ground(),
        }
    }

    pub fn route_board_cue(&self, cue: BoardCue, ctx: &mut GameContext) {
        let Some(board) = ctx.outputs.surf_board else {
            debug!(cue = ?cue, "board_cue_without_board");
            return;
        };
        if let Some(slot) = self.slots.get(&board.owner) {
            let name = board.owner.event("board");
            contain(&name, || slot.borrow_mut().module.on_board_cue(cue, ctx));
        }
    }

    pub fn update_loaded(&self, dt: Duration, ctx: &mut GameContext) {
        for slot in self.slots.values() {
            let mut slot = slot.borrow_mut();
            if slot.loaded {
                let name = slot.module.id().event("update");
                contain(&name, || slot.module.update(dt, ctx));
            }
        }
    }

    /// Clears every loaded scene, as on a restart.
    pub fn clear_loaded(&self, ctx: &mut GameContext) {
        for slot in self.slots.values() {
            let mut slot = slot.borrow_mut();
            if slot.loaded {
                let event = slot.module.id().event("clear");
                contain(&event, || slot.run(&event, SceneAction::Clear, ctx));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_scenes {
    use super::*;

    pub(crate) type ActionLog = Rc<RefCell<Vec<String>>>;

    /// Scene that only records which lifecycle hooks ran.
    pub(crate) struct RecordingScene {
        pub(crate) id: SceneId,
        pub(crate) stages: u8,
        pub(crate) clears: bool,
        pub(crate) starts: bool,
        pub(crate) log: ActionLog,
    }

    impl RecordingScene {
        pub(crate) fn new(id: u8, log: &ActionLog) -> Self {
            Self {
                id: SceneId(id),
                stages: 1,
                clears: true,
                starts: false,
                log: Rc::clone(log),
            }
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}:{what}", self.id));
        }
    }

    impl SceneLifecycle for RecordingScene {
        fn id(&self) -> SceneId {
            self.id
        }

        fn checkpoint_stages(&self) -> u8 {
            self.stages
        }

        fn has_clear(&self) -> bool {
            self.clears
        }

        fn starts_game(&self) -> bool {
            self.starts
        }

        fn custom_events(&self) -> &'static [&'static str] {
            &["speech"]
        }

        fn preload(&mut self, _ctx: &mut GameContext) {
            self.record("load");
        }

        fn on_checkpoint(&mut self, stage: u8, _ctx: &mut GameContext) {
            self.record(&format!("checkpoint{stage}"));
        }

        fn on_clear(&mut self, _ctx: &mut GameContext) {
            self.record("clear");
        }

        fn on_start(&mut self, _ctx: &mut GameContext) {
            self.record("start");
        }

        fn on_custom(&mut self, event: &'static str, _ctx: &mut GameContext) {
            self.record(event);
        }
    }
}
