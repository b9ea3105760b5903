use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::commands::EngineCommand;
use crate::context::GameContext;
use crate::dispatch::EventDispatcher;
use crate::player::PlayerAnimation;
use crate::scene::SceneId;
use crate::timeline::{TimelineError, TimelineIndex};

pub const MIN_GAME_RATIO: f32 = 2.0;
pub const MAX_GAME_RATIO: f32 = 3.3;

/// Resume point; fractional ids split one scene into two checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(pub f32);

impl CheckpointId {
    pub fn scene(self) -> SceneId {
        SceneId(self.0.floor().clamp(0.0, u8::MAX as f32) as u8)
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointEntry {
    pub id: CheckpointId,
    pub name: String,
    pub event: String,
    /// Spawn height above the foreground line, as a fraction of screen height.
    #[serde(default)]
    pub spawn_offset: f32,
    #[serde(default)]
    pub surf_start: bool,
    /// Walking left does not release the camera here.
    #[serde(default)]
    pub camera_locked: bool,
}

impl CheckpointEntry {
    fn new(id: f32, name: &str, event: &str) -> Self {
        Self {
            id: CheckpointId(id),
            name: name.to_string(),
            event: event.to_string(),
            spawn_offset: 0.0,
            surf_start: false,
            camera_locked: false,
        }
    }

    fn with_offset(mut self, spawn_offset: f32) -> Self {
        self.spawn_offset = spawn_offset;
        self
    }

    fn surf_start(mut self) -> Self {
        self.surf_start = true;
        self
    }

    fn camera_locked(mut self) -> Self {
        self.camera_locked = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointTable {
    pub base: CheckpointId,
    pub entries: Vec<CheckpointEntry>,
}

impl Default for CheckpointTable {
    fn default() -> Self {
        Self {
            base: CheckpointId(1.0),
            entries: vec![
                CheckpointEntry::new(1.0, "startOffice", "1-checkpoint"),
                CheckpointEntry::new(2.0, "dataSources", "2-checkpoint").camera_locked(),
                CheckpointEntry::new(3.0, "dataPipeline", "3-checkpoint"),
                CheckpointEntry::new(4.0, "dataFactory", "4-checkpoint").with_offset(0.35),
                CheckpointEntry::new(5.0, "dataClouds", "5-checkpoint").with_offset(0.25),
                CheckpointEntry::new(6.0, "dataLake", "6-checkpoint1")
                    .with_offset(0.1)
                    .surf_start(),
                CheckpointEntry::new(6.5, "dataTsunami", "6-checkpoint2")
                    .with_offset(0.1)
                    .surf_start(),
                CheckpointEntry::new(7.0, "dataIsOil", "7-checkpoint"),
                CheckpointEntry::new(8.0, "dataQuotes", "8-checkpoint"),
                CheckpointEntry::new(9.0, "dataBricks", "9-checkpoint"),
                CheckpointEntry::new(10.0, "dashboard", "10-checkpoint"),
                CheckpointEntry::new(11.0, "endOffice", "11-checkpoint"),
                CheckpointEntry::new(12.0, "snowflakes", "12-checkpoint").camera_locked(),
            ],
        }
    }
}

impl CheckpointTable {
    pub fn get(&self, id: CheckpointId) -> Option<&CheckpointEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: CheckpointId) -> bool {
        self.get(id).is_some()
    }

    pub fn entry_for_event(&self, event: &str) -> Option<&CheckpointEntry> {
        self.entries.iter().find(|entry| entry.event == event)
    }

    pub fn id_for_event(&self, event: &str) -> Option<CheckpointId> {
        self.entry_for_event(event).map(|entry| entry.id)
    }

    pub fn base_entry(&self) -> Option<&CheckpointEntry> {
        self.get(self.base)
    }

    pub fn is_camera_locked(&self, id: CheckpointId) -> bool {
        self.get(id).is_some_and(|entry| entry.camera_locked)
    }

    /// Entry governing placement at `event`: the checkpoint it names, else
    /// the whole-numbered checkpoint of its scene.
    pub fn placement_entry(&self, event: &str) -> Option<&CheckpointEntry> {
        self.entry_for_event(event).or_else(|| {
            let scene = SceneId::from_event_name(event)?;
            self.get(CheckpointId(f32::from(scene.0)))
        })
    }
}

/// Values read from the launch query string (`?checkpoint=6.5&ratio=2.5`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchParams {
    pub checkpoint: Option<CheckpointId>,
    pub debug_event: Option<String>,
    pub ratio: Option<f32>,
    pub debug: bool,
}

impl LaunchParams {
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.trim().trim_start_matches('?');
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "checkpoint" => params.checkpoint = parse_finite(key, value).map(CheckpointId),
                "ratio" => {
                    params.ratio = parse_finite(key, value)
                        .map(|ratio| ratio.clamp(MIN_GAME_RATIO, MAX_GAME_RATIO));
                }
                "event" if !value.is_empty() => params.debug_event = Some(value.to_string()),
                "debug" => params.debug = value == "1",
                _ => {}
            }
        }
        params
    }
}

fn parse_finite(key: &str, value: &str) -> Option<f32> {
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() && parsed != 0.0 => Some(parsed),
        _ => {
            warn!(param = key, value, "launch_param_ignored");
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub event: String,
    pub scene: SceneId,
    pub x: f32,
    pub y: f32,
    pub scroll_x: f32,
    pub falling: bool,
}

/// Decides where a run starts and puts the player there.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    table: Rc<CheckpointTable>,
}

impl CheckpointManager {
    pub fn new(table: Rc<CheckpointTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CheckpointTable {
        &self.table
    }

    /// Launch parameter (first start only), then the persisted value, then base.
    /// Values missing from the table are treated as absent.
    pub fn resolve_start(
        &self,
        launch: &LaunchParams,
        persisted: Option<CheckpointId>,
        first_start: bool,
    ) -> CheckpointId {
        if first_start {
            if let Some(checkpoint) = launch.checkpoint {
                if self.table.contains(checkpoint) {
                    return checkpoint;
                }
                warn!(checkpoint = %checkpoint, source = "launch", "checkpoint_param_ignored");
            }
        }
        if let Some(checkpoint) = persisted {
            if self.table.contains(checkpoint) {
                return checkpoint;
            }
            warn!(checkpoint = %checkpoint, source = "persisted", "checkpoint_param_ignored");
        }
        self.table.base
    }

    pub fn event_for(&self, checkpoint: CheckpointId) -> Option<&str> {
        self.table.get(checkpoint).map(|entry| entry.event.as_str())
    }

    /// Seeks the timeline to `event`, preloads only the previous and the
    /// target scene, then places camera and player.
    pub fn move_to_event(
        &self,
        event: &str,
        timeline: &mut TimelineIndex,
        dispatcher: &mut EventDispatcher<GameContext>,
        ctx: &mut GameContext,
    ) -> Result<Placement, TimelineError> {
        timeline.seek(event)?;
        let target = timeline.current_event().cloned().ok_or(TimelineError::Empty)?;

        let base_scene = self.table.base.scene();
        let scene = SceneId::from_event_name(&target.name).unwrap_or(base_scene);
        if scene > base_scene {
            if let Some(previous) = scene.previous() {
                dispatcher.dispatch(&previous.load_event(), ctx);
            }
        }
        dispatcher.dispatch(&scene.load_event(), ctx);

        let is_base = scene == base_scene;
        let (scroll_x, x) = if is_base {
            let half_body = ctx.body.width() / 2.0;
            (
                target.x,
                target.x - half_body + ctx.tuning.base_entry_offset,
            )
        } else {
            (target.x - ctx.screen.width / 2.0, target.x)
        };
        ctx.camera_scroll_to(scroll_x);

        let entry = self.table.placement_entry(&target.name);
        let offset = entry.map_or(0.0, |entry| entry.spawn_offset);
        let y = ctx.foreground_y() - offset * ctx.screen.height;
        ctx.set_player_position(x, y);

        let falling = offset != 0.0;
        if falling {
            ctx.player.set_jumping(true);
            ctx.play_animation(PlayerAnimation::Fall);
            if entry.is_some_and(|entry| entry.surf_start) {
                ctx.set_input_enabled(false);
                if let Some(board) = ctx.outputs.surf_board {
                    let board_x = x + ctx.tuning.board_offset_x;
                    ctx.push(EngineCommand::SetObjectX {
                        handle: board.handle,
                        x: board_x,
                    });
                }
            }
        }

        if is_base {
            dispatcher.dispatch(&scene.start_event(), ctx);
        }

        info!(
            event = target.name.as_str(),
            scene = %scene,
            x,
            y,
            scroll_x,
            falling,
            "checkpoint_placement"
        );
        Ok(Placement {
            event: target.name,
            scene,
            x,
            y,
            scroll_x,
            falling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ObjectHandle;
    use crate::context::{test_context, SurfBoard};
    use crate::scene::test_scenes::{ActionLog, RecordingScene};
    use crate::scene::SceneRegistry;
    use crate::timeline::TimelineEvent;

    fn level_timeline() -> TimelineIndex {
        TimelineIndex::build(vec![
            TimelineEvent::new(0.0, "1-load"),
            TimelineEvent::new(100.0, "1-checkpoint"),
            TimelineEvent::new(2000.0, "2-load"),
            TimelineEvent::new(2400.0, "1-clear"),
            TimelineEvent::new(2600.0, "2-checkpoint"),
            TimelineEvent::new(5000.0, "3-load"),
            TimelineEvent::new(6000.0, "3-checkpoint"),
            TimelineEvent::new(9000.0, "4-load"),
            TimelineEvent::new(9500.0, "4-checkpoint"),
            TimelineEvent::new(14000.0, "6-load"),
            TimelineEvent::new(14500.0, "6-checkpoint1"),
        ])
    }

    fn wired(log: &ActionLog, scenes: &[u8]) -> (SceneRegistry, EventDispatcher<GameContext>) {
        let mut registry = SceneRegistry::new();
        for id in scenes {
            let mut scene = RecordingScene::new(*id, log);
            scene.starts = *id == 1;
            registry.insert(Box::new(scene));
        }
        let mut dispatcher = EventDispatcher::new();
        registry.install(&mut dispatcher);
        (registry, dispatcher)
    }

    #[test]
    fn default_table_matches_checkpoint_events() {
        let table = CheckpointTable::default();

        assert_eq!(table.entries.len(), 13);
        assert_eq!(table.id_for_event("6-checkpoint2"), Some(CheckpointId(6.5)));
        assert!(table.is_camera_locked(CheckpointId(12.0)));
        assert!(!table.is_camera_locked(CheckpointId(3.0)));
        assert_eq!(CheckpointId(6.5).scene(), SceneId(6));
    }

    #[test]
    fn launch_query_parses_known_params() {
        let params = LaunchParams::from_query("?checkpoint=6.5&ratio=9&debug=1&event=6-wave");

        assert_eq!(params.checkpoint, Some(CheckpointId(6.5)));
        assert_eq!(params.ratio, Some(MAX_GAME_RATIO));
        assert!(params.debug);
        assert_eq!(params.debug_event.as_deref(), Some("6-wave"));
    }

    #[test]
    fn malformed_checkpoint_param_is_absent() {
        let params = LaunchParams::from_query("checkpoint=abc&debug");

        assert_eq!(params.checkpoint, None);
        assert!(!params.debug);
    }

    #[test]
    fn start_resolution_prefers_launch_then_persisted_then_base() {
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let launch = LaunchParams::from_query("checkpoint=4");

        assert_eq!(
            manager.resolve_start(&launch, Some(CheckpointId(8.0)), true),
            CheckpointId(4.0)
        );
        assert_eq!(
            manager.resolve_start(&launch, Some(CheckpointId(8.0)), false),
            CheckpointId(8.0)
        );
        assert_eq!(
            manager.resolve_start(&LaunchParams::default(), None, true),
            CheckpointId(1.0)
        );
    }

    #[test]
    fn unmapped_checkpoint_values_fall_through() {
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let launch = LaunchParams::from_query("checkpoint=42");

        assert_eq!(
            manager.resolve_start(&launch, Some(CheckpointId(3.3)), true),
            CheckpointId(1.0)
        );
    }

    #[test]
    fn resume_preloads_only_adjacent_scenes_and_places_player() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[1, 2, 3, 4]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();

        let placement = manager
            .move_to_event("3-checkpoint", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("placement");

        assert_eq!(*log.borrow(), vec!["2:load", "3:load"]);
        assert_eq!(timeline.current_event().map(|e| e.name.as_str()), Some("3-checkpoint"));
        assert!((placement.x - 6000.0).abs() < 0.0001);
        assert!((placement.scroll_x - (6000.0 - 800.0)).abs() < 0.0001);
        assert!((placement.y - 576.0).abs() < 0.0001);
        assert!(!placement.falling);
        assert!(!ctx.player.jumping());
    }

    #[test]
    fn resume_then_advance_fires_checkpoint_event_next() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[1, 2, 3, 4]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();
        manager
            .move_to_event("3-checkpoint", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("placement");

        let mut fired = Vec::new();
        timeline.check_advance(6000.0, |event| fired.push(event.name.clone()));

        assert_eq!(fired, vec!["3-checkpoint"]);
    }

    #[test]
    fn base_checkpoint_places_player_at_left_edge_and_starts_intro() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[1, 2]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();

        let placement = manager
            .move_to_event("1-checkpoint", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("placement");

        assert_eq!(*log.borrow(), vec!["1:load", "1:start"]);
        assert!((placement.scroll_x - 100.0).abs() < 0.0001);
        assert!((placement.x - (100.0 - 28.0 + 4.0)).abs() < 0.0001);
    }

    #[test]
    fn elevated_checkpoint_spawns_falling() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[3, 4]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();

        let placement = manager
            .move_to_event("4-checkpoint", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("placement");

        assert!(placement.falling);
        assert!((placement.y - (576.0 - 0.35 * 640.0)).abs() < 0.001);
        assert!(ctx.player.jumping());
        assert_eq!(ctx.current_animation(), Some("player-fall"));
        assert!(ctx.input_enabled());
    }

    #[test]
    fn surf_start_checkpoint_disables_input_and_moves_board() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[5, 6]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();
        ctx.outputs.surf_board = Some(SurfBoard {
            owner: SceneId(6),
            handle: ObjectHandle(7),
        });

        manager
            .move_to_event("6-checkpoint1", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("placement");

        assert!(!ctx.input_enabled());
        assert!(ctx.pending_commands().contains(&EngineCommand::SetObjectX {
            handle: ObjectHandle(7),
            x: 14500.0 - 12.0,
        }));
    }

    #[test]
    fn unknown_event_falls_back_to_timeline_start() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[1]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline();
        let mut ctx = test_context();
        ctx.player.pushing_left = true;

        let placement = manager
            .move_to_event("99-checkpoint", &mut timeline, &mut dispatcher, &mut ctx)
            .expect("fallback placement");

        assert_eq!(placement.event, "1-load");
        assert_eq!(timeline.cursor(), 0);
        assert!(ctx.player.pushing_left);
    }

    #[test]
    fn unknown_event_errors_under_strict_seek() {
        let log = ActionLog::default();
        let (_registry, mut dispatcher) = wired(&log, &[1]);
        let manager = CheckpointManager::new(Rc::new(CheckpointTable::default()));
        let mut timeline = level_timeline().with_seek_policy(crate::timeline::SeekPolicy::Fail);
        let mut ctx = test_context();

        let result = manager.move_to_event("99-checkpoint", &mut timeline, &mut dispatcher, &mut ctx);

        assert!(matches!(result, Err(TimelineError::EventNotFound { .. })));
        assert!(log.borrow().is_empty());
    }
}
