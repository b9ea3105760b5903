use std::time::Duration;

use datarun_engine::{EngineCommand, GameContext, ObjectHandle, Rect, SceneId, SpawnKind};
use tracing::debug;

pub(crate) const TITLE_DURATION: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SceneObject {
    pub(crate) handle: ObjectHandle,
    pub(crate) name: String,
    pub(crate) kind: SpawnKind,
    pub(crate) rect: Rect,
}

/// Handles a scene spawned and still owns. Every scene builds its world
/// through one of these so clearing stays a single call.
#[derive(Debug)]
pub(crate) struct SceneKit {
    id: SceneId,
    objects: Vec<SceneObject>,
}

impl SceneKit {
    pub(crate) fn new(id: u8) -> Self {
        Self {
            id: SceneId(id),
            objects: Vec::new(),
        }
    }

    pub(crate) fn id(&self) -> SceneId {
        self.id
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    /// Spawns every level object tagged with this scene.
    pub(crate) fn spawn_level_objects(&mut self, ctx: &mut GameContext) -> usize {
        let level = ctx.level();
        let mut spawned = 0;
        for descriptor in level.objects_for(self.id) {
            let handle = ctx.spawn(self.id, descriptor);
            self.objects.push(SceneObject {
                handle,
                name: descriptor.name.clone(),
                kind: descriptor.kind.clone(),
                rect: descriptor.rect(),
            });
            spawned += 1;
        }
        debug!(scene = %self.id, objects = spawned, "scene_objects_spawned");
        spawned
    }

    pub(crate) fn spawn_extra(
        &mut self,
        ctx: &mut GameContext,
        kind: SpawnKind,
        rect: Rect,
        name: &str,
    ) -> ObjectHandle {
        let handle = ctx.spawn_rect(self.id, kind.clone(), rect, name);
        self.objects.push(SceneObject {
            handle,
            name: name.to_string(),
            kind,
            rect,
        });
        handle
    }

    pub(crate) fn find(&self, name: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|object| object.name == name)
            .map(|object| object.handle)
    }

    pub(crate) fn first_of(&self, matches: impl Fn(&SpawnKind) -> bool) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|object| matches(&object.kind))
            .map(|object| object.handle)
    }

    pub(crate) fn object(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.handle == handle)
    }

    pub(crate) fn named(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub(crate) fn objects(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects.iter()
    }

    /// Pushes a visibility change for every owned object whose name starts with `prefix`.
    pub(crate) fn set_visible_with_prefix(
        &self,
        ctx: &mut GameContext,
        prefix: &str,
        visible: bool,
    ) -> usize {
        let mut changed = 0;
        for object in self.objects.iter().filter(|object| object.name.starts_with(prefix)) {
            ctx.push(EngineCommand::SetObjectVisible {
                handle: object.handle,
                visible,
            });
            changed += 1;
        }
        changed
    }

    /// Despawns one object; false when the scene no longer owns it.
    pub(crate) fn remove(&mut self, ctx: &mut GameContext, handle: ObjectHandle) -> bool {
        let Some(index) = self
            .objects
            .iter()
            .position(|object| object.handle == handle)
        else {
            return false;
        };
        self.objects.remove(index);
        ctx.despawn(handle);
        true
    }

    /// Safe to call again on an empty kit.
    pub(crate) fn despawn_all(&mut self, ctx: &mut GameContext) {
        let count = self.objects.len();
        for object in self.objects.drain(..) {
            ctx.despawn(object.handle);
        }
        if count > 0 {
            debug!(scene = %self.id, objects = count, "scene_objects_despawned");
        }
    }

    /// Common checkpoint entry: background music back on and the previous
    /// scene's scrolled-away objects dropped.
    pub(crate) fn enter_checkpoint(&self, ctx: &mut GameContext) {
        ctx.audio.fade_in_background();
        if let Some(previous) = self.id.previous().filter(|previous| previous.0 > 0) {
            ctx.clear_passed(previous);
        }
    }

    /// Shows a title and hides it after `duration`, unless the scene clears first.
    pub(crate) fn flash_title(&self, ctx: &mut GameContext, text: &str, duration: Duration) {
        ctx.show_title(text);
        ctx.scheduler
            .after(duration, Some(self.id), |ctx: &mut GameContext| {
                ctx.hide_title()
            });
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;
    use std::time::Duration;

    use datarun_engine::{
        CheckpointTable, EngineCommand, GameContext, LevelData, ObjectHandle, PlayerTuning,
        SceneId, SceneSize, SpawnDescriptor, SpawnKind,
    };

    pub(crate) fn descriptor(scene: u8, name: &str, x: f32, kind: SpawnKind) -> SpawnDescriptor {
        SpawnDescriptor {
            name: name.to_string(),
            scene: SceneId(scene),
            x,
            y: 400.0,
            width: 100.0,
            height: 100.0,
            kind,
        }
    }

    pub(crate) fn context_with(objects: Vec<SpawnDescriptor>) -> GameContext {
        GameContext::new(
            SceneSize::default(),
            PlayerTuning::default(),
            Rc::new(CheckpointTable::default()),
            Rc::new(LevelData {
                width: 20_000.0,
                events: Vec::new(),
                objects,
            }),
        )
    }

    pub(crate) fn context() -> GameContext {
        context_with(Vec::new())
    }

    pub(crate) fn despawned(ctx: &GameContext) -> Vec<ObjectHandle> {
        ctx.pending_commands()
            .iter()
            .filter_map(|command| match command {
                EngineCommand::Despawn(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn titles(ctx: &GameContext) -> Vec<String> {
        ctx.pending_commands()
            .iter()
            .filter_map(|command| match command {
                EngineCommand::ShowTitle(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Runs every timer due within `elapsed`, in small steps.
    pub(crate) fn run_timers(ctx: &mut GameContext, elapsed: Duration) {
        let step = Duration::from_millis(10);
        let mut remaining = elapsed;
        while remaining > Duration::ZERO {
            let dt = step.min(remaining);
            for action in ctx.scheduler.advance(dt) {
                action(ctx);
            }
            remaining -= dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{context, context_with, descriptor, despawned, run_timers};
    use super::*;

    #[test]
    fn spawns_only_objects_of_its_own_scene() {
        let mut ctx = context_with(vec![
            descriptor(2, "crate-a", 100.0, SpawnKind::PushBlock),
            descriptor(3, "pipe", 200.0, SpawnKind::Slide),
            descriptor(2, "crate-b", 300.0, SpawnKind::PushBlock),
        ]);
        let mut kit = SceneKit::new(2);

        assert_eq!(kit.spawn_level_objects(&mut ctx), 2);
        assert_eq!(kit.len(), 2);
        assert!(kit.find("crate-b").is_some());
        assert!(kit.find("pipe").is_none());
    }

    #[test]
    fn despawn_all_is_idempotent() {
        let mut ctx = context_with(vec![descriptor(4, "press", 100.0, SpawnKind::Hazard)]);
        let mut kit = SceneKit::new(4);
        kit.spawn_level_objects(&mut ctx);

        kit.despawn_all(&mut ctx);
        kit.despawn_all(&mut ctx);

        assert_eq!(despawned(&ctx).len(), 1);
        assert_eq!(kit.len(), 0);
    }

    #[test]
    fn remove_forgets_the_handle() {
        let mut ctx = context();
        let mut kit = SceneKit::new(12);
        let gun = kit.spawn_extra(
            &mut ctx,
            SpawnKind::Ground,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            "gun",
        );

        assert!(kit.remove(&mut ctx, gun));
        assert!(!kit.remove(&mut ctx, gun));
        assert!(kit.object(gun).is_none());
    }

    #[test]
    fn flashed_title_hides_after_duration() {
        let mut ctx = context();
        let kit = SceneKit::new(7);

        kit.flash_title(&mut ctx, "DATA IS THE NEW OIL", TITLE_DURATION);
        run_timers(&mut ctx, TITLE_DURATION);

        assert!(ctx
            .pending_commands()
            .ends_with(&[EngineCommand::HideTitle]));
    }

    #[test]
    fn checkpoint_entry_drops_previous_scene_leftovers() {
        let mut ctx = context();
        let kit = SceneKit::new(5);

        kit.enter_checkpoint(&mut ctx);

        assert!(ctx.audio.is_playing("background"));
        assert!(ctx.pending_commands().iter().any(|command| matches!(
            command,
            EngineCommand::ClearPassed { owner, .. } if *owner == SceneId(4)
        )));
    }
}
