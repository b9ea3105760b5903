use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::{debug, info};

use crate::audio::{AudioCommand, SoundKey};
use crate::commands::{Contact, ContactSide, EngineCommand, ObjectHandle, Rect};
use crate::content::{Collision, SpawnKind};
use crate::context::{BodySnapshot, GameContext, SceneSize};
use crate::game::EngineBackend;
use crate::player::BodyProfile;
use crate::scene::SceneId;

/// Minimum vertical overlap before a solid counts as a wall rather than a floor edge.
const WALL_OVERLAP_MIN: f32 = 1.0;
const LANDING_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcadeConfig {
    pub screen: SceneSize,
    pub world_width: f32,
    pub gravity: f32,
    pub foreground_y: f32,
}

impl ArcadeConfig {
    /// World bounds and forces derived from the game's screen, tuning and level.
    pub fn for_game(ctx: &GameContext) -> Self {
        Self {
            screen: ctx.screen,
            world_width: ctx.level().width,
            gravity: ctx.tuning.gravity(ctx.screen.height),
            foreground_y: ctx.foreground_y(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub handle: ObjectHandle,
    pub owner: SceneId,
    pub kind: SpawnKind,
    pub rect: Rect,
    pub velocity_x: f32,
    pub visible: bool,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SoundState {
    pub muted: bool,
    pub playing: BTreeSet<SoundKey>,
}

/// Minimal arcade physics: gravity, a foreground floor line, AABB solids
/// and sensors, and a camera that follows the player inside world bounds.
#[derive(Debug)]
pub struct ArcadeWorld {
    config: ArcadeConfig,
    objects: BTreeMap<ObjectHandle, WorldObject>,
    body: BodySnapshot,
    acceleration_x: f32,
    paused: bool,
    scroll_x: f32,
    following: bool,
    contacts: Vec<Contact>,
    title: Option<String>,
    animation: Option<String>,
    flipped: bool,
    sound: SoundState,
}

impl ArcadeWorld {
    pub fn new(config: ArcadeConfig) -> Self {
        Self {
            config,
            objects: BTreeMap::new(),
            body: BodySnapshot::default(),
            acceleration_x: 0.0,
            paused: false,
            scroll_x: 0.0,
            following: false,
            contacts: Vec::new(),
            title: None,
            animation: None,
            flipped: false,
            sound: SoundState::default(),
        }
    }

    pub fn config(&self) -> &ArcadeConfig {
        &self.config
    }

    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> + '_ {
        self.objects.values()
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<&WorldObject> {
        self.objects.get(&handle)
    }

    pub fn body_rect(&self) -> Rect {
        body_rect_at(self.body.x, self.body.y, self.body.profile)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn animation(&self) -> Option<&str> {
        self.animation.as_deref()
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn sound(&self) -> &SoundState {
        &self.sound
    }

    fn max_scroll_x(&self) -> f32 {
        (self.config.world_width - self.config.screen.width).max(0.0)
    }

    fn clamp_scroll(&self, scroll_x: f32) -> f32 {
        scroll_x.clamp(0.0, self.max_scroll_x())
    }

    fn apply_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::SetVelocityX(velocity_x) => self.body.velocity_x = velocity_x,
            EngineCommand::SetVelocityY(velocity_y) => self.body.velocity_y = velocity_y,
            EngineCommand::SetAccelerationX(acceleration_x) => {
                self.acceleration_x = acceleration_x;
            }
            EngineCommand::SetPlayerPosition { x, y } => {
                self.body.x = x;
                self.body.y = y;
            }
            EngineCommand::SetBodyProfile(profile) => self.body.profile = profile,
            EngineCommand::PlayAnimation(key) => self.animation = Some(key),
            EngineCommand::StopAnimation => self.animation = None,
            EngineCommand::FlipPlayer(flipped) => self.flipped = flipped,
            EngineCommand::CameraFollow(following) => self.following = following,
            EngineCommand::CameraScrollTo(scroll_x) => self.scroll_x = self.clamp_scroll(scroll_x),
            EngineCommand::Spawn {
                handle,
                owner,
                kind,
                rect,
                label,
            } => {
                self.objects.insert(
                    handle,
                    WorldObject {
                        handle,
                        owner,
                        kind,
                        rect,
                        velocity_x: 0.0,
                        visible: true,
                        label,
                    },
                );
            }
            EngineCommand::Despawn(handle) => {
                self.objects.remove(&handle);
            }
            EngineCommand::MoveObject { handle, x, y } => {
                if let Some(object) = self.objects.get_mut(&handle) {
                    object.rect.x = x;
                    object.rect.y = y;
                }
            }
            EngineCommand::SetObjectX { handle, x } => {
                if let Some(object) = self.objects.get_mut(&handle) {
                    object.rect.x = x;
                }
            }
            EngineCommand::SetObjectVelocityX { handle, velocity_x } => {
                if let Some(object) = self.objects.get_mut(&handle) {
                    object.velocity_x = velocity_x;
                }
            }
            EngineCommand::SetObjectVisible { handle, visible } => {
                if let Some(object) = self.objects.get_mut(&handle) {
                    object.visible = visible;
                }
            }
            EngineCommand::ClearPassed { owner, before_x } => {
                let before = self.objects.len();
                self.objects
                    .retain(|_, object| object.owner != owner || object.rect.right() >= before_x);
                debug!(
                    scene = %owner,
                    removed = before - self.objects.len(),
                    "passed_objects_cleared"
                );
            }
            EngineCommand::ShowTitle(text) => self.title = Some(text),
            EngineCommand::HideTitle => self.title = None,
            EngineCommand::PausePhysics => self.paused = true,
            EngineCommand::ResumePhysics => self.paused = false,
            EngineCommand::ResetWorld => self.reset(),
            EngineCommand::Audio(command) => self.apply_audio(command),
        }
    }

    fn reset(&mut self) {
        self.objects.clear();
        self.body = BodySnapshot::default();
        self.acceleration_x = 0.0;
        self.paused = false;
        self.scroll_x = 0.0;
        self.following = false;
        self.contacts.clear();
        self.title = None;
        self.animation = None;
        self.flipped = false;
        info!("world_reset");
    }

    fn apply_audio(&mut self, command: AudioCommand) {
        debug!(command = ?command, "audio_command");
        match command {
            AudioCommand::Play { key, .. } | AudioCommand::Resume(key) => {
                self.sound.playing.insert(key);
            }
            AudioCommand::Stop(key) | AudioCommand::Pause(key) => {
                self.sound.playing.remove(key);
            }
            AudioCommand::FadeTo { .. } => {}
            AudioCommand::SetMuted(muted) => self.sound.muted = muted,
        }
    }

    fn move_objects(&mut self, seconds: f32) {
        for object in self.objects.values_mut() {
            object.rect.x += object.velocity_x * seconds;
        }
    }

    fn step_horizontal(&mut self, dx: f32) {
        if dx == 0.0 {
            return;
        }
        let dims = self.body.profile.dimensions();
        let mut x = self.body.x + dx;
        let rect = body_rect_at(x, self.body.y, self.body.profile);
        let side = if dx > 0.0 {
            ContactSide::Right
        } else {
            ContactSide::Left
        };

        let mut pushes = Vec::new();
        for object in self.objects.values() {
            if object.kind.collision() != Collision::Solid || !rect.overlaps(&object.rect) {
                continue;
            }
            let vertical_overlap =
                rect.bottom().min(object.rect.bottom()) - rect.y.max(object.rect.y);
            if vertical_overlap <= WALL_OVERLAP_MIN {
                continue;
            }

            if object.kind.is_pushable() {
                let shift = if dx > 0.0 {
                    rect.right() - object.rect.x
                } else {
                    rect.x - object.rect.right()
                };
                pushes.push((object.handle, shift));
            } else if dx > 0.0 {
                x = x.min(object.rect.x - dims.offset_x - dims.width);
            } else {
                x = x.max(object.rect.right() - dims.offset_x);
            }
            self.contacts.push(contact_with(object, side));
        }

        for (handle, shift) in pushes {
            if let Some(object) = self.objects.get_mut(&handle) {
                object.rect.x += shift;
            }
        }
        if x > self.config.world_width {
            x = self.config.world_width;
        }
        self.body.x = x;
    }

    fn step_vertical(&mut self, dy: f32) {
        let dims = self.body.profile.dimensions();
        let feet_offset = dims.offset_y + dims.height;
        let previous = self.body_rect();
        let mut y = self.body.y + dy;
        self.body.on_floor = false;
        self.body.touching_down = false;

        if self.body.velocity_y >= 0.0 {
            let rect = body_rect_at(self.body.x, y, self.body.profile);
            let landing = self
                .objects
                .values()
                .filter(|object| object.kind.collision() == Collision::Solid)
                .filter(|object| overlaps_horizontally(&rect, &object.rect))
                .filter(|object| {
                    previous.bottom() <= object.rect.y + LANDING_TOLERANCE
                        && rect.bottom() >= object.rect.y
                })
                .min_by(|left, right| left.rect.y.total_cmp(&right.rect.y));
            if let Some(object) = landing {
                y = object.rect.y - feet_offset;
                self.body.velocity_y = 0.0;
                self.body.touching_down = true;
                let contact = contact_with(object, ContactSide::Down);
                self.contacts.push(contact);
            }

            if y + feet_offset >= self.config.foreground_y {
                y = self.config.foreground_y - feet_offset;
                self.body.velocity_y = 0.0;
                self.body.on_floor = true;
                self.contacts.push(Contact::foreground());
            }
        } else {
            let rect = body_rect_at(self.body.x, y, self.body.profile);
            let ceiling = self
                .objects
                .values()
                .filter(|object| object.kind.collision() == Collision::Solid)
                .filter(|object| overlaps_horizontally(&rect, &object.rect))
                .filter(|object| {
                    previous.y >= object.rect.bottom() - LANDING_TOLERANCE
                        && rect.y <= object.rect.bottom()
                })
                .max_by(|left, right| left.rect.bottom().total_cmp(&right.rect.bottom()));
            if let Some(object) = ceiling {
                y = object.rect.bottom() - dims.offset_y;
                self.body.velocity_y = 0.0;
                let contact = contact_with(object, ContactSide::Up);
                self.contacts.push(contact);
            }
        }

        self.body.y = y;
    }

    fn collect_overlaps(&mut self) {
        let rect = self.body_rect();
        let overlaps: Vec<Contact> = self
            .objects
            .values()
            .filter(|object| object.kind.collision() == Collision::Sensor)
            .filter(|object| rect.overlaps(&object.rect))
            .map(|object| contact_with(object, ContactSide::Overlap))
            .collect();
        self.contacts.extend(overlaps);
    }

    fn update_camera(&mut self) {
        if self.following {
            self.scroll_x = self.clamp_scroll(self.body.x - self.config.screen.width / 2.0);
        }
    }
}

impl EngineBackend for ArcadeWorld {
    fn apply(&mut self, commands: Vec<EngineCommand>) {
        for command in commands {
            self.apply_command(command);
        }
    }

    fn step(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        let seconds = dt.as_secs_f32();
        self.move_objects(seconds);

        self.body.velocity_x += self.acceleration_x * seconds;
        self.body.velocity_y += self.config.gravity * seconds;
        self.step_horizontal(self.body.velocity_x * seconds);
        self.step_vertical(self.body.velocity_y * seconds);
        self.collect_overlaps();
        self.update_camera();
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

fn body_rect_at(x: f32, y: f32, profile: BodyProfile) -> Rect {
    let dims = profile.dimensions();
    Rect::new(x + dims.offset_x, y + dims.offset_y, dims.width, dims.height)
}

fn overlaps_horizontally(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && b.x < a.right()
}

fn contact_with(object: &WorldObject, side: ContactSide) -> Contact {
    Contact {
        object: Some(object.handle),
        owner: Some(object.owner),
        kind: Some(object.kind.clone()),
        side,
    }
}
