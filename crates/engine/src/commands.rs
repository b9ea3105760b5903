use crate::audio::AudioCommand;
use crate::content::SpawnKind;
use crate::player::BodyProfile;
use crate::scene::SceneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u32);

/// Axis-aligned rectangle in world pixels, `y` growing downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSide {
    Down,
    Up,
    Left,
    Right,
    Overlap,
}

/// A collision reported by the presentation backend for the previous physics step.
///
/// `object == None` means the foreground tile line.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub object: Option<ObjectHandle>,
    pub owner: Option<SceneId>,
    pub kind: Option<SpawnKind>,
    pub side: ContactSide,
}

impl Contact {
    pub fn foreground() -> Self {
        Self {
            object: None,
            owner: None,
            kind: None,
            side: ContactSide::Down,
        }
    }
}

/// Opaque effects handed to the presentation layer; applied before the next physics step.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    SetVelocityX(f32),
    SetVelocityY(f32),
    SetAccelerationX(f32),
    SetPlayerPosition {
        x: f32,
        y: f32,
    },
    SetBodyProfile(BodyProfile),
    PlayAnimation(String),
    StopAnimation,
    FlipPlayer(bool),
    CameraFollow(bool),
    CameraScrollTo(f32),
    Spawn {
        handle: ObjectHandle,
        owner: SceneId,
        kind: SpawnKind,
        rect: Rect,
        label: String,
    },
    Despawn(ObjectHandle),
    MoveObject {
        handle: ObjectHandle,
        x: f32,
        y: f32,
    },
    SetObjectX {
        handle: ObjectHandle,
        x: f32,
    },
    SetObjectVelocityX {
        handle: ObjectHandle,
        velocity_x: f32,
    },
    SetObjectVisible {
        handle: ObjectHandle,
        visible: bool,
    },
    ClearPassed {
        owner: SceneId,
        before_x: f32,
    },
    ShowTitle(String),
    HideTitle,
    PausePhysics,
    ResumePhysics,
    ResetWorld,
    Audio(AudioCommand),
}
