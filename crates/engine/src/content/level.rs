use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::commands::Rect;
use crate::scene::SceneId;
use crate::timeline::TimelineEvent;

const EVENTS_LAYER: &str = "events";
const SCENE_LAYER_PREFIX: &str = "scene";

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse level json {path} at {json_path}: {source}")]
    Json {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed tmx level {path}: {source}")]
    Tmx {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("tmx level {path} has no 'events' object group")]
    MissingEventsLayer { path: PathBuf },
    #[error("invalid number '{value}' for attribute '{attribute}' in {path}")]
    InvalidNumber {
        path: PathBuf,
        attribute: String,
        value: String,
    },
    #[error("unknown object type '{value}' for object '{object}' in {path}")]
    UnknownObjectType {
        path: PathBuf,
        object: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupItem {
    Bling,
    Gun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    /// Blocks the player and reports side contacts.
    Solid,
    /// Reports overlap only.
    Sensor,
    /// Drawn, never collides.
    Decoration,
}

/// What a level object is; each scene resolves kinds with one `match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpawnKind {
    #[serde(rename = "static")]
    Ground,
    Conveyor {
        speed: f32,
    },
    Slide,
    #[serde(rename = "push")]
    PushBlock,
    Board,
    Hazard,
    Pickup {
        item: PickupItem,
    },
    Dashboard,
    Image,
    Background,
    Logo,
}

impl SpawnKind {
    pub fn collision(&self) -> Collision {
        match self {
            Self::Ground
            | Self::Conveyor { .. }
            | Self::Slide
            | Self::PushBlock
            | Self::Board
            | Self::Dashboard => Collision::Solid,
            Self::Hazard | Self::Pickup { .. } => Collision::Sensor,
            Self::Image | Self::Background | Self::Logo => Collision::Decoration,
        }
    }

    /// Side contacts move the object instead of stopping the player.
    pub fn is_pushable(&self) -> bool {
        matches!(self, Self::PushBlock)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnDescriptor {
    pub name: String,
    pub scene: SceneId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: SpawnKind,
}

impl SpawnDescriptor {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub width: f32,
    pub events: Vec<TimelineEvent>,
    #[serde(default)]
    pub objects: Vec<SpawnDescriptor>,
}

impl LevelData {
    /// Loads `.tmx` files as Tiled maps and everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, LevelError> {
        let raw = fs::read_to_string(path).map_err(|source| LevelError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_tmx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tmx"));
        let level = if is_tmx {
            Self::from_tmx_str(path, &raw)?
        } else {
            Self::from_json_str(path, &raw)?
        };
        info!(
            path = %path.display(),
            width = level.width,
            events = level.events.len(),
            objects = level.objects.len(),
            "level_loaded"
        );
        Ok(level)
    }

    pub fn from_json_str(path: &Path, raw: &str) -> Result<Self, LevelError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize::<_, Self>(&mut deserializer).map_err(|error| {
            let json_path = error.path().to_string();
            LevelError::Json {
                path: path.to_path_buf(),
                json_path,
                source: error.into_inner(),
            }
        })
    }

    pub fn from_tmx_str(path: &Path, raw: &str) -> Result<Self, LevelError> {
        let doc = Document::parse(raw).map_err(|source| LevelError::Tmx {
            path: path.to_path_buf(),
            source,
        })?;
        let map = doc.root_element();
        let columns = number_attr(path, map, "width")?.unwrap_or(0.0);
        let tile_width = number_attr(path, map, "tilewidth")?.unwrap_or(1.0);

        let mut events = None;
        let mut objects = Vec::new();
        for group in map
            .children()
            .filter(|node| node.has_tag_name("objectgroup"))
        {
            let name = group.attribute("name").unwrap_or_default();
            if name == EVENTS_LAYER {
                events = Some(parse_event_group(path, group)?);
            } else if let Some(scene) = scene_layer(name) {
                for object in group.children().filter(|node| node.has_tag_name("object")) {
                    if let Some(descriptor) = parse_object(path, scene, object)? {
                        objects.push(descriptor);
                    }
                }
            }
        }

        let events = events.ok_or_else(|| LevelError::MissingEventsLayer {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            width: columns * tile_width,
            events,
            objects,
        })
    }

    pub fn objects_for(&self, scene: SceneId) -> impl Iterator<Item = &SpawnDescriptor> + '_ {
        self.objects
            .iter()
            .filter(move |descriptor| descriptor.scene == scene)
    }
}

fn scene_layer(name: &str) -> Option<SceneId> {
    name.strip_prefix(SCENE_LAYER_PREFIX)?
        .parse::<u8>()
        .ok()
        .map(SceneId)
}

fn parse_event_group(path: &Path, group: Node<'_, '_>) -> Result<Vec<TimelineEvent>, LevelError> {
    let mut events = Vec::new();
    for object in group.children().filter(|node| node.has_tag_name("object")) {
        let Some(name) = object.attribute("name") else {
            continue;
        };
        let x = number_attr(path, object, "x")?.unwrap_or(0.0);
        events.push(TimelineEvent::new(x, name));
    }
    Ok(events)
}

fn parse_object(
    path: &Path,
    scene: SceneId,
    object: Node<'_, '_>,
) -> Result<Option<SpawnDescriptor>, LevelError> {
    let name = object.attribute("name").unwrap_or_default().to_string();
    let Some(kind_name) = object.attribute("type").or_else(|| object.attribute("class")) else {
        return Ok(None);
    };

    let kind = match kind_name {
        "static" => SpawnKind::Ground,
        "conveyor" => SpawnKind::Conveyor {
            speed: number_property(path, object, "speed")?.unwrap_or(0.0),
        },
        "slide" => SpawnKind::Slide,
        "push" => SpawnKind::PushBlock,
        "board" => SpawnKind::Board,
        "hazard" => SpawnKind::Hazard,
        "pickup" => SpawnKind::Pickup {
            item: match property(object, "item") {
                Some("gun") => PickupItem::Gun,
                _ => PickupItem::Bling,
            },
        },
        "dashboard" => SpawnKind::Dashboard,
        "image" => SpawnKind::Image,
        "background" => SpawnKind::Background,
        "logo" => SpawnKind::Logo,
        other => {
            return Err(LevelError::UnknownObjectType {
                path: path.to_path_buf(),
                object: name,
                value: other.to_string(),
            })
        }
    };

    Ok(Some(SpawnDescriptor {
        name,
        scene,
        x: number_attr(path, object, "x")?.unwrap_or(0.0),
        y: number_attr(path, object, "y")?.unwrap_or(0.0),
        width: number_attr(path, object, "width")?.unwrap_or(0.0),
        height: number_attr(path, object, "height")?.unwrap_or(0.0),
        kind,
    }))
}

fn property<'a>(object: Node<'a, '_>, name: &str) -> Option<&'a str> {
    object
        .children()
        .filter(|node| node.has_tag_name("properties"))
        .flat_map(|properties| properties.children())
        .find(|node| node.has_tag_name("property") && node.attribute("name") == Some(name))
        .and_then(|node| node.attribute("value"))
}

fn number_property(path: &Path, object: Node<'_, '_>, name: &str) -> Result<Option<f32>, LevelError> {
    property(object, name)
        .map(|value| parse_number(path, name, value))
        .transpose()
}

fn number_attr(path: &Path, node: Node<'_, '_>, attribute: &str) -> Result<Option<f32>, LevelError> {
    node.attribute(attribute)
        .map(|value| parse_number(path, attribute, value))
        .transpose()
}

fn parse_number(path: &Path, attribute: &str, value: &str) -> Result<f32, LevelError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| LevelError::InvalidNumber {
            path: path.to_path_buf(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TMX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="100" height="10" tilewidth="32" tileheight="32">
  <objectgroup id="1" name="events">
    <object id="1" name="1-load" x="0" y="0"/>
    <object id="2" name="4-checkpoint" x="2400.5" y="0"/>
    <object id="3" x="12" y="0"/>
  </objectgroup>
  <objectgroup id="2" name="scene4">
    <object id="10" name="belt" type="conveyor" x="2500" y="500" width="300" height="20">
      <properties>
        <property name="speed" type="float" value="-150"/>
      </properties>
    </object>
    <object id="11" name="bling" type="pickup" x="2600" y="400" width="32" height="32"/>
    <object id="12" name="note" x="10" y="10"/>
  </objectgroup>
  <objectgroup id="3" name="foreground"/>
</map>"#;

    #[test]
    fn tmx_level_reads_events_and_scene_objects() {
        let level = LevelData::from_tmx_str(Path::new("level.tmx"), TMX).expect("parse tmx");

        assert!((level.width - 3200.0).abs() < 0.0001);
        assert_eq!(
            level.events,
            vec![
                TimelineEvent::new(0.0, "1-load"),
                TimelineEvent::new(2400.5, "4-checkpoint"),
            ]
        );
        assert_eq!(level.objects.len(), 2);
        assert_eq!(level.objects[0].kind, SpawnKind::Conveyor { speed: -150.0 });
        assert_eq!(
            level.objects[1].kind,
            SpawnKind::Pickup {
                item: PickupItem::Bling
            }
        );
        assert_eq!(level.objects_for(SceneId(4)).count(), 2);
        assert_eq!(level.objects_for(SceneId(5)).count(), 0);
    }

    #[test]
    fn tmx_without_events_layer_is_rejected() {
        let raw = r#"<map width="1" tilewidth="1"><objectgroup name="scene1"/></map>"#;
        let error = LevelData::from_tmx_str(Path::new("bad.tmx"), raw).expect_err("must fail");
        assert!(matches!(error, LevelError::MissingEventsLayer { .. }));
    }

    #[test]
    fn tmx_unknown_object_type_is_rejected() {
        let raw = r#"<map><objectgroup name="events"/><objectgroup name="scene2">
            <object name="thing" type="teleporter" x="1" y="1"/></objectgroup></map>"#;
        let error = LevelData::from_tmx_str(Path::new("bad.tmx"), raw).expect_err("must fail");
        assert!(matches!(error, LevelError::UnknownObjectType { ref value, .. } if value == "teleporter"));
    }

    #[test]
    fn tmx_invalid_coordinate_is_rejected() {
        let raw = r#"<map><objectgroup name="events"><object name="1-load" x="abc"/></objectgroup></map>"#;
        let error = LevelData::from_tmx_str(Path::new("bad.tmx"), raw).expect_err("must fail");
        assert!(matches!(error, LevelError::InvalidNumber { ref attribute, .. } if attribute == "x"));
    }

    #[test]
    fn json_level_parses_tagged_kinds() {
        let raw = r#"{
            "width": 4000,
            "events": [{"x": 10, "name": "1-load"}],
            "objects": [
                {"name": "gun", "scene": 12, "x": 1, "y": 2, "width": 3, "height": 4,
                 "kind": {"type": "pickup", "item": "gun"}},
                {"name": "floor", "scene": 1, "x": 0, "y": 576, "width": 400, "height": 64,
                 "kind": {"type": "static"}}
            ]
        }"#;

        let level = LevelData::from_json_str(Path::new("level.json"), raw).expect("parse json");

        assert_eq!(level.events.len(), 1);
        assert_eq!(level.objects[1].kind, SpawnKind::Ground);
        assert_eq!(level.objects[1].kind.collision(), Collision::Solid);
        assert_eq!(level.objects[0].kind.collision(), Collision::Sensor);
    }

    #[test]
    fn json_error_reports_path() {
        let raw = r#"{"width": 10, "events": [{"x": "far", "name": "1-load"}]}"#;
        let error = LevelData::from_json_str(Path::new("level.json"), raw).expect_err("must fail");
        match error {
            LevelError::Json { json_path, .. } => assert_eq!(json_path, "events[0].x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_dispatches_on_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tmx_path = dir.path().join("level.tmx");
        fs::write(&tmx_path, TMX).expect("write tmx");

        let level = LevelData::load(&tmx_path).expect("load tmx");
        assert_eq!(level.events.len(), 2);

        let missing = LevelData::load(&dir.path().join("missing.json")).expect_err("missing");
        assert!(matches!(missing, LevelError::Read { .. }));
    }
}
