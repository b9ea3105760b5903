use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A named trigger placed at a world-space x coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub x: f32,
    pub name: String,
}

impl TimelineEvent {
    pub fn new(x: f32, name: impl Into<String>) -> Self {
        Self {
            x,
            name: name.into(),
        }
    }
}

/// What `seek` does when the name is not on the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekPolicy {
    #[default]
    FallbackToStart,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("timeline has no event named '{name}'")]
    EventNotFound { name: String },
    #[error("timeline is empty")]
    Empty,
}

/// Events sorted by x plus a cursor pointing at the next event to fire.
#[derive(Debug, Clone, Default)]
pub struct TimelineIndex {
    events: Vec<TimelineEvent>,
    cursor: usize,
    seek_policy: SeekPolicy,
}

impl TimelineIndex {
    /// Stable sort by x; events sharing an x keep their input order.
    pub fn build(mut events: Vec<TimelineEvent>) -> Self {
        events.sort_by(|left, right| left.x.total_cmp(&right.x));

        let mut seen = HashSet::new();
        for event in &events {
            if !seen.insert(event.name.as_str()) {
                warn!(event = event.name.as_str(), "timeline_duplicate_event");
            }
        }
        info!(event_count = events.len(), "timeline_built");

        Self {
            events,
            cursor: 0,
            seek_policy: SeekPolicy::default(),
        }
    }

    pub fn with_seek_policy(mut self, seek_policy: SeekPolicy) -> Self {
        self.seek_policy = seek_policy;
        self
    }

    pub fn seek_policy(&self) -> SeekPolicy {
        self.seek_policy
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.events.len()
    }

    pub fn current_event(&self) -> Option<&TimelineEvent> {
        self.events.get(self.cursor)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|event| event.name == name)
    }

    pub fn event_named(&self, name: &str) -> Option<&TimelineEvent> {
        self.position_of(name).map(|index| &self.events[index])
    }

    /// Moves the cursor to the first event called `name`.
    pub fn seek(&mut self, name: &str) -> Result<usize, TimelineError> {
        if let Some(index) = self.position_of(name) {
            debug!(event = name, cursor = index, "timeline_seek");
            self.cursor = index;
            return Ok(index);
        }

        match self.seek_policy {
            SeekPolicy::FallbackToStart => {
                warn!(event = name, "timeline_seek_fallback");
                self.cursor = 0;
                Ok(0)
            }
            SeekPolicy::Fail => Err(TimelineError::EventNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Fires at most one event: the one under the cursor, if the player has
    /// reached its x. Returns whether an event fired.
    pub fn check_advance(&mut self, player_x: f32, fire: impl FnOnce(&TimelineEvent)) -> bool {
        let Some(event) = self.events.get(self.cursor) else {
            return false;
        };
        if !(event.x <= player_x) {
            return false;
        }

        debug!(
            event = event.name.as_str(),
            event_x = event.x,
            player_x,
            cursor = self.cursor,
            "timeline_event_fired"
        );
        fire(event);
        self.cursor += 1;
        true
    }
}
