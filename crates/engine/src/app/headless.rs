use std::time::Duration;

use tracing::{info, warn};

use super::arcade::ArcadeWorld;
use crate::checkpoint::CheckpointId;
use crate::dispatch::DispatchOutcome;
use crate::game::{Game, TickInput};
use crate::motion::MotionInput;
use crate::timeline::TimelineError;

/// Ticks without forward progress before the autopilot tries a jump.
const STALL_TICKS: u32 = 10;
const STALL_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSummary {
    pub ticks: u64,
    pub events_fired: usize,
    pub missing_handlers: usize,
    pub restarts: usize,
    pub final_checkpoint: CheckpointId,
    pub timeline_exhausted: bool,
    pub game_over: bool,
}

#[derive(Debug, Default)]
struct Autopilot {
    last_x: Option<f32>,
    stalled_ticks: u32,
}

impl Autopilot {
    fn next_input(&mut self, game: &Game) -> TickInput {
        let ctx = game.ctx();
        if ctx.is_game_over() {
            self.last_x = None;
            self.stalled_ticks = 0;
            return TickInput {
                restart: true,
                ..TickInput::default()
            };
        }

        let x = ctx.body.x;
        match self.last_x {
            Some(last_x) if x - last_x < STALL_DISTANCE => self.stalled_ticks += 1,
            _ => self.stalled_ticks = 0,
        }
        self.last_x = Some(x);

        let holds_up = self.stalled_ticks >= STALL_TICKS;
        if holds_up {
            self.stalled_ticks = 0;
        }
        TickInput {
            motion: MotionInput {
                holds_right: true,
                holds_left: false,
                holds_up,
            },
            ..TickInput::default()
        }
    }
}

/// Runs the game without a window: the player holds right, jumps when stuck
/// and restarts after a game over. Stops early once the timeline is exhausted.
pub fn run_headless(
    game: &mut Game,
    world: &mut ArcadeWorld,
    max_ticks: u64,
    dt: Duration,
) -> Result<HeadlessSummary, TimelineError> {
    let placement = game.start(world)?;
    info!(
        event = placement.event.as_str(),
        max_ticks,
        "headless_run_start"
    );

    let mut autopilot = Autopilot::default();
    let mut ticks = 0_u64;
    let mut events_fired = 0_usize;
    let mut missing_handlers = 0_usize;
    let mut restarts = 0_usize;

    while ticks < max_ticks && !game.timeline().is_exhausted() {
        let input = autopilot.next_input(game);
        let report = game.tick(input, dt, world);
        ticks += 1;

        if report.restarted {
            restarts += 1;
        }
        if let Some((event, outcome)) = report.fired {
            events_fired += 1;
            if outcome != DispatchOutcome::Handled {
                missing_handlers += 1;
                warn!(event = event.as_str(), outcome = ?outcome, "headless_event_unhandled");
            }
        }
    }

    let summary = HeadlessSummary {
        ticks,
        events_fired,
        missing_handlers,
        restarts,
        final_checkpoint: game.ctx().checkpoint(),
        timeline_exhausted: game.timeline().is_exhausted(),
        game_over: game.ctx().is_game_over(),
    };
    info!(
        ticks = summary.ticks,
        events_fired = summary.events_fired,
        restarts = summary.restarts,
        checkpoint = %summary.final_checkpoint,
        exhausted = summary.timeline_exhausted,
        "headless_run_complete"
    );
    Ok(summary)
}
