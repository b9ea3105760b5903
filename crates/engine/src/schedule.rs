use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::scene::SceneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub type DelayedAction<C> = Box<dyn FnOnce(&mut C)>;

struct Timer<C> {
    id: TimerId,
    owner: Option<SceneId>,
    remaining: Duration,
    action: DelayedAction<C>,
}

/// Delayed callbacks run on the tick thread. Scene-owned timers are cancelled
/// together when their scene clears.
pub struct Scheduler<C> {
    next_id: u64,
    timers: Vec<Timer<C>>,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            timers: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.timers.len())
            .finish()
    }
}

impl<C> Scheduler<C> {
    pub fn after(
        &mut self,
        delay: Duration,
        owner: Option<SceneId>,
        action: impl FnOnce(&mut C) + 'static,
    ) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.timers.push(Timer {
            id,
            owner,
            remaining: delay,
            action: Box::new(action),
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub fn cancel_owned_by(&mut self, owner: SceneId) -> usize {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.owner != Some(owner));
        before - self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Counts `dt` down on every timer and hands back the ones that came due,
    /// earliest deadline first, ties in scheduling order.
    pub fn advance(&mut self, dt: Duration) -> Vec<DelayedAction<C>> {
        let mut due = Vec::new();
        let mut index = 0;
        while index < self.timers.len() {
            let timer = &mut self.timers[index];
            if timer.remaining <= dt {
                let overshoot = dt - timer.remaining;
                let timer = self.timers.remove(index);
                due.push((overshoot, timer));
            } else {
                timer.remaining -= dt;
                index += 1;
            }
        }
        due.sort_by(|(left_overshoot, left), (right_overshoot, right)| {
            right_overshoot
                .cmp(left_overshoot)
                .then(left.id.cmp(&right.id))
        });
        due.into_iter().map(|(_, timer)| timer.action).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutsceneStatus {
    Running,
    Finished,
}

struct CutsceneStep<C> {
    delay: Duration,
    action: DelayedAction<C>,
}

/// Linear scripted sequence: each step waits its delay after the previous
/// step ran, and at most one step runs per `advance`.
pub struct Cutscene<C> {
    name: &'static str,
    steps: VecDeque<CutsceneStep<C>>,
    elapsed: Duration,
}

impl<C> fmt::Debug for Cutscene<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cutscene")
            .field("name", &self.name)
            .field("remaining_steps", &self.steps.len())
            .finish()
    }
}

impl<C> Cutscene<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: VecDeque::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn then(mut self, delay: Duration, action: impl FnOnce(&mut C) + 'static) -> Self {
        self.steps.push_back(CutsceneStep {
            delay,
            action: Box::new(action),
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cancel(&mut self) {
        self.steps.clear();
        self.elapsed = Duration::ZERO;
    }

    pub fn advance(&mut self, dt: Duration, ctx: &mut C) -> CutsceneStatus {
        let Some(next) = self.steps.front() else {
            return CutsceneStatus::Finished;
        };
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed < next.delay {
            return CutsceneStatus::Running;
        }
        let delay = next.delay;
        if let Some(step) = self.steps.pop_front() {
            self.elapsed -= delay;
            (step.action)(ctx);
        }
        if self.steps.is_empty() {
            CutsceneStatus::Finished
        } else {
            CutsceneStatus::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        entries: Vec<&'static str>,
    }

    #[test]
    fn timers_fire_once_when_due() {
        let mut scheduler = Scheduler::<Log>::default();
        let mut log = Log::default();
        scheduler.after(Duration::from_millis(100), None, |log| {
            log.entries.push("late")
        });
        scheduler.after(Duration::from_millis(50), None, |log| {
            log.entries.push("early")
        });

        for action in scheduler.advance(Duration::from_millis(60)) {
            action(&mut log);
        }
        assert_eq!(log.entries, vec!["early"]);

        for action in scheduler.advance(Duration::from_millis(60)) {
            action(&mut log);
        }
        assert_eq!(log.entries, vec!["early", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn same_tick_timers_run_earliest_deadline_first() {
        let mut scheduler = Scheduler::<Log>::default();
        let mut log = Log::default();
        scheduler.after(Duration::from_millis(30), None, |log| log.entries.push("b"));
        scheduler.after(Duration::from_millis(10), None, |log| log.entries.push("a"));
        scheduler.after(Duration::from_millis(30), None, |log| log.entries.push("c"));

        for action in scheduler.advance(Duration::from_millis(40)) {
            action(&mut log);
        }

        assert_eq!(log.entries, vec!["a", "b", "c"]);
    }

    #[test]
    fn cancel_owned_by_drops_only_that_scene() {
        let mut scheduler = Scheduler::<Log>::default();
        scheduler.after(Duration::from_millis(10), Some(SceneId(3)), |_| {});
        scheduler.after(Duration::from_millis(10), Some(SceneId(3)), |_| {});
        let keep = scheduler.after(Duration::from_millis(10), Some(SceneId(4)), |_| {});

        assert_eq!(scheduler.cancel_owned_by(SceneId(3)), 2);
        assert_eq!(scheduler.pending(), 1);
        assert!(scheduler.cancel(keep));
        assert!(!scheduler.cancel(keep));
    }

    #[test]
    fn cutscene_runs_one_step_per_check() {
        let mut log = Log::default();
        let mut cutscene = Cutscene::new("intro")
            .then(Duration::ZERO, |log: &mut Log| log.entries.push("walk"))
            .then(Duration::ZERO, |log: &mut Log| log.entries.push("talk"))
            .then(Duration::from_millis(500), |log: &mut Log| {
                log.entries.push("done")
            });

        assert_eq!(
            cutscene.advance(Duration::from_millis(16), &mut log),
            CutsceneStatus::Running
        );
        assert_eq!(log.entries, vec!["walk"]);

        cutscene.advance(Duration::from_millis(16), &mut log);
        assert_eq!(log.entries, vec!["walk", "talk"]);

        cutscene.advance(Duration::from_millis(400), &mut log);
        assert_eq!(log.entries.len(), 2);

        let status = cutscene.advance(Duration::from_millis(200), &mut log);
        assert_eq!(status, CutsceneStatus::Finished);
        assert_eq!(log.entries, vec!["walk", "talk", "done"]);
    }

    #[test]
    fn cancelled_cutscene_never_runs_remaining_steps() {
        let mut log = Log::default();
        let mut cutscene =
            Cutscene::new("outro").then(Duration::from_millis(10), |log: &mut Log| {
                log.entries.push("never")
            });

        cutscene.cancel();

        assert_eq!(
            cutscene.advance(Duration::from_secs(1), &mut log),
            CutsceneStatus::Finished
        );
        assert!(log.entries.is_empty());
        assert!(cutscene.is_finished());
    }
}
