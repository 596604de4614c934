/// Step engine — the composable unit of tutorial work and the combinators
/// that sequence, fork, race, and loop it.
///
/// A step is a small state machine driven by the host's game loop: every
/// tick it either reports `Pending` or settles `Done` exactly once. Parents
/// own their children and forward cancellation only to the ones currently
/// running, so a torn-down subtree can never settle afterwards.
use thiserror::Error;

use crate::core::context::{ContextError, ContextKey, TutorialContext};
use crate::core::goals::GoalTracker;
use crate::core::world::GameWorld;
use crate::schema::entity::EntityId;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error("unknown entity: {0:?}")]
    UnknownEntity(EntityId),
    #[error("unit {unit:?} does not know ability '{ability}'")]
    UnknownAbility { unit: EntityId, ability: String },
    #[error("ability '{ability}' on unit {unit:?} is on cooldown")]
    AbilityOnCooldown { unit: EntityId, ability: String },
}

/// Game-clock sample for one tick, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub now: f64,
    pub dt: f64,
}

/// Everything a step may touch while it runs: the world boundary, the
/// shared context, the run's goal tracker, and the clock.
pub struct Frame<'a> {
    pub world: &'a mut dyn GameWorld,
    pub ctx: &'a mut TutorialContext,
    pub goals: &'a mut GoalTracker,
    pub time: Tick,
}

/// Outcome of ticking a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Done,
}

pub type StepResult = Result<Progress, GraphError>;

pub type BoxedStep = Box<dyn Step>;

/// A node in the tutorial graph. `tick` drives it; the first `Done` is its
/// single completion signal. `stop` tears it down early and must silence
/// it for good: a stopped step never reports `Done`, and stopping a step
/// that already settled (or never started) is a no-op.
pub trait Step {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult;

    fn stop(&mut self, frame: &mut Frame<'_>) {
        let _ = frame;
    }
}

/// Internal lifecycle latch shared by the combinators. `Done` and
/// `Stopped` are terminal; a node in either state reports `Pending`
/// forever, which is what enforces the at-most-once contract inside the
/// primitive rather than at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeState {
    Idle,
    Running,
    Done,
    Stopped,
}

impl NodeState {
    pub(crate) fn settled(self) -> bool {
        matches!(self, NodeState::Done | NodeState::Stopped)
    }
}

// ---------------------------------------------------------------------------
// Step arguments
// ---------------------------------------------------------------------------

/// A value a step needs, supplied either literally or resolved from the
/// running frame at the moment the step uses it. Lazy resolution is what
/// lets a graph reference entities that only exist once earlier spawn
/// steps have run.
pub enum StepArg<T> {
    Value(T),
    Resolve(Box<dyn Fn(&Frame<'_>) -> Result<T, GraphError>>),
}

impl<T: Clone> StepArg<T> {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Frame<'_>) -> Result<T, GraphError> + 'static,
    {
        StepArg::Resolve(Box::new(f))
    }

    pub fn resolve(&self, frame: &Frame<'_>) -> Result<T, GraphError> {
        match self {
            StepArg::Value(v) => Ok(v.clone()),
            StepArg::Resolve(f) => f(frame),
        }
    }
}

impl<T> From<T> for StepArg<T> {
    fn from(value: T) -> Self {
        StepArg::Value(value)
    }
}

/// Context slots are the common way to name a unit lazily.
impl From<ContextKey> for StepArg<EntityId> {
    fn from(key: ContextKey) -> Self {
        StepArg::Resolve(Box::new(move |frame| Ok(frame.ctx.entity(&key)?)))
    }
}

impl From<&str> for StepArg<String> {
    fn from(value: &str) -> Self {
        StepArg::Value(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Leaf primitives
// ---------------------------------------------------------------------------

struct Immediate<F> {
    effect: F,
    state: NodeState,
}

impl<F> Step for Immediate<F>
where
    F: FnMut(&mut Frame<'_>) -> Result<(), GraphError>,
{
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        (self.effect)(frame)?;
        self.state = NodeState::Done;
        Ok(Progress::Done)
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Run a side effect synchronously and complete in the same tick.
pub fn immediate<F>(effect: F) -> BoxedStep
where
    F: FnMut(&mut Frame<'_>) -> Result<(), GraphError> + 'static,
{
    Box::new(Immediate {
        effect,
        state: NodeState::Idle,
    })
}

struct Wait {
    seconds: f64,
    deadline: Option<f64>,
    state: NodeState,
}

impl Step for Wait {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let deadline = *self
            .deadline
            .get_or_insert(frame.time.now + self.seconds);
        if frame.time.now >= deadline {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.deadline = None;
            self.state = NodeState::Stopped;
        }
    }
}

/// Complete after a game-clock delay. Stopping the step drops the pending
/// deadline.
pub fn wait(seconds: f32) -> BoxedStep {
    Box::new(Wait {
        seconds: seconds as f64,
        deadline: None,
        state: NodeState::Idle,
    })
}

struct Leaf<T, C> {
    on_tick: T,
    on_stop: C,
    state: NodeState,
}

impl<T, C> Step for Leaf<T, C>
where
    T: FnMut(&mut Frame<'_>) -> StepResult,
    C: FnMut(&mut Frame<'_>),
{
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let progress = (self.on_tick)(frame)?;
        if progress == Progress::Done {
            self.state = NodeState::Done;
        }
        Ok(progress)
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.state == NodeState::Running {
            (self.on_stop)(frame);
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Generic leaf: `on_tick` is polled until it reports `Done`; `on_stop`
/// runs on early teardown of a started leaf and must release whatever the
/// leaf started in the world.
pub fn step<T, C>(on_tick: T, on_stop: C) -> BoxedStep
where
    T: FnMut(&mut Frame<'_>) -> StepResult + 'static,
    C: FnMut(&mut Frame<'_>) + 'static,
{
    Box::new(Leaf {
        on_tick,
        on_stop,
        state: NodeState::Idle,
    })
}

struct CompleteOnCheck<P> {
    predicate: P,
    interval: f64,
    next_check: Option<f64>,
    state: NodeState,
}

impl<P> Step for CompleteOnCheck<P>
where
    P: FnMut(&mut Frame<'_>) -> Result<bool, GraphError>,
{
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let due = match self.next_check {
            None => true,
            Some(at) => frame.time.now >= at,
        };
        if !due {
            return Ok(Progress::Pending);
        }
        if (self.predicate)(frame)? {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            self.next_check = Some(frame.time.now + self.interval);
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.next_check = None;
            self.state = NodeState::Stopped;
        }
    }
}

/// Poll a predicate on a fixed interval and complete the first time it
/// holds. The first check happens on the first tick.
pub fn complete_on_check<P>(predicate: P, poll_interval: f32) -> BoxedStep
where
    P: FnMut(&mut Frame<'_>) -> Result<bool, GraphError> + 'static,
{
    Box::new(CompleteOnCheck {
        predicate,
        interval: poll_interval as f64,
        next_check: None,
        state: NodeState::Idle,
    })
}

struct NeverComplete;

impl Step for NeverComplete {
    fn tick(&mut self, _frame: &mut Frame<'_>) -> StepResult {
        Ok(Progress::Pending)
    }
}

/// A step that never settles. Only useful as the losing branch of a
/// [`fork_any`], where the race's cancellation reclaims it.
pub fn never_complete() -> BoxedStep {
    Box::new(NeverComplete)
}

// ---------------------------------------------------------------------------
// Composites
// ---------------------------------------------------------------------------

struct Seq {
    children: Vec<BoxedStep>,
    current: usize,
    state: NodeState,
}

impl Step for Seq {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        // A child completing hands off to the next within the same tick,
        // so chains of immediates run back to back like a single effect.
        while self.current < self.children.len() {
            match self.children[self.current].tick(frame)? {
                Progress::Done => self.current += 1,
                Progress::Pending => return Ok(Progress::Pending),
            }
        }
        self.state = NodeState::Done;
        Ok(Progress::Done)
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.state == NodeState::Running && self.current < self.children.len() {
            self.children[self.current].stop(frame);
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Run steps strictly in order; completes when the last one does.
/// Cancelling a sequence cancels only the child currently running.
pub fn seq(children: Vec<BoxedStep>) -> BoxedStep {
    Box::new(Seq {
        children,
        current: 0,
        state: NodeState::Idle,
    })
}

struct ForkChild {
    step: BoxedStep,
    done: bool,
}

struct Fork {
    children: Vec<ForkChild>,
    state: NodeState,
}

impl Step for Fork {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let mut all_done = true;
        for child in &mut self.children {
            if child.done {
                continue;
            }
            match child.step.tick(frame)? {
                Progress::Done => child.done = true,
                Progress::Pending => all_done = false,
            }
        }
        if all_done {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.state == NodeState::Running {
            for child in &mut self.children {
                if !child.done {
                    child.step.stop(frame);
                }
            }
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Join fork: all children run against the same context and the fork
/// completes once every one of them has. Children are ticked in
/// declaration order but may finish in any order.
pub fn fork(children: Vec<BoxedStep>) -> BoxedStep {
    Box::new(Fork {
        children: children
            .into_iter()
            .map(|step| ForkChild { step, done: false })
            .collect(),
        state: NodeState::Idle,
    })
}

struct ForkAny {
    children: Vec<BoxedStep>,
    state: NodeState,
}

impl Step for ForkAny {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        // Ticking in declaration order makes same-tick ties deterministic:
        // the first-declared finisher wins.
        for winner in 0..self.children.len() {
            if self.children[winner].tick(frame)? == Progress::Done {
                for (i, loser) in self.children.iter_mut().enumerate() {
                    if i != winner {
                        loser.stop(frame);
                    }
                }
                self.state = NodeState::Done;
                return Ok(Progress::Done);
            }
        }
        Ok(Progress::Pending)
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.state == NodeState::Running {
            for child in &mut self.children {
                child.stop(frame);
            }
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Racing fork: the first child to complete wins; every other child is
/// stopped on the spot and never settles. An empty race never completes.
pub fn fork_any(children: Vec<BoxedStep>) -> BoxedStep {
    Box::new(ForkAny {
        children,
        state: NodeState::Idle,
    })
}

struct RepeatWhile<P, F> {
    condition: P,
    body_factory: F,
    active: Option<BoxedStep>,
    state: NodeState,
}

impl<P, F> Step for RepeatWhile<P, F>
where
    P: FnMut(&mut Frame<'_>) -> Result<bool, GraphError>,
    F: FnMut(&TutorialContext) -> BoxedStep,
{
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        loop {
            if self.active.is_none() {
                if !(self.condition)(frame)? {
                    self.state = NodeState::Done;
                    return Ok(Progress::Done);
                }
                self.active = Some((self.body_factory)(frame.ctx));
            }
            match self
                .active
                .as_mut()
                .expect("loop body present")
                .tick(frame)?
            {
                Progress::Done => self.active = None,
                Progress::Pending => return Ok(Progress::Pending),
            }
        }
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if let Some(body) = self.active.as_mut() {
            body.stop(frame);
        }
        self.active = None;
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Conditional loop: the condition is evaluated before each iteration (so
/// zero iterations is possible), and a fresh body instance is built per
/// pass. Cancelling mid-iteration cancels the in-flight body.
pub fn repeat_while<P, F>(condition: P, body_factory: F) -> BoxedStep
where
    P: FnMut(&mut Frame<'_>) -> Result<bool, GraphError> + 'static,
    F: FnMut(&TutorialContext) -> BoxedStep + 'static,
{
    Box::new(RepeatWhile {
        condition,
        body_factory,
        active: None,
        state: NodeState::Idle,
    })
}

struct WithGoals {
    inner: BoxedStep,
    state: NodeState,
}

impl Step for WithGoals {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let progress = self.inner.tick(frame)?;
        if frame.goals.take_dirty() {
            let snapshot = frame.goals.snapshot();
            tracing::debug!(goals = snapshot.len(), "goal display updated");
            frame.world.render_goals(&snapshot);
        }
        if progress == Progress::Done {
            self.state = NodeState::Done;
        }
        Ok(progress)
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.state == NodeState::Running {
            self.inner.stop(frame);
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Decorator that mirrors the run's goal tracker to the objective display
/// whenever the wrapped subtree mutates it. Transparent to scheduling and
/// cancellation.
pub fn with_goals(inner: BoxedStep) -> BoxedStep {
    Box::new(WithGoals {
        inner,
        state: NodeState::Idle,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::NoopWorld;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Rig {
        world: NoopWorld,
        ctx: TutorialContext,
        goals: GoalTracker,
        now: f64,
    }

    impl Rig {
        fn new() -> Self {
            Rig {
                world: NoopWorld::default(),
                ctx: TutorialContext::new(7),
                goals: GoalTracker::new(),
                now: 0.0,
            }
        }

        fn tick(&mut self, root: &mut BoxedStep, dt: f64) -> Progress {
            self.now += dt;
            let mut frame = Frame {
                world: &mut self.world,
                ctx: &mut self.ctx,
                goals: &mut self.goals,
                time: Tick { now: self.now, dt },
            };
            root.tick(&mut frame).unwrap()
        }

        fn stop(&mut self, root: &mut BoxedStep) {
            let mut frame = Frame {
                world: &mut self.world,
                ctx: &mut self.ctx,
                goals: &mut self.goals,
                time: Tick {
                    now: self.now,
                    dt: 0.0,
                },
            };
            root.stop(&mut frame);
        }
    }

    fn trace() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> BoxedStep) {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let writer = {
            let log = log.clone();
            move |tag: &'static str| {
                let log = log.clone();
                immediate(move |_| {
                    log.borrow_mut().push(tag);
                    Ok(())
                })
            }
        };
        (log, writer)
    }

    #[test]
    fn immediate_completes_in_one_tick() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = mark("ran");
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Done);
        assert_eq!(*log.borrow(), vec!["ran"]);
    }

    #[test]
    fn seq_runs_in_declaration_order_within_one_tick() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = seq(vec![mark("a"), mark("b"), mark("c")]);
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Done);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn seq_waits_for_suspended_child() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = seq(vec![mark("a"), wait(1.0), mark("b")]);

        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);
        assert_eq!(*log.borrow(), vec!["a"]);

        // Not yet: the wait deadline is one second after its first tick.
        assert_eq!(rig.tick(&mut root, 0.5), Progress::Pending);
        assert_eq!(*log.borrow(), vec!["a"]);

        assert_eq!(rig.tick(&mut root, 0.6), Progress::Done);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn wait_zero_completes_on_first_tick() {
        let mut rig = Rig::new();
        let mut root = wait(0.0);
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Done);
    }

    #[test]
    fn fork_joins_on_slowest_child() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = fork(vec![
            seq(vec![wait(2.0), mark("slow")]),
            seq(vec![wait(0.5), mark("fast")]),
        ]);

        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);
        assert_eq!(rig.tick(&mut root, 0.6), Progress::Pending);
        assert_eq!(*log.borrow(), vec!["fast"]);
        assert_eq!(rig.tick(&mut root, 2.0), Progress::Done);
        assert_eq!(*log.borrow(), vec!["fast", "slow"]);
    }

    #[test]
    fn fork_any_first_winner_silences_losers() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = fork_any(vec![
            seq(vec![wait(5.0), mark("loser")]),
            seq(vec![wait(0.5), mark("winner")]),
        ]);

        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);
        assert_eq!(rig.tick(&mut root, 1.0), Progress::Done);
        assert_eq!(*log.borrow(), vec!["winner"]);

        // The losing branch's wait would have elapsed by now; a settled
        // race must not tick it back to life.
        for _ in 0..10 {
            assert_eq!(rig.tick(&mut root, 1.0), Progress::Pending);
        }
        assert_eq!(*log.borrow(), vec!["winner"]);
    }

    #[test]
    fn fork_any_same_tick_tie_goes_to_first_declared() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = fork_any(vec![mark("first"), mark("second")]);
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Done);
        assert_eq!(*log.borrow(), vec!["first"]);
    }

    #[test]
    fn fork_any_empty_never_completes() {
        let mut rig = Rig::new();
        let mut root = fork_any(vec![]);
        for _ in 0..5 {
            assert_eq!(rig.tick(&mut root, 1.0), Progress::Pending);
        }
    }

    #[test]
    fn never_complete_stays_pending() {
        let mut rig = Rig::new();
        let mut root = never_complete();
        for _ in 0..5 {
            assert_eq!(rig.tick(&mut root, 10.0), Progress::Pending);
        }
    }

    #[test]
    fn repeat_while_skips_body_when_condition_starts_false() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = repeat_while(|_| Ok(false), move |_| mark("body"));
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Done);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn repeat_while_reevaluates_between_iterations() {
        let mut rig = Rig::new();
        rig.ctx.set_count("laps", 3.0);
        let mut root = repeat_while(
            |frame| Ok(frame.ctx.count("laps") > 0.0),
            |_| {
                seq(vec![
                    wait(1.0),
                    immediate(|frame| {
                        let laps = frame.ctx.count("laps");
                        frame.ctx.set_count("laps", laps - 1.0);
                        Ok(())
                    }),
                ])
            },
        );

        let mut ticks = 0;
        while rig.tick(&mut root, 1.0) == Progress::Pending {
            ticks += 1;
            assert!(ticks < 20, "loop failed to terminate");
        }
        assert_eq!(rig.ctx.count("laps"), 0.0);
    }

    #[test]
    fn stopping_a_sequence_cancels_only_the_active_child() {
        let mut rig = Rig::new();
        let stopped: Rc<RefCell<Vec<&'static str>>> = Rc::default();

        let tracked = |tag: &'static str, log: &Rc<RefCell<Vec<&'static str>>>| {
            let log = log.clone();
            step(
                |_| Ok(Progress::Pending),
                move |_| log.borrow_mut().push(tag),
            )
        };

        let mut root = seq(vec![
            immediate(|_| Ok(())),
            tracked("active", &stopped),
            tracked("never_started", &stopped),
        ]);
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);

        rig.stop(&mut root);
        assert_eq!(*stopped.borrow(), vec!["active"]);
    }

    #[test]
    fn stopped_tree_never_settles_afterwards() {
        let mut rig = Rig::new();
        let (log, mark) = trace();
        let mut root = seq(vec![wait(0.5), mark("late")]);
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);

        rig.stop(&mut root);
        for _ in 0..5 {
            assert_eq!(rig.tick(&mut root, 1.0), Progress::Pending);
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_is_idempotent_and_safe_on_unstarted_steps() {
        let mut rig = Rig::new();
        let mut never_started = wait(1.0);
        rig.stop(&mut never_started);
        rig.stop(&mut never_started);

        let mut finished = immediate(|_| Ok(()));
        assert_eq!(rig.tick(&mut finished, 0.1), Progress::Done);
        rig.stop(&mut finished);
        assert_eq!(rig.tick(&mut finished, 0.1), Progress::Pending);
    }

    #[test]
    fn complete_on_check_polls_at_interval() {
        let mut rig = Rig::new();
        rig.ctx.set_count("checks", 0.0);
        let mut root = complete_on_check(
            |frame| {
                frame.ctx.bump("checks");
                Ok(frame.ctx.flag("ready"))
            },
            1.0,
        );

        // First check happens immediately; further checks once per second.
        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);
        assert_eq!(rig.ctx.count("checks"), 1.0);
        assert_eq!(rig.tick(&mut root, 0.2), Progress::Pending);
        assert_eq!(rig.ctx.count("checks"), 1.0);
        assert_eq!(rig.tick(&mut root, 1.0), Progress::Pending);
        assert_eq!(rig.ctx.count("checks"), 2.0);

        rig.ctx.set_flag("ready", true);
        assert_eq!(rig.tick(&mut root, 1.0), Progress::Done);
    }

    #[test]
    fn with_goals_emits_snapshots_only_on_mutation() {
        let mut rig = Rig::new();
        let goal = rig.goals.add_boolean("goal_a");
        rig.goals.take_dirty();

        let mut root = with_goals(seq(vec![
            immediate(move |frame| {
                frame.goals.start(goal);
                Ok(())
            }),
            wait(1.0),
            immediate(move |frame| {
                frame.goals.complete(goal);
                Ok(())
            }),
        ]));

        assert_eq!(rig.tick(&mut root, 0.1), Progress::Pending);
        assert_eq!(rig.tick(&mut root, 2.0), Progress::Done);
        assert!(rig.goals.is_complete(goal));
    }

    #[test]
    fn step_arg_resolves_lazily_from_context() {
        let mut rig = Rig::new();
        let arg: StepArg<EntityId> = ContextKey::PlayerHero.into();

        // Slot not populated yet: resolving is a hard error.
        {
            let mut frame = Frame {
                world: &mut rig.world,
                ctx: &mut rig.ctx,
                goals: &mut rig.goals,
                time: Tick { now: 0.0, dt: 0.0 },
            };
            assert!(arg.resolve(&frame).is_err());
            frame.ctx.set_entity(ContextKey::PlayerHero, EntityId(5));
            assert_eq!(arg.resolve(&frame).unwrap(), EntityId(5));
        }

        let literal: StepArg<f32> = 4.5f32.into();
        let frame = Frame {
            world: &mut rig.world,
            ctx: &mut rig.ctx,
            goals: &mut rig.goals,
            time: Tick { now: 0.0, dt: 0.0 },
        };
        assert_eq!(literal.resolve(&frame).unwrap(), 4.5);
    }
}
