/// Step engine integration tests — ordering, join/race semantics,
/// cancellation silence, and goal mirroring, driven over a manual tick loop.
use std::cell::RefCell;
use std::rc::Rc;

use tutorial_graph::core::context::TutorialContext;
use tutorial_graph::core::goals::GoalTracker;
use tutorial_graph::core::step::{
    complete_on_check, fork, fork_any, immediate, never_complete, repeat_while, seq, step, wait,
    with_goals, BoxedStep, Frame, Progress, Tick,
};
use tutorial_graph::core::world::NoopWorld;
use tutorial_graph::schema::goal::GoalState;

struct Harness {
    world: NoopWorld,
    ctx: TutorialContext,
    goals: GoalTracker,
    now: f64,
}

impl Harness {
    fn new() -> Self {
        Harness {
            world: NoopWorld::default(),
            ctx: TutorialContext::new(99),
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

    /// Tick until the root settles or the time budget runs out.
    fn run_for(&mut self, root: &mut BoxedStep, seconds: f64, dt: f64) -> Progress {
        let deadline = self.now + seconds;
        while self.now < deadline {
            if self.tick(root, dt) == Progress::Done {
                return Progress::Done;
            }
        }
        Progress::Pending
    }
}

fn counter() -> (Rc<RefCell<u32>>, BoxedStep) {
    let count: Rc<RefCell<u32>> = Rc::default();
    let bump = {
        let count = count.clone();
        immediate(move |_| {
            *count.borrow_mut() += 1;
            Ok(())
        })
    };
    (count, bump)
}

#[test]
fn seq_children_start_strictly_after_their_predecessor_completes() {
    let mut harness = Harness::new();
    let order: Rc<RefCell<Vec<String>>> = Rc::default();

    let record = |tag: &str, log: &Rc<RefCell<Vec<String>>>| {
        let log = log.clone();
        let tag = tag.to_string();
        immediate(move |_| {
            log.borrow_mut().push(tag.clone());
            Ok(())
        })
    };

    let mut root = seq(vec![
        record("a_start", &order),
        wait(1.0),
        record("a_done_b_start", &order),
        wait(1.0),
        record("b_done_c_start", &order),
    ]);

    assert_eq!(harness.tick(&mut root, 0.25), Progress::Pending);
    assert_eq!(*order.borrow(), vec!["a_start"]);

    assert_eq!(harness.run_for(&mut root, 1.0, 0.25), Progress::Pending);
    assert_eq!(*order.borrow(), vec!["a_start", "a_done_b_start"]);

    assert_eq!(harness.run_for(&mut root, 1.5, 0.25), Progress::Done);
    assert_eq!(
        *order.borrow(),
        vec!["a_start", "a_done_b_start", "b_done_c_start"]
    );
}

#[test]
fn fork_completes_exactly_once_after_all_children() {
    let mut harness = Harness::new();
    let (completions, bump) = counter();

    let mut root = seq(vec![
        fork(vec![seq(vec![wait(2.0)]), seq(vec![wait(0.5)])]),
        bump,
    ]);

    // Fast branch finishing first must not complete the fork early.
    assert_eq!(harness.run_for(&mut root, 1.0, 0.25), Progress::Pending);
    assert_eq!(*completions.borrow(), 0);

    assert_eq!(harness.run_for(&mut root, 2.0, 0.25), Progress::Done);
    assert_eq!(*completions.borrow(), 1);

    // Nothing further can fire once the tree settled.
    for _ in 0..8 {
        assert_eq!(harness.tick(&mut root, 0.5), Progress::Pending);
    }
    assert_eq!(*completions.borrow(), 1);
}

#[test]
fn fork_any_completes_once_and_the_loser_is_never_observed() {
    let mut harness = Harness::new();
    let (loser_ran, loser_mark) = counter();
    let (winner_ran, winner_mark) = counter();

    let mut root = fork_any(vec![
        seq(vec![wait(3.0), loser_mark]),
        seq(vec![wait(0.5), winner_mark]),
    ]);

    assert_eq!(harness.run_for(&mut root, 1.0, 0.25), Progress::Done);
    assert_eq!(*winner_ran.borrow(), 1);
    assert_eq!(*loser_ran.borrow(), 0);

    // Drive well past the loser's would-be completion: the cancelled
    // branch must stay silent.
    for _ in 0..20 {
        assert_eq!(harness.tick(&mut root, 0.5), Progress::Pending);
    }
    assert_eq!(*loser_ran.borrow(), 0);
    assert_eq!(*winner_ran.borrow(), 1);
}

#[test]
fn stopping_a_tree_silences_every_descendant() {
    let mut harness = Harness::new();
    let (fired, mark_a) = counter();
    let mark_b = {
        let fired = fired.clone();
        immediate(move |_| {
            *fired.borrow_mut() += 1;
            Ok(())
        })
    };

    let mut root = fork(vec![
        seq(vec![wait(0.6), mark_a]),
        seq(vec![wait(1.2), mark_b]),
    ]);
    assert_eq!(harness.tick(&mut root, 0.25), Progress::Pending);

    harness.stop(&mut root);

    // Both branch deadlines elapse; neither effect may fire.
    for _ in 0..10 {
        assert_eq!(harness.tick(&mut root, 0.5), Progress::Pending);
    }
    assert_eq!(*fired.borrow(), 0);
}

#[test]
fn repeat_while_with_false_condition_runs_zero_iterations() {
    let mut harness = Harness::new();
    let (bodies, body) = counter();
    // A single-use factory is enough: the body must never be built.
    let body = RefCell::new(Some(body));
    let mut root = repeat_while(
        |_| Ok(false),
        move |_| body.borrow_mut().take().expect("body built once"),
    );

    assert_eq!(harness.tick(&mut root, 0.1), Progress::Done);
    assert_eq!(*bodies.borrow(), 0);
}

#[test]
fn complete_on_check_polls_at_the_declared_interval() {
    let mut harness = Harness::new();
    let checks: Rc<RefCell<u32>> = Rc::default();
    let mut root = {
        let checks = checks.clone();
        complete_on_check(
            move |frame| {
                *checks.borrow_mut() += 1;
                Ok(frame.ctx.flag("trigger"))
            },
            0.5,
        )
    };

    // 2 seconds at dt=0.1 with a 0.5s interval: first check plus four
    // interval checks, within one check of tolerance.
    assert_eq!(harness.run_for(&mut root, 2.0, 0.1), Progress::Pending);
    let observed = *checks.borrow();
    assert!(
        (4..=6).contains(&observed),
        "expected ~5 checks, saw {observed}"
    );

    harness.ctx.set_flag("trigger", true);
    assert_eq!(harness.run_for(&mut root, 1.0, 0.1), Progress::Done);
}

#[test]
fn race_between_never_complete_and_timed_effect() {
    let mut harness = Harness::new();
    let (done_count, mark_done) = counter();

    let mut root = fork_any(vec![
        never_complete(),
        seq(vec![wait(1.0), mark_done]),
    ]);

    let mut completions = 0;
    let deadline = harness.now + 3.0;
    while harness.now < deadline {
        if harness.tick(&mut root, 0.1) == Progress::Done {
            completions += 1;
        }
    }

    assert_eq!(*done_count.borrow(), 1, "effect must run exactly once");
    assert_eq!(completions, 1, "race must complete exactly once");
}

#[test]
fn sibling_fork_branches_share_the_context_safely() {
    let mut harness = Harness::new();
    let branches = 4;

    let mut root = fork(
        (0..branches)
            .map(|_| {
                immediate(|frame| {
                    frame.ctx.bump("shared_counter");
                    Ok(())
                })
            })
            .collect(),
    );

    assert_eq!(harness.tick(&mut root, 0.1), Progress::Done);
    assert_eq!(harness.ctx.count("shared_counter"), branches as f64);
}

#[test]
fn goal_progress_mirrors_through_with_goals() {
    let mut harness = Harness::new();
    let kills = harness.goals.add_numeric("goal_demo_kills", 5);
    harness.goals.take_dirty();

    let mut root = with_goals(seq(vec![
        immediate(move |frame| {
            frame.goals.start(kills);
            frame.goals.set_value(kills, 3);
            Ok(())
        }),
        wait(0.5),
        immediate(move |frame| {
            frame.goals.complete(kills);
            Ok(())
        }),
    ]));

    assert_eq!(harness.tick(&mut root, 0.1), Progress::Pending);
    let view = &harness.goals.snapshot()[0];
    assert_eq!(view.state, GoalState::Active);
    assert_eq!(view.current_value, Some(3));

    assert_eq!(harness.run_for(&mut root, 1.0, 0.1), Progress::Done);
    let view = &harness.goals.snapshot()[0];
    assert_eq!(view.state, GoalState::Complete);
    assert_eq!(view.current_value, Some(5));
}

#[test]
fn generic_leaf_stop_releases_its_work() {
    let mut harness = Harness::new();
    let released: Rc<RefCell<bool>> = Rc::default();

    let mut root = {
        let released = released.clone();
        step(
            |_| Ok(Progress::Pending),
            move |_| *released.borrow_mut() = true,
        )
    };

    assert_eq!(harness.tick(&mut root, 0.1), Progress::Pending);
    harness.stop(&mut root);
    assert!(*released.borrow());

    // And a leaf that never started has nothing to release.
    let second: Rc<RefCell<bool>> = Rc::default();
    let mut idle = {
        let second = second.clone();
        step(
            |_| Ok(Progress::Pending),
            move |_| *second.borrow_mut() = true,
        )
    };
    harness.stop(&mut idle);
    assert!(!*second.borrow());
}
