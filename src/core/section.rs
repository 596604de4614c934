/// Section composition root — pairs a declared world-state precondition,
/// a start/stop lifecycle, and an optional order-validation filter around
/// exactly one running step tree; plus the small runtime that chains
/// sections into a tutorial.
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::context::TutorialContext;
use crate::core::goals::GoalTracker;
use crate::core::step::{BoxedStep, Frame, GraphError, Progress, Tick};
use crate::core::world::GameWorld;
use crate::schema::goal::GoalView;
use crate::schema::order::{OrderVerdict, PlayerOrder};
use crate::schema::section::{RequiredState, SectionName};

#[derive(Debug, Error)]
pub enum SectionError {
    #[error("section '{section}' aborted: {source}")]
    Aborted {
        section: SectionName,
        #[source]
        source: GraphError,
    },
}

/// Lifecycle of a section instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStatus {
    Idle,
    Running,
    Completed,
    Stopped,
}

/// What a section's builder hands back: the goal list it declared and the
/// root of the step tree that will drive it.
pub struct SectionGraph {
    pub goals: GoalTracker,
    pub root: BoxedStep,
}

pub type BuildFn =
    Box<dyn FnMut(&mut TutorialContext, &mut dyn GameWorld) -> Result<SectionGraph, GraphError>>;
pub type CleanupFn = Box<dyn FnMut(&mut TutorialContext, &mut dyn GameWorld)>;
pub type OrderFilterFn =
    Box<dyn FnMut(&mut TutorialContext, &mut dyn GameWorld, &PlayerOrder) -> OrderVerdict>;

struct RunState {
    root: BoxedStep,
    goals: GoalTracker,
    last_now: f64,
}

pub struct FunctionalSection {
    name: SectionName,
    required_state: RequiredState,
    build: BuildFn,
    cleanup: Option<CleanupFn>,
    order_filter: Option<OrderFilterFn>,
    run: Option<RunState>,
    status: SectionStatus,
}

impl FunctionalSection {
    pub fn new(
        name: SectionName,
        required_state: RequiredState,
        build: impl FnMut(&mut TutorialContext, &mut dyn GameWorld) -> Result<SectionGraph, GraphError>
            + 'static,
    ) -> Self {
        FunctionalSection {
            name,
            required_state,
            build: Box::new(build),
            cleanup: None,
            order_filter: None,
            run: None,
            status: SectionStatus::Idle,
        }
    }

    /// Release section-owned entities and effects on early teardown.
    pub fn with_cleanup(
        mut self,
        cleanup: impl FnMut(&mut TutorialContext, &mut dyn GameWorld) + 'static,
    ) -> Self {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Validate player-issued orders while this section runs. Denying an
    /// order never moves step or goal state; only explicit step logic does.
    pub fn with_order_filter(
        mut self,
        filter: impl FnMut(&mut TutorialContext, &mut dyn GameWorld, &PlayerOrder) -> OrderVerdict
            + 'static,
    ) -> Self {
        self.order_filter = Some(Box::new(filter));
        self
    }

    pub fn name(&self) -> &SectionName {
        &self.name
    }

    pub fn required_state(&self) -> &RequiredState {
        &self.required_state
    }

    pub fn status(&self) -> SectionStatus {
        self.status
    }

    /// Current goal list, if a run exists. Survives completion so the host
    /// can keep rendering the finished checklist.
    pub fn goal_snapshot(&self) -> Option<Vec<GoalView>> {
        self.run.as_ref().map(|run| run.goals.snapshot())
    }

    /// Build a fresh run and tick it once so graphs behave like the
    /// synchronous starts sections are written against. A running section
    /// is stopped before restarting.
    pub fn start(
        &mut self,
        world: &mut dyn GameWorld,
        ctx: &mut TutorialContext,
        now: f64,
    ) -> Result<(), SectionError> {
        if self.status == SectionStatus::Running {
            self.stop(world, ctx);
        }
        info!(section = %self.name, "starting section");
        let graph = (self.build)(ctx, world).map_err(|source| SectionError::Aborted {
            section: self.name.clone(),
            source,
        })?;
        self.run = Some(RunState {
            root: graph.root,
            goals: graph.goals,
            last_now: now,
        });
        self.status = SectionStatus::Running;
        self.tick(world, ctx, now)?;
        Ok(())
    }

    /// Drive the running tree by one tick. Fatal graph errors tear the
    /// section down (cleanup still runs) and surface to the caller.
    pub fn tick(
        &mut self,
        world: &mut dyn GameWorld,
        ctx: &mut TutorialContext,
        now: f64,
    ) -> Result<SectionStatus, SectionError> {
        if self.status != SectionStatus::Running {
            return Ok(self.status);
        }
        let run = self.run.as_mut().expect("running section has a live run");
        let dt = (now - run.last_now).max(0.0);
        run.last_now = now;

        let progress = {
            let mut frame = Frame {
                world: &mut *world,
                ctx: &mut *ctx,
                goals: &mut run.goals,
                time: Tick { now, dt },
            };
            run.root.tick(&mut frame)
        };

        match progress {
            Ok(Progress::Done) => {
                info!(section = %self.name, "section completed");
                self.status = SectionStatus::Completed;
            }
            Ok(Progress::Pending) => {}
            Err(source) => {
                error!(section = %self.name, error = %source, "section aborted");
                self.teardown(world, ctx);
                return Err(SectionError::Aborted {
                    section: self.name.clone(),
                    source,
                });
            }
        }
        Ok(self.status)
    }

    /// Cancel the live run early (player skip, external interruption).
    /// No-op unless the section is Running.
    pub fn stop(&mut self, world: &mut dyn GameWorld, ctx: &mut TutorialContext) {
        if self.status != SectionStatus::Running {
            return;
        }
        info!(section = %self.name, "stopping section");
        self.teardown(world, ctx);
    }

    fn teardown(&mut self, world: &mut dyn GameWorld, ctx: &mut TutorialContext) {
        if let Some(mut run) = self.run.take() {
            let mut frame = Frame {
                world: &mut *world,
                ctx: &mut *ctx,
                goals: &mut run.goals,
                time: Tick {
                    now: run.last_now,
                    dt: 0.0,
                },
            };
            run.root.stop(&mut frame);
        }
        if let Some(cleanup) = self.cleanup.as_mut() {
            cleanup(ctx, world);
        }
        world.render_goals(&[]);
        self.status = SectionStatus::Stopped;
    }

    /// Consult the order filter. Orders from scripted units, and every
    /// order while the section is not running, pass through untouched.
    pub fn filter_order(
        &mut self,
        world: &mut dyn GameWorld,
        ctx: &mut TutorialContext,
        order: &PlayerOrder,
    ) -> OrderVerdict {
        if self.status != SectionStatus::Running || !order.issued_by_player {
            return OrderVerdict::Allow;
        }
        let Some(filter) = self.order_filter.as_mut() else {
            return OrderVerdict::Allow;
        };
        let verdict = filter(ctx, world, order);
        if !verdict.is_allowed() {
            debug!(section = %self.name, ?order, "order denied");
        }
        verdict
    }
}

// ---------------------------------------------------------------------------
// TutorialMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineStatus {
    Idle,
    Running,
    Finished,
}

/// Chains sections into one tutorial: owns the shared context, applies each
/// section's required state through the world, advances on completion, and
/// routes player orders to the active section's filter.
pub struct TutorialMachine {
    sections: Vec<FunctionalSection>,
    active: Option<usize>,
    ctx: TutorialContext,
    status: MachineStatus,
}

impl TutorialMachine {
    pub fn new(seed: u64) -> Self {
        TutorialMachine {
            sections: Vec::new(),
            active: None,
            ctx: TutorialContext::new(seed),
            status: MachineStatus::Idle,
        }
    }

    pub fn add_section(&mut self, section: FunctionalSection) {
        self.sections.push(section);
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn context(&self) -> &TutorialContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut TutorialContext {
        &mut self.ctx
    }

    pub fn active_section(&self) -> Option<&FunctionalSection> {
        self.active.map(|i| &self.sections[i])
    }

    pub fn goal_snapshot(&self) -> Option<Vec<GoalView>> {
        self.active_section().and_then(|s| s.goal_snapshot())
    }

    /// Begin the tutorial at its first section.
    pub fn start(&mut self, world: &mut dyn GameWorld, now: f64) -> Result<(), SectionError> {
        self.begin(0, world, now)
    }

    fn begin(
        &mut self,
        index: usize,
        world: &mut dyn GameWorld,
        now: f64,
    ) -> Result<(), SectionError> {
        if index >= self.sections.len() {
            self.active = None;
            self.status = MachineStatus::Finished;
            info!("tutorial finished");
            return Ok(());
        }
        self.ctx.clear_vars();
        let section = &mut self.sections[index];
        world.apply_required_state(section.required_state());
        self.active = Some(index);
        self.status = MachineStatus::Running;
        match section.start(world, &mut self.ctx, now) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.active = None;
                self.status = MachineStatus::Idle;
                Err(err)
            }
        }
    }

    /// Drive the active section. A completed section hands off to the next
    /// one in the same call; a fatal error aborts the whole run.
    pub fn tick(
        &mut self,
        world: &mut dyn GameWorld,
        now: f64,
    ) -> Result<MachineStatus, SectionError> {
        let Some(index) = self.active else {
            return Ok(self.status);
        };
        let section = &mut self.sections[index];
        match section.tick(world, &mut self.ctx, now) {
            Ok(SectionStatus::Completed) => {
                self.begin(index + 1, world, now)?;
                Ok(self.status)
            }
            Ok(_) => Ok(self.status),
            Err(err) => {
                self.active = None;
                self.status = MachineStatus::Idle;
                Err(err)
            }
        }
    }

    /// Skip the active section (cancelling its tree) and start the next.
    pub fn skip_section(
        &mut self,
        world: &mut dyn GameWorld,
        now: f64,
    ) -> Result<(), SectionError> {
        let Some(index) = self.active else {
            return Ok(());
        };
        self.sections[index].stop(world, &mut self.ctx);
        self.begin(index + 1, world, now)
    }

    /// Tear down the active section without advancing.
    pub fn stop(&mut self, world: &mut dyn GameWorld) {
        if let Some(index) = self.active.take() {
            self.sections[index].stop(world, &mut self.ctx);
        }
        self.status = MachineStatus::Idle;
    }

    /// Run a player order past the active section's filter, surfacing any
    /// denial message through the world. The caller commits the order only
    /// on `Allow`.
    pub fn filter_order(
        &mut self,
        world: &mut dyn GameWorld,
        order: &PlayerOrder,
    ) -> OrderVerdict {
        let Some(index) = self.active else {
            return OrderVerdict::Allow;
        };
        let verdict = self.sections[index].filter_order(world, &mut self.ctx, order);
        if let OrderVerdict::Deny {
            message: Some(message),
        } = &verdict
        {
            world.show_error(message);
        }
        verdict
    }
}
