/// Domain leaf steps — the bindings-backed primitives section content is
/// built from. Each one follows the same contract as the pure combinators:
/// settle `Done` at most once, release everything it started on `stop`.
use crate::core::step::{
    BoxedStep, Frame, GraphError, NodeState, Progress, Step, StepArg, StepResult,
};
use crate::core::world::DialogToken;
use crate::schema::entity::{EntityId, LocalizationKey, Position};
use crate::schema::order::CastTarget;

/// How close an ordered unit must get before `move_unit` settles.
const ARRIVAL_TOLERANCE: f32 = 32.0;
/// How close the player hero must get before `go_to_location` settles.
const LOCATION_TOLERANCE: f32 = 200.0;

// ---------------------------------------------------------------------------
// Dialogue
// ---------------------------------------------------------------------------

struct AudioDialog {
    line: LocalizationKey,
    speaker: StepArg<EntityId>,
    token: Option<DialogToken>,
    state: NodeState,
}

impl Step for AudioDialog {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let token = match self.token {
            Some(token) => token,
            None => {
                let speaker = self.speaker.resolve(frame)?;
                let token = frame.world.play_dialog(&self.line, speaker);
                self.token = Some(token);
                token
            }
        };
        if frame.world.dialog_finished(token) {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if let Some(token) = self.token.take() {
            frame.world.stop_dialog(token);
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Play a voiced line on a speaker and hold until playback finishes.
/// Stopping the step cuts playback.
pub fn audio_dialog(
    line: impl Into<LocalizationKey>,
    speaker: impl Into<StepArg<EntityId>>,
) -> BoxedStep {
    Box::new(AudioDialog {
        line: line.into(),
        speaker: speaker.into(),
        token: None,
        state: NodeState::Idle,
    })
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

struct SetCameraTarget {
    target: Option<StepArg<EntityId>>,
    state: NodeState,
}

impl Step for SetCameraTarget {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        let target = match &self.target {
            Some(arg) => Some(arg.resolve(frame)?),
            None => None,
        };
        frame.world.set_camera_target(target);
        self.state = NodeState::Done;
        Ok(Progress::Done)
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Lock the camera onto a unit, or release it with `None`. Completes
/// immediately.
pub fn set_camera_target(target: Option<StepArg<EntityId>>) -> BoxedStep {
    Box::new(SetCameraTarget {
        target,
        state: NodeState::Idle,
    })
}

struct PanCamera {
    from: StepArg<Position>,
    to: StepArg<Position>,
    duration: f32,
    deadline: Option<f64>,
    state: NodeState,
}

impl Step for PanCamera {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let deadline = match self.deadline {
            Some(deadline) => deadline,
            None => {
                let from = self.from.resolve(frame)?;
                let to = self.to.resolve(frame)?;
                frame.world.pan_camera(from, to, self.duration);
                let deadline = frame.time.now + self.duration as f64;
                self.deadline = Some(deadline);
                deadline
            }
        };
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

/// Exponential camera pan between two points, settling once the pan
/// duration has elapsed. Endpoints resolve when the pan starts, so a pan
/// can chase a unit spawned moments earlier.
pub fn pan_camera_exponential(
    from: impl Into<StepArg<Position>>,
    to: impl Into<StepArg<Position>>,
    duration: f32,
) -> BoxedStep {
    Box::new(PanCamera {
        from: from.into(),
        to: to.into(),
        duration,
        deadline: None,
        state: NodeState::Idle,
    })
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

struct MoveUnit {
    unit: StepArg<EntityId>,
    to: StepArg<Position>,
    ordered: Option<(EntityId, Position)>,
    state: NodeState,
}

impl Step for MoveUnit {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let (unit, to) = match self.ordered {
            Some(ordered) => ordered,
            None => {
                let unit = self.unit.resolve(frame)?;
                let to = self.to.resolve(frame)?;
                frame.world.issue_move_order(unit, to);
                self.ordered = Some((unit, to));
                (unit, to)
            }
        };
        let at = frame
            .world
            .unit_position(unit)
            .ok_or(GraphError::UnknownEntity(unit))?;
        if at.distance_2d(&to) <= ARRIVAL_TOLERANCE {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Order a scripted unit somewhere and hold until it arrives.
pub fn move_unit(
    unit: impl Into<StepArg<EntityId>>,
    to: impl Into<StepArg<Position>>,
) -> BoxedStep {
    Box::new(MoveUnit {
        unit: unit.into(),
        to: to.into(),
        ordered: None,
        state: NodeState::Idle,
    })
}

struct GoToLocation {
    dest: StepArg<Position>,
    waypoints: StepArg<Vec<Position>>,
    hero: StepArg<EntityId>,
    marked: Option<Position>,
    state: NodeState,
}

impl Step for GoToLocation {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let dest = match self.marked {
            Some(dest) => dest,
            None => {
                let dest = self.dest.resolve(frame)?;
                let waypoints = self.waypoints.resolve(frame)?;
                frame.world.mark_location(dest, &waypoints);
                self.marked = Some(dest);
                dest
            }
        };
        let hero = self.hero.resolve(frame)?;
        let at = frame
            .world
            .unit_position(hero)
            .ok_or(GraphError::UnknownEntity(hero))?;
        if at.distance_2d(&dest) <= LOCATION_TOLERANCE {
            frame.world.unmark_location();
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, frame: &mut Frame<'_>) {
        if self.marked.take().is_some() {
            frame.world.unmark_location();
        }
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Ask the player to walk somewhere: marks the destination (plus a
/// waypoint trail resolved when the step starts) and holds until the hero
/// gets close enough.
pub fn go_to_location(
    dest: impl Into<StepArg<Position>>,
    waypoints: impl Into<StepArg<Vec<Position>>>,
    hero: impl Into<StepArg<EntityId>>,
) -> BoxedStep {
    Box::new(GoToLocation {
        dest: dest.into(),
        waypoints: waypoints.into(),
        hero: hero.into(),
        marked: None,
        state: NodeState::Idle,
    })
}

// ---------------------------------------------------------------------------
// Input detection
// ---------------------------------------------------------------------------

struct WaitForVoiceChat {
    state: NodeState,
}

impl Step for WaitForVoiceChat {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        if frame.world.voice_chat_active() {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Hold until the player keys their voice chat.
pub fn wait_for_voice_chat() -> BoxedStep {
    Box::new(WaitForVoiceChat {
        state: NodeState::Idle,
    })
}

// ---------------------------------------------------------------------------
// Abilities
// ---------------------------------------------------------------------------

/// Target of a scripted ability cast, resolved when the cast is issued.
pub enum AbilityTarget {
    NoTarget,
    Unit(StepArg<EntityId>),
    Point(StepArg<Position>),
}

struct UseAbility {
    unit: StepArg<EntityId>,
    ability: StepArg<String>,
    target: AbilityTarget,
    cast: Option<(EntityId, String)>,
    state: NodeState,
}

impl Step for UseAbility {
    fn tick(&mut self, frame: &mut Frame<'_>) -> StepResult {
        if self.state.settled() {
            return Ok(Progress::Pending);
        }
        self.state = NodeState::Running;
        let (unit, ability) = match &self.cast {
            Some((unit, ability)) => (*unit, ability.clone()),
            None => {
                let unit = self.unit.resolve(frame)?;
                let ability = self.ability.resolve(frame)?;
                let target = match &self.target {
                    AbilityTarget::NoTarget => CastTarget::NoTarget,
                    AbilityTarget::Unit(arg) => CastTarget::Unit(arg.resolve(frame)?),
                    AbilityTarget::Point(arg) => CastTarget::Point(arg.resolve(frame)?),
                };
                match frame.world.ability_ready(unit, &ability) {
                    None => {
                        return Err(GraphError::UnknownAbility { unit, ability });
                    }
                    Some(false) => {
                        return Err(GraphError::AbilityOnCooldown { unit, ability });
                    }
                    Some(true) => frame.world.cast_ability(unit, &ability, target),
                }
                self.cast = Some((unit, ability.clone()));
                (unit, ability)
            }
        };
        // The cooldown starting is the only cast-went-off signal the
        // boundary exposes; a cast that never starts one holds this step
        // open until something cancels it.
        if frame.world.ability_ready(unit, &ability) == Some(false) {
            self.state = NodeState::Done;
            Ok(Progress::Done)
        } else {
            Ok(Progress::Pending)
        }
    }

    fn stop(&mut self, _frame: &mut Frame<'_>) {
        if !self.state.settled() {
            self.state = NodeState::Stopped;
        }
    }
}

/// Order a scripted unit to cast an ability; settles once the cast's
/// cooldown begins. Casting while the ability is already cooling down is a
/// scripting error that aborts the run.
pub fn use_ability(
    unit: impl Into<StepArg<EntityId>>,
    ability: impl Into<StepArg<String>>,
    target: AbilityTarget,
) -> BoxedStep {
    Box::new(UseAbility {
        unit: unit.into(),
        ability: ability.into(),
        target,
        cast: None,
        state: NodeState::Idle,
    })
}
