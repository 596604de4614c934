/// The boundary to the host game. The engine treats everything behind this
/// trait as opaque: it issues effects and polls observable state, nothing
/// more. Real games implement it over their scripting bindings; tests and
/// demos use [`crate::sim::SimWorld`].
use crate::schema::entity::{EntityId, LocalizationKey, Position, Team};
use crate::schema::goal::GoalView;
use crate::schema::order::CastTarget;
use crate::schema::section::RequiredState;

/// Handle to an in-flight dialog line, used to poll and cancel playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DialogToken(pub u64);

pub trait GameWorld {
    // -- dialogue -----------------------------------------------------------

    /// Begin playing a voiced line on a speaker. Returns a token the engine
    /// polls for completion.
    fn play_dialog(&mut self, line: &LocalizationKey, speaker: EntityId) -> DialogToken;
    fn dialog_finished(&self, token: DialogToken) -> bool;
    /// Cut playback early. Must be a no-op for finished/unknown tokens.
    fn stop_dialog(&mut self, token: DialogToken) {
        let _ = token;
    }

    // -- camera -------------------------------------------------------------

    fn set_camera_target(&mut self, target: Option<EntityId>) {
        let _ = target;
    }
    fn pan_camera(&mut self, from: Position, to: Position, duration: f32) {
        let _ = (from, to, duration);
    }

    // -- units --------------------------------------------------------------

    fn spawn_unit(&mut self, name: &str, at: Position, team: Team) -> EntityId;
    fn remove_unit(&mut self, unit: EntityId) {
        let _ = unit;
    }
    fn unit_position(&self, unit: EntityId) -> Option<Position>;
    fn unit_alive(&self, unit: EntityId) -> bool;
    fn is_attacking(&self, unit: EntityId) -> bool {
        let _ = unit;
        false
    }
    fn issue_move_order(&mut self, unit: EntityId, to: Position) {
        let _ = (unit, to);
    }
    fn issue_attack_move(&mut self, unit: EntityId, to: Position) {
        let _ = (unit, to);
    }
    fn teleport_unit(&mut self, unit: EntityId, to: Position) {
        let _ = (unit, to);
    }
    fn set_frozen(&mut self, unit: EntityId, frozen: bool) {
        let _ = (unit, frozen);
    }
    fn set_pacifist(&mut self, unit: EntityId, pacifist: bool) {
        let _ = (unit, pacifist);
    }
    fn heal(&mut self, unit: EntityId) {
        let _ = unit;
    }

    // -- abilities ----------------------------------------------------------

    /// `None` when the unit does not know the ability at all.
    fn ability_ready(&self, unit: EntityId, ability: &str) -> Option<bool> {
        let _ = (unit, ability);
        None
    }
    /// Make sure a scripted unit can cast an ability (level it up if the
    /// host requires that).
    fn ensure_ability(&mut self, unit: EntityId, ability: &str) {
        let _ = (unit, ability);
    }
    fn cast_ability(&mut self, unit: EntityId, ability: &str, target: CastTarget) {
        let _ = (unit, ability, target);
    }

    // -- items and shopping -------------------------------------------------

    fn shop_open(&self) -> bool {
        false
    }
    fn has_item(&self, unit: EntityId, item: &str) -> bool {
        let _ = (unit, item);
        false
    }
    fn add_item(&mut self, unit: EntityId, item: &str) {
        let _ = (unit, item);
    }
    fn clear_inventory(&mut self, unit: EntityId) {
        let _ = unit;
    }
    fn clear_stash(&mut self, unit: EntityId) {
        let _ = unit;
    }
    fn set_gold(&mut self, unit: EntityId, amount: u32) {
        let _ = (unit, amount);
    }

    // -- UI and feedback ----------------------------------------------------

    fn highlight_ui(&mut self, path: &str) {
        let _ = path;
    }
    fn remove_highlight(&mut self, path: &str) {
        let _ = path;
    }
    fn minimap_ping(&mut self, at: Position, duration: f32) {
        let _ = (at, duration);
    }
    /// Put a destination marker (and optional waypoint trail) on the map.
    fn mark_location(&mut self, dest: Position, waypoints: &[Position]) {
        let _ = (dest, waypoints);
    }
    fn unmark_location(&mut self) {}
    /// Push the latest goal snapshot to the objective display. An empty
    /// slice clears the display.
    fn render_goals(&mut self, goals: &[GoalView]) {
        let _ = goals;
    }
    fn show_error(&mut self, message: &LocalizationKey) {
        let _ = message;
    }

    // -- miscellaneous world state ------------------------------------------

    fn voice_chat_active(&self) -> bool {
        false
    }
    fn set_time_of_day(&mut self, time: f32) {
        let _ = time;
    }
    /// Establish a section's declared precondition. Called by the runtime
    /// before a section starts; the engine never checks the result.
    fn apply_required_state(&mut self, state: &RequiredState) {
        let _ = state;
    }
}

/// Inert world for exercising pure combinator logic. Every query answers
/// with the least interesting value; dialogs finish instantly.
#[derive(Debug, Default)]
pub struct NoopWorld {
    next_entity: u64,
    next_dialog: u64,
}

impl GameWorld for NoopWorld {
    fn play_dialog(&mut self, _line: &LocalizationKey, _speaker: EntityId) -> DialogToken {
        self.next_dialog += 1;
        DialogToken(self.next_dialog)
    }

    fn dialog_finished(&self, _token: DialogToken) -> bool {
        true
    }

    fn spawn_unit(&mut self, _name: &str, _at: Position, _team: Team) -> EntityId {
        self.next_entity += 1;
        EntityId(self.next_entity)
    }

    fn unit_position(&self, _unit: EntityId) -> Option<Position> {
        Some(Position::default())
    }

    fn unit_alive(&self, _unit: EntityId) -> bool {
        true
    }
}
