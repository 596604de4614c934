/// Goal tracking — ordered user-visible objectives mutated by a running
/// step tree and mirrored to the UI as immutable snapshots.
use crate::schema::entity::LocalizationKey;
use crate::schema::goal::{GoalKind, GoalState, GoalView};

/// Handle to one goal in its tracker. Handles are plain indices; they are
/// only meaningful against the tracker that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalHandle(usize);

#[derive(Debug, Clone)]
struct GoalEntry {
    label: LocalizationKey,
    kind: GoalKind,
    state: GoalState,
    current: u32,
    target: u32,
}

/// Owns the ordered goal list for one section run. Goals are append-only;
/// declaration order is display order.
#[derive(Debug, Default)]
pub struct GoalTracker {
    goals: Vec<GoalEntry>,
    dirty: bool,
}

impl GoalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_boolean(&mut self, label: impl Into<LocalizationKey>) -> GoalHandle {
        self.goals.push(GoalEntry {
            label: label.into(),
            kind: GoalKind::Boolean,
            state: GoalState::Pending,
            current: 0,
            target: 0,
        });
        self.dirty = true;
        GoalHandle(self.goals.len() - 1)
    }

    pub fn add_numeric(&mut self, label: impl Into<LocalizationKey>, target: u32) -> GoalHandle {
        self.goals.push(GoalEntry {
            label: label.into(),
            kind: GoalKind::Numeric,
            state: GoalState::Pending,
            current: 0,
            target,
        });
        self.dirty = true;
        GoalHandle(self.goals.len() - 1)
    }

    /// Show the goal as the player's current objective.
    pub fn start(&mut self, handle: GoalHandle) {
        let goal = &mut self.goals[handle.0];
        if goal.state == GoalState::Pending {
            goal.state = GoalState::Active;
            self.dirty = true;
        }
    }

    /// Force the goal complete. Safe to call repeatedly; numeric goals jump
    /// to their target regardless of prior progress.
    pub fn complete(&mut self, handle: GoalHandle) {
        let goal = &mut self.goals[handle.0];
        if goal.state != GoalState::Complete || goal.current != goal.target {
            goal.state = GoalState::Complete;
            goal.current = goal.target;
            self.dirty = true;
        }
    }

    /// Update a numeric goal's progress. Reaching the target completes the
    /// goal; values past the target are kept but clamp in the snapshot.
    pub fn set_value(&mut self, handle: GoalHandle, value: u32) {
        let goal = &mut self.goals[handle.0];
        if goal.kind != GoalKind::Numeric || goal.current == value {
            return;
        }
        goal.current = value;
        if value >= goal.target {
            goal.state = GoalState::Complete;
        }
        self.dirty = true;
    }

    pub fn is_complete(&self, handle: GoalHandle) -> bool {
        self.goals[handle.0].state == GoalState::Complete
    }

    /// Ordered immutable snapshot for the rendering layer.
    pub fn snapshot(&self) -> Vec<GoalView> {
        self.goals
            .iter()
            .map(|goal| GoalView {
                label: goal.label.clone(),
                kind: goal.kind,
                state: goal.state,
                current_value: match goal.kind {
                    GoalKind::Numeric => Some(goal.current.min(goal.target)),
                    GoalKind::Boolean => None,
                },
                target_value: match goal.kind {
                    GoalKind::Numeric => Some(goal.target),
                    GoalKind::Boolean => None,
                },
            })
            .collect()
    }

    /// True once since the last call if any goal changed. The `with_goals`
    /// decorator uses this to emit snapshots only on mutation.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_preserved() {
        let mut tracker = GoalTracker::new();
        tracker.add_boolean("goal_a");
        tracker.add_numeric("goal_b", 3);
        tracker.add_boolean("goal_c");

        let snapshot = tracker.snapshot();
        let labels: Vec<&str> = snapshot.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["goal_a", "goal_b", "goal_c"]);
    }

    #[test]
    fn numeric_progress_then_completion() {
        let mut tracker = GoalTracker::new();
        let kills = tracker.add_numeric("goal_defeat", 5);
        tracker.start(kills);

        tracker.set_value(kills, 3);
        let view = &tracker.snapshot()[0];
        assert_eq!(view.state, GoalState::Active);
        assert_eq!(view.current_value, Some(3));
        assert_eq!(view.target_value, Some(5));

        tracker.set_value(kills, 5);
        let view = &tracker.snapshot()[0];
        assert_eq!(view.state, GoalState::Complete);
        assert_eq!(view.current_value, Some(5));
    }

    #[test]
    fn complete_forces_full_progress() {
        let mut tracker = GoalTracker::new();
        let kills = tracker.add_numeric("goal_defeat", 5);
        tracker.start(kills);
        tracker.set_value(kills, 3);

        tracker.complete(kills);
        let view = &tracker.snapshot()[0];
        assert_eq!(view.state, GoalState::Complete);
        assert_eq!(view.current_value, Some(5));
    }

    #[test]
    fn overshoot_clamps_in_snapshot() {
        let mut tracker = GoalTracker::new();
        let kills = tracker.add_numeric("goal_defeat", 5);
        tracker.set_value(kills, 9);
        let view = &tracker.snapshot()[0];
        assert_eq!(view.current_value, Some(5));
        assert_eq!(view.state, GoalState::Complete);
    }

    #[test]
    fn dirty_flag_tracks_mutation() {
        let mut tracker = GoalTracker::new();
        let goal = tracker.add_boolean("goal_a");
        assert!(tracker.take_dirty());
        assert!(!tracker.take_dirty());

        tracker.start(goal);
        assert!(tracker.take_dirty());

        // Completing twice only dirties once.
        tracker.complete(goal);
        assert!(tracker.take_dirty());
        tracker.complete(goal);
        assert!(!tracker.take_dirty());
    }

    #[test]
    fn start_after_complete_is_ignored() {
        let mut tracker = GoalTracker::new();
        let goal = tracker.add_boolean("goal_a");
        tracker.complete(goal);
        tracker.start(goal);
        assert!(tracker.is_complete(goal));
    }
}
