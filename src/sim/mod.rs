//! Simulated game world — a complete in-memory [`GameWorld`] used by the
//! integration tests, the demos, and the web build. Units move at a fixed
//! speed, dialog lines run on the clock using durations from a
//! [`DialogLibrary`], and a small shop/stash/courier model is enough to
//! exercise every built-in section.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::world::{DialogToken, GameWorld};
use crate::schema::dialog::DialogLibrary;
use crate::schema::entity::{EntityId, LocalizationKey, Position, Team};
use crate::schema::goal::GoalView;
use crate::schema::order::{CastTarget, OrderKind, PlayerOrder};
use crate::schema::section::RequiredState;

const DELIVERY_RANGE: f32 = 64.0;
const SECRET_SHOP_RANGE: f32 = 400.0;
const DEFAULT_DIALOG_DURATION: f32 = 2.0;
const DEFAULT_MOVE_SPEED: f32 = 300.0;

#[derive(Debug, Clone)]
struct AbilitySlot {
    cooldown: f32,
    ready_at: f64,
}

/// One simulated unit. Fields are public for test assertions.
#[derive(Debug, Clone)]
pub struct SimUnit {
    pub name: String,
    pub team: Team,
    pub pos: Position,
    pub move_target: Option<Position>,
    pub speed: f32,
    pub alive: bool,
    pub frozen: bool,
    pub pacifist: bool,
    pub attacking: bool,
    pub items: Vec<String>,
    pub stash: Vec<String>,
    pub gold: u32,
    abilities: FxHashMap<String, AbilitySlot>,
}

/// Item combine rule: once a unit holds every input, they collapse into
/// the output.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub inputs: Vec<String>,
    pub output: String,
}

#[derive(Debug, Default)]
pub struct SimWorld {
    now: f64,
    next_entity: u64,
    next_dialog: u64,
    units: FxHashMap<EntityId, SimUnit>,
    player_hero: Option<EntityId>,

    dialog_library: DialogLibrary,
    dialogs: FxHashMap<u64, f64>,
    pub dialog_log: Vec<LocalizationKey>,

    shop_open: bool,
    secret_shop: Option<Position>,
    secret_stock: FxHashSet<String>,
    recipes: Vec<Recipe>,
    pending_delivery: Option<(EntityId, EntityId)>,

    voice_active: bool,
    camera_target: Option<EntityId>,
    pub camera_pans: Vec<(Position, Position, f32)>,
    highlights: FxHashSet<String>,
    marked_location: Option<Position>,
    pub minimap_pings: Vec<Position>,
    pub errors: Vec<LocalizationKey>,
    goal_display: Vec<GoalView>,
    pub cast_log: Vec<(EntityId, String)>,
    time_of_day: f32,
    blockades: FxHashSet<String>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialog_library(library: DialogLibrary) -> Self {
        SimWorld {
            dialog_library: library,
            ..Self::default()
        }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance the simulation clock: moves ordered units and walks a
    /// pending courier delivery to its destination.
    pub fn step(&mut self, dt: f64) {
        self.now += dt;

        for unit in self.units.values_mut() {
            if !unit.alive || unit.frozen {
                continue;
            }
            if let Some(target) = unit.move_target {
                let dist = unit.pos.distance_2d(&target);
                let reach = unit.speed * dt as f32;
                if dist <= reach {
                    unit.pos = Position::new(target.x, target.y, target.z);
                    unit.move_target = None;
                } else {
                    unit.pos.x += (target.x - unit.pos.x) / dist * reach;
                    unit.pos.y += (target.y - unit.pos.y) / dist * reach;
                }
            }
        }

        if let Some((courier_id, hero_id)) = self.pending_delivery {
            let hero_pos = match self.units.get(&hero_id) {
                Some(hero) if hero.alive => hero.pos,
                _ => {
                    self.pending_delivery = None;
                    return;
                }
            };
            let arrived = {
                let Some(courier) = self.units.get_mut(&courier_id) else {
                    self.pending_delivery = None;
                    return;
                };
                if courier.pos.distance_2d(&hero_pos) <= DELIVERY_RANGE {
                    true
                } else {
                    courier.move_target = Some(hero_pos);
                    false
                }
            };
            if arrived {
                let stash = self
                    .units
                    .get_mut(&hero_id)
                    .map(|hero| std::mem::take(&mut hero.stash))
                    .unwrap_or_default();
                for item in stash {
                    self.give_item(hero_id, &item);
                }
                self.pending_delivery = None;
            }
        }
    }

    // -- setup hooks used by tests, demos, and the wasm bridge -------------

    pub fn set_player_hero(&mut self, hero: EntityId) {
        self.player_hero = Some(hero);
    }

    pub fn player_hero(&self) -> Option<EntityId> {
        self.player_hero
    }

    pub fn set_shop_open(&mut self, open: bool) {
        self.shop_open = open;
    }

    /// Place the hidden shop and declare which items it stocks. Purchases
    /// made in range of it go straight to the inventory; everything else
    /// is a remote buy and lands in the stash.
    pub fn stock_secret_shop(&mut self, at: Position, items: &[&str]) {
        self.secret_shop = Some(at);
        self.secret_stock = items.iter().map(|s| s.to_string()).collect();
    }

    pub fn add_recipe(&mut self, inputs: &[&str], output: &str) {
        self.recipes.push(Recipe {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            output: output.to_string(),
        });
    }

    pub fn set_voice_chat(&mut self, active: bool) {
        self.voice_active = active;
    }

    pub fn kill_unit(&mut self, unit: EntityId) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.alive = false;
            unit.attacking = false;
            unit.move_target = None;
        }
    }

    pub fn grant_ability(&mut self, unit: EntityId, ability: &str, cooldown: f32) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.abilities.insert(
                ability.to_string(),
                AbilitySlot {
                    cooldown,
                    ready_at: 0.0,
                },
            );
        }
    }

    pub fn unit(&self, unit: EntityId) -> Option<&SimUnit> {
        self.units.get(&unit)
    }

    pub fn unit_mut(&mut self, unit: EntityId) -> Option<&mut SimUnit> {
        self.units.get_mut(&unit)
    }

    pub fn goal_display(&self) -> &[GoalView] {
        &self.goal_display
    }

    pub fn highlights(&self) -> &FxHashSet<String> {
        &self.highlights
    }

    pub fn camera_target(&self) -> Option<EntityId> {
        self.camera_target
    }

    pub fn marked_location(&self) -> Option<Position> {
        self.marked_location
    }

    pub fn last_error(&self) -> Option<&LocalizationKey> {
        self.errors.last()
    }

    pub fn delivery_pending(&self) -> bool {
        self.pending_delivery.is_some()
    }

    /// Commit an order the filter allowed. This is the host half of the
    /// order boundary: the engine only ever sees the filter call.
    pub fn apply_order(&mut self, order: &PlayerOrder) {
        let Some(unit_id) = order.unit.or(self.player_hero) else {
            return;
        };
        match &order.kind {
            OrderKind::MoveToPosition(to) => self.issue_move_order(unit_id, *to),
            OrderKind::AttackMove(to) => self.issue_attack_move(unit_id, *to),
            OrderKind::PurchaseItem { item } => self.purchase(unit_id, item),
            OrderKind::UseItem { item, target } => {
                if let (true, CastTarget::Point(to)) =
                    (self.has_item(unit_id, item), target)
                {
                    self.teleport_unit(unit_id, *to);
                }
            }
            OrderKind::CastAbility { ability, target } => {
                self.cast_ability(unit_id, ability, *target)
            }
            OrderKind::CourierDeliver => {
                if let Some(hero) = self.player_hero {
                    self.pending_delivery = Some((unit_id, hero));
                }
            }
        }
    }

    fn purchase(&mut self, buyer: EntityId, item: &str) {
        if !self.shop_open {
            return;
        }
        let near_secret = match (self.secret_shop, self.units.get(&buyer)) {
            (Some(shop), Some(unit)) => unit.pos.distance_2d(&shop) <= SECRET_SHOP_RANGE,
            _ => false,
        };
        if near_secret && self.secret_stock.contains(item) {
            self.give_item(buyer, item);
        } else if let Some(unit) = self.units.get_mut(&buyer) {
            unit.stash.push(item.to_string());
        }
    }

    fn give_item(&mut self, unit_id: EntityId, item: &str) {
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.items.push(item.to_string());
            Self::combine(&mut unit.items, &self.recipes);
        }
    }

    fn combine(items: &mut Vec<String>, recipes: &[Recipe]) {
        loop {
            let Some(recipe) = recipes
                .iter()
                .find(|r| r.inputs.iter().all(|input| items.contains(input)))
            else {
                return;
            };
            for input in &recipe.inputs {
                if let Some(at) = items.iter().position(|i| i == input) {
                    items.remove(at);
                }
            }
            items.push(recipe.output.clone());
        }
    }
}

impl GameWorld for SimWorld {
    fn play_dialog(&mut self, line: &LocalizationKey, _speaker: EntityId) -> DialogToken {
        self.next_dialog += 1;
        let duration = self
            .dialog_library
            .duration(line)
            .unwrap_or(DEFAULT_DIALOG_DURATION);
        self.dialogs.insert(self.next_dialog, self.now + duration as f64);
        self.dialog_log.push(line.clone());
        DialogToken(self.next_dialog)
    }

    fn dialog_finished(&self, token: DialogToken) -> bool {
        self.dialogs
            .get(&token.0)
            .map_or(true, |ends_at| self.now >= *ends_at)
    }

    fn stop_dialog(&mut self, token: DialogToken) {
        self.dialogs.remove(&token.0);
    }

    fn set_camera_target(&mut self, target: Option<EntityId>) {
        self.camera_target = target;
    }

    fn pan_camera(&mut self, from: Position, to: Position, duration: f32) {
        self.camera_pans.push((from, to, duration));
    }

    fn spawn_unit(&mut self, name: &str, at: Position, team: Team) -> EntityId {
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.units.insert(
            id,
            SimUnit {
                name: name.to_string(),
                team,
                pos: at,
                move_target: None,
                speed: DEFAULT_MOVE_SPEED,
                alive: true,
                frozen: false,
                pacifist: false,
                attacking: false,
                items: Vec::new(),
                stash: Vec::new(),
                gold: 0,
                abilities: FxHashMap::default(),
            },
        );
        id
    }

    fn remove_unit(&mut self, unit: EntityId) {
        self.units.remove(&unit);
        if self.player_hero == Some(unit) {
            self.player_hero = None;
        }
    }

    fn unit_position(&self, unit: EntityId) -> Option<Position> {
        self.units.get(&unit).map(|u| u.pos)
    }

    fn unit_alive(&self, unit: EntityId) -> bool {
        self.units.get(&unit).map_or(false, |u| u.alive)
    }

    fn is_attacking(&self, unit: EntityId) -> bool {
        self.units.get(&unit).map_or(false, |u| u.attacking)
    }

    fn issue_move_order(&mut self, unit: EntityId, to: Position) {
        if let Some(unit) = self.units.get_mut(&unit) {
            if unit.alive && !unit.frozen {
                unit.move_target = Some(to);
            }
        }
    }

    fn issue_attack_move(&mut self, unit: EntityId, to: Position) {
        if let Some(unit) = self.units.get_mut(&unit) {
            if unit.alive && !unit.frozen {
                unit.move_target = Some(to);
                if !unit.pacifist {
                    unit.attacking = true;
                }
            }
        }
    }

    fn teleport_unit(&mut self, unit: EntityId, to: Position) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.pos = to;
            unit.move_target = None;
        }
    }

    fn set_frozen(&mut self, unit: EntityId, frozen: bool) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.frozen = frozen;
            if frozen {
                unit.move_target = None;
            }
        }
    }

    fn set_pacifist(&mut self, unit: EntityId, pacifist: bool) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.pacifist = pacifist;
            if pacifist {
                unit.attacking = false;
            }
        }
    }

    fn ability_ready(&self, unit: EntityId, ability: &str) -> Option<bool> {
        self.units
            .get(&unit)?
            .abilities
            .get(ability)
            .map(|slot| self.now >= slot.ready_at)
    }

    fn cast_ability(&mut self, unit_id: EntityId, ability: &str, _target: CastTarget) {
        let now = self.now;
        if let Some(unit) = self.units.get_mut(&unit_id) {
            // Dead casters silently drop the order, like the host engine.
            if !unit.alive {
                return;
            }
            if let Some(slot) = unit.abilities.get_mut(ability) {
                slot.ready_at = now + slot.cooldown as f64;
                self.cast_log.push((unit_id, ability.to_string()));
            }
        }
    }

    fn shop_open(&self) -> bool {
        self.shop_open
    }

    fn has_item(&self, unit: EntityId, item: &str) -> bool {
        self.units
            .get(&unit)
            .map_or(false, |u| u.items.iter().any(|i| i == item))
    }

    fn add_item(&mut self, unit: EntityId, item: &str) {
        self.give_item(unit, item);
    }

    fn clear_inventory(&mut self, unit: EntityId) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.items.clear();
            unit.stash.clear();
        }
    }

    fn clear_stash(&mut self, unit: EntityId) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.stash.clear();
        }
    }

    fn ensure_ability(&mut self, unit: EntityId, ability: &str) {
        const DEFAULT_COOLDOWN: f32 = 10.0;
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.abilities
                .entry(ability.to_string())
                .or_insert(AbilitySlot {
                    cooldown: DEFAULT_COOLDOWN,
                    ready_at: 0.0,
                });
        }
    }

    fn set_gold(&mut self, unit: EntityId, amount: u32) {
        if let Some(unit) = self.units.get_mut(&unit) {
            unit.gold = amount;
        }
    }

    fn highlight_ui(&mut self, path: &str) {
        self.highlights.insert(path.to_string());
    }

    fn remove_highlight(&mut self, path: &str) {
        self.highlights.remove(path);
    }

    fn minimap_ping(&mut self, at: Position, _duration: f32) {
        self.minimap_pings.push(at);
    }

    fn mark_location(&mut self, dest: Position, _waypoints: &[Position]) {
        self.marked_location = Some(dest);
    }

    fn unmark_location(&mut self) {
        self.marked_location = None;
    }

    fn render_goals(&mut self, goals: &[GoalView]) {
        self.goal_display = goals.to_vec();
    }

    fn show_error(&mut self, message: &LocalizationKey) {
        self.errors.push(message.clone());
    }

    fn voice_chat_active(&self) -> bool {
        self.voice_active
    }

    fn set_time_of_day(&mut self, time: f32) {
        self.time_of_day = time;
    }

    fn apply_required_state(&mut self, state: &RequiredState) {
        self.blockades = state.blockades.iter().cloned().collect();
        let Some(hero_id) = self.player_hero else {
            return;
        };
        if let Some(target) = state.hero_location {
            let needs_move = self
                .units
                .get(&hero_id)
                .map_or(false, |hero| {
                    hero.pos.distance_2d(&target) > state.hero_location_tolerance
                });
            if needs_move {
                self.teleport_unit(hero_id, target);
            }
        }
        for item in &state.hero_items {
            if !self.has_item(hero_id, item) {
                self.give_item(hero_id, item);
            }
        }
        if state.center_camera_on_hero {
            self.camera_target = Some(hero_id);
        }
    }
}
