//! WASM bindings for tutorial-graph — powers the interactive web demo.
//!
//! The fallible entry points are implemented against plain `String`
//! errors so they stay testable on native targets; the `wasm_bindgen`
//! surface converts to `JsValue` at the boundary.

use wasm_bindgen::prelude::*;

use tutorial_graph::core::context::ContextKey;
use tutorial_graph::core::section::{MachineStatus, TutorialMachine};
use tutorial_graph::core::world::GameWorld;
use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::{EntityId, Position, Team};
use tutorial_graph::schema::order::{CastTarget, OrderKind, OrderVerdict, PlayerOrder};
use tutorial_graph::sections::{courier, team_fight};
use tutorial_graph::sim::SimWorld;

// ---------------------------------------------------------------------------
// Embedded section data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const COURIER_DIALOG: &str = include_str!("../../section_data/courier.ron");
    pub const TEAM_FIGHT_DIALOG: &str = include_str!("../../section_data/team_fight.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct UnitInfo {
    id: u64,
    name: String,
    x: f32,
    y: f32,
    alive: bool,
    team: String,
}

#[derive(serde::Deserialize)]
struct OrderInput {
    unit: Option<u64>,
    kind: String,
    item: Option<String>,
    x: Option<f32>,
    y: Option<f32>,
}

#[derive(serde::Serialize)]
struct VerdictInfo {
    allowed: bool,
    message: Option<String>,
}

fn team_tag(team: Team) -> &'static str {
    match team {
        Team::Friendly => "friendly",
        Team::Enemy => "enemy",
        Team::Neutral => "neutral",
    }
}

// ---------------------------------------------------------------------------
// TutorialSim
// ---------------------------------------------------------------------------

/// One tutorial section running against the simulated world, driven from
/// JavaScript: `tick` on every animation frame, orders and shop/voice
/// inputs whenever the player acts.
#[wasm_bindgen]
pub struct TutorialSim {
    world: SimWorld,
    machine: TutorialMachine,
    hero: EntityId,
}

impl TutorialSim {
    fn build(section: &str, seed: u64) -> Result<TutorialSim, String> {
        let (library_text, is_courier) = match section {
            "courier" => (data::COURIER_DIALOG, true),
            "team_fight" => (data::TEAM_FIGHT_DIALOG, false),
            other => return Err(format!("unknown section '{other}'")),
        };
        let library =
            DialogLibrary::parse_ron(library_text).map_err(|e| format!("dialog data: {e}"))?;
        let mut world = SimWorld::with_dialog_library(library);

        let home = if is_courier {
            Position::new(-4941.0, 5874.0, 128.0)
        } else {
            team_fight::BATTLE_GROUND
        };
        let hero = world.spawn_unit("hero", home, Team::Friendly);
        let first_guide = world.spawn_unit("first_guide", home.offset(150.0, 0.0), Team::Friendly);
        let second_guide =
            world.spawn_unit("second_guide", home.offset(-150.0, 0.0), Team::Friendly);
        world.set_player_hero(hero);

        let mut machine = TutorialMachine::new(seed);
        let ctx = machine.context_mut();
        ctx.set_entity(ContextKey::PlayerHero, hero);
        ctx.set_entity(ContextKey::FirstGuide, first_guide);
        ctx.set_entity(ContextKey::SecondGuide, second_guide);

        if is_courier {
            let courier_unit = world.spawn_unit(
                "courier",
                Position::new(-5000.0, 2300.0, 128.0),
                Team::Friendly,
            );
            machine
                .context_mut()
                .set_entity(ContextKey::PlayerCourier, courier_unit);
            world.stock_secret_shop(courier::SECRET_SHOP_LOCATION, &[courier::KEYSTONE_BLADE]);
            world.add_recipe(
                &[courier::FLUX_CRYSTAL, courier::BINDING_RUNE],
                courier::STARFORGED_EDGE,
            );
            machine.add_section(courier::section());
        } else {
            machine.add_section(team_fight::section());
        }

        machine.start(&mut world, 0.0).map_err(|e| e.to_string())?;

        Ok(TutorialSim {
            world,
            machine,
            hero,
        })
    }

    fn advance(&mut self, dt: f64) -> Result<String, String> {
        self.world.step(dt);
        let now = self.world.now();
        self.machine
            .tick(&mut self.world, now)
            .map_err(|e| e.to_string())?;
        Ok(self.status())
    }

    fn route_order(&mut self, order_json: &str) -> Result<String, String> {
        let input: OrderInput =
            serde_json::from_str(order_json).map_err(|e| format!("order: {e}"))?;

        let unit = input.unit.map(EntityId).unwrap_or(self.hero);
        let point = Position::new(input.x.unwrap_or(0.0), input.y.unwrap_or(0.0), 0.0);
        let kind = match input.kind.as_str() {
            "move" => OrderKind::MoveToPosition(point),
            "attack_move" => OrderKind::AttackMove(point),
            "purchase" => OrderKind::PurchaseItem {
                item: input.item.unwrap_or_default(),
            },
            "use_item" => OrderKind::UseItem {
                item: input.item.unwrap_or_default(),
                target: CastTarget::Point(point),
            },
            "deliver" => OrderKind::CourierDeliver,
            other => return Err(format!("unknown order kind '{other}'")),
        };

        let order = PlayerOrder::player(unit, kind);
        let verdict = self.machine.filter_order(&mut self.world, &order);
        let info = match &verdict {
            OrderVerdict::Allow => {
                self.world.apply_order(&order);
                VerdictInfo {
                    allowed: true,
                    message: None,
                }
            }
            OrderVerdict::Deny { message } => VerdictInfo {
                allowed: false,
                message: message.as_ref().map(|m| m.as_str().to_string()),
            },
        };
        serde_json::to_string(&info).map_err(|e| e.to_string())
    }
}

#[wasm_bindgen]
impl TutorialSim {
    #[wasm_bindgen(constructor)]
    pub fn new(section: &str, seed: u64) -> Result<TutorialSim, JsValue> {
        Self::build(section, seed).map_err(|e| JsValue::from_str(&e))
    }

    /// Advance the simulation and the running section. Returns the machine
    /// status as a string: "running", "finished", or "idle".
    pub fn tick(&mut self, dt: f64) -> Result<String, JsValue> {
        self.advance(dt).map_err(|e| JsValue::from_str(&e))
    }

    pub fn status(&self) -> String {
        match self.machine.status() {
            MachineStatus::Running => "running".to_string(),
            MachineStatus::Finished => "finished".to_string(),
            MachineStatus::Idle => "idle".to_string(),
        }
    }

    pub fn now(&self) -> f64 {
        self.world.now()
    }

    /// Current goal snapshot in the UI wire shape.
    pub fn goals_json(&self) -> String {
        serde_json::to_string(self.world.goal_display()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Voiced lines played so far, newest last.
    pub fn dialog_json(&self) -> String {
        serde_json::to_string(&self.world.dialog_log).unwrap_or_else(|_| "[]".to_string())
    }

    /// Highlighted UI paths.
    pub fn highlights_json(&self) -> String {
        let paths: Vec<&String> = self.world.highlights().iter().collect();
        serde_json::to_string(&paths).unwrap_or_else(|_| "[]".to_string())
    }

    /// Units and their positions for the map view.
    pub fn units_json(&self) -> String {
        let mut units: Vec<UnitInfo> = Vec::new();
        let mut ids: Vec<EntityId> = vec![self.hero];
        let ctx = self.machine.context();
        for name in team_fight::ALLY_NAMES {
            ids.extend(ctx.try_entity(&ContextKey::Ally((*name).to_string())));
        }
        for name in team_fight::ENEMY_NAMES {
            ids.extend(ctx.try_entity(&ContextKey::Enemy((*name).to_string())));
        }
        ids.extend(ctx.try_entity(&ContextKey::PlayerCourier));
        for id in ids {
            if let Some(unit) = self.world.unit(id) {
                units.push(UnitInfo {
                    id: id.0,
                    name: unit.name.clone(),
                    x: unit.pos.x,
                    y: unit.pos.y,
                    alive: unit.alive,
                    team: team_tag(unit.team).to_string(),
                });
            }
        }
        serde_json::to_string(&units).unwrap_or_else(|_| "[]".to_string())
    }

    /// Run a player order through the active section's filter and commit
    /// it if allowed. Input: `{"unit": 1, "kind": "purchase", "item": "…"}`
    /// with kinds "move", "attack_move", "purchase", "use_item", "deliver".
    pub fn submit_order(&mut self, order_json: &str) -> Result<String, JsValue> {
        self.route_order(order_json).map_err(|e| JsValue::from_str(&e))
    }

    pub fn open_shop(&mut self) {
        self.world.set_shop_open(true);
    }

    pub fn set_voice_chat(&mut self, active: bool) {
        self.world.set_voice_chat(active);
    }

    /// Referee hook for the team fight: fell one named enemy.
    pub fn kill_enemy(&mut self, name: &str) -> bool {
        let id = self
            .machine
            .context()
            .try_entity(&ContextKey::Enemy(name.to_string()));
        match id {
            Some(id) => {
                self.world.kill_unit(id);
                true
            }
            None => false,
        }
    }
}
