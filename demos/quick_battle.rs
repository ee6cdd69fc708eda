//! A scripted fight against the Royal Guard, printed turn by turn.
//!
//! Run with: cargo run --example quick_battle

use narrative_rpg::core::combat::{CombatAction, CombatEngine, CombatRules, EnemyRegistry};
use narrative_rpg::core::dice::ScriptedDice;
use narrative_rpg::schema::player::{CharacterClass, Gender, Player};
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let registry = EnemyRegistry::load_from_ron(Path::new("content/enemies.ron"))?;
    let engine = CombatEngine::new(registry, CombatRules::default());
    let mut player = Player::new("Ayo", CharacterClass::Archaeologist, Gender::Man);
    let mut encounter = engine.start_encounter("guard");

    // attack: strong hit; defend; attack: critical hit; bonus roll misses
    let mut dice = ScriptedDice::new([12, 4, 1, 5, 20, 5, 90]);
    let plan = [CombatAction::Attack, CombatAction::Defend, CombatAction::Attack];

    for action in plan {
        let result = engine.resolve_turn(action, &mut player, &mut encounter, &mut dice)?;
        println!("-- turn {}: {} --", encounter.turn, action.name());
        for message in &result.messages {
            println!("  {}", message);
        }
        println!(
            "  you {}/{}, {} {}/{}",
            result.player_health,
            result.player_max_health,
            encounter.enemy.name,
            result.enemy_health,
            result.enemy_max_health
        );
        if let Some(verdict) = result.verdict {
            println!("verdict: {:?}", verdict);
            break;
        }
    }

    println!("inventory: {:?}", player.inventory);
    Ok(())
}
