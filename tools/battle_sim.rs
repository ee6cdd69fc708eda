/// Battle Sim: runs many seeded encounters and reports balance stats.
///
/// Usage: battle_sim --enemy <id> [--enemies <file.ron>] [--class <c>] [--gender <g>]
///                   [--strategy attack|spirit|defend|mixed] [--runs <n>] [--seed <n>]
use narrative_rpg::core::combat::{CombatAction, CombatEngine, CombatRules, EnemyRegistry, Verdict};
use narrative_rpg::core::dice::Dice;
use narrative_rpg::schema::player::{CharacterClass, Gender, Player};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::Path;
use std::process;

const USAGE: &str = "Usage: battle_sim --enemy <id> [--enemies <file.ron>] [--class <c>] [--gender <g>] [--strategy attack|spirit|defend|mixed] [--runs <n>] [--seed <n>]";

/// Turn cap so an all-defend strategy cannot loop forever.
const MAX_TURNS: u32 = 200;

#[derive(Clone, Copy)]
enum Strategy {
    Always(CombatAction),
    /// Spirit while hurt, attack otherwise.
    Mixed,
}

impl Strategy {
    fn parse(input: &str) -> Option<Self> {
        match input {
            "mixed" => Some(Self::Mixed),
            other => CombatAction::parse(other).map(Self::Always),
        }
    }

    fn pick(&self, player: &Player) -> CombatAction {
        match self {
            Self::Always(action) => *action,
            Self::Mixed if player.current_health * 2 < player.max_health => CombatAction::Spirit,
            Self::Mixed => CombatAction::Attack,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    let mut enemy = None;
    let mut enemies_path = "content/enemies.ron".to_string();
    let mut class = CharacterClass::Archaeologist;
    let mut gender = Gender::Man;
    let mut strategy = Strategy::Mixed;
    let mut runs = 1000u32;
    let mut seed = 42u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--enemy" if i + 1 < args.len() => {
                i += 1;
                enemy = Some(args[i].clone());
            }
            "--enemies" if i + 1 < args.len() => {
                i += 1;
                enemies_path = args[i].clone();
            }
            "--class" if i + 1 < args.len() => {
                i += 1;
                class = CharacterClass::parse(&args[i]).unwrap_or_else(|| fail("unknown class"));
            }
            "--gender" if i + 1 < args.len() => {
                i += 1;
                gender = Gender::parse(&args[i]).unwrap_or_else(|| fail("unknown gender"));
            }
            "--strategy" if i + 1 < args.len() => {
                i += 1;
                strategy = Strategy::parse(&args[i]).unwrap_or_else(|| fail("unknown strategy"));
            }
            "--runs" if i + 1 < args.len() => {
                i += 1;
                runs = args[i].parse().unwrap_or_else(|_| fail("--runs must be a number"));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or_else(|_| fail("--seed must be a number"));
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let enemy_id = enemy.unwrap_or_else(|| fail("--enemy is required"));
    if runs == 0 {
        fail::<()>("--runs must be at least 1");
    }

    let registry = EnemyRegistry::load_from_ron(Path::new(&enemies_path)).unwrap_or_else(|e| {
        eprintln!("Error loading {}: {}", enemies_path, e);
        process::exit(1);
    });
    if !registry.contains(&enemy_id) {
        eprintln!("Warning: '{}' is not in {}, using the default foe", enemy_id, enemies_path);
    }

    let engine = CombatEngine::new(registry, CombatRules::default());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut wins = 0u32;
    let mut stalled = 0u32;
    let mut total_turns = 0u64;
    let mut health_left = 0i64;

    for _ in 0..runs {
        let mut player = Player::new("Sim", class, gender);
        let (verdict, turns) = simulate(&engine, &enemy_id, &mut player, strategy, &mut rng);
        total_turns += turns as u64;
        match verdict {
            Some(Verdict::Victory) => {
                wins += 1;
                health_left += player.current_health as i64;
            }
            Some(Verdict::Defeat) => {}
            None => stalled += 1,
        }
    }

    let enemy = engine.registry().get_enemy(&enemy_id);
    println!("=== {} vs {:?} {:?} ({} runs, seed {}) ===", enemy.name, class, gender, runs, seed);
    println!(
        "  win rate:        {:.1}%",
        wins as f64 * 100.0 / runs as f64
    );
    println!("  avg turns:       {:.2}", total_turns as f64 / runs as f64);
    if wins > 0 {
        println!("  avg health left: {:.2}", health_left as f64 / wins as f64);
    }
    if stalled > 0 {
        println!("  stalled at {} turns: {}", MAX_TURNS, stalled);
    }
}

fn simulate(
    engine: &CombatEngine,
    enemy_id: &str,
    player: &mut Player,
    strategy: Strategy,
    dice: &mut dyn Dice,
) -> (Option<Verdict>, u32) {
    let mut encounter = engine.start_encounter(enemy_id);
    while encounter.turn < MAX_TURNS {
        let action = strategy.pick(player);
        match engine.resolve_turn(action, player, &mut encounter, dice) {
            Ok(result) if result.verdict.is_some() => return (result.verdict, encounter.turn),
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }
    (None, encounter.turn)
}

fn fail<T>(message: &str) -> T {
    eprintln!("Error: {}", message);
    eprintln!("{}", USAGE);
    process::exit(1)
}
