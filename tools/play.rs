/// Play: interactive terminal playthrough of a story.
///
/// Usage: play [--config <file.ron>] [--story <file.ron>] [--enemies <file.ron>]
///             [--seed <n>] [--name <name>] [--class scientist|archaeologist]
///             [--gender man|woman]
///
/// Commands:
///   <n>                : take choice n (1-based)
///   next               : follow a direct link
///   attack|defend|spirit (or 1/2/3 in battle): combat actions
///   status             : show the character sheet
///   save <file>        : write a save file
///   load <file>        : restore a save file
///   help               : list commands
///   quit               : exit

use narrative_rpg::core::combat::CombatAction;
use narrative_rpg::core::engine::{EngineError, GameEngine};
use narrative_rpg::core::session::GameSession;
use narrative_rpg::schema::node::Outgoing;
use narrative_rpg::schema::player::{CharacterClass, Gender};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut story_path: Option<PathBuf> = None;
    let mut enemies_path: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;
    let mut name = "Traveller".to_string();
    let mut class = CharacterClass::Archaeologist;
    let mut gender = Gender::Woman;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = Some(PathBuf::from(&args[i]));
            }
            "--enemies" if i + 1 < args.len() => {
                i += 1;
                enemies_path = Some(PathBuf::from(&args[i]));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().ok();
            }
            "--name" if i + 1 < args.len() => {
                i += 1;
                name = args[i].clone();
            }
            "--class" if i + 1 < args.len() => {
                i += 1;
                class = CharacterClass::parse(&args[i]).unwrap_or_else(|| {
                    eprintln!("Unknown class: {}", args[i]);
                    std::process::exit(1);
                });
            }
            "--gender" if i + 1 < args.len() => {
                i += 1;
                gender = Gender::parse(&args[i]).unwrap_or_else(|| {
                    eprintln!("Unknown gender: {}", args[i]);
                    std::process::exit(1);
                });
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut builder = GameEngine::builder();
    if let Some(ref path) = config_path {
        builder = match builder.config_file(path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        };
    }
    if let Some(path) = story_path {
        builder = builder.story_file(path);
    }
    if let Some(path) = enemies_path {
        builder = builder.enemies_file(path);
    }
    if let Some(seed) = seed {
        builder = builder.seed(seed);
    }

    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let mut session = engine.new_game(name, class, gender);
    println!("{} the {:?}. {}", session.player.name, class, class.description());
    println!("Type 'help' for commands.\n");
    show_node(&engine, &session);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if engine.current_node(&session).is_terminal() {
            println!("\n-- The End --");
            print_status(&session);
            break;
        }

        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "status" => print_status(&session),
            "save" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: save <file>");
                    continue;
                };
                match engine.save(&session) {
                    Ok(json) => match std::fs::write(path, json) {
                        Ok(()) => println!("Saved to {}", path),
                        Err(e) => println!("Could not write {}: {}", path, e),
                    },
                    Err(e) => println!("Could not save: {}", e),
                }
            }
            "load" => {
                let Some(path) = parts.get(1) else {
                    println!("Usage: load <file>");
                    continue;
                };
                let payload = match std::fs::read_to_string(path) {
                    Ok(p) => p,
                    Err(e) => {
                        println!("Could not read {}: {}", path, e);
                        continue;
                    }
                };
                match engine.load(&payload) {
                    Ok(loaded) => {
                        session = loaded;
                        println!("Loaded {}.", path);
                        show_node(&engine, &session);
                    }
                    Err(e) => println!("Could not load: {}", e),
                }
            }
            _ if session.in_battle() => match CombatAction::parse(&cmd) {
                Some(action) => play_turn(&mut engine, &mut session, action),
                None => println!("In battle: attack, defend or spirit."),
            },
            "next" | "n" => match engine.advance(&mut session) {
                Ok(_) => show_node(&engine, &session),
                Err(e) => println!("{}", e),
            },
            _ => match cmd.parse::<usize>() {
                Ok(n) if n >= 1 => match engine.choose(&mut session, n - 1) {
                    Ok(outcome) => {
                        if let Some(roll) = outcome.roll {
                            println!("{}", roll.describe());
                        }
                        show_node(&engine, &session);
                    }
                    Err(EngineError::Graph(e)) => println!("{}", e),
                    Err(e) => println!("ERROR: {}", e),
                },
                _ => println!("Unknown command: {}. Type 'help'.", cmd),
            },
        }
    }
}

fn play_turn(engine: &mut GameEngine, session: &mut GameSession, action: CombatAction) {
    match engine.fight(session, action) {
        Ok(result) => {
            for message in &result.messages {
                println!("  {}", message);
            }
            println!(
                "  [you {}/{} | enemy {}/{}]",
                result.player_health,
                result.player_max_health,
                result.enemy_health,
                result.enemy_max_health
            );
            if result.verdict.is_some() {
                println!();
                show_node(engine, session);
            }
        }
        Err(e) => println!("ERROR: {}", e),
    }
}

fn show_node(engine: &GameEngine, session: &GameSession) {
    let node = engine.current_node(session);
    println!("== {} ==", node.title);
    println!("{}\n", node.text);
    match &node.outgoing {
        Outgoing::Choices(choices) => {
            for (i, choice) in choices.iter().enumerate() {
                println!("  {}. {}", i + 1, choice.text);
            }
        }
        Outgoing::Direct(_) => println!("  (next)"),
        Outgoing::Battle { .. } => {
            if let Some(encounter) = &session.encounter {
                println!(
                    "{} ({} health) stands before you.",
                    encounter.enemy.name, encounter.enemy_current_health
                );
            }
            println!("  1. attack  2. defend  3. spirit");
        }
        Outgoing::Terminal => {}
    }
}

fn print_status(session: &GameSession) {
    let p = &session.player;
    println!(
        "{} ({:?} {:?}) health {}/{}",
        p.name, p.class, p.gender, p.current_health, p.max_health
    );
    println!(
        "  mental {}  physical {}  spiritual {}",
        p.mental, p.physical, p.spiritual
    );
    if !p.inventory.is_empty() {
        println!("  inventory: {}", p.inventory.join(", "));
    }
    println!("  turn {}", session.turn_counter);
}

fn print_usage() {
    println!("Usage: play [--config <file.ron>] [--story <file.ron>] [--enemies <file.ron>]");
    println!("            [--seed <n>] [--name <name>] [--class scientist|archaeologist]");
    println!("            [--gender man|woman]");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>                  take choice n");
    println!("  next                 follow a direct link");
    println!("  attack|defend|spirit combat actions (1/2/3 in battle)");
    println!("  status               character sheet");
    println!("  save <file>          write a save file");
    println!("  load <file>          restore a save file");
    println!("  help                 this list");
    println!("  quit                 exit");
}
