/// Story Linter: validates a story graph against its enemy registry.
///
/// Usage: story_linter [--story <file.ron>] [--enemies <file.ron>] [--config <file.ron>]

use narrative_rpg::core::combat::EnemyRegistry;
use narrative_rpg::core::config::GameConfig;
use narrative_rpg::core::graph::StoryGraph;
use narrative_rpg::core::lint::lint_story;
use std::path::{Path, PathBuf};
use std::process;

const USAGE: &str =
    "Usage: story_linter [--story <file.ron>] [--enemies <file.ron>] [--config <file.ron>]";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    let mut story_path: Option<PathBuf> = None;
    let mut enemies_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = Some(PathBuf::from(&args[i]));
            }
            "--enemies" if i + 1 < args.len() => {
                i += 1;
                enemies_path = Some(PathBuf::from(&args[i]));
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => GameConfig::load_from_ron(path).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load config {}: {}", path.display(), e);
            process::exit(1);
        }),
        None => GameConfig::default(),
    };

    let story_path = story_path.unwrap_or_else(|| config.story_path.clone());
    let enemies_path = enemies_path.unwrap_or_else(|| config.enemies_path.clone());

    let graph = load_graph(&story_path, &config.start_node);
    let enemies = EnemyRegistry::load_from_ron(&enemies_path).unwrap_or_else(|e| {
        eprintln!(
            "ERROR: Failed to load enemies {}: {}",
            enemies_path.display(),
            e
        );
        process::exit(1);
    });

    println!(
        "Loaded {} nodes from {} and {} enemies from {}",
        graph.len(),
        story_path.display(),
        enemies.len(),
        enemies_path.display()
    );

    let report = lint_story(&graph, &enemies);

    println!("\n=== Story Lint Report ===\n");

    if report.is_clean() {
        println!("All checks passed!");
    }

    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }

    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    if report.errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_graph(path: &Path, start: &str) -> StoryGraph {
    match StoryGraph::load_from_ron(path, start) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: Failed to load story {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}
