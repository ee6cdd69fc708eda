//! Content lints over a story graph and its enemy registry.
//!
//! Errors are things that will misbehave at play time; warnings are
//! content smells worth a second look.

use rustc_hash::FxHashSet;

use crate::core::combat::EnemyRegistry;
use crate::core::graph::StoryGraph;
use crate::schema::node::{Outgoing, Resolution};

/// Difficulties outside this band are either automatic or unreachable with
/// the starting attributes.
pub const SANE_DIFFICULTY: std::ops::RangeInclusive<i32> = 2..=25;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

pub fn lint_story(graph: &StoryGraph, enemies: &EnemyRegistry) -> LintReport {
    let mut report = LintReport {
        errors: graph.validate(graph.start().as_str()).messages(),
        warnings: Vec::new(),
    };

    let mut nodes: Vec<_> = graph.nodes().collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut fought: FxHashSet<&str> = FxHashSet::default();
    let mut endings = 0;

    for node in &nodes {
        if node.text.trim().is_empty() {
            report
                .warnings
                .push(format!("Node '{}' has no text", node.id));
        }

        match &node.outgoing {
            Outgoing::Choices(choices) if choices.is_empty() => {
                report
                    .errors
                    .push(format!("Node '{}' offers an empty choice list", node.id));
            }
            Outgoing::Choices(choices) => {
                for (index, choice) in choices.iter().enumerate() {
                    if let Resolution::Test { difficulty, .. } = &choice.resolution {
                        if !SANE_DIFFICULTY.contains(difficulty) {
                            report.warnings.push(format!(
                                "Node '{}' choice {} has extreme difficulty {}",
                                node.id, index, difficulty
                            ));
                        }
                    }
                    if choice.text.trim().is_empty() {
                        report.warnings.push(format!(
                            "Node '{}' choice {} has no text",
                            node.id, index
                        ));
                    }
                }
            }
            Outgoing::Battle { enemy, .. } => {
                fought.insert(enemy.as_str());
                if !enemies.contains(enemy.as_str()) {
                    report.errors.push(format!(
                        "Node '{}' fights unknown enemy '{}'",
                        node.id, enemy
                    ));
                }
            }
            Outgoing::Terminal => endings += 1,
            Outgoing::Direct(_) => {}
        }
    }

    if endings == 0 && !graph.is_empty() {
        report
            .warnings
            .push("Story has no terminal node".to_string());
    }

    for id in enemies.ids() {
        if !fought.contains(id.as_str()) {
            report
                .warnings
                .push(format!("Enemy '{}' is never fought", id));
        }
    }

    report
}
