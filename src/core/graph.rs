//! Story graph: node arena, choice resolution, and structural validation.

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::dice::{Dice, RollQuality};
use crate::schema::node::{EdgeKind, NodeId, NodeKind, Outgoing, Resolution, StoryNode};
use crate::schema::player::{Attribute, Player};

/// Id of the node returned for unknown lookups.
pub const FALLBACK_NODE_ID: &str = "__fallback__";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),
    #[error("choice {index} is out of range at node {node} ({available} choices)")]
    InvalidChoice {
        node: NodeId,
        index: usize,
        available: usize,
    },
    #[error("node {0} does not offer choices")]
    NotAChoiceNode(NodeId),
    #[error("node {0} has no direct link")]
    NotADirectNode(NodeId),
}

/// A problem found by [`StoryGraph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    MissingStart(NodeId),
    DanglingEdge {
        from: NodeId,
        edge: EdgeKind,
        target: NodeId,
    },
    /// Every node never reached from the start, sorted by id.
    Unreachable(Vec<NodeId>),
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStart(id) => write!(f, "Start node {} doesn't exist", id),
            Self::DanglingEdge { from, edge, target } => write!(
                f,
                "Node {} references non-existent {} {}",
                from,
                edge.label(),
                target
            ),
            Self::Unreachable(ids) => {
                let names: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
                write!(f, "Unreachable nodes found: {}", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<GraphIssue>,
    /// Number of existing nodes reached from the start.
    pub reachable: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|issue| issue.to_string()).collect()
    }
}

/// The outcome of an attribute test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRoll {
    pub attribute: Attribute,
    pub roll: i32,
    pub attribute_value: i32,
    pub total: i32,
    pub difficulty: i32,
    pub passed: bool,
}

impl TestRoll {
    pub fn describe(&self) -> String {
        format!(
            "Rolled {} ({}) + {} {} = {} against {}: {}.",
            self.roll,
            RollQuality::from_roll(self.roll).label(),
            self.attribute.name(),
            self.attribute_value,
            self.total,
            self.difficulty,
            if self.passed { "success" } else { "failure" }
        )
    }
}

/// Where a resolved choice leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Link(NodeId),
    Test { next: NodeId, roll: TestRoll },
}

impl Transition {
    pub fn next(&self) -> &NodeId {
        match self {
            Self::Link(next) => next,
            Self::Test { next, .. } => next,
        }
    }

    pub fn roll(&self) -> Option<&TestRoll> {
        match self {
            Self::Link(_) => None,
            Self::Test { roll, .. } => Some(roll),
        }
    }
}

/// Immutable arena of story nodes keyed by id.
#[derive(Debug, Clone)]
pub struct StoryGraph {
    nodes: FxHashMap<NodeId, StoryNode>,
    start: NodeId,
    fallback: StoryNode,
}

impl StoryGraph {
    pub fn new(start: impl Into<NodeId>, nodes: Vec<StoryNode>) -> Result<StoryGraph, GraphError> {
        let start = start.into();
        let mut arena = FxHashMap::default();
        for node in nodes {
            if arena.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            arena.insert(node.id.clone(), node);
        }

        let fallback = StoryNode::new(
            FALLBACK_NODE_ID,
            "Lost",
            "Something went wrong. This part of the story doesn't exist.",
            Outgoing::Direct(start.clone()),
        );

        Ok(StoryGraph {
            nodes: arena,
            start,
            fallback,
        })
    }

    /// Load a graph from a RON file holding a list of nodes.
    pub fn load_from_ron(path: &Path, start: impl Into<NodeId>) -> Result<StoryGraph, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents, start)
    }

    pub fn parse_ron(input: &str, start: impl Into<NodeId>) -> Result<StoryGraph, GraphError> {
        let nodes: Vec<StoryNode> = ron::from_str(input)?;
        Self::new(start, nodes)
    }

    pub fn start(&self) -> &NodeId {
        &self.start
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn find(&self, id: &str) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StoryNode> {
        self.nodes.values()
    }

    /// Look up a node. Unknown ids get a fallback node that leads back to
    /// the start, so a stale id never strands a session.
    pub fn get_node(&self, id: &str) -> &StoryNode {
        match self.nodes.get(id) {
            Some(node) => node,
            None => {
                warn!("unknown node '{}', using fallback to '{}'", id, self.start);
                &self.fallback
            }
        }
    }

    /// Resolve the player's pick at a choice node.
    pub fn resolve_choice(
        &self,
        node: &StoryNode,
        choice_index: usize,
        player: &Player,
        dice: &mut dyn Dice,
    ) -> Result<Transition, GraphError> {
        let choices = match &node.outgoing {
            Outgoing::Choices(choices) => choices,
            _ => return Err(GraphError::NotAChoiceNode(node.id.clone())),
        };
        let choice = choices
            .get(choice_index)
            .ok_or_else(|| GraphError::InvalidChoice {
                node: node.id.clone(),
                index: choice_index,
                available: choices.len(),
            })?;

        match &choice.resolution {
            Resolution::Link(next) => {
                debug!("{} -> {} (choice {})", node.id, next, choice_index);
                Ok(Transition::Link(next.clone()))
            }
            Resolution::Test {
                attribute,
                difficulty,
                success_node,
                failure_node,
            } => {
                let roll = dice.d20();
                let attribute_value = player.attribute(*attribute);
                let total = roll.saturating_add(attribute_value);
                let passed = total >= *difficulty;
                let next = if passed { success_node } else { failure_node };
                debug!(
                    "{} test at {}: {} + {} = {} vs {} -> {}",
                    attribute.name(),
                    node.id,
                    roll,
                    attribute_value,
                    total,
                    difficulty,
                    next
                );
                Ok(Transition::Test {
                    next: next.clone(),
                    roll: TestRoll {
                        attribute: *attribute,
                        roll,
                        attribute_value,
                        total,
                        difficulty: *difficulty,
                        passed,
                    },
                })
            }
        }
    }

    pub fn resolve_direct(&self, node: &StoryNode) -> Result<NodeId, GraphError> {
        match &node.outgoing {
            Outgoing::Direct(next) => Ok(next.clone()),
            _ => Err(GraphError::NotADirectNode(node.id.clone())),
        }
    }

    /// Walk every edge reachable from `start`, reporting dangling targets
    /// and, once, every node the walk never reached.
    pub fn validate(&self, start: &str) -> ValidationReport {
        let mut issues = Vec::new();
        let mut reached: FxHashSet<&str> = FxHashSet::default();

        if !self.nodes.contains_key(start) {
            issues.push(GraphIssue::MissingStart(NodeId::from(start)));
        } else {
            reached.insert(start);
        }

        let mut to_visit: Vec<&str> = reached.iter().copied().collect();
        while let Some(current) = to_visit.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for (edge, target) in node.edges() {
                if !self.nodes.contains_key(target.as_str()) {
                    issues.push(GraphIssue::DanglingEdge {
                        from: node.id.clone(),
                        edge,
                        target: target.clone(),
                    });
                } else if reached.insert(target.as_str()) {
                    to_visit.push(target.as_str());
                }
            }
        }

        let mut unreachable: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !reached.contains(id.as_str()))
            .cloned()
            .collect();
        if !unreachable.is_empty() {
            unreachable.sort();
            issues.push(GraphIssue::Unreachable(unreachable));
        }

        ValidationReport {
            issues,
            reachable: reached.len(),
        }
    }

    /// Pick a node uniformly among those of `kind` (any kind when `None`).
    /// Falls back to the start node when nothing matches.
    pub fn random_node(&self, kind: Option<NodeKind>, dice: &mut dyn Dice) -> NodeId {
        self.pick_node(|node| kind.map_or(true, |k| node.kind() == k), dice)
    }

    /// Pick a node uniformly among those tagged `orisha`.
    pub fn random_orisha_node(&self, dice: &mut dyn Dice) -> NodeId {
        self.pick_node(|node| node.orisha, dice)
    }

    fn pick_node(&self, accept: impl Fn(&StoryNode) -> bool, dice: &mut dyn Dice) -> NodeId {
        let mut candidates: Vec<&NodeId> = self
            .nodes
            .values()
            .filter(|node| accept(node))
            .map(|node| &node.id)
            .collect();
        if candidates.is_empty() {
            return self.start.clone();
        }
        candidates.sort();
        let index = dice.range(0, candidates.len() as i32 - 1) as usize;
        candidates[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dice::ScriptedDice;
    use crate::schema::enemy::EnemyId;
    use crate::schema::node::Choice;
    use crate::schema::player::{CharacterClass, Gender};

    fn sample_graph() -> StoryGraph {
        StoryGraph::new(
            "start",
            vec![
                StoryNode::new(
                    "start",
                    "Portal",
                    "Drums in the distance.",
                    Outgoing::Choices(vec![
                        Choice::link("Follow the drums", "village"),
                        Choice::test("Read the glyphs", Attribute::Mental, 10, "insight", "confused"),
                    ]),
                ),
                StoryNode::new("village", "", "", Outgoing::Direct("gate".into())),
                StoryNode::new(
                    "gate",
                    "",
                    "",
                    Outgoing::Battle {
                        enemy: EnemyId::from("guard"),
                        victory_node: "insight".into(),
                        defeat_node: "confused".into(),
                    },
                ),
                StoryNode::new("insight", "", "", Outgoing::Terminal),
                StoryNode::new("confused", "", "", Outgoing::Terminal),
            ],
        )
        .unwrap()
    }

    fn mental_five() -> Player {
        let mut player = Player::new("Ada", CharacterClass::Scientist, Gender::Man);
        player.mental = 5;
        player
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = StoryGraph::new(
            "a",
            vec![
                StoryNode::new("a", "", "", Outgoing::Terminal),
                StoryNode::new("a", "", "", Outgoing::Terminal),
            ],
        );
        assert!(matches!(result, Err(GraphError::DuplicateNode(id)) if id.as_str() == "a"));
    }

    #[test]
    fn unknown_node_falls_back_to_start() {
        let graph = sample_graph();
        let node = graph.get_node("nonexistent");
        assert_eq!(node.id.as_str(), FALLBACK_NODE_ID);
        assert_eq!(node.outgoing, Outgoing::Direct(NodeId::from("start")));
        assert_eq!(graph.resolve_direct(node).unwrap().as_str(), "start");
    }

    #[test]
    fn link_choice() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::default();
        let t = graph
            .resolve_choice(graph.get_node("start"), 0, &mental_five(), &mut dice)
            .unwrap();
        assert_eq!(t, Transition::Link("village".into()));
        assert_eq!(dice.drawn(), 0);
    }

    #[test]
    fn failed_test_goes_to_failure_node() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::new([4]);
        let t = graph
            .resolve_choice(graph.get_node("start"), 1, &mental_five(), &mut dice)
            .unwrap();
        assert_eq!(t.next().as_str(), "confused");
        let roll = t.roll().unwrap();
        assert_eq!((roll.roll, roll.total, roll.passed), (4, 9, false));
    }

    #[test]
    fn test_meeting_difficulty_passes() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::new([5]);
        let t = graph
            .resolve_choice(graph.get_node("start"), 1, &mental_five(), &mut dice)
            .unwrap();
        assert_eq!(t.next().as_str(), "insight");
        assert!(t.roll().unwrap().describe().contains("= 10 against 10: success"));
    }

    #[test]
    fn huge_attribute_total_saturates() {
        let graph = sample_graph();
        let mut player = mental_five();
        player.mental = i32::MAX;
        let mut dice = ScriptedDice::new([20]);
        let t = graph
            .resolve_choice(graph.get_node("start"), 1, &player, &mut dice)
            .unwrap();
        assert_eq!(t.next().as_str(), "insight");
        assert_eq!(t.roll().unwrap().total, i32::MAX);
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::default();
        let err = graph
            .resolve_choice(graph.get_node("start"), 5, &mental_five(), &mut dice)
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidChoice { index: 5, available: 2, .. }));
    }

    #[test]
    fn choice_at_non_choice_node_is_rejected() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::default();
        let err = graph
            .resolve_choice(graph.get_node("village"), 0, &mental_five(), &mut dice)
            .unwrap_err();
        assert!(matches!(err, GraphError::NotAChoiceNode(_)));
        assert!(graph.resolve_direct(graph.get_node("gate")).is_err());
    }

    #[test]
    fn valid_graph_has_no_issues() {
        let report = sample_graph().validate("start");
        assert!(report.is_ok(), "{:?}", report.messages());
        assert_eq!(report.reachable, 5);
    }

    #[test]
    fn dangling_and_unreachable_reported() {
        let graph = StoryGraph::new(
            "start",
            vec![
                StoryNode::new("start", "", "", Outgoing::Direct("missing".into())),
                StoryNode::new("island_b", "", "", Outgoing::Terminal),
                StoryNode::new("island_a", "", "", Outgoing::Terminal),
            ],
        )
        .unwrap();
        let report = graph.validate("start");
        assert!(!report.is_ok());
        assert_eq!(report.issues.len(), 2);
        assert_eq!(
            report.messages()[0],
            "Node start references non-existent next node missing"
        );
        assert_eq!(
            report.issues[1],
            GraphIssue::Unreachable(vec!["island_a".into(), "island_b".into()])
        );
    }

    #[test]
    fn missing_start_reports_everything_unreachable() {
        let report = sample_graph().validate("nowhere");
        assert_eq!(report.issues[0], GraphIssue::MissingStart("nowhere".into()));
        assert!(matches!(&report.issues[1], GraphIssue::Unreachable(ids) if ids.len() == 5));
    }

    #[test]
    fn cycles_terminate() {
        let graph = StoryGraph::new(
            "a",
            vec![
                StoryNode::new("a", "", "", Outgoing::Direct("b".into())),
                StoryNode::new("b", "", "", Outgoing::Direct("a".into())),
            ],
        )
        .unwrap();
        assert!(graph.validate("a").is_ok());
    }

    #[test]
    fn random_node_by_kind() {
        let graph = sample_graph();
        let mut dice = ScriptedDice::new([0, 1, 0]);
        assert_eq!(graph.random_node(Some(NodeKind::Battle), &mut dice).as_str(), "gate");
        assert_eq!(graph.random_node(Some(NodeKind::Terminal), &mut dice).as_str(), "insight");
        assert_eq!(graph.random_node(None, &mut dice).as_str(), "confused");

        let empty = StoryGraph::new("start", vec![]).unwrap();
        assert_eq!(empty.random_node(None, &mut dice).as_str(), "start");
    }

    #[test]
    fn random_orisha_node_only_picks_tagged_scenes() {
        let graph = StoryGraph::new(
            "start",
            vec![
                StoryNode::new("start", "", "", Outgoing::Direct("shrine".into())),
                StoryNode::new("shrine", "", "", Outgoing::Direct("river".into())).with_orisha(),
                StoryNode::new("river", "", "", Outgoing::Direct("end".into())).with_orisha(),
                StoryNode::new("end", "", "", Outgoing::Terminal),
            ],
        )
        .unwrap();
        let mut dice = ScriptedDice::new([0, 1]);
        assert_eq!(graph.random_orisha_node(&mut dice).as_str(), "river");
        assert_eq!(graph.random_orisha_node(&mut dice).as_str(), "shrine");

        let untagged = sample_graph();
        assert_eq!(untagged.random_orisha_node(&mut dice).as_str(), "start");
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn orisha_tag_defaults_to_false_in_ron() {
        let input = r#"[
            (id: "start", outgoing: Direct("grove")),
            (id: "grove", outgoing: Terminal, orisha: true),
        ]"#;
        let graph = StoryGraph::parse_ron(input, "start").unwrap();
        assert!(!graph.get_node("start").orisha);
        assert!(graph.get_node("grove").orisha);
    }

    #[test]
    fn parse_story_ron() {
        let input = r#"[
            (id: "start", title: "Begin", text: "", outgoing: Direct("end")),
            (id: "end", title: "End", text: "", outgoing: Terminal),
        ]"#;
        let graph = StoryGraph::parse_ron(input, "start").unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains("end"));
        assert!(graph.validate("start").is_ok());
    }
}
