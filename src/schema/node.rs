use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::enemy::EnemyId;
use super::player::Attribute;

/// Newtype wrapper for story node IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a choice decides where the story goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// Unconditional jump.
    Link(NodeId),
    /// d20 + attribute against a difficulty.
    Test {
        attribute: Attribute,
        difficulty: i32,
        success_node: NodeId,
        failure_node: NodeId,
    },
}

/// One option presented at a choice node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub resolution: Resolution,
}

impl Choice {
    pub fn link(text: impl Into<String>, next: impl Into<NodeId>) -> Self {
        Self {
            text: text.into(),
            resolution: Resolution::Link(next.into()),
        }
    }

    pub fn test(
        text: impl Into<String>,
        attribute: Attribute,
        difficulty: i32,
        success_node: impl Into<NodeId>,
        failure_node: impl Into<NodeId>,
    ) -> Self {
        Self {
            text: text.into(),
            resolution: Resolution::Test {
                attribute,
                difficulty,
                success_node: success_node.into(),
                failure_node: failure_node.into(),
            },
        }
    }
}

/// The outgoing edges of a node. Exactly one kind per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outgoing {
    Choices(Vec<Choice>),
    Direct(NodeId),
    Battle {
        enemy: EnemyId,
        victory_node: NodeId,
        defeat_node: NodeId,
    },
    Terminal,
}

/// Coarse node classification, used for lookups and lint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Choice,
    Direct,
    Battle,
    Terminal,
}

/// Which kind of edge points at a target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Link,
    Success,
    Failure,
    Direct,
    Victory,
    Defeat,
}

impl EdgeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Link => "node",
            Self::Success => "success node",
            Self::Failure => "failure node",
            Self::Direct => "next node",
            Self::Victory => "victory node",
            Self::Defeat => "defeat node",
        }
    }
}

/// A node in the narrative graph. Title and text are opaque display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub outgoing: Outgoing,
    /// Marks scenes where an Orisha takes part.
    #[serde(default)]
    pub orisha: bool,
}

impl StoryNode {
    pub fn new(
        id: impl Into<NodeId>,
        title: impl Into<String>,
        text: impl Into<String>,
        outgoing: Outgoing,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
            outgoing,
            orisha: false,
        }
    }

    pub fn with_orisha(mut self) -> Self {
        self.orisha = true;
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self.outgoing {
            Outgoing::Choices(_) => NodeKind::Choice,
            Outgoing::Direct(_) => NodeKind::Direct,
            Outgoing::Battle { .. } => NodeKind::Battle,
            Outgoing::Terminal => NodeKind::Terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.outgoing, Outgoing::Terminal)
    }

    /// The choices at this node; empty for non-choice nodes.
    pub fn choices(&self) -> &[Choice] {
        match &self.outgoing {
            Outgoing::Choices(choices) => choices,
            _ => &[],
        }
    }

    /// Every edge leaving this node, in declaration order.
    pub fn edges(&self) -> Vec<(EdgeKind, &NodeId)> {
        let mut edges = Vec::new();
        match &self.outgoing {
            Outgoing::Choices(choices) => {
                for choice in choices {
                    match &choice.resolution {
                        Resolution::Link(next) => edges.push((EdgeKind::Link, next)),
                        Resolution::Test {
                            success_node,
                            failure_node,
                            ..
                        } => {
                            edges.push((EdgeKind::Success, success_node));
                            edges.push((EdgeKind::Failure, failure_node));
                        }
                    }
                }
            }
            Outgoing::Direct(next) => edges.push((EdgeKind::Direct, next)),
            Outgoing::Battle {
                victory_node,
                defeat_node,
                ..
            } => {
                edges.push((EdgeKind::Victory, victory_node));
                edges.push((EdgeKind::Defeat, defeat_node));
            }
            Outgoing::Terminal => {}
        }
        edges
    }
}

/// Authoring presets for test difficulties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    Medium,
    Hard,
    VeryHard,
    NearlyImpossible,
}

impl Difficulty {
    pub fn value(&self) -> i32 {
        match self {
            Self::VeryEasy => 5,
            Self::Easy => 8,
            Self::Medium => 12,
            Self::Hard => 15,
            Self::VeryHard => 18,
            Self::NearlyImpossible => 22,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_cover_every_resolution() {
        let node = StoryNode::new(
            "crossroads",
            "Crossroads",
            "Three paths.",
            Outgoing::Choices(vec![
                Choice::link("Go left", "left"),
                Choice::test("Climb", Attribute::Physical, 12, "top", "bottom"),
            ]),
        );
        let edges = node.edges();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0], (EdgeKind::Link, &NodeId::from("left")));
        assert_eq!(edges[1], (EdgeKind::Success, &NodeId::from("top")));
        assert_eq!(edges[2], (EdgeKind::Failure, &NodeId::from("bottom")));
        assert_eq!(node.kind(), NodeKind::Choice);
    }

    #[test]
    fn battle_edges() {
        let node = StoryNode::new(
            "gate",
            "",
            "",
            Outgoing::Battle {
                enemy: EnemyId::from("guard"),
                victory_node: "inside".into(),
                defeat_node: "cell".into(),
            },
        );
        let targets: Vec<&str> = node.edges().iter().map(|(_, id)| id.as_str()).collect();
        assert_eq!(targets, vec!["inside", "cell"]);
        assert!(node.choices().is_empty());
    }

    #[test]
    fn terminal_has_no_edges() {
        let node = StoryNode::new("end", "The End", "", Outgoing::Terminal);
        assert!(node.is_terminal());
        assert!(node.edges().is_empty());
    }

    #[test]
    fn node_from_ron() {
        let input = r#"(
            id: "well",
            title: "The Well",
            text: "Water glints below.",
            outgoing: Choices([
                (text: "Drink", resolution: Link("refreshed")),
                (text: "Dive", resolution: Test(
                    attribute: Physical,
                    difficulty: 10,
                    success_node: "cavern",
                    failure_node: "bruised",
                )),
            ]),
        )"#;
        let node: StoryNode = ron::from_str(input).unwrap();
        assert_eq!(node.id, NodeId::from("well"));
        assert_eq!(node.choices().len(), 2);
        assert!(matches!(
            &node.choices()[1].resolution,
            Resolution::Test { attribute: Attribute::Physical, difficulty: 10, .. }
        ));
    }

    #[test]
    fn two_edge_kinds_do_not_parse() {
        let input = r#"(id: "x", outgoing: Direct("y"), outgoing: Terminal)"#;
        assert!(ron::from_str::<StoryNode>(input).is_err());
    }

    #[test]
    fn difficulty_presets() {
        assert_eq!(Difficulty::VeryEasy.value(), 5);
        assert_eq!(Difficulty::Medium.value(), 12);
        assert_eq!(Difficulty::NearlyImpossible.value(), 22);
    }
}
