//! Randomness source shared by the story graph and the combat engine.
//!
//! Every random decision in the crate, including coin flips and percentage
//! chances, is drawn through [`Dice::range`], so substituting a
//! [`ScriptedDice`] replays a turn exactly.

use rand::rngs::StdRng;
use rand::Rng;
use std::collections::VecDeque;

pub trait Dice {
    /// A uniform integer in `low..=high`.
    fn range(&mut self, low: i32, high: i32) -> i32;

    fn d20(&mut self) -> i32 {
        self.range(1, 20)
    }

    /// True with even odds.
    fn coin(&mut self) -> bool {
        self.range(1, 2) == 1
    }

    /// True with `percent` in 100 odds.
    fn chance(&mut self, percent: i32) -> bool {
        self.range(1, 100) <= percent
    }
}

impl Dice for StdRng {
    fn range(&mut self, low: i32, high: i32) -> i32 {
        if low >= high {
            return low;
        }
        self.gen_range(low..=high)
    }
}

/// A fixed sequence of draws, for tests and replays.
///
/// Values outside the requested range are clamped into it. Panics when the
/// script runs out, since a short script is a broken test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    values: VecDeque<i32>,
    drawn: usize,
}

impl ScriptedDice {
    pub fn new(values: impl IntoIterator<Item = i32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            drawn: 0,
        }
    }

    pub fn push(&mut self, value: i32) {
        self.values.push_back(value);
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    pub fn drawn(&self) -> usize {
        self.drawn
    }
}

impl Dice for ScriptedDice {
    fn range(&mut self, low: i32, high: i32) -> i32 {
        match self.values.pop_front() {
            Some(value) => {
                self.drawn += 1;
                value.clamp(low, high.max(low))
            }
            None => panic!(
                "scripted dice exhausted after {} draws (asked for {}..={})",
                self.drawn, low, high
            ),
        }
    }
}

/// How a d20 result reads to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollQuality {
    CriticalSuccess,
    Great,
    Average,
    Low,
    CriticalFailure,
}

impl RollQuality {
    pub fn from_roll(roll: i32) -> Self {
        if roll >= 20 {
            Self::CriticalSuccess
        } else if roll <= 1 {
            Self::CriticalFailure
        } else if roll >= 15 {
            Self::Great
        } else if roll >= 10 {
            Self::Average
        } else {
            Self::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CriticalSuccess => "critical success!",
            Self::Great => "great result",
            Self::Average => "average result",
            Self::Low => "low result",
            Self::CriticalFailure => "critical failure!",
        }
    }
}
