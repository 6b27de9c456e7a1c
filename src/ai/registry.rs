//! Strategy registry: difficulty → concrete strategy.
//!
//! Keep ordering stable and constructors side-effect free; same seed ⇒
//! same behavior for the seeded tiers.

use serde::{Deserialize, Serialize};

use crate::ai::easy::EasyBot;
use crate::ai::hard::HardBot;
use crate::ai::medium::MediumBot;
use crate::ai::trait_def::BotStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// Construct the strategy for a difficulty tier.
pub fn strategy_for(difficulty: Difficulty, seed: Option<u64>) -> Box<dyn BotStrategy> {
    match difficulty {
        Difficulty::Easy => Box::new(EasyBot::new(seed)),
        Difficulty::Medium => Box::new(MediumBot::new(seed)),
        Difficulty::Hard => Box::new(HardBot::new(seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_difficulty_constructs() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let _: Box<dyn BotStrategy> = strategy_for(difficulty, Some(7));
        }
    }

    #[test]
    fn difficulty_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Difficulty::Easy).unwrap(), "\"easy\"");
        assert_eq!(
            serde_json::from_str::<Difficulty>("\"hard\"").unwrap(),
            Difficulty::Hard
        );
    }
}
