//! Per-player match results.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A score reported by `<player> finished playing (Score: N, PASSED|FAILED).`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Display name of the player who set the score
    pub player: String,
    pub score: u64,
    pub pass: bool,
}

impl Score {
    pub fn new(player: impl Into<String>, score: u64, pass: bool) -> Self {
        Self {
            player: player.into(),
            score,
            pass,
        }
    }
}

/// Passes before fails, then higher score first.
pub fn compare_scores(a: &Score, b: &Score) -> Ordering {
    b.pass.cmp(&a.pass).then_with(|| b.score.cmp(&a.score))
}

/// Sort scores in place using [`compare_scores`]. The sort is stable.
pub fn sort_scores(scores: &mut [Score]) {
    scores.sort_by(compare_scores);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_passes_then_score_descending() {
        let mut scores: Vec<Score> = [
            (500000, false),
            (500000, true),
            (1000000, true),
            (800000, true),
            (900000, false),
        ]
        .into_iter()
        .enumerate()
        .map(|(i, (score, pass))| Score::new(format!("player{i}"), score, pass))
        .collect();

        sort_scores(&mut scores);

        let sorted: Vec<(u64, bool)> = scores.iter().map(|s| (s.score, s.pass)).collect();
        assert_eq!(
            sorted,
            vec![
                (1000000, true),
                (800000, true),
                (500000, true),
                (900000, false),
                (500000, false),
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut scores = vec![Score::new("a", 100, true), Score::new("b", 100, true)];
        sort_scores(&mut scores);
        assert_eq!(scores[0].player, "a");
        assert_eq!(scores[1].player, "b");
    }
}
