//! Winner determination for a completed duel.

use crate::gamification::DuelXpRules;

use super::ParticipantScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelOutcome {
    ChallengerWins,
    OpponentWins,
    Draw,
}

/// Compares both participants' results: higher correct_count wins, ties are
/// broken by lower total_time_ms, and a full tie is a draw.
pub fn resolve(challenger: &ParticipantScore, opponent: &ParticipantScore) -> DuelOutcome {
    if challenger.correct_count > opponent.correct_count {
        DuelOutcome::ChallengerWins
    } else if opponent.correct_count > challenger.correct_count {
        DuelOutcome::OpponentWins
    } else if challenger.total_time_ms < opponent.total_time_ms {
        DuelOutcome::ChallengerWins
    } else if opponent.total_time_ms < challenger.total_time_ms {
        DuelOutcome::OpponentWins
    } else {
        DuelOutcome::Draw
    }
}

/// Per-participant `is_winner` flags: NULL for both exactly on a draw,
/// exactly one true/false pair otherwise.
pub fn winner_flags(outcome: DuelOutcome) -> (Option<bool>, Option<bool>) {
    match outcome {
        DuelOutcome::ChallengerWins => (Some(true), Some(false)),
        DuelOutcome::OpponentWins => (Some(false), Some(true)),
        DuelOutcome::Draw => (None, None),
    }
}

/// XP for one side's winner flag.
pub fn xp_for(is_winner: Option<bool>, rules: &DuelXpRules) -> f64 {
    match is_winner {
        Some(true) => rules.win,
        Some(false) => rules.loss,
        None => rules.draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(user: &str, correct: i32, time_ms: i64) -> ParticipantScore {
        ParticipantScore {
            user_id: user.to_string(),
            correct_count: correct,
            total_time_ms: time_ms,
        }
    }

    #[test]
    fn higher_correct_count_wins() {
        let outcome = resolve(&score("a", 4, 90_000), &score("b", 3, 10_000));
        assert_eq!(outcome, DuelOutcome::ChallengerWins);
    }

    #[test]
    fn lower_time_breaks_count_tie() {
        let outcome = resolve(&score("a", 4, 90_000), &score("b", 4, 10_000));
        assert_eq!(outcome, DuelOutcome::OpponentWins);
    }

    #[test]
    fn full_tie_is_a_draw() {
        let outcome = resolve(&score("a", 4, 60_000), &score("b", 4, 60_000));
        assert_eq!(outcome, DuelOutcome::Draw);
        assert_eq!(winner_flags(outcome), (None, None));
    }

    #[test]
    fn xp_per_outcome() {
        let rules = DuelXpRules::standard();
        let (a, b) = winner_flags(DuelOutcome::ChallengerWins);
        assert_eq!(xp_for(a, &rules), 20.0);
        assert_eq!(xp_for(b, &rules), 5.0);
        assert_eq!(xp_for(None, &rules), 10.0);
    }
}
