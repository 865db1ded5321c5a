use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Duel lifecycle state. Transitions are validated centrally here instead of
/// being re-derived per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Waiting,
    Active,
    Finished,
    Expired,
}

impl DuelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Finished => "finished",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            "expired" => Ok(Self::Expired),
            other => Err(Error::validation(format!("unknown duel status '{other}'"))),
        }
    }

    /// Terminal states accept no further answers and never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Expired)
    }

    /// Only waiting duels can be accepted.
    pub fn can_accept(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Answer intake is open while the duel is not terminal.
    pub fn accepts_answers(&self) -> bool {
        !self.is_terminal()
    }

    /// An active duel must run to completion or expiry before deletion.
    pub fn can_delete(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Expiry applies to duels that have not yet resolved.
    pub fn can_expire(&self) -> bool {
        matches!(self, Self::Waiting | Self::Active)
    }
}

impl std::fmt::Display for DuelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips() {
        for status in [
            DuelStatus::Waiting,
            DuelStatus::Active,
            DuelStatus::Finished,
            DuelStatus::Expired,
        ] {
            assert_eq!(DuelStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(DuelStatus::parse("cancelled").is_err());
    }

    #[test]
    fn transition_guards() {
        assert!(DuelStatus::Waiting.can_accept());
        assert!(!DuelStatus::Active.can_accept());
        assert!(DuelStatus::Active.accepts_answers());
        assert!(!DuelStatus::Finished.accepts_answers());
        assert!(!DuelStatus::Expired.accepts_answers());
        assert!(!DuelStatus::Active.can_delete());
        assert!(DuelStatus::Finished.can_delete());
        assert!(DuelStatus::Waiting.can_expire());
        assert!(!DuelStatus::Finished.can_expire());
    }
}
