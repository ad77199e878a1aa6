/// In-game team assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Defenders,
    Attackers,
    Spectator,
    Unassigned,
}

impl Team {
    /// The opposing side, if this team has one
    pub fn opposite(self) -> Option<Team> {
        match self {
            Team::Defenders => Some(Team::Attackers),
            Team::Attackers => Some(Team::Defenders),
            Team::Spectator | Team::Unassigned => None,
        }
    }
}

/// How two players' team assignments relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamRelationship {
    /// At least one side's team is not known yet
    Unknown,
    Same,
    Opposing,
}

/// Two known teams that are neither equal nor opposites.
///
/// The team enum is a closed world: every known-vs-known pairing must be
/// Same or Opposing. Hitting this error means the model itself is broken
/// and the embedder should surface it loudly, not swallow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("irreconcilable team pairing: {left:?} vs {right:?}")]
pub struct TeamPairingError {
    pub left: Team,
    pub right: Team,
}

/// Classify the relationship between two optional team assignments.
pub fn relationship(
    left: Option<Team>,
    right: Option<Team>,
) -> Result<TeamRelationship, TeamPairingError> {
    let (Some(left), Some(right)) = (left, right) else {
        return Ok(TeamRelationship::Unknown);
    };

    if left == right {
        Ok(TeamRelationship::Same)
    } else if left.opposite() == Some(right) {
        Ok(TeamRelationship::Opposing)
    } else {
        Err(TeamPairingError { left, right })
    }
}
