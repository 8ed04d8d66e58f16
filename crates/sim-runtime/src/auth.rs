use sim_core::EntityId;
use std::fmt;

/// Who is acting on a player-facing call. Recorded in logs only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub actor: String,
    pub company_id: Option<EntityId>,
}

impl AuthContext {
    /// The simulation itself, e.g. bootstrap code.
    pub fn system() -> Self {
        Self {
            actor: "system".into(),
            company_id: None,
        }
    }

    pub fn player(actor: impl Into<String>, company_id: Option<EntityId>) -> Self {
        Self {
            actor: actor.into(),
            company_id,
        }
    }
}

impl fmt::Display for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.company_id {
            Some(c) => write!(f, "{}@{}", self.actor, c),
            None => f.write_str(&self.actor),
        }
    }
}
