use crate::error::SimResult;
use crate::id::EntityId;
use crate::repository::{Entity, FieldValue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed id of the singleton global state.
pub const GLOBAL_STATE_ID: &str = "main";

/// Game-wide state; exactly one instance exists per game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    pub id: EntityId,
    pub game_date: NaiveDate,
}

impl GlobalState {
    pub fn new(game_date: NaiveDate) -> Self {
        Self {
            id: EntityId::from(GLOBAL_STATE_ID),
            game_date,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GlobalStatePatch {
    pub game_date: Option<NaiveDate>,
}

impl Entity for GlobalState {
    type Patch = GlobalStatePatch;
    const ENTITY_TYPE: &'static str = "GlobalState";

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        Some(match name {
            "id" => (&self.id).into(),
            "game_date" => self.game_date.into(),
            _ => return None,
        })
    }

    fn apply_patch(&mut self, patch: GlobalStatePatch) -> SimResult<()> {
        if let Some(date) = patch.game_date {
            self.game_date = date;
        }
        Ok(())
    }
}
