use chrono::NaiveDate;
use sim_core::{
    EntityId, GlobalState, GlobalStatePatch, MemoryRepository, SimError, SimResult,
    GLOBAL_STATE_ID,
};
use std::sync::Arc;
use tracing::info;

/// Owner of the singleton [`GlobalState`].
pub struct GlobalStateContainer {
    states: Arc<MemoryRepository<GlobalState>>,
    start_date: NaiveDate,
}

impl GlobalStateContainer {
    pub fn new(states: Arc<MemoryRepository<GlobalState>>, start_date: NaiveDate) -> Self {
        Self { states, start_date }
    }

    fn id() -> EntityId {
        EntityId::from(GLOBAL_STATE_ID)
    }

    /// Create the state at the start date unless it exists. Returns whether it was created.
    pub async fn initialize(&self) -> SimResult<bool> {
        if self.states.exists(&Self::id()).await? {
            return Ok(false);
        }
        self.states.create(GlobalState::new(self.start_date)).await?;
        info!(date = %self.start_date, "global state initialized");
        Ok(true)
    }

    pub async fn get_state(&self) -> SimResult<GlobalState> {
        self.states.read(&Self::id()).await
    }

    pub async fn set_state(&self, game_date: NaiveDate) -> SimResult<GlobalState> {
        self.states
            .update(
                &Self::id(),
                GlobalStatePatch {
                    game_date: Some(game_date),
                },
            )
            .await
    }

    /// Move the game date one day forward and return it.
    pub async fn advance_day(&self) -> SimResult<NaiveDate> {
        let (state, ()) = self
            .states
            .mutate(&Self::id(), |s| {
                s.game_date = s
                    .game_date
                    .succ_opt()
                    .ok_or_else(|| SimError::unexpected("game date out of range"))?;
                Ok(())
            })
            .await?;
        Ok(state.game_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn initialize_once_then_advance() {
        let c = GlobalStateContainer::new(Arc::new(MemoryRepository::new()), ymd(1990, 1, 1));
        assert!(c.get_state().await.unwrap_err().is_not_found());
        assert!(c.initialize().await.unwrap());
        assert!(!c.initialize().await.unwrap());

        assert_eq!(c.advance_day().await.unwrap(), ymd(1990, 1, 2));
        c.set_state(ymd(1990, 12, 31)).await.unwrap();
        assert_eq!(c.advance_day().await.unwrap(), ymd(1991, 1, 1));
        assert_eq!(c.get_state().await.unwrap().id.as_str(), "main");
    }
}
