use crate::global_state::GlobalStateContainer;
use chrono::NaiveDate;
use sim_core::{SimError, SimResult};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, info_span, Instrument};

pub const FACTORY_STEP: &str = "factoryStep";
pub const RETAIL_SALE_STEP: &str = "retailSaleStep";
pub const WHOLESALE_STEP: &str = "wholesaleStep";

/// Steps of one turn, in execution order.
pub const TURN_STEPS: [&str; 3] = [FACTORY_STEP, RETAIL_SALE_STEP, WHOLESALE_STEP];

pub type TurnStepFuture = Pin<Box<dyn Future<Output = SimResult<()>> + Send>>;
pub type TurnCallback = Arc<dyn Fn() -> TurnStepFuture + Send + Sync>;

/// Runs the registered turn steps strictly one after another.
pub struct TurnProgressSystem {
    callbacks: RwLock<HashMap<String, TurnCallback>>,
    turn_lock: Mutex<()>,
    global_state: Arc<GlobalStateContainer>,
}

impl TurnProgressSystem {
    pub fn new(global_state: Arc<GlobalStateContainer>) -> Self {
        Self {
            callbacks: RwLock::new(HashMap::new()),
            turn_lock: Mutex::new(()),
            global_state,
        }
    }

    /// Register the callback of a named step. Each name may be registered once.
    pub fn register_callback<F>(&self, name: &str, callback: F) -> SimResult<()>
    where
        F: Fn() -> TurnStepFuture + Send + Sync + 'static,
    {
        let mut callbacks = self
            .callbacks
            .write()
            .map_err(|_| SimError::unexpected("turn callback registry poisoned"))?;
        if callbacks.contains_key(name) {
            return Err(SimError::conflict(format!(
                "turn step callback '{name}' is already registered"
            )));
        }
        callbacks.insert(name.to_string(), Arc::new(callback));
        Ok(())
    }

    fn resolve_steps(&self) -> SimResult<Vec<(&'static str, TurnCallback)>> {
        let callbacks = self
            .callbacks
            .read()
            .map_err(|_| SimError::unexpected("turn callback registry poisoned"))?;
        TURN_STEPS
            .iter()
            .map(|&name| {
                callbacks
                    .get(name)
                    .cloned()
                    .map(|cb| (name, cb))
                    .ok_or_else(|| {
                        SimError::unexpected(format!("turn step '{name}' is not registered"))
                    })
            })
            .collect()
    }

    /// Run factory, retail-sale and wholesale steps in order, then advance the date.
    ///
    /// A failing step aborts the rest of the turn; earlier steps are not rolled
    /// back and the date does not move. Concurrent calls queue up.
    pub async fn progress_turn(&self) -> SimResult<NaiveDate> {
        let _turn = self.turn_lock.lock().await;
        let steps = self.resolve_steps()?;
        for (name, step) in steps {
            step().instrument(info_span!("turn_step", step = name)).await?;
        }
        let date = self.global_state.advance_day().await?;
        info!(%date, "turn complete");
        Ok(date)
    }
}
