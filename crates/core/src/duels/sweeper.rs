//! Background expiry sweep for overdue duels.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::task::JoinHandle;

use super::DuelService;

/// Sweep cadence in seconds.
pub const SWEEP_INTERVAL_SECS: u64 = 30 * 60;

/// Spawns the periodic expiry sweep. One pass runs immediately so a restart
/// catches duels that went overdue while the process was down.
pub fn spawn(service: Arc<DuelService>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match service.expire_due().await {
                Ok(0) => {}
                Ok(count) => info!("duel sweep expired {count} duels"),
                Err(e) => error!("duel sweep failed: {e}"),
            }
        }
    })
}
