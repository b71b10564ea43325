use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use system::chrono::Utc;

use crate::server::{ServerCommand, ServerTx};

/// Asks the server to sweep expired strokes once per `period`, first after one
/// full period. Stops when the server is gone.
pub fn spawn_expiry_scheduler(srv_tx: ServerTx, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let command = ServerCommand::Sweep { now: Utc::now() };
            if srv_tx.send(command).await.is_err() {
                log::info!("Server is gone, expiry scheduler stopping");
                break;
            }
        }
    })
}
