#![allow(dead_code)]

pub mod architecture;

use std::time::Duration;

/// Let spawned feed and dispatcher tasks run. Under a paused clock this
/// only advances time once every task is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
