//! Concurrent fan-out of the probe set

use chrono::Utc;
use std::time::Duration;

use crate::contracts::HealthCheck;
use crate::probes::{run_isolated, ProbeSet};

/// Run every probe as its own task and stamp the batch once all are done
///
/// Batch order follows registration order. A probe task that panics is
/// recorded as a failed check instead of aborting the batch.
pub async fn run_batch(probes: &ProbeSet, timeout: Duration) -> Vec<HealthCheck> {
    let outcomes =
        futures::future::join_all(probes.iter().map(|probe| run_isolated(probe.clone(), timeout)))
            .await;

    // One timestamp for the whole batch, taken after fan-in
    let checked_at = Utc::now();

    probes
        .iter()
        .zip(outcomes)
        .map(|(probe, result)| {
            HealthCheck::stamped(probe.check_type(), probe.name(), result, checked_at)
        })
        .collect()
}
