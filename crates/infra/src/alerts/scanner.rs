//! Debounced low-stock scan.
//!
//! A notification is sent only when the set of low parts differs from the one
//! recorded by the previous changing scan. The new signature is recorded with a
//! compare-and-set before publishing, so two concurrent scanners cannot both
//! notify for the same change, and a failed publish never rolls it back.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use partforge_inventory::{LOW_STOCK_ALERT_SUBJECT, LowStockSet, LowStockState};

use crate::store::{AlertStateStore, InventoryStore, StoreError};

use super::notifier::Notifier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("low-stock scan failed: {0}")]
    Store(#[from] StoreError),
}

/// Result of one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// The low-stock set differed from the recorded one and this scan recorded it.
    pub changed: bool,
    /// Number of parts currently below their minimum.
    pub count: usize,
    pub signature: String,
    /// A notification was delivered.
    pub notified: bool,
    /// Delivery failure, if publishing was attempted and failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
}

pub struct LowStockScanner<I, S, N> {
    inventory: I,
    state: S,
    notifier: N,
}

impl<I, S, N> LowStockScanner<I, S, N>
where
    I: InventoryStore,
    S: AlertStateStore,
    N: Notifier,
{
    pub fn new(inventory: I, state: S, notifier: N) -> Self {
        Self {
            inventory,
            state,
            notifier,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn scan(&self) -> Result<ScanOutcome, ScanError> {
        let set = LowStockSet::from_parts(self.inventory.scan().await?);
        let signature = set.signature();
        let count = set.len();

        let previous = self.state.get().await?;
        let previous_signature = previous.as_ref().map(|s| s.signature.as_str());

        let unchanged = ScanOutcome {
            changed: false,
            count,
            signature: signature.clone(),
            notified: false,
            notify_error: None,
        };

        // A missing record counts as the empty signature.
        if previous_signature.unwrap_or("") == signature {
            return Ok(unchanged);
        }

        let now = Utc::now();
        let recorded = self
            .state
            .compare_and_set(
                previous_signature,
                LowStockState {
                    signature: signature.clone(),
                    updated_at: now,
                },
            )
            .await?;
        if !recorded {
            info!(%signature, "low-stock state changed concurrently; skipping notification");
            return Ok(unchanged);
        }

        let mut outcome = ScanOutcome {
            changed: true,
            ..unchanged
        };

        if set.is_empty() {
            info!("low-stock set cleared");
            return Ok(outcome);
        }

        match self
            .notifier
            .publish(LOW_STOCK_ALERT_SUBJECT, &set.report(now))
            .await
        {
            Ok(()) => {
                info!(count, %signature, "low-stock alert sent");
                outcome.notified = true;
            }
            Err(e) => {
                warn!(error = %e, %signature, "low-stock alert could not be delivered");
                outcome.notify_error = Some(e.to_string());
            }
        }

        Ok(outcome)
    }
}
