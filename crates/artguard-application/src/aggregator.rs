//! Normalizes batch and individual service responses into one result map.

use artguard_core::protection::wire::{BatchLayerResult, LayerResponse};
use artguard_core::protection::{
    DeliveryMode, LayerResult, ProtectionReport, ProtectionRequest, TierThresholds,
};
use artguard_core::error::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Collects per-layer results for one protection cycle.
///
/// Only layers that belong to the cycle are accepted. Responses that cannot
/// be parsed or name an unknown layer are dropped and logged. A protected
/// result is never replaced by a later failure for the same layer, so results
/// from earlier attempts survive a retry.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    expected: BTreeSet<String>,
    results: BTreeMap<String, LayerResult>,
    dropped: usize,
}

impl ResultAggregator {
    pub fn new<I, S>(layer_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: layer_ids.into_iter().map(Into::into).collect(),
            results: BTreeMap::new(),
            dropped: 0,
        }
    }

    pub fn for_request(request: &ProtectionRequest) -> Self {
        Self::new(request.layer_ids())
    }

    /// Merges the `results` array of a batch response. Returns how many entries were accepted.
    pub fn merge_batch(&mut self, entries: &[serde_json::Value]) -> usize {
        let mut accepted = 0;
        for entry in entries {
            match serde_json::from_value::<BatchLayerResult>(entry.clone()) {
                Ok(parsed) => {
                    let result = if parsed.success {
                        LayerResult::protected(
                            parsed.layer_id,
                            parsed.bit_accuracy,
                            parsed.watermark_hash,
                        )
                    } else {
                        LayerResult::failed(
                            parsed.layer_id,
                            parsed.error.unwrap_or_else(|| "rejected by service".to_string()),
                        )
                    };
                    if self.insert(result) {
                        accepted += 1;
                    }
                }
                Err(e) => {
                    self.dropped += 1;
                    tracing::error!("[ResultAggregator] Dropping unparseable batch entry: {}", e);
                }
            }
        }
        accepted
    }

    /// Merges one individual-endpoint response body.
    ///
    /// Returns `Some(protected)` when the body was understood, `None` when it was dropped.
    pub fn merge_individual(&mut self, layer_id: &str, body: &serde_json::Value) -> Option<bool> {
        let parsed = match serde_json::from_value::<LayerResponse>(body.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.dropped += 1;
                tracing::error!(
                    "[ResultAggregator] Dropping unparseable response for {}: {}",
                    layer_id,
                    e
                );
                return None;
            }
        };

        let protected = parsed.success;
        let result = if protected {
            LayerResult::protected(
                layer_id,
                parsed.bit_accuracy.unwrap_or(0.0),
                parsed.hash.unwrap_or_default(),
            )
        } else {
            LayerResult::failed(
                layer_id,
                parsed.error.unwrap_or_else(|| "rejected by service".to_string()),
            )
        };

        if self.insert(result) { Some(protected) } else { None }
    }

    /// Records a layer whose call failed before any response arrived.
    pub fn record_failure(&mut self, layer_id: &str, error: impl Into<String>) {
        self.insert(LayerResult::failed(layer_id, error));
    }

    fn insert(&mut self, result: LayerResult) -> bool {
        if !self.expected.contains(&result.layer_id) {
            self.dropped += 1;
            tracing::error!(
                "[ResultAggregator] Dropping result for unknown layer '{}'",
                result.layer_id
            );
            return false;
        }

        match self.results.get(&result.layer_id) {
            Some(existing) if existing.protected && !result.protected => {
                tracing::debug!(
                    "[ResultAggregator] Keeping earlier protected result for {}",
                    result.layer_id
                );
            }
            _ => {
                self.results.insert(result.layer_id.clone(), result);
            }
        }
        true
    }

    pub fn protected_count(&self) -> usize {
        self.results.values().filter(|r| r.protected).count()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    pub fn results(&self) -> &BTreeMap<String, LayerResult> {
        &self.results
    }

    /// Finalizes the cycle into a report; the tier is derived from the protected count.
    ///
    /// # Errors
    ///
    /// Returns `Internal` when `total_layers` is smaller than the number of collected results.
    pub fn finish(
        self,
        session_id: &str,
        version: u32,
        total_layers: usize,
        mode: DeliveryMode,
        thresholds: &TierThresholds,
    ) -> Result<ProtectionReport> {
        if self.dropped > 0 {
            tracing::warn!(
                "[ResultAggregator] {} responses were dropped during aggregation",
                self.dropped
            );
        }
        ProtectionReport::new(session_id, version, total_layers, self.results, mode, thresholds)
    }
}
