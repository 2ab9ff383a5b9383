use std::collections::HashMap;
use std::sync::Arc;

use tileflow_catalog::ConversionCatalog;
use tileflow_core::{DomainResult, StockItemId};
use tileflow_ledger::{RebuildSummary, StockLedger};
use tileflow_orders::OrderStore;

/// Responsible party stamped on the synthetic summary records.
pub const REBUILD_RESPONSIBLE: &str = "ledger rebuild";

/// Administrative full reset of the ledger from delivered-order history.
///
/// Destructive and idempotent: the incremental production log is discarded,
/// every counter is zeroed, and `manufactured = delivered = replayed total`
/// is written per item that ever shipped. Rebuilt stock is treated as fully
/// consumed (`available` stays at zero); items with no delivered orders are
/// left fully zeroed.
pub struct LedgerRebuilder<C, S> {
    ledger: Arc<StockLedger>,
    catalog: Arc<C>,
    store: Arc<S>,
}

impl<C, S> LedgerRebuilder<C, S>
where
    C: ConversionCatalog,
    S: OrderStore,
{
    pub fn new(ledger: Arc<StockLedger>, catalog: Arc<C>, store: Arc<S>) -> Self {
        Self {
            ledger,
            catalog,
            store,
        }
    }

    /// Replay delivered orders into per-item unit totals and reset the
    /// ledger to them. Runs under the ledger's whole-map write lock.
    pub fn rebuild(&self) -> DomainResult<RebuildSummary> {
        let delivered = self.store.delivered();

        let model_ids: Vec<_> = delivered
            .iter()
            .flat_map(|o| o.lines().iter())
            .map(|l| l.model_id)
            .collect();
        let factors = self.catalog.factors_for(&model_ids);

        let mut totals: HashMap<StockItemId, f64> = HashMap::new();
        for order in &delivered {
            for line in order.lines() {
                let Some(&factor) = factors.get(&line.model_id) else {
                    tracing::warn!(
                        model = %line.model_id,
                        order = %order.id(),
                        "no usable conversion factor; line excluded from rebuild"
                    );
                    continue;
                };
                *totals.entry(line.item_id).or_insert(0.0) += line.quantity * factor;
            }
        }

        tracing::info!(
            delivered_orders = delivered.len(),
            items = totals.len(),
            "replaying delivered history into the ledger"
        );
        self.ledger.rebuild_all(&totals, REBUILD_RESPONSIBLE)
    }
}
