use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use tileflow_core::{DomainError, DomainResult, StockItemId};

use crate::counters::{ReserveOutcome, StockCounters};
use crate::item::{ItemProfile, StockItem, StockSeed};
use crate::production::ProductionRecord;

/// Result of a full ledger rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    /// Items whose counters were zeroed.
    pub items_reset: usize,
    /// Items that received replayed delivered totals.
    pub items_rebuilt: usize,
}

/// The inventory ledger: exclusive owner of every stock item's counters.
///
/// All mutation flows through the operations below. Each operation runs
/// under the target item's lock; operations on different items proceed
/// concurrently. [`StockLedger::rebuild_all`] takes the map's write lock and
/// therefore excludes every other operation for its duration.
#[derive(Debug, Default)]
pub struct StockLedger {
    items: RwLock<HashMap<StockItemId, Mutex<StockItem>>>,
    production_log: RwLock<Vec<ProductionRecord>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_quantity(qty: f64, what: &str) -> DomainResult<()> {
        if !qty.is_finite() {
            return Err(DomainError::validation(format!("{what} must be finite")));
        }
        if qty < 0.0 {
            return Err(DomainError::validation(format!(
                "{what} must not be negative"
            )));
        }
        Ok(())
    }

    /// Run `f` against one item while holding that item's lock.
    ///
    /// The map read guard is held for the whole call, so a concurrent
    /// rebuild cannot start while any per-item operation is in flight.
    fn with_item<T>(
        &self,
        item_id: StockItemId,
        f: impl FnOnce(&mut StockItem) -> T,
    ) -> DomainResult<T> {
        let items = self
            .items
            .read()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        let slot = items
            .get(&item_id)
            .ok_or_else(|| DomainError::not_found("stock item", item_id))?;
        let mut item = slot
            .lock()
            .map_err(|_| DomainError::conflict("stock item lock poisoned"))?;
        Ok(f(&mut item))
    }

    /// Run `f` against one item's counters under that item's lock.
    ///
    /// This is the seam the backorder resolver uses: its whole
    /// scan-and-commit pass for an item executes inside one closure, so the
    /// capacity it reads and the reservations it commits form a single
    /// atomic step per pass.
    pub fn with_counters<T>(
        &self,
        item_id: StockItemId,
        f: impl FnOnce(&mut StockCounters) -> T,
    ) -> DomainResult<T> {
        self.with_item(item_id, |item| f(&mut item.counters))
    }

    // ---- administration -------------------------------------------------

    pub fn create_item(&self, item: StockItem) -> DomainResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        if items.contains_key(&item.id) {
            return Err(DomainError::conflict(format!(
                "stock item already exists: {}",
                item.id
            )));
        }
        items.insert(item.id, Mutex::new(item));
        Ok(())
    }

    /// Seed many items from historical totals in one pass.
    pub fn bulk_create(&self, seeds: Vec<StockSeed>) -> DomainResult<usize> {
        let mut items = self
            .items
            .write()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        let mut created = 0;
        for seed in seeds {
            if items.contains_key(&seed.id) {
                return Err(DomainError::conflict(format!(
                    "stock item already exists: {}",
                    seed.id
                )));
            }
            items.insert(seed.id, Mutex::new(StockItem::from_seed(seed)));
            created += 1;
        }
        Ok(created)
    }

    /// Replace descriptive/pricing fields; counters are untouched.
    pub fn update_profile(&self, item_id: StockItemId, profile: ItemProfile) -> DomainResult<()> {
        self.with_item(item_id, |item| item.apply_profile(profile))
    }

    pub fn deactivate_item(&self, item_id: StockItemId) -> DomainResult<()> {
        self.with_item(item_id, |item| item.active = false)
    }

    /// Remove an item outright. Callers must ensure no live order still
    /// references it; the ledger has no view of orders.
    pub fn remove_item(&self, item_id: StockItemId) -> DomainResult<StockItem> {
        let mut items = self
            .items
            .write()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        let slot = items
            .remove(&item_id)
            .ok_or_else(|| DomainError::not_found("stock item", item_id))?;
        slot.into_inner()
            .map_err(|_| DomainError::conflict("stock item lock poisoned"))
    }

    /// Snapshot of one item.
    pub fn get_item(&self, item_id: StockItemId) -> DomainResult<StockItem> {
        self.with_item(item_id, |item| item.clone())
    }

    /// Snapshot of every item, ordered by product name for stable listings.
    pub fn list_items(&self) -> Vec<StockItem> {
        let Ok(items) = self.items.read() else {
            return Vec::new();
        };
        let mut all: Vec<StockItem> = items
            .values()
            .filter_map(|slot| slot.lock().ok().map(|item| item.clone()))
            .collect();
        all.sort_by(|a, b| a.product.cmp(&b.product));
        all
    }

    // ---- ledger operations ----------------------------------------------

    /// Attempt to allocate `needed` units to an order line.
    pub fn reserve(&self, item_id: StockItemId, needed: f64) -> DomainResult<ReserveOutcome> {
        Self::ensure_quantity(needed, "reserved quantity")?;
        let outcome = self.with_counters(item_id, |c| c.reserve(needed))?;
        match outcome {
            ReserveOutcome::Reserved => {
                tracing::debug!(item = %item_id, needed, "reservation committed");
            }
            ReserveOutcome::Backordered { shortfall } => {
                tracing::info!(item = %item_id, shortfall, "reservation backordered");
            }
        }
        Ok(outcome)
    }

    /// Register newly manufactured units.
    ///
    /// Production increases are the only event that can clear pending
    /// shortfalls: the production intake in the orders layer follows every
    /// successful `produce` with a backorder-resolution pass for the item.
    pub fn produce(&self, item_id: StockItemId, qty: f64) -> DomainResult<StockCounters> {
        Self::ensure_quantity(qty, "produced quantity")?;
        self.with_counters(item_id, |c| {
            c.produce(qty);
            *c
        })
    }

    /// Convert reserved units into delivered units (clamped at zero).
    pub fn deliver(&self, item_id: StockItemId, qty: f64) -> DomainResult<StockCounters> {
        Self::ensure_quantity(qty, "delivered quantity")?;
        self.with_counters(item_id, |c| {
            c.deliver(qty);
            *c
        })
    }

    /// Move the shortfall counter by a signed delta.
    pub fn adjust_pending(&self, item_id: StockItemId, delta: f64) -> DomainResult<StockCounters> {
        if !delta.is_finite() {
            return Err(DomainError::validation("pending delta must be finite"));
        }
        self.with_counters(item_id, |c| {
            c.adjust_pending(delta);
            *c
        })
    }

    /// Administrative per-item reset to explicit totals.
    pub fn rebuild(
        &self,
        item_id: StockItemId,
        manufactured: f64,
        delivered: f64,
    ) -> DomainResult<()> {
        Self::ensure_quantity(manufactured, "manufactured total")?;
        Self::ensure_quantity(delivered, "delivered total")?;
        self.with_counters(item_id, |c| c.rebuild(manufactured, delivered))
    }

    // ---- production log -------------------------------------------------

    /// Validate, log, and apply one production increase.
    ///
    /// Returns the counters after the increase so the caller can follow up
    /// with a resolver pass.
    pub fn record_production(
        &self,
        item_id: StockItemId,
        qty: f64,
        responsible: &str,
    ) -> DomainResult<StockCounters> {
        if responsible.trim().is_empty() {
            return Err(DomainError::malformed("responsible party is required"));
        }
        Self::ensure_quantity(qty, "produced quantity")?;
        if qty == 0.0 {
            return Err(DomainError::validation("produced quantity must be positive"));
        }

        let counters = self.produce(item_id, qty)?;
        let record = ProductionRecord::new(item_id, qty, responsible);
        tracing::info!(item = %item_id, qty, responsible, "production recorded");
        self.push_record(record)?;
        Ok(counters)
    }

    fn push_record(&self, record: ProductionRecord) -> DomainResult<()> {
        let mut log = self
            .production_log
            .write()
            .map_err(|_| DomainError::conflict("production log lock poisoned"))?;
        log.push(record);
        Ok(())
    }

    /// Production history for one item, oldest first.
    pub fn production_history(&self, item_id: StockItemId) -> Vec<ProductionRecord> {
        self.production_log
            .read()
            .map(|log| {
                log.iter()
                    .filter(|r| r.item_id == item_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- full reset ------------------------------------------------------

    /// Destructive, idempotent full reset.
    ///
    /// Holds the map write lock for the whole pass, excluding every other
    /// ledger operation. Drops the production log, zeroes every item, then
    /// writes `manufactured = delivered = total` for each entry in `totals`
    /// and inserts one synthetic production record per rebuilt item.
    /// Rebuilt availability stays at zero: historically delivered stock is
    /// fully consumed, not spare capacity.
    pub fn rebuild_all(
        &self,
        totals: &HashMap<StockItemId, f64>,
        responsible: &str,
    ) -> DomainResult<RebuildSummary> {
        let items = self
            .items
            .write()
            .map_err(|_| DomainError::conflict("ledger lock poisoned"))?;
        let mut log = self
            .production_log
            .write()
            .map_err(|_| DomainError::conflict("production log lock poisoned"))?;

        log.clear();

        let mut items_reset = 0;
        for slot in items.values() {
            let mut item = slot
                .lock()
                .map_err(|_| DomainError::conflict("stock item lock poisoned"))?;
            item.counters.rebuild(0.0, 0.0);
            items_reset += 1;
        }

        // Stable replay order so the synthetic log is deterministic too.
        let mut entries: Vec<(StockItemId, f64)> =
            totals.iter().map(|(id, total)| (*id, *total)).collect();
        entries.sort_by_key(|(id, _)| *id.as_uuid().as_bytes());

        let mut items_rebuilt = 0;
        for (item_id, total) in entries {
            let Some(slot) = items.get(&item_id) else {
                tracing::warn!(item = %item_id, "rebuild total references unknown stock item");
                continue;
            };
            if total <= 0.0 {
                continue;
            }
            let mut item = slot
                .lock()
                .map_err(|_| DomainError::conflict("stock item lock poisoned"))?;
            item.counters.rebuild(total, total);
            log.push(ProductionRecord::new(item_id, total, responsible));
            items_rebuilt += 1;
        }

        tracing::info!(items_reset, items_rebuilt, "ledger rebuilt from delivered history");
        Ok(RebuildSummary {
            items_reset,
            items_rebuilt,
        })
    }
}
