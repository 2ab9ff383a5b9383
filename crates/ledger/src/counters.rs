use serde::{Deserialize, Serialize};

use tileflow_core::ValueObject;

/// Outcome of a reservation attempt.
///
/// A reservation either allocates the full quantity or allocates nothing and
/// books the whole quantity as a shortfall; never a partial amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReserveOutcome {
    /// The full quantity was allocated against available capacity.
    Reserved,
    /// Nothing was allocated; the full quantity went into the shortfall
    /// bookkeeping and waits for a production increase.
    Backordered { shortfall: f64 },
}

impl ReserveOutcome {
    pub fn is_reserved(&self) -> bool {
        matches!(self, ReserveOutcome::Reserved)
    }
}

/// The quantity counters owned by the ledger for one stock item.
///
/// All values are native stock units (plates/panels), not ordered area.
/// Counters are mutated exclusively through the operations below, each of
/// which runs under the owning item's lock.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StockCounters {
    /// Cumulative units ever produced.
    pub manufactured: f64,
    /// Cumulative units shipped out.
    pub delivered: f64,
    /// Units currently allocated to unfulfilled orders.
    pub reserved: f64,
    /// Units still owed to orders that could not be reserved.
    pub pending: f64,
    /// Units free to reserve right now.
    pub available: f64,
}

impl ValueObject for StockCounters {}

impl StockCounters {
    /// Counters for a freshly created item: everything at zero.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Counters seeded from historical totals (bulk import path):
    /// whatever was produced and not yet delivered is on the shelf.
    pub fn seeded(manufactured: f64, delivered: f64) -> Self {
        Self {
            manufactured,
            delivered,
            reserved: 0.0,
            pending: 0.0,
            available: (manufactured - delivered).max(0.0),
        }
    }

    /// Reservable capacity: produced minus shipped minus already promised.
    ///
    /// This is the figure the backorder resolver checks; `available` can lag
    /// behind it after a shortfall zeroed it out.
    pub fn capacity(&self) -> f64 {
        self.manufactured - self.delivered - self.reserved
    }

    /// Attempt to allocate `needed` units to an order line.
    ///
    /// Succeeds only when the whole quantity fits into `available`. On a
    /// shortfall the remaining availability is absorbed into the shortfall
    /// bookkeeping: `pending` grows by the full quantity and `available`
    /// drops to zero.
    pub fn reserve(&mut self, needed: f64) -> ReserveOutcome {
        if self.available >= needed {
            self.reserved += needed;
            self.available -= needed;
            ReserveOutcome::Reserved
        } else {
            self.pending += needed;
            self.available = 0.0;
            ReserveOutcome::Backordered { shortfall: needed }
        }
    }

    /// Register newly manufactured units and recompute availability.
    pub fn produce(&mut self, qty: f64) {
        self.manufactured += qty;
        self.available = self.capacity().max(0.0);
    }

    /// Convert reserved units into delivered units.
    ///
    /// `reserved` is floored at zero so repeated-delivery retries cannot
    /// drive it negative.
    pub fn deliver(&mut self, qty: f64) {
        self.delivered += qty;
        self.reserved = (self.reserved - qty).max(0.0);
    }

    /// Move the shortfall counter by a signed delta, floored at zero.
    ///
    /// Touches nothing else: it corrects bookkeeping after an order edit or
    /// deletion, and later resolver passes reconcile it against capacity.
    pub fn adjust_pending(&mut self, delta: f64) {
        self.pending = (self.pending + delta).max(0.0);
    }

    /// Administrative full reset: set the historical totals directly, drop
    /// every derived counter to zero.
    pub fn rebuild(&mut self, manufactured: f64, delivered: f64) {
        self.manufactured = manufactured;
        self.delivered = delivered;
        self.reserved = 0.0;
        self.pending = 0.0;
        self.available = 0.0;
    }

    /// Resolver commit: promote a resolved shortfall into a reservation if
    /// capacity covers the whole quantity. Returns whether it committed.
    pub fn commit_backorder(&mut self, needed: f64) -> bool {
        if self.capacity() < needed {
            return false;
        }
        self.reserved += needed;
        self.available = (self.available - needed).max(0.0);
        self.pending = (self.pending - needed).max(0.0);
        true
    }
}
