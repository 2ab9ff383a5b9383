use serde::{Deserialize, Serialize};

use tileflow_core::{Entity, ModelId, StockItemId, ValueObject};

use crate::counters::StockCounters;

/// Per-area price variants and the adjustments applied on top of them.
///
/// Consumed by the pricing recalculator only; the ledger never reads these.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceCard {
    /// Plain per-m² price (the default when a line carries no tier tag).
    pub per_m2: f64,
    /// Per-m² price when sold with materials.
    pub per_m2_materials: f64,
    /// Per-m² price when sold with adhesive.
    pub per_m2_adhesive: f64,
    /// Per-m² price when sold with grout seal.
    pub per_m2_grout_seal: f64,
    /// Percentage markup applied after the rounding adjustment.
    pub margin_pct: f64,
    /// Flat per-item adjustment added to the selected base price.
    pub rounding_adjustment: f64,
}

impl ValueObject for PriceCard {}

/// Descriptive fields an administrator may edit without touching counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProfile {
    pub product: String,
    pub unit: String,
    pub active: bool,
    pub prices: PriceCard,
}

/// Seed for bulk item creation from historical totals.
///
/// Availability is derived as `manufactured - delivered`; nothing is
/// reserved or pending at import time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSeed {
    pub id: StockItemId,
    pub product: String,
    pub model_id: ModelId,
    pub unit: String,
    pub prices: PriceCard,
    pub manufactured: f64,
    pub delivered: f64,
}

/// One inventory-tracked SKU.
///
/// The ledger exclusively owns the counters; everything else is descriptive
/// state an administrator maintains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: StockItemId,
    pub product: String,
    pub model_id: ModelId,
    /// Native unit label, e.g. "placas".
    pub unit: String,
    /// Soft-disable flag; inactive items stay queryable but are hidden from
    /// new-order pickers upstream.
    pub active: bool,
    pub prices: PriceCard,
    pub counters: StockCounters,
}

impl StockItem {
    pub fn new(
        id: StockItemId,
        product: impl Into<String>,
        model_id: ModelId,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id,
            product: product.into(),
            model_id,
            unit: unit.into(),
            active: true,
            prices: PriceCard::default(),
            counters: StockCounters::zeroed(),
        }
    }

    pub fn from_seed(seed: StockSeed) -> Self {
        Self {
            id: seed.id,
            product: seed.product,
            model_id: seed.model_id,
            unit: seed.unit,
            active: true,
            prices: seed.prices,
            counters: StockCounters::seeded(seed.manufactured, seed.delivered),
        }
    }

    pub fn with_prices(mut self, prices: PriceCard) -> Self {
        self.prices = prices;
        self
    }

    pub fn apply_profile(&mut self, profile: ItemProfile) {
        self.product = profile.product;
        self.unit = profile.unit;
        self.active = profile.active;
        self.prices = profile.prices;
    }

    /// Square meters currently on the shelf, given the item's conversion
    /// factor. An unusable factor falls back to 1 so listings never divide
    /// by zero.
    pub fn area_equivalent(&self, factor: f64) -> f64 {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
        self.counters.available / factor
    }
}

impl Entity for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
