use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tileflow_core::{Entity, ProductionRecordId, StockItemId};

/// Append-only production-log entry.
///
/// Never mutated after insertion; the only bulk deletion happens during a
/// full ledger rebuild, which replaces the log with one synthetic summary
/// record per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: ProductionRecordId,
    pub item_id: StockItemId,
    pub recorded_at: DateTime<Utc>,
    pub quantity: f64,
    pub responsible: String,
}

impl ProductionRecord {
    pub fn new(item_id: StockItemId, quantity: f64, responsible: impl Into<String>) -> Self {
        Self {
            id: ProductionRecordId::new(),
            item_id,
            recorded_at: Utc::now(),
            quantity,
            responsible: responsible.into(),
        }
    }
}

impl Entity for ProductionRecord {
    type Id = ProductionRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
