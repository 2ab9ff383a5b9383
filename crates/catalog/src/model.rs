use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tileflow_core::{DomainError, DomainResult, Entity, ModelId};

/// Catalog entry: one product model and its area conversion factor.
///
/// `plates_per_meter` translates one unit of ordered area (m²) into the
/// number of native stock units (plates/panels) that cover it. Treated as
/// immutable once production has started against the model; the ledger only
/// ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub plates_per_meter: f64,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn new(id: ModelId, name: impl Into<String>, plates_per_meter: f64) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            category: None,
            plates_per_meter,
            created_at: Utc::now(),
        }
    }

    /// The validated conversion factor.
    ///
    /// A factor that is zero, negative, or non-finite cannot convert ordered
    /// area into units and blocks reservation/settlement for any line that
    /// references this model.
    pub fn conversion_factor(&self) -> DomainResult<f64> {
        if self.plates_per_meter.is_finite() && self.plates_per_meter > 0.0 {
            Ok(self.plates_per_meter)
        } else {
            Err(DomainError::invalid_conversion_factor(self.id))
        }
    }
}

impl Entity for Model {
    type Id = ModelId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
