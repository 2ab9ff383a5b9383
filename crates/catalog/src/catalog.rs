use std::collections::HashMap;
use std::sync::RwLock;

use tileflow_core::{DomainError, DomainResult, ModelId};

use crate::model::Model;

/// Read-only lookup from a model identifier to its conversion factor.
///
/// Leaf dependency of the reservation, settlement, and rebuild paths. All
/// lookups are read-only and order-independent, so callers that process many
/// lines should prefer [`ConversionCatalog::factors_for`] and resolve the
/// whole batch in one pass.
pub trait ConversionCatalog: Send + Sync {
    /// Resolve one model's conversion factor.
    ///
    /// `NotFound` when the model is unknown, `InvalidConversionFactor` when
    /// the stored factor is unusable.
    fn factor_for(&self, model_id: ModelId) -> DomainResult<f64>;

    /// Bulk-resolve factors for a set of models.
    ///
    /// Models that are unknown or carry an unusable factor are simply absent
    /// from the result; per-line callers decide how to handle the gap.
    fn factors_for(&self, model_ids: &[ModelId]) -> HashMap<ModelId, f64> {
        let mut factors = HashMap::with_capacity(model_ids.len());
        for &model_id in model_ids {
            if let Ok(factor) = self.factor_for(model_id) {
                factors.insert(model_id, factor);
            }
        }
        factors
    }
}

/// In-memory conversion catalog.
///
/// Intended for tests/dev and as the reference implementation of the
/// persistence boundary. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    models: RwLock<HashMap<ModelId, Model>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, model: Model) -> DomainResult<()> {
        let mut models = self
            .models
            .write()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))?;
        models.insert(model.id, model);
        Ok(())
    }

    /// Replace the whole catalog in one pass (bulk import).
    pub fn load_all(&self, entries: impl IntoIterator<Item = Model>) -> DomainResult<usize> {
        let mut models = self
            .models
            .write()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))?;
        models.clear();
        let mut count = 0;
        for model in entries {
            models.insert(model.id, model);
            count += 1;
        }
        tracing::info!(count, "conversion catalog loaded");
        Ok(count)
    }

    pub fn get(&self, model_id: ModelId) -> DomainResult<Model> {
        let models = self
            .models
            .read()
            .map_err(|_| DomainError::conflict("catalog lock poisoned"))?;
        models
            .get(&model_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("model", model_id))
    }

    pub fn list(&self) -> Vec<Model> {
        self.models
            .read()
            .map(|models| models.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl ConversionCatalog for InMemoryCatalog {
    fn factor_for(&self, model_id: ModelId) -> DomainResult<f64> {
        self.get(model_id)?.conversion_factor()
    }
}
