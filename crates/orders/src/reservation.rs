use std::sync::Arc;

use tileflow_core::{DomainError, DomainResult, ModelId, OrderId};
use tileflow_catalog::ConversionCatalog;
use tileflow_ledger::{ReserveOutcome, StockLedger};

use crate::order::{LineDraft, LineFulfillment, Order, OrderDraft, OrderLine, OrderUpdate};
use crate::store::OrderStore;

/// Translates order mutations into ledger operations.
///
/// On creation each line independently attempts a reservation. Edits and
/// deletions only correct the shortfall counter; reserved capacity is never
/// released back by either (that asymmetry is the documented contract of the
/// ledger, not an accident of this implementation).
pub struct ReservationManager<C, S> {
    ledger: Arc<StockLedger>,
    catalog: Arc<C>,
    store: Arc<S>,
}

impl<C, S> ReservationManager<C, S>
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

    fn validate_lines(lines: &[LineDraft]) -> DomainResult<()> {
        if lines.is_empty() {
            return Err(DomainError::malformed("order requires at least one line"));
        }
        for line in lines {
            if !line.quantity.is_finite() || line.quantity <= 0.0 {
                return Err(DomainError::validation(
                    "line quantity must be a positive number",
                ));
            }
        }
        Ok(())
    }

    /// Abort before any ledger mutation if a referenced stock item is
    /// unknown, so a failed operation leaves no partial state behind.
    fn ensure_items_exist(&self, lines: &[LineDraft]) -> DomainResult<()> {
        for line in lines {
            self.ledger.get_item(line.item_id)?;
        }
        Ok(())
    }

    fn model_ids(lines: &[LineDraft]) -> Vec<ModelId> {
        lines.iter().map(|l| l.model_id).collect()
    }

    /// Create an order, attempting a reservation per line.
    ///
    /// Each line records its own fulfillment status: `available` when the
    /// reservation succeeded, `pending` when it was backordered or when the
    /// line's model has no usable conversion factor (that line is skipped
    /// with a warning and touches no counters).
    pub fn place_order(&self, draft: OrderDraft) -> DomainResult<Order> {
        if draft.customer.name.trim().is_empty() {
            return Err(DomainError::malformed("customer name is required"));
        }
        Self::validate_lines(&draft.lines)?;
        self.ensure_items_exist(&draft.lines)?;

        let factors = self.catalog.factors_for(&Self::model_ids(&draft.lines));

        let mut lines = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let fulfillment = match factors.get(&line.model_id) {
                Some(&factor) => {
                    let needed = line.quantity * factor;
                    match self.ledger.reserve(line.item_id, needed)? {
                        ReserveOutcome::Reserved => LineFulfillment::Available,
                        ReserveOutcome::Backordered { .. } => LineFulfillment::Pending,
                    }
                }
                None => {
                    tracing::warn!(
                        model = %line.model_id,
                        item = %line.item_id,
                        "no usable conversion factor; line left pending"
                    );
                    LineFulfillment::Pending
                }
            };
            lines.push(OrderLine {
                item_id: line.item_id,
                model_id: line.model_id,
                quantity: line.quantity,
                materials: line.materials,
                fulfillment,
            });
        }

        let order = Order::place(draft, lines);
        tracing::info!(order = %order.id(), sequence = order.sequence(), "order placed");
        self.store.insert(order.clone())?;
        Ok(order)
    }

    /// Edit an order.
    ///
    /// Lines are matched positionally against the stored version (line order
    /// is assumed stable across the update). Each position contributes a
    /// signed shortfall delta computed with the incoming line's conversion
    /// factor; surplus new lines count in full, surplus removed lines count
    /// negatively. No reservation is re-attempted.
    pub fn edit_order(&self, order_id: OrderId, update: OrderUpdate) -> DomainResult<Order> {
        let mut order = self.store.get(order_id)?;
        if update.customer.name.trim().is_empty() {
            return Err(DomainError::malformed("customer name is required"));
        }
        Self::validate_lines(&update.lines)?;
        self.ensure_items_exist(&update.lines)?;

        let mut model_ids = Self::model_ids(&update.lines);
        model_ids.extend(order.lines().iter().map(|l| l.model_id));
        let factors = self.catalog.factors_for(&model_ids);

        let old_lines = order.lines().to_vec();
        let positions = old_lines.len().max(update.lines.len());
        for i in 0..positions {
            match (old_lines.get(i), update.lines.get(i)) {
                (Some(old), Some(new)) => {
                    let Some(&factor) = factors.get(&new.model_id) else {
                        tracing::warn!(model = %new.model_id, "no usable conversion factor; edit delta skipped");
                        continue;
                    };
                    let delta = (new.quantity - old.quantity) * factor;
                    if delta != 0.0 {
                        self.ledger.adjust_pending(new.item_id, delta)?;
                    }
                }
                (None, Some(new)) => {
                    let Some(&factor) = factors.get(&new.model_id) else {
                        tracing::warn!(model = %new.model_id, "no usable conversion factor; edit delta skipped");
                        continue;
                    };
                    self.ledger
                        .adjust_pending(new.item_id, new.quantity * factor)?;
                }
                (Some(old), None) => {
                    let Some(&factor) = factors.get(&old.model_id) else {
                        continue;
                    };
                    match self
                        .ledger
                        .adjust_pending(old.item_id, -(old.quantity * factor))
                    {
                        Ok(_) => {}
                        Err(DomainError::NotFound { .. }) => {
                            tracing::warn!(item = %old.item_id, "removed line references unknown stock item");
                        }
                        Err(e) => return Err(e),
                    }
                }
                (None, None) => unreachable!(),
            }
        }

        // Matched positions keep their previous fulfillment; appended lines
        // start pending and wait for a resolver pass.
        let lines = update
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| OrderLine {
                item_id: line.item_id,
                model_id: line.model_id,
                quantity: line.quantity,
                materials: line.materials,
                fulfillment: old_lines
                    .get(i)
                    .map(|old| old.fulfillment)
                    .unwrap_or(LineFulfillment::Pending),
            })
            .collect();

        order.apply_edit(update, lines);
        tracing::info!(order = %order.id(), "order edited");
        self.store.update(order.clone())?;
        Ok(order)
    }

    /// Delete an order, releasing its still-pending shortfall.
    ///
    /// Reserved capacity already allocated to the order stays allocated;
    /// only the `pending` counter moves.
    pub fn delete_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let order = self.store.get(order_id)?;

        let factors = self
            .catalog
            .factors_for(&order.lines().iter().map(|l| l.model_id).collect::<Vec<_>>());

        for line in order.lines() {
            if line.quantity <= 0.0 {
                continue;
            }
            let Some(&factor) = factors.get(&line.model_id) else {
                tracing::warn!(model = %line.model_id, "no usable conversion factor; release skipped");
                continue;
            };
            match self
                .ledger
                .adjust_pending(line.item_id, -(line.quantity * factor))
            {
                Ok(_) => {}
                Err(DomainError::NotFound { .. }) => {
                    tracing::warn!(item = %line.item_id, "deleted line references unknown stock item");
                }
                Err(e) => return Err(e),
            }
        }

        let removed = self.store.remove(order_id)?;
        tracing::info!(order = %order_id, "order deleted");
        Ok(removed)
    }

    /// Attach a delivery-receipt reference; the order becomes `remitado`.
    pub fn attach_receipt(&self, order_id: OrderId, reference: &str) -> DomainResult<Order> {
        if reference.trim().is_empty() {
            return Err(DomainError::malformed("receipt reference is required"));
        }
        let mut order = self.store.get(order_id)?;
        order.attach_receipt(reference)?;
        self.store.update(order.clone())?;
        Ok(order)
    }
}
