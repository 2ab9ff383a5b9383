use std::sync::Arc;

use tileflow_catalog::ConversionCatalog;
use tileflow_core::{DomainError, DomainResult, OrderId};
use tileflow_ledger::StockLedger;

use crate::order::{LineFulfillment, Order, OrderStatus};
use crate::store::OrderStore;

/// Converts an order's reserved quantity into delivered quantity.
pub struct DeliverySettlement<C, S> {
    ledger: Arc<StockLedger>,
    catalog: Arc<C>,
    store: Arc<S>,
}

impl<C, S> DeliverySettlement<C, S>
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

    /// Move an order to `entregado` and settle every line.
    ///
    /// The status guard runs first: an order outside the holding states is
    /// rejected with `InvalidTransition` and no counter moves. Lines whose
    /// model cannot be resolved are logged and skipped; partial settlement
    /// is tolerated, not fatal.
    pub fn deliver_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let mut order = self.store.get(order_id)?;
        order.transition_to(OrderStatus::Entregado)?;

        let factors = self
            .catalog
            .factors_for(&order.lines().iter().map(|l| l.model_id).collect::<Vec<_>>());

        for line in order.lines_mut() {
            if line.fulfillment == LineFulfillment::Delivered {
                continue;
            }
            let Some(&factor) = factors.get(&line.model_id) else {
                tracing::warn!(
                    model = %line.model_id,
                    order = %order_id,
                    "no usable conversion factor; line left unsettled"
                );
                continue;
            };
            let needed = line.quantity * factor;
            match self.ledger.deliver(line.item_id, needed) {
                Ok(_) => {
                    line.fulfillment = LineFulfillment::Delivered;
                }
                Err(DomainError::NotFound { .. }) => {
                    tracing::warn!(
                        item = %line.item_id,
                        order = %order_id,
                        "line references unknown stock item; left unsettled"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(order = %order_id, sequence = order.sequence(), "order delivered");
        self.store.update(order.clone())?;
        Ok(order)
    }
}
