use std::sync::Arc;

use tileflow_core::{DomainResult, OrderId};
use tileflow_ledger::{PriceCard, StockLedger};
use tileflow_orders::{MaterialTier, Order, OrderStore, PaymentMethod};

/// Surcharge applied when the order is paid by credit card.
pub const CREDIT_SURCHARGE_PCT: f64 = 15.0;

/// Recomputes an order's monetary total from its lines and the current
/// stock pricing fields.
///
/// Pure arithmetic over the order and each item's price card; no ledger
/// counters are read or written.
pub struct PricingRecalculator<S> {
    ledger: Arc<StockLedger>,
    store: Arc<S>,
}

fn tier_price(prices: &PriceCard, tier: MaterialTier) -> f64 {
    match tier {
        MaterialTier::Plain => prices.per_m2,
        MaterialTier::Materials => prices.per_m2_materials,
        MaterialTier::Adhesive => prices.per_m2_adhesive,
        MaterialTier::GroutSeal => prices.per_m2_grout_seal,
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl<S> PricingRecalculator<S>
where
    S: OrderStore,
{
    pub fn new(ledger: Arc<StockLedger>, store: Arc<S>) -> Self {
        Self { ledger, store }
    }

    /// The per-m² price one line sells at, before quantity.
    fn unit_price(&self, order: &Order, prices: &PriceCard, tier: MaterialTier) -> f64 {
        let mut unit = tier_price(prices, tier) + prices.rounding_adjustment;
        unit *= 1.0 + prices.margin_pct / 100.0;
        if order.payment_method() == PaymentMethod::Credit {
            unit *= 1.0 + CREDIT_SURCHARGE_PCT / 100.0;
        }
        unit
    }

    /// Total for one order under current prices. Lines whose stock item is
    /// gone are skipped with a warning, matching the tolerance of the
    /// settlement path.
    pub fn compute_total(&self, order: &Order) -> f64 {
        let mut subtotal = 0.0;
        for line in order.lines() {
            let item = match self.ledger.get_item(line.item_id) {
                Ok(item) => item,
                Err(_) => {
                    tracing::warn!(
                        item = %line.item_id,
                        order = %order.id(),
                        "line references unknown stock item; excluded from total"
                    );
                    continue;
                }
            };
            subtotal += line.quantity * self.unit_price(order, &item.prices, line.materials);
        }

        let with_freight = subtotal + order.freight();
        let discounted = with_freight * (1.0 - order.discount_pct() / 100.0);
        let net = discounted - order.advance();
        round_to_cents(net.max(0.0))
    }

    /// Recompute and persist one order's total.
    pub fn recalculate(&self, order_id: OrderId) -> DomainResult<f64> {
        let mut order = self.store.get(order_id)?;
        let total = self.compute_total(&order);
        order.set_total(total);
        self.store.update(order.clone())?;
        tracing::info!(order = %order_id, total, "order total recalculated");
        Ok(total)
    }

    /// Recompute every stored order. Returns how many were updated.
    pub fn recalculate_all(&self) -> DomainResult<usize> {
        let mut updated = 0;
        for order in self.store.list() {
            self.recalculate(order.id())?;
            updated += 1;
        }
        Ok(updated)
    }
}
