use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tileflow_catalog::ConversionCatalog;
use tileflow_core::{DomainResult, OrderId, StockItemId};
use tileflow_ledger::{StockCounters, StockLedger};

use crate::order::Order;
use crate::store::OrderStore;

/// What a resolution pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Orders whose lines were promoted to `available`, in queue order.
    pub promoted: Vec<OrderId>,
    /// The first order the remaining capacity could not cover. Everything
    /// behind it in the queue was left untouched.
    pub halted_at: Option<OrderId>,
}

/// Retroactively promotes backordered lines when production increases.
///
/// The queue is strict FIFO by order sequence number, and a pass stops at
/// the first order it cannot fully satisfy. Later orders are not considered
/// even if their smaller need would fit: arrival-order fairness wins over
/// utilization until the blocking order clears.
pub struct BackorderResolver<C, S> {
    ledger: Arc<StockLedger>,
    catalog: Arc<C>,
    store: Arc<S>,
}

impl<C, S> BackorderResolver<C, S>
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

    /// Units still owed to one order for `item_id`.
    ///
    /// Lines whose model has no usable conversion factor are excluded (and
    /// stay pending); they cannot be translated into units.
    fn needed_units(
        order: &Order,
        item_id: StockItemId,
        factors: &std::collections::HashMap<tileflow_core::ModelId, f64>,
    ) -> f64 {
        order
            .lines()
            .iter()
            .filter(|line| line.is_unresolved_for(item_id))
            .filter_map(|line| match factors.get(&line.model_id) {
                Some(&factor) => Some(line.quantity * factor),
                None => {
                    tracing::warn!(
                        model = %line.model_id,
                        order = %order.id(),
                        "no usable conversion factor; line excluded from resolution"
                    );
                    None
                }
            })
            .sum()
    }

    /// One resolution pass for `item_id`.
    ///
    /// The capacity check and every reservation commit run inside a single
    /// `with_counters` closure, i.e. under the item's lock for the whole
    /// scan; two interleaved passes for the same item would break the FIFO
    /// guarantee.
    pub fn resolve(&self, item_id: StockItemId) -> DomainResult<ResolutionReport> {
        let queue = self.store.unresolved_for_item(item_id);
        if queue.is_empty() {
            tracing::debug!(item = %item_id, "no backordered orders to resolve");
            return Ok(ResolutionReport::default());
        }

        let model_ids: Vec<_> = queue
            .iter()
            .flat_map(|o| o.lines().iter())
            .filter(|l| l.is_unresolved_for(item_id))
            .map(|l| l.model_id)
            .collect();
        let factors = self.catalog.factors_for(&model_ids);

        let needs: Vec<f64> = queue
            .iter()
            .map(|order| Self::needed_units(order, item_id, &factors))
            .collect();

        let (promoted_idx, halted_idx) = self.ledger.with_counters(item_id, |counters| {
            let mut promoted = Vec::new();
            let mut halted = None;
            for (i, &needed) in needs.iter().enumerate() {
                if needed <= 0.0 {
                    // Nothing translatable to promote for this order; it does
                    // not block the queue.
                    continue;
                }
                if counters.commit_backorder(needed) {
                    promoted.push(i);
                } else {
                    halted = Some(i);
                    break;
                }
            }
            (promoted, halted)
        })?;

        let mut report = ResolutionReport::default();
        for i in promoted_idx {
            let mut order = queue[i].clone();
            let flipped = order.promote_lines(item_id);
            tracing::info!(
                order = %order.id(),
                sequence = order.sequence(),
                flipped,
                "backordered lines promoted to available"
            );
            self.store.update(order.clone())?;
            report.promoted.push(order.id());
        }
        if let Some(i) = halted_idx {
            let blocking = &queue[i];
            tracing::info!(
                order = %blocking.id(),
                sequence = blocking.sequence(),
                needed = needs[i],
                "resolution halted; capacity cannot cover the next order in queue"
            );
            report.halted_at = Some(blocking.id());
        }
        Ok(report)
    }

    /// The production-increase entry point: validate and log the increase,
    /// apply it to the ledger, then run a resolution pass for the item.
    pub fn record_production(
        &self,
        item_id: StockItemId,
        qty: f64,
        responsible: &str,
    ) -> DomainResult<(StockCounters, ResolutionReport)> {
        let counters = self.ledger.record_production(item_id, qty, responsible)?;
        let report = self.resolve(item_id)?;
        Ok((counters, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{
        Customer, LineDraft, LineFulfillment, MaterialTier, OrderDraft, PaymentMethod,
    };
    use crate::reservation::ReservationManager;
    use crate::store::InMemoryOrderStore;
    use chrono::Utc;
    use proptest::prelude::*;
    use tileflow_catalog::{InMemoryCatalog, Model};
    use tileflow_core::ModelId;
    use tileflow_ledger::StockItem;

    struct Fixture {
        manager: ReservationManager<InMemoryCatalog, InMemoryOrderStore>,
        resolver: BackorderResolver<InMemoryCatalog, InMemoryOrderStore>,
        ledger: Arc<StockLedger>,
        store: Arc<InMemoryOrderStore>,
        item_id: StockItemId,
        model_id: ModelId,
    }

    /// One stock item with `manufactured` units on hand, model factor 2.
    fn fixture(manufactured: f64) -> Fixture {
        let ledger = Arc::new(StockLedger::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let store = Arc::new(InMemoryOrderStore::new());

        let model = Model::new(ModelId::new(), "calcareo 20x20", 2.0);
        let model_id = model.id;
        catalog.insert(model).unwrap();

        let item_id = StockItemId::new();
        ledger
            .create_item(StockItem::new(item_id, "calcareo gris", model_id, "placas"))
            .unwrap();
        if manufactured > 0.0 {
            ledger.produce(item_id, manufactured).unwrap();
        }

        Fixture {
            manager: ReservationManager::new(
                Arc::clone(&ledger),
                Arc::clone(&catalog),
                Arc::clone(&store),
            ),
            resolver: BackorderResolver::new(
                Arc::clone(&ledger),
                Arc::clone(&catalog),
                Arc::clone(&store),
            ),
            ledger,
            store,
            item_id,
            model_id,
        }
    }

    fn place(f: &Fixture, sequence: u64, quantity: f64) -> Order {
        f.manager
            .place_order(OrderDraft {
                sequence,
                customer: Customer {
                    name: "Mariela Suarez".to_string(),
                    address: String::new(),
                    contact: String::new(),
                },
                lines: vec![LineDraft {
                    item_id: f.item_id,
                    model_id: f.model_id,
                    quantity,
                    materials: MaterialTier::Plain,
                }],
                payment_method: PaymentMethod::Cash,
                freight: 0.0,
                discount_pct: 0.0,
                advance: 0.0,
                installation_value: 0.0,
                pending_balance: 0.0,
                placed_at: Utc::now(),
            })
            .unwrap()
    }

    #[test]
    fn production_promotes_a_backordered_order() {
        let f = fixture(100.0);
        place(&f, 1, 40.0); // reserves 80
        let backordered = place(&f, 2, 20.0); // needs 40, pending

        let (counters, report) = f
            .resolver
            .record_production(f.item_id, 50.0, "turno mañana")
            .unwrap();

        assert_eq!(counters.manufactured, 150.0);
        assert_eq!(report.promoted, vec![backordered.id()]);
        assert_eq!(report.halted_at, None);

        let counters = f.ledger.get_item(f.item_id).unwrap().counters;
        assert_eq!(counters.reserved, 120.0);
        assert_eq!(counters.available, 30.0);
        assert_eq!(counters.pending, 0.0);

        let stored = f.store.get(backordered.id()).unwrap();
        assert_eq!(stored.lines()[0].fulfillment, LineFulfillment::Available);
    }

    #[test]
    fn resolution_is_strict_fifo_and_blocks_on_the_first_unsatisfiable_order() {
        // Zero capacity; three orders in sequence. O1 needs 60, O2 needs 100,
        // O3 needs only 10: small enough to fit, but behind O2.
        let f = fixture(0.0);
        let o1 = place(&f, 1, 30.0);
        let o2 = place(&f, 2, 50.0);
        let o3 = place(&f, 3, 5.0);

        // Enough for O1 alone (and for O3, which must not matter).
        let (_, report) = f
            .resolver
            .record_production(f.item_id, 70.0, "turno mañana")
            .unwrap();

        assert_eq!(report.promoted, vec![o1.id()]);
        assert_eq!(report.halted_at, Some(o2.id()));

        let stored = |id| f.store.get(id).unwrap().lines()[0].fulfillment;
        assert_eq!(stored(o1.id()), LineFulfillment::Available);
        assert_eq!(stored(o2.id()), LineFulfillment::Pending);
        assert_eq!(stored(o3.id()), LineFulfillment::Pending);

        let counters = f.ledger.get_item(f.item_id).unwrap().counters;
        assert_eq!(counters.reserved, 60.0);
        assert_eq!(counters.available, 10.0);
    }

    #[test]
    fn a_pass_promotes_as_many_queued_orders_as_capacity_covers() {
        let f = fixture(0.0);
        let o1 = place(&f, 1, 10.0); // 20 units
        let o2 = place(&f, 2, 15.0); // 30 units
        let o3 = place(&f, 3, 50.0); // 100 units

        let (_, report) = f
            .resolver
            .record_production(f.item_id, 60.0, "turno tarde")
            .unwrap();

        assert_eq!(report.promoted, vec![o1.id(), o2.id()]);
        assert_eq!(report.halted_at, Some(o3.id()));

        let counters = f.ledger.get_item(f.item_id).unwrap().counters;
        assert_eq!(counters.reserved, 50.0);
        assert_eq!(counters.available, 10.0);
        // 150 booked pending minus the 50 promoted.
        assert_eq!(counters.pending, 100.0);
    }

    #[test]
    fn orders_without_translatable_lines_do_not_block_the_queue() {
        let f = fixture(0.0);
        // First in line, but its model is unknown to the catalog.
        let mut broken = OrderDraft {
            sequence: 1,
            customer: Customer {
                name: "Mariela Suarez".to_string(),
                address: String::new(),
                contact: String::new(),
            },
            lines: vec![LineDraft {
                item_id: f.item_id,
                model_id: ModelId::new(),
                quantity: 10.0,
                materials: MaterialTier::Plain,
            }],
            payment_method: PaymentMethod::Cash,
            freight: 0.0,
            discount_pct: 0.0,
            advance: 0.0,
            installation_value: 0.0,
            pending_balance: 0.0,
            placed_at: Utc::now(),
        };
        broken.lines[0].model_id = ModelId::new();
        let broken = f.manager.place_order(broken).unwrap();
        let behind = place(&f, 2, 10.0); // 20 units

        let (_, report) = f
            .resolver
            .record_production(f.item_id, 20.0, "turno mañana")
            .unwrap();

        assert_eq!(report.promoted, vec![behind.id()]);
        let stored = f.store.get(broken.id()).unwrap();
        assert_eq!(stored.lines()[0].fulfillment, LineFulfillment::Pending);
    }

    #[test]
    fn resolve_with_an_empty_queue_is_a_no_op() {
        let f = fixture(100.0);
        place(&f, 1, 10.0); // fully reserved, nothing unresolved
        let report = f.resolver.resolve(f.item_id).unwrap();
        assert_eq!(report, ResolutionReport::default());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a pass promotes exactly the longest queue prefix whose
        /// cumulative need fits into the produced capacity, never a later
        /// order over an earlier one. Integral quantities keep the unit
        /// arithmetic exact.
        #[test]
        fn promotion_is_always_a_queue_prefix(
            quantities in prop::collection::vec(1u32..50, 1..8),
            produced in 1u32..300,
        ) {
            let f = fixture(0.0);
            let ids: Vec<_> = quantities
                .iter()
                .enumerate()
                .map(|(i, &q)| place(&f, (i as u64) + 1, f64::from(q)).id())
                .collect();

            let (_, report) = f
                .resolver
                .record_production(f.item_id, f64::from(produced), "turno mañana")
                .unwrap();

            let mut remaining = f64::from(produced);
            let mut expected = Vec::new();
            for (i, &q) in quantities.iter().enumerate() {
                let needed = f64::from(q) * 2.0;
                if remaining >= needed {
                    remaining -= needed;
                    expected.push(ids[i]);
                } else {
                    break;
                }
            }
            prop_assert_eq!(report.promoted, expected);
        }
    }
}
