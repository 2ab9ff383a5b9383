//! Integration tests for the full inventory pipeline.
//!
//! Wires catalog + ledger + orders + pricing together the way the request
//! layer would: place orders, record production, resolve backorders,
//! deliver, rebuild.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use tileflow_catalog::{ConversionCatalog, InMemoryCatalog, Model};
    use tileflow_core::{ModelId, StockItemId};
    use tileflow_ledger::{PriceCard, StockItem, StockLedger};
    use tileflow_orders::{
        BackorderResolver, Customer, DeliverySettlement, InMemoryOrderStore, LineDraft,
        LineFulfillment, MaterialTier, OrderDraft, OrderStatus, OrderStore, PaymentMethod,
        ReservationManager,
    };
    use tileflow_pricing::PricingRecalculator;

    use crate::rebuild::{LedgerRebuilder, REBUILD_RESPONSIBLE};

    struct App {
        ledger: Arc<StockLedger>,
        catalog: Arc<InMemoryCatalog>,
        store: Arc<InMemoryOrderStore>,
        manager: ReservationManager<InMemoryCatalog, InMemoryOrderStore>,
        resolver: BackorderResolver<InMemoryCatalog, InMemoryOrderStore>,
        settlement: DeliverySettlement<InMemoryCatalog, InMemoryOrderStore>,
        rebuilder: LedgerRebuilder<InMemoryCatalog, InMemoryOrderStore>,
        pricing: PricingRecalculator<InMemoryOrderStore>,
    }

    fn app() -> App {
        tileflow_observability::init();
        let ledger = Arc::new(StockLedger::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let store = Arc::new(InMemoryOrderStore::new());
        App {
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
            settlement: DeliverySettlement::new(
                Arc::clone(&ledger),
                Arc::clone(&catalog),
                Arc::clone(&store),
            ),
            rebuilder: LedgerRebuilder::new(
                Arc::clone(&ledger),
                Arc::clone(&catalog),
                Arc::clone(&store),
            ),
            pricing: PricingRecalculator::new(Arc::clone(&ledger), Arc::clone(&store)),
            ledger,
            catalog,
            store,
        }
    }

    fn add_item(app: &App, factor: f64, manufactured: f64) -> (StockItemId, ModelId) {
        let model = Model::new(ModelId::new(), "calcareo 20x20", factor);
        let model_id = model.id;
        app.catalog.insert(model).unwrap();

        let item_id = StockItemId::new();
        app.ledger
            .create_item(
                StockItem::new(item_id, "calcareo gris", model_id, "placas").with_prices(
                    PriceCard {
                        per_m2: 1000.0,
                        per_m2_materials: 1400.0,
                        per_m2_adhesive: 1200.0,
                        per_m2_grout_seal: 1100.0,
                        margin_pct: 10.0,
                        rounding_adjustment: 0.0,
                    },
                ),
            )
            .unwrap();
        if manufactured > 0.0 {
            app.ledger.produce(item_id, manufactured).unwrap();
        }
        (item_id, model_id)
    }

    fn draft(sequence: u64, lines: Vec<LineDraft>) -> OrderDraft {
        OrderDraft {
            sequence,
            customer: Customer {
                name: "Mariela Suarez".to_string(),
                address: "Av. Mitre 1420".to_string(),
                contact: "11-5555-0101".to_string(),
            },
            lines,
            payment_method: PaymentMethod::Cash,
            freight: 0.0,
            discount_pct: 0.0,
            advance: 0.0,
            installation_value: 0.0,
            pending_balance: 0.0,
            placed_at: Utc::now(),
        }
    }

    fn line(item_id: StockItemId, model_id: ModelId, quantity: f64) -> LineDraft {
        LineDraft {
            item_id,
            model_id,
            quantity,
            materials: MaterialTier::Plain,
        }
    }

    #[test]
    fn place_produce_resolve_deliver_end_to_end() {
        let app = app();
        let (item_id, model_id) = add_item(&app, 2.0, 100.0);

        // 40 m² × 2 = 80 units: reserves against 100 available.
        let first = app
            .manager
            .place_order(draft(1, vec![line(item_id, model_id, 40.0)]))
            .unwrap();
        // 20 m² × 2 = 40 units: exceeds the remaining 20, backorders.
        let second = app
            .manager
            .place_order(draft(2, vec![line(item_id, model_id, 20.0)]))
            .unwrap();

        let counters = app.ledger.get_item(item_id).unwrap().counters;
        assert_eq!(counters.reserved, 80.0);
        assert_eq!(counters.available, 0.0);
        assert_eq!(counters.pending, 40.0);

        // Production arrives; the resolver promotes the backordered order.
        let (_, report) = app
            .resolver
            .record_production(item_id, 50.0, "turno mañana")
            .unwrap();
        assert_eq!(report.promoted, vec![second.id()]);

        let counters = app.ledger.get_item(item_id).unwrap().counters;
        assert_eq!(counters.manufactured, 150.0);
        assert_eq!(counters.reserved, 120.0);
        assert_eq!(counters.available, 30.0);
        assert_eq!(counters.pending, 0.0);

        // Deliver both orders through the holding states.
        for order in [&first, &second] {
            let mut stored = app.store.get(order.id()).unwrap();
            stored.transition_to(OrderStatus::Retira).unwrap();
            app.store.update(stored).unwrap();
            app.settlement.deliver_order(order.id()).unwrap();
        }

        let counters = app.ledger.get_item(item_id).unwrap().counters;
        assert_eq!(counters.delivered, 120.0);
        assert_eq!(counters.reserved, 0.0);
        assert_eq!(counters.available, 30.0);
        assert!(
            app.store
                .get(first.id())
                .unwrap()
                .lines()
                .iter()
                .all(|l| l.fulfillment == LineFulfillment::Delivered)
        );
    }

    #[test]
    fn items_resolve_independently_within_one_order() {
        let app = app();
        let (item_a, model_a) = add_item(&app, 2.0, 100.0);
        let (item_b, model_b) = add_item(&app, 4.0, 0.0);

        let order = app
            .manager
            .place_order(draft(
                1,
                vec![line(item_a, model_a, 10.0), line(item_b, model_b, 5.0)],
            ))
            .unwrap();

        assert_eq!(order.lines()[0].fulfillment, LineFulfillment::Available);
        assert_eq!(order.lines()[1].fulfillment, LineFulfillment::Pending);

        // Producing item B promotes only the B line.
        app.resolver
            .record_production(item_b, 20.0, "turno tarde")
            .unwrap();
        let stored = app.store.get(order.id()).unwrap();
        assert_eq!(stored.lines()[1].fulfillment, LineFulfillment::Available);

        let counters_a = app.ledger.get_item(item_a).unwrap().counters;
        let counters_b = app.ledger.get_item(item_b).unwrap().counters;
        assert_eq!(counters_a.reserved, 20.0);
        assert_eq!(counters_b.reserved, 20.0);
        assert_eq!(counters_b.pending, 0.0);
    }

    #[test]
    fn receipt_attachment_blocks_delivery_until_redesignated() {
        let app = app();
        let (item_id, model_id) = add_item(&app, 2.0, 100.0);
        let order = app
            .manager
            .place_order(draft(1, vec![line(item_id, model_id, 10.0)]))
            .unwrap();

        app.manager
            .attach_receipt(order.id(), "remitos/0001-00000042.pdf")
            .unwrap();
        // `remitado` is not a holding state; delivery is rejected.
        assert!(app.settlement.deliver_order(order.id()).is_err());

        // Once the order is redesignated for pickup, delivery proceeds.
        let mut stored = app.store.get(order.id()).unwrap();
        stored.transition_to(OrderStatus::Retira).unwrap();
        app.store.update(stored).unwrap();
        let delivered = app.settlement.deliver_order(order.id()).unwrap();
        assert_eq!(delivered.status(), OrderStatus::Entregado);
    }

    #[test]
    fn rebuild_replays_delivered_history_and_is_idempotent() {
        let app = app();
        let (item_a, model_a) = add_item(&app, 2.0, 100.0);
        let (item_b, _) = add_item(&app, 3.0, 50.0);

        // One delivered order (30 m² × 2 = 60 units), one still open.
        let delivered = app
            .manager
            .place_order(draft(1, vec![line(item_a, model_a, 30.0)]))
            .unwrap();
        let mut stored = app.store.get(delivered.id()).unwrap();
        stored.transition_to(OrderStatus::Enviar).unwrap();
        app.store.update(stored).unwrap();
        app.settlement.deliver_order(delivered.id()).unwrap();

        app.manager
            .place_order(draft(2, vec![line(item_a, model_a, 10.0)]))
            .unwrap();

        let summary = app.rebuilder.rebuild().unwrap();
        assert_eq!(summary.items_reset, 2);
        assert_eq!(summary.items_rebuilt, 1);

        let counters_a = app.ledger.get_item(item_a).unwrap().counters;
        assert_eq!(counters_a.manufactured, 60.0);
        assert_eq!(counters_a.delivered, 60.0);
        assert_eq!(counters_a.available, 0.0);
        assert_eq!(counters_a.reserved, 0.0);
        assert_eq!(counters_a.pending, 0.0);

        // Item B never shipped: fully zeroed, and its production history is gone.
        let counters_b = app.ledger.get_item(item_b).unwrap().counters;
        assert_eq!(counters_b.manufactured, 0.0);
        assert!(app.ledger.production_history(item_b).is_empty());

        // The log holds exactly the synthetic summary record.
        let history = app.ledger.production_history(item_a);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity, 60.0);
        assert_eq!(history[0].responsible, REBUILD_RESPONSIBLE);

        // Running it again with no intervening changes is a no-op.
        let again = app.rebuilder.rebuild().unwrap();
        assert_eq!(again, summary);
        assert_eq!(app.ledger.get_item(item_a).unwrap().counters, counters_a);
        assert_eq!(app.ledger.get_item(item_b).unwrap().counters, counters_b);
    }

    #[test]
    fn pricing_runs_off_the_same_entities_without_touching_counters() {
        let app = app();
        let (item_id, model_id) = add_item(&app, 2.0, 100.0);
        let order = app
            .manager
            .place_order(draft(1, vec![line(item_id, model_id, 10.0)]))
            .unwrap();

        let before = app.ledger.get_item(item_id).unwrap().counters;
        let total = app.pricing.recalculate(order.id()).unwrap();
        // 1000 × 1.10 margin × 10 m²
        assert_eq!(total, 11_000.0);
        assert_eq!(app.store.get(order.id()).unwrap().total(), 11_000.0);
        assert_eq!(app.ledger.get_item(item_id).unwrap().counters, before);
    }

    #[test]
    fn orders_survive_a_trip_through_the_wire_format() {
        let app = app();
        let (item_id, model_id) = add_item(&app, 2.0, 100.0);
        let order = app
            .manager
            .place_order(draft(1, vec![line(item_id, model_id, 40.0)]))
            .unwrap();

        let payload = serde_json::to_value(&order).unwrap();
        assert_eq!(payload["status"], "created");
        assert_eq!(payload["lines"][0]["fulfillment"], "available");

        let back: tileflow_orders::Order = serde_json::from_value(payload).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn square_meter_view_tracks_available_units() {
        let app = app();
        let (item_id, model_id) = add_item(&app, 2.0, 100.0);
        let factor = app.catalog.factor_for(model_id).unwrap();
        let item = app.ledger.get_item(item_id).unwrap();
        assert_eq!(item.area_equivalent(factor), 50.0);

        app.manager
            .place_order(draft(1, vec![line(item_id, model_id, 40.0)]))
            .unwrap();
        let item = app.ledger.get_item(item_id).unwrap();
        assert_eq!(item.area_equivalent(factor), 10.0);
    }
}
