use std::collections::HashMap;
use std::sync::RwLock;

use tileflow_core::{DomainError, DomainResult, OrderId, StockItemId};

use crate::order::{Order, OrderStatus};

/// Persistence boundary for orders.
///
/// The engine only requires point lookups plus the two history queries
/// below; everything else about storage is the adapter's business.
pub trait OrderStore: Send + Sync {
    fn insert(&self, order: Order) -> DomainResult<()>;

    fn get(&self, order_id: OrderId) -> DomainResult<Order>;

    /// Replace a stored order wholesale.
    fn update(&self, order: Order) -> DomainResult<()>;

    fn remove(&self, order_id: OrderId) -> DomainResult<Order>;

    fn list(&self) -> Vec<Order>;

    /// The backorder resolver's queue: orders that are not delivered and
    /// still carry at least one not-yet-available line for `item_id`,
    /// ascending by sequence number (strict FIFO, oldest first).
    fn unresolved_for_item(&self, item_id: StockItemId) -> Vec<Order>;

    /// Delivered orders, ascending by sequence number (the rebuilder's
    /// replay input).
    fn delivered(&self) -> Vec<Order>;
}

/// In-memory order store.
///
/// Reference implementation of the boundary; intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, HashMap<OrderId, Order>>> {
        self.orders
            .read()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))
    }

    fn write(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, HashMap<OrderId, Order>>> {
        self.orders
            .write()
            .map_err(|_| DomainError::conflict("order store lock poisoned"))
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: Order) -> DomainResult<()> {
        let mut orders = self.write()?;
        if orders.contains_key(&order.id()) {
            return Err(DomainError::conflict(format!(
                "order already exists: {}",
                order.id()
            )));
        }
        orders.insert(order.id(), order);
        Ok(())
    }

    fn get(&self, order_id: OrderId) -> DomainResult<Order> {
        self.read()?
            .get(&order_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }

    fn update(&self, order: Order) -> DomainResult<()> {
        let mut orders = self.write()?;
        if !orders.contains_key(&order.id()) {
            return Err(DomainError::not_found("order", order.id()));
        }
        orders.insert(order.id(), order);
        Ok(())
    }

    fn remove(&self, order_id: OrderId) -> DomainResult<Order> {
        self.write()?
            .remove(&order_id)
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }

    fn list(&self) -> Vec<Order> {
        let Ok(orders) = self.orders.read() else {
            return Vec::new();
        };
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.sequence());
        all
    }

    fn unresolved_for_item(&self, item_id: StockItemId) -> Vec<Order> {
        let Ok(orders) = self.orders.read() else {
            return Vec::new();
        };
        let mut queue: Vec<Order> = orders
            .values()
            .filter(|o| o.status() != OrderStatus::Entregado)
            .filter(|o| o.has_unresolved_line_for(item_id))
            .cloned()
            .collect();
        queue.sort_by_key(|o| o.sequence());
        queue
    }

    fn delivered(&self) -> Vec<Order> {
        let Ok(orders) = self.orders.read() else {
            return Vec::new();
        };
        let mut delivered: Vec<Order> = orders
            .values()
            .filter(|o| o.status() == OrderStatus::Entregado)
            .cloned()
            .collect();
        delivered.sort_by_key(|o| o.sequence());
        delivered
    }
}
