use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

use super::RepositoryError;
use crate::domain::aggregates::Order;
use crate::domain::value_objects::OrderIdentifier;

pub trait OrderRepository: Send + Sync {
    /// Reserves the next identifier; identifiers are never handed out twice.
    fn next_order_identifier(&self) -> OrderIdentifier;
    fn list_orders(&self) -> Vec<Order>;
    fn retrieve_order(&self, id: OrderIdentifier) -> Option<Order>;
    /// Stores a newly placed order.
    fn save(&self, order: &Order) -> Result<(), RepositoryError>;
    /// Replaces the stored value of an existing order.
    fn update(&self, order: &Order) -> Result<(), RepositoryError>;
}

pub struct InMemoryOrderRepository {
    orders: RwLock<BTreeMap<OrderIdentifier, Order>>,
    next_id: Mutex<OrderIdentifier>,
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self { Self { orders: RwLock::new(BTreeMap::new()), next_id: Mutex::new(OrderIdentifier::FIRST) } }
}

impl InMemoryOrderRepository {
    pub fn new() -> Self { Self::default() }
}

impl OrderRepository for InMemoryOrderRepository {
    fn next_order_identifier(&self) -> OrderIdentifier {
        let mut next = self.next_id.lock();
        let id = *next;
        *next = id.next();
        id
    }

    fn list_orders(&self) -> Vec<Order> { self.orders.read().values().cloned().collect() }

    fn retrieve_order(&self, id: OrderIdentifier) -> Option<Order> { self.orders.read().get(&id).cloned() }

    fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write();
        if orders.contains_key(&order.id()) { return Err(RepositoryError::duplicate("order", order.id())); }
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    fn update(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write();
        let slot = orders.get_mut(&order.id()).ok_or_else(|| RepositoryError::not_found("order", order.id()))?;
        *slot = order.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::OrderState;
    use crate::domain::events::EventBus;
    use crate::domain::value_objects::{Client, DroneId, OrderDate, Product, Username};

    fn order(repo: &InMemoryOrderRepository) -> Order {
        let today = OrderDate::today();
        Order::place(repo.next_order_identifier(), Product::new("Widget").unwrap(), Client::new("Alice").unwrap(), today, today.plus_days(1)).unwrap()
    }

    #[test]
    fn test_identifiers_are_sequential() {
        let repo = InMemoryOrderRepository::new();
        assert_eq!(repo.next_order_identifier().as_u64(), 1);
        assert_eq!(repo.next_order_identifier().as_u64(), 2);
    }

    #[test]
    fn test_save_update_retrieve() {
        let repo = InMemoryOrderRepository::new();
        let placed = order(&repo);
        repo.save(&placed).unwrap();
        assert!(matches!(repo.save(&placed), Err(RepositoryError::Duplicate { .. })));
        let delivering = placed.start_delivering(&DroneId::new("D1").unwrap(), &Username::new("C1").unwrap(), &EventBus::new()).unwrap();
        repo.update(&delivering).unwrap();
        assert_eq!(repo.retrieve_order(placed.id()).unwrap().current_state(), OrderState::Delivering);
        assert_eq!(repo.list_orders().len(), 1);

        let unknown = order(&repo);
        assert!(matches!(repo.update(&unknown), Err(RepositoryError::NotFound { .. })));
    }
}
