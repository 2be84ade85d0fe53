//! Order placement and lookup.

use std::sync::Arc;

use crate::domain::aggregates::{Order, OrderError};
use crate::domain::value_objects::{Client, OrderDate, OrderIdentifier, Product};
use crate::repositories::OrderRepository;

pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
}

impl OrderManager {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self { Self { orders } }

    /// Places an order today. The estimated arrival must be strictly after today.
    pub fn place_order(&self, product: Product, client: Client, estimated_arrival: OrderDate) -> crate::Result<Order> {
        let today = OrderDate::today();
        if !estimated_arrival.is_after(&today) {
            return Err(OrderError::ArrivalNotInFuture { arrival: estimated_arrival }.into());
        }
        let order = Order::place(self.orders.next_order_identifier(), product, client, today, estimated_arrival)?;
        self.orders.save(&order)?;
        tracing::info!(order_id = %order.id(), product = %order.product(), "Order placed");
        Ok(order)
    }

    pub fn list_orders(&self) -> Vec<Order> { self.orders.list_orders() }

    pub fn retrieve_order(&self, id: OrderIdentifier) -> Option<Order> { self.orders.retrieve_order(id) }
}
