//! Shipping: placing orders, driving their delivery and commanding drones.
pub mod delivery;
pub mod drone_controller;
pub mod order_manager;

pub use delivery::DeliveryService;
pub use drone_controller::DroneController;
pub use order_manager::OrderManager;
