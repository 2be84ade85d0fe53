//! Domain layer: value objects, aggregates, domain events.
pub mod value_objects;
pub mod aggregates;
pub mod events;
pub mod sensors;
pub mod drone;
