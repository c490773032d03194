// Core services
pub mod carriers;
pub mod shipments;

// Derived views over the shipment collection
pub mod pendencies;
pub mod schedule;
