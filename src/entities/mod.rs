pub mod carrier;
pub mod shipment;
pub mod shipment_history;
