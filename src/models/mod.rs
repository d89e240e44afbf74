pub mod event;
pub mod offer;
pub mod order;
pub mod rider;
pub mod ticket;
