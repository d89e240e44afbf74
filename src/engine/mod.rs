pub mod dispatch;
pub mod offer;
pub mod scoring;
