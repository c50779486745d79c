pub mod stock;
pub mod response;

pub use stock::*;
pub use response::*;
