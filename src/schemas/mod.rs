pub mod auth;
pub mod device;
pub mod stock;

pub use auth::*;
pub use device::*;
pub use stock::*;
