pub mod device;
pub mod device_event;
pub mod stock_movement;
pub mod stock_threshold;
pub mod user;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::device::{self, Entity as Device};
    pub use super::device_event::{self, Entity as DeviceEvent};
    pub use super::stock_movement::{self, Entity as StockMovement};
    pub use super::stock_threshold::{self, Entity as StockThreshold};
    pub use super::user::{self, Entity as User};
}
