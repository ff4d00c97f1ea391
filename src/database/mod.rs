pub mod warehouse;

pub use warehouse::{DatabaseError, WarehouseTarget};
