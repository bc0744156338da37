//! Domain models shared across the workspace

mod order;
mod product;
mod role;

pub use order::{
    Address, CartItem, Order, OrderLine, OrderStatus, PaymentKind, PaymentRecord, PaymentStatus,
};
pub use product::{NewProduct, Product, ProductPatch};
pub use role::{Caller, Role};
