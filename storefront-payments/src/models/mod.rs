pub mod order;

pub use order::{
    generate_order_number, ConfirmOutcome, NewOrder, Order, OrderStatus, PaymentMethod,
    PaymentStatus,
};
