pub mod aggregate;

pub use aggregate::{
    NormalizedOrder, NormalizedOrderDto, NormalizedOrderId, OrderFilter, OrderStatus,
    ShipOrderRequest, UpdateOrderStatusRequest,
};
