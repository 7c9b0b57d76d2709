pub mod aggregate;

pub use aggregate::{
    NormalizedProduct, NormalizedProductDto, NormalizedProductId, ProductFilter,
};
