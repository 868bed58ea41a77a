pub mod helpers;
mod price;
mod secret;

pub use price::{Price, PriceError};
pub use secret::Secret;
