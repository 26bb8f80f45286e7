pub mod framer;
pub mod orderer;

pub use framer::{deframe, frame};
pub use orderer::{Orderer, OrdererConfig};
