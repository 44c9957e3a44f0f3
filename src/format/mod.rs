pub mod amount;
pub mod suffix;

pub use amount::*;
pub use suffix::*;
