pub mod alias;
pub mod pattern;
pub mod guard;
pub mod annotator;

pub use alias::*;
pub use pattern::*;
pub use guard::*;
pub use annotator::*;
