pub mod decision;
pub mod features;
pub mod prediction;

pub use decision::*;
pub use features::*;
pub use prediction::*;
