pub mod feature;
pub mod rtree;
pub mod snapshot;

pub use feature::*;
pub use rtree::*;
pub use snapshot::*;
