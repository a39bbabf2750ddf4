pub mod batch;
pub mod item;
pub mod money;
pub mod order;

pub use batch::*;
pub use item::*;
pub use money::*;
pub use order::*;
