pub mod error;
pub mod machine;
pub mod manager;
pub mod proof;
pub mod store;

pub use error::*;
pub use machine::*;
pub use manager::*;
pub use proof::*;
pub use store::*;
