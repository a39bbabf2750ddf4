pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod invoice;
pub mod mock;
pub mod otp;
pub mod poll;
pub mod session;
pub mod wallet;

pub use coordinator::*;
pub use error::*;
pub use gateway::*;
pub use invoice::*;
pub use otp::*;
pub use poll::*;
pub use session::*;
pub use wallet::*;
