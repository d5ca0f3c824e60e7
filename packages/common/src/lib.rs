pub mod config;
pub mod error;
pub mod expand;
pub mod gateway;
pub mod model;
pub mod result;
pub mod tier;

pub use config::*;
pub use error::*;
pub use expand::*;
pub use gateway::*;
pub use model::*;
pub use result::*;
pub use tier::*;
