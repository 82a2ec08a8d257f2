#![forbid(unsafe_code)]

pub mod achievements;
pub mod completion;
pub mod error;
pub mod model;
pub mod personalization;
pub mod time;

pub use error::Error;
pub use time::Clock;
