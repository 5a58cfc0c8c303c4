//! Data models

pub mod indicator;
pub mod lookup;

pub use indicator::*;
pub use lookup::*;
