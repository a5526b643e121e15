pub mod events;
pub mod types;

pub use events::*;
pub use types::*;
