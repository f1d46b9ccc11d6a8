pub mod logic;
pub mod persistence;
pub mod session;
pub mod types;

pub use logic::*;
pub use persistence::*;
pub use session::*;
pub use types::*;
