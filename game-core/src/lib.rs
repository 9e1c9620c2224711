pub mod code;
pub mod outcome;
pub mod room;

// Re-export main components
pub use code::*;
pub use outcome::*;
pub use room::*;
