pub mod players;
pub mod prelude;
