pub mod frontend;
pub mod input;
pub mod runner;
pub mod speed;
