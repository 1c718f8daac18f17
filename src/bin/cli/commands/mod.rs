pub mod calendar;
pub mod client;
pub mod idea;
pub mod shoot;
