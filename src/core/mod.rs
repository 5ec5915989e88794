pub mod config;
pub mod quota;
pub mod store;
pub mod terminal;
pub mod training;
