pub mod client;
pub mod framing;
pub mod registry;
pub mod result_set;
pub mod runner;
pub mod types;
