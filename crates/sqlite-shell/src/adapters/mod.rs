pub mod script_bridge;
