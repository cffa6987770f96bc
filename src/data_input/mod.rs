// src/data_input/mod.rs

pub mod log_parser;
pub mod sample_store;

// src/data_input/mod.rs
