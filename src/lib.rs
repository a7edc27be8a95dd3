pub mod analyzers;
pub mod config;
pub mod geo;
pub mod model;
pub mod output;
pub mod parser;
