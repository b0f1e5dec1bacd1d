pub mod api;
pub mod arithmetic;
pub mod config;
pub mod data_models;
pub mod gateway;
pub mod render;
pub mod session;
pub mod synthesizer;
