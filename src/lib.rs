//! Per-country streaming statistics for choropleth world maps

pub mod parsers;
pub mod services;
pub mod types;
