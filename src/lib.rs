//! Bottleneck Pathways: an interactive essay explored as a terminal
//! flowchart.
//!
//! Layers:
//!   domain/  content model, reveal engine, geometry (pure)
//!   sim/     navigation controllers, overlays, timers, connectors
//!   ui/      terminal input, layout snapshot, renderer

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod sim;
pub mod ui;
