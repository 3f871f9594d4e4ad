pub mod connector;
pub mod event;
pub mod linear;
pub mod listeners;
pub mod navigator;
pub mod overlay;
pub mod timer;
