pub mod content;
pub mod evidence;
pub mod geometry;
pub mod progress;
