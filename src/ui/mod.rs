pub mod gamepad;
pub mod input;
pub mod layout;
pub mod renderer;
pub mod swipe;
pub mod text;
