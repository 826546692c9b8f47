pub mod portal;
pub mod public;
