#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod console;
pub mod emulator;

pub use emulator::Machine;
