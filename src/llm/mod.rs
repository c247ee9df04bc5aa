pub mod client;
pub mod narrator;
pub mod prompts;
pub mod types;

pub use client::*;
pub use narrator::*;
pub use types::*;
