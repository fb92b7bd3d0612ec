#![doc = include_str!("../README.md")]

mod allocation;
mod catalog;
mod engine;
mod error;
mod residue;

pub use crate::allocation::*;
pub use crate::catalog::*;
pub use crate::engine::*;
pub use crate::error::*;
