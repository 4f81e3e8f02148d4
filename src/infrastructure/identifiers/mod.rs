//! Identifier implementations

pub mod pronom;

pub use pronom::Pronom;
