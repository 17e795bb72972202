// Overflow resolution: allocating template surfaces and threading their frames
// onto an overflowing chain.

pub mod frames;
pub mod overflow;

pub use frames::Margins;
pub use overflow::{resolve, OverflowConfig, OverflowReport, StopReason};
