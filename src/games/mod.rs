//! Ready-made game definitions.

pub mod demo;

pub use demo::DemoGameBuilder;
