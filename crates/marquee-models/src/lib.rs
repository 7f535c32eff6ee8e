//! Model implementations for Marquee.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Scripted responses for tests and offline runs
//! - **Gemini**: Google's Gemini models (API key required), including inline
//!   image attachments and Google Search grounding

pub mod factory;
pub mod gemini;
pub mod mock;

pub use factory::{DEFAULT_GEMINI_MODEL, ModelConfig, ModelFactory, ModelType};
pub use gemini::GeminiModel;
pub use mock::MockModel;
