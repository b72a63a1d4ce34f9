//! Core rendering functionality
//!
//! Handles render pipelines, the starfield, the sun's shadow map and frame
//! rendering.

pub mod pipeline_manager;
pub mod render_engine;
pub mod shadow;
pub mod starfield;

// Re-export main types
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use starfield::{StarfieldData, StarfieldRenderer};
