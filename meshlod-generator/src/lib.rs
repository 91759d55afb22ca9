//! Progressive mesh level-of-detail generation
//!
//! This crate reduces a mesh by collapsing its cheapest edges first and
//! bakes index buffers at the configured levels:
//! - Adjacency model over position-deduplicated vertices
//! - Curvature based and profile-replay collapse costs
//! - Independent or pairwise compressed output buffers

pub mod data;
pub mod input;
pub mod collapse_cost;
pub mod curvature;
pub mod profiler;
pub mod collapser;
pub mod output;
pub mod output_buffer;
pub mod output_compressed;
pub mod config;
pub mod generator;
pub mod simplifier;

pub use data::*;
pub use input::*;
pub use collapse_cost::*;
pub use curvature::*;
pub use profiler::*;
pub use collapser::*;
pub use output::*;
pub use output_buffer::*;
pub use output_compressed::*;
pub use config::*;
pub use generator::*;
pub use simplifier::*;
