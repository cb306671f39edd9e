#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::needless_lifetimes)]

pub mod config;
pub mod dependency_graph;
pub mod error_codes;
pub mod ids;
pub mod ir;
pub mod logging;
pub mod pipeline;
pub mod pipeline_validation;
pub mod semantic_graph;
pub mod tast;

pub use config::InferenceConfig;
pub use error_codes::CoreError;
pub use pipeline::{Driver, MonomorphizedProgram, ResolvedProgram};
