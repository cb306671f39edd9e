//! Component B — the intermediate representation the core operates over:
//! structured function bodies (blocks + instructions), whole-program
//! containers, and the two passes (§4.E, §4.L) that rewrite a `Body` in
//! place.

pub mod blocks;
pub mod builder;
pub mod drop_analysis;
pub mod functions;
pub mod instructions;
pub mod modules;
pub mod monomorphize;
pub mod normalize;
pub mod types;

pub use blocks::{Block, BlockId, Body};
pub use functions::{Class, ClassField, Function, FunctionProfile};
pub use instructions::{Instruction, InstructionId, InstructionKind};
pub use modules::{MonomorphizedOutput, Module, Program};
pub use monomorphize::Monomorphizer;
pub use types::*;
