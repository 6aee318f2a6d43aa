// Data-shaping pipeline: attribute join, JSON projection, example pairing, assembly.
// Synchronous and side-effect free; everything it returns is a plain value.

pub mod assembler;
pub mod columns;
pub mod errors;
pub mod examples;
pub mod join;
pub mod policy;
pub mod projection;
