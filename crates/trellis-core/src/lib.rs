//! Trellis Core Types and Definitions
//!
//! This crate provides the foundational types shared by every Trellis crate:
//!
//! - **Positions**: Source locations and ranges ([`position::Pos`], [`position::Range`])
//! - **Nodes**: The tagged document tree consumed by the resolver ([`node`] module)
//! - **Values**: Dynamically typed evaluation results ([`value::Value`])
//! - **Schema**: Declarative attribute and block specifications ([`schema`] module)

pub mod node;
pub mod position;
pub mod schema;
pub mod value;
