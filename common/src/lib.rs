//! Shared utilities for the convolution workspace.

pub mod disjoint;
pub mod float_ext;

pub use disjoint::DisjointMut;
pub use float_ext::FloatExt;

pub const EPSILON: f64 = 1e-6;
