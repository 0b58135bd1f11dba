//! Edge filter: coarse session gating before any page renders.

pub mod app;
pub mod middleware;
