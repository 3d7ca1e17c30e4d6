//! Full-screen terminal frontends.

pub mod grid;
