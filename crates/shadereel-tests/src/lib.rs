//! Integration test crate for ShadeReel.
//!
//! Holds the in-memory media backend and the cross-crate scenarios that run
//! whole jobs through it.

pub mod support;

#[cfg(test)]
mod batch;

#[cfg(test)]
mod render;

#[cfg(test)]
mod timeline;
