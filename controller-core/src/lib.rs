#![no_std]

// Shared logic for the battery load guard.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and exposing abstractions the other crates can adopt.

pub mod controller;
pub mod orchestrator;
pub mod sampler;
pub mod telemetry;
