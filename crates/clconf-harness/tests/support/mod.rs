//! Shared helpers for the harness integration tests.

#![allow(dead_code)]

pub mod env_guard;
pub mod faulty;
