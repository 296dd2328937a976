//! Test utilities for runtime testing
//!
//! Shared by the op and executor unit tests: builds a one-function module
//! around a list of instructions, instantiates it and runs the function.
