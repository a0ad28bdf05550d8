//! Step debugger for NeoVM 3 scripts.
//!
//! [`bigint`] holds the canonical integer codec, [`vm`] the interpreter,
//! [`debugger`] the breakpoint and stepping layer, and [`executor`] / [`dap`]
//! the two front ends that drive it.

pub mod bigint;
pub mod config;
pub mod dap;
pub mod debugger;
pub mod executor;
pub mod parser;
pub mod vm;
