//! Monthly duty roster compiler and solver.
//!
//! A [`data::RosterInput`] is validated into a [`registry::Registry`],
//! compiled into a solver-neutral [`model::Model`], solved with HiGHS and
//! decoded into a [`data::RosterOutput`].

pub mod calendar;
pub mod compiler;
pub mod config;
pub mod data;
pub mod decode;
pub mod error;
pub mod fallback;
pub mod model;
pub mod registry;
pub mod server;
pub mod solver;

pub use error::{Result, RosterError};
pub use solver::solve;
