//! Warden Driver - policy evaluation backends
//!
//! A [`Driver`] compiles policy templates, binds constraints to them by kind,
//! and evaluates review objects against the constraints it can serve. Several
//! drivers can be mounted at once behind a [`PolicyClient`], which owns
//! constraint matching and merges every driver's results.
//!
//! ## Backends
//!
//! - [`RulesDriver`] (`rules`): declarative field checks evaluated in-process
//! - [`ScriptDriver`] (`script`): code run by an external interpreter with a
//!   per-execution timeout

#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod rules;
pub mod script;
pub mod traits;

pub use client::PolicyClient;
pub use error::{DriverError, Result};
pub use rules::RulesDriver;
pub use script::{ScriptConfig, ScriptDriver};
pub use traits::Driver;
