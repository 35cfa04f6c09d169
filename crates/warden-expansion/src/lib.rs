//! Generator expansion.
//!
//! A generator is a resource that embeds the template of other resources
//! (a Deployment embeds a Pod template). Expansion templates describe where
//! that embedded document lives and which identity to give it, so the
//! embedded resource can be reviewed as if it had been submitted directly.
//!
//! - [`ExpansionSystem`] stores templates by name and answers which templates
//!   apply to a given identity.
//! - [`ExpansionSystem::expand_generator`] turns one generator into the
//!   derived resources its templates describe.

pub mod error;
pub mod system;

pub use error::{ExpansionError, PartialExpansion};
pub use system::{validate_template, ExpansionSystem, Resultant};
