//! Warden Types - shared data model
//!
//! Warden is an admission policy gateway. A submitted resource may be
//! expanded into derived resources before it is reviewed, and every resource
//! is evaluated by one or more policy drivers.
//!
//! ## Key Concepts
//!
//! - **GroupVersionKind**: the three-part type tag of a resource
//! - **Unstructured**: a resource as a plain JSON document
//! - **ExpansionTemplate**: how to derive resources from a generator
//! - **PolicyTemplate**: policy logic compiled by a driver
//! - **Constraint**: an instance of a policy template with parameters
//! - **ViolationResult**: one evaluation outcome, with provenance
//! - **AdmissionReview**: the ingress wire format

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod admission;
pub mod constraint;
pub mod enforcement;
pub mod error;
pub mod expansion;
pub mod gvk;
pub mod matching;
pub mod namespace;
pub mod object;
pub mod result;
pub mod review;
pub mod template;

pub use admission::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, Operation, Status, UserInfo,
    HTTP_STATUS_WARNING,
};
pub use constraint::{Constraint, ConstraintMatch, KindSelector};
pub use enforcement::EnforcementAction;
pub use error::{ObjectError, ValidationError};
pub use expansion::{ExpansionTemplate, ExpansionTemplateSpec, GeneratedGvk};
pub use gvk::GroupVersionKind;
pub use matching::{namespace_matches, ApplyTo};
pub use namespace::Namespace;
pub use object::{ObjectMeta, Unstructured};
pub use result::{ConstraintRef, ResultSource, ViolationResult};
pub use review::{ReviewObject, SourceType};
pub use template::{CodeBlock, PolicyTemplate, PolicyTemplateSpec, TemplateTarget, TARGET_NAME};

/// API group of policy templates.
pub const TEMPLATES_GROUP: &str = "templates.warden.dev";

/// API group shared by all constraint kinds.
pub const CONSTRAINTS_GROUP: &str = "constraints.warden.dev";

/// API group of the singleton configuration resource.
pub const CONFIG_GROUP: &str = "config.warden.dev";

/// API group of expansion templates.
pub const EXPANSION_GROUP: &str = "expansion.warden.dev";
