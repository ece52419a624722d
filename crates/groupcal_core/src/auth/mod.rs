//! Authorization gate.
//!
//! The gate is a pure policy function: callers read role facts inside the
//! transaction that performs the mutation and hand them in, so no decision is
//! ever made from cached roles.

pub mod gate;

pub use gate::{authorize, AccessDecision, Operation, Relation, Requirement, RoleFacts, Target};
