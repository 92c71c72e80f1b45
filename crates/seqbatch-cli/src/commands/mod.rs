//! Pipeline phases
//!
//! [`run`] drives one invocation; the other modules implement one phase each.

pub mod reconcile;
pub mod reset;
pub mod run;
pub mod submit;
