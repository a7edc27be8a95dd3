//! Accessibility, zone, overlap and gap analysis over loaded datasets.
//!
//! Each analyzer validates its configuration on construction and then runs
//! as a pure function over immutable branch and stop slices. `analyzer`
//! wires them into one pipeline and writes the results out.

pub mod accessibility;
pub mod aggregate;
pub mod analyzer;
pub mod gaps;
pub mod level;
pub mod overlap;
pub mod types;
pub mod utility;
pub mod zones;
