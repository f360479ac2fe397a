//! Cross-subsystem scenarios from the hard-core spec: the six seed
//! end-to-end scenarios plus the universal invariants and boundary
//! behaviors, driven against real service instances wired together the
//! same way [`node_runtime::container::SubsystemContainer`] does it.

pub mod invariants;
pub mod seed_scenarios;
