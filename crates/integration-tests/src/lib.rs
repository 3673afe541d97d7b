//! Cross-crate integration tests (ambient stack, §8): scenarios that
//! exercise more than one crate's primitives together without requiring a
//! live Postgres instance, complementing the `#[cfg(test)]` unit tests
//! colocated inside each crate. Grounded on the teacher's `engine-tests`
//! crate, which plays the same role for its own multi-crate pipeline.

#[cfg(test)]
mod catalog_claim_races;
#[cfg(test)]
mod comparator_schema_diff;
#[cfg(test)]
mod config_resolution;
#[cfg(test)]
mod partition_planning;
#[cfg(test)]
mod transform_segment_rotation;
