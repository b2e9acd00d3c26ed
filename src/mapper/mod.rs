//! Representation mapping between declared records and wire payloads.
//!
//! Pure and total over well-formed records. Forward mapping never emits
//! remote-owned fields (`status`, and `id` on creates); reverse mapping drops
//! empty containers so an undeclared block never shows up as drift.
//! `reverse(forward(r)) == r` for every well-formed record.

pub mod plan;
pub mod subscription;
