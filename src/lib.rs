//! # fake-twin
//!
//! Fakes twinned data in a CrystFEL-style stream. Blocks of reflections are
//! located by their start and end marker lines; for each block a coin is
//! tossed, and when it lands `true` the `k` and `l` indices of every
//! reflection line in the block are exchanged. Everything else is copied.
//!
//! The work happens in a single forward pass; see [`twin`] for the
//! transformer and [`twin::run`] for the stream driver used by the binary.

pub mod twin;
