//! Single-pass reflection-block transformer.
//!
//! The module is split along the lines of the per-line algorithm:
//!
//! - [`markers`]: recognizing the lines that open and close a block
//! - [`indices`]: reading `h k l` off a data line and permuting them
//! - [`coin`]: the per-block random decision, behind a trait so tests can
//!   force it
//! - [`state`]: the two-state machine, as a pure step over one line
//! - [`transformer`]: the lazy iterator over a line stream and the
//!   reader-to-writer driver
//!
//! ```text
//! input:                                  output (coin = true):
//! Reflections measured after indexing     flipped = true
//!   1   2   3  0.5                        Reflections measured after indexing
//! End of reflections                      1 3 2 0.5
//!                                         End of reflections
//! ```

pub mod coin;
pub mod error;
pub mod indices;
pub mod markers;
pub mod state;
pub mod transformer;

pub use coin::{Coin, FixedCoin, RandomCoin, ScriptedCoin};
pub use error::TwinError;
pub use indices::{
    leading_integer, swap_indices, swap_indices_zero_filled, IndexParsing, Malformed, Swap,
};
pub use markers::Markers;
pub use state::{BlockState, Emission, LineAction, MalformedPolicy, StepOptions};
pub use transformer::{read_lines, run, Summary, TwinTransformer};
