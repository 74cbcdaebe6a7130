//! Block state machine.
//!
//! Two states: outside a block and inside one. [`BlockState::step`] takes
//! the state and one input line and returns the next state together with
//! what to write. Per line, in order:
//!
//! 1. a line starting with the end marker leaves the block
//! 2. inside a flipped block, the line has its `k` and `l` swapped
//! 3. a line (as it stands after step 2) starting with the start marker
//!    enters a block, tosses the coin, and is preceded by `flipped = <bool>`
//!
//! The end marker line is therefore never rewritten. Lines are raw bytes;
//! only the index tokens of a swapped line need to be readable.

use crate::twin::coin::Coin;
use crate::twin::error::TwinError;
use crate::twin::indices::{swap_indices, swap_indices_zero_filled, IndexParsing, Malformed};
use crate::twin::markers::Markers;
use fake_twin_config::{IndexParsingMode, MalformedLines, TwinConfig};

/// What to do with a line in a flipped block that cannot be permuted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Stop with [`TwinError::ShortLine`] or [`TwinError::MalformedIndex`].
    #[default]
    Error,
    /// Copy the line unchanged.
    PassThrough,
    /// Read missing index tokens as `0` and swap as usual, so `1 2` becomes
    /// `1 0 2`. Legacy tooling behaved this way. Index tokens rejected by
    /// strict parsing still stop the run.
    ZeroFill,
}

/// Everything a step needs besides the state and the line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOptions {
    pub markers: Markers,
    pub parsing: IndexParsing,
    pub malformed: MalformedPolicy,
}

impl TryFrom<&TwinConfig> for StepOptions {
    type Error = TwinError;

    fn try_from(config: &TwinConfig) -> Result<Self, Self::Error> {
        let markers = Markers::new(config.markers.start.as_str(), config.markers.end.as_str())?;
        let parsing = match config.transform.index_parsing {
            IndexParsingMode::Lenient => IndexParsing::Lenient,
            IndexParsingMode::Strict => IndexParsing::Strict,
        };
        let malformed = match config.transform.malformed_lines {
            MalformedLines::Error => MalformedPolicy::Error,
            MalformedLines::PassThrough => MalformedPolicy::PassThrough,
            MalformedLines::ZeroFill => MalformedPolicy::ZeroFill,
        };
        Ok(Self {
            markers,
            parsing,
            malformed,
        })
    }
}

/// State carried from one line to the next.
///
/// `flip` is only meaningful while `in_block` is set; it keeps its last
/// value outside a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockState {
    pub in_block: bool,
    pub flip: bool,
}

/// How the emitted line relates to the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction {
    /// Byte-for-byte copy.
    Copied,
    /// `k` and `l` exchanged, tokens re-joined with single spaces.
    Swapped,
    /// Short line swapped after reading its missing indices as `0`, under
    /// [`MalformedPolicy::ZeroFill`].
    ZeroFilled,
    /// Malformed line inside a flipped block, copied under
    /// [`MalformedPolicy::PassThrough`].
    PassedThrough,
}

/// Output for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Set when this line opened a block: the coin outcome to announce
    /// before `line`.
    pub announced: Option<bool>,
    pub line: Vec<u8>,
    pub action: LineAction,
}

impl Emission {
    /// The `flipped = <bool>` line that precedes a block's start marker.
    pub fn announcement(&self) -> Option<String> {
        self.announced.map(|flip| format!("flipped = {}", flip))
    }

    /// Output lines in order, without terminators.
    pub fn into_lines(self) -> impl Iterator<Item = Vec<u8>> {
        self.announcement()
            .map(String::into_bytes)
            .into_iter()
            .chain(std::iter::once(self.line))
    }
}

impl BlockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over one line. `line_number` is 1-based and only used in
    /// errors. The coin is tossed exactly once per block start.
    pub fn step<C: Coin + ?Sized>(
        self,
        line_number: usize,
        line: Vec<u8>,
        coin: &mut C,
        options: &StepOptions,
    ) -> Result<(BlockState, Emission), TwinError> {
        let mut next = self;

        if options.markers.closes_block(&line) {
            next.in_block = false;
        }

        let (line, action) = if next.in_block && next.flip {
            let swapped = match options.malformed {
                MalformedPolicy::ZeroFill => swap_indices_zero_filled(&line, options.parsing),
                MalformedPolicy::Error | MalformedPolicy::PassThrough => {
                    swap_indices(&line, options.parsing)
                }
            };
            match swapped {
                Ok(swap) if swap.filled > 0 => (swap.line, LineAction::ZeroFilled),
                Ok(swap) => (swap.line, LineAction::Swapped),
                Err(_) if options.malformed == MalformedPolicy::PassThrough => {
                    (line, LineAction::PassedThrough)
                }
                Err(malformed) => return Err(malformed_error(line_number, &line, malformed)),
            }
        } else {
            (line, LineAction::Copied)
        };

        let mut announced = None;
        if options.markers.opens_block(&line) {
            next.in_block = true;
            next.flip = coin.toss();
            announced = Some(next.flip);
        }

        Ok((
            next,
            Emission {
                announced,
                line,
                action,
            },
        ))
    }
}

fn malformed_error(line_number: usize, line: &[u8], malformed: Malformed) -> TwinError {
    let content = String::from_utf8_lossy(line).into_owned();
    match malformed {
        Malformed::TooShort { tokens } => TwinError::ShortLine {
            line_number,
            content,
            tokens,
        },
        Malformed::NotAnInteger { token } => TwinError::MalformedIndex {
            line_number,
            token,
            content,
        },
    }
}
