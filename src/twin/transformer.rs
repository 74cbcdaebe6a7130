//! Streaming driver.
//!
//! [`TwinTransformer`] wraps an iterator of input lines and yields output
//! lines lazily, one input line at a time. It holds at most one pending
//! output line (the start marker that follows a `flipped = ...`
//! announcement), so memory use does not depend on the input length.
//!
//! Lines are bytes. Only the markers and, in flipped blocks, the index
//! tokens are looked at, so text in any encoding passes through untouched.
//!
//! [`run`] connects a reader to a writer through a transformer and reports
//! a [`Summary`] once the input is exhausted.

use crate::twin::coin::Coin;
use crate::twin::error::TwinError;
use crate::twin::state::{BlockState, LineAction, StepOptions};
use std::io::{self, BufRead, Write};
use tracing::{debug, info, trace, warn};

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub lines_read: usize,
    pub lines_written: usize,
    pub blocks: usize,
    pub flipped_blocks: usize,
    /// Lines rewritten in flipped blocks, zero-filled ones included.
    pub swapped_lines: usize,
    /// Short lines completed with `0` indices under the zero-fill policy.
    pub filled_lines: usize,
    /// Malformed lines copied under the pass-through policy.
    pub skipped_lines: usize,
    /// The input ended inside a block.
    pub unterminated_block: bool,
}

/// Lazy, single-use transformation of a line stream.
///
/// Yields `Ok(line)` for each output line, without its terminator. The
/// first error ends the stream.
pub struct TwinTransformer<L, C> {
    lines: L,
    coin: C,
    options: StepOptions,
    state: BlockState,
    pending: Option<Vec<u8>>,
    line_number: usize,
    summary: Summary,
    done: bool,
}

impl<L, C> TwinTransformer<L, C>
where
    L: Iterator<Item = io::Result<Vec<u8>>>,
    C: Coin,
{
    pub fn new(lines: L, coin: C, options: StepOptions) -> Self {
        Self {
            lines,
            coin,
            options,
            state: BlockState::new(),
            pending: None,
            line_number: 0,
            summary: Summary::default(),
            done: false,
        }
    }

    /// Current block state.
    pub fn state(&self) -> BlockState {
        self.state
    }

    /// Counters so far. Complete once the iterator has returned `None`.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    pub fn into_summary(self) -> Summary {
        self.summary
    }

    fn emit(&mut self, line: Vec<u8>) -> Option<Result<Vec<u8>, TwinError>> {
        self.summary.lines_written += 1;
        Some(Ok(line))
    }

    fn fail(&mut self, err: TwinError) -> Option<Result<Vec<u8>, TwinError>> {
        self.done = true;
        self.pending = None;
        Some(Err(err))
    }

    fn finish(&mut self) {
        self.done = true;
        self.summary.unterminated_block = self.state.in_block;
        if self.state.in_block {
            debug!(
                line = self.line_number,
                "input ended inside a block of reflections"
            );
        }
    }
}

impl<L, C> Iterator for TwinTransformer<L, C>
where
    L: Iterator<Item = io::Result<Vec<u8>>>,
    C: Coin,
{
    type Item = Result<Vec<u8>, TwinError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.pending.take() {
            return self.emit(line);
        }
        if self.done {
            return None;
        }

        let line = match self.lines.next() {
            None => {
                self.finish();
                return None;
            }
            Some(Err(err)) => return self.fail(err.into()),
            Some(Ok(line)) => line,
        };
        self.line_number += 1;
        self.summary.lines_read += 1;

        let previous = self.state;
        let (state, emission) =
            match previous.step(self.line_number, line, &mut self.coin, &self.options) {
                Ok(stepped) => stepped,
                Err(err) => return self.fail(err),
            };
        self.state = state;

        match emission.action {
            LineAction::Copied => {}
            LineAction::Swapped => {
                self.summary.swapped_lines += 1;
                trace!(
                    line = self.line_number,
                    output = %String::from_utf8_lossy(&emission.line),
                    "swapped k and l"
                );
            }
            LineAction::ZeroFilled => {
                self.summary.swapped_lines += 1;
                self.summary.filled_lines += 1;
                debug!(
                    line = self.line_number,
                    output = %String::from_utf8_lossy(&emission.line),
                    "short line in flipped block, missing indices read as 0"
                );
            }
            LineAction::PassedThrough => {
                self.summary.skipped_lines += 1;
                warn!(
                    line = self.line_number,
                    content = %String::from_utf8_lossy(&emission.line),
                    "no usable h k l in flipped block, line copied unchanged"
                );
            }
        }

        if previous.in_block && !state.in_block {
            debug!(line = self.line_number, "block closed");
        }

        if let Some(flip) = emission.announced {
            self.summary.blocks += 1;
            if flip {
                self.summary.flipped_blocks += 1;
            }
            debug!(line = self.line_number, flipped = flip, "block opened");
        }

        let mut out = emission.into_lines();
        let first = out.next();
        self.pending = out.next();
        first.and_then(|line| self.emit(line))
    }
}

/// Raw lines of `reader`, split on `\n` with a trailing `\r` dropped.
pub fn read_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<Vec<u8>>> {
    reader.split(b'\n').map(|line| {
        line.map(|mut line| {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    })
}

/// Transform everything `reader` yields into `writer`, one `\n`-terminated
/// line at a time. The writer is flushed before returning.
pub fn run<R, W, C>(
    reader: R,
    mut writer: W,
    coin: C,
    options: StepOptions,
) -> Result<Summary, TwinError>
where
    R: BufRead,
    W: Write,
    C: Coin,
{
    let mut transformer = TwinTransformer::new(read_lines(reader), coin, options);
    for line in transformer.by_ref() {
        writer.write_all(&line?)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let summary = transformer.into_summary();
    info!(
        lines_read = summary.lines_read,
        lines_written = summary.lines_written,
        blocks = summary.blocks,
        flipped_blocks = summary.flipped_blocks,
        swapped_lines = summary.swapped_lines,
        filled_lines = summary.filled_lines,
        skipped_lines = summary.skipped_lines,
        "done"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twin::coin::{FixedCoin, RandomCoin, ScriptedCoin};
    use crate::twin::indices::IndexParsing;
    use crate::twin::state::MalformedPolicy;

    fn lines(input: &str) -> impl Iterator<Item = io::Result<Vec<u8>>> + '_ {
        read_lines(input.as_bytes())
    }

    fn collect<L, C>(transformer: &mut TwinTransformer<L, C>) -> Vec<String>
    where
        L: Iterator<Item = io::Result<Vec<u8>>>,
        C: Coin,
    {
        transformer
            .by_ref()
            .map(|line| String::from_utf8(line.unwrap()).unwrap())
            .collect()
    }

    fn next_line<L, C>(transformer: &mut TwinTransformer<L, C>) -> String
    where
        L: Iterator<Item = io::Result<Vec<u8>>>,
        C: Coin,
    {
        String::from_utf8(transformer.next().unwrap().unwrap()).unwrap()
    }

    fn transform(input: &str, coin: impl Coin, options: StepOptions) -> String {
        let mut out = Vec::new();
        run(input.as_bytes(), &mut out, coin, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    const START: &str = "Reflections measured after indexing";
    const EXAMPLE: &str = "Reflections measured after indexing\n1 2 3 0.5\nEnd of reflections\n";

    #[test]
    fn test_example_forced_true() {
        let output = transform(EXAMPLE, FixedCoin(true), StepOptions::default());
        insta::assert_snapshot!(output.trim_end(), @r"
        flipped = true
        Reflections measured after indexing
        1 3 2 0.5
        End of reflections
        ");
    }

    #[test]
    fn test_example_forced_false() {
        let output = transform(EXAMPLE, FixedCoin(false), StepOptions::default());
        assert_eq!(
            output,
            "flipped = false\nReflections measured after indexing\n1 2 3 0.5\nEnd of reflections\n"
        );
    }

    #[test]
    fn test_transformer_is_lazy() {
        // An input that never ends still yields output line by line.
        let endless = std::iter::repeat_with(|| Ok::<_, io::Error>(b"1 2 3".to_vec()));
        let start = std::iter::once(Ok::<_, io::Error>(START.as_bytes().to_vec()));
        let mut transformer =
            TwinTransformer::new(start.chain(endless), FixedCoin(true), StepOptions::default());
        let first: Vec<String> = (0..4).map(|_| next_line(&mut transformer)).collect();
        assert_eq!(first, vec!["flipped = true", START, "1 3 2", "1 3 2"]);
    }

    #[test]
    fn test_summary_counts() {
        let input = "\
header
Reflections measured after indexing
   h    k    l
  1   2   3  10.0
  4   5   6  20.0
End of reflections
Reflections measured after indexing
  7   8   9  30.0
End of reflections
Reflections measured after indexing
 1 1 1
";
        let mut transformer = TwinTransformer::new(
            lines(input),
            ScriptedCoin::new([true, false, true]),
            StepOptions::default(),
        );
        let output = collect(&mut transformer);
        let summary = transformer.summary();

        assert_eq!(summary.lines_read, 11);
        assert_eq!(summary.lines_written, 14);
        assert_eq!(output.len(), 14);
        assert_eq!(summary.blocks, 3);
        assert_eq!(summary.flipped_blocks, 2);
        assert_eq!(summary.swapped_lines, 4);
        assert_eq!(summary.filled_lines, 0);
        assert_eq!(summary.skipped_lines, 0);
        assert!(summary.unterminated_block);
        assert_eq!(output[3], "0 0 0");
        assert_eq!(output[13], "1 1 1");
    }

    #[test]
    fn test_error_names_line_and_stops() {
        let input = "Reflections measured after indexing\n1 2 3\n1 2\n4 5 6\n";
        let mut transformer =
            TwinTransformer::new(lines(input), FixedCoin(true), StepOptions::default());

        assert_eq!(next_line(&mut transformer), "flipped = true");
        assert_eq!(next_line(&mut transformer), START);
        assert_eq!(next_line(&mut transformer), "1 3 2");
        let err = transformer.next().unwrap().unwrap_err();
        assert_eq!(err.line_number(), Some(3));
        assert!(transformer.next().is_none());
        assert!(transformer.next().is_none());
    }

    #[test]
    fn test_pass_through_counts_skipped_lines() {
        let input =
            "Reflections measured after indexing\n   h    k    l  I\n\n1 2 3\nEnd of reflections\n";
        let options = StepOptions {
            parsing: IndexParsing::Strict,
            malformed: MalformedPolicy::PassThrough,
            ..StepOptions::default()
        };
        let mut transformer = TwinTransformer::new(lines(input), FixedCoin(true), options);
        let output = collect(&mut transformer);
        assert_eq!(
            output,
            vec![
                "flipped = true",
                START,
                "   h    k    l  I",
                "",
                "1 3 2",
                "End of reflections",
            ]
        );
        let summary = transformer.summary();
        assert_eq!(summary.skipped_lines, 2);
        assert_eq!(summary.swapped_lines, 1);
        assert!(!summary.unterminated_block);
    }

    #[test]
    fn test_zero_fill_counts_filled_lines() {
        let input = "Reflections measured after indexing\n1 2\n\n1 2 3\nEnd of reflections\n";
        let options = StepOptions {
            malformed: MalformedPolicy::ZeroFill,
            ..StepOptions::default()
        };
        let mut transformer = TwinTransformer::new(lines(input), FixedCoin(true), options);
        let output = collect(&mut transformer);
        assert_eq!(
            output,
            vec![
                "flipped = true",
                START,
                "1 0 2",
                "0 0 0",
                "1 3 2",
                "End of reflections",
            ]
        );
        let summary = transformer.summary();
        assert_eq!(summary.swapped_lines, 3);
        assert_eq!(summary.filled_lines, 2);
        assert_eq!(summary.skipped_lines, 0);
    }

    #[test]
    fn test_read_errors_are_fatal() {
        let input = vec![
            Ok(b"before".to_vec()),
            Err(io::Error::new(io::ErrorKind::Other, "device went away")),
            Ok(b"after".to_vec()),
        ];
        let mut transformer =
            TwinTransformer::new(input.into_iter(), FixedCoin(true), StepOptions::default());
        assert_eq!(next_line(&mut transformer), "before");
        assert!(matches!(transformer.next(), Some(Err(TwinError::Io(_)))));
        assert!(transformer.next().is_none());
    }

    #[test]
    fn test_run_copies_undecodable_text_outside_blocks() {
        let input: &[u8] = b"Image filename: caf\xe9.h5\nplain\n";
        let mut out = Vec::new();
        let summary = run(input, &mut out, FixedCoin(true), StepOptions::default()).unwrap();
        assert_eq!(out, input);
        assert_eq!(summary.lines_read, 2);
    }

    #[test]
    fn test_run_swaps_lines_with_undecodable_trailing_columns() {
        let input: &[u8] =
            b"Reflections measured after indexing\n1 2 3 \xff\xfe\nEnd of reflections\n";
        let mut out = Vec::new();
        run(input, &mut out, FixedCoin(true), StepOptions::default()).unwrap();
        assert_eq!(
            out,
            &b"flipped = true\nReflections measured after indexing\n\
                1 3 2 \xff\xfe\nEnd of reflections\n"[..]
        );
    }

    #[test]
    fn test_run_normalizes_terminators() {
        let input = "a\r\nReflections measured after indexing\r\n1 2 3\r\nEnd of reflections";
        let output = transform(input, FixedCoin(true), StepOptions::default());
        assert_eq!(
            output,
            "a\nflipped = true\nReflections measured after indexing\n1 3 2\nEnd of reflections\n"
        );
    }

    #[test]
    fn test_empty_input() {
        let mut out = Vec::new();
        let summary = run(&b""[..], &mut out, FixedCoin(true), StepOptions::default()).unwrap();
        assert!(out.is_empty());
        assert_eq!(summary, Summary::default());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_errors_are_fatal() {
        let result = run(
            "one\ntwo\n".as_bytes(),
            ClosedPipe,
            FixedCoin(false),
            StepOptions::default(),
        );
        assert!(matches!(
            result,
            Err(TwinError::Io(ref e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn test_flip_decisions_are_fair_across_blocks() {
        let block = "Reflections measured after indexing\n1 2 3\nEnd of reflections\n";
        let input = block.repeat(2_000);
        let mut out = Vec::new();
        let summary = run(
            input.as_bytes(),
            &mut out,
            RandomCoin::seeded(31),
            StepOptions::default(),
        )
        .unwrap();
        assert_eq!(summary.blocks, 2_000);
        assert!(
            (850..=1_150).contains(&summary.flipped_blocks),
            "flipped = {}",
            summary.flipped_blocks
        );
        assert_eq!(summary.swapped_lines, summary.flipped_blocks);
    }
}
