//! Terminal front ends for the aggregator.
//!
//! Chosen once at startup: `Live` redraws a fixed region in place on a TTY,
//! `Plain` appends the overall line whenever it changes (logs, pipes).

use std::io::{self, IsTerminal, Write};

use super::ProgressAggregator;

#[derive(Debug)]
pub enum Display {
    Live {
        /// Per-transfer lines to draw under the overall bar.
        max_lines: usize,
        /// Lines drawn by the previous frame, erased before the next.
        drawn: usize,
    },
    Plain {
        last: Option<String>,
    },
}

impl Display {
    pub fn live(max_lines: usize) -> Self {
        Display::Live {
            max_lines,
            drawn: 0,
        }
    }

    pub fn plain() -> Self {
        Display::Plain { last: None }
    }

    /// `Live` when stdout is a terminal, `Plain` otherwise.
    pub fn for_stdout(max_lines: usize) -> Self {
        if io::stdout().is_terminal() {
            Self::live(max_lines)
        } else {
            Self::plain()
        }
    }

    /// Write one frame for the current aggregator state.
    pub fn render<W: Write>(&mut self, out: &mut W, progress: &ProgressAggregator) -> io::Result<()> {
        match self {
            Display::Live { max_lines, drawn } => {
                let mut frame = vec![progress.overall_line()];
                frame.extend(progress.active_transfer_lines(*max_lines));
                if *drawn > 0 {
                    // Cursor to the start of the old region, clear to end of screen.
                    write!(out, "\x1b[{}F\x1b[J", drawn)?;
                }
                for line in &frame {
                    writeln!(out, "{}", line)?;
                }
                *drawn = frame.len();
            }
            Display::Plain { last } => {
                let line = progress.overall_line();
                if last.as_deref() != Some(line.as_str()) {
                    writeln!(out, "{}", line)?;
                    *last = Some(line);
                }
            }
        }
        out.flush()
    }
}
