//! Transcript extraction
//!
//! Finds interactive transcript blocks in documentation text:
//!
//! ```text
//! >>> x = 1 +
//! ... 2
//! >>> x
//! 3
//! ```
//!
//! A block runs until a blank line. Lines after a prompt that are not
//! prompts are that statement's expected output.

use crate::models::{ExampleStep, Expected, Transcript};

pub const PROMPT: &str = ">>>";
pub const CONTINUATION: &str = "...";
/// First expected-output line of a statement that must raise
pub const TRACEBACK_HEADER: &str = "Traceback (most recent call last):";
/// Prose line marking the following block as not executable
pub const NO_RUN_MARKER: &str = ".. no-run";
/// Inline directive dropping a single statement
pub const SKIP_DIRECTIVE: &str = "doctest: +SKIP";

/// One extracted transcript and where it starts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// Line of the first prompt (1-based)
    pub line: usize,
    pub transcript: Transcript,
}

struct PendingStep {
    statement: String,
    line: usize,
    output: Vec<String>,
}

struct OpenBlock {
    indent: usize,
    line: usize,
    no_run: bool,
    steps: Vec<ExampleStep>,
    pending: Option<PendingStep>,
}

impl OpenBlock {
    fn finish_step(&mut self) {
        let Some(step) = self.pending.take() else {
            return;
        };
        if step.statement.contains(SKIP_DIRECTIVE) {
            return;
        }
        self.steps.push(ExampleStep {
            statement: step.statement,
            expected: expectation(&step.output),
            line: step.line,
        });
    }

    fn finish(mut self) -> Option<Block> {
        self.finish_step();
        if self.no_run || self.steps.is_empty() {
            return None;
        }
        Some(Block {
            line: self.line,
            transcript: Transcript { steps: self.steps },
        })
    }
}

fn expectation(output: &[String]) -> Expected {
    match output.first() {
        Some(first) if first.trim_end() == TRACEBACK_HEADER => {
            let error_line = output[1..]
                .iter()
                .rev()
                .find(|l| !l.starts_with(char::is_whitespace) && !l.trim().is_empty())
                .cloned()
                .unwrap_or_default();
            Expected::Raises(error_line.trim_end().to_string())
        }
        _ => Expected::Output(output.join("\n")),
    }
}

/// Text after a marker when the line starts with it, followed by a space or nothing
fn after_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

/// Indentation width in characters
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// `line` without at most `width` leading whitespace characters
fn dedent(line: &str, width: usize) -> &str {
    let start = line
        .char_indices()
        .take(width)
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or_else(|| {
            line.char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(line.len())
        });
    &line[start..]
}

/// Extract every executable transcript block from `text`
pub fn extract(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut last_prose: Option<String> = None;

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        let content = line.trim_start();
        let indent = leading_whitespace(line);

        if let Some(statement) = after_marker(content, PROMPT) {
            let block = open.get_or_insert_with(|| OpenBlock {
                indent,
                line: number,
                no_run: last_prose.take().is_some_and(|p| p == NO_RUN_MARKER),
                steps: Vec::new(),
                pending: None,
            });
            block.finish_step();
            block.pending = Some(PendingStep {
                statement: statement.to_string(),
                line: number,
                output: Vec::new(),
            });
            continue;
        }

        if content.is_empty() {
            if let Some(block) = open.take() {
                blocks.extend(block.finish());
            }
            continue;
        }

        match open.as_mut().and_then(|b| {
            let indent = b.indent;
            b.pending.as_mut().map(|p| (indent, p))
        }) {
            Some((block_indent, pending)) => {
                if pending.output.is_empty() {
                    if let Some(more) = after_marker(content, CONTINUATION) {
                        pending.statement.push('\n');
                        pending.statement.push_str(more);
                        continue;
                    }
                }
                pending
                    .output
                    .push(dedent(line, block_indent).trim_end().to_string());
            }
            None => last_prose = Some(content.trim_end().to_string()),
        }
    }

    if let Some(block) = open.take() {
        blocks.extend(block.finish());
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(text: &str) -> Expected {
        Expected::Output(text.to_string())
    }

    #[test]
    fn test_single_block() {
        let doc = "Adds numbers.\n\n    >>> 1+2\n    3\n    >>> x = 5\n    >>> x\n    5\n";
        let blocks = extract(doc);
        assert_eq!(blocks.len(), 1);
        let steps = &blocks[0].transcript.steps;
        assert_eq!(blocks[0].line, 3);
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].statement, "1+2");
        assert_eq!(steps[0].expected, output("3"));
        assert_eq!(steps[1].expected, output(""));
        assert_eq!(steps[2].line, 6);
    }

    #[test]
    fn test_blank_line_and_prose_split_blocks() {
        let doc = ">>> 1\n1\n\nSome prose.\n>>> 2\n2\n";
        let blocks = extract(doc);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].line, 5);
    }

    #[test]
    fn test_continuation_lines() {
        let doc = ">>> x = [1,\n... 2]\n>>> len(x)\n2\n";
        let blocks = extract(doc);
        assert_eq!(blocks[0].transcript.steps[0].statement, "x = [1,\n2]");
    }

    #[test]
    fn test_traceback_expectation() {
        let doc = concat!(
            ">>> 1/0\n",
            "Traceback (most recent call last):\n",
            "  ...\n",
            "ZeroDivisionError: division by zero\n",
        );
        let blocks = extract(doc);
        assert_eq!(
            blocks[0].transcript.steps[0].expected,
            Expected::Raises("ZeroDivisionError: division by zero".to_string())
        );
    }

    #[test]
    fn test_no_run_marker_skips_block() {
        let doc = ".. no-run\n\n>>> play()\n\n>>> 1\n1\n";
        let blocks = extract(doc);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].transcript.steps[0].statement, "1");
    }

    #[test]
    fn test_skip_directive_drops_statement() {
        let doc = ">>> show()  # doctest: +SKIP\n>>> 2\n2\n";
        let blocks = extract(doc);
        assert_eq!(blocks[0].transcript.steps.len(), 1);

        let all_skipped = ">>> show()  # doctest: +SKIP\n";
        assert!(extract(all_skipped).is_empty());
    }

    #[test]
    fn test_multiline_expected_output() {
        let doc = "  >>> print('a')\n  a\n  >>> print('b\\nc')\n  b\n  c\n";
        let blocks = extract(doc);
        assert_eq!(blocks[0].transcript.steps[1].expected, output("b\nc"));
    }

    #[test]
    fn test_wide_whitespace_indent() {
        let blocks = extract("  >>> 'a'\n\u{3000}'a'\n");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].transcript.steps[0].expected, output("'a'"));

        let blocks = extract("    >>> 'a'\n\u{3000}\u{3000}\u{3000}  'a'\n");
        assert_eq!(blocks[0].transcript.steps[0].expected, output(" 'a'"));
    }

    #[test]
    fn test_dedent_stops_at_content() {
        assert_eq!(dedent("  x", 4), "x");
        assert_eq!(dedent("\u{3000}  x", 2), " x");
        assert_eq!(dedent("", 3), "");
    }

    #[test]
    fn test_prompt_without_space_is_prose() {
        assert!(extract(">>>not a prompt\n").is_empty());
    }
}
