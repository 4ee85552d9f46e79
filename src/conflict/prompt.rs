//! Interactive arbiter reading answers from a line-oriented reader (stdin by default).
//!
//! Answers:
//! - `o` overwrite, `s` skip, `c` cancel
//! - `r NAME` rename to NAME
//! - `p` per-item plan (directories only), then one `NAME ACTION [NEW]` line per item,
//!   terminated by an empty line; a plan with no items cancels

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use super::decision::{ConflictDecision, ItemAction, PlannedItem};
use super::policy::{Arbiter, ConflictContext};

/// Parse a top-level answer. `None` means "ask again".
pub fn parse_answer(line: &str, is_directory: bool) -> Option<Answer> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "o" | "overwrite" => Some(Answer::Decided(ConflictDecision::Overwrite)),
        "s" | "skip" => Some(Answer::Decided(ConflictDecision::Skip)),
        "c" | "cancel" => Some(Answer::Decided(ConflictDecision::Cancel)),
        "r" | "rename" if !rest.is_empty() => Some(Answer::Decided(ConflictDecision::rename(rest))),
        "p" | "plan" if is_directory => Some(Answer::StartPlan),
        _ => None,
    }
}

/// Split off the last whitespace-separated word.
fn split_last(text: &str) -> Option<(&str, &str)> {
    let (head, last) = text.trim_end().rsplit_once(char::is_whitespace)?;
    Some((head.trim_end(), last))
}

/// Parse one plan line: `NAME skip|overwrite|rename NEW`.
/// Read from the right, so NAME may contain spaces; NEW may not.
pub fn parse_plan_line(line: &str) -> Option<PlannedItem> {
    let (head, last) = split_last(line.trim())?;
    if let Some((name, verb)) = split_last(head)
        && matches!(verb.to_ascii_lowercase().as_str(), "r" | "rename")
    {
        let new_name = last.to_string();
        return Some(PlannedItem::new(name, ItemAction::Rename { new_name }));
    }
    let action = match last.to_ascii_lowercase().as_str() {
        "s" | "skip" => ItemAction::Skip,
        "o" | "overwrite" => ItemAction::Overwrite,
        _ => return None,
    };
    Some(PlannedItem::new(head, action))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Decided(ConflictDecision),
    StartPlan,
}

pub struct PromptArbiter<R> {
    lines: Mutex<Lines<R>>,
}

impl PromptArbiter<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> PromptArbiter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    async fn read_plan(lines: &mut Lines<R>) -> Vec<PlannedItem> {
        let mut items = Vec::new();
        loop {
            eprint!("  item (NAME skip|overwrite|rename NEW, empty to finish): ");
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => break,
                Ok(Some(line)) => match parse_plan_line(&line) {
                    Some(item) => items.push(item),
                    None => eprintln!("  not understood: {line}"),
                },
                _ => break,
            }
        }
        items
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Arbiter for PromptArbiter<R> {
    async fn resolve(&self, context: &ConflictContext) -> ConflictDecision {
        let mut lines = self.lines.lock().await;
        let kind = if context.is_directory { "directory" } else { "file" };
        let options = if context.is_directory {
            "[o]verwrite, [s]kip, [c]ancel, [r]ename NAME, [p]lan per item"
        } else {
            "[o]verwrite, [s]kip, [c]ancel, [r]ename NAME"
        };
        loop {
            eprint!(
                "{kind} '{}' already exists in '{}'. {options}: ",
                context.item_name, context.destination
            );
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                // closed input: treat as cancel
                _ => return ConflictDecision::Cancel,
            };
            match parse_answer(&line, context.is_directory) {
                Some(Answer::Decided(decision)) => {
                    debug!(decision = decision.label(), "conflict answered");
                    return decision;
                }
                Some(Answer::StartPlan) => {
                    let items = Self::read_plan(&mut lines).await;
                    if items.is_empty() {
                        debug!("empty plan; cancelling");
                        return ConflictDecision::Cancel;
                    }
                    return ConflictDecision::DetailedPlan { items };
                }
                None => eprintln!("not understood: {}", line.trim()),
            }
        }
    }
}
