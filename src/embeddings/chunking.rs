//! Turning parsed structure into embedding units.
//!
//! Classes are embedded whole unless they exceed `max_class_lines`, in which
//! case they are cut into overlapping line windows. Functions are embedded
//! whole unless their lines already sit inside their class or an enclosing
//! function.

use serde::{Deserialize, Serialize};

use crate::config::ChunkingConfig;
use crate::parser::ParseResult;
use crate::storage::EmbeddingKind;

/// Inclusive, 1-indexed line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWindow {
    pub start: usize,
    pub end: usize,
}

/// Cut `[start, end]` into windows of `window` lines that overlap by
/// `overlap` lines. The last window is clipped to `end`.
pub fn sliding_windows(start: usize, end: usize, window: usize, overlap: usize) -> Vec<LineWindow> {
    if end < start {
        return Vec::new();
    }
    let window = window.max(1);
    let step = window.saturating_sub(overlap).max(1);

    let mut windows = Vec::new();
    let mut s = start;
    loop {
        let e = (s + window - 1).min(end);
        windows.push(LineWindow { start: s, end: e });
        if e >= end {
            break;
        }
        s += step;
    }
    windows
}

/// One piece of text headed for the embedding backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingUnit {
    pub kind: EmbeddingKind,
    pub name: String,
    pub text: String,
    pub line_start: usize,
    pub line_end: usize,
    /// 1-based position among the class's chunks
    pub chunk_index: Option<usize>,
    pub total_chunks: Option<usize>,
}

/// Lines `[start, end]` (1-indexed, inclusive) of `content`, clipped to what
/// exists.
pub fn extract_lines(content: &str, start: usize, end: usize) -> String {
    let start = start.max(1);
    if end < start {
        return String::new();
    }
    content
        .lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Plan every unit for one file: classes first, then uncovered functions.
/// Units whose text is blank are dropped.
pub fn plan_units(parse: &ParseResult, content: &str, config: &ChunkingConfig) -> Vec<EmbeddingUnit> {
    let mut units = Vec::new();

    for class in &parse.classes {
        let span = class.line_end.saturating_sub(class.line_start);
        if span <= config.max_class_lines {
            units.push(EmbeddingUnit {
                kind: EmbeddingKind::Class,
                name: class.name.clone(),
                text: extract_lines(content, class.line_start, class.line_end),
                line_start: class.line_start,
                line_end: class.line_end,
                chunk_index: None,
                total_chunks: None,
            });
            continue;
        }

        let windows = sliding_windows(
            class.line_start,
            class.line_end,
            config.window_lines,
            config.overlap_lines,
        );
        let total = windows.len();
        for (i, w) in windows.into_iter().enumerate() {
            units.push(EmbeddingUnit {
                kind: EmbeddingKind::ClassChunk,
                name: format!("{}_chunk_{}", class.name, i + 1),
                text: extract_lines(content, w.start, w.end),
                line_start: w.start,
                line_end: w.end,
                chunk_index: Some(i + 1),
                total_chunks: Some(total),
            });
        }
    }

    for func in parse.uncovered_functions() {
        units.push(EmbeddingUnit {
            kind: EmbeddingKind::Function,
            name: func.name.clone(),
            text: extract_lines(content, func.line_start, func.line_end),
            line_start: func.line_start,
            line_end: func.line_end,
            chunk_index: None,
            total_chunks: None,
        });
    }

    units.retain(|u| !u.text.trim().is_empty());
    units
}
