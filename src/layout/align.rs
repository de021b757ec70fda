//! # Alignment Pass
//!
//! Runs once after layout. Shifts the block vertically, then each line
//! horizontally: either as a justified line, or as contiguous runs of equal
//! alignment so one visual line can mix left, centred and right text.

use crate::markup::{MarkupKind, MarkupToken};
use crate::model::TextElement;
use crate::style::HorizontalAlign;

use super::{LineMetrics, TextLayout};

/// Adjust token positions for the element's vertical alignment, per-run
/// horizontal alignment and justification.
pub fn align(element: &TextElement, tokens: &mut [MarkupToken], layout: &TextLayout) {
    let aligning: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].aligns()).collect();
    let Some(&first) = aligning.first() else {
        return;
    };

    let mut y_offset = element
        .style
        .vertical_align
        .offset(layout.content_height, element.height);
    let first_y = tokens[first].target.y;
    if first_y + y_offset < 0.0 {
        // Too tall: chop from the top rather than push the start above the element.
        y_offset = -first_y;
    }

    let lines = group_by_line(tokens, &aligning);
    let last_group = lines.len().saturating_sub(1);

    for (group_idx, line_tokens) in lines.iter().enumerate() {
        let line_number = tokens[line_tokens[0]].line_number;
        let Some(metrics) = layout.line(line_number) else {
            shift(tokens, line_tokens, 0.0, y_offset);
            continue;
        };

        if element.style.justified {
            // The last line and lines ending in a manual break stay left.
            if group_idx != last_group && continues_paragraph(tokens, line_tokens) {
                justify(tokens, line_tokens, metrics);
            }
            shift(tokens, line_tokens, 0.0, y_offset);
            continue;
        }

        for run in split_runs(tokens, line_tokens) {
            let dx = run_offset(tokens, &run, metrics);
            shift(tokens, &run, dx, y_offset);
        }
    }
}

/// Split aligning token indices into per-line groups.
fn group_by_line(tokens: &[MarkupToken], aligning: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &i in aligning {
        match groups.last_mut() {
            Some(group) if tokens[group[0]].line_number == tokens[i].line_number => group.push(i),
            _ => groups.push(vec![i]),
        }
    }
    groups
}

/// Split one line into contiguous runs sharing a horizontal alignment.
fn split_runs(tokens: &[MarkupToken], line: &[usize]) -> Vec<Vec<usize>> {
    let mut runs: Vec<Vec<usize>> = Vec::new();
    for &i in line {
        match runs.last_mut() {
            Some(run) if tokens[run[0]].alignment == tokens[i].alignment => run.push(i),
            _ => runs.push(vec![i]),
        }
    }
    runs
}

/// Tokens that take part in horizontal extent: everything but spaces and
/// non-advancing background images.
fn is_content(token: &MarkupToken) -> bool {
    matches!(token.kind, MarkupKind::Text(_) | MarkupKind::Image(_))
}

fn run_offset(tokens: &[MarkupToken], run: &[usize], line: &LineMetrics) -> f64 {
    let alignment = tokens[run[0]].alignment;
    if alignment == HorizontalAlign::Left {
        return 0.0;
    }
    // Trailing spaces don't count towards the run's right edge.
    let Some(&last) = run.iter().rev().find(|&&i| is_content(&tokens[i])) else {
        return 0.0;
    };
    let right_edge = tokens[last].target.right();
    match alignment {
        HorizontalAlign::Left => 0.0,
        HorizontalAlign::Center => (line.right - right_edge) / 2.0,
        HorizontalAlign::Right => line.right - right_edge,
    }
}

fn shift(tokens: &mut [MarkupToken], indices: &[usize], dx: f64, dy: f64) {
    for &i in indices {
        tokens[i].target.x += dx;
        tokens[i].target.y += dy;
    }
}

/// Whether the paragraph carries on past this line. Looks at the full token
/// stream after the line's last token: an explicit newline before any more
/// content means the line ends its paragraph.
fn continues_paragraph(tokens: &[MarkupToken], line: &[usize]) -> bool {
    let Some(&last) = line.last() else {
        return false;
    };
    for token in &tokens[last + 1..] {
        match &token.kind {
            MarkupKind::Newline => return false,
            MarkupKind::Text(t) if t.trim().is_empty() => continue,
            _ if token.aligns() && !token.is_space() => return true,
            _ => continue,
        }
    }
    false
}

/// Spread the line's content tokens so they span from its start to its
/// right edge. Space tokens are left where layout put them and their width
/// is ignored. A line with a single content token is left alone.
fn justify(tokens: &mut [MarkupToken], line: &[usize], metrics: &LineMetrics) {
    let content: Vec<usize> = line.iter().copied().filter(|&i| is_content(&tokens[i])).collect();
    if content.len() < 2 {
        return;
    }
    let total: f64 = content.iter().map(|&i| tokens[i].target.width).sum();
    let extra = (metrics.right - metrics.start_x) - total;
    let gap = extra / (content.len() - 1) as f64;

    let mut x = metrics.start_x;
    for &i in &content {
        tokens[i].target.x = x + tokens[i].placement_offset();
        x += tokens[i].target.width + gap;
    }
}
