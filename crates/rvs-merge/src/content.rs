//! File-level three-way merge.
//!
//! Base→ours and base→theirs edit scripts are turned into change regions
//! over the base; non-overlapping regions interleave cleanly, overlapping
//! regions with different replacement text become conflict hunks delimited
//! by `<<<<<<<`/`=======`/`>>>>>>>` markers (with an optional `|||||||`
//! base block).

use rvs_diff::algorithm::{diff_edits, split_lines, Edit, EditOp};

/// Marker labels, shown after `<<<<<<<`, `|||||||`, and `>>>>>>>`.
#[derive(Debug, Clone, Copy)]
pub struct MergeLabels<'a> {
    pub ours: &'a str,
    pub base: &'a str,
    pub theirs: &'a str,
}

impl Default for MergeLabels<'_> {
    fn default() -> Self {
        Self {
            ours: "ours",
            base: "base",
            theirs: "theirs",
        }
    }
}

/// Result of a file-level merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentMerge {
    Clean(Vec<u8>),
    Conflict { content: Vec<u8>, conflicts: usize },
}

impl ContentMerge {
    pub fn is_clean(&self) -> bool {
        matches!(self, ContentMerge::Clean(_))
    }

    pub fn content(&self) -> &[u8] {
        match self {
            ContentMerge::Clean(c) => c,
            ContentMerge::Conflict { content, .. } => content,
        }
    }
}

/// Merge `ours` and `theirs` against their common `base`.
///
/// `include_base` adds the `||||||| <label>` middle block to conflict hunks.
pub fn merge_blobs(
    base: &[u8],
    ours: &[u8],
    theirs: &[u8],
    labels: &MergeLabels<'_>,
    include_base: bool,
) -> ContentMerge {
    // The trivial resolutions need no line work.
    if ours == theirs {
        return ContentMerge::Clean(ours.to_vec());
    }
    if base == ours {
        return ContentMerge::Clean(theirs.to_vec());
    }
    if base == theirs {
        return ContentMerge::Clean(ours.to_vec());
    }

    let base_lines = split_lines(base);
    let ours_lines = split_lines(ours);
    let theirs_lines = split_lines(theirs);

    let ours_regions = change_regions(&diff_edits(base, ours));
    let theirs_regions = change_regions(&diff_edits(base, theirs));

    interleave(
        &base_lines,
        &ours_lines,
        &theirs_lines,
        &ours_regions,
        &theirs_regions,
        labels,
        include_base,
    )
}

/// A contiguous replacement relative to the base: base lines
/// `[base_start, base_start + base_len)` become side lines
/// `[new_start, new_start + new_len)`.
#[derive(Debug, Clone, Copy)]
struct Region {
    base_start: usize,
    base_len: usize,
    new_start: usize,
    new_len: usize,
}

impl Region {
    fn base_end(&self) -> usize {
        self.base_start + self.base_len
    }
}

fn change_regions(edits: &[Edit]) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut i = 0;
    while i < edits.len() {
        if edits[i].op == EditOp::Equal {
            i += 1;
            continue;
        }
        let base_start = edits[i].old_index;
        let new_start = edits[i].new_index;
        let mut base_end = base_start;
        let mut new_end = new_start;
        while i < edits.len() && edits[i].op != EditOp::Equal {
            match edits[i].op {
                EditOp::Delete => base_end = edits[i].old_index + 1,
                EditOp::Insert => new_end = edits[i].new_index + 1,
                EditOp::Equal => unreachable!(),
            }
            i += 1;
        }
        regions.push(Region {
            base_start,
            base_len: base_end - base_start,
            new_start,
            new_len: new_end - new_start,
        });
    }
    regions
}

#[allow(clippy::too_many_arguments)]
fn interleave(
    base_lines: &[&[u8]],
    ours_lines: &[&[u8]],
    theirs_lines: &[&[u8]],
    ours_regions: &[Region],
    theirs_regions: &[Region],
    labels: &MergeLabels<'_>,
    include_base: bool,
) -> ContentMerge {
    let mut out: Vec<u8> = Vec::new();
    let mut conflicts = 0;
    let mut base_pos = 0;
    let mut oi = 0;
    let mut ti = 0;

    while oi < ours_regions.len() || ti < theirs_regions.len() {
        match (ours_regions.get(oi), theirs_regions.get(ti)) {
            (Some(o), t) if t.is_none() || o.base_end() < t.unwrap().base_start => {
                copy_lines(&mut out, base_lines, base_pos, o.base_start);
                copy_lines(&mut out, ours_lines, o.new_start, o.new_start + o.new_len);
                base_pos = o.base_end();
                oi += 1;
            }
            (o, Some(t)) if o.is_none() || t.base_end() < o.unwrap().base_start => {
                copy_lines(&mut out, base_lines, base_pos, t.base_start);
                copy_lines(&mut out, theirs_lines, t.new_start, t.new_start + t.new_len);
                base_pos = t.base_end();
                ti += 1;
            }
            (Some(first), Some(_)) | (Some(first), None) | (None, Some(first)) => {
                // Overlapping (or touching) regions: widen to cover every
                // region from either side that intersects the span.
                let mut span_start = first.base_start;
                let mut span_end = first.base_end();
                loop {
                    let mut grew = false;
                    while let Some(o) = ours_regions.get(oi) {
                        if o.base_start <= span_end && o.base_end() >= span_start {
                            span_start = span_start.min(o.base_start);
                            span_end = span_end.max(o.base_end());
                            oi += 1;
                            grew = true;
                        } else {
                            break;
                        }
                    }
                    while let Some(t) = theirs_regions.get(ti) {
                        if t.base_start <= span_end && t.base_end() >= span_start {
                            span_start = span_start.min(t.base_start);
                            span_end = span_end.max(t.base_end());
                            ti += 1;
                            grew = true;
                        } else {
                            break;
                        }
                    }
                    if !grew {
                        break;
                    }
                }

                copy_lines(&mut out, base_lines, base_pos, span_start);

                let ours_text = side_text(ours_lines, base_lines, ours_regions, span_start, span_end);
                let theirs_text =
                    side_text(theirs_lines, base_lines, theirs_regions, span_start, span_end);

                if ours_text == theirs_text {
                    out.extend_from_slice(&ours_text);
                } else {
                    conflicts += 1;
                    emit_conflict(
                        &mut out,
                        &ours_text,
                        &theirs_text,
                        base_lines,
                        span_start,
                        span_end,
                        labels,
                        include_base,
                    );
                }
                base_pos = span_end;
            }
            (None, None) => unreachable!(),
        }
    }

    copy_lines(&mut out, base_lines, base_pos, base_lines.len());

    if conflicts > 0 {
        ContentMerge::Conflict {
            content: out,
            conflicts,
        }
    } else {
        ContentMerge::Clean(out)
    }
}

/// Reconstruct what one side holds for the base span `[start, end)`: its
/// replacement text for regions inside the span, base lines elsewhere.
fn side_text(
    side_lines: &[&[u8]],
    base_lines: &[&[u8]],
    regions: &[Region],
    start: usize,
    end: usize,
) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pos = start;
    for region in regions {
        if region.base_end() < start || region.base_start > end {
            continue;
        }
        copy_lines(&mut out, base_lines, pos, region.base_start.max(pos));
        copy_lines(
            &mut out,
            side_lines,
            region.new_start,
            region.new_start + region.new_len,
        );
        pos = region.base_end().max(pos);
    }
    copy_lines(&mut out, base_lines, pos.min(end), end);
    out
}

fn copy_lines(out: &mut Vec<u8>, lines: &[&[u8]], from: usize, to: usize) {
    for line in lines.iter().take(to.min(lines.len())).skip(from) {
        out.extend_from_slice(line);
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_conflict(
    out: &mut Vec<u8>,
    ours_text: &[u8],
    theirs_text: &[u8],
    base_lines: &[&[u8]],
    span_start: usize,
    span_end: usize,
    labels: &MergeLabels<'_>,
    include_base: bool,
) {
    out.extend_from_slice(b"<<<<<<< ");
    out.extend_from_slice(labels.ours.as_bytes());
    out.push(b'\n');
    push_block(out, ours_text);

    if include_base {
        out.extend_from_slice(b"||||||| ");
        out.extend_from_slice(labels.base.as_bytes());
        out.push(b'\n');
        let mut base_text = Vec::new();
        copy_lines(&mut base_text, base_lines, span_start, span_end);
        push_block(out, &base_text);
    }

    out.extend_from_slice(b"=======\n");
    push_block(out, theirs_text);

    out.extend_from_slice(b">>>>>>> ");
    out.extend_from_slice(labels.theirs.as_bytes());
    out.push(b'\n');
}

/// Append a block, guaranteeing it ends in a newline so the next marker
/// starts a fresh line.
fn push_block(out: &mut Vec<u8>, block: &[u8]) {
    out.extend_from_slice(block);
    if !block.is_empty() && !block.ends_with(b"\n") {
        out.push(b'\n');
    }
}
