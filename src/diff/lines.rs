//! Myers longest-common-subsequence diff over lines.

use super::{ChunkKind, DiffChunk};

pub(super) fn diff_lines(base: &str, compare: &str) -> Vec<DiffChunk> {
    let base_lines: Vec<&str> = base.split_inclusive('\n').collect();
    let compare_lines: Vec<&str> = compare.split_inclusive('\n').collect();
    diff_slices(&base_lines, &compare_lines)
}

pub(super) fn diff_slices(a: &[&str], b: &[&str]) -> Vec<DiffChunk> {
    coalesce(myers_ops(a, b), a, b)
}

/// One edit-script step: the kind plus an index into `a` (for unchanged and
/// removed lines) or `b` (for added lines).
fn myers_ops(a: &[&str], b: &[&str]) -> Vec<(ChunkKind, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    if max == 0 {
        return Vec::new();
    }

    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 1];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'outer: for d in 0..=(max as isize) {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'outer;
            }
            k += 2;
        }
    }

    backtrack(&trace, n, m, offset)
}

fn backtrack(trace: &[Vec<isize>], n: isize, m: isize, offset: isize) -> Vec<(ChunkKind, usize)> {
    let mut ops = Vec::new();
    let mut x = n;
    let mut y = m;

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            ops.push((ChunkKind::Unchanged, (x - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                ops.push((ChunkKind::Added, (y - 1) as usize));
            } else {
                ops.push((ChunkKind::Removed, (x - 1) as usize));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    ops.reverse();
    ops
}

fn coalesce(ops: Vec<(ChunkKind, usize)>, a: &[&str], b: &[&str]) -> Vec<DiffChunk> {
    let mut chunks: Vec<DiffChunk> = Vec::new();
    for (kind, idx) in ops {
        let line = match kind {
            ChunkKind::Unchanged | ChunkKind::Removed => a[idx],
            ChunkKind::Added => b[idx],
        };
        match chunks.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(line),
            _ => chunks.push(DiffChunk {
                text: line.to_string(),
                kind,
            }),
        }
    }
    chunks
}
