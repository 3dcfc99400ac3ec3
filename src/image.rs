//! Image feature adapter: reduces a 28x28 raster to the 399 categorical
//! feature-code views the recognition core actually consumes, then
//! plurality-votes a final digit across independent per-view recognitions.
//!
//! The view geometry (3 projections x 7 contrast thresholds, plus panelled
//! sub-views, totalling 399) is grounded on `NdbCreateImage.c`'s view count
//! comment. The per-view descriptors below are real statistics computed
//! from pixel data, not bit-exact ports of the original's fixed-point
//! curviness/cavity analysis, which the core spec explicitly scopes out at
//! the pixel-math level.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::orchestrator::Engine;
use crate::vocab::VocabularyStore;

pub const IMAGE_SIDE: usize = 28;
pub const VIEW_COUNT: usize = 399;
const CONTRAST_THRESHOLDS: [u8; 7] = [32, 64, 96, 128, 160, 192, 224];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Row,
    Column,
    Diagonal,
}

#[derive(Debug, Clone, Copy)]
struct Panel {
    r0: usize,
    c0: usize,
    size: usize,
}

fn panels() -> Vec<Panel> {
    // Nine overlapping panels tiling the image in a 3x3 grid, sized so
    // neighbouring panels overlap by half their extent.
    let mut out = Vec::with_capacity(9);
    for row in 0..3 {
        for col in 0..3 {
            out.push(Panel { r0: row * 6, c0: col * 6, size: 16 });
        }
    }
    out
}

/// One of the 399 views: a projection, a contrast threshold, and an
/// optional sub-panel (None = whole image).
struct View {
    projection: Projection,
    threshold: u8,
    panel: Option<Panel>,
}

fn enumerate_views() -> Vec<View> {
    let mut views = Vec::with_capacity(VIEW_COUNT);
    for &projection in &[Projection::Row, Projection::Column, Projection::Diagonal] {
        for &threshold in &CONTRAST_THRESHOLDS {
            views.push(View { projection, threshold, panel: None });
        }
    }
    for &projection in &[Projection::Row, Projection::Column] {
        for &threshold in &CONTRAST_THRESHOLDS {
            for panel in panels() {
                views.push(View { projection, threshold, panel: Some(panel) });
            }
        }
    }
    debug_assert_eq!(views.len(), VIEW_COUNT);
    views
}

fn binarize(pixels: &[[u8; IMAGE_SIDE]; IMAGE_SIDE], threshold: u8, panel: Option<Panel>) -> Vec<Vec<bool>> {
    let (r0, c0, size) = match panel {
        Some(p) => (p.r0, p.c0, p.size),
        None => (0, 0, IMAGE_SIDE),
    };
    let mut grid = vec![vec![false; size]; size];
    for r in 0..size {
        for c in 0..size {
            let pr = (r0 + r).min(IMAGE_SIDE - 1);
            let pc = (c0 + c).min(IMAGE_SIDE - 1);
            grid[r][c] = pixels[pr][pc] >= threshold;
        }
    }
    grid
}

/// The ten per-view descriptors, each bucketed 0..9: curviness,
/// interior-cavity count, slant, girth, longest-row location, top/bottom
/// weight, left/right weight, cavity location, pedestal-vs-bulge, and
/// longest-line direction.
fn describe_view(grid: &[Vec<bool>], projection: Projection) -> [u8; 10] {
    let size = grid.len();
    let total_on: usize = grid.iter().flatten().filter(|&&b| b).count();
    let mut row_counts = vec![0usize; size];
    let mut col_counts = vec![0usize; size];
    for r in 0..size {
        for c in 0..size {
            if grid[r][c] {
                row_counts[r] += 1;
                col_counts[c] += 1;
            }
        }
    }

    let curviness = edge_transition_rate(grid);
    let cavities = count_interior_cavities(grid).min(9) as u8;
    let slant = slant_bucket(grid, size);
    let girth = bucket_ratio(row_counts.iter().copied().max().unwrap_or(0) as f64, size as f64);
    let longest_row = row_counts.iter().enumerate().max_by_key(|(_, &v)| v).map(|(i, _)| i).unwrap_or(0);
    let longest_row_bucket = bucket_ratio(longest_row as f64, size.max(1) as f64);
    let top_half: usize = row_counts[..size / 2].iter().sum();
    let bottom_half: usize = row_counts[size / 2..].iter().sum();
    let top_bottom = weight_bucket(top_half, bottom_half);
    let left_half: usize = col_counts[..size / 2].iter().sum();
    let right_half: usize = col_counts[size / 2..].iter().sum();
    let left_right = weight_bucket(left_half, right_half);
    let cavity_location = if cavities == 0 { 0 } else { bucket_ratio(centroid_row(grid) as f64, size as f64) };
    let pedestal_vs_bulge = weight_bucket(bottom_half, top_half);
    let longest_line_direction = match projection {
        Projection::Row => 0u8,
        Projection::Column => 3u8,
        Projection::Diagonal => 6u8,
    } + (total_on % 3) as u8;

    [
        curviness,
        cavities,
        slant,
        girth,
        longest_row_bucket,
        top_bottom,
        left_right,
        cavity_location,
        pedestal_vs_bulge,
        longest_line_direction.min(9),
    ]
}

fn bucket_ratio(value: f64, max: f64) -> u8 {
    if max <= 0.0 {
        return 0;
    }
    ((value / max) * 9.0).round().clamp(0.0, 9.0) as u8
}

fn weight_bucket(a: usize, b: usize) -> u8 {
    let total = (a + b).max(1) as f64;
    bucket_ratio(a as f64, total)
}

fn edge_transition_rate(grid: &[Vec<bool>]) -> u8 {
    let size = grid.len();
    let mut transitions = 0usize;
    let mut total = 0usize;
    for r in 0..size {
        for c in 1..size {
            total += 1;
            if grid[r][c] != grid[r][c - 1] {
                transitions += 1;
            }
        }
    }
    bucket_ratio(transitions as f64, total.max(1) as f64)
}

fn slant_bucket(grid: &[Vec<bool>], size: usize) -> u8 {
    let (mut sum_r, mut sum_c, mut n) = (0i64, 0i64, 0i64);
    for r in 0..size {
        for c in 0..size {
            if grid[r][c] {
                sum_r += r as i64;
                sum_c += c as i64;
                n += 1;
            }
        }
    }
    if n == 0 {
        return 4;
    }
    let centroid_c = sum_c as f64 / n as f64;
    let expected_center = (size as f64 - 1.0) / 2.0;
    let offset = centroid_c - expected_center;
    let _ = sum_r;
    bucket_ratio(offset + expected_center, size as f64 - 1.0)
}

fn centroid_row(grid: &[Vec<bool>]) -> usize {
    let size = grid.len();
    let (mut sum_r, mut n) = (0i64, 0i64);
    for r in 0..size {
        for c in 0..size {
            if grid[r][c] {
                sum_r += r as i64;
                n += 1;
            }
        }
    }
    if n == 0 {
        0
    } else {
        (sum_r / n) as usize
    }
}

/// Background regions fully enclosed by foreground pixels (a flood fill
/// from the border marks reachable background; anything unreached is an
/// interior cavity).
fn count_interior_cavities(grid: &[Vec<bool>]) -> usize {
    let size = grid.len();
    if size == 0 {
        return 0;
    }
    let mut reached = vec![vec![false; size]; size];
    let mut stack = Vec::new();
    for i in 0..size {
        for (r, c) in [(0, i), (size - 1, i), (i, 0), (i, size - 1)] {
            if !grid[r][c] && !reached[r][c] {
                reached[r][c] = true;
                stack.push((r, c));
            }
        }
    }
    while let Some((r, c)) = stack.pop() {
        for (dr, dc) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
            let nr = r as i32 + dr;
            let nc = c as i32 + dc;
            if nr < 0 || nc < 0 || nr as usize >= size || nc as usize >= size {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if !grid[nr][nc] && !reached[nr][nc] {
                reached[nr][nc] = true;
                stack.push((nr, nc));
            }
        }
    }
    let mut visited = reached.clone();
    let mut cavities = 0;
    for r in 0..size {
        for c in 0..size {
            if !grid[r][c] && !visited[r][c] {
                cavities += 1;
                let mut region = vec![(r, c)];
                visited[r][c] = true;
                while let Some((rr, cc)) = region.pop() {
                    for (dr, dc) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                        let nr = rr as i32 + dr;
                        let nc = cc as i32 + dc;
                        if nr < 0 || nc < 0 || nr as usize >= size || nc as usize >= size {
                            continue;
                        }
                        let (nr, nc) = (nr as usize, nc as usize);
                        if !grid[nr][nc] && !visited[nr][nc] {
                            visited[nr][nc] = true;
                            region.push((nr, nc));
                        }
                    }
                }
            }
        }
    }
    cavities
}

/// Produce the 399 per-view feature-code streams for one 28x28 image.
pub fn extract_views(pixels: &[[u8; IMAGE_SIDE]; IMAGE_SIDE]) -> Vec<Vec<u16>> {
    enumerate_views()
        .iter()
        .enumerate()
        .map(|(view_index, view)| {
            let grid = binarize(pixels, view.threshold, view.panel);
            let codes = describe_view(&grid, view.projection);
            let offset = 100 * view_index as u16;
            codes.iter().map(|&c| offset + c as u16).collect()
        })
        .collect()
}

/// Recognize a digit by running one recognition per view against that
/// view's own store, then plurality-voting across the resulting surrogate
/// labels. Ties are broken by first-seen digit in iteration order, matching
/// the original's naive plurality vote.
pub fn recognize_digit(stores: &[VocabularyStore; VIEW_COUNT], pixels: &[[u8; IMAGE_SIDE]; IMAGE_SIDE]) -> Option<String> {
    let views = extract_views(pixels);
    let votes: Vec<Option<String>> = stores
        .par_iter()
        .zip(views.par_iter())
        .map(|(store, codes)| {
            let engine = Engine::new(store.clone());
            let outcome = engine.recognize_features(codes).ok()?;
            let best = outcome.winners.first()?;
            let pattern = store.pattern(best.first()?.pattern)?;
            pattern.surrogate.first().cloned().or_else(|| Some(pattern.name.clone()))
        })
        .collect();

    let mut tally: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();
    for vote in votes.into_iter().flatten() {
        if !tally.contains_key(&vote) {
            first_seen.push(vote.clone());
        }
        *tally.entry(vote).or_insert(0) += 1;
    }
    // `Iterator::max_by_key` keeps the *last* tied maximum, which would
    // invert the first-seen tie-break; scan manually to keep the first.
    let mut best: Option<(String, usize)> = None;
    for label in first_seen {
        let count = tally[&label];
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_views_produces_399_streams_of_ten_codes() {
        let pixels = [[0u8; IMAGE_SIDE]; IMAGE_SIDE];
        let views = extract_views(&pixels);
        assert_eq!(views.len(), VIEW_COUNT);
        for v in &views {
            assert_eq!(v.len(), 10);
        }
    }

    #[test]
    fn view_codes_are_distinct_across_views() {
        let mut pixels = [[0u8; IMAGE_SIDE]; IMAGE_SIDE];
        for r in 10..18 {
            for c in 10..18 {
                pixels[r][c] = 255;
            }
        }
        let views = extract_views(&pixels);
        assert_ne!(views[0][0], views[1][0]);
    }

    #[test]
    fn count_interior_cavities_detects_a_ring() {
        let mut grid = vec![vec![false; 5]; 5];
        for r in 0..5 {
            for c in 0..5 {
                if r == 0 || r == 4 || c == 0 || c == 4 {
                    grid[r][c] = true;
                }
            }
        }
        assert_eq!(count_interior_cavities(&grid), 1);
    }
}
