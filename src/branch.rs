//! Branch Assembler: glues surviving candidates into complete
//! non-overlapping chains spanning the input, forking wherever more than
//! one candidate can extend a chain and pruning the pool once it grows
//! past the tractability thresholds.

use std::collections::HashSet;

use crate::filter::Scored;
use crate::types::RecognitionParameters;

/// A chain of candidate indices (into the Filter Cascade's survivor
/// slice) whose boundaries chain exactly. Forking clones the index
/// vector rather than sharing mutable state — cheap at this scale, and
/// it keeps every branch independently extensible.
#[derive(Debug, Clone)]
pub struct Branch {
    pub candidates: Vec<usize>,
}

impl Branch {
    fn tail_eb(&self, survivors: &[Scored]) -> usize {
        survivors[*self.candidates.last().expect("branch is never empty")].candidate.eb
    }

    fn weakest_per(&self, survivors: &[Scored]) -> u8 {
        self.candidates.iter().map(|&i| survivors[i].metrics.per).min().unwrap_or(0)
    }

    pub fn t_length(&self, survivors: &[Scored]) -> usize {
        self.candidates
            .iter()
            .map(|&i| survivors[i].candidate.eb - survivors[i].candidate.bb + 1)
            .sum()
    }

    pub fn t_c_score(&self, survivors: &[Scored]) -> f64 {
        self.candidates.iter().map(|&i| survivors[i].metrics.c).sum()
    }
}

fn prune(branches: &mut Vec<Branch>, survivors: &[Scored], params: &RecognitionParameters) {
    let n = branches.len();
    let cutoff = if n > params.prune_at_3000 {
        Some(params.per_3_threshold)
    } else if n > params.prune_at_1000 {
        Some(params.per_2_threshold)
    } else if n > params.prune_at_500 {
        Some(params.per_1_threshold)
    } else {
        None
    };
    if let Some(cut) = cutoff {
        branches.retain(|b| b.weakest_per(survivors) >= cut);
    }
}

fn grow(seeds: Vec<Branch>, survivors: &[Scored], params: &RecognitionParameters) -> Vec<Branch> {
    let mut completed = Vec::new();
    let mut frontier = seeds;
    let max_iter = 2 * survivors.len().max(1) + 16;
    let mut iterations = 0;
    while !frontier.is_empty() && iterations < max_iter {
        iterations += 1;
        let mut next_frontier = Vec::new();
        for branch in frontier {
            let tail_eb = branch.tail_eb(survivors);
            let extensions: Vec<usize> = survivors
                .iter()
                .enumerate()
                .filter(|(_, s)| s.candidate.bb == tail_eb + 1)
                .map(|(i, _)| i)
                .collect();
            if extensions.is_empty() {
                completed.push(branch);
            } else {
                for ext in extensions {
                    let mut forked = branch.clone();
                    forked.candidates.push(ext);
                    next_frontier.push(forked);
                }
            }
        }
        prune(&mut next_frontier, survivors, params);
        frontier = next_frontier;
    }
    completed.extend(frontier);
    completed
}

/// Build the forest of branches: one seed per lowest-BB candidate, grown
/// and forked to a fixed point, plus orphan seeds for qualifying
/// sub-segment candidates that the main growth never reached.
pub fn assemble(survivors: &[Scored], params: &RecognitionParameters) -> Vec<Branch> {
    if survivors.is_empty() {
        return Vec::new();
    }
    let low_b = survivors.iter().map(|s| s.candidate.bb).min().unwrap();
    let seeds: Vec<Branch> = survivors
        .iter()
        .enumerate()
        .filter(|(_, s)| s.candidate.bb == low_b)
        .map(|(i, _)| Branch { candidates: vec![i] })
        .collect();
    let high_b = seeds.iter().map(|b| b.tail_eb(survivors)).max().unwrap_or(low_b);

    let mut branches = grow(seeds, survivors, params);

    let placed: HashSet<usize> =
        branches.iter().flat_map(|b| b.candidates.iter().copied()).collect();
    let orphan_seeds: Vec<Branch> = survivors
        .iter()
        .enumerate()
        .filter(|(i, s)| {
            !placed.contains(i)
                && s.candidate.bb <= high_b
                && s.metrics.per as u32 > params.unused_threshold as u32
        })
        .map(|(i, _)| Branch { candidates: vec![i] })
        .collect();
    if !orphan_seeds.is_empty() {
        branches.extend(grow(orphan_seeds, survivors, params));
    }
    branches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::generate_candidates;
    use crate::stream::InputStream;
    use crate::types::StoreType;
    use crate::vocab::{PatternSpec, VocabularyStore};

    #[test]
    fn branches_chain_without_overlap() {
        let vs = VocabularyStore::build(
            StoreType::Text,
            &[PatternSpec::new("FRIDAY"), PatternSpec::new("SATURDAY"), PatternSpec::new("SUNDAY")],
        )
        .unwrap();
        let is = InputStream::from_text(&vs, "FRIDAYSUNDAY");
        let params = RecognitionParameters::default();
        let candidates = generate_candidates(&vs, &is, &params);
        let survivors = crate::filter::run(&vs, &is, candidates, &params);
        let branches = assemble(&survivors, &params);
        for branch in &branches {
            for w in branch.candidates.windows(2) {
                let a = &survivors[w[0]].candidate;
                let b = &survivors[w[1]].candidate;
                assert_eq!(b.bb, a.eb + 1);
            }
        }
    }

    #[test]
    fn empty_survivors_yield_no_branches() {
        let branches = assemble(&[], &RecognitionParameters::default());
        assert!(branches.is_empty());
    }
}
