//! Filter Cascade: prunes the Candidate Generator's output by coverage,
//! anomaly count, envelopment, and boundary patterns. Each stage may only
//! discard candidates, never create one; running the cascade twice on its
//! own output is the identity.

use crate::candidate::Candidate;
use crate::metrics::{candidate_metrics, count_anomalies_final, CandidateMetrics};
use crate::stream::InputStream;
use crate::types::{PatternId, RecognitionParameters, StoreType};
use crate::vocab::VocabularyStore;

/// A candidate that survived (so far) the cascade, carrying its derived
/// metrics alongside.
#[derive(Debug, Clone)]
pub struct Scored {
    pub candidate: Candidate,
    pub metrics: CandidateMetrics,
}

fn pattern_len(vs: &VocabularyStore, pattern: PatternId) -> usize {
    vs.pattern(pattern).map(|p| p.len()).unwrap_or(1)
}

/// Run the full cascade in its fixed order.
pub fn run(
    vs: &VocabularyStore,
    is: &InputStream,
    candidates: Vec<Candidate>,
    params: &RecognitionParameters,
) -> Vec<Scored> {
    let mut scored: Vec<Scored> = candidates
        .into_iter()
        .map(|c| {
            let len = pattern_len(vs, c.pattern);
            let metrics = candidate_metrics(c.bb, c.eb, len, &c.matches);
            Scored { candidate: c, metrics }
        })
        .collect();

    let central = matches!(vs.store_type(), StoreType::Central);

    if !central {
        hit_threshold(vs, &mut scored, params);
    }
    dedupe_by_anomaly(vs, &mut scored);
    if !central {
        anomaly_threshold(vs, &mut scored, params);
    }
    envelopment_removal(vs, &mut scored, params);
    anomalous_boundary_retraction(vs, &mut scored);
    weak_boundary_retraction(vs, is, &mut scored, params);
    boundary_expansion(vs, is, &mut scored);
    weak_on_removal(vs, &mut scored, params);
    re_anomaly_count(&mut scored);

    scored
}

fn hit_threshold(vs: &VocabularyStore, scored: &mut Vec<Scored>, params: &RecognitionParameters) {
    scored.retain(|s| {
        let len = pattern_len(vs, s.candidate.pattern) as f64;
        s.candidate.rn_hits() as f64 / len > params.hit_threshold
    });
}

fn anomaly_threshold(vs: &VocabularyStore, scored: &mut Vec<Scored>, params: &RecognitionParameters) {
    scored.retain(|s| {
        let len = pattern_len(vs, s.candidate.pattern) as f64;
        (s.metrics.cnt_a as f64 / len) < params.anomaly_threshold
    });
}

/// Among candidates sharing `(BB,EB,RNhits)`, keep the one with the fewest
/// anomalies, tie-broken by shorter pattern length, per spec.md §4.3.
fn dedupe_by_anomaly(vs: &VocabularyStore, scored: &mut Vec<Scored>) {
    use std::collections::HashMap;
    let mut best: HashMap<(PatternId, usize, usize, usize), usize> = HashMap::new();
    let mut keep = vec![true; scored.len()];
    for (i, s) in scored.iter().enumerate() {
        let key = (s.candidate.pattern, s.candidate.bb, s.candidate.eb, s.candidate.rn_hits());
        match best.get(&key) {
            None => {
                best.insert(key, i);
            }
            Some(&j) => {
                let len_i = pattern_len(vs, scored[i].candidate.pattern);
                let len_j = pattern_len(vs, scored[j].candidate.pattern);
                let i_better = (scored[i].metrics.cnt_a, len_i) < (scored[j].metrics.cnt_a, len_j);
                if i_better {
                    keep[j] = false;
                    best.insert(key, i);
                } else {
                    keep[i] = false;
                }
            }
        }
    }
    let mut idx = 0;
    scored.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

fn envelopment_removal(vs: &VocabularyStore, scored: &mut Vec<Scored>, params: &RecognitionParameters) {
    loop {
        scored.sort_by(|a, b| b.metrics.c.partial_cmp(&a.metrics.c).unwrap());
        let mut removed_any = false;
        let mut keep = vec![true; scored.len()];
        for i in 0..scored.len() {
            if !keep[i] {
                continue;
            }
            for j in 0..scored.len() {
                if i == j || !keep[j] {
                    continue;
                }
                let x = &scored[i];
                let y = &scored[j];
                let envelops = x.candidate.bb <= y.candidate.bb && y.candidate.eb <= x.candidate.eb;
                if !envelops {
                    continue;
                }
                if x.metrics.per as u32 >= params.envelopment_threshold as u32
                    && y.metrics.per < 100
                    && y.candidate.rn_hits() <= x.candidate.rn_hits()
                {
                    keep[j] = false;
                    removed_any = true;
                }
            }
        }
        let mut idx = 0;
        scored.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        let _ = vs;
        if !removed_any {
            break;
        }
    }
}

fn anomalous_boundary_retraction(vs: &VocabularyStore, scored: &mut Vec<Scored>) {
    for idx in 0..scored.len() {
        let len = pattern_len(vs, scored[idx].candidate.pattern);
        loop {
            let cand = scored[idx].clone();
            if cand.metrics.per == 100 || cand.candidate.matches.len() < 2 {
                break;
            }
            let matches = &cand.candidate.matches;
            let last = matches[matches.len() - 1];
            let prev = matches[matches.len() - 2];
            let trailing_anomalous =
                last.0 as i64 - prev.0 as i64 != 1 || last.1 as i64 - prev.1 as i64 != 1;
            if !trailing_anomalous {
                break;
            }
            let mut shrunk = cand.candidate.clone();
            shrunk.matches.pop();
            shrunk.eb = shrunk.matches.last().map(|m| m.0).unwrap_or(shrunk.bb);
            let shrunk_metrics = candidate_metrics(shrunk.bb, shrunk.eb, len, &shrunk.matches);
            if shrunk_metrics.c > cand.metrics.c {
                scored[idx] = Scored { candidate: shrunk, metrics: shrunk_metrics };
            } else {
                break;
            }
        }
    }
}

fn weak_boundary_retraction(
    vs: &VocabularyStore,
    is: &InputStream,
    scored: &mut Vec<Scored>,
    params: &RecognitionParameters,
) {
    if scored.is_empty() {
        return;
    }
    let top_per = scored.iter().map(|s| s.metrics.per).max().unwrap_or(0);
    let owners: Vec<usize> = scored
        .iter()
        .enumerate()
        .filter(|(_, s)| s.metrics.per == top_per)
        .map(|(i, _)| i)
        .collect();
    if owners.is_empty() {
        return;
    }
    let mut owned = vec![false; is.len() + 1];
    for &i in &owners {
        for q in scored[i].candidate.bb..=scored[i].candidate.eb {
            if q <= is.len() {
                owned[q] = true;
            }
        }
    }
    let top_begin_has_space = owners
        .iter()
        .map(|&i| scored[i].candidate.bb)
        .filter_map(|bb| is.space.get(bb.saturating_sub(1)).copied())
        .any(|flag| flag);

    let mut keep = vec![true; scored.len()];
    for i in 0..scored.len() {
        if owners.contains(&i) {
            continue;
        }
        let cand = &scored[i].candidate;
        let overlaps = (cand.bb..=cand.eb).any(|q| q <= is.len() && owned[q]);
        if !overlaps || !top_begin_has_space {
            continue;
        }
        let len = pattern_len(vs, cand.pattern);
        let trimmed_matches: Vec<_> =
            cand.matches.iter().copied().filter(|&(q, _)| !owned[q]).collect();
        if trimmed_matches.is_empty() {
            keep[i] = false;
            continue;
        }
        let new_bb = trimmed_matches.first().unwrap().0;
        let new_eb = trimmed_matches.last().unwrap().0;
        let new_metrics = candidate_metrics(new_bb, new_eb, len, &trimmed_matches);
        if (new_metrics.per as u32) < params.retract_boundary_threshold as u32 {
            keep[i] = false;
        } else {
            scored[i].candidate.bb = new_bb;
            scored[i].candidate.eb = new_eb;
            scored[i].candidate.matches = trimmed_matches;
            scored[i].metrics = new_metrics;
        }
    }
    let mut idx = 0;
    scored.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

/// For each perfectly recognised candidate, check whether the symbols just
/// outside its window repeat its own RL prefix/suffix (the "mi" +
/// "MISSISSIPPI" case) and widen the boundary to absorb them.
fn boundary_expansion(vs: &VocabularyStore, is: &InputStream, scored: &mut Vec<Scored>) {
    for idx in 0..scored.len() {
        let perfect = scored[idx].metrics.per == 100
            && scored[idx].metrics.qual == 0
            && scored[idx].metrics.all;
        if !perfect {
            continue;
        }
        let pattern = scored[idx].candidate.pattern;
        let rl = match vs.pattern(pattern) {
            Some(p) => p.rl.clone(),
            None => continue,
        };
        let len = rl.len();

        // Prefix expansion: do the `k` symbols right before BB spell a stutter
        // of RL's own prefix (`RL[0..k)` in the same left-to-right order, as
        // in "mi" immediately before "MISSISSIPPI")? A window of length k
        // either matches in full or not at all, so unlike the suffix case
        // below this can't be grown incrementally one symbol at a time:
        // shifting the window by one changes which RL position every symbol
        // in it aligns to. Try the largest feasible window first.
        let bb = scored[idx].candidate.bb;
        let max_k = len.min(bb.saturating_sub(1));
        let mut best_k = 0usize;
        'prefix: for k in (1..=max_k).rev() {
            for i in 0..k {
                let qpos = bb - k + i; // 1-based
                if i > 0 && is.space.get(qpos - 1).copied().unwrap_or(false) {
                    continue 'prefix;
                }
                if is.is.get(qpos - 1).copied() != Some(rl[i]) {
                    continue 'prefix;
                }
            }
            best_k = k;
            break;
        }
        if best_k > 0 {
            scored[idx].candidate.bb -= best_k;
        }

        // Suffix expansion: do the symbols right after EB repeat RL's suffix?
        let eb = scored[idx].candidate.eb;
        let mut j = 0usize;
        while j < len && eb + j + 1 <= is.len() {
            let qpos = eb + 1 + j;
            if is.space.get(qpos - 1).copied().unwrap_or(false) {
                break;
            }
            let want = rl[j];
            if is.is.get(qpos - 1).copied() != Some(want) {
                break;
            }
            j += 1;
        }
        if j > 0 {
            scored[idx].candidate.eb += j;
        }
    }

    // Re-envelop after expansion: a weaker candidate now fully contained
    // and of equal-or-lesser power is removed.
    let mut keep = vec![true; scored.len()];
    for i in 0..scored.len() {
        if scored[i].metrics.per != 100 {
            continue;
        }
        for j in 0..scored.len() {
            if i == j || !keep[j] {
                continue;
            }
            let x = &scored[i].candidate;
            let y = &scored[j].candidate;
            if x.bb <= y.bb && y.eb <= x.eb && scored[j].metrics.c <= scored[i].metrics.c {
                keep[j] = false;
            }
        }
    }
    let mut idx = 0;
    scored.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}

fn weak_on_removal(vs: &VocabularyStore, scored: &mut Vec<Scored>, params: &RecognitionParameters) {
    scored.retain(|s| {
        let window = (s.candidate.eb - s.candidate.bb + 1) as f64;
        s.metrics.c * window > params.weak_on_threshold
    });
    let _ = vs;
}

fn re_anomaly_count(scored: &mut [Scored]) {
    for s in scored.iter_mut() {
        s.metrics.cnt_a = count_anomalies_final(s.candidate.bb, &s.candidate.matches);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreType;
    use crate::vocab::PatternSpec;

    fn friday_store() -> VocabularyStore {
        VocabularyStore::build(StoreType::Text, &[PatternSpec::new("FRIDAY"), PatternSpec::new("DAY")])
            .unwrap()
    }

    #[test]
    fn envelopment_removes_shorter_subsumed_pattern() {
        let vs = friday_store();
        let is = InputStream::from_text(&vs, "FRIDAY");
        let params = RecognitionParameters::default();
        let candidates = crate::candidate::generate_candidates(&vs, &is, &params);
        let survivors = run(&vs, &is, candidates, &params);
        let names: Vec<&str> =
            survivors.iter().map(|s| vs.pattern(s.candidate.pattern).unwrap().name.as_str()).collect();
        assert!(names.contains(&"FRIDAY"));
        assert!(!names.contains(&"DAY"));
    }

    #[test]
    fn fc_is_idempotent_on_its_own_output() {
        let vs = friday_store();
        let is = InputStream::from_text(&vs, "FRIDAY");
        let params = RecognitionParameters::default();
        let candidates = crate::candidate::generate_candidates(&vs, &is, &params);
        let once = run(&vs, &is, candidates, &params);
        let twice_input: Vec<Candidate> = once.iter().map(|s| s.candidate.clone()).collect();
        let twice = run(&vs, &is, twice_input, &params);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn central_store_skips_hit_and_anomaly_thresholds() {
        let vs = VocabularyStore::build(
            StoreType::Central,
            &[PatternSpec::new("what time is it").with_action("ACT_TIME")],
        )
        .unwrap();
        let is = InputStream::from_words(&vs, "what time is it");
        let params = RecognitionParameters::default();
        let candidates = crate::candidate::generate_candidates(&vs, &is, &params);
        let survivors = run(&vs, &is, candidates, &params);
        assert!(!survivors.is_empty());
    }
}
