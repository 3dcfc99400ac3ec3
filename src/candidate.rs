//! Candidate Generator: from an Input Stream and a Vocabulary Store, emit
//! every `(pattern, BB, EB)` hypothesis with per-position hit evidence,
//! merging compatible hit records into richer candidates.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::metrics::{count_anomalies, Match};
use crate::stream::InputStream;
use crate::types::{PatternId, Position, RecognitionParameters};
use crate::vocab::VocabularyStore;

/// A hypothesised occurrence of pattern `P` at input positions `[bb,eb]`
/// (1-based, inclusive), with every matched `(qpos, dpos)` pair recorded.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub pattern: PatternId,
    pub bb: usize,
    pub eb: usize,
    /// Matched positions, sorted by ascending qpos.
    pub matches: Vec<Match>,
}

impl Candidate {
    pub fn rn_hits(&self) -> usize {
        self.matches.len()
    }

    pub fn window(&self) -> usize {
        self.eb - self.bb + 1
    }
}

/// One raw hit: input position `qpos` matched RL position `dpos` of
/// pattern `pattern`, hypothesising the occurrence spans `[b,e]`.
struct HitRecord {
    qpos: usize,
    dpos: Position,
    #[allow(dead_code)]
    b: isize,
    #[allow(dead_code)]
    e: isize,
}

/// A candidate under construction while walking a pattern's hit records in
/// qpos order.
struct Builder {
    matches: Vec<Match>,
    direction: Option<i8>,
}

impl Builder {
    fn new(first: Match) -> Self {
        Self { matches: vec![first], direction: None }
    }

    fn last(&self) -> Match {
        *self.matches.last().unwrap()
    }

    /// Maximum qpos gap tolerated between two hits belonging to the same
    /// physical occurrence; a small amount of slack absorbs a typo's
    /// inserted or deleted character without starting a new candidate.
    const SLACK: i64 = 3;

    fn try_attach(&mut self, qpos: usize, dpos: Position) -> bool {
        let (last_q, last_d) = self.last();
        if qpos <= last_q {
            return false;
        }
        let dd = dpos as i64 - last_d as i64;
        if dd == 0 {
            return false;
        }
        let dir = if dd > 0 { 1 } else { -1 };
        if let Some(existing) = self.direction {
            if existing != dir {
                return false;
            }
        }
        let dq = (qpos - last_q) as i64;
        if (dq - dd.abs()).abs() > Self::SLACK {
            return false;
        }
        self.direction = Some(dir);
        self.matches.push((qpos, dpos));
        true
    }

    fn finish(self, pattern: PatternId) -> Candidate {
        let bb = self.matches.first().unwrap().0;
        let eb = self.matches.last().unwrap().0;
        Candidate { pattern, bb, eb, matches: self.matches }
    }
}

fn generate_hits(vs: &VocabularyStore, is: &InputStream) -> HashMap<PatternId, Vec<HitRecord>> {
    let mut by_pattern: HashMap<PatternId, Vec<HitRecord>> = HashMap::new();
    for (i, &symbol) in is.is.iter().enumerate() {
        let qpos = i + 1;
        for conn in vs.connections_for(symbol) {
            let d = conn.position as isize;
            let b = qpos as isize - d + 1;
            let pattern_len = vs.pattern(conn.pattern).map(|p| p.len()).unwrap_or(1) as isize;
            let e = b + pattern_len - 1;
            by_pattern.entry(conn.pattern).or_default().push(HitRecord {
                qpos,
                dpos: conn.position,
                b,
                e,
            });
        }
    }
    for hits in by_pattern.values_mut() {
        hits.sort_by_key(|h| (h.qpos, h.dpos));
    }
    by_pattern
}

fn combine_for_pattern(pattern: PatternId, hits: Vec<HitRecord>) -> Vec<Candidate> {
    let mut active: Vec<Builder> = Vec::new();
    let mut finished: Vec<Candidate> = Vec::new();

    for hit in hits {
        let mut attached = false;
        for builder in active.iter_mut() {
            if builder.try_attach(hit.qpos, hit.dpos) {
                attached = true;
                break;
            }
        }
        if !attached {
            active.push(Builder::new((hit.qpos, hit.dpos)));
        }
    }
    for builder in active {
        finished.push(builder.finish(pattern));
    }
    finished
}

/// Run the full CG algorithm: generate hit records, combine them per
/// pattern (optionally across rayon's thread pool), trim, then deduplicate
/// deterministically.
pub fn generate_candidates(
    vs: &VocabularyStore,
    is: &InputStream,
    params: &RecognitionParameters,
) -> Vec<Candidate> {
    let by_pattern = generate_hits(vs, is);
    let pattern_groups: Vec<(PatternId, Vec<HitRecord>)> = by_pattern.into_iter().collect();

    let combined: Vec<Candidate> = if params.single_thread {
        pattern_groups
            .into_iter()
            .flat_map(|(p, hits)| combine_for_pattern(p, hits))
            .collect()
    } else {
        pattern_groups
            .into_par_iter()
            .flat_map(|(p, hits)| combine_for_pattern(p, hits))
            .collect()
    };

    dedupe(combined, vs)
}

fn dedupe(candidates: Vec<Candidate>, vs: &VocabularyStore) -> Vec<Candidate> {
    let mut best: HashMap<(PatternId, usize, usize), Candidate> = HashMap::new();
    for cand in candidates {
        let key = (cand.pattern, cand.bb, cand.eb);
        let len = vs.pattern(cand.pattern).map(|p| p.len()).unwrap_or(usize::MAX);
        match best.get(&key) {
            None => {
                best.insert(key, cand);
            }
            Some(existing) => {
                let existing_len = vs.pattern(existing.pattern).map(|p| p.len()).unwrap_or(usize::MAX);
                let existing_anomalies = count_anomalies(&existing.matches);
                let cand_anomalies = count_anomalies(&cand.matches);
                let better = (cand.rn_hits(), usize::MAX - cand_anomalies, usize::MAX - len)
                    > (existing.rn_hits(), usize::MAX - existing_anomalies, usize::MAX - existing_len);
                if better {
                    best.insert(key, cand);
                }
            }
        }
    }
    let mut out: Vec<Candidate> = best.into_values().collect();
    out.sort_by_key(|c| (c.bb, c.eb, c.pattern));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StoreType;
    use crate::vocab::PatternSpec;

    fn store() -> VocabularyStore {
        VocabularyStore::build(
            StoreType::Text,
            &[PatternSpec::new("FRIDAY"), PatternSpec::new("SATURDAY"), PatternSpec::new("SUNDAY")],
        )
        .unwrap()
    }

    #[test]
    fn generates_a_candidate_for_an_exact_match() {
        let vs = store();
        let is = InputStream::from_text(&vs, "FRIDAY");
        let params = RecognitionParameters::default();
        let cands = generate_candidates(&vs, &is, &params);
        let friday = vs.patterns().iter().find(|p| p.name == "FRIDAY").unwrap();
        assert!(cands.iter().any(|c| c.pattern == friday.code && c.rn_hits() == 6));
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let vs = store();
        let is = InputStream::from_text(&vs, "FRIDAY SATURDAY SUNDAY");
        let params = RecognitionParameters::default();
        let cands = generate_candidates(&vs, &is, &params);
        let mut sorted = cands.clone();
        sorted.sort_by_key(|c| (c.bb, c.eb, c.pattern));
        assert_eq!(
            cands.iter().map(|c| (c.bb, c.eb, c.pattern)).collect::<Vec<_>>(),
            sorted.iter().map(|c| (c.bb, c.eb, c.pattern)).collect::<Vec<_>>()
        );
        for w in cands.windows(2) {
            assert!((w[0].pattern, w[0].bb, w[0].eb) != (w[1].pattern, w[1].bb, w[1].eb));
        }
    }

    #[test]
    fn typo_tolerant_match_still_produces_a_candidate() {
        let vs = store();
        let is = InputStream::from_text(&vs, "FRDY");
        let params = RecognitionParameters::default();
        let cands = generate_candidates(&vs, &is, &params);
        assert!(!cands.is_empty());
    }
}
