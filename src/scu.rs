//! Scoring & Competitive Unit: computes branch-level metrics, runs the
//! seven pairwise evidential agents, and arbitrates the round-robin
//! tournament with non-compete memory.

use std::collections::HashMap;

use crate::branch::Branch;
use crate::filter::Scored;
use crate::metrics::{apply_excitatory, apply_inhibitory, standalone_score};
use crate::stream::InputStream;
use crate::types::RecognitionParameters;

/// Which of the seven agents are active for a run. Replaces the source's
/// seven nullable module-level globals with an explicit value threaded
/// through the tournament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SCUConfig {
    pub space_b: bool,
    pub anomaly: bool,
    pub rec: bool,
    pub min_pr: bool,
    pub bound: bool,
    pub un_count: bool,
    pub mislead: bool,
}

impl SCUConfig {
    pub fn all_enabled() -> Self {
        Self {
            space_b: true,
            anomaly: true,
            rec: true,
            min_pr: true,
            bound: true,
            un_count: true,
            mislead: true,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            space_b: false,
            anomaly: false,
            rec: false,
            min_pr: false,
            bound: false,
            un_count: false,
            mislead: false,
        }
    }
}

impl Default for SCUConfig {
    fn default() -> Self {
        Self::all_enabled()
    }
}

/// A branch presented to the tournament together with its composed
/// metrics and a running score, initialised from its Stand-Alone Score.
#[derive(Debug, Clone)]
struct Competitor {
    branch_idx: usize,
    score: i32,
    space_b: i32,
    anomaly: i32,
    rec: f64,
    minpr: u8,
    bound: i32,
    uncount: i32,
    mislead: i32,
    space_claim: HashMap<usize, u8>,
    live: bool,
    non_compete: std::collections::HashSet<usize>,
}

fn compute_competitor(
    branch_idx: usize,
    branch: &Branch,
    survivors: &[Scored],
    is: &InputStream,
) -> Competitor {
    let mut space_b = 0i32;
    let mut anomaly = 0i32;
    let mut rec = 0f64;
    let mut minpr = 100u8;
    let mut bound = 0i32;
    let mut uncount = 0i32;
    let mut mislead = 0i32;
    let mut space_claim: HashMap<usize, u8> = HashMap::new();
    let mut sas_sum = 0i32;

    for (pos, &ci) in branch.candidates.iter().enumerate() {
        let s = &survivors[ci];
        let window = s.candidate.eb - s.candidate.bb + 1;
        let nrec = s.candidate.rn_hits().max(1);
        anomaly += s.metrics.cnt_a as i32 + s.metrics.qual as i32;
        rec += (s.metrics.per as f64 - s.metrics.cnt_a as f64 - s.metrics.qual as f64) * nrec as f64;
        minpr = minpr.min(s.metrics.per);
        uncount += (window.saturating_sub(s.candidate.rn_hits())) as i32;
        if let Some(&(_, first_d)) = s.candidate.matches.first() {
            mislead += (first_d as i32 - 1).max(0);
        }
        sas_sum += standalone_score(&s.candidate.matches);

        let bb = s.candidate.bb;
        let has_space = is.space.get(bb.saturating_sub(1)).copied().unwrap_or(false);
        if has_space {
            space_b += 1;
            let entry = space_claim.entry(bb).or_insert(0);
            *entry = (*entry).max(s.metrics.per);
        } else if pos > 0 {
            bound += 1;
        }
    }

    Competitor {
        branch_idx,
        score: sas_sum,
        space_b,
        anomaly,
        rec,
        minpr,
        bound,
        uncount,
        mislead,
        space_claim,
        live: true,
        non_compete: std::collections::HashSet::new(),
    }
}

fn decrement_contested_space_claims(a: &mut Competitor, z: &mut Competitor) {
    let positions: Vec<usize> =
        a.space_claim.keys().chain(z.space_claim.keys()).copied().collect();
    for q in positions {
        let av = a.space_claim.get(&q).copied().unwrap_or(0);
        let zv = z.space_claim.get(&q).copied().unwrap_or(0);
        if av < zv {
            a.space_b -= 1;
        } else if zv < av {
            z.space_b -= 1;
        }
    }
}

fn agent_space_b(a: &mut Competitor, z: &mut Competitor) {
    if a.space_b == z.space_b {
        return;
    }
    if a.space_b > z.space_b {
        z.score = apply_inhibitory(z.score, 3);
    } else {
        a.score = apply_inhibitory(a.score, 3);
    }
}

fn agent_anomaly(a: &mut Competitor, z: &mut Competitor) {
    if a.anomaly == z.anomaly {
        return;
    }
    if a.anomaly > z.anomaly {
        a.score = apply_inhibitory(a.score, 4);
        z.score = apply_excitatory(z.score, 2);
    } else {
        z.score = apply_inhibitory(z.score, 4);
        a.score = apply_excitatory(a.score, 2);
    }
}

fn agent_rec(a: &mut Competitor, z: &mut Competitor) {
    if a.rec == z.rec {
        return;
    }
    if a.rec > z.rec {
        a.score = apply_excitatory(a.score, 2);
        z.score = apply_inhibitory(z.score, 2);
    } else {
        z.score = apply_excitatory(z.score, 2);
        a.score = apply_inhibitory(a.score, 2);
    }
}

fn agent_minpr(a: &mut Competitor, z: &mut Competitor) {
    if a.minpr == z.minpr {
        return;
    }
    if a.minpr > z.minpr {
        z.score = apply_inhibitory(z.score, 6);
    } else {
        a.score = apply_inhibitory(a.score, 6);
    }
}

fn agent_bound(a: &mut Competitor, z: &mut Competitor) {
    if a.bound == z.bound {
        return;
    }
    let cnt = (a.bound - z.bound).unsigned_abs() + 1;
    if a.bound > z.bound {
        if !(a.anomaly < z.anomaly) {
            a.score = apply_inhibitory(a.score, cnt);
            z.score = apply_excitatory(z.score, cnt);
        }
    } else if !(z.anomaly < a.anomaly) {
        z.score = apply_inhibitory(z.score, cnt);
        a.score = apply_excitatory(a.score, cnt);
    }
}

fn agent_uncount(a: &mut Competitor, z: &mut Competitor) {
    if a.uncount == z.uncount {
        return;
    }
    let delta = (a.uncount - z.uncount).unsigned_abs();
    if a.uncount > z.uncount {
        a.score = apply_inhibitory(a.score, 2 * delta);
        z.score = apply_excitatory(z.score, 3 * delta);
    } else {
        z.score = apply_inhibitory(z.score, 2 * delta);
        a.score = apply_excitatory(a.score, 3 * delta);
    }
}

fn agent_mislead(a: &mut Competitor, z: &mut Competitor) {
    if a.mislead == z.mislead {
        return;
    }
    let delta = (a.mislead - z.mislead).unsigned_abs();
    if a.mislead > z.mislead {
        a.score = apply_inhibitory(a.score, 2 * delta);
        if delta > 1 {
            z.score = apply_excitatory(z.score, 2);
        }
    } else {
        z.score = apply_inhibitory(z.score, 2 * delta);
        if delta > 1 {
            a.score = apply_excitatory(a.score, 2);
        }
    }
}

/// Run one pairwise competition, applying the enabled agents in order and
/// decrementing contested Space claims first.
fn compete(a: &mut Competitor, z: &mut Competitor, config: &SCUConfig) {
    decrement_contested_space_claims(a, z);
    if config.space_b {
        agent_space_b(a, z);
    }
    if config.anomaly {
        agent_anomaly(a, z);
    }
    if config.rec {
        agent_rec(a, z);
    }
    if config.min_pr {
        agent_minpr(a, z);
    }
    if config.bound {
        agent_bound(a, z);
    }
    if config.un_count {
        agent_uncount(a, z);
    }
    if config.mislead {
        agent_mislead(a, z);
    }
}

/// Result of the full round-robin tournament.
#[derive(Debug, Clone)]
pub struct TournamentOutcome {
    /// Indices into the `branches` slice passed to `run_tournament`.
    pub winners: Vec<usize>,
    pub ambiguous: bool,
}

/// Seed the pool, run competitions between any two competitors that have
/// never faced each other, eliminate the strictly-lower scorer, and
/// record mutual non-compete on ties, until at most one competitor
/// remains live or no unexhausted pairing exists.
pub fn run_tournament(
    branches: &[Branch],
    survivors: &[Scored],
    is: &InputStream,
    config: &SCUConfig,
    params: &RecognitionParameters,
) -> TournamentOutcome {
    if branches.is_empty() {
        return TournamentOutcome { winners: Vec::new(), ambiguous: false };
    }

    let t_lengths: Vec<usize> = branches.iter().map(|b| b.t_length(survivors)).collect();
    let max_t_length = *t_lengths.iter().max().unwrap();
    let best_tc_idx = branches
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.t_c_score(survivors).partial_cmp(&b.1.t_c_score(survivors)).unwrap())
        .map(|(i, _)| i)
        .unwrap();
    let best_tc_t_length = t_lengths[best_tc_idx];

    let mut pool: Vec<Competitor> = branches
        .iter()
        .enumerate()
        .filter(|(i, _)| t_lengths[*i] == max_t_length || t_lengths[*i] == best_tc_t_length)
        .map(|(i, b)| compute_competitor(i, b, survivors, is))
        .collect();

    let n = pool.len();
    if n <= 1 {
        return TournamentOutcome {
            winners: pool.into_iter().map(|c| c.branch_idx).collect(),
            ambiguous: false,
        };
    }

    let max_iterations = 2 * n;
    for _ in 0..max_iterations {
        let live: Vec<usize> = (0..pool.len()).filter(|&i| pool[i].live).collect();
        if live.len() <= 1 {
            break;
        }
        let mut pairing = None;
        'search: for &i in &live {
            for &j in &live {
                if i < j && !pool[i].non_compete.contains(&j) {
                    pairing = Some((i, j));
                    break 'search;
                }
            }
        }
        let (i, j) = match pairing {
            Some(p) => p,
            None => break,
        };

        let (left, right) = pool.split_at_mut(j);
        compete(&mut left[i], &mut right[0], config);

        match pool[i].score.cmp(&pool[j].score) {
            std::cmp::Ordering::Greater => pool[j].live = false,
            std::cmp::Ordering::Less => pool[i].live = false,
            std::cmp::Ordering::Equal => {
                pool[i].non_compete.insert(j);
                pool[j].non_compete.insert(i);
            }
        }
    }

    let mut winners: Vec<&Competitor> = pool.iter().filter(|c| c.live).collect();
    winners.sort_by(|a, b| b.score.cmp(&a.score));
    let ambiguous = winners.len() > 1;
    let capped: Vec<usize> =
        winners.into_iter().take(params.total_allowed_results).map(|c| c.branch_idx).collect();

    TournamentOutcome { winners: capped, ambiguous }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabling_all_agents_reduces_to_standalone_score_comparison() {
        let config = SCUConfig::all_disabled();
        let mut a = Competitor {
            branch_idx: 0,
            score: 50,
            space_b: 5,
            anomaly: 0,
            rec: 10.0,
            minpr: 100,
            bound: 0,
            uncount: 0,
            mislead: 0,
            space_claim: HashMap::new(),
            live: true,
            non_compete: Default::default(),
        };
        let mut z = a.clone();
        z.branch_idx = 1;
        z.score = 90;
        z.anomaly = 99;
        z.bound = 99;
        compete(&mut a, &mut z, &config);
        assert_eq!(a.score, 50);
        assert_eq!(z.score, 90);
    }

    #[test]
    fn space_b_agent_inhibits_the_lower_scorer() {
        let config = SCUConfig { space_b: true, ..SCUConfig::all_disabled() };
        let mut a = Competitor {
            branch_idx: 0,
            score: 50,
            space_b: 2,
            anomaly: 0,
            rec: 0.0,
            minpr: 0,
            bound: 0,
            uncount: 0,
            mislead: 0,
            space_claim: HashMap::new(),
            live: true,
            non_compete: Default::default(),
        };
        let mut z = a.clone();
        z.branch_idx = 1;
        z.space_b = 1;
        compete(&mut a, &mut z, &config);
        assert!(z.score < 50);
        assert_eq!(a.score, 50);
    }
}
