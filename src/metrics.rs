//! Shared per-candidate scoring math: the Stand-Alone Score recurrence, the
//! derived PER/QUAL/C/ALL metrics, and positional-anomaly counting. Used by
//! both the Filter Cascade and the SCU so the two stages agree on what a
//! candidate's score means.

use crate::types::Position;

/// `score <- floor(score * 0.9011 + 9.89 + 0.5)`: fast rise from low,
/// asymptotic to 100. The coefficients are reproduced bit-exactly per the
/// reference recurrence; `as i32` truncates toward zero, which is floor
/// for the non-negative scores this recurrence produces.
pub fn excitatory_spike(score: i32) -> i32 {
    let s = score as f32;
    let s = s * 0.9011 + 9.89;
    let s = s + 0.5;
    s as i32
}

/// `score <- floor(score * 0.9011 + 0.5)`: asymptotic decay to 0.
pub fn inhibitory_spike(score: i32) -> i32 {
    let s = score as f32;
    let s = s * 0.9011;
    let s = s + 0.5;
    s as i32
}

pub fn apply_excitatory(score: i32, times: u32) -> i32 {
    (0..times).fold(score, |s, _| excitatory_spike(s))
}

pub fn apply_inhibitory(score: i32, times: u32) -> i32 {
    (0..times).fold(score, |s, _| inhibitory_spike(s))
}

/// A matched `(qpos, dpos)` pair, both 1-based.
pub type Match = (usize, Position);

/// Count of positional anomalies in a sequence of matches already sorted
/// by ascending qpos: incremented whenever consecutive matches don't both
/// advance qpos and dpos by exactly 1.
pub fn count_anomalies(matches: &[Match]) -> usize {
    matches
        .windows(2)
        .filter(|w| {
            let (q0, d0) = w[0];
            let (q1, d1) = w[1];
            let dq = q1 as i64 - q0 as i64;
            let dd = d1 as i64 - d0 as i64;
            dq != 1 || dd != 1
        })
        .count()
}

/// The same count, additionally penalising a candidate whose first matched
/// qpos isn't its own BB, or whose first matched dpos isn't 1 (run after
/// all boundary edits, per the cascade's final re-anomaly-count stage).
pub fn count_anomalies_final(bb: usize, matches: &[Match]) -> usize {
    let mut cnt = count_anomalies(matches);
    if let Some(&(q0, d0)) = matches.first() {
        if q0 != bb {
            cnt += 1;
        }
        if d0 != 1 {
            cnt += 1;
        }
    }
    cnt
}

/// Stand-Alone Score: walk matches in qpos order, rewarding runs of
/// consecutive in-order `dpos` advances with excitatory spikes and
/// penalising an out-of-order jump (a `dpos` at or before one already
/// recorded) with a number of inhibitory spikes equal to the gap between
/// the new `dpos` and the immediately preceding matched `dpos`.
pub fn standalone_score(matches: &[Match]) -> i32 {
    let mut score: i32 = 0;
    let mut consecutive: u32 = 0;
    let mut max_dpos_seen: i64 = -1;
    let mut prev_dpos: Option<Position> = None;

    for &(_, dpos) in matches {
        match prev_dpos {
            None => {
                consecutive = 1;
                score = apply_excitatory(score, consecutive);
            }
            Some(prev) => {
                if dpos as i64 == prev as i64 + 1 {
                    consecutive += 1;
                    score = apply_excitatory(score, consecutive);
                } else if (dpos as i64) <= max_dpos_seen {
                    let gap = (dpos as i64 - prev as i64 - 1).unsigned_abs() as u32;
                    score = apply_inhibitory(score, gap);
                    consecutive = 1;
                } else {
                    consecutive = 1;
                    score = apply_excitatory(score, consecutive);
                }
            }
        }
        max_dpos_seen = max_dpos_seen.max(dpos as i64);
        prev_dpos = Some(dpos);
    }
    score
}

/// The denominator SAS: a pattern of length `len` matched perfectly
/// in-order against a pristine copy of its own RL.
pub fn ideal_score(len: usize) -> i32 {
    let perfect: Vec<Match> = (1..=len).map(|i| (i, i as Position)).collect();
    standalone_score(&perfect)
}

/// Derived per-candidate metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateMetrics {
    pub per: u8,
    pub qual: u32,
    pub cnt_a: usize,
    pub c: f64,
    pub all: bool,
}

/// Compute PER/QUAL/C/ALL for a candidate spanning `[bb,eb]` with the given
/// matches against a pattern of length `len`.
pub fn candidate_metrics(bb: usize, eb: usize, len: usize, matches: &[Match]) -> CandidateMetrics {
    let k = matches.len();
    let sas = standalone_score(matches);
    let ideal = ideal_score(len).max(1);
    let mut per = ((sas as f64 / ideal as f64) * 100.0).round().clamp(0.0, 100.0) as u8;

    let window = eb - bb + 1;
    if per == 100 && window > len {
        per = 90;
    }

    let qual = (len as i64 - k as i64).unsigned_abs() as u32;
    let cnt_a = count_anomalies(matches);

    let ais = window.saturating_sub(k);
    let arn_penalty = cnt_a / 3;

    let mut c = (per as f64 / 100.0).powi(2) * (len as f64).powi(2) / (qual as f64 + 1.0);
    for _ in 0..ais {
        c /= 10.0;
    }
    for _ in 0..arn_penalty {
        c /= 10.0;
    }

    let mut seen_dpos = vec![false; len + 1];
    for &(_, d) in matches {
        if (d as usize) <= len {
            seen_dpos[d as usize] = true;
        }
    }
    let all = (1..=len).all(|d| seen_dpos[d]);

    CandidateMetrics { per, qual, cnt_a, c, all }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excitatory_spike_rises_and_saturates_near_100() {
        let mut score = 0;
        for _ in 0..50 {
            score = excitatory_spike(score);
        }
        assert!(score > 95 && score <= 100, "score={}", score);
    }

    #[test]
    fn inhibitory_spike_decays_to_zero() {
        let mut score = 100;
        for _ in 0..50 {
            score = inhibitory_spike(score);
        }
        assert_eq!(score, 0);
    }

    #[test]
    fn spikes_are_monotone() {
        for s in 0..=100 {
            assert!(excitatory_spike(s) >= s || s >= 100);
            assert!(inhibitory_spike(s) <= s);
        }
    }

    #[test]
    fn perfect_match_yields_per_100() {
        let matches: Vec<Match> = (1..=6).map(|i| (i, i as Position)).collect();
        let m = candidate_metrics(1, 6, 6, &matches);
        assert_eq!(m.per, 100);
        assert_eq!(m.qual, 0);
        assert!(m.all);
    }

    #[test]
    fn oversized_window_caps_perfect_per_at_90() {
        let matches: Vec<Match> = (1..=6).map(|i| (i + 3, i as Position)).collect();
        let m = candidate_metrics(1, 9, 6, &matches);
        assert_eq!(m.per, 90);
    }
}
