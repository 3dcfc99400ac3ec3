//! End-to-end recognition scenarios, numbered in the teacher's
//! `test0001_...` convention.

mod common;

use ndbscu::{Engine, PatternSpec, SCUConfig, StoreType, VocabularyStore};

#[test]
fn test0001_typo_tolerant_weekday_match() {
    let engine = Engine::new(common::weekday_store());
    let outcome = engine.recognize("frdy").unwrap();
    assert!(!outcome.is_empty());
    assert!(outcome.winners.iter().any(|w| w.iter().any(|s| s.display == "FRIDAY")));
}

#[test]
fn test0002_prefix_expansion_absorbs_leading_extra_characters() {
    let engine = Engine::new(common::mississippi_store());
    let outcome = engine.recognize("miMISSISSIPPI").unwrap();
    assert!(!outcome.is_empty());
    let best = &outcome.winners[0];
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].display, "MISSISSIPPI");
    assert_eq!(best[0].begin, 1, "prefix expansion should pull BB back to cover the leading 'mi'");
}

#[test]
fn test0003_repeat_collapse_tolerates_long_runs() {
    let engine = Engine::new(common::thursday_store());
    let outcome = engine.recognize("THURSOOOOOOOOODAY").unwrap();
    assert!(outcome.winners.iter().any(|w| w.iter().any(|s| s.display == "THURSDAY")));
}

#[test]
fn test0004_envelopment_removes_the_shorter_subsumed_pattern() {
    let engine = Engine::new(common::friday_day_store());
    let outcome = engine.recognize("FRIDAY").unwrap();
    assert_eq!(outcome.winners.len(), 1);
    let names: Vec<&str> = outcome.winners[0].iter().map(|s| s.display.as_str()).collect();
    assert_eq!(names, vec!["FRIDAY"]);
}

#[test]
fn test0005_central_store_surfaces_action_without_hit_threshold_filtering() {
    let engine = Engine::new(common::time_central_store());
    let outcome = engine.recognize("what time is it").unwrap();
    assert!(!outcome.is_empty());
    assert!(outcome.winners[0].iter().any(|s| s.action.as_deref() == Some("ACT_TIME")));
}

#[test]
fn test0006_empty_input_yields_zero_results_without_panicking() {
    let engine = Engine::new(common::weekday_store());
    let outcome = engine.recognize("").unwrap();
    assert!(outcome.is_empty());
    assert!(!outcome.ambiguous);
}

#[test]
fn test0007_single_symbol_unique_to_one_pattern_yields_one_result() {
    let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("Q"), PatternSpec::new("FRIDAY")]).unwrap();
    let engine = Engine::new(vs);
    let outcome = engine.recognize("q").unwrap();
    assert_eq!(outcome.winners.len(), 1);
    assert_eq!(outcome.winners[0][0].display, "Q");
}

#[test]
fn test0008_adjacent_non_overlapping_patterns_chain_into_one_branch() {
    let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("AB"), PatternSpec::new("CD")]).unwrap();
    let engine = Engine::new(vs);
    let outcome = engine.recognize("ABCD").unwrap();
    assert!(!outcome.is_empty());
    let names: Vec<&str> = outcome.winners[0].iter().map(|s| s.display.as_str()).collect();
    assert_eq!(names, vec!["AB", "CD"]);
}

#[test]
fn test0009_disabling_all_agents_still_produces_a_result() {
    let vs = common::weekday_store();
    let engine = Engine::new(vs).with_scu_config(SCUConfig::all_disabled());
    let outcome = engine.recognize("FRIDAY").unwrap();
    assert!(outcome.winners.iter().any(|w| w.iter().any(|s| s.display == "FRIDAY")));
}

#[test]
fn test0010_vocabulary_store_save_and_load_round_trips() {
    let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("FRIDAY").with_action("ACT_DAY")]).unwrap();
    let serialized = vs.save();
    let reloaded = VocabularyStore::load(&serialized).unwrap();
    assert_eq!(reloaded.save(), serialized, "re-serialisation should be byte-identical");
}

#[test]
fn test0011_image_feature_adapter_produces_399_views() {
    let pixels = [[0u8; ndbscu::image::IMAGE_SIDE]; ndbscu::image::IMAGE_SIDE];
    let views = ndbscu::image::extract_views(&pixels);
    assert_eq!(views.len(), ndbscu::image::VIEW_COUNT);
}

#[test]
fn test0012_branch_candidates_never_overlap() {
    let vs = common::weekday_store();
    let is = ndbscu::stream::InputStream::from_text(&vs, "FRIDAYSUNDAY");
    let params = ndbscu::RecognitionParameters::default();
    let candidates = ndbscu::candidate::generate_candidates(&vs, &is, &params);
    let survivors = ndbscu::filter::run(&vs, &is, candidates, &params);
    let branches = ndbscu::branch::assemble(&survivors, &params);
    for branch in &branches {
        for w in branch.candidates.windows(2) {
            let a = &survivors[w[0]].candidate;
            let b = &survivors[w[1]].candidate;
            assert_eq!(b.bb, a.eb + 1);
        }
    }
}
