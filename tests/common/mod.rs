//! Small in-memory vocabulary stores shared by the end-to-end scenario
//! tests in `tests/main.rs`, mirroring the teacher's
//! `analiticcl::test::get_test_alphabet()` support-module pattern.

use ndbscu::{PatternSpec, StoreType, VocabularyStore};

pub fn weekday_store() -> VocabularyStore {
    VocabularyStore::build(
        StoreType::Text,
        &[PatternSpec::new("FRIDAY"), PatternSpec::new("SATURDAY"), PatternSpec::new("SUNDAY")],
    )
    .unwrap()
}

pub fn mississippi_store() -> VocabularyStore {
    VocabularyStore::build(StoreType::Text, &[PatternSpec::new("MISSISSIPPI")]).unwrap()
}

pub fn thursday_store() -> VocabularyStore {
    VocabularyStore::build(StoreType::Text, &[PatternSpec::new("THURSDAY")]).unwrap()
}

pub fn friday_day_store() -> VocabularyStore {
    VocabularyStore::build(StoreType::Text, &[PatternSpec::new("FRIDAY"), PatternSpec::new("DAY")]).unwrap()
}

pub fn time_central_store() -> VocabularyStore {
    VocabularyStore::build(
        StoreType::Central,
        &[PatternSpec::new("what time is it").with_action("ACT_TIME")],
    )
    .unwrap()
}
