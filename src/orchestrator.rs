//! Orchestrator: preprocesses raw input, drives
//! CG -> FC -> BA -> SCU, and surfaces the winning segmentation(s).

use crate::branch::Branch;
use crate::candidate::generate_candidates;
use crate::error::NdbError;
use crate::filter::{self, Scored};
use crate::scu::{self, SCUConfig};
use crate::stream::InputStream;
use crate::types::{PatternId, RecognitionParameters, StoreType};
use crate::vocab::VocabularyStore;

/// One matched span within a winning branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub pattern: PatternId,
    pub begin: usize,
    pub end: usize,
    pub display: String,
    pub action: Option<String>,
}

/// The outcome of a single recognition query. Each inner `Vec<Segmentation>`
/// is one complete, non-overlapping parse of the input; more than one
/// entry means the tournament ended in a tie (`ambiguous`).
#[derive(Debug, Clone, Default)]
pub struct RecognitionOutcome {
    pub winners: Vec<Vec<Segmentation>>,
    pub ambiguous: bool,
}

impl RecognitionOutcome {
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}

/// Drives one Vocabulary Store through the recognition pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    vs: VocabularyStore,
    params: RecognitionParameters,
    scu_config: SCUConfig,
    pub debug: bool,
}

impl Engine {
    pub fn new(vs: VocabularyStore) -> Self {
        Self { vs, params: RecognitionParameters::default(), scu_config: SCUConfig::default(), debug: false }
    }

    pub fn with_params(mut self, params: RecognitionParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_scu_config(mut self, config: SCUConfig) -> Self {
        self.scu_config = config;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn store(&self) -> &VocabularyStore {
        &self.vs
    }

    /// Recognize a TEXT or CENTRAL input string.
    pub fn recognize(&self, input: &str) -> Result<RecognitionOutcome, NdbError> {
        let is = match self.vs.store_type() {
            StoreType::Text => InputStream::from_text(&self.vs, input),
            StoreType::Central => InputStream::from_words(&self.vs, input),
            StoreType::Image => {
                return Err(NdbError::InconsistentVocabulary(
                    "recognize() does not accept IMAGE stores; use recognize_features".into(),
                ))
            }
        };
        self.run_pipeline(is)
    }

    /// Recognize a pre-derived feature-code stream against an IMAGE store.
    pub fn recognize_features(&self, codes: &[u16]) -> Result<RecognitionOutcome, NdbError> {
        if !matches!(self.vs.store_type(), StoreType::Image) {
            return Err(NdbError::InconsistentVocabulary(
                "recognize_features() requires an IMAGE store".into(),
            ));
        }
        let is = InputStream::from_features(&self.vs, codes);
        self.run_pipeline(is)
    }

    fn run_pipeline(&self, is: InputStream) -> Result<RecognitionOutcome, NdbError> {
        if is.is_empty() {
            if self.debug {
                eprintln!("engine: input resolved to zero symbols, treating as NoResult");
            }
            return Ok(RecognitionOutcome::default());
        }

        let candidates = generate_candidates(&self.vs, &is, &self.params);
        if self.debug {
            eprintln!("engine: CG produced {} candidates", candidates.len());
        }

        let survivors: Vec<Scored> = filter::run(&self.vs, &is, candidates, &self.params);
        if self.debug {
            eprintln!("engine: FC left {} survivors", survivors.len());
        }
        if survivors.is_empty() {
            return Ok(RecognitionOutcome::default());
        }

        let branches: Vec<Branch> = crate::branch::assemble(&survivors, &self.params);
        if self.debug {
            eprintln!("engine: BA assembled {} branches", branches.len());
        }
        if branches.is_empty() {
            return Ok(RecognitionOutcome::default());
        }

        let outcome = scu::run_tournament(&branches, &survivors, &is, &self.scu_config, &self.params);
        if self.debug {
            eprintln!(
                "engine: SCU tournament produced {} winner(s), ambiguous={}",
                outcome.winners.len(),
                outcome.ambiguous
            );
        }

        let winners: Vec<Vec<Segmentation>> = outcome
            .winners
            .iter()
            .map(|&branch_idx| self.to_segmentations(&branches[branch_idx], &survivors))
            .collect();

        Ok(RecognitionOutcome { winners, ambiguous: outcome.ambiguous })
    }

    fn to_segmentations(&self, branch: &Branch, survivors: &[Scored]) -> Vec<Segmentation> {
        branch
            .candidates
            .iter()
            .map(|&ci| {
                let cand = &survivors[ci].candidate;
                let pattern = self.vs.pattern(cand.pattern);
                Segmentation {
                    pattern: cand.pattern,
                    begin: cand.bb,
                    end: cand.eb,
                    display: pattern.map(|p| p.display().to_string()).unwrap_or_default(),
                    action: pattern.and_then(|p| p.action.clone()),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::PatternSpec;

    #[test]
    fn recognize_empty_input_has_no_winners() {
        let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("FRIDAY")]).unwrap();
        let engine = Engine::new(vs);
        let outcome = engine.recognize("").unwrap();
        assert!(outcome.is_empty());
        assert!(!outcome.ambiguous);
    }

    #[test]
    fn recognize_single_unique_symbol_yields_one_result() {
        let vs = VocabularyStore::build(StoreType::Text, &[PatternSpec::new("Q")]).unwrap();
        let engine = Engine::new(vs);
        let outcome = engine.recognize("q").unwrap();
        assert_eq!(outcome.winners.len(), 1);
        assert_eq!(outcome.winners[0][0].display, "Q");
    }

    #[test]
    fn recognize_typo_tolerant_match() {
        let vs = VocabularyStore::build(
            StoreType::Text,
            &[PatternSpec::new("FRIDAY"), PatternSpec::new("SATURDAY"), PatternSpec::new("SUNDAY")],
        )
        .unwrap();
        let engine = Engine::new(vs);
        let outcome = engine.recognize("frdy").unwrap();
        assert!(outcome
            .winners
            .iter()
            .any(|seg| seg.iter().any(|s| s.display == "FRIDAY")));
    }

    #[test]
    fn recognize_central_store_surfaces_action() {
        let vs = VocabularyStore::build(
            StoreType::Central,
            &[PatternSpec::new("what time is it").with_action("ACT_TIME")],
        )
        .unwrap();
        let engine = Engine::new(vs);
        let outcome = engine.recognize("what time is it").unwrap();
        assert!(outcome
            .winners
            .iter()
            .any(|seg| seg.iter().any(|s| s.action.as_deref() == Some("ACT_TIME"))));
    }

    #[test]
    fn recognize_on_image_store_rejects_text_method() {
        let vs = crate::vocab::VocabularyStore::build_image(&[crate::vocab::FeatureSpec {
            label: "3".into(),
            codes: vec![1, 2, 3],
        }])
        .unwrap();
        let engine = Engine::new(vs);
        assert!(engine.recognize("anything").is_err());
    }
}
