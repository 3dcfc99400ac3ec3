use std::collections::HashMap;

/// Each recognition neuron (symbol) gets a dense ID starting at 1; 0 is the
/// end-of-stream sentinel and is never assigned to a real symbol.
pub type SymbolId = u32;

/// Each output neuron (pattern) gets a dense ID starting at 1.
pub type PatternId = u32;

/// 1-based position within a pattern's Recognition List, or within the
/// Input Stream. Stored as u16 since INQUIRY_LENGTH comfortably fits.
pub type Position = u16;

/// Maximum length, in symbols, of an Input Stream or a Recognition List.
/// Not fixed by spec.md beyond "a compile-time constant"; chosen generously
/// for text input with headroom for image feature streams (see DESIGN.md).
pub const INQUIRY_LENGTH: usize = 512;

/// The store's normalization/filtering regime. Replaces the source's
/// `strcmp(Type, "TEXT"/"CENTRAL"/"IMAGE")` dispatch with a sum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreType {
    /// Symbols are individual ASCII letters/digits. Hit- and
    /// anomaly-threshold filters apply.
    Text,
    /// Symbols are whole uppercase words; positions matter precisely.
    /// Never filtered by hit- or anomaly-threshold.
    Central,
    /// Symbols are small integer feature codes derived from an image.
    Image,
}

/// A symbol's payload, varying by store type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolPayload {
    Char(char),
    Word(String),
    Feature(u16),
}

/// A Recognition Neuron.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub code: SymbolId,
    pub payload: SymbolPayload,
}

/// An Output Neuron: a named recognizable unit.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub code: PatternId,
    pub name: String,
    /// Alternative display label(s). A repeat insertion of an identical RL
    /// appends here instead of inserting a new pattern (the MNIST
    /// multi-label case).
    pub surrogate: Vec<String>,
    pub action: Option<String>,
    /// The pattern's canonical left-to-right spelling in symbol codes.
    pub rl: Vec<SymbolId>,
}

impl Pattern {
    pub fn len(&self) -> usize {
        self.rl.len()
    }

    pub fn display(&self) -> &str {
        self.surrogate.first().map(String::as_str).unwrap_or(&self.name)
    }
}

/// A `(symbol, position, pattern)` triple precomputed from every pattern's
/// RL at build time.
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    pub symbol: SymbolId,
    pub position: Position,
    pub pattern: PatternId,
}

/// Thresholds and tuning knobs for the filter cascade, branch assembly and
/// tournament stages. A direct generalization of the teacher's
/// `SearchParameters`: one field and one `with_*` builder per tunable.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionParameters {
    /// Discard a candidate iff `RNhits / Len(P) <= hit_threshold`. Skipped
    /// for CENTRAL stores.
    pub hit_threshold: f64,
    /// Discard a candidate iff `cntA / Len(P) >= anomaly_threshold`.
    /// Skipped for CENTRAL stores.
    pub anomaly_threshold: f64,
    /// Minimum percent-recognition an envelopment candidate must reach to
    /// absorb a weaker, imperfectly-recognised envelopee.
    pub envelopment_threshold: u8,
    /// Weak-boundary retraction keeps a shrunk candidate only if its
    /// recomputed PER meets this floor.
    pub retract_boundary_threshold: u8,
    /// Discard a candidate iff `C * (EB - BB + 1) <= weak_on_threshold`.
    pub weak_on_threshold: f64,
    /// Orphan candidates below this PER are not seeded as their own branch.
    pub unused_threshold: u8,
    /// Branch-pruning PER cutoffs, applied once live branch count exceeds
    /// 500 / 1000 / 3000 respectively.
    pub per_1_threshold: u8,
    pub per_2_threshold: u8,
    pub per_3_threshold: u8,
    pub prune_at_500: usize,
    pub prune_at_1000: usize,
    pub prune_at_3000: usize,
    /// Cap on the number of tied winners surfaced from an ambiguous
    /// tournament.
    pub total_allowed_results: usize,
    /// Use only a single thread for candidate generation instead of
    /// spreading the per-pattern combination step across rayon's pool.
    pub single_thread: bool,
}

impl Default for RecognitionParameters {
    fn default() -> Self {
        Self {
            hit_threshold: 0.33,
            anomaly_threshold: 0.50,
            envelopment_threshold: 50,
            retract_boundary_threshold: 50,
            weak_on_threshold: 150.0,
            unused_threshold: 50,
            per_1_threshold: 70,
            per_2_threshold: 80,
            per_3_threshold: 90,
            prune_at_500: 500,
            prune_at_1000: 1000,
            prune_at_3000: 3000,
            total_allowed_results: 5,
            single_thread: false,
        }
    }
}

impl RecognitionParameters {
    pub fn with_hit_threshold(mut self, v: f64) -> Self {
        self.hit_threshold = v;
        self
    }
    pub fn with_anomaly_threshold(mut self, v: f64) -> Self {
        self.anomaly_threshold = v;
        self
    }
    pub fn with_envelopment_threshold(mut self, v: u8) -> Self {
        self.envelopment_threshold = v;
        self
    }
    pub fn with_retract_boundary_threshold(mut self, v: u8) -> Self {
        self.retract_boundary_threshold = v;
        self
    }
    pub fn with_weak_on_threshold(mut self, v: f64) -> Self {
        self.weak_on_threshold = v;
        self
    }
    pub fn with_unused_threshold(mut self, v: u8) -> Self {
        self.unused_threshold = v;
        self
    }
    pub fn with_total_allowed_results(mut self, v: usize) -> Self {
        self.total_allowed_results = v;
        self
    }
    pub fn with_single_thread(mut self) -> Self {
        self.single_thread = true;
        self
    }
}

/// Maps symbol payloads to their dense ID, per store.
pub type SymbolEncoder = HashMap<SymbolPayload, SymbolId>;
