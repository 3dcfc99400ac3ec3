//! Vocabulary Store: the fingerprint index of symbols, patterns, and the
//! symbol -> (position, pattern) connections the Candidate Generator walks.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::NdbError;
use crate::types::{
    Connection, Pattern, PatternId, Position, StoreType, Symbol, SymbolId, SymbolPayload,
    INQUIRY_LENGTH,
};

/// One raw pattern definition as handed to `VocabularyStore::build`, mirroring
/// the `BODY[:SURROGATE[:ACTION]]` vocabulary-file grammar.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub body: String,
    pub surrogate: Option<String>,
    pub action: Option<String>,
}

impl PatternSpec {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into(), surrogate: None, action: None }
    }

    pub fn with_surrogate(mut self, surrogate: impl Into<String>) -> Self {
        self.surrogate = Some(surrogate.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }
}

/// A single, pre-derived feature-code RL (the IMAGE store's input shape:
/// there is no textual BODY to normalise, just a ready symbol vector).
#[derive(Debug, Clone)]
pub struct FeatureSpec {
    pub label: String,
    pub codes: Vec<u16>,
}

/// In-memory index of patterns, symbols, and symbol->pattern-position
/// connections. Built once, read-only during recognition; nothing in the
/// core ever mutates it.
#[derive(Debug, Clone)]
pub struct VocabularyStore {
    store_type: StoreType,
    patterns: Vec<Pattern>,
    symbols: Vec<Symbol>,
    /// Index into `symbols` by payload, for normalisation-time interning.
    payload_index: HashMap<SymbolPayload, SymbolId>,
    /// All connections, grouped by symbol for O(1) CG lookup.
    connections_by_symbol: HashMap<SymbolId, Vec<Connection>>,
    /// Patterns already present, keyed by their normalised RL, so a
    /// duplicate body appends a surrogate instead of inserting twice.
    body_index: HashMap<Vec<SymbolId>, PatternId>,
    pub debug: bool,
}

impl VocabularyStore {
    fn empty(store_type: StoreType) -> Self {
        Self {
            store_type,
            patterns: Vec::new(),
            symbols: Vec::new(),
            payload_index: HashMap::new(),
            connections_by_symbol: HashMap::new(),
            body_index: HashMap::new(),
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn store_type(&self) -> StoreType {
        self.store_type
    }

    /// Normalise one TEXT body to uppercase letters/digits only, discarding
    /// anything else (spaces included).
    fn normalize_text(body: &str) -> String {
        body.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    /// Normalise one CENTRAL body into its space-separated uppercase words.
    fn normalize_central(body: &str) -> Vec<String> {
        body.split_whitespace().map(|w| w.to_ascii_uppercase()).collect()
    }

    fn intern_char(&mut self, c: char) -> SymbolId {
        self.intern(SymbolPayload::Char(c))
    }

    fn intern_word(&mut self, w: String) -> SymbolId {
        self.intern(SymbolPayload::Word(w))
    }

    fn intern_feature(&mut self, code: u16) -> SymbolId {
        self.intern(SymbolPayload::Feature(code))
    }

    fn intern(&mut self, payload: SymbolPayload) -> SymbolId {
        if let Some(&id) = self.payload_index.get(&payload) {
            return id;
        }
        let id = (self.symbols.len() + 1) as SymbolId;
        self.symbols.push(Symbol { code: id, payload: payload.clone() });
        self.payload_index.insert(payload, id);
        id
    }

    /// Build a TEXT or CENTRAL store from a list of pattern specs.
    pub fn build(store_type: StoreType, specs: &[PatternSpec]) -> Result<Self, NdbError> {
        if matches!(store_type, StoreType::Image) {
            return Err(NdbError::InconsistentVocabulary(
                "IMAGE stores must be built with build_image, not build".into(),
            ));
        }
        let mut vs = Self::empty(store_type);
        for spec in specs {
            let rl: Vec<SymbolId> = match store_type {
                StoreType::Text => {
                    let normalized = Self::normalize_text(&spec.body);
                    normalized.chars().map(|c| vs.intern_char(c)).collect()
                }
                StoreType::Central => {
                    Self::normalize_central(&spec.body).into_iter().map(|w| vs.intern_word(w)).collect()
                }
                StoreType::Image => unreachable!(),
            };
            if rl.is_empty() {
                continue;
            }
            if rl.len() > INQUIRY_LENGTH {
                return Err(NdbError::InconsistentVocabulary(format!(
                    "pattern '{}' RL length {} exceeds INQUIRY_LENGTH",
                    spec.body,
                    rl.len()
                )));
            }
            vs.insert_or_merge(&spec.body, spec.surrogate.clone(), spec.action.clone(), rl);
        }
        if vs.patterns.is_empty() {
            return Err(NdbError::EmptyVocabulary);
        }
        vs.rebuild_connections();
        Ok(vs)
    }

    /// Build an IMAGE store from pre-derived feature-code RLs (one per
    /// training sample), as produced by `crate::image::extract_views`.
    pub fn build_image(specs: &[FeatureSpec]) -> Result<Self, NdbError> {
        let mut vs = Self::empty(StoreType::Image);
        for spec in specs {
            if spec.codes.is_empty() {
                continue;
            }
            if spec.codes.len() > INQUIRY_LENGTH {
                return Err(NdbError::InconsistentVocabulary(format!(
                    "image pattern '{}' RL length {} exceeds INQUIRY_LENGTH",
                    spec.label,
                    spec.codes.len()
                )));
            }
            let rl: Vec<SymbolId> = spec.codes.iter().map(|&c| vs.intern_feature(c)).collect();
            vs.insert_or_merge(&spec.label, None, None, rl);
        }
        if vs.patterns.is_empty() {
            return Err(NdbError::EmptyVocabulary);
        }
        vs.rebuild_connections();
        Ok(vs)
    }

    fn insert_or_merge(
        &mut self,
        name: &str,
        surrogate: Option<String>,
        action: Option<String>,
        rl: Vec<SymbolId>,
    ) {
        if let Some(&existing) = self.body_index.get(&rl) {
            let idx = (existing - 1) as usize;
            let label = surrogate.unwrap_or_else(|| name.to_string());
            if !self.patterns[idx].surrogate.contains(&label) {
                self.patterns[idx].surrogate.push(label);
            }
            if self.debug {
                eprintln!("vocab: merged duplicate body into ON {} as surrogate", existing);
            }
            return;
        }
        let code = (self.patterns.len() + 1) as PatternId;
        let mut pattern_surrogate = Vec::new();
        if let Some(s) = surrogate {
            pattern_surrogate.push(s);
        }
        self.patterns.push(Pattern {
            code,
            name: name.to_string(),
            surrogate: pattern_surrogate,
            action,
            rl: rl.clone(),
        });
        self.body_index.insert(rl, code);
        if self.debug {
            eprintln!("vocab: inserted ON {} '{}'", code, name);
        }
    }

    fn rebuild_connections(&mut self) {
        self.connections_by_symbol.clear();
        for pattern in &self.patterns {
            for (i, &symbol) in pattern.rl.iter().enumerate() {
                let conn = Connection {
                    symbol,
                    position: (i + 1) as Position,
                    pattern: pattern.code,
                };
                self.connections_by_symbol.entry(symbol).or_default().push(conn);
            }
        }
    }

    pub fn pattern(&self, code: PatternId) -> Option<&Pattern> {
        self.patterns.get((code as usize).checked_sub(1)?)
    }

    pub fn symbol(&self, code: SymbolId) -> Option<&Symbol> {
        self.symbols.get((code as usize).checked_sub(1)?)
    }

    pub fn symbol_for_char(&self, c: char) -> Option<SymbolId> {
        self.payload_index.get(&SymbolPayload::Char(c)).copied()
    }

    pub fn symbol_for_word(&self, w: &str) -> Option<SymbolId> {
        self.payload_index.get(&SymbolPayload::Word(w.to_string())).copied()
    }

    pub fn symbol_for_feature(&self, code: u16) -> Option<SymbolId> {
        self.payload_index.get(&SymbolPayload::Feature(code)).copied()
    }

    pub fn connections_for(&self, symbol: SymbolId) -> &[Connection] {
        self.connections_by_symbol.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections_by_symbol.values().map(Vec::len).sum()
    }

    /// Serialise to the `NDB_HEAD`/`NDB_ON`/`NDB_RN`/`NDB_RN_TO_ON` line
    /// format, terminated by `$$$ End Of File`.
    pub fn save(&self) -> String {
        let mut out = String::new();
        let type_name = match self.store_type {
            StoreType::Text => "TEXT",
            StoreType::Central => "CENTRAL",
            StoreType::Image => "IMAGE",
        };
        writeln!(out, "NDB_HEAD").unwrap();
        writeln!(out, "ONcount={}", self.patterns.len()).unwrap();
        writeln!(out, "RNcount={}", self.symbols.len()).unwrap();
        writeln!(out, "ConnectCount={}", self.connection_count()).unwrap();
        writeln!(out, "Type={}", type_name).unwrap();
        writeln!(out).unwrap();

        writeln!(out, "NDB_ON").unwrap();
        for p in &self.patterns {
            writeln!(
                out,
                "ONcode={},Len={},ON={},SUR={},ACT={}",
                p.code,
                p.rl.len(),
                p.name,
                p.surrogate.join("|"),
                p.action.as_deref().unwrap_or("")
            )
            .unwrap();
        }
        writeln!(out).unwrap();

        writeln!(out, "NDB_RN").unwrap();
        for s in &self.symbols {
            let payload = match &s.payload {
                SymbolPayload::Char(c) => format!("CHAR:{}", c),
                SymbolPayload::Word(w) => format!("WORD:{}", w),
                SymbolPayload::Feature(f) => format!("FEATURE:{}", f),
            };
            writeln!(out, "RNcode={},Payload={}", s.code, payload).unwrap();
        }
        writeln!(out).unwrap();

        writeln!(out, "NDB_RN_TO_ON").unwrap();
        for p in &self.patterns {
            for (i, &symbol) in p.rl.iter().enumerate() {
                writeln!(out, "RNcode={},Position={},ONcode={}", symbol, i + 1, p.code).unwrap();
            }
        }
        writeln!(out).unwrap();
        writeln!(out, "$$$ End Of File").unwrap();
        out
    }

    /// Parse the format produced by `save`.
    pub fn load(data: &str) -> Result<Self, NdbError> {
        let mut lines = data.lines();
        let mut store_type = None;
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut symbols: Vec<Symbol> = Vec::new();
        let mut payload_index: HashMap<SymbolPayload, SymbolId> = HashMap::new();

        let mut section = "";
        while let Some(line) = lines.next() {
            let line = line.trim_end();
            if line.is_empty() {
                section = "";
                continue;
            }
            if line == "$$$ End Of File" {
                break;
            }
            match line {
                "NDB_HEAD" | "NDB_ON" | "NDB_RN" | "NDB_RN_TO_ON" => {
                    section = line;
                    continue;
                }
                _ => {}
            }
            match section {
                "NDB_HEAD" => {
                    if let Some(v) = line.strip_prefix("Type=") {
                        store_type = Some(match v {
                            "TEXT" => StoreType::Text,
                            "CENTRAL" => StoreType::Central,
                            "IMAGE" => StoreType::Image,
                            other => {
                                return Err(NdbError::StoreLoadFailed(format!(
                                    "unknown Type={}",
                                    other
                                )))
                            }
                        });
                    }
                }
                "NDB_ON" => {
                    let fields = parse_kv_line(line);
                    let code: PatternId = fields
                        .get("ONcode")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_ON missing ONcode".into()))?
                        .parse()
                        .map_err(|_| NdbError::StoreLoadFailed("bad ONcode".into()))?;
                    let name = fields.get("ON").cloned().unwrap_or_default();
                    let surrogate = fields
                        .get("SUR")
                        .map(|s| s.split('|').filter(|s| !s.is_empty()).map(String::from).collect())
                        .unwrap_or_default();
                    let action = fields.get("ACT").filter(|s| !s.is_empty()).cloned();
                    patterns.push(Pattern { code, name, surrogate, action, rl: Vec::new() });
                }
                "NDB_RN" => {
                    let fields = parse_kv_line(line);
                    let code: SymbolId = fields
                        .get("RNcode")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_RN missing RNcode".into()))?
                        .parse()
                        .map_err(|_| NdbError::StoreLoadFailed("bad RNcode".into()))?;
                    let payload_str = fields
                        .get("Payload")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_RN missing Payload".into()))?;
                    let payload = if let Some(rest) = payload_str.strip_prefix("CHAR:") {
                        SymbolPayload::Char(rest.chars().next().unwrap_or('\0'))
                    } else if let Some(rest) = payload_str.strip_prefix("WORD:") {
                        SymbolPayload::Word(rest.to_string())
                    } else if let Some(rest) = payload_str.strip_prefix("FEATURE:") {
                        SymbolPayload::Feature(
                            rest.parse()
                                .map_err(|_| NdbError::StoreLoadFailed("bad feature code".into()))?,
                        )
                    } else {
                        return Err(NdbError::StoreLoadFailed("unknown symbol payload".into()));
                    };
                    payload_index.insert(payload.clone(), code);
                    symbols.push(Symbol { code, payload });
                }
                "NDB_RN_TO_ON" => {
                    let fields = parse_kv_line(line);
                    let symbol: SymbolId = fields
                        .get("RNcode")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_RN_TO_ON missing RNcode".into()))?
                        .parse()
                        .map_err(|_| NdbError::StoreLoadFailed("bad RNcode".into()))?;
                    let position: Position = fields
                        .get("Position")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_RN_TO_ON missing Position".into()))?
                        .parse()
                        .map_err(|_| NdbError::StoreLoadFailed("bad Position".into()))?;
                    let pattern_code: PatternId = fields
                        .get("ONcode")
                        .ok_or_else(|| NdbError::StoreLoadFailed("NDB_RN_TO_ON missing ONcode".into()))?
                        .parse()
                        .map_err(|_| NdbError::StoreLoadFailed("bad ONcode".into()))?;
                    let idx = (pattern_code - 1) as usize;
                    let pattern = patterns.get_mut(idx).ok_or_else(|| {
                        NdbError::InconsistentVocabulary(format!(
                            "connection references unknown ON {}",
                            pattern_code
                        ))
                    })?;
                    if pattern.rl.len() < position as usize {
                        pattern.rl.resize(position as usize, 0);
                    }
                    pattern.rl[position as usize - 1] = symbol;
                }
                _ => {}
            }
        }

        let store_type = store_type
            .ok_or_else(|| NdbError::StoreLoadFailed("missing NDB_HEAD Type".into()))?;
        if patterns.is_empty() {
            return Err(NdbError::EmptyVocabulary);
        }

        let body_index: HashMap<Vec<SymbolId>, PatternId> =
            patterns.iter().map(|p| (p.rl.clone(), p.code)).collect();

        let mut vs = Self {
            store_type,
            patterns,
            symbols,
            payload_index,
            connections_by_symbol: HashMap::new(),
            body_index,
            debug: false,
        };
        vs.validate()?;
        vs.rebuild_connections();
        Ok(vs)
    }

    fn validate(&self) -> Result<(), NdbError> {
        let max_symbol = self.symbols.len() as SymbolId;
        for p in &self.patterns {
            if p.rl.is_empty() {
                return Err(NdbError::InconsistentVocabulary(format!(
                    "ON {} has an empty RL",
                    p.code
                )));
            }
            for &s in &p.rl {
                if s == 0 || s > max_symbol {
                    return Err(NdbError::InconsistentVocabulary(format!(
                        "ON {} references unknown RN {}",
                        p.code, s
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_kv_line(line: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for field in line.split(',') {
        if let Some((k, v)) = field.split_once('=') {
            map.insert(k.to_string(), v.to_string());
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_text_interns_and_connects() {
        let vs = VocabularyStore::build(
            StoreType::Text,
            &[PatternSpec::new("FRIDAY"), PatternSpec::new("SATURDAY")],
        )
        .unwrap();
        assert_eq!(vs.pattern_count(), 2);
        let f = vs.symbol_for_char('F').unwrap();
        assert!(vs.connections_for(f).iter().any(|c| c.position == 1));
    }

    #[test]
    fn duplicate_body_merges_into_surrogate() {
        let vs = VocabularyStore::build(
            StoreType::Text,
            &[
                PatternSpec::new("ABC").with_surrogate("first"),
                PatternSpec::new("abc").with_surrogate("second"),
            ],
        )
        .unwrap();
        assert_eq!(vs.pattern_count(), 1);
        assert_eq!(vs.patterns()[0].surrogate, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn empty_specs_fail_with_empty_vocabulary() {
        let err = VocabularyStore::build(StoreType::Text, &[]).unwrap_err();
        assert!(matches!(err, NdbError::EmptyVocabulary));
    }

    #[test]
    fn save_then_load_round_trips_patterns() {
        let vs = VocabularyStore::build(
            StoreType::Text,
            &[PatternSpec::new("FRIDAY").with_action("ACT_DAY")],
        )
        .unwrap();
        let serialized = vs.save();
        let reloaded = VocabularyStore::load(&serialized).unwrap();
        assert_eq!(reloaded.pattern_count(), 1);
        assert_eq!(reloaded.patterns()[0].name, "FRIDAY");
        assert_eq!(reloaded.patterns()[0].action.as_deref(), Some("ACT_DAY"));
        assert_eq!(reloaded.patterns()[0].rl, vs.patterns()[0].rl);
    }

    #[test]
    fn central_store_splits_on_words() {
        let vs = VocabularyStore::build(
            StoreType::Central,
            &[PatternSpec::new("what time is it").with_action("ACT_TIME")],
        )
        .unwrap();
        assert_eq!(vs.patterns()[0].rl.len(), 4);
    }
}
