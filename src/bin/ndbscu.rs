extern crate clap;

use std::fs;
use std::io::{self, BufRead, Write};

use clap::{App, Arg, SubCommand};

use ndbscu::{Engine, PatternSpec, RecognitionParameters, SCUConfig, StoreType, VocabularyStore};

/// Parse the `;;`-record vocabulary-file grammar from spec.md §6: each
/// record line is `;;` followed by comma-separated `BODY[:SURROGATE[:ACTION]]`
/// patterns. This parsing lives in the CLI, not the core, because file I/O
/// for vocabulary text files is the "interactive menu" collaborator's job,
/// not the read-only Vocabulary Store's.
fn parse_vocab_file(path: &str) -> io::Result<Vec<PatternSpec>> {
    let contents = fs::read_to_string(path)?;
    let mut specs = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        let record = match line.strip_prefix(";;") {
            Some(rest) => rest.trim(),
            None => continue,
        };
        for entry in record.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let mut parts = entry.splitn(3, ':');
            let body = parts.next().unwrap_or("").to_string();
            if body.is_empty() {
                continue;
            }
            let mut spec = PatternSpec::new(body);
            if let Some(surrogate) = parts.next() {
                if !surrogate.is_empty() {
                    spec = spec.with_surrogate(surrogate);
                }
            }
            if let Some(action) = parts.next() {
                if !action.is_empty() {
                    spec = spec.with_action(action);
                }
            }
            specs.push(spec);
        }
    }
    Ok(specs)
}

fn store_type_arg(name: &str) -> StoreType {
    match name.to_ascii_uppercase().as_str() {
        "TEXT" => StoreType::Text,
        "CENTRAL" => StoreType::Central,
        other => panic!("unsupported --type {} (build/query work on TEXT or CENTRAL; IMAGE stores are built programmatically via ndbscu::image)", other),
    }
}

fn load_or_build_store(vocab_file: &str, store_type: StoreType, debug: bool) -> VocabularyStore {
    let specs = parse_vocab_file(vocab_file)
        .unwrap_or_else(|e| panic!("ERROR: unable to read vocabulary file {}: {}", vocab_file, e));
    VocabularyStore::build(store_type, &specs)
        .unwrap_or_else(|e| panic!("ERROR: failed to build vocabulary from {}: {}", vocab_file, e))
        .with_debug(debug)
}

fn scu_config_from_args(disabled: &[&str]) -> SCUConfig {
    let mut config = SCUConfig::all_enabled();
    for name in disabled {
        match *name {
            "space-b" => config.space_b = false,
            "anomaly" => config.anomaly = false,
            "rec" => config.rec = false,
            "min-pr" => config.min_pr = false,
            "bound" => config.bound = false,
            "un-count" => config.un_count = false,
            "mislead" => config.mislead = false,
            other => eprintln!("warning: unknown agent name '{}' ignored", other),
        }
    }
    config
}

fn output_tsv(input: &str, outcome: &ndbscu::RecognitionOutcome) {
    print!("{}", input);
    for winner in &outcome.winners {
        for seg in winner {
            print!("\t{}\t{}-{}", seg.display, seg.begin, seg.end);
            if let Some(action) = &seg.action {
                print!("\t{}", action);
            }
        }
        print!("\t|");
    }
    if outcome.ambiguous {
        print!("\tAMBIGUOUS");
    }
    println!();
}

fn output_json(input: &str, outcome: &ndbscu::RecognitionOutcome, seqnr: usize) {
    if seqnr > 1 {
        println!(",");
    }
    println!("  {{ \"input\": \"{}\", \"ambiguous\": {}, \"winners\": [", input.replace('"', "\\\""), outcome.ambiguous);
    let n = outcome.winners.len();
    for (wi, winner) in outcome.winners.iter().enumerate() {
        println!("    [");
        let m = winner.len();
        for (si, seg) in winner.iter().enumerate() {
            print!(
                "      {{ \"on\": \"{}\", \"begin\": {}, \"end\": {} }}",
                seg.display.replace('"', "\\\""),
                seg.begin,
                seg.end
            );
            println!("{}", if si + 1 < m { "," } else { "" });
        }
        println!("    ]{}", if wi + 1 < n { "," } else { "" });
    }
    println!("  ] }}");
}

fn run_query(args: &clap::ArgMatches, json: bool) {
    let vocab_file = args.value_of("vocab").unwrap();
    let store_type = store_type_arg(args.value_of("type").unwrap_or("TEXT"));
    let debug = args.is_present("debug");
    let vs = load_or_build_store(vocab_file, store_type, debug);

    let disabled: Vec<&str> = args.values_of("disable-agent").map(|v| v.collect()).unwrap_or_default();
    let scu_config = scu_config_from_args(&disabled);
    let params = RecognitionParameters::default();
    let engine = Engine::new(vs).with_params(params).with_scu_config(scu_config).with_debug(debug);

    let files: Vec<&str> = args.values_of("files").map(|v| v.collect()).unwrap_or_else(|| vec!["-"]);
    if json {
        println!("[");
    }
    let mut seqnr = 0;
    for filename in files {
        let lines: Box<dyn Iterator<Item = io::Result<String>>> = match filename {
            "-" | "STDIN" | "stdin" => Box::new(io::stdin().lock().lines()),
            _ => {
                let f = fs::File::open(filename)
                    .unwrap_or_else(|e| panic!("ERROR: unable to open file {}: {}", filename, e));
                Box::new(io::BufReader::new(f).lines())
            }
        };
        for line in lines.flatten() {
            seqnr += 1;
            let outcome = engine.recognize(&line).unwrap_or_else(|e| panic!("ERROR: recognition failed: {}", e));
            if json {
                output_json(&line, &outcome, seqnr);
            } else {
                output_tsv(&line, &outcome);
            }
        }
    }
    if json {
        println!("]");
    }
}

/// Run a regression file of `input<TAB>expected-ON` lines against the
/// store, reporting a pass/fail tally (the CLI's non-interactive analogue
/// of the source's "run a regression test file" menu option).
fn run_test(args: &clap::ArgMatches) {
    let vocab_file = args.value_of("vocab").unwrap();
    let store_type = store_type_arg(args.value_of("type").unwrap_or("TEXT"));
    let vs = load_or_build_store(vocab_file, store_type, false);
    let engine = Engine::new(vs);

    let test_file = args.value_of("test_file").unwrap();
    let contents = fs::read_to_string(test_file)
        .unwrap_or_else(|e| panic!("ERROR: unable to open test file {}: {}", test_file, e));

    let mut passed = 0usize;
    let mut failed = 0usize;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let input = fields.next().unwrap_or("");
        let expected = fields.next().unwrap_or("").trim();
        let outcome = engine.recognize(input).unwrap_or_default();
        let got_match = outcome
            .winners
            .iter()
            .any(|winner| winner.iter().any(|seg| seg.display == expected));
        if got_match {
            passed += 1;
        } else {
            failed += 1;
            println!("FAIL: input={:?} expected={:?}", input, expected);
        }
    }
    println!("passed={} failed={}", passed, failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_agents(args: &clap::ArgMatches) {
    let disabled: Vec<&str> = args.values_of("disable-agent").map(|v| v.collect()).unwrap_or_default();
    let config = scu_config_from_args(&disabled);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (name, enabled) in [
        ("space-b", config.space_b),
        ("anomaly", config.anomaly),
        ("rec", config.rec),
        ("min-pr", config.min_pr),
        ("bound", config.bound),
        ("un-count", config.un_count),
        ("mislead", config.mislead),
    ] {
        writeln!(out, "{}\t{}", name, if enabled { "on" } else { "off" }).ok();
    }
}

fn vocab_and_type_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("vocab")
            .long("vocab")
            .short("v")
            .help("Vocabulary file in the `;;`-record BODY[:SURROGATE[:ACTION]] grammar")
            .takes_value(true)
            .required(true),
        Arg::with_name("type")
            .long("type")
            .short("t")
            .help("Store type: TEXT or CENTRAL")
            .takes_value(true)
            .default_value("TEXT"),
        Arg::with_name("disable-agent")
            .long("disable-agent")
            .help("Disable one of the seven SCU agents (space-b, anomaly, rec, min-pr, bound, un-count, mislead); may be used multiple times")
            .takes_value(true)
            .number_of_values(1)
            .multiple(true),
        Arg::with_name("debug")
            .long("debug")
            .short("D")
            .help("Print eprintln! pipeline-stage tracing"),
    ]
}

fn main() {
    let matches = App::new("ndbscu")
        .version("0.1")
        .author("Gary J. Lassiter <ndbscu@example.invalid>")
        .about("Inexact, order-tolerant pattern matcher over user-defined symbol vocabularies")
        .subcommand(
            SubCommand::with_name("build")
                .about("Build a store from a vocabulary file and write its NDB_HEAD/NDB_ON/NDB_RN/NDB_RN_TO_ON serialization")
                .arg(Arg::with_name("vocab").long("vocab").short("v").takes_value(true).required(true))
                .arg(Arg::with_name("type").long("type").short("t").takes_value(true).default_value("TEXT"))
                .arg(Arg::with_name("out").long("out").short("o").takes_value(true).required(true)),
        )
        .subcommand(
            SubCommand::with_name("query")
                .about("Query a store built from a vocabulary file; input lines come from files or stdin")
                .args(&vocab_and_type_args())
                .arg(Arg::with_name("json").long("json").short("j").help("Output JSON instead of TSV"))
                .arg(Arg::with_name("files").help("Input files").takes_value(true).multiple(true)),
        )
        .subcommand(
            SubCommand::with_name("test")
                .about("Run a regression file of `input<TAB>expected-ON` lines against a store")
                .args(&vocab_and_type_args())
                .arg(Arg::with_name("test_file").help("Regression test file").takes_value(true).required(true)),
        )
        .subcommand(
            SubCommand::with_name("agents")
                .about("Print which of the seven SCU agents are active for a run")
                .arg(
                    Arg::with_name("disable-agent")
                        .long("disable-agent")
                        .takes_value(true)
                        .number_of_values(1)
                        .multiple(true),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(args)) => {
            let vocab_file = args.value_of("vocab").unwrap();
            let store_type = store_type_arg(args.value_of("type").unwrap_or("TEXT"));
            let vs = load_or_build_store(vocab_file, store_type, false);
            let out_path = args.value_of("out").unwrap();
            fs::write(out_path, vs.save())
                .unwrap_or_else(|e| panic!("ERROR: unable to write {}: {}", out_path, e));
            eprintln!(
                "wrote store with {} patterns, {} symbols, {} connections to {}",
                vs.pattern_count(),
                vs.symbol_count(),
                vs.connection_count(),
                out_path
            );
        }
        ("query", Some(args)) => run_query(args, args.is_present("json")),
        ("test", Some(args)) => run_test(args),
        ("agents", Some(args)) => run_agents(args),
        _ => {
            eprintln!("no subcommand given; run with --help for usage");
            std::process::exit(2);
        }
    }
}
