use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ndbscu::{Engine, PatternSpec, RecognitionParameters, StoreType, VocabularyStore};

fn medium_text_store() -> VocabularyStore {
    let words = [
        "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY", "SUNDAY", "JANUARY",
        "FEBRUARY", "MARCH", "APRIL", "MAY", "JUNE", "JULY", "AUGUST", "SEPTEMBER", "OCTOBER",
        "NOVEMBER", "DECEMBER", "MORNING", "AFTERNOON", "EVENING", "MIDNIGHT", "BREAKFAST",
        "LUNCH", "DINNER", "RECOGNITION", "VOCABULARY", "CANDIDATE", "SEGMENTATION",
    ];
    let specs: Vec<PatternSpec> = words.iter().map(|w| PatternSpec::new(*w)).collect();
    VocabularyStore::build(StoreType::Text, &specs).unwrap()
}

pub fn benchmarks(c: &mut Criterion) {
    let vs = medium_text_store();
    let engine = Engine::new(vs);

    let inputs: &[&str] = &[
        "FRIDAY",
        "FRDY",
        "SATURDAYMORNING",
        "the quick brown fox jumped over RECOGNITION and VOCABULARY on THURSOOOOOOOODAY",
    ];

    let mut group = c.benchmark_group("recognize_pipeline");
    for input in inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("recognize", format!("input {} chars", input.chars().count())),
            input,
            |b, input| b.iter(|| engine.recognize(black_box(input)).unwrap()),
        );
    }
    group.finish();

    let mut group = c.benchmark_group("recognize_single_thread");
    let params = RecognitionParameters::default().with_single_thread();
    let single_threaded_engine = Engine::new(medium_text_store()).with_params(params);
    for input in inputs {
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("recognize", format!("input {} chars", input.chars().count())),
            input,
            |b, input| b.iter(|| single_threaded_engine.recognize(black_box(input)).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
