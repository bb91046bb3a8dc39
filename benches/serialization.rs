use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde::{Deserialize, Serialize};
use serde_wire::{
    from_binary, from_json, from_text, from_yaml, to_binary, to_json, to_text, to_yaml, translate,
    DocumentWriter, LongConverter, Wire, WireOptions, BASE85,
};

#[derive(Serialize, Deserialize, Clone)]
struct User {
    id: u32,
    name: String,
    email: String,
    active: bool,
}

#[derive(Serialize, Deserialize, Clone)]
struct Quote {
    symbol: String,
    company: String,
    price: f64,
    change: f64,
    volume: u64,
}

fn user() -> User {
    User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        active: true,
    }
}

fn quotes(size: u32) -> Vec<Quote> {
    (0..size)
        .map(|i| Quote {
            symbol: format!("SYM{}", i),
            company: format!("Company {}", i),
            price: 100.0 + f64::from(i) * 0.25,
            change: f64::from(i % 7) - 3.5,
            volume: u64::from(i) * 1_000,
        })
        .collect()
}

fn benchmark_write_simple(c: &mut Criterion) {
    let user = user();
    let mut group = c.benchmark_group("write_simple_struct");

    group.bench_function("text", |b| b.iter(|| to_text(black_box(&user))));
    group.bench_function("yaml", |b| b.iter(|| to_yaml(black_box(&user))));
    group.bench_function("json", |b| b.iter(|| to_json(black_box(&user))));
    group.bench_function("binary", |b| b.iter(|| to_binary(black_box(&user))));
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&user)))
    });

    group.finish();
}

fn benchmark_read_simple(c: &mut Criterion) {
    let user = user();
    let text = to_text(&user).unwrap();
    let yaml = to_yaml(&user).unwrap();
    let json = to_json(&user).unwrap();
    let binary = to_binary(&user).unwrap();
    let mut group = c.benchmark_group("read_simple_struct");

    group.bench_function("text", |b| b.iter(|| from_text::<User>(black_box(&text))));
    group.bench_function("yaml", |b| b.iter(|| from_yaml::<User>(black_box(&yaml))));
    group.bench_function("json", |b| b.iter(|| from_json::<User>(black_box(&json))));
    group.bench_function("binary", |b| {
        b.iter(|| from_binary::<User>(black_box(&binary)))
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::from_str::<User>(black_box(&json)))
    });

    group.finish();
}

fn benchmark_quote_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("quote_array");

    for size in [10, 100, 1000] {
        let quotes = quotes(size);
        group.bench_with_input(BenchmarkId::new("write_text", size), &quotes, |b, q| {
            b.iter(|| to_text(black_box(q)))
        });
        group.bench_with_input(BenchmarkId::new("write_binary", size), &quotes, |b, q| {
            b.iter(|| to_binary(black_box(q)))
        });

        let binary = to_binary(&quotes).unwrap();
        group.bench_with_input(BenchmarkId::new("read_binary", size), &binary, |b, bytes| {
            b.iter(|| from_binary::<Vec<Quote>>(black_box(bytes)))
        });
    }
    group.finish();
}

fn benchmark_translate(c: &mut Criterion) {
    let binary = to_binary(&quotes(100)).unwrap();
    let mut group = c.benchmark_group("translate_from_binary");

    for (name, to) in [
        ("text", WireOptions::text()),
        ("yaml", WireOptions::yaml()),
        ("json", WireOptions::json()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| translate(black_box(&binary), &WireOptions::binary(), &to))
        });
    }
    group.finish();
}

fn benchmark_documents(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_documents");

    for (name, options) in [("text", WireOptions::text()), ("binary", WireOptions::binary())] {
        group.bench_function(name, |b| {
            let wire = Wire::new(options.clone());
            b.iter(|| {
                wire.clear().unwrap();
                for i in 0..100u64 {
                    wire.write_document(false, |out| {
                        out.event("seq")?;
                        out.uint64(i)?;
                        out.event("symbol")?;
                        out.text("III")
                    })
                    .unwrap();
                }
                while let Some(doc) = wire.reading_document().unwrap() {
                    black_box(doc);
                }
            })
        });
    }
    group.finish();
}

fn benchmark_base85(c: &mut Criterion) {
    let mut group = c.benchmark_group("base85");
    let text = BASE85.as_string(0x1234_5678_9abc_def0);

    group.bench_function("as_string", |b| {
        b.iter(|| BASE85.as_string(black_box(0x1234_5678_9abc_def0)))
    });
    group.bench_function("parse", |b| b.iter(|| BASE85.parse(black_box(&text))));

    group.finish();
}

criterion_group!(
    benches,
    benchmark_write_simple,
    benchmark_read_simple,
    benchmark_quote_arrays,
    benchmark_translate,
    benchmark_documents,
    benchmark_base85
);
criterion_main!(benches);
