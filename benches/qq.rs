/// Benchmarks for Q-Q plot construction.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use variant_charts::frame::{Field, Frame};
use variant_charts::qq;

fn make_frame(rows_per_subtype: usize) -> Frame {
    let schema = vec![
        Field::new("subtype", "STRING"),
        Field::new("control_percent", "FLOAT"),
        Field::new("percent_diff", "FLOAT"),
        Field::new("case_percent", "FLOAT"),
    ];
    let rows: Vec<Vec<Option<String>>> = ["AIS", "IIS", "JIS"]
        .iter()
        .flat_map(|subtype| {
            (0..rows_per_subtype).map(move |i| {
                let control = ((i * 7919) % 1000) as f64 / 10.0;
                let diff = ((i * 104729) % 200) as f64 / 100.0 - 1.0;
                vec![
                    Some(subtype.to_string()),
                    Some(control.to_string()),
                    Some(diff.to_string()),
                    Some((control + diff).to_string()),
                ]
            })
        })
        .collect();
    Frame::from_bigquery(&schema, &rows).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    for size in [1_000, 20_000] {
        let frame = make_frame(size);
        let name = format!("qq_build({})", size);
        c.bench_function(&name, |b| {
            b.iter(|| {
                let plot = qq::build(black_box(frame.clone())).unwrap().unwrap();
                plot.figure().to_html().unwrap();
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
