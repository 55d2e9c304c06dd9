//! Benchmarks for the parse pipeline.
//!
//! Run with: cargo bench --bench tokenizer_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rustylayout::core::tokenizer::tokenize;
use rustylayout::tree::parse_markup;
use rustylayout::Inflater;

/// A form-like layout with `rows` labelled inputs
fn layout(rows: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent" android:layout_height="wrap_content"
    android:orientation="vertical">
"#,
    );
    for i in 0..rows {
        xml.push_str(&format!(
            r##"    <LinearLayout android:orientation="horizontal" android:layout_width="match_parent" android:layout_height="48dp">
        <TextView android:id="@+id/label_{i}" android:text="Field {i} &amp; more" android:textColor="#ff333333"/>
        <EditText android:id="@+id/input_{i}" android:hint="value" android:layout_weight="1"/>
    </LinearLayout>
"##
        ));
    }
    xml.push_str("</LinearLayout>\n");
    xml
}

fn benchmark_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");
    for rows in [10usize, 100, 1000] {
        let xml = layout(rows);
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &xml, |b, xml| {
            b.iter(|| black_box(tokenize(xml.as_bytes()).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_chunk_sizes(c: &mut Criterion) {
    let xml = layout(200);
    let mut group = c.benchmark_group("parse_markup_chunk");
    group.throughput(Throughput::Bytes(xml.len() as u64));
    for chunk in [64usize, 1024, 8192, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| black_box(parse_markup(xml.as_bytes(), chunk).unwrap()));
        });
    }
    group.finish();
}

fn benchmark_cached_parse(c: &mut Criterion) {
    let xml = layout(200);
    let inflater = Inflater::new();
    inflater.parse(xml.as_str()).unwrap();

    c.bench_function("cached_parse_200_rows", |b| {
        b.iter(|| black_box(inflater.parse(xml.as_str()).unwrap()));
    });
}

criterion_group!(benches, benchmark_tokenize, benchmark_chunk_sizes, benchmark_cached_parse);
criterion_main!(benches);
