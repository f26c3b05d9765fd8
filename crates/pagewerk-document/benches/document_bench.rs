// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the export engine in the pagewerk-document crate.
// Run with `cargo bench -p pagewerk-document --features fixtures`.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use pagewerk_core::types::{Assignments, Mask, PageIndex, Record, RecordId};
use pagewerk_document::pdf::fixtures::sample_pdf;
use pagewerk_document::{
    ExportPlan, ExportSettings, SourcePdf, export_as_new_documents, redact_in_place,
};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Split a 20-page packet across five records, two masks per page.
///
/// Heights alternate between Letter and A5 so every page flips within its
/// own box.
fn bench_split_and_redact(c: &mut Criterion) {
    let heights: Vec<f64> = (0..20)
        .map(|i| if i % 2 == 0 { 792.0 } else { 595.0 })
        .collect();
    let source = SourcePdf::from_bytes(&sample_pdf(&heights)).expect("fixture loads");

    let catalog: Vec<Record> = (0..5)
        .map(|i| Record::new(format!("rec-{i}"), Some(format!("PART-{i:03}").as_str()), None))
        .collect();
    let assignments: Assignments = (1..=20u32)
        .map(|page| (PageIndex(page), RecordId::new(format!("rec-{}", page % 5))))
        .collect();
    let masks: Vec<Mask> = (1..=20u32)
        .flat_map(|page| {
            [
                Mask::new(page, 36.0, 36.0, 200.0, 24.0),
                Mask::new(page, 36.0, 400.0, 120.0, 60.0),
            ]
        })
        .collect();
    let plan = ExportPlan::from_assignments(&assignments).expect("non-empty plan");
    let settings = ExportSettings::default();

    c.bench_function("split_and_redact (20 pages, 5 records)", |b| {
        b.iter(|| {
            let files =
                export_as_new_documents(black_box(&source), &plan, &masks, &catalog, &settings)
                    .expect("export succeeds");
            black_box(files);
        });
    });

    c.bench_function("redact_in_place (20 pages)", |b| {
        b.iter(|| {
            let bytes = redact_in_place(black_box(&source), &masks, &settings).expect("redact succeeds");
            black_box(bytes);
        });
    });
}

criterion_group!(benches, bench_split_and_redact);
criterion_main!(benches);
