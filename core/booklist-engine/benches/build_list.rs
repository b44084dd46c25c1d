//! FILENAME: core/booklist-engine/benches/build_list.rs
//! Build and cursor timings over generated catalogues.

use std::sync::Arc;

use booklist_engine::{
    BooklistBuilder, BuildCriteria, BuilderConfig, BuilderRegistry, MaterializeStrategy,
    RebuildState,
};
use booklist_style::builtin;
use catalogue_store::{BookRecord, CatalogueDb};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const GENRES: [&str; 6] = ["SF", "Fantasy", "Crime", "History", "sf", "Poetry"];

fn create_catalogue(books: usize) -> CatalogueDb {
    let db = CatalogueDb::open_in_memory().unwrap();
    let authors: Vec<i64> = (0..books / 8 + 1)
        .map(|i| db.insert_author(&format!("Author {:04}", i), "A.").unwrap())
        .collect();
    let series: Vec<i64> = (0..books / 20 + 1)
        .map(|i| db.insert_series(&format!("Series {:03}", i)).unwrap())
        .collect();

    for i in 0..books {
        let mut record = BookRecord {
            genre: Some(GENRES[i % GENRES.len()].to_string()),
            read: i % 3 == 0,
            rating: (i % 6) as f64,
            date_published: Some(format!("{}-{:02}-01", 1950 + i % 70, i % 12 + 1)),
            ..BookRecord::new(format!("Title {:05}", (i * 7919) % books))
                .by(authors[i % authors.len()])
        };
        if i % 2 == 0 {
            let number = (i % 9).to_string();
            record = record.in_series(series[i % series.len()], Some(number.as_str()));
        }
        db.insert_book(&record).unwrap();
    }
    db
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_author_series");
    group.sample_size(20);

    for size in [200, 2000].iter() {
        let db = create_catalogue(*size);
        let registry = Arc::new(BuilderRegistry::new());
        for strategy in [MaterializeStrategy::Rollup, MaterializeStrategy::Incremental] {
            let config = BuilderConfig::default().with_strategy(strategy);
            let mut builder =
                BooklistBuilder::new(&registry, db.clone(), builtin::author_series(), config).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), size),
                size,
                |b, _| {
                    b.iter(|| {
                        builder
                            .build(RebuildState::AlwaysExpanded, &BuildCriteria::new())
                            .unwrap();
                        black_box(builder.get_count().unwrap())
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_rebuild_genre(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild_genre");
    group.sample_size(20);

    for size in [200, 2000].iter() {
        let db = create_catalogue(*size);
        let registry = Arc::new(BuilderRegistry::new());
        let mut builder = BooklistBuilder::new(
            &registry,
            db.clone(),
            builtin::genre(),
            BuilderConfig::default(),
        )
        .unwrap();
        builder
            .build(RebuildState::Preserved, &BuildCriteria::new())
            .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| builder.rebuild().unwrap());
        });
    }
    group.finish();
}

fn bench_cursor_seek(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_seek");

    for size in [2000].iter() {
        let db = create_catalogue(*size);
        let registry = Arc::new(BuilderRegistry::new());
        let mut builder = BooklistBuilder::new(
            &registry,
            db.clone(),
            builtin::author_series(),
            BuilderConfig::default(),
        )
        .unwrap();
        builder
            .build(RebuildState::AlwaysExpanded, &BuildCriteria::new())
            .unwrap();
        let mut cursor = builder.get_list().unwrap();
        let count = cursor.count().unwrap();

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            let mut position = 0;
            b.iter(|| {
                cursor.seek(black_box(position)).unwrap();
                position = (position + 1) % count;
            });
        });

        group.bench_with_input(BenchmarkId::new("scattered", size), size, |b, _| {
            let mut position: i64 = 0;
            b.iter(|| {
                cursor.seek(black_box(position)).unwrap();
                position = (position * 31 + 17) % count;
            });
        });
    }
    group.finish();
}

fn bench_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("toggle_top_level");
    let db = create_catalogue(2000);
    let registry = Arc::new(BuilderRegistry::new());
    let mut builder = BooklistBuilder::new(
        &registry,
        db.clone(),
        builtin::author_series(),
        BuilderConfig::default(),
    )
    .unwrap();
    builder
        .build(RebuildState::AlwaysCollapsed, &BuildCriteria::new())
        .unwrap();

    group.bench_function("toggle", |b| {
        b.iter(|| builder.toggle_expand(black_box(0)).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_rebuild_genre,
    bench_cursor_seek,
    bench_toggle
);
criterion_main!(benches);
