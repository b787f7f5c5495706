use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use filedrop::scan::{
    Candidate, FileAttributes, MatchPipeline, MatchRequest, SortOptions, WildcardMatcher,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn make_candidate(i: usize) -> Candidate {
    let created = Utc::now() - Duration::seconds((i * 7 % 1000) as i64);
    Candidate {
        name: format!("File{:05}.txt", (i * 7919) % 100_000),
        extension: ".txt".to_string(),
        path: PathBuf::from(format!("/in/file{}.txt", i)),
        directory: PathBuf::from("/in"),
        size: 100,
        created,
        modified: created,
        attributes: FileAttributes::empty(),
    }
}

fn bench_wildcard(c: &mut Criterion) {
    let mut group = c.benchmark_group("wildcard");
    let names: Vec<String> = (0..1000).map(|i| format!("report_{}_{}.csv", i, i % 13)).collect();

    for pattern in ["*", "*.csv", "report_??_*.csv", "*_1?.*"] {
        let matcher = WildcardMatcher::compile(pattern).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(pattern), &names, |b, names| {
            b.iter(|| names.iter().filter(|n| matcher.is_match(black_box(n))).count());
        });
    }
    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");

    for file_count in [100, 1000, 10000].iter() {
        let candidates: Vec<Candidate> = (0..*file_count).map(make_candidate).collect();

        for sort in [SortOptions::NameAscending, SortOptions::CreationTimeUtcDescending] {
            group.bench_with_input(
                BenchmarkId::new(sort.as_str(), file_count),
                &candidates,
                |b, candidates| {
                    b.iter(|| {
                        let mut set = candidates.clone();
                        sort.sort(black_box(&mut set));
                        set
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let dir = TempDir::new().unwrap();
    for i in 0..2000 {
        let ext = if i % 2 == 0 { "xml" } else { "json" };
        fs::write(dir.path().join(format!("msg{}.{}", i, ext)), "x").unwrap();
    }

    let request = MatchRequest::new(dir.path(), "*.xml;*.json")
        .unwrap()
        .sort(SortOptions::NameAscending);
    let later = Utc::now() + Duration::hours(1);

    let full = MatchPipeline::new(request.clone());
    group.bench_function("matches_2000", |b| {
        b.iter(|| full.matches_at(later).unwrap().count());
    });

    let capped = MatchPipeline::new(request.sort(SortOptions::None).limit(Some(100)));
    group.bench_function("matches_capped_100", |b| {
        b.iter(|| capped.matches_at(later).unwrap().count());
    });

    group.bench_function("find_first", |b| {
        b.iter(|| full.find_first_at(later).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_wildcard, bench_sort, bench_pipeline);
criterion_main!(benches);
