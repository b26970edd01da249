use criterion::{Criterion, criterion_group, criterion_main};
use jumphistory::aggregate::TimeBinHistogram;
use jumphistory::analysis::{JumpHistogramAnalysis, LineageSelection, run_analysis};
use jumphistory::jumps::JumpHistoryDecoder;
use jumphistory::model::Tree;
use jumphistory::nexus::Burnin;
use jumphistory::states::{SetMode, StateSetIndex};
use jumphistory::stream::TreeStream;
use jumphistory::walker::{LineageWalker, StopCondition, TimeScale};
use std::collections::BTreeSet;
use std::hint::black_box;
use std::io;

const LOCATIONS: [&str; 3] = ["Anhui", "Fujian", "Zhejiang"];

/// Balanced tree of `2^depth` leaves, internal vertices in Hubei, every
/// leaf lineage jumping into Hubei halfway along its branch.
fn balanced_tree(depth: u32, next_leaf: &mut usize) -> String {
    if depth == 0 {
        let leaf = *next_leaf;
        *next_leaf += 1;
        let location = LOCATIONS[leaf % LOCATIONS.len()];
        return format!("t{leaf}[&location={location},history={{{{0.5,{location},Hubei}}}}]:1");
    }
    let left = balanced_tree(depth - 1, next_leaf);
    let right = balanced_tree(depth - 1, next_leaf);
    format!("({left},{right})[&location=Hubei]:1")
}

fn sample(depth: u32, num_trees: usize) -> String {
    let mut next_leaf = 0;
    let tree = balanced_tree(depth, &mut next_leaf);
    // Root carries no branch length
    let tree = tree.trim_end_matches(":1");
    format!("{tree};\n").repeat(num_trees)
}

fn walker() -> LineageWalker {
    LineageWalker::new(JumpHistoryDecoder::new(), StopCondition::at_root(), TimeScale::calendar(2017.0))
}

fn parse_sample(content: &str) -> Vec<Tree> {
    TreeStream::for_str(content, Burnin::Count(0))
        .unwrap()
        .collect_all()
        .unwrap()
}

fn stream_parsing(c: &mut Criterion) {
    let content = sample(7, 100);
    c.bench_function("parse_128_taxa_x100", |b| {
        b.iter(|| parse_sample(black_box(&content)));
    });
}

fn lineage_walking(c: &mut Criterion) {
    let trees = parse_sample(&sample(7, 100));
    let walker = walker();
    c.bench_function("walk_all_lineages_128_taxa_x100", |b| {
        b.iter(|| {
            for tree in &trees {
                for leaf in tree.leaves() {
                    black_box(walker.walk(tree, leaf).unwrap());
                }
            }
        });
    });
}

fn jump_histogram(c: &mut Criterion) {
    let content = sample(7, 100);
    let observed: BTreeSet<String> = LOCATIONS
        .iter()
        .chain(["Hubei"].iter())
        .map(|s| s.to_string())
        .collect();
    let index = StateSetIndex::build(&[], SetMode::Iterate, &observed);

    c.bench_function("jump_histogram_128_taxa_x100", |b| {
        b.iter(|| {
            let histogram = TimeBinHistogram::new(2010.0, 2017.0, 50, index.clone(), index.clone()).unwrap();
            let mut analysis = JumpHistogramAnalysis::new(walker(), LineageSelection::default(), histogram);
            let mut stream = TreeStream::for_str(&content, Burnin::Count(0)).unwrap();
            run_analysis(&mut stream, &mut analysis, &mut io::sink()).unwrap()
        });
    });
}

criterion_group!(benches, stream_parsing, lineage_walking);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = jump_histogram
}
criterion_main!(benches, reporting);
