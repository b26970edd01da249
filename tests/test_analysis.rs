use jumphistory::analysis::run_analysis;
use jumphistory::config::AnalysisConfig;
use jumphistory::error::AnalysisError;
use jumphistory::states::discover_states;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// Histories read from the tip upwards: `{t, below, above}`.
//
// Tree 0 heights: (A,B) 3, ((A,B),C) 6, root 10.
// Tree 1 heights: (A,B) 2, (C,D) 1, root 4.
const LINEAGE_TREES: &str = "\
(((A[&location=Hubei]:3,B[&location=Hubei]:3)[&location=Hubei]:3,\
C[&location=Anhui,history={{2.0,Anhui,Hubei}}]:6)[&location=Hubei,history={{8.0,Hubei,Fujian}}]:4,\
D[&location=Fujian]:10)[&location=Fujian];
((A[&location=Hubei]:2,B[&location=Hubei]:2)[&location=Hubei]:2,\
(C[&location=Anhui]:1,D[&location=Fujian,history={{0.5,Fujian,Anhui}}]:1)\
[&location=Anhui,history={{3.0,Anhui,Hubei}}]:3)[&location=Hubei];
";

// Histories as logged by the sampler: `{t, ancestral, descendant}`.
const CHAIN_TREE: &str = "\
(((A[&location=Hubei]:3,B[&location=Hubei]:3)[&location=Hubei]:3,\
C[&location=Anhui,history={{2.0,Hubei,Anhui}}]:6)[&location=Hubei,history={{8.0,Fujian,Hubei}}]:4,\
D[&location=Fujian]:10)[&location=Fujian];
";

const SITE_TREE: &str = "((A[&history={{1,0.5,GCG,GAG}}]:1,B:1)[&history={{1,1.5,GCA,GCG}}]:1,\
C[&history={{2,1.0,TTT,TTC}}]:2);\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Workspace {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Writes the configuration `body` reading `trees` and loads it back.
    fn config(&self, trees: &Path, body: &str) -> AnalysisConfig {
        let content = format!("input = '{}'\n{body}", trees.display());
        let path = self.write("analysis.toml", &content);
        AnalysisConfig::from_file(path).unwrap()
    }
}

fn run(config: &AnalysisConfig) -> (usize, String) {
    config.validate().unwrap();
    let mut analysis = config.build_analysis().unwrap();
    let mut stream = config.open_stream().unwrap();
    let mut out = Vec::new();
    let num_trees = run_analysis(&mut stream, analysis.as_mut(), &mut out).unwrap();
    (num_trees, String::from_utf8(out).unwrap())
}

/// Returns the cell in the row starting with `key` under the column `column`.
fn cell<'a>(table: &'a str, key: &str, column: &str) -> &'a str {
    let mut lines = table.lines();
    let header: Vec<&str> = lines.next().unwrap().split('\t').collect();
    let index = header.iter().position(|c| *c == column).unwrap();
    let row = lines
        .map(|line| line.split('\t').collect::<Vec<_>>())
        .find(|row| row[0] == key)
        .unwrap();
    row[index]
}

// ============= Taxa jumps =============

#[test]
fn test_taxa_jumps_in_calendar_time() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let config = workspace.config(
        &trees,
        r#"
        mrsd = 2020.0

        [selection]
        taxa_to_process = ["A"]

        [analysis]
        kind = "taxa_jumps"
        "#,
    );

    let (num_trees, table) = run(&config);
    assert_eq!(num_trees, 2);
    assert_eq!(
        table,
        "taxonId,treeId,location,startTime,endTime\n\
         A,0,Hubei,2020,2012\n\
         A,0,Fujian,2012,2010\n\
         A,1,Hubei,2020,2016\n"
    );
}

#[test]
fn test_taxa_jumps_stop_at_end_state() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let config = workspace.config(
        &trees,
        r#"
        [selection]
        taxa_to_process = ["C"]

        [analysis]
        kind = "taxa_jumps"
        end_state = "Hubei"
        "#,
    );

    let (_, table) = run(&config);
    assert_eq!(
        table.lines().skip(1).collect::<Vec<_>>(),
        vec![
            "C,0,Anhui,0,2",
            "C,0,Hubei,2,6",
            "C,1,Anhui,0,3",
            "C,1,Hubei,3,4"
        ]
    );
}

#[test]
fn test_taxa_jumps_with_merged_states_and_burn_in() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let merge = workspace.write("merge.tsv", "State\tNew_State\nAnhui\tCentral\nhubei\tCentral\n");
    let config = workspace.config(
        &trees,
        &format!(
            r#"
            burn_in = 1
            merge_states = '{}'

            [selection]
            taxa_to_process = ["A"]

            [analysis]
            kind = "taxa_jumps"
            "#,
            merge.display()
        ),
    );

    let (num_trees, table) = run(&config);
    assert_eq!(num_trees, 1);
    assert_eq!(table.lines().skip(1).collect::<Vec<_>>(), vec!["A,1,Central,0,4"]);
}

// ============= Jump histogram =============

#[test]
fn test_histogram_over_all_observed_states() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    assert_eq!(
        discover_states(&trees, "location").unwrap(),
        BTreeSet::from(["Anhui".to_string(), "Fujian".to_string(), "Hubei".to_string()])
    );

    let config = workspace.config(
        &trees,
        r#"
        [analysis]
        kind = "jump_histogram"
        bins = 5
        min = 0.0
        max = 10.0
        "#,
    );
    let (num_trees, table) = run(&config);
    assert_eq!(num_trees, 2);

    // Header plus one row per bin, one column per ordered pair of 3 states
    assert_eq!(table.lines().count(), 6);
    assert_eq!(table.lines().next().unwrap().split('\t').count(), 10);

    assert_eq!(cell(&table, "0", "Anhui->Hubei"), "1");
    assert_eq!(cell(&table, "0", "Fujian->Anhui"), "1");
    assert_eq!(cell(&table, "2.5", "Anhui->Hubei"), "1");
    assert_eq!(cell(&table, "7.5", "Hubei->Fujian"), "1");
    assert_eq!(cell(&table, "7.5", "Anhui->Hubei"), "0");
}

#[test]
fn test_histogram_with_combined_states() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let config = workspace.config(
        &trees,
        r#"
        [analysis]
        kind = "jump_histogram"
        bins = 5
        min = 0.0
        max = 10.0
        from_states = ["Anhui", "Fujian"]
        to_states = ["Hubei", "Anhui"]
        iterate_from = false
        "#,
    );
    let (_, table) = run(&config);
    assert_eq!(table.lines().next(), Some("time\tAnhui+Fujian->Anhui\tAnhui+Fujian->Hubei"));
    assert_eq!(cell(&table, "0", "Anhui+Fujian->Hubei"), "1");
    assert_eq!(cell(&table, "0", "Anhui+Fujian->Anhui"), "1");
}

// ============= Transmission chains =============

#[test]
fn test_chain_census_table() {
    let workspace = Workspace::new();
    let trees = workspace.write("chains.trees", CHAIN_TREE);
    let config = workspace.config(
        &trees,
        r#"
        [analysis]
        kind = "transmission_chains"
        states = ["Hubei"]
        "#,
    );

    let (_, table) = run(&config);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("treeId\tstartNodeID\tendNodeID\tsourceLocation"));

    let fields: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(fields[0], "0");
    assert_eq!(
        &fields[3..],
        &["Fujian", "Hubei", "8", "3", "2", "2", "0.6", "10", "false", "{\"Anhui\":1}"]
    );
}

#[test]
fn test_chain_time_slice_in_calendar_time() {
    let workspace = Workspace::new();
    let trees = workspace.write("chains.trees", CHAIN_TREE);
    let config = workspace.config(
        &trees,
        r#"
        mrsd = 2020.0

        [analysis]
        kind = "transmission_chains"
        states = ["Hubei"]
        time_slice = 2016.0
        "#,
    );

    let (_, table) = run(&config);
    let fields: Vec<&str> = table.lines().nth(1).unwrap().split('\t').collect();
    // Nothing below height 4 is censused
    assert_eq!(fields[6], "0");
    assert_eq!(fields[8], "0");
    assert_eq!(fields[9], "0.2");
}

#[test]
fn test_chain_tree_without_states_is_skipped() {
    let workspace = Workspace::new();
    let trees = workspace.write("chains.trees", &format!("(A:1,B[&location=Hubei]:1);\n{CHAIN_TREE}"));
    let config = workspace.config(
        &trees,
        r#"
        [analysis]
        kind = "transmission_chains"
        states = ["Hubei"]
        "#,
    );

    let (num_trees, table) = run(&config);
    assert_eq!(num_trees, 2);
    assert!(table.lines().skip(1).all(|line| line.starts_with("1\t")));
}

// ============= Persistence at evaluation times =============

#[test]
fn test_persistence_times_at_two_dates() {
    let workspace = Workspace::new();
    let trees = workspace.write("chains.trees", CHAIN_TREE);
    let config = workspace.config(
        &trees,
        r#"
        mrsd = 2020.0

        [analysis]
        kind = "persistence_times"
        evaluation_times = [2016.0, 2019.0]
        "#,
    );

    let (_, table) = run(&config);
    let mut lines = table.lines();
    assert!(lines.next().unwrap().starts_with("treeId,evaluationTime,ancestralTime"));
    let rows: Vec<Vec<&str>> = lines.map(|line| line.split(',').collect()).collect();
    // Three lineages cross height 4, four cross height 1
    assert_eq!(rows.iter().filter(|row| row[1] == "2016").count(), 3);
    assert_eq!(rows.iter().filter(|row| row[1] == "2019").count(), 4);

    let fujian = rows
        .iter()
        .find(|row| row[1] == "2016" && row[5] == "Fujian")
        .unwrap();
    assert_eq!(&fujian[6..9], &["Fujian", "6", "6"]);
    let anhui = rows.iter().find(|row| row[5] == "Anhui").unwrap();
    assert_eq!(&anhui[1..3], &["2019", "NA"]);
    assert_eq!(&anhui[6..8], &["Hubei", "1"]);
}

// ============= Ancestral states =============

#[test]
fn test_ancestral_states_with_translation() {
    let workspace = Workspace::new();
    let trees = workspace.write("codons.trees", SITE_TREE);
    let config = workspace.config(
        &trees,
        r#"
        [analysis]
        kind = "ancestral_states"
        translate_codons = true
        "#,
    );

    let (_, table) = run(&config);
    assert_eq!(table.lines().next(), Some("treeId\tvertex\ttaxon\tsite\tstate\taminoAcid"));
    // Five vertices, two sites each
    assert_eq!(table.lines().count(), 11);
    assert!(table.contains("\tA\t1\tGAG\tE\n"));
    assert!(table.contains("\tB\t1\tGCG\tA\n"));
    assert!(table.contains("\tB\t2\tTTT\tF\n"));
    assert!(table.contains("\tC\t1\tGCA\tA\n"));
    assert!(table.contains("\tNA\t1\tGCA\tA\n"));
}

// ============= Event counts =============

#[test]
fn test_event_counts_in_calendar_window() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let config = workspace.config(
        &trees,
        r#"
        mrsd = 2020.0

        [analysis]
        kind = "event_counts"
        window_start = 2013.0
        window_end = 2018.0
        "#,
    );

    let (_, table) = run(&config);
    assert_eq!(
        table,
        "treeId\twindowStart\twindowEnd\tcoalescentEvents\tjumps\n\
         0\t2013\t2018\t2\t1\n\
         1\t2013\t2018\t2\t1\n"
    );
}

// ============= Configuration =============

#[test]
fn test_invalid_settings_are_rejected() {
    let invalid = [
        "[analysis]\nkind = \"jump_histogram\"\nbins = 1\nmin = 0.0\nmax = 1.0\n",
        "[analysis]\nkind = \"jump_histogram\"\nbins = 4\nmin = 2.0\nmax = 1.0\n",
        "[analysis]\nkind = \"transmission_chains\"\nstates = []\n",
        "[analysis]\nkind = \"event_counts\"\nwindow_start = 3.0\nwindow_end = 1.0\n",
        "[analysis]\nkind = \"persistence_times\"\nevaluation_times = []\n",
    ];
    for body in invalid {
        let config = AnalysisConfig::from_toml_str(&format!("input = 'run.trees'\n{body}")).unwrap();
        assert!(
            matches!(config.validate(), Err(AnalysisError::Configuration(_))),
            "accepted {body}"
        );
    }

    assert!(matches!(
        AnalysisConfig::from_toml_str("input = 'run.trees'\n[analysis]\nkind = \"coalescent\"\n"),
        Err(AnalysisError::Configuration(_))
    ));
}

#[test]
fn test_end_time_without_mrsd_is_dropped() {
    let workspace = Workspace::new();
    let trees = workspace.write("h7n9.trees", LINEAGE_TREES);
    let config = workspace.config(
        &trees,
        r#"
        [selection]
        taxa_to_process = ["A"]

        [analysis]
        kind = "taxa_jumps"
        end_time = 2015.0
        "#,
    );

    assert_eq!(config.validate().unwrap().len(), 1);
    let (_, table) = run(&config);
    assert!(table.ends_with("A,1,Hubei,0,4\n"));
}

#[test]
fn test_missing_input_fails_to_open() {
    let config = AnalysisConfig::from_toml_str(
        "input = 'does/not/exist.trees'\n[analysis]\nkind = \"event_counts\"\nwindow_start = 0.0\nwindow_end = 1.0\n",
    )
    .unwrap();
    assert!(config.open_stream().is_err());
}
