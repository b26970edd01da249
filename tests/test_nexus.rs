use jumphistory::error::AnalysisError;
use jumphistory::nexus::{self, Burnin, TreeFileFormat, TreeFileReaderBuilder};
use jumphistory::stream::TreeStream;
use std::io::Write;
use tempfile::NamedTempFile;

const H7N9: &str = "#NEXUS

[ sampled by BEAST, location history logged with Markov jumps ]

Begin taxa;
    Dimensions ntax=4;
    Taxlabels
        'A/Shanghai/1/2013'
        'A/Hubei/1/2013'
        B_Fujian
        C_Zhejiang
        ;
End;

Begin assumptions;
    charset all = 1-4;
End;

Begin trees;
    Translate
        1 'A/Shanghai/1/2013',
        2 'A/Hubei/1/2013',
        3 B_Fujian,
        4 C_Zhejiang
        ;
tree STATE_0 [&lnP=-21.3] = [&R] (((1[&location=\"Shanghai\"]:1.0,2[&location=\"Hubei\"]:1.0)[&location=\"Shanghai\"]:1.0,3[&location=\"Fujian\"]:2.0)[&location=\"Shanghai\"]:1.0,4[&location=\"Zhejiang\"]:3.0)[&location=\"Shanghai\"];
tree STATE_10000 [&lnP=-15.0] = [&R] (((1[&location=\"Shanghai\"]:1.0,2[&location=\"Hubei\",history={{0.5,\"Shanghai\",\"Hubei\"}}]:1.0)[&location=\"Shanghai\"]:1.0,3[&location=\"Fujian\"]:2.0)[&location=\"Shanghai\"]:1.0,4[&location=\"Zhejiang\"]:3.0)[&location=\"Shanghai\"];
tree STATE_20000 [&lnP=-14.2] = [&R] ((1[&location=\"Shanghai\"]:2.0,(2[&location=\"Hubei\"]:1.0,3[&location=\"Fujian\"]:1.0)[&location=\"Hubei\"]:1.0)[&location=\"Shanghai\"]:2.0,4[&location=\"Zhejiang\"]:4.0)[&location=\"Shanghai\"];
tree STATE_30000 [&lnP=-14.9] = [&R] ((1[&location=\"Shanghai\"]:2.0,(2[&location=\"Hubei\"]:1.0,3[&location=\"Fujian\"]:1.0)[&location=\"Hubei\"]:1.0)[&location=\"Shanghai\"]:2.0,4[&location=\"Zhejiang\"]:4.0)[&location=\"Shanghai\"];
tree STATE_40000 [&lnP=-13.7] = [&R] ((1[&location=\"Shanghai\"]:2.0,(2[&location=\"Hubei\"]:1.0,3[&location=\"Fujian\"]:1.0)[&location=\"Hubei\"]:1.0)[&location=\"Shanghai\"]:3.0,4[&location=\"Zhejiang\"]:5.0)[&location=\"Shanghai\"];
End;
";

fn write_fixture(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_multiple_trees_with_translate() {
    let file = write_fixture(H7N9);
    let trees = nexus::parse_file(file.path(), Burnin::Count(0)).unwrap();
    assert_eq!(trees.len(), 5);

    for tree in &trees {
        assert_eq!(tree.num_leaves(), 4);
        assert!(tree.is_valid());
        assert!(tree.leaf_by_label("A/Hubei/1/2013").is_some());
        assert!(tree.leaf_by_label("C_Zhejiang").is_some());
    }
    assert_eq!(trees[1].id(), "10000");
    assert_eq!(trees[4].root_height(), 5.0);

    let hubei = trees[1].leaf_by_label("A/Hubei/1/2013").unwrap();
    assert!(trees[1].annotation("history", hubei).is_some());
}

#[test]
fn test_buffered_and_in_memory_agree() {
    let file = write_fixture(H7N9);
    let mut buffered = TreeFileReaderBuilder::for_file(file.path())
        .with_buffered_source()
        .with_tree_count()
        .build()
        .unwrap();
    let mut in_memory = TreeFileReaderBuilder::for_file(file.path())
        .with_in_memory_source()
        .build()
        .unwrap();

    assert_eq!(buffered.format(), TreeFileFormat::Nexus);
    assert_eq!(buffered.taxa().len(), 4);
    assert_eq!(buffered.num_trees(), Some(5));
    assert_eq!(in_memory.num_trees(), None);

    while let Some(tree) = buffered.next_tree().unwrap() {
        let other = in_memory.next_tree().unwrap().unwrap();
        assert_eq!(tree.name(), other.name());
        assert_eq!(tree.root_height(), other.root_height());
    }
    assert!(in_memory.next_tree().unwrap().is_none());
}

#[test]
fn test_burnin_variants() {
    let file = write_fixture(H7N9);

    let mut reader = TreeFileReaderBuilder::for_file(file.path())
        .with_burnin(Burnin::Percentage(0.4))
        .build()
        .unwrap();
    assert_eq!(reader.num_total_trees(), Some(5));
    assert_eq!(reader.num_trees(), Some(3));
    assert_eq!(reader.next_tree().unwrap().unwrap().id(), "20000");

    let mut reader = TreeFileReaderBuilder::for_file(file.path())
        .with_skip_first()
        .with_burnin(Burnin::Count(1))
        .build()
        .unwrap();
    assert_eq!(reader.next_index(), 2);
    assert!(reader.skip_tree().unwrap());
    assert_eq!(reader.next_tree().unwrap().unwrap().id(), "30000");
}

#[test]
fn test_stream_over_file() {
    let file = write_fixture(H7N9);
    let mut stream = TreeStream::open(file.path(), Burnin::Count(2)).unwrap();

    // Positions count the burn-in
    assert!(stream.get(1).unwrap().is_none());
    assert_eq!(stream.get(3).unwrap().unwrap().id(), "30000");
    assert_eq!(stream.next_tree().unwrap().unwrap().id(), "40000");
    assert!(stream.next_tree().unwrap().is_none());

    let remaining = TreeStream::open(file.path(), Burnin::Count(3))
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(remaining.len(), 2);
}

#[test]
fn test_stream_errors() {
    let file = write_fixture(H7N9);
    assert!(matches!(
        TreeStream::open(file.path(), Burnin::Count(5)),
        Err(AnalysisError::EmptySample { .. })
    ));

    let broken = write_fixture("#NEXUS\nBegin trees;\ntree STATE_0 = (1:1,2:1;\nEnd;\n");
    assert!(matches!(
        TreeStream::open(broken.path(), Burnin::Count(0)),
        Err(AnalysisError::Import(_))
    ));

    assert!(TreeStream::open("does/not/exist.trees", Burnin::Count(0)).is_err());
}

#[test]
fn test_bad_taxa_block() {
    let content = "#NEXUS\nBegin taxa;\nDimensions ntax=3;\nTaxlabels A B;\nEnd;\nBegin trees;\ntree t = (A:1,B:1);\nEnd;\n";
    let file = write_fixture(content);
    assert!(
        TreeFileReaderBuilder::for_file(file.path())
            .build()
            .is_err()
    );
}
