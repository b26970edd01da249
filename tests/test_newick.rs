use jumphistory::model::{AnnotationValue, LabelResolver};
use jumphistory::newick::{self, NewickParser};
use jumphistory::parser::{ByteParser, ParsingErrorType};
use std::collections::HashMap;
use std::io::Write;

#[test]
fn test_newick_parsing() {
    let mut byte_parser = ByteParser::for_str("((A:1.0,B:2.0):1.0,C:4.0);");
    let tree = NewickParser::new()
        .with_num_leaves(3)
        .parse_str(&mut byte_parser)
        .unwrap();

    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_vertices(), 5);
    assert!(tree.is_valid());

    let a = tree.leaf_by_label("A").unwrap();
    let c = tree.leaf_by_label("C").unwrap();
    assert_eq!(tree.height(c), 0.0);
    assert_eq!(tree.height(a), 2.0);
    assert_eq!(tree.root_height(), 4.0);
}

#[test]
fn test_newick_quoted_labels_and_whitespace() {
    let tree = newick::parse_str("( 'A/Hubei/1/2013' : 1.0 ,\n\t\"B Fujian\":1.0 ) ;").unwrap();
    assert!(tree.leaf_by_label("A/Hubei/1/2013").is_some());
    assert!(tree.leaf_by_label("B Fujian").is_some());
}

#[test]
fn test_jump_history_annotations() {
    let tree = newick::parse_str(
        "((A[&location=\"Hubei\",history={{2.5,\"Fujian\",\"Hubei\"},{0.5,Hubei,Hubei}}]:3.0,\
         B[&location=\"Fujian\"]:3.0)[&location=\"Fujian\"]:2.0,\
         C[&location=\"Fujian\",history={}]:5.0)[&location=\"Fujian\"];",
    )
    .unwrap();

    let a = tree.leaf_by_label("A").unwrap();
    let history = tree.annotation("history", a).unwrap().as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0],
        AnnotationValue::Array(vec![
            2.5.into(),
            "Fujian".into(),
            "Hubei".into()
        ])
    );

    let c = tree.leaf_by_label("C").unwrap();
    assert_eq!(
        tree.annotation("history", c)
            .and_then(AnnotationValue::as_array)
            .map(|jumps| jumps.len()),
        Some(0)
    );
    let b = tree.leaf_by_label("B").unwrap();
    assert!(tree.annotation("history", b).is_none());
}

#[test]
fn test_site_histories_and_numeric_states() {
    let tree = newick::parse_str(
        "(A[&all_N={{12,1.5,AAA,AAG}},state=3]:2.0,B[&state=1]:2.0)[&state=1];",
    )
    .unwrap();
    let a = tree.leaf_by_label("A").unwrap();
    let jump = tree.annotation("all_N", a).unwrap().as_array().unwrap()[0]
        .as_array()
        .unwrap();
    assert_eq!(jump[0].as_i64(), Some(12));
    assert_eq!(jump[1].as_f64(), Some(1.5));
    assert_eq!(jump[3].as_label().as_deref(), Some("AAG"));
    assert_eq!(
        tree.annotation("state", a).and_then(AnnotationValue::as_label).as_deref(),
        Some("3")
    );
}

#[test]
fn test_numeric_values_keep_their_text() {
    let tree = newick::parse_str("(A[&state=01,rate=1.0]:2.0,B[&state=\"01\"]:2.0)[&state=1];").unwrap();
    let a = tree.leaf_by_label("A").unwrap();
    let b = tree.leaf_by_label("B").unwrap();

    let state = tree.annotation("state", a).unwrap();
    assert_eq!(state.as_label().as_deref(), Some("01"));
    assert_eq!(state.as_i64(), Some(1));
    assert_eq!(
        tree.annotation("state", b).and_then(AnnotationValue::as_label),
        state.as_label()
    );

    let rate = tree.annotation("rate", a).unwrap();
    assert_eq!(rate.to_string(), "1.0");
    assert_eq!(rate.as_f64(), Some(1.0));
}

#[test]
fn test_translated_labels() {
    let translation = HashMap::from([
        ("1".to_string(), "A/Hubei/1/2013".to_string()),
        ("2".to_string(), "B/Fujian/2/2014".to_string()),
    ]);
    let mut parser = NewickParser::new().with_resolver(LabelResolver::with_translation(translation, vec![]));
    let tree = parser
        .parse_str(&mut ByteParser::for_str("(1:1,2:1);"))
        .unwrap();
    assert!(tree.leaf_by_label("B/Fujian/2/2014").is_some());

    let err = parser
        .parse_str(&mut ByteParser::for_str("(1:1,3:1);"))
        .unwrap_err();
    assert!(matches!(err.kind(), ParsingErrorType::UnresolvedLabel(_)));
}

#[test]
fn test_invalid_newick() {
    let cases = [
        "(A:1,B:1,C:1);",  // not binary
        "(A:1,B:1)",       // no semicolon
        "(A:1,:1);",       // empty label
        "(A:x,B:1);",      // bad branch length
        "(A[&k=1:1,B:1);", // unterminated annotation
    ];
    for case in cases {
        assert!(newick::parse_str(case).is_err(), "accepted {case}");
    }
}

#[test]
fn test_parse_all_and_file() {
    let trees = NewickParser::new()
        .parse_all(ByteParser::for_str("(A:1,B:1);\n[sample 2]\n(A:2,B:2);\n\n"))
        .unwrap();
    assert_eq!(trees.len(), 2);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "(A[&location=X]:1,B[&location=Y]:1)[&location=X];").unwrap();
    writeln!(file, "(A[&location=X]:3,B[&location=X]:3)[&location=X];").unwrap();
    file.flush().unwrap();

    let trees = newick::parse_file(file.path()).unwrap();
    assert_eq!(trees.len(), 2);
    assert_eq!(trees[1].root_height(), 3.0);
}
