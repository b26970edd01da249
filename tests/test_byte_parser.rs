use jumphistory::parser::ConsumeMode::{Exclusive, Inclusive};
use jumphistory::parser::{ByteParser, ParsingErrorType};

#[test]
fn test_skip_whitespace() {
    let mut parser = ByteParser::for_str(" \r  \t\n \t x y");
    parser.skip_whitespace();
    assert_eq!(parser.peek(), Some(b'x'));

    parser.next_byte(); // skip x
    parser.skip_whitespace();
    assert_eq!(parser.peek(), Some(b'y'));
}

#[test]
fn test_skip_comment_and_whitespace() {
    let mut parser =
        ByteParser::for_str("[Go] \n[&R]   \t ['...']\n[One more to go]  END!");
    parser
        .skip_comment_and_whitespace()
        .expect("Failed to skip comments.");
    assert_eq!(parser.next_byte(), Some(b'E'));
}

#[test]
fn test_plain_comments_stop_at_annotation() {
    let mut parser = ByteParser::for_str("[posterior sample] [&location=\"Hubei\"]:1.0");
    parser.skip_plain_comments_and_whitespace().unwrap();
    assert!(parser.peek_is_sequence(b"[&"));
    assert_eq!(parser.context_string(10), "[&location");
}

#[test]
fn test_comment_with_quoted_bracket() {
    let mut parser = ByteParser::for_str("[note=\"a ] inside\"] X");
    parser.skip_comment_and_whitespace().unwrap();
    assert_eq!(parser.peek(), Some(b'X'));
}

#[test]
fn test_unclosed_comment_is_error() {
    let mut parser = ByteParser::for_str("  [never closed");
    let err = parser.skip_comment_and_whitespace().unwrap_err();
    assert!(matches!(err.kind(), ParsingErrorType::UnclosedComment));
}

#[test]
fn test_consume_until_inclusive() {
    let mut parser = ByteParser::for_str("consume a CAN of beans");
    assert!(parser.consume_until(b'C', Inclusive));
    assert_eq!(parser.peek(), Some(b'A'));
    assert_eq!(parser.position(), 11);
}

#[test]
fn test_consume_until_exclusive() {
    let mut parser = ByteParser::for_str("consume a CAN of beans");
    assert!(parser.consume_until(b'C', Exclusive));
    assert_eq!(parser.peek(), Some(b'C'));
    assert_eq!(parser.position(), 10);

    assert!(!parser.consume_until(b'#', Exclusive));
    assert!(parser.is_eof());
}

#[test]
fn test_consume_until_sequence_ignores_case() {
    let mut parser = ByteParser::for_str("#NEXUS\nbegin TREES;\n");
    assert!(parser.consume_until_sequence(b"Begin Trees", Inclusive));
    assert_eq!(parser.next_byte(), Some(b';'));
}

#[test]
fn test_consume_if_word() {
    let mut parser = ByteParser::for_str("TrEe STATE_0 = (A:1,B:1);");
    assert!(!parser.consume_if_word("translate"));
    assert!(parser.consume_if_word("tree"));
    parser.skip_whitespace();
    assert!(parser.consume_if_word("state_0"));
    assert_eq!(parser.position(), 12);
}

#[test]
fn test_consume_statement_respects_brackets_and_quotes() {
    let mut parser =
        ByteParser::for_str("(A[&note=\";\"]:1,'B;C':1)[&location=X]; tree STATE_1");
    assert!(parser.consume_statement());
    parser.skip_whitespace();
    assert!(parser.consume_if_word("tree"));

    let mut unterminated = ByteParser::for_str("(A:1,B:1)");
    assert!(!unterminated.consume_statement());
}

#[test]
fn test_parse_labels() {
    let mut parser = ByteParser::for_str("'Wilson''s storm-petrel' A/Hubei/1/2013:0.5");
    assert_eq!(parser.parse_label(b" :").unwrap(), "Wilson's storm-petrel");
    assert_eq!(parser.parse_label(b" :").unwrap(), "A/Hubei/1/2013");
    assert_eq!(parser.next_byte(), Some(b':'));

    let mut unclosed = ByteParser::for_str("'never closed");
    assert!(unclosed.parse_label(b",").is_err());
}

#[test]
fn test_set_position_rewinds() {
    let mut parser = ByteParser::for_str("abc");
    parser.next_byte();
    parser.next_byte();
    parser.set_position(0);
    assert_eq!(parser.peek(), Some(b'a'));
}
