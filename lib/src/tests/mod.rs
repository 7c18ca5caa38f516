/*! End-to-end tests. */
use std::io::Cursor;

use figment::providers::Format;
use pretty_assertions::assert_eq;
use quickcheck::quickcheck;

use crate::re::thompson::instr::Instr;
use crate::{
    compile, CompileError, CompiledRegex, Compiler, Flag, Flags, Matcher,
    SerializationError, WordLists, MAX_PROGRAM_LEN,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

macro_rules! assert_matches {
    ($re:expr, $input:expr, $expected:expr) => {{
        let regex = compile($re, Flags::none(), None).unwrap();
        let matches: Vec<(usize, &str)> = Matcher::new(&regex, $input)
            .map(|m| (m.start(), m.as_str()))
            .collect();
        let expected: &[(usize, &str)] = $expected;
        assert_eq!(matches, expected, "matching {:?} against {:?}", $re, $input);
    }};
}

#[test]
fn matcher() {
    assert_matches!("a", "aaa", &[(0, "a"), (1, "a"), (2, "a")]);
    assert_matches!("a", "", &[]);
    assert_matches!("", "ab", &[(0, ""), (1, ""), (2, "")]);
    assert_matches!("b+", "abbcb", &[(1, "bb"), (2, "b"), (4, "b")]);
    assert_matches!(".", "éa", &[(0, "é"), (2, "a")]);
    assert_matches!("x?", "é", &[(0, ""), (2, "")]);
    assert_matches!(
        r"\w+",
        "ab, c",
        &[(0, "ab"), (1, "b"), (4, "c")]
    );
}

#[test]
fn matcher_is_fused() {
    let regex = compile("a", Flags::none(), None).unwrap();
    let mut matcher = regex.matcher("a");

    assert!(matcher.next().is_some());
    assert!(matcher.next().is_none());
    assert!(matcher.next().is_none());
}

#[test]
fn matcher_from_pattern() {
    let matches: Vec<_> =
        Matcher::from_pattern("é", Flag::DiacriticsInsensitive.into(), None, "café, cafe")
            .unwrap()
            .map(|m| m.range())
            .collect();

    assert_eq!(matches, vec![3..5, 10..11]);

    let err = Matcher::from_pattern("[a", Flags::none(), None, "a").err();
    assert_eq!(err, Some(CompileError::UnclosedCharSet { offset: 0 }));
}

#[test]
fn find_first_in() {
    let regex = compile(r"(\d+)[.,](\d{2})?", Flags::none(), None).unwrap();

    let m = regex.find_first_in("total: 12,50 €").unwrap();
    assert_eq!(m.range(), 7..12);
    assert_eq!(m.group(1), Some("12"));
    assert_eq!(m.group(2), Some("50"));
    assert_eq!(m.input(), "total: 12,50 €");
    assert_eq!(m.id(), None);

    let m = regex.find_first_in("3.x").unwrap();
    assert_eq!(m.as_str(), "3.");
    assert_eq!(m.group(2), None);

    assert!(regex.find_first_in("no numbers").is_none());
}

#[test]
fn word_lists() {
    let mut lists = WordLists::new();
    lists.add_list("Months", ["janvier", "février", "mars"]);

    let regex = Compiler::new()
        .flags(
            Flag::CaseInsensitive
                | Flag::DiacriticsInsensitive
                | Flag::AutoWordBoundaries,
        )
        .class_provider(&lists)
        .compile(r"(\d{1,2}) (\p{WordList(Months)})")
        .unwrap();

    let m = regex.find_first_in("le 12 FEVRIER 2024").unwrap();
    assert_eq!(m.group(1), Some("12"));
    assert_eq!(m.group(2), Some("FEVRIER"));

    assert!(regex.find_first_in("le 12 marsupial").is_none());
    assert!(regex.find_first_in("le 123 mars").is_none());

    let err = compile(r"\p{WordList(Months)}", Flags::none(), None).err();
    assert_eq!(
        err,
        Some(CompileError::UnknownWordList {
            name: "Months".to_string(),
            offset: 12
        })
    );
}

#[test]
fn or() {
    let a = Compiler::new().compile_with_id(r"(\d+)", 1).unwrap();
    let b = Compiler::new().compile_with_id("([a-z]+)(!)", 2).unwrap();
    let combined = a.or(b).unwrap();

    assert_eq!(combined.group_count(), 3);

    let m = combined.find_first_in("abc!").unwrap();
    assert_eq!(m.id(), Some(2));
    assert_eq!(m.group(1), None);
    assert_eq!(m.group(2), Some("abc"));
    assert_eq!(m.group(3), Some("!"));

    let m = combined.find_first_in("-42").unwrap();
    assert_eq!(m.id(), Some(1));
    assert_eq!(m.group(1), Some("42"));
    assert_eq!(m.group(2), None);

    // When both programs match at the same offset, the first one wins.
    let ab = Compiler::new().compile_with_id("ab", 1).unwrap();
    let abc = Compiler::new().compile_with_id("abc", 2).unwrap();

    let m = ab.clone().or(abc.clone()).unwrap().find_first_in("abc").unwrap();
    assert_eq!((m.id(), m.as_str()), (Some(1), "ab"));

    let m = abc.or(ab).unwrap().find_first_in("abc").unwrap();
    assert_eq!((m.id(), m.as_str()), (Some(2), "abc"));
}

#[test]
fn or_code() {
    let a = compile("a", Flags::none(), None).unwrap();
    let b = compile("(b)", Flags::none(), None).unwrap();

    assert_eq!(
        a.or(b).unwrap().to_string(),
        r#"
00000: SPLIT 00001 00003
00001: CHAR 'a'
00002: MATCH
00003: SAVE 2
00004: CHAR 'b'
00005: SAVE 3
00006: MATCH
"#
    );
}

#[test]
fn or_too_large() {
    let half = CompiledRegex::new(
        vec![Instr::Match(None); MAX_PROGRAM_LEN / 2 + 1],
        1,
    );

    assert_eq!(half.clone().or(half).err(), Some(CompileError::TooLarge));

    let many_groups = CompiledRegex::new(vec![Instr::Match(None)], MAX_PROGRAM_LEN);
    let one_group = compile("(a)", Flags::none(), None).unwrap();

    assert_eq!(
        many_groups.clone().or(one_group).err(),
        Some(CompileError::TooLarge)
    );

    let no_groups = compile("a", Flags::none(), None).unwrap();
    let combined = many_groups.or(no_groups).unwrap();

    assert_eq!(combined.nb_saved(), MAX_PROGRAM_LEN);
}

#[test]
fn serialization() {
    init_logging();

    let regex = Compiler::new()
        .flags(Flag::CaseInsensitive | Flag::AutoWordBoundaries)
        .compile_with_id(r"(\p{Upper}\w*)\s+\w+", 5)
        .unwrap();

    let bytes = regex.serialize().unwrap();
    assert!(bytes.starts_with(b"LING-RE"));

    let deserialized = CompiledRegex::deserialize(&bytes).unwrap();
    assert_eq!(deserialized, regex);

    let m = deserialized.find_first_in("le Chat noir").unwrap();
    assert_eq!(m.id(), Some(5));
    assert_eq!(m.group(1), Some("Chat"));

    let mut buffer = Vec::new();
    regex.serialize_into(&mut buffer).unwrap();
    assert_eq!(buffer, bytes);

    let deserialized =
        CompiledRegex::deserialize_from(Cursor::new(buffer)).unwrap();
    assert_eq!(deserialized, regex);
}

#[test]
fn serialization_errors() {
    init_logging();

    assert!(matches!(
        CompiledRegex::deserialize(b"LING"),
        Err(SerializationError::InvalidFormat)
    ));

    assert!(matches!(
        CompiledRegex::deserialize(b"NOT-A-REGEX"),
        Err(SerializationError::InvalidFormat)
    ));

    let bytes = compile("abc", Flags::none(), None).unwrap().serialize().unwrap();

    assert!(matches!(
        CompiledRegex::deserialize(&bytes[..bytes.len() - 2]),
        Err(SerializationError::InvalidEncoding(_))
    ));

    // Programs that decode correctly but can't be executed safely.
    let invalid = [
        CompiledRegex::new(vec![Instr::Jump(5), Instr::Match(None)], 1),
        CompiledRegex::new(vec![Instr::Split(1, -1), Instr::Match(None)], 1),
        CompiledRegex::new(vec![Instr::Save(4), Instr::Match(None)], 1),
        CompiledRegex::new(vec![Instr::Char('a')], 1),
        CompiledRegex::new(vec![Instr::Match(None)], 0),
        CompiledRegex::new(vec![], 1),
        CompiledRegex::new(vec![Instr::Match(None)], usize::MAX / 2 + 1),
        CompiledRegex::new(vec![Instr::Match(None)], MAX_PROGRAM_LEN + 1),
        CompiledRegex::new(
            vec![Instr::Match(None); MAX_PROGRAM_LEN + 1],
            1,
        ),
    ];

    for regex in invalid {
        let bytes = regex.serialize().unwrap();
        assert!(
            matches!(
                CompiledRegex::deserialize(bytes),
                Err(SerializationError::InvalidFormat)
            ),
            "program with {} instructions and {} slots should be rejected",
            regex.code().len(),
            regex.nb_saved()
        );
    }

    // A program with the maximum number of groups is still accepted.
    let regex = CompiledRegex::new(vec![Instr::Match(None)], MAX_PROGRAM_LEN);
    let bytes = regex.serialize().unwrap();
    let deserialized = CompiledRegex::deserialize(bytes).unwrap();

    assert_eq!(deserialized.match_at("a", 0).map(|m| m.range()), Some(0..0));
}

#[test]
fn errors() {
    let cases: &[(&str, CompileError)] = &[
        ("(a", CompileError::UnbalancedParenthesis { offset: 0 }),
        ("ab)c", CompileError::UnbalancedParenthesis { offset: 2 }),
        (
            r"\p{Bogus}",
            CompileError::UnknownClass { name: "Bogus".to_string(), offset: 3 },
        ),
        ("[^", CompileError::UnclosedCharSet { offset: 0 }),
        ("a{5,2}", CompileError::MalformedRepetition { offset: 1 }),
        ("?", CompileError::NothingToRepeat { offset: 0 }),
    ];

    for (pattern, expected) in cases {
        let err = compile(pattern, Flags::none(), None).unwrap_err();
        assert_eq!(&err, expected, "compiling {:?}", pattern);
    }

    let err = compile(r"ab\", Flags::none(), None).unwrap_err();
    assert_eq!(err.offset(), Some(2));
    assert_eq!(
        err.to_string(),
        "pattern ends with an incomplete escape sequence at offset 2"
    );

    let err = compile("a{1,x}", Flags::none(), None).unwrap_err();
    assert_eq!(err.offset(), Some(4));
    assert_eq!(err.to_string(), "unexpected character `x` at offset 4");
}

#[test]
fn config() {
    let config: crate::Config = figment::Figment::new()
        .merge(figment::providers::Toml::string(
            r#"
            [regex]
            case_insensitive = true
            auto_word_boundaries = true
            "#,
        ))
        .extract()
        .unwrap();

    let regex = Compiler::new().flags(config.flags()).compile("rue").unwrap();

    assert!(regex.find_first_in("12 RUE de Paris").is_some());
    assert!(regex.find_first_in("12 ruelle").is_none());
    assert!(regex.find_first_in("12 rué").is_none());
}

/// Maps arbitrary bytes into a small alphabet, so that the patterns used
/// in properties have a chance of matching.
fn make_input(bytes: &[u8]) -> String {
    const ALPHABET: [char; 7] = ['a', 'b', 'A', '1', ' ', ',', 'é'];
    bytes.iter().map(|b| ALPHABET[*b as usize % ALPHABET.len()]).collect()
}

#[test]
fn matches_are_consistent() {
    const PATTERNS: &[&str] =
        &[r"(a|b)+", r"\b\w+\b", r"(\d?)(a*)", r"[^ ,]{2,3}", r"\p{Punct}|é"];

    fn prop(pattern: u8, case_insensitive: bool, bytes: Vec<u8>) -> bool {
        let pattern = PATTERNS[pattern as usize % PATTERNS.len()];
        let flags = if case_insensitive {
            Flag::CaseInsensitive.into()
        } else {
            Flags::none()
        };

        let regex = compile(pattern, flags, None).unwrap();
        let input = make_input(&bytes);

        regex.matcher(&input).all(|m| {
            m.start() <= m.end()
                && input.is_char_boundary(m.start())
                && input.is_char_boundary(m.end())
                && regex.match_at(&input, m.start()).as_ref() == Some(&m)
                && (1..m.group_len()).all(|n| match m.group_range(n) {
                    Some(range) => {
                        range.start >= m.start() && range.end <= m.end()
                    }
                    None => true,
                })
        })
    }

    quickcheck(prop as fn(u8, bool, Vec<u8>) -> bool);
}
