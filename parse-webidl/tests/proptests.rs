use parse_webidl::ast::Definition;
use parse_webidl::ast::Program;
use parse_webidl::types::Type;
use parse_webidl::WebIdlParser;
use proptest::prelude::*;
use similar::TextDiff;

const PRELUDE: &str = "
  interface A {};
  interface B : A {};
  interface C {};
  dictionary D { required long r; };
  enum E { \"e\" };
  callback F = undefined ();
";

fn arb_type() -> impl Strategy<Value = &'static str> {
  prop::sample::select(vec![
    "long",
    "double",
    "DOMString",
    "boolean",
    "object",
    "any",
    "long?",
    "A",
    "B",
    "C",
    "C?",
    "D",
    "E",
    "F",
    "sequence<long>",
    "record<DOMString, long>",
    "Promise<any>",
    "(C or long)",
    "ArrayBuffer",
    "Uint8Array",
  ])
}

fn completed_typedef<'a>(program: &'a Program, name: &str) -> &'a Type {
  match program.def(program.find(name).unwrap()) {
    Definition::Typedef(t) => t.ty.completed().unwrap(),
    other => panic!("expected typedef, got {}", other.kind_name()),
  }
}

fn typedefs(x: &str, y: &str) -> WebIdlParser {
  let mut parser = WebIdlParser::default();
  parser.parse(PRELUDE, "prelude.webidl").unwrap();
  parser
    .parse(&format!("typedef {} X; typedef {} Y;", x, y), "typedefs.webidl")
    .unwrap();
  parser.finish().unwrap();
  parser
}

const MEMBERS: &[&str] = &[
  "attribute long a;",
  "readonly attribute DOMString b;",
  "undefined f(long x);",
  "undefined f(DOMString x);",
  "const short K = 1;",
  "static undefined s();",
  "iterable<DOMString, long>;",
  "[Cached, Pure] readonly attribute long c;",
];

const DICTIONARY_MEMBERS: &[&str] = &["long z;", "DOMString y;", "required boolean x;", "any w = null;"];

fn source(members: &[&str], dictionary: &[&str]) -> String {
  format!(
    "interface I {{ {} }}; dictionary G {{ {} }}; partial interface I {{ undefined g(); }};",
    members.join(" "),
    dictionary.join(" ")
  )
}

fn finish_to_json(source: &str) -> String {
  let mut parser = WebIdlParser::default();
  parser.parse(source, "determinism.webidl").unwrap();
  parser.finish().unwrap();
  serde_json::to_string_pretty(parser.program()).unwrap()
}

proptest! {
  #[test]
  fn distinguishability_is_symmetric(x in arb_type(), y in arb_type()) {
    let parser = typedefs(x, y);
    let program = parser.program();
    let (tx, ty) = (completed_typedef(program, "X"), completed_typedef(program, "Y"));
    prop_assert_eq!(
      tx.is_distinguishable_from(ty, program),
      ty.is_distinguishable_from(tx, program)
    );
  }

  #[test]
  fn accepted_overloads_are_distinguishable(x in arb_type(), y in arb_type()) {
    let expected = {
      let parser = typedefs(x, y);
      let program = parser.program();
      completed_typedef(program, "X").is_distinguishable_from(completed_typedef(program, "Y"), program)
    };
    let mut parser = WebIdlParser::default();
    parser.parse(PRELUDE, "prelude.webidl").unwrap();
    parser
      .parse(
        &format!("interface I {{ undefined f({} a); undefined f({} b); }};", x, y),
        "overloads.webidl",
      )
      .unwrap();
    prop_assert_eq!(parser.finish().is_ok(), expected);
  }

  #[test]
  fn finishing_is_deterministic(
    members in prop::sample::subsequence(MEMBERS.to_vec(), 0..=MEMBERS.len()),
    dictionary in prop::sample::subsequence(DICTIONARY_MEMBERS.to_vec(), 0..=DICTIONARY_MEMBERS.len()),
  ) {
    let source = source(&members, &dictionary);
    let first = finish_to_json(&source);
    let second = finish_to_json(&source);
    if first != second {
      let diff = TextDiff::from_lines(&first, &second);
      panic!("{}", diff.unified_diff().header("first", "second"));
    };
  }
}
