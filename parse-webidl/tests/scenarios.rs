use parse_webidl::ast::member::MemberKind;
use parse_webidl::ast::Definition;
use parse_webidl::builtins::BuiltinType;
use parse_webidl::error::ErrorKind;
use parse_webidl::error::IdlResult;
use parse_webidl::options::ParserOptions;
use parse_webidl::types::Type;
use parse_webidl::WebIdlParser;

fn finish(sources: &[&str]) -> IdlResult<WebIdlParser> {
  let mut parser = WebIdlParser::default();
  for (i, source) in sources.iter().enumerate() {
    parser.parse(source, &format!("file{}.webidl", i))?;
  }
  parser.finish()?;
  Ok(parser)
}

#[test]
fn single_operation_interface() {
  let parser = finish(&["interface A { undefined f(); };"]).unwrap();
  let program = parser.program();
  let defs: Vec<_> = program.definitions().collect();
  assert_eq!(defs.len(), 1);
  let Definition::Interface(a) = defs[0].1 else {
    panic!("expected interface");
  };
  assert_eq!(a.ident.name, "A");
  assert!(a.parent.is_none());
  assert_eq!(a.members.len(), 1);
  let f = program.member(a.members[0]);
  assert_eq!(f.ident.name, "f");
  let MemberKind::Method(method) = &f.kind else {
    panic!("expected method, got {:?}", f.kind);
  };
  assert_eq!(method.overloads.len(), 1);
  let overload = &method.overloads[0];
  assert_eq!(
    overload.return_type.completed(),
    Some(&Type::Builtin(BuiltinType::Undefined))
  );
  assert!(overload.args.is_empty());
}

#[test]
fn self_containing_dictionary() {
  let err = finish(&["dictionary D { long x; D y; };"]).err().unwrap();
  assert_eq!(err.kind, ErrorKind::SelfContainingDictionary);
  assert!(err.message.contains("'D'"));
  assert!(err.message.contains("'y'"));
  assert_eq!(err.locations.len(), 2);
  assert_eq!(err.locations[0].source_text(), "y");
  assert_eq!(err.locations[1].source_text(), "D");
}

#[test]
fn unions_of_unrelated_interfaces() {
  let parser = finish(&[
    "interface A {}; interface B {}; typedef (A or B) U;",
    "interface C { attribute (A or B) both; undefined take(U u); };",
  ])
  .unwrap();
  let program = parser.program();
  let c = program.find("C").unwrap();
  let both = program.member(program.find_member(c, "both").unwrap());
  let ty = both.as_attribute().unwrap().ty.completed().unwrap();
  assert!(ty.is_union());
  assert_eq!(ty.name(program), "(A or B)");
}

#[test]
fn overloads_distinguished_at_first_argument() {
  let parser = finish(&["interface I { void f(long a); void f(DOMString a); };"]).unwrap();
  let program = parser.program();
  let i = program.find("I").unwrap();
  let f = program.member(program.find_member(i, "f").unwrap());
  assert_eq!(f.as_method().unwrap().overloads.len(), 2);
}

#[test]
fn overloads_disagreeing_before_distinguishing_index() {
  let err = finish(&["interface I {
    void f(long a, long b);
    void f(long a, DOMString b);
    void f(DOMString a, long b);
  };"])
  .err()
  .unwrap();
  assert_eq!(err.kind, ErrorKind::IndistinguishableOverloads);
  assert!(err.message.contains("2 arguments"));
  assert!(err.message.contains("'f'"));
  assert_eq!(err.locations.len(), 3);
  let lines: Vec<usize> = err.locations.iter().map(|l| l.line_col().0).collect();
  assert_eq!(lines, vec![2, 3, 4]);
}

#[test]
fn partial_before_declaration_across_files() {
  let parser = finish(&[
    "partial interface A { attribute long fromPartial; };",
    "interface A { attribute long fromDeclaration; };",
  ])
  .unwrap();
  let program = parser.program();
  let a = program.find("A").unwrap();
  let names: Vec<&str> = program
    .interface(a)
    .unwrap()
    .members
    .iter()
    .map(|m| program.member(*m).ident.name.as_str())
    .collect();
  assert_eq!(names, vec!["fromDeclaration", "fromPartial"]);
  assert!(program.interface(a).unwrap().partials.is_empty());
}

#[test]
fn partial_without_declaration() {
  let err = finish(&["partial interface A { attribute long x; };"]).err().unwrap();
  assert_eq!(err.kind, ErrorKind::MissingNonPartial);
  assert!(err
    .to_string()
    .starts_with("error: Partial interface 'A' does not have a non-partial declaration, "));
}

#[test]
fn finish_is_idempotent() {
  let mut parser = WebIdlParser::default();
  parser
    .parse(
      "interface A { iterable<DOMString, long>; }; dictionary D { long b; long a; };",
      "a.webidl",
    )
    .unwrap();
  let first = parser.finish().unwrap();
  let members = parser.program().definitions().count();
  let second = parser.finish().unwrap();
  assert_eq!(first, second);
  assert_eq!(parser.program().definitions().count(), members);
  let err = parser.parse("interface B {};", "b.webidl").unwrap_err();
  assert_eq!(err.kind, ErrorKind::AlreadyFinished);
}

#[test]
fn dictionary_members_sorted_unless_disabled() {
  let source = "dictionary D { long b; long a; }; partial dictionary D { long c; };";
  let names = |parser: &WebIdlParser| -> Vec<String> {
    let program = parser.program();
    let d = program.dictionary(program.find("D").unwrap()).unwrap();
    d.members.iter().map(|m| m.ident.name.clone()).collect()
  };

  let parser = finish(&[source]).unwrap();
  assert_eq!(names(&parser), vec!["a", "b", "c"]);

  let mut parser = WebIdlParser::new(ParserOptions::default().with_sorted_dictionary_members(false));
  parser.parse(source, "d.webidl").unwrap();
  parser.finish().unwrap();
  assert_eq!(names(&parser), vec!["b", "a", "c"]);
}

#[test]
fn reset_keeps_options() {
  let mut parser = WebIdlParser::new(ParserOptions::default().with_primary_global("Worker"));
  parser.parse("interface A {};", "a.webidl").unwrap();
  parser.finish().unwrap();
  parser.reset();
  assert_eq!(parser.program().definitions().count(), 0);
  assert_eq!(parser.program().options().primary_global, "Worker");
  parser.parse("interface A {};", "a.webidl").unwrap();
  parser.finish().unwrap();
  let a = parser.program().find("A").unwrap();
  let exposure: Vec<&str> = parser
    .program()
    .interface(a)
    .unwrap()
    .exposure
    .iter()
    .map(|s| s.as_str())
    .collect();
  assert_eq!(exposure, vec!["Worker"]);
}

#[test]
fn legacy_factory_functions_merge_across_interfaces() {
  let parser = finish(&[
    "[LegacyFactoryFunction=Image(long w)] interface A {};",
    "[LegacyFactoryFunction=Image(DOMString s)] interface B {};",
  ])
  .unwrap();
  let program = parser.program();
  let a = program.interface(program.find("A").unwrap()).unwrap();
  let b = program.interface(program.find("B").unwrap()).unwrap();
  assert_eq!(a.legacy_factory_functions.len(), 1);
  assert_eq!(a.legacy_factory_functions, b.legacy_factory_functions);
  let image = program.member(a.legacy_factory_functions[0]);
  assert_eq!(image.ident.name, "Image");
  assert_eq!(image.as_method().unwrap().overloads.len(), 2);
}

#[test]
fn lenient_float_only_on_first_overload() {
  let parser = finish(&["interface I {
    [LenientFloat] undefined f(double d);
    undefined f(float a, DOMString s);
  };"])
  .unwrap();
  let program = parser.program();
  let i = program.find("I").unwrap();
  let f = program.member(program.find_member(i, "f").unwrap());
  assert!(f.ext_attrs.has("LenientFloat"));
  assert_eq!(f.as_method().unwrap().overloads.len(), 2);

  let mut parser = WebIdlParser::default();
  let err = parser
    .parse(
      "interface I {
        undefined f(float a, DOMString s);
        [LenientFloat] undefined f(double d);
      };",
      "later.webidl",
    )
    .err()
    .unwrap();
  assert_eq!(err.kind, ErrorKind::InvalidExtendedAttribute);
  assert!(err.message.contains("overloaded"));
  assert_eq!(err.locations[0].line_col().0, 3);
}
