use super::Parser;
use crate::ast::member::DeclarationKind;
use crate::ast::member::MemberKind;
use crate::ast::value::Value;
use crate::ast::Definition;
use crate::ast::InterfaceKind;
use crate::ast::Program;
use crate::builtins::BuiltinType;
use crate::error::ErrorKind;
use crate::error::IdlResult;
use crate::loc::SourceFile;
use crate::options::ParserOptions;
use crate::token::TT;
use crate::types::UnresolvedKind;
use crate::types::UnresolvedType;

fn parse(source: &str) -> IdlResult<Program> {
  let mut program = Program::new(ParserOptions::default());
  Parser::new(source, SourceFile::new("test.webidl", source), &mut program).parse_file()?;
  Ok(program)
}

fn parse_type(source: &str) -> UnresolvedType {
  let mut program = Program::new(ParserOptions::default());
  let mut p = Parser::new(source, SourceFile::new("type.webidl", source), &mut program);
  let ty = p.parse_type().unwrap();
  assert_eq!(p.peek().typ, TT::EOF);
  ty
}

#[test]
fn test_parser() {
  let source = "interface A {};";
  let mut program = Program::new(ParserOptions::default());
  let mut p = Parser::new(source, SourceFile::new("t", source), &mut program);
  let cp = p.checkpoint();
  assert_eq!(p.next_tok_i, 0);

  let t = p.peek();
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 1);
  assert_eq!(t.typ, TT::KeywordInterface);

  let t = p.consume();
  assert_eq!(p.next_tok_i, 1);
  assert_eq!(t.typ, TT::KeywordInterface);

  let t = p.consume();
  assert_eq!(p.next_tok_i, 2);
  assert_eq!(p.buf.len(), 2);
  assert_eq!(t.typ, TT::Identifier);
  assert_eq!(p.str(t.loc), "A");

  p.restore_checkpoint(cp);
  assert_eq!(p.next_tok_i, 0);
  assert_eq!(p.buf.len(), 2);
  let (a, b) = p.peek_2();
  assert_eq!((a.typ, b.typ), (TT::KeywordInterface, TT::Identifier));
  assert_eq!(p.next_tok_i, 0);
}

#[test]
fn test_parse_types() {
  let ty = parse_type("unsigned long long");
  assert_eq!(ty.kind, UnresolvedKind::Builtin(BuiltinType::UnsignedLongLong));

  let ty = parse_type("(long or DOMString)?");
  assert!(ty.nullable);
  let UnresolvedKind::Union(members) = &ty.kind else {
    panic!("expected union, got {:?}", ty.kind);
  };
  assert_eq!(members.len(), 2);
  assert!(members[1].is_builtin(BuiltinType::DomString));

  let ty = parse_type("record<DOMString, sequence<Foo>>");
  let UnresolvedKind::Record(key, value) = &ty.kind else {
    panic!("expected record, got {:?}", ty.kind);
  };
  assert_eq!(*key, BuiltinType::DomString);
  let UnresolvedKind::Sequence(element) = &value.kind else {
    panic!("expected sequence, got {:?}", value.kind);
  };
  assert!(matches!(&element.kind, UnresolvedKind::Named(id) if id.name == "Foo"));

  let ty = parse_type("Promise<void>");
  let UnresolvedKind::Promise(inner) = &ty.kind else {
    panic!("expected promise, got {:?}", ty.kind);
  };
  assert!(inner.is_builtin(BuiltinType::Undefined));
}

#[test]
fn test_union_needs_two_members() {
  let mut program = Program::new(ParserOptions::default());
  let source = "(long)";
  let mut p = Parser::new(source, SourceFile::new("t", source), &mut program);
  let err = p.parse_type().unwrap_err();
  assert_eq!(err.kind, ErrorKind::RequiredTokenNotFound(TT::KeywordOr));
}

#[test]
fn test_parse_interface_members() {
  let program = parse(
    "interface A : B {
      const short MAX = 5;
      readonly attribute long length;
      attribute DOMString _interface;
      undefined f(long a, optional boolean b = false);
      static A create();
    };",
  )
  .unwrap();
  let id = program.find("A").unwrap();
  let a = program.interface(id).unwrap();
  assert_eq!(a.kind, InterfaceKind::Interface);
  assert_eq!(a.parent_name.as_ref().unwrap().name, "B");
  assert_eq!(a.members.len(), 5);

  let max = program.member(program.find_member(id, "MAX").unwrap());
  let MemberKind::Const(c) = &max.kind else {
    panic!("expected constant");
  };
  assert_eq!(c.value, Value::Integer(5));

  let length = program.member(program.find_member(id, "length").unwrap());
  assert!(length.as_attribute().unwrap().readonly);
  assert!(program.find_member(id, "interface").is_some());

  let f = program.member(program.find_member(id, "f").unwrap());
  let overload = &f.as_method().unwrap().overloads[0];
  assert_eq!(overload.args.len(), 2);
  assert!(overload.args[1].optional);
  assert_eq!(overload.args[1].default, Some(Value::Boolean(false)));

  let create = program.member(program.find_member(id, "create").unwrap());
  assert!(create.is_static());
}

#[test]
fn test_overloads_merge_into_one_member() {
  let program = parse("interface A { undefined f(long a); undefined f(DOMString a); };").unwrap();
  let id = program.find("A").unwrap();
  assert_eq!(program.interface(id).unwrap().members.len(), 1);
  let f = program.member(program.find_member(id, "f").unwrap());
  assert_eq!(f.as_method().unwrap().overloads.len(), 2);
}

#[test]
fn test_static_and_regular_do_not_merge() {
  let err = parse("interface A { undefined f(); static undefined f(); };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);
  assert_eq!(err.locations.len(), 2);
}

#[test]
fn test_partial_before_declaration_is_promoted() {
  let program = parse(
    "partial interface A { attribute long x; };
    interface A { attribute long y; };",
  )
  .unwrap();
  let id = program.find("A").unwrap();
  let a = program.interface(id).unwrap();
  assert!(a.declared);
  assert_eq!(a.partials.len(), 1);
  assert_eq!(a.members.len(), 1);
  assert!(program.find_member(id, "x").is_some());
}

#[test]
fn test_external_interfaces() {
  let program = parse("interface Foo; interface Foo;").unwrap();
  let id = program.find("Foo").unwrap();
  assert!(matches!(program.def(id), Definition::External(_)));
  assert_eq!(program.definitions().count(), 1);
}

#[test]
fn test_includes_statement_is_unbound() {
  let program = parse("interface A {}; interface mixin M {}; A includes M;").unwrap();
  assert_eq!(program.definitions().count(), 3);
  assert!(matches!(program.def(program.find("A").unwrap()), Definition::Interface(_)));
  assert!(program
    .definitions()
    .any(|(_, d)| matches!(d, Definition::Includes(inc) if inc.mixin.name == "M")));
}

#[test]
fn test_enum_values() {
  let program = parse("enum E { \"a\", \"b\", };").unwrap();
  let e = program.enumeration(program.find("E").unwrap()).unwrap();
  assert_eq!(e.values, vec!["a", "b"]);

  let err = parse("enum E { \"a\", \"a\" };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);
  assert_eq!(err.locations.len(), 2);
}

#[test]
fn test_callbacks() {
  let program = parse(
    "callback Handler = undefined (DOMString type, any... rest);
    callback interface Listener { undefined handle(); };",
  )
  .unwrap();
  let cb = program.callback(program.find("Handler").unwrap()).unwrap();
  assert!(!cb.constructor);
  assert_eq!(cb.args.len(), 2);
  assert!(cb.args[1].variadic);
  let listener = program.interface(program.find("Listener").unwrap()).unwrap();
  assert_eq!(listener.kind, InterfaceKind::CallbackInterface);
}

#[test]
fn test_declarations() {
  let program = parse("interface M { readonly maplike<DOMString, long>; };").unwrap();
  let id = program.find("M").unwrap();
  let decl = program.interface(id).unwrap().declaration.unwrap();
  let d = program.member(decl).as_declaration().unwrap();
  assert_eq!(d.kind, DeclarationKind::Maplike);
  assert!(d.readonly);
  assert!(d.key_type.is_some());

  let err = parse("interface S { setlike<long>; iterable<long>; };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::InvalidMember);
  assert_eq!(err.locations.len(), 2);
}

#[test]
fn test_legacy_factory_functions() {
  let program = parse(
    "[LegacyFactoryFunction=Image(optional unsigned long width)]
    interface HTMLImageElement {};",
  )
  .unwrap();
  let id = program.find("HTMLImageElement").unwrap();
  let i = program.interface(id).unwrap();
  assert_eq!(i.legacy_factory_functions.len(), 1);
  let image = program.member(i.legacy_factory_functions[0]);
  assert_eq!(image.ident.name, "Image");
  assert!(i.ext_attrs.has("LegacyFactoryFunction"));
}

#[test]
fn test_member_rules() {
  let err = parse("namespace N { static undefined f(); };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::InvalidMember);

  let err = parse("interface A { undefined f(long... a, long b); };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::InvalidSignature);

  let err = parse("interface A { undefined f(long a, long a); };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);

  let err = parse("interface A { attribute long toString; };").unwrap_err();
  assert_eq!(err.kind, ErrorKind::ReservedIdentifier);

  let err = parse("interface __A {};").unwrap_err();
  assert_eq!(err.kind, ErrorKind::ReservedIdentifier);
}

#[test]
fn test_syntax_errors() {
  let err = parse("interface A { attribute long x }").unwrap_err();
  assert!(err.kind.is_syntax());
  assert_eq!(err.locations.len(), 1);

  let err = parse("interface A {").unwrap_err();
  assert_eq!(err.kind, ErrorKind::UnexpectedEnd);

  let err = parse("partial enum E {};").unwrap_err();
  assert_eq!(
    err.kind,
    ErrorKind::ExpectedSyntax("interface, dictionary or namespace")
  );
}

#[test]
fn test_unknown_extended_attribute() {
  let err = parse("[Bogus] interface A {};").unwrap_err();
  assert_eq!(err.kind, ErrorKind::InvalidExtendedAttribute);
  assert!(err.message.contains("[Bogus]"));
}
