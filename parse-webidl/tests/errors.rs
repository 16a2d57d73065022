use parse_webidl::error::ErrorKind;
use parse_webidl::error::WebIdlError;
use parse_webidl::WebIdlParser;

fn finish_err(source: &str) -> WebIdlError {
  let mut parser = WebIdlParser::default();
  parser.parse(source, "errors.webidl").unwrap();
  match parser.finish() {
    Ok(defs) => panic!("expected an error, finished {} definitions", defs.len()),
    Err(err) => err,
  }
}

fn finish_ok(source: &str) {
  let mut parser = WebIdlParser::default();
  parser.parse(source, "ok.webidl").unwrap();
  if let Err(err) = parser.finish() {
    panic!("unexpected error: {}", err);
  };
}

fn assert_kind(source: &str, kind: ErrorKind) -> WebIdlError {
  let err = finish_err(source);
  assert_eq!(err.kind, kind, "{}", err);
  assert!(!err.locations.is_empty(), "{:?} has no locations", err.kind);
  assert!(!err.warning);
  err
}

#[test]
fn unresolved_types() {
  let err = assert_kind("interface A { attribute Foo x; };", ErrorKind::UnresolvedIdentifier);
  assert_eq!(err.locations[0].source_text(), "Foo");
  assert_kind("interface A : Missing {};", ErrorKind::UnresolvedIdentifier);
  assert_kind("interface A {}; A includes Missing;", ErrorKind::UnresolvedIdentifier);
}

#[test]
fn inheritance() {
  let err = assert_kind("interface A : B {}; interface B : A {};", ErrorKind::InheritanceCycle);
  assert_eq!(err.locations.len(), 2);
  assert_kind("interface A : A {};", ErrorKind::InheritanceCycle);
  assert_kind("dictionary D {}; interface A : D {};", ErrorKind::InvalidInheritance);
  assert_kind("interface E; interface A : E {};", ErrorKind::InvalidInheritance);
  assert_kind("interface A {}; dictionary D : A {};", ErrorKind::InvalidInheritance);
  assert_kind("interface A {}; interface B {}; A includes B;", ErrorKind::InvalidInheritance);
  assert_kind(
    "[SecureContext] interface P {}; interface C : P {};",
    ErrorKind::InvalidInheritance,
  );
  finish_ok("[SecureContext] interface P {}; [SecureContext] interface C : P {};");
}

#[test]
fn globals() {
  assert_kind(
    "[Global=Window, Exposed=Window] interface Window {}; interface Sub : Window {};",
    ErrorKind::InvalidGlobal,
  );
  assert_kind(
    "[Global=Window, Exposed=Window] interface Window {
      getter any (DOMString name);
      setter undefined (DOMString name, any value);
    };",
    ErrorKind::InvalidGlobal,
  );
  assert_kind(
    "interface Base { getter any (DOMString name); deleter undefined (DOMString name); };
    [Global=Window, Exposed=Window] interface Window : Base {};",
    ErrorKind::InvalidGlobal,
  );
}

#[test]
fn distinguishability() {
  let err = assert_kind(
    "interface A {}; interface B : A {}; typedef (A or B) U;",
    ErrorKind::IndistinguishableUnion,
  );
  assert!(err.message.contains("A and B"));
  assert_kind(
    "interface I { attribute (long or short) n; };",
    ErrorKind::IndistinguishableUnion,
  );
  assert_kind(
    "interface I { undefined f(long a); undefined f(double a); };",
    ErrorKind::IndistinguishableOverloads,
  );
  assert_kind(
    "interface I { undefined f(); undefined f(optional long a); };",
    ErrorKind::IndistinguishableOverloads,
  );
  finish_ok("interface I { undefined f(); undefined f(long a, optional DOMString b); };");
  finish_ok("interface I { undefined f(sequence<long> s); undefined f(DOMString s); };");
}

#[test]
fn callbacks_and_dictionaries() {
  finish_ok(
    "callback F = undefined (); dictionary D {};
    interface I { undefined f(F x); undefined f(optional D x = {}); };",
  );
  finish_ok("callback F = undefined (); dictionary D {}; typedef (F or D) U;");
  assert_kind(
    "[LegacyTreatNonObjectAsNull] callback F = undefined (); dictionary D {}; typedef (F or D) U;",
    ErrorKind::IndistinguishableUnion,
  );
  assert_kind(
    "[LegacyTreatNonObjectAsNull] callback F = undefined (); dictionary D {};
    interface I { undefined f(F x); undefined f(optional D x = {}); };",
    ErrorKind::IndistinguishableOverloads,
  );
}

#[test]
fn members_from_mixins_collide() {
  let err = assert_kind(
    "interface A { attribute long x; };
    interface mixin M { attribute long x; };
    A includes M;",
    ErrorKind::DuplicateIdentifier,
  );
  assert_eq!(err.locations.len(), 2);
  assert!(err.message.contains("'includes'"));
}

#[test]
fn exposure() {
  let worker = "[Global=Worker, Exposed=Worker] interface WorkerGlobalScope {};";
  assert_kind(
    &format!("{} [Exposed=Window] interface A {{ [Exposed=Worker] attribute long x; }};", worker),
    ErrorKind::ExposureViolation,
  );
  assert_kind(
    &format!("{} interface A {{}}; [Exposed=(Window,Worker)] interface B : A {{}};", worker),
    ErrorKind::ExposureViolation,
  );
  assert_kind(
    &format!(
      "{} [Exposed=Worker] interface W {{}}; [Exposed=(Window,Worker)] interface A {{ attribute W w; }};",
      worker
    ),
    ErrorKind::ExposureViolation,
  );
  assert_kind(
    "[Exposed=Nowhere] interface A {};",
    ErrorKind::InvalidExtendedAttribute,
  );
  finish_ok(&format!(
    "{} [Exposed=*] interface A {{ [Exposed=Worker] attribute long x; }};",
    worker
  ));
}

#[test]
fn exposure_compares_global_interfaces() {
  let dedicated =
    "[Global=(Worker,DedicatedWorker), Exposed=DedicatedWorker] interface DedicatedWorkerGlobalScope {};";
  finish_ok(&format!(
    "{} [Exposed=Worker] interface P {{}}; [Exposed=DedicatedWorker] interface C : P {{}};",
    dedicated
  ));
  finish_ok(&format!(
    "{} [Exposed=DedicatedWorker] interface A {{ [Exposed=Worker] attribute long x; }};",
    dedicated
  ));
  assert_kind(
    &format!(
      "{} [Exposed=Worker] interface P {{}}; [Exposed=(Window,DedicatedWorker)] interface C : P {{}};",
      dedicated
    ),
    ErrorKind::ExposureViolation,
  );
}

#[test]
fn mixin_members_need_a_shared_global() {
  let worker = "[Global=Worker, Exposed=Worker] interface W {};";
  let err = assert_kind(
    &format!(
      "{} [Exposed=Worker] interface mixin M {{ attribute long x; }}; interface A {{}}; A includes M;",
      worker
    ),
    ErrorKind::ExposureViolation,
  );
  assert_eq!(err.locations.len(), 2);
  assert!(err.message.contains("'M'"));
  finish_ok(&format!(
    "{} [Exposed=(Window,Worker)] interface mixin M {{ attribute long x; }}; interface A {{}}; A includes M;",
    worker
  ));
}

#[test]
fn special_operations() {
  let err = assert_kind(
    "interface A { getter long (unsigned long i); getter long item(unsigned long j); };",
    ErrorKind::InvalidMember,
  );
  assert_eq!(err.locations.len(), 2);
  assert_kind(
    "interface A { setter undefined (DOMString n, long v); };",
    ErrorKind::InvalidMember,
  );
  assert_kind("interface A { getter long (boolean b); };", ErrorKind::InvalidSignature);
  assert_kind("interface A { deleter undefined (unsigned long i); };", ErrorKind::InvalidSignature);
  assert_kind("interface A { stringifier long (); };", ErrorKind::InvalidSignature);
  assert_kind(
    "interface A { stringifier; stringifier attribute DOMString s; };",
    ErrorKind::InvalidMember,
  );
  finish_ok(
    "interface A {
      getter long (unsigned long i);
      setter undefined (unsigned long i, long v);
      getter any namedItem(DOMString n);
      stringifier;
    };",
  );
}

#[test]
fn attributes() {
  assert_kind("interface A { attribute sequence<long> s; };", ErrorKind::InvalidType);
  assert_kind("dictionary D {}; interface A { attribute (D or long) d; };", ErrorKind::InvalidType);
  assert_kind("interface A { attribute Promise<any> p; };", ErrorKind::InvalidMember);
  assert_kind("interface A { stringifier attribute long n; };", ErrorKind::InvalidMember);
  assert_kind(
    "interface A { [LenientFloat] attribute long n; };",
    ErrorKind::InvalidExtendedAttribute,
  );
  assert_kind(
    "interface B { attribute long v; }; interface A { [PutForwards=missing] readonly attribute B b; };",
    ErrorKind::InvalidExtendedAttribute,
  );
  finish_ok("interface B { attribute long v; }; interface A { [PutForwards=v] readonly attribute B b; };");
  assert_kind(
    "interface A { [Default] object notJSON(); };",
    ErrorKind::InvalidExtendedAttribute,
  );
  finish_ok("interface A { [Default] object toJSON(); };");
  let err = assert_kind(
    "interface P { [LegacyUnforgeable] readonly attribute long x; };
    interface C : P { attribute long x; };",
    ErrorKind::InvalidMember,
  );
  assert_eq!(err.locations.len(), 2);
}

#[test]
fn arguments() {
  assert_kind("interface A { undefined f(undefined x); };", ErrorKind::InvalidType);
  assert_kind(
    "interface A { undefined f(optional long a, long b); };",
    ErrorKind::InvalidSignature,
  );
  assert_kind(
    "dictionary Opts { long a; }; interface A { undefined f(Opts o); };",
    ErrorKind::InvalidSignature,
  );
  finish_ok("dictionary Opts { required long a; }; interface A { undefined f(Opts o); };");
  finish_ok("dictionary Opts { long a; }; interface A { undefined f(Opts o, long b); };");
  finish_ok("dictionary Opts { long a; }; interface A { undefined f(optional Opts o); };");
}

#[test]
fn values() {
  assert_kind("interface A { const octet o = 256; };", ErrorKind::InvalidValue);
  assert_kind("interface A { const DOMString s = 1; };", ErrorKind::InvalidType);
  assert_kind(
    "interface A { undefined f(optional long x = \"s\"); };",
    ErrorKind::InvalidValue,
  );
  assert_kind(
    "enum E { \"a\" }; interface A { undefined f(optional E e = \"b\"); };",
    ErrorKind::InvalidValue,
  );
  finish_ok("enum E { \"a\" }; interface A { undefined f(optional E e = \"a\"); };");
  assert_kind(
    "interface A { undefined f(optional long x = null); };",
    ErrorKind::InvalidValue,
  );
  finish_ok("interface A { undefined f(optional long? x = null, optional sequence<long> s = []); };");
}

#[test]
fn dictionaries() {
  assert_kind("dictionary D { required long x = 5; };", ErrorKind::InvalidMember);
  assert_kind("dictionary D { undefined u; };", ErrorKind::InvalidType);
  assert_kind("dictionary A {}; dictionary D { A? a; };", ErrorKind::InvalidType);
  assert_kind("dictionary D { long x; long x; };", ErrorKind::DuplicateIdentifier);
  assert_kind(
    "dictionary P { long x; }; dictionary C : P { long x; };",
    ErrorKind::DuplicateIdentifier,
  );
  assert_kind("dictionary D { sequence<D> list; };", ErrorKind::SelfContainingDictionary);
  assert_kind(
    "dictionary P { C c; }; dictionary C : P {};",
    ErrorKind::SelfContainingDictionary,
  );
  assert_kind(
    "dictionary A { record<DOMString, (B or long)> r; }; dictionary B { A a; };",
    ErrorKind::SelfContainingDictionary,
  );
}

#[test]
fn typedefs_and_types() {
  assert_kind("typedef sequence<T> T;", ErrorKind::InvalidType);
  assert_kind("typedef long? T; typedef T? U;", ErrorKind::InvalidType);
  assert_kind("typedef (long? or DOMString?) U;", ErrorKind::InvalidType);
  assert_kind("interface mixin M {}; typedef M T;", ErrorKind::InvalidType);
  assert_kind("typedef [Clamp] DOMString T;", ErrorKind::InvalidType);
}

#[test]
fn callback_interfaces() {
  assert_kind(
    "callback interface L { undefined a(); undefined b(); };",
    ErrorKind::InvalidMember,
  );
  finish_ok("callback interface L { const long C = 1; undefined handle(); };");
}

#[test]
fn error_display() {
  let err = finish_err("interface A { attribute Foo x; };");
  let rendered = err.to_string();
  assert!(rendered.starts_with("error: "));
  assert!(rendered.contains(", errors.webidl line 1:25\n"));
  assert!(rendered.ends_with('^'));
  assert_eq!(err.code(), err.kind.code());
}
