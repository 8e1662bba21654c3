//! End-to-end tests for the analysis pipeline.
//!
//! These tests feed PHP source through the engine (tokenizer, parser,
//! cache and builder) and check the linked model that comes out.

use std::fs;
use std::path::PathBuf;

use php_depend::{AnalysisError, Config, Engine, RunStats};
use php_depend_index::{BuilderError, MethodOrigin, Resolved, TypeId};
use php_depend_parser::{NodeKind, ParseError};
use php_depend_types::{TypeKind, Visibility};

fn analyze(files: &[(&str, &str)]) -> Engine {
    let mut engine = Engine::new(Config::default());
    for (path, source) in files {
        engine
            .analyze_source(path, source)
            .expect("recorded, not aborted");
    }
    engine
}

fn type_id(engine: &Engine, name: &str) -> TypeId {
    engine
        .builder()
        .find_type(name)
        .unwrap_or_else(|| panic!("type {name} not registered"))
}

fn resolved_name(engine: &Engine, resolved: &Resolved) -> String {
    match resolved {
        Resolved::Type(id) => engine.builder().type_entity(*id).name.clone(),
        Resolved::Unknown(name) => format!("?{name}"),
    }
}

fn write_sources(dir: &std::path::Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, source)| {
            let path = dir.join(name);
            fs::write(&path, source).expect("write source");
            path
        })
        .collect()
}

// ── Model shape ─────────────────────────────────────────────────────────

#[test]
fn test_class_round_trip() {
    let engine = analyze(&[(
        "a.php",
        "<?php\nclass A extends B implements C { public function f() {} }\n",
    )]);
    assert!(engine.errors().is_empty(), "errors: {:?}", engine.errors());

    let builder = engine.builder();
    let a = type_id(&engine, "A");
    let entity = builder.type_entity(a);
    assert_eq!(entity.kind, TypeKind::Class);
    assert_eq!(entity.name, "A");

    let (unit, decl) = builder.type_decl(a).expect("declaration");
    assert!(decl.parent.is_some());
    assert_eq!(decl.interfaces.len(), 1);
    assert_eq!(decl.methods.len(), 1);

    let method = &decl.methods[0];
    assert_eq!(method.name, "f");
    assert_eq!(method.modifiers.effective_visibility(), Visibility::Public);
    assert!(!method.modifiers.is_static);
    assert!(!method.modifiers.is_abstract);

    let source = builder.unit(unit);
    assert!(source.ast.position_violations().is_empty());

    assert_eq!(
        builder.parent_class(a),
        Some(Resolved::Unknown("B".to_string()))
    );
    let interfaces: Vec<String> = builder
        .interfaces(a)
        .iter()
        .map(|r| resolved_name(&engine, r))
        .collect();
    assert_eq!(interfaces, vec!["?C"]);
}

#[test]
fn test_forward_reference_resolves_once_declared() {
    let engine = analyze(&[
        ("a.php", "<?php namespace App; class A extends Base {}"),
        ("base.php", "<?php namespace App; abstract class Base { function run() {} }"),
    ]);
    let a = type_id(&engine, "app\\a");
    let base = type_id(&engine, "App\\Base");

    assert_eq!(engine.builder().parent_class(a), Some(Resolved::Type(base)));
    let methods = engine.builder().effective_methods(a).expect("methods");
    assert_eq!(
        methods.get("RUN").map(|m| m.origin),
        Some(MethodOrigin::Inherited(base))
    );
}

#[test]
fn test_namespaces_and_functions() {
    let engine = analyze(&[
        (
            "lib.php",
            "<?php namespace Lib { class Box {} function make() {} }\nnamespace { function main() {} }",
        ),
        ("app.php", "<?php namespace App; use Lib\\Box; class Crate extends Box {}"),
    ]);
    let builder = engine.builder();

    let lib = builder.find_namespace(Some("lib")).expect("Lib namespace");
    assert_eq!(builder.namespace(lib).types().len(), 1);
    assert_eq!(builder.namespace(lib).functions().len(), 1);
    assert!(builder.find_function("LIB\\make").is_some());

    let global = builder.find_namespace(None).expect("global namespace");
    assert!(builder.namespace(global).is_global());
    assert!(builder.find_function("main").is_some());

    let crate_type = type_id(&engine, "App\\Crate");
    let parent = builder.parent_class(crate_type).expect("parent");
    assert_eq!(resolved_name(&engine, &parent), "Lib\\Box");
}

// ── Trait composition ───────────────────────────────────────────────────

const TRAITS: &str = "<?php
trait T1 { public function m() { return 1; } }
trait T2 { public function m() { return 2; } }
";

#[test]
fn test_trait_precedence_picks_winner() {
    let engine = analyze(&[
        ("traits.php", TRAITS),
        (
            "c.php",
            "<?php class C { use T1, T2 { T1::m insteadof T2; } }",
        ),
    ]);
    let t1 = type_id(&engine, "T1");
    let c = type_id(&engine, "C");

    let methods = engine.builder().effective_methods(c).expect("no collision");
    assert_eq!(methods.len(), 1);
    let m = methods.get("m").expect("m");
    assert_eq!(m.declaring_type, t1);
    assert_eq!(m.origin, MethodOrigin::Trait(t1));
}

#[test]
fn test_trait_collision_is_lazy() {
    let engine = analyze(&[("traits.php", TRAITS), ("c.php", "<?php class C { use T1, T2; }")]);
    assert!(engine.errors().is_empty(), "parsing never reports collisions");

    let c = type_id(&engine, "C");
    let err = engine.builder().effective_methods(c).unwrap_err();
    assert_eq!(
        err,
        BuilderError::TraitMethodCollision {
            method: "m".to_string(),
            type_name: "C".to_string(),
        }
    );
    assert_eq!(engine.method_errors(), vec![err]);
}

#[test]
fn test_trait_alias_with_visibility() {
    let engine = analyze(&[(
        "c.php",
        "<?php trait T { public function m() {} }\nclass C { use T { m as protected n; } }",
    )]);
    let c = type_id(&engine, "C");
    let methods = engine.builder().effective_methods(c).expect("methods");

    assert_eq!(methods.names(), vec!["n", "m"]);
    let n = methods.get("n").expect("alias");
    assert_eq!(n.modifiers.effective_visibility(), Visibility::Protected);
    let m = methods.get("m").expect("original");
    assert_eq!(m.modifiers.effective_visibility(), Visibility::Public);

    let decl = engine.builder().method_decl(n).expect("declared in T");
    assert_eq!(decl.name, "m");
}

#[test]
fn test_own_method_beats_trait() {
    let engine = analyze(&[
        ("traits.php", TRAITS),
        (
            "c.php",
            "<?php class C { use T1, T2; public function m() { return 3; } }",
        ),
    ]);
    let c = type_id(&engine, "C");
    let methods = engine.builder().effective_methods(c).expect("own method wins");
    assert_eq!(methods.get("m").map(|m| m.origin), Some(MethodOrigin::Declared));
}

// ── Scoped keywords ─────────────────────────────────────────────────────

#[test]
fn test_self_outside_type_is_invalid_state() {
    let engine = analyze(&[
        ("bad.php", "<?php function f() { return self::X; }"),
        ("good.php", "<?php class Good {}"),
    ]);
    assert_eq!(engine.errors().len(), 1);
    let error = &engine.errors()[0];
    assert_eq!(error.path(), "bad.php");
    assert!(matches!(
        error,
        AnalysisError::Parse(ParseError::InvalidState { .. })
    ));
    assert!(engine.builder().find_function("f").is_none());
    assert!(engine.builder().find_type("Good").is_some());
}

#[test]
fn test_parent_without_declared_parent_is_invalid_state() {
    let engine = analyze(&[(
        "bad.php",
        "<?php class Orphan { function f() { return parent::f(); } }",
    )]);
    assert!(matches!(
        engine.errors()[0],
        AnalysisError::Parse(ParseError::InvalidState { .. })
    ));
    assert!(engine.builder().find_type("Orphan").is_none());
}

#[test]
fn test_parent_reference_resolves_to_declared_parent() {
    let engine = analyze(&[(
        "ok.php",
        "<?php class P { function g() {} }\nclass Q extends P { function f() { return parent::g(); } }",
    )]);
    assert!(engine.errors().is_empty(), "errors: {:?}", engine.errors());

    let q = type_id(&engine, "Q");
    let p = type_id(&engine, "P");
    let (unit, decl) = engine.builder().type_decl(q).expect("declaration");
    let source = engine.builder().unit(unit);
    let node = source
        .ast
        .find_first_of_type(decl.node, NodeKind::ParentReference)
        .expect("parent reference");
    assert_eq!(
        engine.builder().resolve_node(unit, node),
        Some(&Resolved::Type(p))
    );
}

// ── Registry rules ──────────────────────────────────────────────────────

#[test]
fn test_observed_name_cannot_be_redeclared() {
    let mut engine = analyze(&[("a.php", "<?php class A implements Seen {}")]);
    let a = type_id(&engine, "A");
    assert_eq!(
        engine.builder().interfaces(a),
        vec![Resolved::Unknown("Seen".to_string())]
    );

    let result = engine
        .analyze_source("seen.php", "<?php interface Seen {} class Extra {}")
        .expect("recorded");
    assert!(result.is_none());
    assert!(matches!(
        engine.errors()[0],
        AnalysisError::Builder {
            source: BuilderError::BuilderFrozen { .. },
            ..
        }
    ));
    // Nothing from the rejected file is registered.
    assert!(engine.builder().find_type("Extra").is_none());
}

#[test]
fn test_abort_on_error_stops_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_sources(
        dir.path(),
        &[
            ("one.php", "<?php class One {}"),
            ("two.php", "<?php class Two {"),
            ("three.php", "<?php class Three {}"),
        ],
    );
    let config = Config {
        abort_on_error: true,
        ..Config::default()
    };
    let mut engine = Engine::new(config);
    let err = engine.analyze_paths(&paths).unwrap_err();

    assert!(matches!(
        err,
        AnalysisError::Parse(ParseError::StreamExhausted { .. })
    ));
    assert!(err.path().ends_with("two.php"));
    assert!(engine.builder().find_type("One").is_some());
    assert!(engine.builder().find_type("Three").is_none());
}

// ── Parse cache ─────────────────────────────────────────────────────────

#[test]
fn test_file_cache_serves_second_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_dir = dir.path().join("cache");
    let paths = write_sources(
        dir.path(),
        &[
            ("base.php", "<?php namespace App; class Base { function run() {} }"),
            ("child.php", "<?php namespace App; class Child extends Base {}"),
        ],
    );
    let config = Config {
        cache_dir: Some(cache_dir.clone()),
        ..Config::default()
    };

    let mut first = Engine::new(config.clone());
    let stats = first.analyze_paths(&paths).expect("first run");
    assert_eq!(
        stats,
        RunStats {
            parsed: 2,
            cached: 0,
            failed: 0
        }
    );
    assert_eq!(fs::read_dir(&cache_dir).expect("cache dir").count(), 2);

    let mut second = Engine::new(config);
    let stats = second.analyze_paths(&paths).expect("second run");
    assert_eq!(stats.cached, 2);
    assert_eq!(stats.total(), 2);

    let child = type_id(&second, "App\\Child");
    let base = type_id(&second, "App\\Base");
    assert_eq!(second.builder().parent_class(child), Some(Resolved::Type(base)));
    let methods = second.builder().effective_methods(child).expect("methods");
    assert!(methods.contains("run"));

    let (unit, decl) = second.builder().type_decl(base).expect("declaration");
    let ast = &second.builder().unit(unit).ast;
    let method = ast
        .find_first_of_type(decl.node, NodeKind::MethodDeclaration)
        .expect("method node");
    assert_eq!(ast.parent(method), Some(decl.node));
}

#[test]
fn test_parser_options_are_part_of_the_cache_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let paths = write_sources(
        dir.path(),
        &[("f.php", "<?php /** @return Widget */ function make() {}")],
    );
    let config = Config {
        cache_dir: Some(dir.path().join("cache")),
        ..Config::default()
    };

    let mut first = Engine::new(config.clone());
    first.analyze_paths(&paths).expect("first run");

    let mut ignoring = Engine::new(Config {
        ignore_annotations: true,
        ..config
    });
    let stats = ignoring.analyze_paths(&paths).expect("second run");
    assert_eq!(stats.parsed, 1);
    assert_eq!(stats.cached, 0);

    let annotated = |engine: &Engine| {
        let (_, unit) = engine.builder().units().next().expect("unit");
        unit.ast
            .find_all_of_type(unit.root, NodeKind::ClassOrInterfaceReference)
            .len()
    };
    assert_eq!(annotated(&first), 1);
    assert_eq!(annotated(&ignoring), 0);
}
