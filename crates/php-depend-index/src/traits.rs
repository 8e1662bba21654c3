//! Trait composition.
//!
//! Merges the methods a type imports through its `use` statements,
//! honouring `insteadof` exclusions and `as` aliases.

use std::collections::{HashMap, HashSet};

use php_depend_parser::{Ast, NodeId, NodeKind, TypeDecl};
use php_depend_types::Visibility;
use tracing::debug;

use crate::builder::{Builder, Resolved, TypeId, UnitId};
use crate::error::BuilderError;
use crate::methods::{EffectiveMethod, MethodOrigin, MethodTable};

/// `[Trait::]method as [visibility] [alias]`
#[derive(Debug)]
struct Alias {
    method: String,
    source: Option<TypeId>,
    new_name: Option<String>,
    visibility: Option<Visibility>,
}

/// Adaptation rules of all `use` statements of one type.
#[derive(Debug, Default)]
struct Rules {
    /// Method name to the trait an `insteadof` rule picked.
    winners: HashMap<String, TypeId>,
    /// (method name, trait) pairs an `insteadof` rule excluded.
    excluded: HashSet<(String, TypeId)>,
    aliases: Vec<Alias>,
    /// Set when an alias names a trait that is not registered.
    unknown_sources: Vec<usize>,
}

/// Methods `owner` imports from traits, before its own declarations.
pub(crate) fn compose(
    builder: &Builder,
    owner: TypeId,
    unit: UnitId,
    decl: &TypeDecl,
) -> Result<MethodTable, BuilderError> {
    let ast = &builder.unit(unit).ast;
    let mut used: Vec<TypeId> = Vec::new();
    let mut rules = Rules::default();

    for &statement in &decl.trait_uses {
        for &child in ast.children(statement) {
            if ast.kind(child) == NodeKind::TraitAdaptation {
                collect_rules(builder, unit, ast, child, &mut rules);
                continue;
            }
            match builder.resolve_node(unit, child) {
                Some(Resolved::Type(id)) if !used.contains(id) => used.push(*id),
                Some(Resolved::Unknown(name)) => {
                    debug!(owner = %decl.fqn(), trait_name = %name, "used trait is not registered")
                }
                _ => {}
            }
        }
    }
    if used.is_empty() {
        return Ok(MethodTable::default());
    }

    let mut provided = Vec::with_capacity(used.len());
    for &id in &used {
        provided.push((id, builder.effective_methods(id)?));
    }

    // An alias without a source trait binds to the first used trait that
    // declares the method.
    for (slot, alias) in rules.aliases.iter_mut().enumerate() {
        if alias.source.is_none() && !rules.unknown_sources.contains(&slot) {
            alias.source = provided
                .iter()
                .find(|(_, methods)| methods.contains(&alias.method))
                .map(|(id, _)| *id);
        }
    }

    let owner_name = &builder.type_entity(owner).name;
    let mut table = MethodTable::default();
    for (trait_id, methods) in &provided {
        for method in methods.iter() {
            let key = method.name.to_lowercase();
            let excluded = rules.excluded.contains(&(key.clone(), *trait_id));

            let imported = EffectiveMethod {
                origin: MethodOrigin::Trait(*trait_id),
                ..method.clone()
            };
            let mut visibility = None;
            for alias in rules
                .aliases
                .iter()
                .filter(|alias| alias.method == key && alias.source == Some(*trait_id))
            {
                match &alias.new_name {
                    Some(new_name) => {
                        let mut renamed = imported.clone();
                        renamed.name = new_name.clone();
                        if let Some(v) = alias.visibility {
                            renamed.modifiers = renamed.modifiers.with_visibility(v);
                        }
                        merge(&mut table, renamed, &rules, decl, owner_name)?;
                    }
                    None => visibility = alias.visibility,
                }
            }

            if excluded {
                continue;
            }
            let mut original = imported;
            if let Some(v) = visibility {
                original.modifiers = original.modifiers.with_visibility(v);
            }
            merge(&mut table, original, &rules, decl, owner_name)?;
        }
    }
    Ok(table)
}

fn collect_rules(builder: &Builder, unit: UnitId, ast: &Ast, adaptation: NodeId, rules: &mut Rules) {
    for &item in ast.children(adaptation) {
        let method = ast.image(item).to_lowercase();
        match ast.kind(item) {
            NodeKind::TraitAdaptationPrecedence => {
                let mut traits = ast
                    .children(item)
                    .iter()
                    .map(|&node| builder.resolve_node(unit, node).and_then(Resolved::type_id));
                if let Some(Some(winner)) = traits.next() {
                    rules.winners.insert(method.clone(), winner);
                }
                for excluded in traits.flatten() {
                    rules.excluded.insert((method.clone(), excluded));
                }
            }
            NodeKind::TraitAdaptationAlias => {
                let mut alias = Alias {
                    method,
                    source: None,
                    new_name: None,
                    visibility: ast.node(item).modifiers.visibility,
                };
                let mut unknown_source = false;
                for &child in ast.children(item) {
                    if ast.kind(child) == NodeKind::Identifier {
                        alias.new_name = Some(ast.image(child).to_string());
                    } else {
                        alias.source = builder.resolve_node(unit, child).and_then(Resolved::type_id);
                        unknown_source = alias.source.is_none();
                    }
                }
                if unknown_source {
                    rules.unknown_sources.push(rules.aliases.len());
                }
                rules.aliases.push(alias);
            }
            _ => {}
        }
    }
}

/// Add one imported candidate to the table.
///
/// Names the owner declares itself are skipped. A missing entry is
/// inserted; a concrete candidate replaces an abstract one; an abstract
/// candidate never replaces anything. Two concrete methods collide unless
/// one `insteadof` rule picks one of them and excludes the other.
fn merge(
    table: &mut MethodTable,
    candidate: EffectiveMethod,
    rules: &Rules,
    owner: &TypeDecl,
    owner_name: &str,
) -> Result<(), BuilderError> {
    if owner.method(&candidate.name).is_some() {
        return Ok(());
    }
    let Some(existing) = table.get(&candidate.name) else {
        table.insert(candidate);
        return Ok(());
    };
    if existing.same_declaration(&candidate) && existing.name == candidate.name {
        return Ok(());
    }
    if candidate.is_abstract() {
        return Ok(());
    }
    if existing.is_abstract() {
        table.insert(candidate);
        return Ok(());
    }
    let existing = existing.origin;
    let key = candidate.name.to_lowercase();
    let resolved = |winner: MethodOrigin, loser: MethodOrigin| match (winner, loser) {
        (MethodOrigin::Trait(winner), MethodOrigin::Trait(loser)) => {
            rules.winners.get(&key) == Some(&winner)
                && rules.excluded.contains(&(key.clone(), loser))
        }
        _ => false,
    };
    if resolved(candidate.origin, existing) {
        table.insert(candidate);
        return Ok(());
    }
    if resolved(existing, candidate.origin) {
        return Ok(());
    }
    Err(BuilderError::TraitMethodCollision {
        method: candidate.name,
        type_name: owner_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use php_depend_parser::{parse_source, ParserOptions};
    use php_depend_types::Visibility;

    use crate::builder::Builder;
    use crate::error::BuilderError;
    use crate::methods::MethodOrigin;

    fn build(source: &str) -> Builder {
        let mut builder = Builder::new();
        let unit = parse_source("traits.php", source, ParserOptions::default()).expect("parse");
        builder.register_unit(unit).expect("register");
        builder
    }

    const TWO_TRAITS: &str = "<?php
        trait T1 { public function m() { return 1; } }
        trait T2 { public function m() { return 2; } }
    ";

    #[test]
    fn test_precedence_picks_winner() {
        let builder = build(&format!(
            "{TWO_TRAITS} class C {{ use T1, T2 {{ T1::m insteadof T2; }} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let t1 = builder.find_type("T1").expect("T1");
        let table = builder.effective_methods(c).expect("methods");
        let m = table.get("m").expect("m");
        assert_eq!(m.declaring_type, t1);
        assert_eq!(m.origin, MethodOrigin::Trait(t1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_collision_without_precedence() {
        let builder = build(&format!("{TWO_TRAITS} class C {{ use T1, T2; }}"));
        let c = builder.find_type("C").expect("C");
        let err = builder.effective_methods(c).expect_err("collision");
        assert_eq!(
            err,
            BuilderError::TraitMethodCollision {
                method: "m".into(),
                type_name: "C".into(),
            }
        );
    }

    #[test]
    fn test_collision_is_reported_only_when_requested() {
        let builder = build(&format!("{TWO_TRAITS} class C {{ use T1, T2; }}"));
        let t1 = builder.find_type("T1").expect("T1");
        assert!(builder.effective_methods(t1).is_ok());
    }

    #[test]
    fn test_alias_with_visibility_keeps_original() {
        let builder = build(
            "<?php trait T { public function m() {} } class C { use T { m as protected n; } }",
        );
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("methods");
        let n = table.get("n").expect("n");
        assert_eq!(n.modifiers.visibility, Some(Visibility::Protected));
        let m = table.get("m").expect("m");
        assert!(m.modifiers.is_public());
        assert_eq!(builder.method_decl(n).map(|d| d.name.as_str()), Some("m"));
    }

    #[test]
    fn test_visibility_only_alias_changes_original() {
        let builder = build("<?php trait T { public function m() {} } class C { use T { m as private; } }");
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.len(), 1);
        assert!(table.get("m").expect("m").modifiers.is_private());
    }

    #[test]
    fn test_alias_can_resolve_collision() {
        let builder = build(&format!(
            "{TWO_TRAITS} class C {{ use T1, T2 {{ T1::m insteadof T2; T2::m as m2; }} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let t2 = builder.find_type("T2").expect("T2");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.names(), vec!["m", "m2"]);
        assert_eq!(table.get("m2").map(|m| m.declaring_type), Some(t2));
    }

    #[test]
    fn test_unqualified_alias_binds_first_trait() {
        let builder = build(&format!(
            "{TWO_TRAITS} class C {{ use T1, T2 {{ T1::m insteadof T2; m as other; }} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let t1 = builder.find_type("T1").expect("T1");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.get("other").map(|m| m.declaring_type), Some(t1));
    }

    #[test]
    fn test_exclusion_applies_across_use_statements() {
        let builder = build(&format!(
            "{TWO_TRAITS} class C {{ use T1; use T2 {{ T1::m insteadof T2; }} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let t1 = builder.find_type("T1").expect("T1");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.get("m").map(|m| m.declaring_type), Some(t1));
    }

    #[test]
    fn test_precedence_does_not_cover_unnamed_trait() {
        let three = format!("{TWO_TRAITS} trait T3 {{ public function m() {{ return 3; }} }}");
        for uses in ["T1, T2, T3", "T3, T1, T2"] {
            let builder = build(&format!(
                "{three} class C {{ use {uses} {{ T1::m insteadof T2; }} }}"
            ));
            let c = builder.find_type("C").expect("C");
            assert_eq!(
                builder.effective_methods(c).expect_err(uses),
                BuilderError::TraitMethodCollision {
                    method: "m".into(),
                    type_name: "C".into(),
                }
            );
        }

        let builder = build(&format!(
            "{three} class C {{ use T3, T1, T2 {{ T1::m insteadof T2, T3; }} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let t1 = builder.find_type("T1").expect("T1");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.get("m").map(|m| m.declaring_type), Some(t1));
    }

    #[test]
    fn test_concrete_replaces_abstract() {
        let builder = build(
            "<?php
            trait A { abstract public function run(); }
            trait B { public function run() {} }
            class C { use A, B; }
            class D { use B, A; }",
        );
        let b = builder.find_type("B").expect("B");
        for name in ["C", "D"] {
            let id = builder.find_type(name).expect(name);
            let table = builder.effective_methods(id).expect("methods");
            let run = table.get("run").expect("run");
            assert_eq!(run.declaring_type, b);
            assert!(!run.is_abstract());
        }
    }

    #[test]
    fn test_own_methods_win_over_traits() {
        let builder = build(&format!(
            "{TWO_TRAITS} class C {{ use T1, T2; public function m() {{}} }}"
        ));
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("own method hides the collision");
        assert_eq!(table.get("m").map(|m| m.origin), Some(MethodOrigin::Declared));

        let builder = build(
            "<?php trait T { public function m() {} } class C { use T; private function m() {} }",
        );
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("methods");
        let m = table.get("m").expect("m");
        assert_eq!(m.origin, MethodOrigin::Declared);
        assert!(m.modifiers.is_private());
    }

    #[test]
    fn test_nested_traits_are_transitive() {
        let builder = build(
            "<?php
            trait Inner { public function inner() {} }
            trait Outer { use Inner; public function outer() {} }
            class C { use Outer; }",
        );
        let c = builder.find_type("C").expect("C");
        let outer = builder.find_type("Outer").expect("Outer");
        let inner = builder.find_type("Inner").expect("Inner");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.names(), vec!["inner", "outer"]);
        let imported = table.get("inner").expect("inner");
        assert_eq!(imported.declaring_type, inner);
        assert_eq!(imported.origin, MethodOrigin::Trait(outer));
    }

    #[test]
    fn test_diamond_import_is_not_a_collision() {
        let builder = build(
            "<?php
            trait Base { public function shared() {} }
            trait Left { use Base; }
            trait Right { use Base; }
            class C { use Left, Right; }",
        );
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.names(), vec!["shared"]);
    }

    #[test]
    fn test_unknown_trait_is_ignored() {
        let builder = build("<?php class C { use Missing; public function f() {} }");
        let c = builder.find_type("C").expect("C");
        let table = builder.effective_methods(c).expect("methods");
        assert_eq!(table.names(), vec!["f"]);
    }
}
