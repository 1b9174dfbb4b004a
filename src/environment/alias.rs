//! Command alias expansion.
//!
//! Aliases are looked up scope by scope, starting at the project and then
//! visiting dependencies parents-first in declaration order. Each scope only
//! looks at the current first word, so an alias may expand into another
//! scope's alias:
//!
//! ```toml
//! # project
//! [alias]
//! build = "gw build --offline"
//!
//! # a dependency
//! [alias]
//! gw = "$GRADLE_BINDIR/gradle --no-daemon"
//! ```
//!
//! `bz build -x test` runs `<gradle bin>/gradle --no-daemon build --offline -x test`.

use super::expand;
use crate::resolver::ResolvedDependency;
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Rewrites `argv` through the alias tables of `tree`.
///
/// Alias values follow POSIX shell word rules: variables from `env` are
/// expanded outside single quotes, unquoted expansions are split on
/// whitespace, and quoted ones stay one word. Words after the first in `argv`
/// are never touched.
///
/// # Errors
///
/// Returns an error when an alias value cannot be tokenized, e.g. because of
/// an unbalanced quote.
pub fn resolve_alias(
    tree: &ResolvedDependency,
    env: &BTreeMap<String, String>,
    argv: &[String],
) -> Result<Vec<String>> {
    let mut args = argv.to_vec();

    for scope in tree.iter() {
        let Some(first) = args.first() else {
            break;
        };
        let Some(value) = scope.alias.get(first) else {
            continue;
        };

        let expanded = shell_words::split(&expand_alias_value(value, env))
            .with_context(|| format!("Invalid alias '{first}' in {}: {value}", scope.coord))?;

        tracing::debug!("Alias {} -> {:?}", first, expanded);
        args.splice(0..1, expanded);
    }

    Ok(args)
}

/// Expands variables in `value` outside single quotes, re-escaping the
/// results so that tokenizing yields them literally.
fn expand_alias_value(value: &str, env: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(value.len());
    let mut run = String::new();
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                push_unquoted(&mut out, &mut run, env);
                out.push(c);
                for q in chars.by_ref() {
                    out.push(q);
                    if q == '\'' {
                        break;
                    }
                }
            }
            '"' => {
                push_unquoted(&mut out, &mut run, env);
                out.push(c);
                let mut closed = false;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            push_double_quoted(&mut out, &mut run, env);
                            out.push(q);
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        _ => run.push(q),
                    }
                }
                push_double_quoted(&mut out, &mut run, env);
                if closed {
                    out.push('"');
                }
            }
            '\\' => {
                push_unquoted(&mut out, &mut run, env);
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            _ => run.push(c),
        }
    }
    push_unquoted(&mut out, &mut run, env);

    out
}

fn push_unquoted(out: &mut String, run: &mut String, env: &BTreeMap<String, String>) {
    let expanded = expand(run, env);
    if expanded == *run {
        out.push_str(run);
    } else {
        for c in expanded.chars() {
            if !c.is_whitespace() && !c.is_alphanumeric() && !"-_./:=+,@%".contains(c) {
                out.push('\\');
            }
            out.push(c);
        }
    }
    run.clear();
}

fn push_double_quoted(out: &mut String, run: &mut String, env: &BTreeMap<String, String>) {
    for c in expand(run, env).chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    run.clear();
}
