//! Export name extraction.
//!
//! Walks the top-level statements of a parsed module and collects the set of
//! names it exports, resolving binding-pattern destructuring and following
//! bare `export * from` declarations into the referenced modules through the
//! host's resolution policy. Analysis is best-effort: a branch that fails to
//! resolve or parse is logged and contributes nothing.

use indexmap::IndexSet;
use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::HashSet;
use url::Url;

use crate::errors::{CompilerError, CYCLIC_REEXPORT, PARSE_ERROR, UNRESOLVED_REEXPORT};
use crate::resolve::ModuleHost;

pub(crate) fn module_source_type() -> SourceType {
    SourceType::default().with_module(true).with_jsx(true)
}

#[derive(Debug, Default)]
pub struct Extraction {
    /// Exported names in first-seen order, de-duplicated.
    pub names: IndexSet<String>,
    /// Non-fatal failures encountered along the way.
    pub errors: Vec<CompilerError>,
}

/// Extract the exported names of a module given its source text. The module
/// itself seeds the visited set, so a re-export cycle that leads back here
/// terminates.
pub fn extract_export_names(source: &str, module_url: &Url, host: &dyn ModuleHost) -> Extraction {
    let mut extraction = Extraction::default();

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, module_source_type()).parse();
    if !ret.errors.is_empty() {
        log::error!("failed to parse {}: {} error(s)", module_url, ret.errors.len());
        extraction.errors.push(CompilerError::new(
            PARSE_ERROR,
            "Module source failed to parse",
            module_url.as_str(),
            0,
            0,
        ));
        return extraction;
    }

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(module_url.to_string());

    parse_export_names_into(
        &ret.program,
        &mut extraction.names,
        module_url,
        host,
        &mut visited,
        &mut extraction.errors,
    );

    extraction
}

/// Collect exported names from a parsed module body into `names`. Only
/// top-level statements are considered; boundaries are whole-module concerns.
pub(crate) fn parse_export_names_into(
    program: &Program,
    names: &mut IndexSet<String>,
    parent_url: &Url,
    host: &dyn ModuleHost,
    visited: &mut HashSet<String>,
    errors: &mut Vec<CompilerError>,
) {
    for stmt in &program.body {
        match stmt {
            Statement::ExportAllDeclaration(decl) => {
                if let Some(exported) = &decl.exported {
                    // `export * as ns from 'm'` binds a single namespace name.
                    names.insert(export_name_of(exported));
                } else {
                    follow_reexport(
                        &decl.source.value,
                        names,
                        parent_url,
                        host,
                        visited,
                        errors,
                    );
                }
            }
            Statement::ExportDefaultDeclaration(_) => {
                names.insert("default".to_string());
            }
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(declaration) = &decl.declaration {
                    match declaration {
                        Declaration::VariableDeclaration(var_decl) => {
                            for declarator in &var_decl.declarations {
                                add_binding_names(names, &declarator.id);
                            }
                        }
                        Declaration::FunctionDeclaration(func) => {
                            if let Some(id) = &func.id {
                                names.insert(id.name.to_string());
                            }
                        }
                        Declaration::ClassDeclaration(class) => {
                            if let Some(id) = &class.id {
                                names.insert(id.name.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                for specifier in &decl.specifiers {
                    names.insert(export_name_of(&specifier.exported));
                }
            }
            _ => {}
        }
    }
}

/// Resolve, load, and parse a bare re-export target, then union its exported
/// names. Failures are non-fatal; revisits are skipped.
fn follow_reexport(
    specifier: &str,
    names: &mut IndexSet<String>,
    parent_url: &Url,
    host: &dyn ModuleHost,
    visited: &mut HashSet<String>,
    errors: &mut Vec<CompilerError>,
) {
    let context = parent_url
        .to_file_path()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));
    let Some(context) = context else {
        errors.push(CompilerError::new(
            UNRESOLVED_REEXPORT,
            &format!("No filesystem context for \"{}\"", specifier),
            parent_url.as_str(),
            0,
            0,
        ));
        return;
    };

    let resolved = match host.resolve(&context, specifier) {
        Ok(path) => path,
        Err(e) => {
            log::warn!("cannot resolve re-export \"{}\" from {}: {}", specifier, parent_url, e.message);
            errors.push(e);
            return;
        }
    };

    let Ok(child_url) = Url::from_file_path(&resolved) else {
        errors.push(CompilerError::new(
            UNRESOLVED_REEXPORT,
            "Resolved path has no file URL form",
            &resolved.display().to_string(),
            0,
            0,
        ));
        return;
    };

    if !visited.insert(child_url.to_string()) {
        log::debug!(
            "{}: re-export cycle through {}, revisit contributes no names",
            CYCLIC_REEXPORT,
            child_url
        );
        return;
    }

    let source = match host.load(&resolved) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("cannot load re-export target {}: {}", child_url, e.message);
            errors.push(e);
            return;
        }
    };

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, &source, module_source_type()).parse();
    if !ret.errors.is_empty() {
        log::error!("failed to parse {}: {} error(s)", child_url, ret.errors.len());
        errors.push(CompilerError::new(
            PARSE_ERROR,
            "Re-exported module failed to parse",
            child_url.as_str(),
            0,
            0,
        ));
        return;
    }

    parse_export_names_into(&ret.program, names, &child_url, host, visited, errors);
}

/// Every name bound by a binding pattern, in declaration order. Default
/// values contribute only their target pattern; array holes are skipped.
pub(crate) fn add_binding_names(names: &mut IndexSet<String>, pattern: &BindingPattern) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.insert(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                add_binding_names(names, &prop.value);
            }
            if let Some(rest) = &obj.rest {
                add_binding_names(names, &rest.argument);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in &arr.elements {
                if let Some(pattern) = elem {
                    add_binding_names(names, pattern);
                }
            }
            if let Some(rest) = &arr.rest {
                add_binding_names(names, &rest.argument);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            add_binding_names(names, &assign.left);
        }
        _ => {}
    }
}

pub(crate) fn export_name_of(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
    }
}
