//! Boundary stub generation.
//!
//! Client boundaries lose their implementation entirely: every export is
//! replaced by a tagged placeholder that throws when called in the origin
//! process. Server boundaries keep their implementation and gain appended
//! registration calls that tag each exported function for dispatch.

use indexmap::{IndexMap, IndexSet};
use oxc_ast::ast::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::client_stub_message;
use crate::extract::export_name_of;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    /// Module specifier the generated code imports the registration entry
    /// points from.
    pub runtime_module: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            runtime_module: "boundary-runtime/server".to_string(),
        }
    }
}

/// JS string literal via JSON encoding.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT BOUNDARY
// ═══════════════════════════════════════════════════════════════════════════════

/// Replace a client-boundary module with one placeholder export per name.
/// Zero exported names produce empty output: the module contributes nothing
/// to the server graph.
pub fn transform_client_module(
    names: &IndexSet<String>,
    module_id: &str,
    options: &TransformOptions,
) -> String {
    if names.is_empty() {
        return String::new();
    }

    let mut out = format!(
        "import {{registerClientReference}} from {};\n",
        js_string(&options.runtime_module)
    );

    for name in names {
        if name == "default" {
            out.push_str("export default ");
        } else {
            out.push_str("export const ");
            out.push_str(name);
            out.push_str(" = ");
        }
        out.push_str("registerClientReference(function() {throw new Error(");
        out.push_str(&js_string(&client_stub_message(module_id, name)));
        out.push_str(");},");
        out.push_str(&js_string(module_id));
        out.push(',');
        out.push_str(&js_string(name));
        out.push_str(");\n");
    }

    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER BOUNDARY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub(crate) struct ServerExports {
    /// Local name to exported name, in declaration order. A local exported
    /// under several names keeps only the last exported name seen; one
    /// registration per local binding is the contract.
    pub locals: IndexMap<String, String>,
    /// Locals statically known to be function declarations; their
    /// registration needs no runtime typeof guard.
    pub functions: HashSet<String>,
}

pub(crate) fn collect_local_export_names(program: &Program) -> ServerExports {
    let mut exports = ServerExports::default();

    for stmt in &program.body {
        match stmt {
            // A bare `export *` does not register anything here; the other
            // module must opt into the server boundary itself.
            Statement::ExportAllDeclaration(_) => {}
            Statement::ExportDefaultDeclaration(decl) => match &decl.declaration {
                ExportDefaultDeclarationKind::Identifier(ident) => {
                    exports
                        .locals
                        .insert(ident.name.to_string(), "default".to_string());
                }
                ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        exports
                            .locals
                            .insert(id.name.to_string(), "default".to_string());
                        exports.functions.insert(id.name.to_string());
                    }
                }
                // An anonymous default expression has no local binding to
                // register.
                _ => {}
            },
            Statement::ExportNamedDeclaration(decl) => {
                if let Some(declaration) = &decl.declaration {
                    match declaration {
                        Declaration::VariableDeclaration(var_decl) => {
                            for declarator in &var_decl.declarations {
                                add_local_binding_names(&mut exports.locals, &declarator.id);
                            }
                        }
                        Declaration::FunctionDeclaration(func) => {
                            if let Some(id) = &func.id {
                                exports
                                    .locals
                                    .insert(id.name.to_string(), id.name.to_string());
                                exports.functions.insert(id.name.to_string());
                            }
                        }
                        Declaration::ClassDeclaration(class) => {
                            if let Some(id) = &class.id {
                                exports
                                    .locals
                                    .insert(id.name.to_string(), id.name.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                // Specifiers with a source re-export another module's
                // bindings; there is no local value to register.
                if decl.source.is_none() {
                    for specifier in &decl.specifiers {
                        if let ModuleExportName::IdentifierReference(local) = &specifier.local {
                            exports
                                .locals
                                .insert(local.name.to_string(), export_name_of(&specifier.exported));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    exports
}

fn add_local_binding_names(locals: &mut IndexMap<String, String>, pattern: &BindingPattern) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            locals.insert(id.name.to_string(), id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                add_local_binding_names(locals, &prop.value);
            }
            if let Some(rest) = &obj.rest {
                add_local_binding_names(locals, &rest.argument);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in &arr.elements {
                if let Some(pattern) = elem {
                    add_local_binding_names(locals, pattern);
                }
            }
            if let Some(rest) = &arr.rest {
                add_local_binding_names(locals, &rest.argument);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            add_local_binding_names(locals, &assign.left);
        }
        _ => {}
    }
}

/// Keep the server module's implementation verbatim and append one
/// registration statement per exported local. Non-function locals are
/// guarded behind a runtime typeof check so plain values stay untouched.
pub(crate) fn render_server_module(
    source: &str,
    exports: &ServerExports,
    module_id: &str,
    options: &TransformOptions,
) -> String {
    if exports.locals.is_empty() {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len() + 256);
    out.push_str(source);
    out.push_str("\n\n;");
    out.push_str(&format!(
        "import {{registerServerReference}} from {};\n",
        js_string(&options.runtime_module)
    ));

    for (local, exported) in &exports.locals {
        if !exports.functions.contains(local) {
            out.push_str("if (typeof ");
            out.push_str(local);
            out.push_str(" === \"function\") ");
        }
        out.push_str("registerServerReference(");
        out.push_str(local);
        out.push(',');
        out.push_str(&js_string(module_id));
        out.push(',');
        out.push_str(&js_string(exported));
        out.push_str(");\n");
    }

    out
}
