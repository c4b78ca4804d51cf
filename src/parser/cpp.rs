//! Declaration extraction from preprocessed C++ using tree-sitter
//!
//! Only declarations are recorded; function bodies are never entered. Scopes
//! (namespaces and classes) become entries whose `members` list the keys of
//! what they contain.

use std::io::Read;
use std::path::Path;

use tree_sitter::Node;

use crate::config::Config;
use crate::error::{DocError, Result};
use crate::parser::line_map::LineMap;
use crate::parser::SourceParser;
use crate::symbols::{
    qualify, Access, BaseRef, EntryKind, FunctionInfo, Location, MergeOutcome, StructInfo,
    StructKeyword, SymbolEntry, SymbolTable, SCOPE_SEPARATOR,
};

pub const STRICT_KEY: &str = "cppdoc.parser.strict";

/// Parser backed by tree-sitter-cpp.
///
/// In strict mode a file whose syntax tree contains errors is rejected as a
/// whole; otherwise the error is logged and every declaration that parsed is kept.
#[derive(Debug, Clone, Default)]
pub struct CppParser {
    strict: bool,
}

impl CppParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new().strict(config.get_bool(STRICT_KEY)?.unwrap_or(false)))
    }
}

impl SourceParser for CppParser {
    fn parse(
        &mut self,
        table: &mut SymbolTable,
        file_name: &Path,
        stream: &mut dyn Read,
    ) -> Result<()> {
        let file = file_name.display().to_string();
        let parse_error = |message: String| DocError::Parse {
            file: file.clone(),
            message,
        };

        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        let text = String::from_utf8_lossy(&bytes);
        let (source, lines) = LineMap::strip(&text);

        let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| parse_error(e.to_string()))?;
        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| parse_error("parser produced no syntax tree".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let (origin, line) = first_error(root)
                .map(|node| lines.resolve(node.start_position().row, &file))
                .unwrap_or_else(|| (file.clone(), 0));
            if self.strict {
                return Err(parse_error(format!("syntax error at {}:{}", origin, line)));
            }
            tracing::warn!("Syntax error at {}:{}, keeping what parsed", origin, line);
        }

        let mut extractor = Extractor {
            source: source.as_bytes(),
            lines: &lines,
            file: &file,
            table,
        };
        extractor.visit_children(root, &Context::default());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct Context {
    scope: Option<String>,
    keyword: Option<StructKeyword>,
    access: Option<Access>,
}

impl Context {
    fn namespace(qualified_name: String) -> Self {
        Self {
            scope: Some(qualified_name),
            keyword: None,
            access: None,
        }
    }

    fn class(qualified_name: String, keyword: StructKeyword) -> Self {
        Self {
            scope: Some(qualified_name),
            keyword: Some(keyword),
            access: Some(keyword.default_access()),
        }
    }
}

struct Extractor<'a> {
    source: &'a [u8],
    lines: &'a LineMap,
    file: &'a str,
    table: &'a mut SymbolTable,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn location(&self, node: Node<'_>) -> Location {
        let (file, line) = self.lines.resolve(node.start_position().row, self.file);
        Location::new(file, line)
    }

    fn visit_children(&mut self, node: Node<'_>, ctx: &Context) {
        let mut ctx = ctx.clone();
        for child in named_children(node) {
            if child.kind() == "access_specifier" {
                ctx.access = Access::from_keyword(self.text(child)).or(ctx.access);
                continue;
            }
            self.visit(child, &ctx);
        }
    }

    fn visit(&mut self, node: Node<'_>, ctx: &Context) {
        match node.kind() {
            "namespace_definition" => self.namespace(node, ctx),
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                self.class(node, ctx, None);
            }
            "enum_specifier" => self.enumeration(node, ctx, None),
            "function_definition" => self.function_definition(node, ctx),
            "declaration" | "field_declaration" => self.declaration(node, ctx),
            "type_definition" => self.type_definition(node, ctx),
            "alias_declaration" => self.alias(node, ctx),
            "template_declaration" => {
                for child in named_children(node) {
                    if child.kind() != "template_parameter_list" {
                        self.visit(child, ctx);
                    }
                }
            }
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.visit_children(body, ctx);
                    } else {
                        self.visit(body, ctx);
                    }
                }
            }
            "preproc_if" | "preproc_ifdef" | "preproc_else" | "preproc_elif" | "preproc_elifdef" => {
                self.visit_children(node, ctx);
            }
            _ => {}
        }
    }

    /// Merges `entry` and links it into its scope. Returns the outcome and the key.
    fn add(&mut self, entry: SymbolEntry) -> (MergeOutcome, String) {
        let key = entry.key();
        let scope = entry.scope.clone();
        let is_namespace = matches!(entry.kind, EntryKind::Namespace);
        let outcome = self.table.merge(entry);

        match outcome {
            MergeOutcome::Inserted => {
                if let Some(scope) = scope {
                    self.table.add_member(&scope, &key);
                }
            }
            MergeOutcome::Conflict if !is_namespace => {
                tracing::debug!("Keeping first full declaration of {}", key);
            }
            _ => {}
        }
        (outcome, key)
    }

    fn namespace(&mut self, node: Node<'_>, ctx: &Context) {
        let body = match node.child_by_field_name("body") {
            Some(body) => body,
            None => return,
        };

        let name = match node.child_by_field_name("name") {
            Some(name) => self.text(name),
            // Anonymous namespaces do not introduce a documented scope.
            None => return self.visit_children(body, ctx),
        };

        let doc = self.doc_comment(node);
        let mut scope = ctx.scope.clone();
        for segment in name.split(SCOPE_SEPARATOR).map(str::trim).filter(|s| !s.is_empty()) {
            let entry = SymbolEntry::new(segment, scope.as_deref(), self.location(node), EntryKind::Namespace)
                .with_doc(doc.clone());
            let (_, key) = self.add(entry);
            scope = Some(key);
        }

        match scope {
            Some(scope) => self.visit_children(body, &Context::namespace(scope)),
            None => self.visit_children(body, ctx),
        }
    }

    /// Records a class, struct or union. `typedef_name` names an anonymous
    /// struct introduced by `typedef struct { ... } Name;`.
    fn class(&mut self, node: Node<'_>, ctx: &Context, typedef_name: Option<&str>) {
        let keyword = match node.kind() {
            "class_specifier" => StructKeyword::Class,
            "union_specifier" => StructKeyword::Union,
            _ => StructKeyword::Struct,
        };
        let body = node.child_by_field_name("body");

        let written = match node.child_by_field_name("name") {
            Some(name) => self.text(name),
            None => match typedef_name {
                Some(name) => name,
                None => return,
            },
        };
        let (scope, name) = split_declarator_name(ctx.scope.as_deref(), written);

        let bases = self.bases(node, keyword);
        let doc = self.doc_comment(doc_anchor(node)).or_else(|| self.inner_doc_comment(node, body));

        let entry = SymbolEntry::new(
            name,
            scope.as_deref(),
            self.location(node),
            EntryKind::Struct(StructInfo {
                keyword,
                bases,
                derived: Vec::new(),
            }),
        )
        .with_doc(doc)
        .with_access(ctx.keyword.and(ctx.access))
        .forward(body.is_none());

        let (outcome, key) = self.add(entry);
        if outcome == MergeOutcome::Conflict {
            return;
        }
        if let Some(body) = body {
            self.visit_children(body, &Context::class(key, keyword));
        }
    }

    fn bases(&self, node: Node<'_>, keyword: StructKeyword) -> Vec<BaseRef> {
        let clause = match named_children(node)
            .into_iter()
            .find(|child| child.kind() == "base_class_clause")
        {
            Some(clause) => clause,
            None => return Vec::new(),
        };

        let mut bases = Vec::new();
        let mut access = None;
        let mut is_virtual = false;
        for child in all_children(clause) {
            match child.kind() {
                "access_specifier" => access = Access::from_keyword(self.text(child)),
                "virtual" => is_virtual = true,
                "type_identifier" | "qualified_identifier" | "template_type" => {
                    bases.push(BaseRef::new(
                        normalize_whitespace(self.text(child)),
                        access.unwrap_or_else(|| keyword.default_access()),
                        is_virtual,
                    ));
                    access = None;
                    is_virtual = false;
                }
                _ => {}
            }
        }
        bases
    }

    fn enumeration(&mut self, node: Node<'_>, ctx: &Context, typedef_name: Option<&str>) {
        let written = match node.child_by_field_name("name").map(|n| self.text(n)).or(typedef_name) {
            Some(name) => name,
            None => return,
        };
        let (scope, name) = split_declarator_name(ctx.scope.as_deref(), written);
        let body = node.child_by_field_name("body");

        let values = body
            .map(|body| {
                named_children(body)
                    .into_iter()
                    .filter(|child| child.kind() == "enumerator")
                    .filter_map(|child| child.child_by_field_name("name"))
                    .map(|name| self.text(name).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let entry = SymbolEntry::new(name, scope.as_deref(), self.location(node), EntryKind::Enum { values })
            .with_doc(self.doc_comment(doc_anchor(node)))
            .with_access(ctx.keyword.and(ctx.access))
            .forward(body.is_none());
        self.add(entry);
    }

    fn function_definition(&mut self, node: Node<'_>, ctx: &Context) {
        if let Some(declarator) = node.child_by_field_name("declarator") {
            self.function(node, declarator, ctx, false);
        }
    }

    /// Records a function from the declaration `decl` whose declarator is `declarator`.
    fn function(&mut self, decl: Node<'_>, declarator: Node<'_>, ctx: &Context, forward: bool) {
        let mut indirection = String::new();
        let mut current = declarator;
        while current.kind() != "function_declarator" {
            match current.kind() {
                "pointer_declarator" => indirection.push('*'),
                "reference_declarator" => {
                    indirection.push_str(first_token(current).map(|t| self.text(t)).unwrap_or("&"))
                }
                _ => {}
            }
            current = match inner_declarator(current) {
                Some(inner) => inner,
                None => return,
            };
        }
        let function_declarator = current;

        let written = match function_declarator.child_by_field_name("declarator") {
            Some(name) => normalize_whitespace(self.text(name)),
            None => return,
        };
        let (scope, name) = split_declarator_name(ctx.scope.as_deref(), &written);

        let parameters = function_declarator
            .child_by_field_name("parameters")
            .map(|params| self.parameter_key(params, function_declarator))
            .unwrap_or_else(|| "()".to_string());

        let return_type = decl
            .child_by_field_name("type")
            .map(|ty| format!("{}{}", self.declared_type(decl, ty), indirection));

        let (is_virtual, is_static) = self.modifiers(decl);
        let info = FunctionInfo {
            return_type,
            parameters,
            signature: normalize_whitespace(self.text(function_declarator)),
            is_virtual,
            is_static,
        };

        let entry = SymbolEntry::new(name, scope.as_deref(), self.location(decl), EntryKind::Function(info))
            .with_doc(self.doc_comment(doc_anchor(decl)))
            .with_access(ctx.keyword.and(ctx.access))
            .forward(forward);
        self.add(entry);
    }

    /// `(const std::string&, int)` with parameter names and default values removed.
    fn parameter_key(&self, params: Node<'_>, function_declarator: Node<'_>) -> String {
        let mut types = Vec::new();
        for param in named_children(params) {
            match param.kind() {
                "parameter_declaration" | "optional_parameter_declaration" => {
                    let ty = param
                        .child_by_field_name("type")
                        .map(|ty| self.declared_type(param, ty))
                        .unwrap_or_default();
                    let shape = param
                        .child_by_field_name("declarator")
                        .map(|d| self.abstract_declarator(d))
                        .unwrap_or_default();
                    types.push(join_type(&ty, &shape));
                }
                "variadic_parameter_declaration" | "variadic_parameter" => {
                    types.push(normalize_whitespace(self.text(param)));
                }
                "comment" => {}
                _ => types.push(normalize_whitespace(self.text(param))),
            }
        }
        if types.len() == 1 && types[0] == "void" {
            types.clear();
        }

        let mut key = format!("({})", types.join(", "));
        for qualifier in named_children(function_declarator) {
            if matches!(qualifier.kind(), "type_qualifier" | "ref_qualifier") {
                key.push(' ');
                key.push_str(self.text(qualifier));
            }
        }
        key
    }

    /// Declarator text with the declared name cut out: `*const p[4]` gives `*const [4]`.
    fn abstract_declarator(&self, declarator: Node<'_>) -> String {
        match innermost_name(declarator) {
            Some(name) => {
                let text = self.text(declarator);
                let start = name.start_byte().saturating_sub(declarator.start_byte());
                let end = name.end_byte().saturating_sub(declarator.start_byte());
                match (text.get(..start), text.get(end..)) {
                    (Some(before), Some(after)) => normalize_whitespace(&format!("{}{}", before, after)),
                    _ => String::new(),
                }
            }
            None => normalize_whitespace(self.text(declarator)),
        }
    }

    /// Qualifiers written before the type plus the type itself, e.g. `const std::string`.
    fn declared_type(&self, decl: Node<'_>, ty: Node<'_>) -> String {
        let mut parts: Vec<String> = named_children(decl)
            .into_iter()
            .filter(|child| child.kind() == "type_qualifier" && child.start_byte() < ty.start_byte())
            .map(|child| self.text(child).to_string())
            .collect();
        parts.push(self.type_display(ty));
        parts.join(" ")
    }

    fn type_display(&self, ty: Node<'_>) -> String {
        let keyword = match ty.kind() {
            "class_specifier" => "class",
            "struct_specifier" => "struct",
            "union_specifier" => "union",
            "enum_specifier" => "enum",
            _ => return normalize_whitespace(self.text(ty)),
        };
        match ty.child_by_field_name("name") {
            Some(name) => format!("{} {}", keyword, self.text(name)),
            None => format!("{} {{...}}", keyword),
        }
    }

    fn modifiers(&self, decl: Node<'_>) -> (bool, bool) {
        let mut is_virtual = false;
        let mut is_static = false;
        for child in all_children(decl) {
            match child.kind() {
                "virtual" | "virtual_function_specifier" => is_virtual = true,
                "storage_class_specifier" if self.text(child) == "static" => is_static = true,
                _ => {}
            }
        }
        (is_virtual, is_static)
    }

    fn is_extern(&self, decl: Node<'_>) -> bool {
        named_children(decl)
            .into_iter()
            .any(|child| child.kind() == "storage_class_specifier" && self.text(child) == "extern")
    }

    fn declaration(&mut self, node: Node<'_>, ctx: &Context) {
        let ty = node.child_by_field_name("type");
        if let Some(ty) = ty {
            match ty.kind() {
                "class_specifier" | "struct_specifier" | "union_specifier" => self.class(ty, ctx, None),
                "enum_specifier" => self.enumeration(ty, ctx, None),
                _ => {}
            }
        }

        for declarator in children_by_field(node, "declarator") {
            let declarator = match declarator.kind() {
                "init_declarator" => match declarator.child_by_field_name("declarator") {
                    Some(inner) => inner,
                    None => continue,
                },
                _ => declarator,
            };

            if contains_function_declarator(declarator) {
                self.function(node, declarator, ctx, true);
            } else {
                self.variable(node, ty, declarator, ctx);
            }
        }
    }

    fn variable(&mut self, decl: Node<'_>, ty: Option<Node<'_>>, declarator: Node<'_>, ctx: &Context) {
        let name_node = match innermost_name(declarator) {
            Some(name) => name,
            None => return,
        };
        let written = normalize_whitespace(self.text(name_node));
        let (scope, name) = split_declarator_name(ctx.scope.as_deref(), &written);

        let type_name = join_type(
            &ty.map(|ty| self.declared_type(decl, ty)).unwrap_or_default(),
            &self.abstract_declarator(declarator),
        );

        let entry = SymbolEntry::new(name, scope.as_deref(), self.location(decl), EntryKind::Variable { type_name })
            .with_doc(self.doc_comment(doc_anchor(decl)))
            .with_access(ctx.keyword.and(ctx.access))
            .forward(self.is_extern(decl));
        self.add(entry);
    }

    fn type_definition(&mut self, node: Node<'_>, ctx: &Context) {
        let ty = match node.child_by_field_name("type") {
            Some(ty) => ty,
            None => return,
        };
        let declarators = children_by_field(node, "declarator");

        let is_specifier = matches!(
            ty.kind(),
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
        );
        if is_specifier && ty.child_by_field_name("body").is_some() {
            let anonymous = ty.child_by_field_name("name").is_none();
            let plain_name = declarators
                .first()
                .filter(|d| d.kind() == "type_identifier")
                .map(|d| self.text(*d));

            if anonymous {
                // `typedef struct { ... } Name;` names the struct itself.
                if let Some(name) = plain_name {
                    if ty.kind() == "enum_specifier" {
                        self.enumeration(ty, ctx, Some(name));
                    } else {
                        self.class(ty, ctx, Some(name));
                    }
                    return;
                }
            } else if ty.kind() == "enum_specifier" {
                self.enumeration(ty, ctx, None);
            } else {
                self.class(ty, ctx, None);
            }
        }

        let target_type = self.declared_type(node, ty);
        for declarator in declarators {
            let name_node = match innermost_name(declarator) {
                Some(name) => name,
                None => continue,
            };
            let (scope, name) = split_declarator_name(ctx.scope.as_deref(), self.text(name_node));
            let target = join_type(&target_type, &self.abstract_declarator(declarator));

            let entry = SymbolEntry::new(name, scope.as_deref(), self.location(node), EntryKind::Typedef { target })
                .with_doc(self.doc_comment(doc_anchor(node)))
                .with_access(ctx.keyword.and(ctx.access));
            self.add(entry);
        }
    }

    fn alias(&mut self, node: Node<'_>, ctx: &Context) {
        let (name, ty) = match (node.child_by_field_name("name"), node.child_by_field_name("type")) {
            (Some(name), Some(ty)) => (self.text(name), ty),
            _ => return,
        };
        let target = normalize_whitespace(self.text(ty));
        let entry = SymbolEntry::new(name, ctx.scope.as_deref(), self.location(node), EntryKind::Typedef { target })
            .with_doc(self.doc_comment(doc_anchor(node)))
            .with_access(ctx.keyword.and(ctx.access));
        self.add(entry);
    }

    /// Doc comment directly before `anchor`, or failing that an indented `///`
    /// block directly after it.
    fn doc_comment(&self, anchor: Node<'_>) -> Option<String> {
        let mut before = Vec::new();
        let mut current = anchor;
        while let Some(prev) = current.prev_sibling() {
            if prev.kind() != "comment" || prev.end_position().row + 1 < current.start_position().row {
                break;
            }
            let text = self.text(prev);
            if !is_doc_comment(text) || text.starts_with("///<") {
                break;
            }
            before.push(text);
            current = prev;
        }
        if !before.is_empty() {
            before.reverse();
            return clean_doc(&before);
        }

        let mut after = Vec::new();
        let mut current = anchor;
        while let Some(next) = current.next_sibling() {
            if next.kind() != "comment" || next.start_position().row > current.end_position().row + 1 {
                break;
            }
            let text = self.text(next);
            let same_line = next.start_position().row == anchor.end_position().row;
            let indented = next.start_position().column > anchor.start_position().column;
            if !text.starts_with("///") || !(same_line || indented) {
                break;
            }
            after.push(text);
            current = next;
        }
        clean_doc(&after)
    }

    /// Doc comment written between a class head and its body.
    fn inner_doc_comment(&self, node: Node<'_>, body: Option<Node<'_>>) -> Option<String> {
        let body_start = body?.start_byte();
        let comments: Vec<&str> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "comment" && child.start_byte() < body_start)
            .map(|child| self.text(child))
            .filter(|text| is_doc_comment(text))
            .collect();
        clean_doc(&comments)
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

fn first_token(node: Node<'_>) -> Option<Node<'_>> {
    all_children(node).into_iter().find(|child| !child.is_named())
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    all_children(node)
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

/// Climbs from a specifier to the declaration its comments are attached to.
fn doc_anchor(node: Node<'_>) -> Node<'_> {
    let mut anchor = node;
    while let Some(parent) = anchor.parent() {
        match parent.kind() {
            "template_declaration" | "declaration" | "field_declaration" | "type_definition" => {
                anchor = parent;
            }
            _ => break,
        }
    }
    anchor
}

fn contains_function_declarator(declarator: Node<'_>) -> bool {
    let mut current = declarator;
    loop {
        match current.kind() {
            "function_declarator" => return true,
            "pointer_declarator" | "reference_declarator" => {
                current = match inner_declarator(current) {
                    Some(inner) => inner,
                    None => return false,
                };
            }
            _ => return false,
        }
    }
}

/// The identifier a declarator declares, looking through pointers, arrays and parentheses.
fn innermost_name(declarator: Node<'_>) -> Option<Node<'_>> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "qualified_identifier"
            | "operator_name" | "destructor_name" | "template_function" => return Some(current),
            "parenthesized_declarator" => {
                current = named_children(current).into_iter().next()?;
            }
            _ => current = inner_declarator(current)?,
        }
    }
}

/// Declarator wrapped by `node`. `reference_declarator` has no `declarator`
/// field, its wrapped declarator is its last named child.
fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("declarator")
        .or_else(|| named_children(node).into_iter().last())
}

/// Splits a written name like `Outer::Inner` into the scope it lands in and its last component.
fn split_declarator_name(scope: Option<&str>, written: &str) -> (Option<String>, String) {
    let (absolute, written) = match written.strip_prefix(SCOPE_SEPARATOR) {
        Some(rest) => (true, rest),
        None => (false, written),
    };

    let mut depth = 0i32;
    let mut split = None;
    let bytes = written.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth -= 1,
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    let base_scope = if absolute { None } else { scope };
    match split {
        Some(pos) => {
            let prefix = &written[..pos];
            let name = &written[pos + SCOPE_SEPARATOR.len()..];
            (Some(qualify(base_scope, prefix)), name.to_string())
        }
        None => (base_scope.map(String::from), written.to_string()),
    }
}

fn join_type(ty: &str, shape: &str) -> String {
    if shape.is_empty() {
        ty.to_string()
    } else if ty.is_empty() {
        shape.to_string()
    } else if shape.starts_with(['*', '&', '[']) {
        format!("{}{}", ty, shape)
    } else {
        format!("{} {}", ty, shape)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_doc_comment(text: &str) -> bool {
    (text.starts_with("///") && !text.starts_with("////"))
        || text.starts_with("//!")
        || (text.starts_with("/**") && text != "/**/")
        || text.starts_with("/*!")
}

fn clean_doc(comments: &[&str]) -> Option<String> {
    let mut lines = Vec::new();
    for comment in comments {
        if let Some(block) = comment.strip_prefix("/**").or_else(|| comment.strip_prefix("/*!")) {
            let block = block.strip_suffix("*/").unwrap_or(block);
            for line in block.lines() {
                let line = line.trim();
                let line = line.strip_prefix('*').unwrap_or(line);
                lines.push(line.strip_prefix(' ').unwrap_or(line).trim_end().to_string());
            }
        } else {
            let line = comment.trim_start_matches('/');
            let line = line.strip_prefix('!').unwrap_or(line);
            let line = line.strip_prefix('<').unwrap_or(line);
            lines.push(line.strip_prefix(' ').unwrap_or(line).trim_end().to_string());
        }
    }

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SymbolTable {
        let mut table = SymbolTable::new();
        CppParser::new()
            .parse(&mut table, Path::new("test.h"), &mut source.as_bytes())
            .unwrap();
        table
    }

    #[test]
    fn test_namespaces_and_classes() {
        let table = parse(
            r#"
namespace Poco {
namespace Net {

class Socket
{
public:
    void close();
};

} }
"#,
        );

        assert!(matches!(table.get("Poco").unwrap().kind, EntryKind::Namespace));
        assert_eq!(table.get("Poco").unwrap().members, vec!["Poco::Net"]);
        assert_eq!(table.get("Poco::Net").unwrap().members, vec!["Poco::Net::Socket"]);

        let socket = table.get("Poco::Net::Socket").unwrap();
        assert!(!socket.forward);
        assert_eq!(socket.scope.as_deref(), Some("Poco::Net"));
        assert_eq!(socket.members, vec!["Poco::Net::Socket::close()"]);

        let close = table.get("Poco::Net::Socket::close()").unwrap();
        assert!(close.forward);
        assert_eq!(close.access, Some(Access::Public));
    }

    #[test]
    fn test_nested_namespace_definition() {
        let table = parse("namespace a::b { struct S {}; }\n");
        assert!(table.contains("a"));
        assert!(table.contains("a::b"));
        assert!(table.contains("a::b::S"));
    }

    #[test]
    fn test_forward_declaration() {
        let table = parse("class Forward;\n");
        let entry = table.get("Forward").unwrap();
        assert!(entry.forward);
        assert!(entry.is_struct());
    }

    #[test]
    fn test_bases_with_access_and_virtual() {
        let table = parse(
            r#"
class Derived: public Base, protected virtual ns::Mixin, Other<int>
{
};
struct Plain: Base {};
"#,
        );

        let info = table.get("Derived").unwrap().struct_info().unwrap().clone();
        let names: Vec<_> = info.bases.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "ns::Mixin", "Other<int>"]);
        assert_eq!(info.bases[0].access, Access::Public);
        assert!(!info.bases[0].is_virtual);
        assert_eq!(info.bases[1].access, Access::Protected);
        assert!(info.bases[1].is_virtual);
        assert_eq!(info.bases[2].access, Access::Private);

        let plain = table.get("Plain").unwrap().struct_info().unwrap().clone();
        assert_eq!(plain.keyword, StructKeyword::Struct);
        assert_eq!(plain.bases[0].access, Access::Public);
    }

    #[test]
    fn test_member_access_tracking() {
        let table = parse(
            r#"
class Widget
{
    int hidden;
public:
    int shown;
protected:
    void helper();
};
"#,
        );

        assert_eq!(table.get("Widget::hidden").unwrap().access, Some(Access::Private));
        assert_eq!(table.get("Widget::shown").unwrap().access, Some(Access::Public));
        assert_eq!(table.get("Widget::helper()").unwrap().access, Some(Access::Protected));
    }

    #[test]
    fn test_function_overloads_have_distinct_keys() {
        let table = parse(
            r#"
namespace io {
void write(int value);
void write(const char* text, int length = 0);
int read() const;
}
"#,
        );

        assert!(table.contains("io::write(int)"));
        assert!(table.contains("io::write(const char*, int)"));
        let write = table.get("io::write(int)").unwrap();
        assert_eq!(write.name, "write");
        assert_eq!(write.qualified_name, "io::write");
    }

    #[test]
    fn test_out_of_line_definition_replaces_declaration() {
        let table = parse(
            r#"
namespace Poco {
class Logger
{
public:
    /// Logs the given message.
    void log(const std::string& msg);
};

void Logger::log(const std::string& text)
{
}
}
"#,
        );

        let log = table.get("Poco::Logger::log(const std::string&)").unwrap();
        assert!(!log.forward);
        assert_eq!(log.doc.as_deref(), Some("Logs the given message."));
        assert_eq!(log.location.line, 10);
        assert_eq!(
            table.get("Poco::Logger").unwrap().members,
            vec!["Poco::Logger::log(const std::string&)"]
        );
    }

    #[test]
    fn test_reference_parameter_names_stay_out_of_keys() {
        let table = parse(
            r#"
class Channel
{
public:
    void open(const std::string& path, int&& flags);
};

void Channel::open(const std::string& name, int&& mode)
{
}
"#,
        );

        let key = "Channel::open(const std::string&, int&&)";
        assert!(!table.get(key).unwrap().forward);
        assert_eq!(table.get("Channel").unwrap().members, vec![key]);
        assert_eq!(table.iter().filter(|(_, e)| e.name == "open").count(), 1);
    }

    #[test]
    fn test_functions_returning_references() {
        let table = parse(
            r#"
class Logger
{
public:
    const std::string& name() const;
    Logger& operator=(const Logger& other);
    void set(int& level);
};
"#,
        );

        let name = table.get("Logger::name() const").unwrap();
        match &name.kind {
            EntryKind::Function(info) => {
                assert_eq!(info.return_type.as_deref(), Some("const std::string&"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(table.contains("Logger::operator=(const Logger&)"));
        assert!(table.contains("Logger::set(int&)"));
        assert_eq!(table.get("Logger").unwrap().members.len(), 3);
    }

    #[test]
    fn test_function_details() {
        let table = parse(
            r#"
struct Channel {
    virtual ~Channel();
    static Channel* create(void);
};
"#,
        );

        let create = table.get("Channel::create()").unwrap();
        match &create.kind {
            EntryKind::Function(info) => {
                assert!(info.is_static);
                assert_eq!(info.return_type.as_deref(), Some("Channel*"));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(table.contains("Channel::~Channel()"));
    }

    #[test]
    fn test_variables_enums_and_typedefs() {
        let table = parse(
            r#"
namespace cfg {
extern const int maxLevel;
int counter = 0;
enum Priority { PRIO_FATAL = 1, PRIO_ERROR };
typedef unsigned long Size;
using Name = std::string;
typedef struct { int x; } Point;
}
"#,
        );

        let max_level = table.get("cfg::maxLevel").unwrap();
        assert!(max_level.forward);
        assert!(matches!(&max_level.kind, EntryKind::Variable { type_name } if type_name == "const int"));
        assert!(!table.get("cfg::counter").unwrap().forward);

        match &table.get("cfg::Priority").unwrap().kind {
            EntryKind::Enum { values } => assert_eq!(values, &vec!["PRIO_FATAL", "PRIO_ERROR"]),
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(matches!(&table.get("cfg::Size").unwrap().kind, EntryKind::Typedef { target } if target == "unsigned long"));
        assert!(matches!(&table.get("cfg::Name").unwrap().kind, EntryKind::Typedef { target } if target == "std::string"));
        assert!(table.get("cfg::Point").unwrap().is_struct());
        assert!(table.contains("cfg::Point::x"));
    }

    #[test]
    fn test_templates_and_linkage_blocks() {
        let table = parse(
            r#"
template <class T>
class Holder
{
public:
    T get() const;
};

extern "C" {
int c_function(int);
}
"#,
        );

        assert!(table.get("Holder").unwrap().is_struct());
        assert!(table.contains("Holder::get() const"));
        assert!(table.contains("c_function(int)"));
    }

    #[test]
    fn test_doc_comment_styles() {
        let table = parse(
            r#"
/// Leading doc
/// spanning two lines.
class Leading {};

class Following
    /// Doc between head and body.
{
public:
    void run();
        /// Runs it.

    /** Block doc. */
    int value;
};

// not documentation
void plain();
"#,
        );

        assert_eq!(table.get("Leading").unwrap().doc.as_deref(), Some("Leading doc\nspanning two lines."));
        assert_eq!(table.get("Following").unwrap().doc.as_deref(), Some("Doc between head and body."));
        assert_eq!(table.get("Following::run()").unwrap().doc.as_deref(), Some("Runs it."));
        assert_eq!(table.get("Following::value").unwrap().doc.as_deref(), Some("Block doc."));
        assert_eq!(table.get("plain()").unwrap().doc, None);
    }

    #[test]
    fn test_line_markers_set_locations() {
        let table = parse(
            "# 1 \"main.cpp\"\n# 1 \"include/Base.h\" 1\n\n\nclass Base {};\n# 2 \"main.cpp\" 2\nint global;\n",
        );

        let base = table.get("Base").unwrap();
        assert_eq!(base.location.file_path, "include/Base.h");
        assert_eq!(base.location.line, 3);

        let global = table.get("global").unwrap();
        assert_eq!(global.location.file_path, "main.cpp");
        assert_eq!(global.location.line, 2);
    }

    #[test]
    fn test_same_header_twice_keeps_first() {
        let mut table = SymbolTable::new();
        let mut parser = CppParser::new();
        let source = "class A { int x; };\n";
        parser.parse(&mut table, Path::new("a.cpp"), &mut source.as_bytes()).unwrap();
        parser.parse(&mut table, Path::new("b.cpp"), &mut source.as_bytes()).unwrap();

        assert_eq!(table.get("A").unwrap().location.file_path, "a.cpp");
        assert_eq!(table.get("A").unwrap().members, vec!["A::x"]);
    }

    #[test]
    fn test_strict_mode_rejects_syntax_errors() {
        let mut table = SymbolTable::new();
        let source = "class Good {};\nclass Broken { int ; ) ;\n";

        let err = CppParser::new()
            .strict(true)
            .parse(&mut table, Path::new("bad.h"), &mut source.as_bytes())
            .unwrap_err();
        assert!(matches!(err, DocError::Parse { .. }));
        assert!(table.is_empty());

        CppParser::new()
            .parse(&mut table, Path::new("bad.h"), &mut source.as_bytes())
            .unwrap();
        assert!(table.contains("Good"));
    }

    #[test]
    fn test_split_declarator_name() {
        assert_eq!(
            split_declarator_name(Some("Poco"), "Logger::log"),
            (Some("Poco::Logger".to_string()), "log".to_string())
        );
        assert_eq!(
            split_declarator_name(Some("Poco"), "::global"),
            (None, "global".to_string())
        );
        assert_eq!(
            split_declarator_name(None, "Map<std::string, int>::find"),
            (Some("Map<std::string, int>".to_string()), "find".to_string())
        );
        assert_eq!(split_declarator_name(None, "f"), (None, "f".to_string()));
    }

    #[test]
    fn test_clean_doc() {
        assert_eq!(clean_doc(&["/// one", "///two"]).as_deref(), Some("one\ntwo"));
        assert_eq!(
            clean_doc(&["/**\n * Block\n * text\n */"]).as_deref(),
            Some("Block\ntext")
        );
        assert_eq!(clean_doc(&["///<  trailing"]).as_deref(), Some(" trailing"));
        assert_eq!(clean_doc(&[]), None);
    }
}
