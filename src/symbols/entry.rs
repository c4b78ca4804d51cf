use serde::{Deserialize, Serialize};

/// Separator between scope components of a qualified name.
pub const SCOPE_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file_path: String,
    pub line: u32,
}

impl Location {
    pub fn new(file_path: impl Into<String>, line: u32) -> Self {
        Self {
            file_path: file_path.into(),
            line,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim() {
            "public" => Some(Access::Public),
            "protected" => Some(Access::Protected),
            "private" => Some(Access::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructKeyword {
    Class,
    Struct,
    Union,
}

impl StructKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructKeyword::Class => "class",
            StructKeyword::Struct => "struct",
            StructKeyword::Union => "union",
        }
    }

    /// Access applied to members and bases written without a specifier.
    pub fn default_access(&self) -> Access {
        match self {
            StructKeyword::Class => Access::Private,
            StructKeyword::Struct | StructKeyword::Union => Access::Public,
        }
    }
}

/// Resolution state of a declared base class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "key", rename_all = "snake_case")]
pub enum BaseLink {
    Unresolved,
    Resolved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRef {
    /// Base name as written in the declaration
    pub name: String,
    pub access: Access,
    pub is_virtual: bool,
    pub link: BaseLink,
}

impl BaseRef {
    pub fn new(name: impl Into<String>, access: Access, is_virtual: bool) -> Self {
        Self {
            name: name.into(),
            access,
            is_virtual,
            link: BaseLink::Unresolved,
        }
    }

    pub fn resolved(&self) -> Option<&str> {
        match &self.link {
            BaseLink::Resolved(key) => Some(key),
            BaseLink::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructInfo {
    pub keyword: StructKeyword,
    pub bases: Vec<BaseRef>,
    /// Keys of structs naming this one as a base; filled by the hierarchy fixup
    pub derived: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub return_type: Option<String>,
    /// Parameter types as they appear in the key, e.g. `(int, const char*)`
    pub parameters: String,
    /// Declarator text as written, e.g. `log(const std::string& msg) const`
    pub signature: String,
    pub is_virtual: bool,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Namespace,
    Struct(StructInfo),
    Function(FunctionInfo),
    Variable { type_name: String },
    Enum { values: Vec<String> },
    Typedef { target: String },
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Namespace => "namespace",
            EntryKind::Struct(info) => info.keyword.as_str(),
            EntryKind::Function(_) => "function",
            EntryKind::Variable { .. } => "variable",
            EntryKind::Enum { .. } => "enum",
            EntryKind::Typedef { .. } => "typedef",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub qualified_name: String,
    /// Key of the enclosing namespace or struct, `None` at global scope
    pub scope: Option<String>,
    pub location: Location,
    pub doc: Option<String>,
    pub access: Option<Access>,
    /// Declaration without definition (`class A;`, a function prototype)
    pub forward: bool,
    /// Keys of entries declared inside this one
    pub members: Vec<String>,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl SymbolEntry {
    pub fn new(
        name: impl Into<String>,
        scope: Option<&str>,
        location: Location,
        kind: EntryKind,
    ) -> Self {
        let name = name.into();
        let qualified_name = qualify(scope, &name);
        Self {
            name,
            qualified_name,
            scope: scope.map(String::from),
            location,
            doc: None,
            access: None,
            forward: false,
            members: Vec::new(),
            kind,
        }
    }

    pub fn with_doc(mut self, doc: Option<String>) -> Self {
        self.doc = doc;
        self
    }

    pub fn with_access(mut self, access: Option<Access>) -> Self {
        self.access = access;
        self
    }

    pub fn forward(mut self, forward: bool) -> Self {
        self.forward = forward;
        self
    }

    /// Table key: the qualified name, plus the parameter types for functions.
    pub fn key(&self) -> String {
        match &self.kind {
            EntryKind::Function(info) => format!("{}{}", self.qualified_name, info.parameters),
            _ => self.qualified_name.clone(),
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, EntryKind::Struct(_))
    }

    pub fn is_scope(&self) -> bool {
        matches!(self.kind, EntryKind::Namespace | EntryKind::Struct(_))
    }

    pub fn struct_info(&self) -> Option<&StructInfo> {
        match &self.kind {
            EntryKind::Struct(info) => Some(info),
            _ => None,
        }
    }

    pub fn struct_info_mut(&mut self) -> Option<&mut StructInfo> {
        match &mut self.kind {
            EntryKind::Struct(info) => Some(info),
            _ => None,
        }
    }

    /// Takes over what only the earlier forward declaration knew.
    pub(crate) fn absorb_forward(&mut self, forward: SymbolEntry) {
        if self.doc.is_none() {
            self.doc = forward.doc;
        }
        for member in forward.members {
            if !self.members.contains(&member) {
                self.members.push(member);
            }
        }
    }
}

/// Joins a scope and a name into a qualified name.
pub fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) if !scope.is_empty() => format!("{}{}{}", scope, SCOPE_SEPARATOR, name),
        _ => name.to_string(),
    }
}

/// Enclosing scope of a qualified name: `a::b::C` gives `a::b`.
pub fn parent_scope(qualified_name: &str) -> Option<&str> {
    qualified_name
        .rfind(SCOPE_SEPARATOR)
        .map(|pos| &qualified_name[..pos])
        .filter(|scope| !scope.is_empty())
}
