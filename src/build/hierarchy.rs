//! Class hierarchy fixup
//!
//! Base classes are written by name and may be declared in a file parsed
//! after the class deriving from them, so links are resolved in a separate
//! pass over the complete table.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::symbols::{parent_scope, qualify, Access, BaseLink, SymbolTable, SCOPE_SEPARATOR};

/// Resolves every declared base of every struct entry and records the
/// derived back-references. Running it twice on the same table gives the
/// same result.
pub fn fixup(table: &mut SymbolTable) {
    for (_, entry) in table.iter_mut() {
        if let Some(info) = entry.struct_info_mut() {
            info.derived.clear();
            for base in &mut info.bases {
                base.link = BaseLink::Unresolved;
            }
        }
    }

    let mut links: Vec<(String, usize, String)> = Vec::new();
    let mut unresolved = 0usize;
    for (key, entry) in table.structs() {
        if let Some(info) = entry.struct_info() {
            for (idx, base) in info.bases.iter().enumerate() {
                match resolve_base(table, key, &base.name) {
                    Some(target) => links.push((key.clone(), idx, target)),
                    None => {
                        tracing::debug!("Unresolved base {} of {}", base.name, key);
                        unresolved += 1;
                    }
                }
            }
        }
    }

    let mut derived: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, idx, target) in links {
        if let Some(base) = table
            .get_mut(&key)
            .and_then(|entry| entry.struct_info_mut())
            .and_then(|info| info.bases.get_mut(idx))
        {
            base.link = BaseLink::Resolved(target.clone());
        }
        derived.entry(target).or_default().push(key);
    }

    for (target, mut keys) in derived {
        keys.sort();
        keys.dedup();
        if let Some(info) = table.get_mut(&target).and_then(|entry| entry.struct_info_mut()) {
            info.derived = keys;
        }
    }

    if unresolved > 0 {
        tracing::debug!("{} base classes left unresolved", unresolved);
    }
}

/// Looks `name` up the way it is written inside the struct `from`: in the
/// struct itself, then each enclosing scope outward, then globally.
fn resolve_base(table: &SymbolTable, from: &str, name: &str) -> Option<String> {
    let name = strip_template_args(name);
    let is_struct = |key: &str| key != from && table.get(key).is_some_and(|e| e.is_struct());

    if let Some(absolute) = name.strip_prefix(SCOPE_SEPARATOR) {
        return is_struct(absolute).then(|| absolute.to_string());
    }

    let mut scope = Some(from);
    while let Some(current) = scope {
        let candidate = qualify(Some(current), &name);
        if is_struct(&candidate) {
            return Some(candidate);
        }
        scope = parent_scope(current);
    }

    is_struct(&name).then_some(name)
}

/// `ns::Holder<std::vector<int>>::Inner` becomes `ns::Holder::Inner`.
fn strip_template_args(name: &str) -> String {
    let mut stripped = String::with_capacity(name.len());
    let mut depth = 0usize;
    for c in name.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if depth == 0 && !c.is_whitespace() => stripped.push(c),
            _ => {}
        }
    }
    stripped
}

/// Resolved ancestors of `key`, nearest first. Each appears once even in
/// diamond or cyclic hierarchies.
pub fn ancestors(table: &SymbolTable, key: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::from([key.to_string()]);
    let mut queue: VecDeque<String> = VecDeque::from([key.to_string()]);
    let mut result = Vec::new();

    while let Some(current) = queue.pop_front() {
        let info = match table.get(&current).and_then(|entry| entry.struct_info()) {
            Some(info) => info,
            None => continue,
        };
        for base in &info.bases {
            if let Some(target) = base.resolved() {
                if seen.insert(target.to_string()) {
                    result.push(target.to_string());
                    queue.push_back(target.to_string());
                }
            }
        }
    }
    result
}

/// Keys of non-private members `key` inherits, skipping names that the
/// class itself or a nearer ancestor already declares.
pub fn inherited_members(table: &SymbolTable, key: &str) -> Vec<String> {
    let member_name = |member: &String| table.get(member).map(|entry| entry.name.clone());

    let mut hidden: HashSet<String> = table
        .get(key)
        .map(|entry| entry.members.iter().filter_map(member_name).collect())
        .unwrap_or_default();

    let mut result = Vec::new();
    for ancestor in ancestors(table, key) {
        let entry = match table.get(&ancestor) {
            Some(entry) => entry,
            None => continue,
        };

        let mut declared = Vec::new();
        for member in &entry.members {
            let member_entry = match table.get(member) {
                Some(member_entry) => member_entry,
                None => continue,
            };
            if member_entry.access == Some(Access::Private) || hidden.contains(&member_entry.name) {
                continue;
            }
            // Constructors and destructors are not inherited.
            let bare = member_entry.name.trim_start_matches('~');
            if bare == entry.name {
                continue;
            }
            result.push(member.clone());
            declared.push(member_entry.name.clone());
        }
        hidden.extend(declared);
    }
    result
}
