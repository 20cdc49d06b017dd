//! Naming rules shared by the compile pass, the loader and the scanner.
//!
//! Three spellings of the same class are in play:
//! - dotted binary names (`a.b.Foo$Inner`), the repository key
//! - internal names (`a/b/Foo$Inner`), as written inside classfiles
//! - virtual paths (`/a/b/Foo.java`), opaque identifiers handed to a compiler

use crate::compiler::FileKind;

/// Separator between an outer class and its nested/anonymous members.
pub const NESTED_SEPARATOR: char = '$';

/// Scheme of the synthetic URIs given to compilation units.
pub const VIRTUAL_SCHEME: &str = "memory://";

/// Strip every nested-class suffix: `a.Foo$Inner$1` -> `a.Foo`.
///
/// Only the simple-name segment is inspected, so a `$` inside a package
/// segment is kept.
pub fn outer_class_name(binary_name: &str) -> &str {
    let simple_start = binary_name.rfind('.').map(|i| i + 1).unwrap_or(0);
    match binary_name[simple_start..].find(NESTED_SEPARATOR) {
        Some(0) | None => binary_name,
        Some(idx) => &binary_name[..simple_start + idx],
    }
}

pub fn is_nested(binary_name: &str) -> bool {
    outer_class_name(binary_name).len() != binary_name.len()
}

/// Package part of a dotted name, empty for the default package.
pub fn package_of(name: &str) -> &str {
    name.rfind('.').map(|i| &name[..i]).unwrap_or("")
}

pub fn simple_name(name: &str) -> &str {
    name.rfind('.').map(|i| &name[i + 1..]).unwrap_or(name)
}

/// Whether `name` lives in `package` (directly, or below it when `recurse`).
pub fn in_package(name: &str, package: &str, recurse: bool) -> bool {
    let own = package_of(name);
    if package.is_empty() {
        return recurse || own.is_empty();
    }
    if own == package {
        return true;
    }
    recurse && own.len() > package.len() && own.starts_with(package) && {
        own.as_bytes()[package.len()] == b'.'
    }
}

pub fn to_internal_name(binary_name: &str) -> String {
    binary_name.replace('.', "/")
}

pub fn from_internal_name(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// Field descriptor of a class type: `a.Foo` -> `La/Foo;`.
pub fn type_descriptor(binary_name: &str) -> String {
    format!("L{};", to_internal_name(binary_name))
}

/// Inverse of [`type_descriptor`]; `None` for primitives and arrays.
pub fn from_type_descriptor(descriptor: &str) -> Option<String> {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .map(from_internal_name)
}

/// `a.b.Foo` + `Source` -> `/a/b/Foo.java`
pub fn to_virtual_path(name: &str, kind: FileKind) -> String {
    format!("/{}{}", to_internal_name(name), kind.extension())
}

/// `/a/b/Foo.java` -> (`a.b.Foo`, `Source`)
pub fn from_virtual_path(path: &str) -> Option<(String, FileKind)> {
    let path = path.strip_prefix('/')?;
    let kind = FileKind::from_path(path)?;
    let stem = &path[..path.len() - kind.extension().len()];
    if stem.is_empty() {
        return None;
    }
    Some((from_internal_name(stem), kind))
}

/// Synthetic URI for a compilation unit, e.g. `memory:///a/b/Foo.java`.
pub fn to_virtual_uri(name: &str, kind: FileKind) -> String {
    format!("{}{}", VIRTUAL_SCHEME, to_virtual_path(name, kind))
}

/// Normalise a resource request (`a/Foo.class`, `/a/Foo.class`, `a.Foo`) to a
/// dotted class name.
pub fn resource_to_class_name(resource: &str) -> String {
    let trimmed = resource.trim_start_matches('/');
    match trimmed.strip_suffix(FileKind::Class.extension()) {
        Some(stem) => from_internal_name(stem),
        None => trimmed.to_string(),
    }
}
