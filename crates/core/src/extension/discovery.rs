//! The one place that inspects class structure for extension handling:
//! which marked classes exist, what they are assignable to, and how they
//! are constructed.

use super::scanner::ArtifactIndexScanner;
use crate::loader::{ClassLoader, LoadedClass};
use codestore_api::{ConstructorKind, ExtensionInstantiationError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::trace;

const CONSTRUCTOR: &str = "<init>";
const FACTORY: &str = "get";

/// Scan for marked classes and define each one through `loader`.
pub fn discover(
    scanner: &ArtifactIndexScanner,
    loader: &dyn ClassLoader,
) -> Result<Vec<Arc<LoadedClass>>, ExtensionInstantiationError> {
    let outcome = scanner.scan()?;
    outcome
        .matches
        .iter()
        .map(|name| loader.load_class(name).map_err(Into::into))
        .collect()
}

/// Whether `class` is `target` or inherits from it through super classes or
/// interfaces. Supertypes no loader knows contribute nothing; any other
/// resolution failure is returned.
pub fn is_assignable(
    class: &LoadedClass,
    target: &str,
    loader: &dyn ClassLoader,
) -> Result<bool, ExtensionInstantiationError> {
    if class.name() == target {
        return Ok(true);
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = supertypes(class).collect();

    while let Some(name) = queue.pop_front() {
        if name == target {
            return Ok(true);
        }
        if !seen.insert(name.clone()) {
            continue;
        }
        match loader.load_class(&name) {
            Ok(parent) => queue.extend(supertypes(&parent)),
            Err(e) if e.is_not_found() => {
                trace!("supertype {} of {} not found", name, class.name());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(false)
}

fn supertypes(class: &LoadedClass) -> impl Iterator<Item = String> + '_ {
    class
        .super_name()
        .into_iter()
        .chain(class.interfaces().iter().map(String::as_str))
        .map(str::to_string)
}

/// How `class` is instantiated: a public no-arg constructor wins over a
/// public static no-arg `get`.
pub fn constructor_kind(class: &LoadedClass) -> Result<ConstructorKind, ExtensionInstantiationError> {
    let no_constructor = || ExtensionInstantiationError::NoConstructor {
        class: class.name().to_string(),
    };
    if class.is_interface() {
        return Err(no_constructor());
    }

    let methods = class.methods();
    let has_default = !class.is_abstract()
        && methods.iter().any(|m| {
            m.name == CONSTRUCTOR && m.descriptor == "()V" && m.is_public() && !m.is_static()
        });
    if has_default {
        return Ok(ConstructorKind::Default);
    }

    let has_factory = methods.iter().any(|m| {
        m.name == FACTORY
            && m.takes_no_arguments()
            && !m.descriptor.ends_with(")V")
            && m.is_public()
            && m.is_static()
    });
    if has_factory {
        Ok(ConstructorKind::Factory)
    } else {
        Err(no_constructor())
    }
}
