use std::any::Any;
use std::fmt;

/// Contract of every discoverable extension instance.
pub trait Extension: Any + Send + Sync {
    /// Ordering key, lower runs first.
    fn weight(&self) -> i32;

    fn as_any(&self) -> &dyn Any;
}

/// How an extension class gets instantiated, read from its classfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructorKind {
    /// Public zero-argument constructor.
    Default,
    /// Public static zero-argument `get` method.
    Factory,
}

impl fmt::Display for ConstructorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorKind::Default => f.write_str("default-constructor"),
            ConstructorKind::Factory => f.write_str("factory"),
        }
    }
}
