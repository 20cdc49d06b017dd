//! Defined form of a stored classfile.

use codestore_api::ClassResolutionError;
use codestore_api::models::naming;
use ristretto_classfile::attributes::Attribute;
use ristretto_classfile::{ClassAccessFlags, ClassFile, MethodAccessFlags};
use std::io::Cursor;
use std::sync::Arc;

/// Name, descriptor and access flags of one declared method.
#[derive(Debug, Clone)]
pub struct MethodShape {
    pub name: String,
    pub descriptor: String,
    pub access: MethodAccessFlags,
}

impl MethodShape {
    pub fn is_public(&self) -> bool {
        self.access.contains(MethodAccessFlags::PUBLIC)
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    pub fn takes_no_arguments(&self) -> bool {
        self.descriptor.starts_with("()")
    }
}

/// A class defined by a loader: the structural facts read from its classfile
/// plus the bytes it was defined from.
#[derive(Debug, Clone)]
pub struct LoadedClass {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    annotations: Vec<String>,
    methods: Vec<MethodShape>,
    access: ClassAccessFlags,
    bytes: Arc<[u8]>,
}

impl LoadedClass {
    /// Parse `bytes`; `requested` is only used to label errors.
    pub fn parse(requested: &str, bytes: &[u8]) -> Result<Self, ClassResolutionError> {
        let malformed = |reason: String| ClassResolutionError::Malformed {
            name: requested.to_string(),
            reason,
        };

        let class = ClassFile::from_bytes(&mut Cursor::new(bytes.to_vec()))
            .map_err(|e| malformed(format!("{e:?}")))?;

        let name = class_name_at(&class, class.this_class).map_err(&malformed)?;
        let super_name = if class.super_class == 0 {
            None
        } else {
            Some(class_name_at(&class, class.super_class).map_err(&malformed)?)
        };
        let interfaces = class
            .interfaces
            .iter()
            .map(|index| class_name_at(&class, *index))
            .collect::<Result<Vec<_>, _>>()
            .map_err(&malformed)?;

        let mut annotations = Vec::new();
        for attribute in &class.attributes {
            let declared = match attribute {
                Attribute::RuntimeVisibleAnnotations { annotations, .. }
                | Attribute::RuntimeInvisibleAnnotations { annotations, .. } => annotations,
                _ => continue,
            };
            for annotation in declared {
                let descriptor = utf8_at(&class, annotation.type_index).map_err(&malformed)?;
                if let Some(type_name) = naming::from_type_descriptor(&descriptor) {
                    annotations.push(type_name);
                }
            }
        }

        let methods = class
            .methods
            .iter()
            .map(|method| {
                Ok(MethodShape {
                    name: utf8_at(&class, method.name_index)?,
                    descriptor: utf8_at(&class, method.descriptor_index)?,
                    access: method.access_flags,
                })
            })
            .collect::<Result<Vec<_>, String>>()
            .map_err(&malformed)?;

        Ok(Self {
            name,
            super_name,
            interfaces,
            annotations,
            methods,
            access: class.access_flags,
            bytes: Arc::from(bytes),
        })
    }

    /// Dotted binary name, e.g. `a.Foo$Inner`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Dotted names of the annotation types declared on the class.
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn has_annotation(&self, type_name: &str) -> bool {
        self.annotations.iter().any(|a| a == type_name)
    }

    pub fn methods(&self) -> &[MethodShape] {
        &self.methods
    }

    pub fn is_interface(&self) -> bool {
        self.access.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access.contains(ClassAccessFlags::ABSTRACT)
    }

    pub fn is_public(&self) -> bool {
        self.access.contains(ClassAccessFlags::PUBLIC)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn class_name_at(class: &ClassFile, index: u16) -> Result<String, String> {
    class
        .constant_pool
        .try_get_class(index)
        .map(|internal| naming::from_internal_name(internal))
        .map_err(|e| format!("bad class constant #{index}: {e:?}"))
}

fn utf8_at(class: &ClassFile, index: u16) -> Result<String, String> {
    class
        .constant_pool
        .try_get_utf8(index)
        .map(|value| value.to_string())
        .map_err(|e| format!("bad utf8 constant #{index}: {e:?}"))
}
