//! The class-resolution collaborator.
//!
//! The object model lives outside this crate. All the compiler needs from it
//! is a stable answer to "which class does this name denote".

use crate::avm2::multiname::Multiname;
use crate::avm2::namespace::Namespace;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Handle to a class descriptor owned by the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassRef {
    id: u32,
    name: Rc<str>,
}

impl ClassRef {
    pub fn new(id: u32, name: &str) -> Self {
        ClassRef {
            id,
            name: Rc::from(name),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Must return the same answer for the same multiname for the lifetime of a compile.
pub trait ClassResolver {
    fn resolve_class(&self, multiname: &Multiname) -> Option<ClassRef>;
}

/// A flat `(namespace, name) -> class` registry.
///
/// Resolution tries the multiname's namespaces in order, the first
/// registered class wins.
#[derive(Debug, Default, Clone)]
pub struct ClassRegistry {
    classes: FxHashMap<(Box<str>, Box<str>), ClassRef>,
    next_id: u32,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, namespace: &Namespace, name: &str) -> ClassRef {
        let key = (Box::from(namespace.mangled_name()), Box::from(name));

        if let Some(existing) = self.classes.get(&key) {
            return existing.clone();
        }

        let class = ClassRef::new(self.next_id, name);
        self.next_id += 1;
        self.classes.insert(key, class.clone());
        class
    }
}

impl ClassResolver for ClassRegistry {
    fn resolve_class(&self, multiname: &Multiname) -> Option<ClassRef> {
        let name = multiname.name()?;

        multiname.namespaces().iter().find_map(|ns| {
            self.classes
                .get(&(Box::from(ns.mangled_name()), Box::from(name)))
                .cloned()
        })
    }
}
