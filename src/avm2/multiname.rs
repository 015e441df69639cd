//! Multinames and the pool that gives them stable ids.

use crate::avm2::namespace::Namespace;
use crate::settings::MINIMUM_LIKELY_NAMES;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Cache key of a multiname. Only meaningful inside the pool that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MultinameId(u32);

impl MultinameId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for MultinameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MultinameId({})", self.0)
    }
}

/// A name paired with an ordered set of candidate namespaces.
///
/// A `mutable` multiname stands for a name computed at each use (a runtime
/// qualified or late-bound name), so its id must never be used as a cache key.
#[derive(Debug, Clone)]
pub struct Multiname {
    name: Option<Box<str>>,
    namespaces: Vec<Rc<Namespace>>,
    id: MultinameId,
    mutable: bool,
}

impl Multiname {
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn namespaces(&self) -> &[Rc<Namespace>] {
        &self.namespaces
    }

    /// The namespace a declared trait lives under.
    #[inline]
    pub fn primary_namespace(&self) -> Option<&Rc<Namespace>> {
        self.namespaces.first()
    }

    #[inline]
    pub fn id(&self) -> MultinameId {
        self.id
    }

    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn is_qname(&self) -> bool {
        self.namespaces.len() == 1 && !self.mutable
    }

    /// `None` for mutable multinames, they have to be looked up fresh every time.
    pub fn cache_key(&self) -> Option<MultinameId> {
        if self.mutable { None } else { Some(self.id) }
    }

    /// True for a name in the unnamed public namespace, e.g. `int` or `Number`.
    pub fn is_public_top_level(&self, name: &str) -> bool {
        self.is_qname()
            && self.name() == Some(name)
            && self
                .primary_namespace()
                .is_some_and(|ns| ns.is_public() && ns.mangled_name().is_empty())
    }
}

impl PartialEq for Multiname {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.id == other.id
    }
}

impl Eq for Multiname {}

impl fmt::Display for Multiname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name().unwrap_or("*");

        match self.namespaces.as_slice() {
            [] => write!(f, "{}", name),
            [ns] if ns.mangled_name().is_empty() => write!(f, "{}", name),
            [ns] => write!(f, "{}::{}", ns.mangled_name(), name),
            many => {
                let set = many
                    .iter()
                    .map(|ns| ns.mangled_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]::{}", set, name)
            }
        }
    }
}

type InternKey = (Option<Box<str>>, Vec<Rc<Namespace>>);

/// Owns multiname id assignment for one bytecode container.
///
/// Static multinames are interned, so the same `(name, namespaces)` pair
/// always comes back with the same id. Mutable multinames get a fresh id
/// each time and are never interned.
#[derive(Debug, Clone)]
pub struct MultinamePool {
    names: Vec<Rc<Multiname>>,
    name_to_id: FxHashMap<InternKey, MultinameId>,
}

impl MultinamePool {
    pub fn new() -> Self {
        Self {
            names: Vec::with_capacity(MINIMUM_LIKELY_NAMES),
            name_to_id: FxHashMap::default(),
        }
    }

    pub fn intern(&mut self, name: Option<&str>, namespaces: &[Rc<Namespace>]) -> Rc<Multiname> {
        let key: InternKey = (name.map(Box::from), namespaces.to_vec());

        if let Some(existing) = self.name_to_id.get(&key) {
            return Rc::clone(&self.names[existing.0 as usize]);
        }

        let multiname = self.push(name, namespaces, false);
        self.name_to_id.insert(key, multiname.id);
        multiname
    }

    pub fn qname(&mut self, namespace: &Rc<Namespace>, name: &str) -> Rc<Multiname> {
        self.intern(Some(name), std::slice::from_ref(namespace))
    }

    /// A name whose namespace or local part is only known at run time.
    pub fn runtime(&mut self, name: Option<&str>, namespaces: &[Rc<Namespace>]) -> Rc<Multiname> {
        self.push(name, namespaces, true)
    }

    pub fn get(&self, id: MultinameId) -> Option<&Rc<Multiname>> {
        self.names.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[cold]
    fn push(
        &mut self,
        name: Option<&str>,
        namespaces: &[Rc<Namespace>],
        mutable: bool,
    ) -> Rc<Multiname> {
        let id = MultinameId(self.names.len() as u32);
        let multiname = Rc::new(Multiname {
            name: name.map(Box::from),
            namespaces: namespaces.to_vec(),
            id,
            mutable,
        });

        self.names.push(Rc::clone(&multiname));
        multiname
    }
}

impl Default for MultinamePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/multiname_tests.rs"]
mod tests;
