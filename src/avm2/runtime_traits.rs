//! Per-class trait tables.
//!
//! Tables form a tree that mirrors the class hierarchy. A subclass table keeps a
//! shared reference to its parent and never copies parent entries into its own
//! maps: a lookup that misses locally falls through to `super_traits`. This keeps
//! the parent untouched while every parent name stays visible from the child.

use crate::avm2::multiname::{Multiname, MultinameId};
use crate::avm2::namespace::Namespace;
use crate::avm2::traits::RuntimeTraitInfo;
use crate::compiler_messages::compiler_errors::CompilerError;
use crate::traits_log;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Traits sharing one name, keyed by mangled namespace in declaration order.
/// Names are rarely declared in more than two or three namespaces, so a linear scan wins.
#[derive(Debug, Default, Clone)]
struct NamespaceMappings {
    entries: Vec<(Box<str>, Rc<RuntimeTraitInfo>)>,
}

impl NamespaceMappings {
    fn get(&self, mangled_namespace: &str) -> Option<&Rc<RuntimeTraitInfo>> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_ref() == mangled_namespace)
            .map(|(_, trait_info)| trait_info)
    }

    fn insert(
        &mut self,
        mangled_namespace: &str,
        trait_info: Rc<RuntimeTraitInfo>,
    ) -> Option<Rc<RuntimeTraitInfo>> {
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.as_ref() == mangled_namespace)
        {
            Some((_, slot)) => Some(std::mem::replace(slot, trait_info)),
            None => {
                self.entries.push((Box::from(mangled_namespace), trait_info));
                None
            }
        }
    }
}

#[derive(Debug)]
pub struct RuntimeTraits {
    super_traits: Option<Rc<RuntimeTraits>>,

    protected_namespace: Option<Rc<Namespace>>,
    protected_namespace_mappings: FxHashMap<Box<str>, Rc<RuntimeTraitInfo>>,

    own_mappings: FxHashMap<Box<str>, NamespaceMappings>,
    // First-declaration order of the names in `own_mappings`
    declared_names: Vec<Box<str>>,

    // Indexed by slot id, index 0 is never used
    slots: Vec<Option<Rc<RuntimeTraitInfo>>>,
    next_slot_id: u32,

    // Not synchronized. A table must stay on one thread while it is being resolved against.
    resolution_cache: RefCell<FxHashMap<MultinameId, Option<Rc<RuntimeTraitInfo>>>>,
}

impl RuntimeTraits {
    pub fn new(
        super_traits: Option<Rc<RuntimeTraits>>,
        protected_namespace: Option<Rc<Namespace>>,
    ) -> Self {
        // Subclass slots continue after the inherited ones
        let next_slot_id = super_traits
            .as_ref()
            .map_or(1, |parent| parent.next_slot_id);

        RuntimeTraits {
            super_traits,
            protected_namespace,
            protected_namespace_mappings: FxHashMap::default(),
            own_mappings: FxHashMap::default(),
            declared_names: Vec::new(),
            slots: Vec::new(),
            next_slot_id,
            resolution_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn super_traits(&self) -> Option<&Rc<RuntimeTraits>> {
        self.super_traits.as_ref()
    }

    pub fn protected_namespace(&self) -> Option<&Rc<Namespace>> {
        self.protected_namespace.as_ref()
    }

    pub fn next_slot_id(&self) -> u32 {
        self.next_slot_id
    }

    /// Inserts `trait_info` under its name and primary namespace in this table.
    ///
    /// Returns the trait that previously held exactly that key in this table, so the
    /// linker can reject duplicate declarations. Parent tables are never consulted here.
    pub fn add_trait(&mut self, trait_info: Rc<RuntimeTraitInfo>) -> Option<Rc<RuntimeTraitInfo>> {
        let name = trait_info.name().to_owned();
        let namespace = trait_info.namespace().cloned();
        let mangled_namespace = namespace.as_ref().map_or("", |ns| ns.mangled_name());

        if !self.own_mappings.contains_key(name.as_str()) {
            self.declared_names.push(Box::from(name.as_str()));
        }

        let previous = self
            .own_mappings
            .entry(Box::from(name.as_str()))
            .or_default()
            .insert(mangled_namespace, Rc::clone(&trait_info));

        if let (Some(ns), Some(protected)) = (&namespace, &self.protected_namespace) {
            if ns.is_protected() && ns == protected {
                self.protected_namespace_mappings
                    .insert(Box::from(name.as_str()), Rc::clone(&trait_info));
            }
        }

        traits_log!(format!("[Traits] Added {} under '{}'", name, mangled_namespace));

        // Anything memoized so far may now be shadowed
        self.resolution_cache.get_mut().clear();

        previous
    }

    /// Gives a Slot or Const trait its slot and records it in the slot list.
    ///
    /// An unassigned slot takes `next_slot_id`. An explicit slot pushes
    /// `next_slot_id` past itself. Assigning an occupied slot is a linker bug:
    /// it asserts in debug builds and fails without touching the table otherwise.
    pub fn add_slot_trait(
        &mut self,
        mut trait_info: RuntimeTraitInfo,
    ) -> Result<Rc<RuntimeTraitInfo>, CompilerError> {
        let slot = trait_info.slot().unwrap_or(self.next_slot_id);

        if self.get_slot(slot).is_some() {
            debug_assert!(
                false,
                "slot {} is already occupied, cannot assign it to '{}'",
                slot,
                trait_info.name()
            );
            return Err(CompilerError::new_duplicate_slot(slot, trait_info.name()));
        }

        trait_info.assign_slot(slot);
        if self.next_slot_id <= slot {
            self.next_slot_id = slot + 1;
        }

        let index = slot as usize;
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }

        let trait_info = Rc::new(trait_info);
        self.slots[index] = Some(Rc::clone(&trait_info));

        traits_log!(format!("[Traits] Slot {} -> {}", slot, trait_info.name()));

        Ok(trait_info)
    }

    /// Adds a freshly declared trait the way the class linker does.
    ///
    /// Slot and Const traits get a slot first. A getter or setter declared next to
    /// its counterpart is merged into one `GetterSetter` trait.
    pub fn declare_trait(
        &mut self,
        trait_info: RuntimeTraitInfo,
    ) -> Result<Option<Rc<RuntimeTraitInfo>>, CompilerError> {
        if trait_info.kind().has_slot() {
            let trait_info = self.add_slot_trait(trait_info)?;
            return Ok(self.add_trait(trait_info));
        }

        if trait_info.kind().is_accessor() {
            let mangled_namespace = trait_info.namespace().map_or("", |ns| ns.mangled_name());
            let existing = self
                .own_mappings
                .get(trait_info.name())
                .and_then(|mappings| mappings.get(mangled_namespace))
                .cloned();

            let merged = match existing {
                Some(existing) => RuntimeTraitInfo::merge_accessor(&existing, trait_info),
                None => trait_info,
            };

            return Ok(self.add_trait(Rc::new(merged)));
        }

        Ok(self.add_trait(Rc::new(trait_info)))
    }

    /// Resolves a multiname against this table and its ancestors.
    ///
    /// Static multinames are memoized by id, including misses. Mutable ones are
    /// looked up fresh on every call.
    pub fn resolve(&self, multiname: &Multiname) -> Option<Rc<RuntimeTraitInfo>> {
        let name = multiname.name()?;

        let Some(key) = multiname.cache_key() else {
            return self.lookup_by_namespaces(multiname.namespaces(), name);
        };

        let cached = self.resolution_cache.borrow().get(&key).cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let result = self.lookup_by_namespaces(multiname.namespaces(), name);
        self.resolution_cache
            .borrow_mut()
            .insert(key, result.clone());

        result
    }

    /// First namespace in `namespaces` with an entry for `name` wins.
    ///
    /// A protected namespace additionally walks up the chain looking for the table
    /// that declared it. `None` is the normal answer for names that have to be
    /// looked up dynamically.
    pub fn lookup_by_namespaces(
        &self,
        namespaces: &[Rc<Namespace>],
        name: &str,
    ) -> Option<Rc<RuntimeTraitInfo>> {
        if !self.has_name(name) {
            return None;
        }

        for ns in namespaces {
            if let Some(trait_info) = self.find_in_chain(name, ns.mangled_name()) {
                return Some(trait_info);
            }

            if ns.is_protected() {
                let mut scope = Some(self);
                while let Some(table) = scope {
                    if table.protected_namespace.as_deref() == Some(&**ns) {
                        if let Some(trait_info) = table.find_protected(name) {
                            return Some(trait_info);
                        }
                    }
                    scope = table.super_traits.as_deref();
                }
            }
        }

        None
    }

    /// Own traits only, every namespace of every name, in declaration order.
    pub fn get_traits_list(&self) -> Vec<Rc<RuntimeTraitInfo>> {
        self.declared_names
            .iter()
            .filter_map(|name| self.own_mappings.get(name))
            .flat_map(|mappings| mappings.entries.iter().map(|(_, t)| Rc::clone(t)))
            .collect()
    }

    /// Names that dynamic enumeration should see: public slots and accessors.
    pub fn get_public_trait_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();

        for trait_info in self.get_traits_list() {
            let enumerable = trait_info.kind().has_slot() || trait_info.kind().is_accessor();
            let public = trait_info.namespace().is_some_and(|ns| ns.is_public());

            if enumerable && public && !names.iter().any(|n| n == trait_info.name()) {
                names.push(trait_info.name().to_owned());
            }
        }

        names
    }

    /// Own slots first, inherited slots through the parent.
    pub fn get_slot(&self, slot: u32) -> Option<Rc<RuntimeTraitInfo>> {
        if let Some(Some(trait_info)) = self.slots.get(slot as usize) {
            return Some(Rc::clone(trait_info));
        }

        self.super_traits
            .as_ref()
            .and_then(|parent| parent.get_slot(slot))
    }

    /// Number of memoized resolutions, misses included.
    pub fn cached_resolutions(&self) -> usize {
        self.resolution_cache.borrow().len()
    }

    fn has_name(&self, name: &str) -> bool {
        self.own_mappings.contains_key(name)
            || self
                .super_traits
                .as_ref()
                .is_some_and(|parent| parent.has_name(name))
    }

    fn find_in_chain(&self, name: &str, mangled_namespace: &str) -> Option<Rc<RuntimeTraitInfo>> {
        let mut scope = Some(self);

        while let Some(table) = scope {
            if let Some(trait_info) = table
                .own_mappings
                .get(name)
                .and_then(|mappings| mappings.get(mangled_namespace))
            {
                return Some(Rc::clone(trait_info));
            }
            scope = table.super_traits.as_deref();
        }

        None
    }

    // Protected mappings of a subclass fall back to the ones it inherited
    fn find_protected(&self, name: &str) -> Option<Rc<RuntimeTraitInfo>> {
        let mut scope = Some(self);

        while let Some(table) = scope {
            if let Some(trait_info) = table.protected_namespace_mappings.get(name) {
                return Some(Rc::clone(trait_info));
            }
            scope = table.super_traits.as_deref();
        }

        None
    }
}

#[cfg(test)]
#[path = "tests/runtime_traits_tests.rs"]
mod tests;
