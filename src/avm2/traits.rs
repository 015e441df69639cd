//! Trait descriptors.
//!
//! One `RuntimeTraitInfo` exists per declared class member. They are built while
//! a class is linked and shared as `Rc<RuntimeTraitInfo>` between the trait
//! table, its slot list and every subclass table that sees them.

use crate::avm2::class_ref::{ClassRef, ClassResolver};
use crate::avm2::multiname::Multiname;
use crate::avm2::namespace::Namespace;
use crate::traits_log;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitKind {
    Slot,
    Const,
    Method,
    Getter,
    Setter,
    // A getter and a setter declared under the same name and namespace
    GetterSetter,
    Class,
}

impl TraitKind {
    /// Kinds that own a storage slot.
    pub fn has_slot(self) -> bool {
        matches!(self, TraitKind::Slot | TraitKind::Const)
    }

    pub fn is_accessor(self) -> bool {
        matches!(
            self,
            TraitKind::Getter | TraitKind::Setter | TraitKind::GetterSetter
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TraitKind::Slot => "slot",
            TraitKind::Const => "const",
            TraitKind::Method => "method",
            TraitKind::Getter => "getter",
            TraitKind::Setter => "setter",
            TraitKind::GetterSetter => "getter_setter",
            TraitKind::Class => "class",
        }
    }
}

/// Index of a method body in the owning container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessorPair {
    pub getter: Option<MethodRef>,
    pub setter: Option<MethodRef>,
}

/// Memoized result of resolving a trait's declared type.
///
/// `ResolvedNone` is a permanent answer (no type constraint), distinct from
/// `Unresolved` which means nobody asked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeResolution {
    Unresolved,
    ResolvedNone,
    Resolved(ClassRef),
}

#[derive(Debug)]
pub struct RuntimeTraitInfo {
    multiname: Rc<Multiname>,
    kind: TraitKind,
    slot: Option<u32>,
    declared_type: Option<Rc<Multiname>>,
    resolved_type: RefCell<TypeResolution>,
    accessor: Option<AccessorPair>,
    method: Option<MethodRef>,
}

impl RuntimeTraitInfo {
    pub fn new(multiname: Rc<Multiname>, kind: TraitKind) -> Self {
        RuntimeTraitInfo {
            multiname,
            kind,
            slot: None,
            declared_type: None,
            resolved_type: RefCell::new(TypeResolution::Unresolved),
            accessor: None,
            method: None,
        }
    }

    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn with_type(mut self, declared_type: Rc<Multiname>) -> Self {
        self.declared_type = Some(declared_type);
        self
    }

    pub fn with_method(mut self, method: MethodRef) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_getter(mut self, getter: MethodRef) -> Self {
        self.accessor.get_or_insert_with(AccessorPair::default).getter = Some(getter);
        self
    }

    pub fn with_setter(mut self, setter: MethodRef) -> Self {
        self.accessor.get_or_insert_with(AccessorPair::default).setter = Some(setter);
        self
    }

    #[inline]
    pub fn multiname(&self) -> &Rc<Multiname> {
        &self.multiname
    }

    /// Declared traits always carry a name, the empty string stands in for a missing one.
    pub fn name(&self) -> &str {
        self.multiname.name().unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&Rc<Namespace>> {
        self.multiname.primary_namespace()
    }

    #[inline]
    pub fn kind(&self) -> TraitKind {
        self.kind
    }

    #[inline]
    pub fn slot(&self) -> Option<u32> {
        self.slot
    }

    pub(crate) fn assign_slot(&mut self, slot: u32) {
        self.slot = Some(slot);
    }

    pub fn declared_type(&self) -> Option<&Rc<Multiname>> {
        self.declared_type.as_ref()
    }

    pub fn accessor(&self) -> Option<&AccessorPair> {
        self.accessor.as_ref()
    }

    pub fn method(&self) -> Option<MethodRef> {
        self.method
    }

    /// Current state of the type memo without computing it.
    pub fn type_resolution(&self) -> TypeResolution {
        self.resolved_type.borrow().clone()
    }

    /// Resolves the declared type at most once. `*` and untyped traits resolve to `None`.
    pub fn resolved_type(&self, resolver: &dyn ClassResolver) -> Option<ClassRef> {
        let unresolved = matches!(*self.resolved_type.borrow(), TypeResolution::Unresolved);

        if unresolved {
            let resolution = match &self.declared_type {
                Some(type_name) if type_name.name().is_some_and(|name| name != "*") => {
                    match resolver.resolve_class(type_name) {
                        Some(class) => TypeResolution::Resolved(class),
                        None => TypeResolution::ResolvedNone,
                    }
                }
                _ => TypeResolution::ResolvedNone,
            };

            traits_log!(format!("[Traits] Type of {} resolved to {:?}", self.name(), resolution));
            *self.resolved_type.borrow_mut() = resolution;
        }

        match &*self.resolved_type.borrow() {
            TypeResolution::Resolved(class) => Some(class.clone()),
            _ => None,
        }
    }

    /// Combines a getter and a setter declared under the same key into one trait.
    /// Anything else is a plain replacement and returns `incoming` unchanged.
    pub fn merge_accessor(existing: &RuntimeTraitInfo, incoming: RuntimeTraitInfo) -> Self {
        let (Some(old_pair), Some(new_pair)) = (existing.accessor, incoming.accessor) else {
            return incoming;
        };

        if !existing.kind.is_accessor() || !incoming.kind.is_accessor() {
            return incoming;
        }

        let pair = AccessorPair {
            getter: new_pair.getter.or(old_pair.getter),
            setter: new_pair.setter.or(old_pair.setter),
        };

        let kind = match (pair.getter, pair.setter) {
            (Some(_), Some(_)) => TraitKind::GetterSetter,
            (Some(_), None) => TraitKind::Getter,
            _ => TraitKind::Setter,
        };

        RuntimeTraitInfo {
            kind,
            accessor: Some(pair),
            ..incoming
        }
    }
}
