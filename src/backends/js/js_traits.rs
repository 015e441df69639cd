//! Exports a class's trait table as the JSON lookup object the host runtime installs
//! next to the class, `{ name: { mangledNamespace: entry } }`.

use crate::avm2::class_ref::ClassResolver;
use crate::avm2::runtime_traits::RuntimeTraits;
use crate::compiler_messages::compiler_errors::{CompilerError, ErrorMetaDataKey};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraitEntry {
    pub kind: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub getter: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub setter: Option<u32>,

    /// Class id of the declared type, when it resolved to one.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraitTableExport {
    /// First slot id a subclass table would hand out.
    pub next_slot: u32,

    /// Own traits only, inherited ones come from the parent's export.
    pub traits: BTreeMap<String, BTreeMap<String, TraitEntry>>,

    /// Names enumerated by `for..in` over an instance.
    pub enumerable: Vec<String>,
}

pub fn export_trait_table(traits: &RuntimeTraits, resolver: &dyn ClassResolver) -> TraitTableExport {
    let mut table: BTreeMap<String, BTreeMap<String, TraitEntry>> = BTreeMap::new();

    for trait_info in traits.get_traits_list() {
        let namespace = trait_info
            .namespace()
            .map_or(String::new(), |ns| ns.mangled_name().to_owned());

        let entry = TraitEntry {
            kind: trait_info.kind().as_str(),
            slot: trait_info.slot(),
            method: trait_info.method().map(|method| method.0),
            getter: trait_info
                .accessor()
                .and_then(|pair| pair.getter)
                .map(|method| method.0),
            setter: trait_info
                .accessor()
                .and_then(|pair| pair.setter)
                .map(|method| method.0),
            type_id: trait_info.resolved_type(resolver).map(|class| class.id()),
        };

        table
            .entry(trait_info.name().to_owned())
            .or_default()
            .insert(namespace, entry);
    }

    TraitTableExport {
        next_slot: traits.next_slot_id(),
        traits: table,
        enumerable: traits.get_public_trait_names(),
    }
}

pub fn lower_traits_to_json(
    traits: &RuntimeTraits,
    resolver: &dyn ClassResolver,
    pretty: bool,
) -> Result<String, CompilerError> {
    let export = export_trait_table(traits, resolver);

    let json = if pretty {
        serde_json::to_string_pretty(&export)
    } else {
        serde_json::to_string(&export)
    };

    json.map_err(|e| {
        CompilerError::compiler_error(format!("Could not serialize trait table: {}", e))
            .with_metadata(ErrorMetaDataKey::CompilationStage, "Trait export")
    })
}

#[cfg(test)]
#[path = "tests/js_traits_tests.rs"]
mod tests;
