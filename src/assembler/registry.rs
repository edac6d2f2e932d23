//! The element registry: every subroutine and structure the input declares
//! or defines, in the order they were first mentioned.
//!
//! Elements live in arenas and are addressed by [`SubroutineId`] and
//! [`StructureId`]. A name maps to the element most recently bound to it;
//! subroutines and structures have separate namespaces.
use std::collections::BTreeMap;

use super::bytecode::{BytecodeObject, StructureId, StructureType, SubroutineId};
use super::error::{Error, Result};

/// Tag identifying an element of either kind.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ElementId {
    Subroutine(SubroutineId),
    Structure(StructureId),
}

#[derive(Debug)]
pub struct SubroutineElement {
    pub name: String,
    pub defined: bool,
    pub code: BytecodeObject,
}

#[derive(Debug)]
pub struct StructureElement {
    pub name: String,
    pub defined: bool,
    pub ty: StructureType,
}

#[derive(Debug, Default)]
pub struct Registry {
    subroutines: Vec<SubroutineElement>,
    structures: Vec<StructureElement>,
    sub_names: BTreeMap<String, SubroutineId>,
    struct_names: BTreeMap<String, StructureId>,
    order: Vec<ElementId>,
    last_subroutine: Option<SubroutineId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn new_subroutine(&mut self, name: &str, defined: bool) -> SubroutineId {
        let id = SubroutineId(self.subroutines.len());
        self.subroutines.push(SubroutineElement {
            name: name.to_owned(),
            defined,
            code: BytecodeObject::new(),
        });
        self.sub_names.insert(name.to_owned(), id);
        self.order.push(ElementId::Subroutine(id));
        id
    }

    fn new_structure(&mut self, name: &str, defined: bool) -> StructureId {
        let id = StructureId(self.structures.len());
        self.structures.push(StructureElement {
            name: name.to_owned(),
            defined,
            ty: StructureType::new(name),
        });
        self.struct_names.insert(name.to_owned(), id);
        self.order.push(ElementId::Structure(id));
        id
    }

    /// Forward-declares a subroutine. Known names are left alone.
    pub fn declare_subroutine(&mut self, name: &str) -> SubroutineId {
        match self.sub_names.get(name) {
            Some(&id) => id,
            None => self.new_subroutine(name, false),
        }
    }

    pub fn declare_structure(&mut self, name: &str) -> StructureId {
        match self.struct_names.get(name) {
            Some(&id) => id,
            None => self.new_structure(name, false),
        }
    }

    /// Returns the subroutine a body for `name` compiles into.
    ///
    /// A pending forward declaration is reused; otherwise a new element
    /// is bound to the name, shadowing any previous definition.
    pub fn define_subroutine(&mut self, name: &str) -> SubroutineId {
        let id = match self.sub_names.get(name) {
            Some(&id) if !self.subroutines[id.0].defined => {
                self.subroutines[id.0].defined = true;
                id
            }
            _ => self.new_subroutine(name, true),
        };
        self.last_subroutine = Some(id);
        id
    }

    pub fn define_structure(&mut self, name: &str) -> StructureId {
        match self.struct_names.get(name) {
            Some(&id) if !self.structures[id.0].defined => {
                self.structures[id.0].defined = true;
                id
            }
            _ => self.new_structure(name, true),
        }
    }

    /// Resolves a name used as a literal.
    pub fn lookup(&self, name: &str) -> Result<Option<ElementId>> {
        match (self.sub_names.get(name), self.struct_names.get(name)) {
            (Some(_), Some(_)) => Err(Error::new(format!(
                "\"{}\" is ambiguous: it names both a subroutine and a structure",
                name
            ))),
            (Some(&id), None) => Ok(Some(ElementId::Subroutine(id))),
            (None, Some(&id)) => Ok(Some(ElementId::Structure(id))),
            (None, None) => Ok(None),
        }
    }

    /// Subroutines currently bound to a name, sorted by name.
    pub fn bound_subroutines(&self) -> impl Iterator<Item = SubroutineId> + '_ {
        self.sub_names.values().copied()
    }

    /// Names of elements that were declared but never defined, in
    /// registration order.
    pub fn undefined(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|&id| match id {
                ElementId::Subroutine(id) => {
                    let e = &self.subroutines[id.0];
                    if e.defined { None } else { Some(e.name.as_str()) }
                }
                ElementId::Structure(id) => {
                    let e = &self.structures[id.0];
                    if e.defined { None } else { Some(e.name.as_str()) }
                }
            })
            .collect()
    }

    pub fn order(&self) -> &[ElementId] {
        &self.order
    }

    pub fn last_subroutine(&self) -> Option<SubroutineId> {
        self.last_subroutine
    }

    pub fn subroutine(&self, id: SubroutineId) -> &SubroutineElement {
        &self.subroutines[id.0]
    }

    pub fn subroutine_mut(&mut self, id: SubroutineId) -> &mut SubroutineElement {
        &mut self.subroutines[id.0]
    }

    pub fn structure(&self, id: StructureId) -> &StructureElement {
        &self.structures[id.0]
    }

    pub fn structure_mut(&mut self, id: StructureId) -> &mut StructureElement {
        &mut self.structures[id.0]
    }
}
