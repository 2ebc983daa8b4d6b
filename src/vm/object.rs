use std::collections::HashMap;

use crate::vm::function::Function;
use crate::vm::heap::{Heap, ObjectRef, Trace, Visitor};
use crate::vm::strings::NameId;
use crate::vm::value::Value;

/// Opaque link from a script object to the display instance it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(pub u64);

/// Getter/setter pair installed for one name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accessor {
    pub getter: Option<ObjectRef>,
    pub setter: Option<ObjectRef>,
}

/// Payload that distinguishes plain objects from arrays and callables.
#[derive(Debug, Clone, Default)]
pub enum ObjectKind {
    #[default]
    Plain,
    Array(Vec<Value>),
    Function(Function),
}

/// Dynamic property bag with prototype delegation.
#[derive(Debug, Clone, Default)]
pub struct Object {
    props: HashMap<NameId, Value>,
    proto: Option<ObjectRef>,
    accessors: Option<HashMap<NameId, Accessor>>,
    read_only: bool,
    pub kind: ObjectKind,
    host: Option<HostHandle>,
}

/// Outcome of a member write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Stored,
    InvokedSetter,
    /// The receiver is read-only; nothing changed.
    ReadOnly,
}

/// What a prototype-chain walk found for a name.
#[derive(Debug, Clone)]
pub enum Slot {
    Value(Value),
    Accessor(Accessor),
}

/// Result of [`lookup_chain`].
#[derive(Debug, Clone)]
pub struct ChainHit {
    pub owner: ObjectRef,
    pub slot: Slot,
    /// Number of prototype links followed before the owner was reached.
    pub depth: usize,
}

impl Object {
    pub fn new(proto: Option<ObjectRef>) -> Self {
        Self {
            proto,
            ..Self::default()
        }
    }

    pub fn with_kind(proto: Option<ObjectRef>, kind: ObjectKind) -> Self {
        Self {
            proto,
            kind,
            ..Self::default()
        }
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.proto
    }

    pub fn set_proto(&mut self, proto: Option<ObjectRef>) {
        self.proto = proto;
    }

    pub fn get_own(&self, name: NameId) -> Option<&Value> {
        self.props.get(&name)
    }

    pub fn has_own(&self, name: NameId) -> bool {
        self.props.contains_key(&name)
            || self
                .accessors
                .as_ref()
                .is_some_and(|a| a.contains_key(&name))
    }

    /// Store `value` on this object. Returns `false` when the object is read-only.
    pub fn set_own(&mut self, name: NameId, value: Value) -> bool {
        if self.read_only {
            return false;
        }
        self.props.insert(name, value);
        true
    }

    pub fn delete(&mut self, name: NameId) -> bool {
        if self.read_only {
            return false;
        }
        let removed_value = self.props.remove(&name).is_some();
        let removed_accessor = self
            .accessors
            .as_mut()
            .is_some_and(|a| a.remove(&name).is_some());
        removed_value || removed_accessor
    }

    pub fn define_accessor(&mut self, name: NameId, accessor: Accessor) {
        self.accessors
            .get_or_insert_with(HashMap::new)
            .insert(name, accessor);
    }

    pub fn accessor(&self, name: NameId) -> Option<Accessor> {
        self.accessors.as_ref().and_then(|a| a.get(&name)).copied()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freeze the object. There is no way back.
    pub fn set_read_only(&mut self) {
        self.read_only = true;
    }

    pub fn host(&self) -> Option<HostHandle> {
        self.host
    }

    pub fn set_host(&mut self, host: Option<HostHandle>) {
        self.host = host;
    }

    pub fn keys(&self) -> impl Iterator<Item = NameId> + '_ {
        self.props.keys().copied()
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match &self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ObjectKind::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl Trace for Object {
    fn trace(&self, visitor: &mut dyn Visitor) {
        if let Some(p) = self.proto {
            visitor.visit(p);
        }
        for v in self.props.values() {
            visitor.visit_value(v);
        }
        if let Some(accessors) = &self.accessors {
            for a in accessors.values() {
                if let Some(g) = a.getter {
                    visitor.visit(g);
                }
                if let Some(s) = a.setter {
                    visitor.visit(s);
                }
            }
        }
        match &self.kind {
            ObjectKind::Plain => {}
            ObjectKind::Array(items) => items.iter().for_each(|v| visitor.visit_value(v)),
            ObjectKind::Function(f) => f.trace(visitor),
        }
    }

    fn dereference(&mut self) {
        self.props.clear();
        self.accessors = None;
        self.proto = None;
        match &mut self.kind {
            ObjectKind::Plain => {}
            ObjectKind::Array(items) => items.clear(),
            ObjectKind::Function(f) => f.dereference(),
        }
    }
}

/// Walk the prototype chain from `start` looking for `name`.
///
/// At most `max_links` prototype links are followed, so a cyclic chain ends in `None`
/// instead of looping.
pub fn lookup_chain(
    heap: &Heap,
    start: ObjectRef,
    name: NameId,
    max_links: usize,
) -> Option<ChainHit> {
    let mut cur = start;
    for depth in 0..=max_links {
        let obj = heap.get(cur)?;
        if let Some(v) = obj.get_own(name) {
            return Some(ChainHit {
                owner: cur,
                slot: Slot::Value(v.clone()),
                depth,
            });
        }
        if let Some(a) = obj.accessor(name) {
            return Some(ChainHit {
                owner: cur,
                slot: Slot::Accessor(a),
                depth,
            });
        }
        cur = obj.proto()?;
    }
    None
}

/// `true` when `proto` appears on `obj`'s prototype chain (excluding `obj` itself).
pub fn chain_contains(heap: &Heap, obj: ObjectRef, proto: ObjectRef, max_links: usize) -> bool {
    let mut cur = heap.get(obj).and_then(Object::proto);
    for _ in 0..max_links {
        match cur {
            Some(p) if p == proto => return true,
            Some(p) => cur = heap.get(p).and_then(Object::proto),
            None => return false,
        }
    }
    false
}

#[cfg(test)]
#[path = "../../tests/unit/vm/object.rs"]
mod tests;
