use std::collections::HashMap;
use std::rc::Rc;

/// Interned property name. Stable for the lifetime of one execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub u32);

macro_rules! well_known {
    ($($konst:ident = $idx:literal => $text:literal,)*) => {
        /// Names pre-interned at fixed low ids so hot lookups skip hashing.
        pub mod names {
            use super::NameId;
            $(pub const $konst: NameId = NameId($idx);)*
        }

        const WELL_KNOWN: &[&str] = &[$($text,)*];
    };
}

well_known! {
    PROTO = 0 => "__proto__",
    PROTOTYPE = 1 => "prototype",
    CONSTRUCTOR = 2 => "constructor",
    THIS = 3 => "this",
    SUPER = 4 => "super",
    ARGUMENTS = 5 => "arguments",
    GLOBAL = 6 => "_global",
    LENGTH = 7 => "length",
    ROOT = 8 => "_root",
    PARENT = 9 => "_parent",
    NAME = 10 => "_name",
    TO_STRING = 11 => "toString",
    VALUE_OF = 12 => "valueOf",
    ON_LOAD = 13 => "onLoad",
    ON_UNLOAD = 14 => "onUnload",
    ON_ENTER_FRAME = 15 => "onEnterFrame",
    ON_MOUSE_DOWN = 16 => "onMouseDown",
    ON_MOUSE_UP = 17 => "onMouseUp",
    ON_MOUSE_MOVE = 18 => "onMouseMove",
    ON_KEY_DOWN = 19 => "onKeyDown",
    ON_KEY_UP = 20 => "onKeyUp",
    ON_PRESS = 21 => "onPress",
    ON_RELEASE = 22 => "onRelease",
    ON_ROLL_OVER = 23 => "onRollOver",
    ON_ROLL_OUT = 24 => "onRollOut",
}

/// Bidirectional string <-> [`NameId`] map.
#[derive(Debug)]
pub struct StringTable {
    ids_by_str: HashMap<Rc<str>, NameId>,
    strs_by_id: Vec<Rc<str>>,
}

impl StringTable {
    pub fn new() -> Self {
        let mut table = Self {
            ids_by_str: HashMap::with_capacity(WELL_KNOWN.len() * 2),
            strs_by_id: Vec::with_capacity(WELL_KNOWN.len() * 2),
        };
        for name in WELL_KNOWN {
            table.intern(name);
        }
        table
    }

    /// Number of ids reserved for well-known names.
    pub fn reserved_len() -> usize {
        WELL_KNOWN.len()
    }

    pub fn intern(&mut self, s: &str) -> NameId {
        if let Some(&id) = self.ids_by_str.get(s) {
            return id;
        }
        // Names are bounded by script sizes; u32 overflow would need 4G distinct names.
        let id = NameId(self.strs_by_id.len() as u32);
        let shared: Rc<str> = Rc::from(s);
        self.strs_by_id.push(Rc::clone(&shared));
        self.ids_by_str.insert(shared, id);
        id
    }

    /// Look up an id without interning.
    pub fn lookup(&self, s: &str) -> Option<NameId> {
        self.ids_by_str.get(s).copied()
    }

    pub fn resolve(&self, id: NameId) -> Option<&str> {
        self.strs_by_id.get(id.0 as usize).map(|s| &**s)
    }

    /// Shared handle to the interned text, so string values can reuse the allocation.
    pub fn resolve_shared(&self, id: NameId) -> Option<Rc<str>> {
        self.strs_by_id.get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.strs_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strs_by_id.is_empty()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vm/strings.rs"]
mod tests;
