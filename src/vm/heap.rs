use crate::vm::object::Object;
use crate::vm::value::Value;

/// Handle to a heap object: slot index plus the generation the slot had at allocation.
///
/// Stale handles (slot reused after collection) fail lookup instead of aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    index: u32,
    generation: u32,
}

impl ObjectRef {
    pub fn index(self) -> u32 {
        self.index
    }
}

/// Receives strong edges during a trace pass.
pub trait Visitor {
    fn visit(&mut self, obj: ObjectRef);

    /// Visit a value's strong edge. Weak references are skipped.
    fn visit_value(&mut self, value: &Value) {
        if let Some(r) = value.strong_ref() {
            self.visit(r);
        }
    }
}

/// Per-kind tracing contract.
///
/// `trace` reports every strong outgoing reference exactly once. `dereference` drops strong
/// references when the collector finalizes the value, so cycles break in a fixed order.
pub trait Trace {
    fn trace(&self, visitor: &mut dyn Visitor);

    fn dereference(&mut self);
}

/// Counters for the last and all collections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GcStats {
    pub runs: u64,
    pub live: usize,
    pub collected_last: usize,
    pub collected_total: u64,
    pub allocated_total: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Non-moving mark/sweep arena for script objects.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    marks: Vec<bool>,
    free_list: Vec<u32>,
    // Kept between collections so marking does not allocate.
    worklist: Vec<ObjectRef>,
    live: usize,
    stats: GcStats,
}

struct Marker<'a> {
    slots: &'a [Slot],
    marks: &'a mut [bool],
    worklist: &'a mut Vec<ObjectRef>,
}

impl Visitor for Marker<'_> {
    fn visit(&mut self, obj: ObjectRef) {
        let i = obj.index as usize;
        let Some(slot) = self.slots.get(i) else {
            return;
        };
        if slot.generation != obj.generation || slot.object.is_none() || self.marks[i] {
            return;
        }
        self.marks[i] = true;
        self.worklist.push(obj);
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: Object) -> ObjectRef {
        self.live += 1;
        self.stats.allocated_total += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.object = Some(object);
            return ObjectRef {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        self.marks.push(false);
        ObjectRef {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, obj: ObjectRef) -> Option<&Object> {
        self.slots
            .get(obj.index as usize)
            .filter(|s| s.generation == obj.generation)
            .and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, obj: ObjectRef) -> Option<&mut Object> {
        self.slots
            .get_mut(obj.index as usize)
            .filter(|s| s.generation == obj.generation)
            .and_then(|s| s.object.as_mut())
    }

    pub fn contains(&self, obj: ObjectRef) -> bool {
        self.get(obj).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn stats(&self) -> GcStats {
        GcStats {
            live: self.live,
            ..self.stats
        }
    }

    /// Mark from `roots`, then finalize and release everything unmarked.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn collect(&mut self, roots: impl IntoIterator<Item = ObjectRef>) -> GcStats {
        let Heap {
            slots,
            marks,
            worklist,
            ..
        } = self;
        marks.iter_mut().for_each(|m| *m = false);
        worklist.clear();

        let slots: &[Slot] = slots.as_slice();
        let mut marker = Marker {
            slots,
            marks: marks.as_mut_slice(),
            worklist,
        };
        for root in roots {
            marker.visit(root);
        }
        while let Some(obj) = marker.worklist.pop() {
            if let Some(object) = slots[obj.index as usize].object.as_ref() {
                object.trace(&mut marker);
            }
        }

        let mut collected = 0usize;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if self.marks[i] {
                continue;
            }
            if let Some(mut object) = slot.object.take() {
                object.dereference();
                drop(object);
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(i as u32);
                collected += 1;
            }
        }

        self.live -= collected;
        self.stats.runs += 1;
        self.stats.collected_last = collected;
        self.stats.collected_total += collected as u64;
        tracing::debug!(live = self.live, collected, "gc pass complete");
        self.stats()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/vm/heap.rs"]
mod tests;
