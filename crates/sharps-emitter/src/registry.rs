//! The visit registry shared by the mark and emit passes.
//!
//! One registry is alive for the duration of one top-level serialize call,
//! including any nested calls made while already serializing: re-entrant
//! entries reuse the live registry through the call-depth counter, and the
//! registry is torn down exactly when the counter returns to zero,
//! including when the call unwinds via an error.

use rustc_hash::FxHashMap;
use sharps_common::{SharpError, SharpResult};
use sharps_graph::{PropertySlot, Value, ValueArena, ValueId};

#[derive(Debug, Default)]
struct SharpEntry {
    /// Assigned on the second encounter during marking; `None` means the
    /// node was visited exactly once and emits with no label.
    sharp_id: Option<u32>,
    /// Set once the labeled definition has been rendered; later
    /// encounters emit only a backreference.
    emitted: bool,
}

/// Result of entering a node for emission.
pub(crate) enum Entered {
    /// The node's definition is already in the output; emit `#n#` and do
    /// not call `leave`.
    AlreadyEmitted(u32),
    /// The node's body is to be rendered now; the depth counter has been
    /// incremented and `leave` must be called. Carries the node's label,
    /// when it has one.
    Fresh(Option<u32>),
}

#[derive(Debug, Default)]
pub(crate) struct SharpRegistry {
    map: FxHashMap<ValueId, SharpEntry>,
    generation: u32,
    depth: u32,
}

impl SharpRegistry {
    pub fn new() -> SharpRegistry {
        SharpRegistry::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Enter a node for emission. On the outermost entry this first runs
    /// the mark pass over the whole graph; the depth counter is held
    /// incremented while marking so a nested entry cannot free the map
    /// mid-pass.
    pub fn enter(&mut self, arena: &ValueArena, id: ValueId) -> SharpResult<Entered> {
        if self.depth == 0 {
            self.map.clear();
            self.generation = 0;
            self.depth += 1;
            self.mark(arena, id);
            self.depth -= 1;
        }

        let entry = self.map.entry(id).or_default();
        match (entry.emitted, entry.sharp_id) {
            (true, Some(label)) => Ok(Entered::AlreadyEmitted(label)),
            (true, None) => Err(SharpError::internal(
                "node emitted as a definition without a label",
            )),
            (false, label) => {
                self.depth += 1;
                Ok(Entered::Fresh(label))
            }
        }
    }

    /// Record that a labeled node's `#n=` definition is being rendered, so
    /// every further encounter inside it resolves to `#n#`.
    pub fn set_emitted(&mut self, id: ValueId) {
        if let Some(entry) = self.map.get_mut(&id) {
            entry.emitted = true;
        }
    }

    pub fn leave(&mut self) -> SharpResult<()> {
        if self.depth == 0 {
            return Err(SharpError::internal("unmatched leave of the sharp registry"));
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.map.clear();
            self.generation = 0;
        }
        Ok(())
    }

    /// Force teardown after an abnormal exit of the outermost call.
    pub fn reset(&mut self) {
        self.map.clear();
        self.generation = 0;
        self.depth = 0;
    }

    /// Mark pass: depth-first over enumerable own properties. First visit
    /// registers the node unlabeled and recurses; a revisit assigns the
    /// next label and stops, its subtree having already been scheduled.
    fn mark(&mut self, arena: &ValueArena, id: ValueId) {
        if !arena.is_object_like(id) {
            return;
        }
        if let Some(entry) = self.map.get_mut(&id) {
            if entry.sharp_id.is_none() {
                self.generation += 1;
                entry.sharp_id = Some(self.generation);
            }
            return;
        }
        self.map.insert(id, SharpEntry::default());

        match arena.get(id) {
            Some(Value::Object(obj)) => {
                for slot in obj.properties.values() {
                    if slot.is_enumerable() {
                        self.mark_slot(arena, slot);
                    }
                }
            }
            Some(Value::Array(arr)) => {
                for slot in arr.elements.iter().flatten() {
                    if slot.is_enumerable() {
                        self.mark_slot(arena, slot);
                    }
                }
            }
            _ => {}
        }
    }

    /// For a data slot, mark the value; for an accessor slot, mark getter
    /// and setter independently.
    fn mark_slot(&mut self, arena: &ValueArena, slot: &PropertySlot) {
        match slot {
            PropertySlot::Value { value, .. } => self.mark(arena, *value),
            PropertySlot::Accessor { get, set, .. } => {
                if let Some(get) = get {
                    self.mark(arena, *get);
                }
                if let Some(set) = set {
                    self.mark(arena, *set);
                }
            }
        }
    }
}
