use std::collections::BTreeMap;

use crate::display::instance::InstanceId;
use crate::foundation::core::{CharacterId, Depth};

/// One occupied depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layer {
    pub instance: InstanceId,
    /// Definition the instance was placed from; `None` for attached sub-movies.
    pub character: Option<CharacterId>,
    /// Marks the layer as a mask over `(depth, clip_depth]`.
    pub clip_depth: Option<Depth>,
}

/// Depth-ordered children of one container. At most one layer per depth.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    layers: BTreeMap<Depth, Layer>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at `depth`, returning the layer that occupied it before.
    ///
    /// The caller owns tearing down the replaced instance.
    pub fn show_object(
        &mut self,
        depth: Depth,
        character: Option<CharacterId>,
        instance: InstanceId,
        clip_depth: Option<Depth>,
    ) -> Option<Layer> {
        tracing::trace!(depth = depth.0, ?instance, "show object");
        self.layers.insert(
            depth,
            Layer {
                instance,
                character,
                clip_depth,
            },
        )
    }

    /// Remove by identity. Missing instances are ignored.
    pub fn remove_object(&mut self, instance: InstanceId) -> Option<Depth> {
        let depth = self.get_object_depth(instance)?;
        self.layers.remove(&depth);
        tracing::trace!(depth = depth.0, ?instance, "remove object");
        Some(depth)
    }

    pub fn remove_depth(&mut self, depth: Depth) -> Option<Layer> {
        self.layers.remove(&depth)
    }

    pub fn get_object_depth(&self, instance: InstanceId) -> Option<Depth> {
        self.layers
            .iter()
            .find(|(_, l)| l.instance == instance)
            .map(|(d, _)| *d)
    }

    /// One past the highest used depth, or `Depth(0)` when empty.
    pub fn get_next_highest_depth(&self) -> Depth {
        self.layers
            .last_key_value()
            .map_or(Depth(0), |(d, _)| d.next())
    }

    /// Exchange the occupants of two depths. A lone occupant moves to the empty depth.
    ///
    /// Returns false when both depths are empty.
    pub fn swap(&mut self, a: Depth, b: Depth) -> bool {
        if a == b {
            return self.layers.contains_key(&a);
        }
        let la = self.layers.remove(&a);
        let lb = self.layers.remove(&b);
        let moved = la.is_some() || lb.is_some();
        if let Some(l) = la {
            self.layers.insert(b, l);
        }
        if let Some(l) = lb {
            self.layers.insert(a, l);
        }
        moved
    }

    pub fn get(&self, depth: Depth) -> Option<&Layer> {
        self.layers.get(&depth)
    }

    pub fn get_mut(&mut self, depth: Depth) -> Option<&mut Layer> {
        self.layers.get_mut(&depth)
    }

    /// Ascending depth order.
    pub fn iter(&self) -> impl Iterator<Item = (Depth, &Layer)> {
        self.layers.iter().map(|(d, l)| (*d, l))
    }

    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.layers.values().map(|l| l.instance)
    }

    /// Remove every layer, returning them in ascending depth order.
    pub fn clear(&mut self) -> Vec<Layer> {
        std::mem::take(&mut self.layers).into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/display/display_list.rs"]
mod tests;
