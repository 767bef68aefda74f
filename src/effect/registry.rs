use crate::effect::EffectDescriptor;

/// Ordered, immutable set of effects. Indices are stable for the registry's lifetime.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Vec<EffectDescriptor>,
}

impl Registry {
    /// Registry over an explicit list.
    pub fn new(entries: impl Into<Vec<EffectDescriptor>>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Registry of every built-in effect.
    pub fn builtin() -> Self {
        Self::new(crate::effects::BUILTIN.to_vec())
    }

    /// Number of effects.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the registry holds no effects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Descriptor at `index`, or `None` out of range.
    pub fn get(&self, index: usize) -> Option<&EffectDescriptor> {
        self.entries.get(index)
    }

    /// Descriptors in index order.
    pub fn iter(&self) -> impl Iterator<Item = &EffectDescriptor> {
        self.entries.iter()
    }

    /// Names in index order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|d| d.name).collect()
    }

    /// Index of the effect named `name` (case-insensitive), falling back to the first name that
    /// contains it.
    pub fn find(&self, name: &str) -> Option<usize> {
        let needle = name.to_ascii_lowercase();
        self.entries
            .iter()
            .position(|d| d.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.entries
                    .iter()
                    .position(|d| d.name.to_ascii_lowercase().contains(&needle))
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effect/registry.rs"]
mod tests;
