//! Named hit volumes attached to one entity.

use garden_defence_core::VolumeHandle;

/// Name of the volume used whenever a pass does not ask for a specific one.
pub const DEFAULT_VOLUME: &str = "default";

/// Name of the volume enemies strike the player with.
pub const WEAPON_VOLUME: &str = "weapon";

/// Ordered map of volume names to scene handles with unique keys.
///
/// A `"default"` entry always exists. When the source does not declare one,
/// the first declared volume doubles as the default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HitVolumes {
    entries: Vec<(String, VolumeHandle)>,
    default_index: usize,
}

impl HitVolumes {
    /// Creates a set holding only the default volume.
    #[must_use]
    pub fn new(default: VolumeHandle) -> Self {
        Self {
            entries: vec![(DEFAULT_VOLUME.to_owned(), default)],
            default_index: 0,
        }
    }

    /// Builds a set from the volumes reported by the spawner. Returns `None` when empty.
    #[must_use]
    pub fn from_spawned(volumes: &[(String, VolumeHandle)]) -> Option<Self> {
        let (first_name, first_handle) = volumes.first()?;
        let mut set = Self {
            entries: vec![(first_name.clone(), *first_handle)],
            default_index: 0,
        };
        for (name, handle) in volumes.iter().skip(1) {
            let _ = set.insert(name, *handle);
        }
        if let Some(index) = set.position(DEFAULT_VOLUME) {
            set.default_index = index;
        }
        Some(set)
    }

    /// Adds or replaces a named volume, returning the handle it replaced.
    pub fn insert(&mut self, name: &str, handle: VolumeHandle) -> Option<VolumeHandle> {
        if let Some(index) = self.position(name) {
            let slot = &mut self.entries[index].1;
            let previous = *slot;
            *slot = handle;
            return Some(previous);
        }
        self.entries.push((name.to_owned(), handle));
        None
    }

    /// Looks up a volume by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<VolumeHandle> {
        self.position(name).map(|index| self.entries[index].1)
    }

    /// The volume used when no specific name is requested.
    #[must_use]
    pub fn default_volume(&self) -> VolumeHandle {
        self.entries[self.default_index].1
    }

    /// Iterates over every volume in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, VolumeHandle)> {
        self.entries
            .iter()
            .map(|(name, handle)| (name.as_str(), *handle))
    }

    /// Number of volumes in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a set holds at least its default volume.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(entry, _)| entry == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, u64)]) -> Vec<(String, VolumeHandle)> {
        pairs
            .iter()
            .map(|(name, id)| ((*name).to_owned(), VolumeHandle::new(*id)))
            .collect()
    }

    #[test]
    fn declared_default_wins_over_first_entry() {
        let volumes = HitVolumes::from_spawned(&named(&[("weapon", 1), ("default", 2)]))
            .expect("non-empty");
        assert_eq!(volumes.default_volume(), VolumeHandle::new(2));
        assert_eq!(volumes.get(WEAPON_VOLUME), Some(VolumeHandle::new(1)));
    }

    #[test]
    fn first_entry_is_implicit_default() {
        let volumes = HitVolumes::from_spawned(&named(&[("post_a", 4), ("post_b", 5)]))
            .expect("non-empty");
        assert_eq!(volumes.default_volume(), VolumeHandle::new(4));
        assert_eq!(volumes.len(), 2);
    }

    #[test]
    fn duplicate_names_keep_unique_keys() {
        let volumes = HitVolumes::from_spawned(&named(&[("default", 1), ("default", 9)]))
            .expect("non-empty");
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes.default_volume(), VolumeHandle::new(9));
    }

    #[test]
    fn empty_spawn_has_no_volumes() {
        assert!(HitVolumes::from_spawned(&[]).is_none());
    }
}
