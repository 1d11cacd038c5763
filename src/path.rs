//! Paths: ordered sequences of multisets with per position duration weights.

use std::fmt::Display;

use crate::{
    multiset::{Multiset, SetClass},
    unit::norm_proportion,
};

// -------------------------------------------------------------------------------------------------

/// An ordered sequence of [`Multiset`] with an equal length list of positive duration
/// weights. Durations are only normalized when a texture asks for a proportional
/// allocation of its time range.
///
/// Paths are shared by textures: the reference count tracks how many textures use the
/// path. A path may not be deleted while referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    name: String,
    multisets: Vec<Multiset>,
    durations: Vec<f64>,
    ref_count: usize,
}

impl Path {
    /// Create a new path. Multisets must not be empty and durations must be positive and
    /// match the multisets in length.
    pub fn new<S: Into<String>>(
        name: S,
        multisets: Vec<Multiset>,
        durations: Vec<f64>,
    ) -> Result<Self, String> {
        let name = name.into();
        if multisets.is_empty() {
            return Err(format!("invalid path '{}': no multisets", name));
        }
        if multisets.len() != durations.len() {
            return Err(format!(
                "invalid path '{}': {} multisets but {} durations",
                name,
                multisets.len(),
                durations.len()
            ));
        }
        if let Some(duration) = durations.iter().find(|d| !(**d > 0.0)) {
            return Err(format!(
                "invalid path '{}': duration '{}' is not positive",
                name, duration
            ));
        }
        Ok(Self {
            name,
            multisets,
            durations,
            ref_count: 0,
        })
    }

    /// Create a new path with equal durations.
    pub fn from_multisets<S: Into<String>>(
        name: S,
        multisets: Vec<Multiset>,
    ) -> Result<Self, String> {
        let durations = vec![1.0; multisets.len()];
        Self::new(name, multisets, durations)
    }

    /// Create a new path from multiset strings, e.g. `["3-2", "(8,12,21,34)"]`.
    pub fn from_strings<S: Into<String>>(name: S, multisets: &[&str]) -> Result<Self, String> {
        let multisets = multisets
            .iter()
            .map(|s| Multiset::try_from(*s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_multisets(name, multisets)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn is_empty(&self) -> bool {
        self.multisets.is_empty()
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.multisets.len()
    }

    pub fn multisets(&self) -> &[Multiset] {
        &self.multisets
    }

    pub fn multiset(&self, index: usize) -> Option<&Multiset> {
        self.multisets.get(index)
    }

    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    /// Replace all duration weights.
    pub fn set_durations(&mut self, durations: Vec<f64>) -> Result<(), String> {
        let path = Self::new(self.name.clone(), self.multisets.clone(), durations)?;
        self.durations = path.durations;
        Ok(())
    }

    /// Durations normalized to unit proportions.
    pub fn duration_percent(&self) -> Vec<f64> {
        norm_proportion(&self.durations).unwrap_or_else(|_| {
            vec![1.0 / self.durations.len().max(1) as f64; self.durations.len()]
        })
    }

    /// Distribute the time range `(start, end)` over all positions, proportionally to
    /// their durations.
    pub fn time_ranges(&self, start: f64, end: f64) -> Vec<(f64, f64)> {
        let span = end - start;
        let mut time = start;
        self.duration_percent()
            .into_iter()
            .map(|percent| {
                let range = (time, time + span * percent);
                time = range.1;
                range
            })
            .collect()
    }

    /// Pitch space values per position.
    pub fn pitch_groups(&self) -> Vec<Vec<f64>> {
        self.multisets.iter().map(Multiset::ps).collect()
    }

    /// Pitch class values per position.
    pub fn pitch_class_groups(&self) -> Vec<Vec<f64>> {
        self.multisets.iter().map(Multiset::pcs).collect()
    }

    /// Set classes per position, under Tn or TnI classification.
    pub fn set_classes(&self, tni: bool) -> Vec<SetClass> {
        self.multisets.iter().map(|m| m.set_class(tni)).collect()
    }

    fn check_index(&self, index: usize) -> Result<(), String> {
        if index >= self.multisets.len() {
            return Err(format!(
                "invalid position '{}' for path '{}' with {} positions",
                index,
                self.name,
                self.multisets.len()
            ));
        }
        Ok(())
    }

    pub fn append(&mut self, multiset: Multiset, duration: f64) -> Result<(), String> {
        self.insert(self.multisets.len(), multiset, duration)
    }

    /// Insert a multiset of any cardinality before position `index`.
    pub fn insert(
        &mut self,
        index: usize,
        multiset: Multiset,
        duration: f64,
    ) -> Result<(), String> {
        if index > self.multisets.len() {
            return Err(format!(
                "invalid position '{}' for path '{}' with {} positions",
                index,
                self.name,
                self.multisets.len()
            ));
        }
        if !(duration > 0.0) {
            return Err(format!("invalid path duration '{}'", duration));
        }
        self.multisets.insert(index, multiset);
        self.durations.insert(index, duration);
        Ok(())
    }

    /// Replace the multiset at `index` with one of the same cardinality.
    pub fn replace(&mut self, index: usize, multiset: Multiset) -> Result<(), String> {
        self.check_index(index)?;
        if self.multisets[index].len() != multiset.len() {
            return Err(format!(
                "invalid multiset '{}': cardinality must be {}",
                multiset,
                self.multisets[index].len()
            ));
        }
        self.multisets[index] = multiset;
        Ok(())
    }

    /// Remove the position at `index`. A path can not become empty.
    pub fn delete(&mut self, index: usize) -> Result<(), String> {
        self.check_index(index)?;
        if self.multisets.len() == 1 {
            return Err(format!(
                "can not delete the last position of path '{}'",
                self.name
            ));
        }
        self.multisets.remove(index);
        self.durations.remove(index);
        Ok(())
    }

    /// Reverse multiset and duration order.
    pub fn retrograde(&mut self) {
        self.multisets.reverse();
        self.durations.reverse();
    }

    /// Cyclically shift multisets and durations so that position `k` comes first.
    pub fn rotate(&mut self, k: i64) {
        let shift = k.rem_euclid(self.multisets.len().max(1) as i64) as usize;
        self.multisets.rotate_left(shift);
        self.durations.rotate_left(shift);
    }

    /// A new unreferenced path with positions `start..end`.
    pub fn slice<S: Into<String>>(
        &self,
        name: S,
        start: usize,
        end: usize,
    ) -> Result<Self, String> {
        if start >= end || end > self.multisets.len() {
            return Err(format!(
                "invalid slice '{}..{}' for path '{}' with {} positions",
                start,
                end,
                self.name,
                self.multisets.len()
            ));
        }
        Self::new(
            name,
            self.multisets[start..end].to_vec(),
            self.durations[start..end].to_vec(),
        )
    }

    pub fn transpose_at(&mut self, index: usize, semitones: f64) -> Result<(), String> {
        self.check_index(index)?;
        self.multisets[index] = self.multisets[index].transposed(semitones);
        Ok(())
    }

    /// Invert the multiset at `index` around pitch space 0.
    pub fn invert_at(&mut self, index: usize) -> Result<(), String> {
        self.check_index(index)?;
        self.multisets[index] = self.multisets[index].inverted(Some(0.0));
        Ok(())
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn ref_increment(&mut self) {
        self.ref_count += 1;
    }

    pub fn ref_decrement(&mut self) {
        self.ref_count = self.ref_count.saturating_sub(1);
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let multisets = self
            .multisets
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}: {}", self.name, multisets.join(", "))
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn path() -> Result<Path, String> {
        Path::new(
            "a",
            vec![
                Multiset::try_from("3-2")?,
                Multiset::try_from("8,12,21,34")?,
                Multiset::try_from("c4,e4")?,
            ],
            vec![1.0, 2.0, 1.0],
        )
    }

    #[test]
    fn construction() -> Result<(), String> {
        let path = path()?;
        assert_eq!(path.len(), 3);
        assert_eq!(path.duration_percent(), vec![0.25, 0.5, 0.25]);
        assert_eq!(
            path.time_ranges(0.0, 20.0),
            vec![(0.0, 5.0), (5.0, 15.0), (15.0, 20.0)]
        );
        assert_eq!(path.pitch_groups()[1], vec![8.0, 12.0, 21.0, 34.0]);
        assert_eq!(path.pitch_class_groups()[1], vec![8.0, 0.0, 9.0, 10.0]);
        assert_eq!(path.set_classes(false)[0].to_string(), "3-2A");
        assert!(Path::new("b", vec![], vec![]).is_err());
        assert!(Path::new("b", vec![Multiset::try_from("0")?], vec![0.0]).is_err());
        assert!(Path::new("b", vec![Multiset::try_from("0")?], vec![1.0, 1.0]).is_err());
        Ok(())
    }

    #[test]
    fn retrograde_and_rotation() -> Result<(), String> {
        let original = path()?;
        let mut path = original.clone();
        path.retrograde();
        assert_eq!(path.durations(), &[1.0, 2.0, 1.0]);
        assert_eq!(path.pitch_groups()[0], vec![0.0, 4.0]);
        path.retrograde();
        assert_eq!(path, original);
        path.rotate(0);
        assert_eq!(path, original);
        path.rotate(1);
        assert_eq!(path.durations(), &[2.0, 1.0, 1.0]);
        path.rotate(original.len() as i64 - 1);
        assert_eq!(path, original);
        Ok(())
    }

    #[test]
    fn edits() -> Result<(), String> {
        let mut path = path()?;
        assert!(path.replace(0, Multiset::try_from("0,1")?).is_err());
        path.replace(0, Multiset::try_from("0,1,2")?)?;
        path.insert(1, Multiset::try_from("5")?, 3.0)?;
        assert_eq!(path.len(), 4);
        path.delete(1)?;
        path.transpose_at(2, 12.0)?;
        assert_eq!(path.pitch_groups()[2], vec![12.0, 16.0]);
        path.invert_at(2)?;
        assert_eq!(path.pitch_groups()[2], vec![-12.0, -16.0]);
        assert!(path.transpose_at(3, 1.0).is_err());
        let slice = path.slice("b", 1, 3)?;
        assert_eq!(slice.durations(), &[2.0, 1.0]);
        assert!(path.slice("b", 2, 2).is_err());
        path.ref_increment();
        path.ref_decrement();
        path.ref_decrement();
        assert_eq!(path.ref_count(), 0);
        Ok(())
    }
}
