//! Keyframe storage.
//!
//! Three parallel arrays (times, values, easings) kept sorted by time.
//! Lookups seed from a cached index so sequential playback stays O(1).

use crate::properties::PropertyValue;

use super::EaseType;

/// Index sentinel for "no adjacent keyframe on this side".
pub const NO_KEYFRAME: usize = usize::MAX;

/// One keyframe: time from clip start in 90 kHz ticks, the value, and the
/// easing applied on the segment leading out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub time_from_start: i64,
    pub value: PropertyValue,
    pub ease_type: EaseType,
}

/// Ordered keyframe store with a cached search index.
#[derive(Debug, Clone, Default)]
pub struct KeyframeData {
    times: Vec<i64>,
    values: Vec<PropertyValue>,
    easings: Vec<EaseType>,
    cached_index: std::cell::Cell<usize>,
}

impl KeyframeData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn clear(&mut self) {
        self.times.clear();
        self.values.clear();
        self.easings.clear();
        self.cached_index.set(0);
    }

    /// Inserts a keyframe, maintaining time order.
    pub fn add(&mut self, frame: Keyframe) {
        let index = self.times.partition_point(|&t| t < frame.time_from_start);
        self.times.insert(index, frame.time_from_start);
        self.values.insert(index, frame.value);
        self.easings.insert(index, frame.ease_type);
        self.cached_index.set(0);
    }

    /// Removes the keyframe at `index`; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) {
        if index < self.len() {
            self.times.remove(index);
            self.values.remove(index);
            self.easings.remove(index);
            self.cached_index.set(0);
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Keyframe> {
        Some(Keyframe {
            time_from_start: *self.times.get(index)?,
            value: self.values.get(index)?.clone(),
            ease_type: *self.easings.get(index)?,
        })
    }

    /// Span between the first and last keyframe.
    #[must_use]
    pub fn duration(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.times[self.len() - 1] - self.times[0]
        }
    }

    /// Time of the last keyframe (clip-relative end).
    #[must_use]
    pub fn absolute_end_time(&self) -> i64 {
        self.times.last().copied().unwrap_or(0)
    }

    /// Returns `(prev, next)` adjacency for `time`: `prev == NO_KEYFRAME`
    /// before the first keyframe, `next == NO_KEYFRAME` at or after the
    /// last, otherwise the bracketing pair. The cached index seeds the next
    /// lookup for temporal locality.
    #[must_use]
    pub fn find_keyframe_indices(&self, time: i64) -> (usize, usize) {
        if self.is_empty() {
            return (NO_KEYFRAME, NO_KEYFRAME);
        }

        let start = self.cached_index.get().min(self.len() - 1);
        let index = if time >= self.times[start] {
            // Search forward from the cached position.
            start + self.times[start..].partition_point(|&t| t <= time)
        } else {
            self.times.partition_point(|&t| t <= time)
        };
        let prev = index.saturating_sub(1);
        self.cached_index.set(prev);

        if time < self.times[0] {
            return (NO_KEYFRAME, 0);
        }
        if time >= self.times[self.len() - 1] {
            return (self.len() - 1, NO_KEYFRAME);
        }
        (prev, prev + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(t: i64, v: f32) -> Keyframe {
        Keyframe {
            time_from_start: t,
            value: PropertyValue::F32(v),
            ease_type: EaseType::Linear,
        }
    }

    #[test]
    fn insertion_keeps_time_order() {
        let mut data = KeyframeData::new();
        data.add(frame(300, 3.0));
        data.add(frame(100, 1.0));
        data.add(frame(200, 2.0));
        assert_eq!(data.times(), &[100, 200, 300]);
    }

    #[test]
    fn adjacency_across_all_regions() {
        let mut data = KeyframeData::new();
        data.add(frame(100, 1.0));
        data.add(frame(200, 2.0));
        data.add(frame(300, 3.0));

        assert_eq!(data.find_keyframe_indices(50), (NO_KEYFRAME, 0));
        assert_eq!(data.find_keyframe_indices(100), (0, 1));
        assert_eq!(data.find_keyframe_indices(150), (0, 1));
        assert_eq!(data.find_keyframe_indices(250), (1, 2));
        assert_eq!(data.find_keyframe_indices(300), (2, NO_KEYFRAME));
        assert_eq!(data.find_keyframe_indices(400), (2, NO_KEYFRAME));
    }

    #[test]
    fn cached_index_survives_backwards_jump() {
        let mut data = KeyframeData::new();
        for i in 0..10 {
            data.add(frame(i * 100, i as f32));
        }
        assert_eq!(data.find_keyframe_indices(850), (8, 9));
        // Loop reset: jump back before the cache position
        assert_eq!(data.find_keyframe_indices(150), (1, 2));
    }

    #[test]
    fn remove_resets_adjacency() {
        let mut data = KeyframeData::new();
        data.add(frame(100, 1.0));
        data.add(frame(200, 2.0));
        data.remove(0);
        assert_eq!(data.times(), &[200]);
        assert_eq!(data.find_keyframe_indices(250), (0, NO_KEYFRAME));
    }
}
