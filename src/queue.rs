//! Per-guild FIFO of pending tracks

use crate::types::Track;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

/// Ordered queue of tracks waiting to be played
///
/// Positions exposed by this type are 1-based, matching what users see in a
/// queue listing. Duplicate tracks are allowed.
#[derive(Debug, Clone, Default)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track to the tail
    pub fn enqueue(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    /// Remove and return the head
    pub fn dequeue_front(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Jump to position `n`: positions `1..n-1` are dropped and the track at
    /// position `n` is removed and returned
    ///
    /// Returns `None` and leaves the queue untouched when `n` is out of range.
    pub fn dequeue_at(&mut self, n: usize) -> Option<Track> {
        if !self.in_range(n) {
            return None;
        }
        self.tracks.drain(..n - 1);
        self.tracks.pop_front()
    }

    /// Remove and return the track at position `n`, keeping the order of the rest
    pub fn remove_at(&mut self, n: usize) -> Option<Track> {
        if !self.in_range(n) {
            return None;
        }
        self.tracks.remove(n - 1)
    }

    /// Shuffle in place using the thread-local RNG
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    /// Shuffle in place (Fisher-Yates) with the given RNG
    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.tracks.make_contiguous().shuffle(rng);
    }

    /// Drop every pending track, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.tracks.len();
        self.tracks.clear();
        removed
    }

    pub fn size(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Owned copy of the queue contents in play order
    pub fn snapshot(&self) -> Vec<Track> {
        self.tracks.iter().cloned().collect()
    }

    fn in_range(&self, n: usize) -> bool {
        (1..=self.tracks.len()).contains(&n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn track(name: &str) -> Track {
        Track::new(name, 180, "", format!("https://example.com/{}", name))
            .with_stream_locator(format!("https://cdn.example.com/{}.webm", name))
    }

    fn queue_of(names: &[&str]) -> TrackQueue {
        let mut queue = TrackQueue::new();
        for name in names {
            queue.enqueue(track(name));
        }
        queue
    }

    fn titles(queue: &TrackQueue) -> Vec<String> {
        queue.snapshot().iter().map(|t| t.title().to_string()).collect()
    }

    #[test]
    fn fifo_order() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.dequeue_front().unwrap().title(), "a");
        assert_eq!(queue.dequeue_front().unwrap().title(), "b");
        assert_eq!(queue.dequeue_front().unwrap().title(), "c");
        assert!(queue.dequeue_front().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_at_keeps_remaining_order() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.remove_at(2).unwrap().title(), "b");
        assert_eq!(titles(&queue), vec!["a", "c"]);
    }

    #[test]
    fn remove_at_rejects_out_of_range() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.remove_at(0).is_none());
        assert!(queue.remove_at(3).is_none());
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn dequeue_at_drops_the_prefix() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        assert_eq!(queue.dequeue_at(3).unwrap().title(), "c");
        assert_eq!(titles(&queue), vec!["d"]);

        let mut queue = queue_of(&["a", "b"]);
        assert_eq!(queue.dequeue_at(1).unwrap().title(), "a");
        assert_eq!(titles(&queue), vec!["b"]);
    }

    #[test]
    fn dequeue_at_out_of_range_is_a_no_op() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.dequeue_at(0).is_none());
        assert!(queue.dequeue_at(5).is_none());
        assert_eq!(titles(&queue), vec!["a", "b"]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let names: Vec<String> = (0..40).map(|i| format!("t{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut queue = queue_of(&refs);
        queue.enqueue(track("t0")); // duplicate survives shuffling

        let mut before = titles(&queue);
        queue.shuffle_with(&mut StdRng::seed_from_u64(7));
        let mut after = titles(&queue);

        assert_eq!(after.len(), before.len());
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn shuffle_of_empty_queue() {
        let mut queue = TrackQueue::new();
        queue.shuffle();
        assert!(queue.is_empty());
    }

    #[test]
    fn snapshot_is_detached() {
        let queue = queue_of(&["a", "b"]);
        let mut snapshot = queue.snapshot();
        snapshot.clear();
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn clear_reports_count() {
        let mut queue = queue_of(&["a", "b", "c"]);
        assert_eq!(queue.clear(), 3);
        assert_eq!(queue.clear(), 0);
    }
}
