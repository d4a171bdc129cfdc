// A fixed-capacity window over the most recent events of one partition.
// Newest events sit at the head; once the window is full the oldest one is
// dropped on every insert. Reads go through an optional filter and never
// mutate the window.

use std::collections::VecDeque;

/// Predicate used by every read. `None` means "match everything".
pub type EventFilter<'a, T> = &'a dyn Fn(&T) -> bool;

/// Events that know who caused them.
pub trait Authored {
    fn author_id(&self) -> u64;
}

/// Filter matching events caused by `author_id`.
pub fn by_author<T: Authored>(author_id: u64) -> impl Fn(&T) -> bool {
    move |event| event.author_id() == author_id
}

#[derive(Debug, Clone)]
pub struct EventWindow<T> {
    events: VecDeque<T>,
    capacity: usize,
}

impl<T> EventWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn add(&mut self, event: T) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// The `index`-th (0-based, newest first) event that passes `filter`.
    pub fn get(&self, index: usize, filter: Option<EventFilter<'_, T>>) -> Option<&T> {
        self.events
            .iter()
            .filter(|event| keeps(filter, *event))
            .nth(index)
    }

    /// Every event that passes `filter`, newest first.
    pub fn get_all(&self, filter: Option<EventFilter<'_, T>>) -> Vec<&T> {
        self.events
            .iter()
            .filter(|event| keeps(filter, *event))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }
}

fn keeps<T>(filter: Option<EventFilter<'_, T>>, event: &T) -> bool {
    filter.map_or(true, |keep| keep(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        author: u64,
        text: &'static str,
    }

    impl Authored for Note {
        fn author_id(&self) -> u64 {
            self.author
        }
    }

    fn note(author: u64, text: &'static str) -> Note {
        Note { author, text }
    }

    fn texts(notes: Vec<&Note>) -> Vec<&'static str> {
        notes.into_iter().map(|n| n.text).collect()
    }

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let mut window = EventWindow::new(3);
        for text in ["A", "B", "C", "D"] {
            window.add(note(1, text));
        }

        assert_eq!(texts(window.get_all(None)), vec!["D", "C", "B"]);
    }

    #[test]
    fn test_keeps_most_recent_in_reverse_order() {
        let capacity = 5;
        let mut window = EventWindow::new(capacity);

        for count in 1..=12usize {
            window.add(count);
            assert_eq!(window.len(), count.min(capacity));

            let expected: Vec<usize> = (1..=count).rev().take(capacity).collect();
            let held: Vec<usize> = window.iter().copied().collect();
            assert_eq!(held, expected);
        }
    }

    #[test]
    fn test_get_indexes_into_filtered_view() {
        let mut window = EventWindow::new(10);
        window.add(note(1, "a1"));
        window.add(note(2, "b1"));
        window.add(note(1, "a2"));
        window.add(note(2, "b2"));
        window.add(note(1, "a3"));

        let only_one = by_author::<Note>(1);
        assert_eq!(window.get(0, Some(&only_one)).map(|n| n.text), Some("a3"));
        assert_eq!(window.get(2, Some(&only_one)).map(|n| n.text), Some("a1"));
        assert_eq!(window.get(3, Some(&only_one)), None);

        assert_eq!(window.get(1, None).map(|n| n.text), Some("b2"));
        assert_eq!(window.get(5, None), None);
    }

    #[test]
    fn test_get_all_filters_without_reordering() {
        let mut window = EventWindow::new(10);
        window.add(note(1, "a1"));
        window.add(note(2, "b1"));
        window.add(note(1, "a2"));

        let only_two = by_author::<Note>(2);
        assert_eq!(texts(window.get_all(Some(&only_two))), vec!["b1"]);

        let nobody = |_: &Note| false;
        assert!(window.get_all(Some(&nobody)).is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let mut window = EventWindow::new(0);
        window.add(note(1, "a"));

        assert!(window.is_empty());
        assert_eq!(window.get(0, None), None);
    }
}
