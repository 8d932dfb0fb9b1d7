//! LRU List Module
//!
//! Intrusive doubly linked list used to order cache entries by recency.
//!
//! Nodes live in a slab (`Vec`) and link to each other by index, so moving,
//! removing and popping are all O(1) once the caller knows a node's index.

// == Node ==
#[derive(Debug)]
struct Node<T> {
    key: String,
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Recency-ordered list of keyed values.
///
/// - Head = least recently used (next eviction candidate)
/// - Tail = most recently used
#[derive(Debug)]
pub struct LruList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for LruList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LruList<T> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    // == Push Back ==
    /// Appends a node at the most recently used end and returns its index.
    pub fn push_back(&mut self, key: String, value: T) -> usize {
        let node = Node {
            key,
            value,
            prev: self.tail,
            next: None,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
        idx
    }

    // == Move To Back ==
    /// Marks the node at `idx` as most recently used.
    pub fn move_to_back(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);

        let old_tail = self.tail;
        {
            let node = self.node_mut(idx);
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    // == Remove ==
    /// Unlinks the node at `idx` and returns its key and value.
    pub fn remove(&mut self, idx: usize) -> Option<(String, T)> {
        self.slots.get(idx)?.as_ref()?;
        self.unlink(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.len -= 1;
        Some((node.key, node.value))
    }

    // == Pop Front ==
    /// Removes and returns the least recently used node.
    pub fn pop_front(&mut self) -> Option<(String, T)> {
        let head = self.head?;
        self.remove(head)
    }

    // == Peek Front ==
    /// Returns the least recently used key without removing it.
    pub fn peek_front(&self) -> Option<&str> {
        self.head.map(|idx| self.node(idx).key.as_str())
    }

    // == Accessors ==
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.slots.get(idx)?.as_ref().map(|node| &node.value)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.slots.get_mut(idx)?.as_mut().map(|node| &mut node.value)
    }

    /// Returns the number of linked nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates keys from least to most recently used.
    pub fn keys(&self) -> Keys<'_, T> {
        Keys {
            list: self,
            cursor: self.head,
        }
    }

    // == Internal Linking ==
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn node(&self, idx: usize) -> &Node<T> {
        self.slots[idx]
            .as_ref()
            .expect("linked index points at a vacant slot")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<T> {
        self.slots[idx]
            .as_mut()
            .expect("linked index points at a vacant slot")
    }
}

// == Key Iterator ==
pub struct Keys<'a, T> {
    list: &'a LruList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Keys<'a, T> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?);
        self.cursor = node.next;
        Some(node.key.as_str())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys_of<T>(list: &LruList<T>) -> Vec<&str> {
        list.keys().collect()
    }

    #[test]
    fn test_lru_new() {
        let lru: LruList<()> = LruList::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
        assert_eq!(lru.peek_front(), None);
    }

    #[test]
    fn test_lru_push_back_orders_oldest_first() {
        let mut lru = LruList::new();
        lru.push_back("key1".to_string(), 1);
        lru.push_back("key2".to_string(), 2);
        lru.push_back("key3".to_string(), 3);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_front(), Some("key1"));
        assert_eq!(keys_of(&lru), vec!["key1", "key2", "key3"]);
    }

    #[test]
    fn test_lru_move_to_back() {
        let mut lru = LruList::new();
        let a = lru.push_back("a".to_string(), ());
        lru.push_back("b".to_string(), ());
        let c = lru.push_back("c".to_string(), ());

        lru.move_to_back(a);
        assert_eq!(keys_of(&lru), vec!["b", "c", "a"]);

        // Already most recent: no change
        lru.move_to_back(a);
        assert_eq!(keys_of(&lru), vec!["b", "c", "a"]);

        lru.move_to_back(c);
        assert_eq!(keys_of(&lru), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_lru_pop_front() {
        let mut lru = LruList::new();
        lru.push_back("key1".to_string(), 1);
        lru.push_back("key2".to_string(), 2);

        assert_eq!(lru.pop_front(), Some(("key1".to_string(), 1)));
        assert_eq!(lru.pop_front(), Some(("key2".to_string(), 2)));
        assert_eq!(lru.pop_front(), None);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_lru_remove_middle() {
        let mut lru = LruList::new();
        lru.push_back("a".to_string(), 'a');
        let b = lru.push_back("b".to_string(), 'b');
        lru.push_back("c".to_string(), 'c');

        assert_eq!(lru.remove(b), Some(("b".to_string(), 'b')));
        assert_eq!(lru.len(), 2);
        assert_eq!(keys_of(&lru), vec!["a", "c"]);

        // Removing a vacant slot is a no-op
        assert_eq!(lru.remove(b), None);
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_lru_reuses_freed_slots() {
        let mut lru = LruList::with_capacity(2);
        let a = lru.push_back("a".to_string(), 1);
        lru.push_back("b".to_string(), 2);
        lru.remove(a);

        let c = lru.push_back("c".to_string(), 3);
        assert_eq!(c, a);
        assert_eq!(lru.get(c), Some(&3));
        assert_eq!(keys_of(&lru), vec!["b", "c"]);
    }

    #[test]
    fn test_lru_get_mut() {
        let mut lru = LruList::new();
        let a = lru.push_back("a".to_string(), 1);
        *lru.get_mut(a).unwrap() = 10;
        assert_eq!(lru.get(a), Some(&10));
    }

    #[test]
    fn test_lru_order_after_multiple_touches() {
        let mut lru = LruList::new();
        let a = lru.push_back("a".to_string(), ());
        let b = lru.push_back("b".to_string(), ());
        let c = lru.push_back("c".to_string(), ());

        lru.move_to_back(a);
        lru.move_to_back(c);
        lru.move_to_back(b);

        assert_eq!(lru.pop_front().map(|(k, _)| k), Some("a".to_string()));
        assert_eq!(lru.pop_front().map(|(k, _)| k), Some("c".to_string()));
        assert_eq!(lru.pop_front().map(|(k, _)| k), Some("b".to_string()));
    }

    #[test]
    fn test_lru_single_node_remove_resets_ends() {
        let mut lru = LruList::new();
        let a = lru.push_back("a".to_string(), ());
        lru.remove(a);
        assert_eq!(lru.peek_front(), None);

        lru.push_back("b".to_string(), ());
        assert_eq!(keys_of(&lru), vec!["b"]);
    }
}
