/// Index of a node in the `RecencyList` arena.
pub(crate) type NodeIndex = usize;

/// Sentinel for null links.
const NIL: NodeIndex = usize::MAX;

struct Node<K> {
    /// `None` while the node sits in the free list.
    key: Option<K>,
    /// Towards the most recently used end.
    prev: NodeIndex,
    /// Towards the least recently used end.
    next: NodeIndex,
}

/// Doubly linked list of keys in recency order, addressed by index.
///
/// Nodes live in a contiguous arena. Removed nodes are recycled through a free
/// list, so indices handed out by `push_front` stay valid until that node is
/// removed. `head` is the most recently used key, `tail` the least.
pub(crate) struct RecencyList<K> {
    arena: Vec<Node<K>>,
    free_list: Vec<NodeIndex>,
    head: NodeIndex,
    tail: NodeIndex,
    len: usize,
}

impl<K> RecencyList<K> {
    pub(crate) fn new() -> Self {
        Self {
            arena: Vec::new(),
            free_list: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Insert key as the most recently used.
    pub(crate) fn push_front(&mut self, key: K) -> NodeIndex {
        let node = Node {
            key: Some(key),
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.arena[idx] = node;
                idx
            }
            None => {
                self.arena.push(node);
                self.arena.len() - 1
            }
        };
        self.attach_front(idx);
        self.len += 1;
        idx
    }

    /// Mark the node as the most recently used.
    pub(crate) fn move_to_front(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }
        self.detach(idx);
        self.attach_front(idx);
    }

    /// Remove and return the least recently used key.
    pub(crate) fn pop_back(&mut self) -> Option<K> {
        if self.tail == NIL {
            return None;
        }
        Some(self.remove(self.tail))
    }

    pub(crate) fn remove(&mut self, idx: NodeIndex) -> K {
        self.detach(idx);
        self.free_list.push(idx);
        self.len -= 1;
        match self.arena[idx].key.take() {
            Some(key) => key,
            None => unreachable!("removed a free node"),
        }
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_, K> {
        Iter {
            list: self,
            cur: self.head,
        }
    }

    fn detach(&mut self, idx: NodeIndex) {
        let Node { prev, next, .. } = self.arena[idx];

        if prev != NIL {
            self.arena[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.arena[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.arena[idx].prev = NIL;
        self.arena[idx].next = NIL;
    }

    fn attach_front(&mut self, idx: NodeIndex) {
        self.arena[idx].prev = NIL;
        self.arena[idx].next = self.head;
        if self.head != NIL {
            self.arena[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

#[cfg(test)]
pub(crate) struct Iter<'a, K> {
    list: &'a RecencyList<K>,
    cur: NodeIndex,
}

#[cfg(test)]
impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == NIL {
            return None;
        }
        let node = &self.list.arena[self.cur];
        self.cur = node.next;
        node.key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{distributions::Uniform, prelude::*};
    use std::collections::{HashMap, VecDeque};

    fn keys(list: &RecencyList<u32>) -> Vec<u32> {
        list.iter().copied().collect()
    }

    #[test]
    fn push_and_pop_in_lru_order() {
        let mut list = RecencyList::new();
        list.push_front(1);
        list.push_front(2);
        list.push_front(3);
        assert_eq!(keys(&list), vec![3, 2, 1]);
        assert_eq!(list.pop_back(), Some(1));
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_back(), Some(3));
        assert_eq!(list.pop_back(), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn move_to_front_reorders() {
        let mut list = RecencyList::new();
        let n1 = list.push_front(1);
        let n2 = list.push_front(2);
        list.push_front(3);

        list.move_to_front(n1);
        assert_eq!(keys(&list), vec![1, 3, 2]);
        list.move_to_front(n1);
        assert_eq!(keys(&list), vec![1, 3, 2]);
        list.move_to_front(n2);
        assert_eq!(keys(&list), vec![2, 1, 3]);
        assert_eq!(list.pop_back(), Some(3));
    }

    #[test]
    fn removed_nodes_are_recycled() {
        let mut list = RecencyList::new();
        let n1 = list.push_front(1);
        list.push_front(2);
        assert_eq!(list.remove(n1), 1);

        let n3 = list.push_front(3);
        assert_eq!(n3, n1);
        assert_eq!(list.arena.len(), 2);
        assert_eq!(keys(&list), vec![3, 2]);
    }

    #[test]
    fn matches_model_under_random_ops() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut list = RecencyList::new();
        let mut idx = HashMap::new();
        // Front is most recently used.
        let mut model: VecDeque<u32> = VecDeque::new();

        for _ in 0..10000 {
            let key = rng.sample(Uniform::new(0, 32));
            match rng.sample(Uniform::new(0, 4)) {
                0 | 1 => {
                    if let Some(&n) = idx.get(&key) {
                        list.move_to_front(n);
                        model.retain(|&k| k != key);
                    } else {
                        idx.insert(key, list.push_front(key));
                    }
                    model.push_front(key);
                }
                2 => {
                    if let Some(n) = idx.remove(&key) {
                        assert_eq!(list.remove(n), key);
                        model.retain(|&k| k != key);
                    }
                }
                _ => {
                    let popped = list.pop_back();
                    assert_eq!(popped, model.pop_back());
                    if let Some(k) = popped {
                        idx.remove(&k);
                    }
                }
            }

            assert_eq!(list.len(), model.len());
            assert_eq!(list.len(), idx.len());
        }

        assert_eq!(keys(&list), model.into_iter().collect::<Vec<_>>());
        assert!(list.arena.len() <= 32);
    }
}
