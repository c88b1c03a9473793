// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Union-find over dense indices, with path compression and union by size.

/// See module docs.
#[derive(Clone, Debug, Default)]
pub struct DisjointSets {
    parents: Vec<usize>,
    sizes: Vec<usize>,
}

impl DisjointSets {
    pub fn new(count: usize) -> Self {
        Self {
            parents: (0..count).collect(),
            sizes: vec![1; count],
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Representative of the set containing the element.
    pub fn find(&mut self, element: usize) -> usize {
        let mut root = element;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        // Path compression.
        let mut current = element;
        while self.parents[current] != root {
            let next = self.parents[current];
            self.parents[current] = root;
            current = next;
        }
        root
    }

    /// Merges the sets containing the two elements.
    pub fn merge(&mut self, a: usize, b: usize) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.sizes[root_a] < self.sizes[root_b] {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parents[root_b] = root_a;
        self.sizes[root_a] += self.sizes[root_b];
    }

    /// Number of elements in the set containing the element.
    pub fn set_size(&mut self, element: usize) -> usize {
        let root = self.find(element);
        self.sizes[root]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn singletons_are_their_own_representatives() {
        let mut sets = DisjointSets::new(4);
        for i in 0..4 {
            assert_eq!(sets.find(i), i);
            assert_eq!(sets.set_size(i), 1);
        }
    }

    #[test]
    fn merging_joins_sets_transitively() {
        let mut sets = DisjointSets::new(5);
        sets.merge(0, 1);
        sets.merge(1, 2);
        assert_eq!(sets.find(0), sets.find(2));
        assert_eq!(sets.set_size(2), 3);
        assert_ne!(sets.find(0), sets.find(3));
    }
}
