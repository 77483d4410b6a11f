//! Union-find over atom indices with union by size and path compression.

/// Disjoint-set forest. Sets are identified by their root index.
#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    parents: Vec<usize>,
    sizes: Vec<usize>,
}

impl DisjointSet {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self { parents: (0..n).collect(), sizes: vec![1; n] }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Root of the set containing `x`.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parents[root] != root {
            root = self.parents[root];
        }
        let mut cur = x;
        while self.parents[cur] != root {
            let next = self.parents[cur];
            self.parents[cur] = root;
            cur = next;
        }
        root
    }

    pub fn is_root(&self, x: usize) -> bool {
        self.parents[x] == x
    }

    /// Unite the sets containing `a` and `b`; returns the surviving root.
    ///
    /// The larger set absorbs the smaller one. On equal sizes `a`'s root
    /// survives.
    pub fn merge(&mut self, a: usize, b: usize) -> usize {
        let mut ra = self.find(a);
        let mut rb = self.find(b);
        if ra == rb {
            return ra;
        }
        if self.sizes[ra] < self.sizes[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parents[rb] = ra;
        self.sizes[ra] += self.sizes[rb];
        ra
    }

    /// Size of the set containing `x`.
    pub fn node_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.sizes[root]
    }

    /// Reset to singletons.
    pub fn clear(&mut self) {
        for (i, p) in self.parents.iter_mut().enumerate() {
            *p = i;
        }
        self.sizes.fill(1);
    }
}
