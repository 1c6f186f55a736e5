//! Derivation trees.
//!
//! A derivation tree records which alternative produced each part of an
//! input. Trees support exact structural equality; two inputs derived
//! through different alternatives compare unequal even when they render
//! to the same raw string.

/// The parse structure of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationTree {
    /// An expanded nonterminal: which alternative was chosen and the
    /// subtrees for each symbol of that alternative.
    Expansion {
        /// The nonterminal name, e.g. `<entity>`.
        symbol: String,
        /// Index into the grammar's ordered alternative list.
        alternative: usize,
        /// One subtree per symbol of the chosen alternative.
        children: Vec<DerivationTree>,
    },
    /// Literal text produced by a terminal symbol.
    Leaf {
        /// The matched text (may be empty for epsilon productions).
        text: String,
    },
}

impl DerivationTree {
    /// Render the tree back to the raw string it derives.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        match self {
            DerivationTree::Leaf { text } => out.push_str(text),
            DerivationTree::Expansion { children, .. } => {
                for child in children {
                    child.render_into(out);
                }
            }
        }
    }

    /// The nonterminal name if this node is an expansion.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            DerivationTree::Expansion { symbol, .. } => Some(symbol),
            DerivationTree::Leaf { .. } => None,
        }
    }

    /// The chosen alternative index if this node is an expansion.
    pub fn alternative(&self) -> Option<usize> {
        match self {
            DerivationTree::Expansion { alternative, .. } => Some(*alternative),
            DerivationTree::Leaf { .. } => None,
        }
    }

    /// Pre-order traversal over all nodes, including leaves.
    pub fn nodes(&self) -> Vec<&DerivationTree> {
        let mut out = Vec::new();
        self.collect_nodes(&mut out);
        out
    }

    fn collect_nodes<'a>(&'a self, out: &mut Vec<&'a DerivationTree>) {
        out.push(self);
        if let DerivationTree::Expansion { children, .. } = self {
            for child in children {
                child.collect_nodes(out);
            }
        }
    }

    /// All expansion nodes labeled with the given nonterminal.
    pub fn find_all(&self, nonterminal: &str) -> Vec<&DerivationTree> {
        self.nodes()
            .into_iter()
            .filter(|n| n.symbol() == Some(nonterminal))
            .collect()
    }

    /// True if any node in the tree expands the given nonterminal.
    pub fn contains(&self, nonterminal: &str) -> bool {
        match self {
            DerivationTree::Leaf { .. } => false,
            DerivationTree::Expansion {
                symbol, children, ..
            } => symbol == nonterminal || children.iter().any(|c| c.contains(nonterminal)),
        }
    }

    /// Number of nodes in pre-order (used to address subtrees by index).
    pub fn node_count(&self) -> usize {
        match self {
            DerivationTree::Leaf { .. } => 1,
            DerivationTree::Expansion { children, .. } => {
                1 + children.iter().map(|c| c.node_count()).sum::<usize>()
            }
        }
    }

    /// A copy of this tree with the pre-order node at `index` replaced.
    ///
    /// Index 0 is the root. Returns `None` when the index is out of range.
    pub fn with_replacement(
        &self,
        index: usize,
        replacement: &DerivationTree,
    ) -> Option<DerivationTree> {
        let mut remaining = index;
        self.replace_walk(&mut remaining, replacement)
    }

    fn replace_walk(
        &self,
        remaining: &mut usize,
        replacement: &DerivationTree,
    ) -> Option<DerivationTree> {
        if *remaining == 0 {
            return Some(replacement.clone());
        }
        *remaining -= 1;
        match self {
            DerivationTree::Leaf { .. } => None,
            DerivationTree::Expansion {
                symbol,
                alternative,
                children,
            } => {
                for (i, child) in children.iter().enumerate() {
                    let before = *remaining;
                    if let Some(new_child) = child.replace_walk(remaining, replacement) {
                        let mut new_children = children.clone();
                        new_children[i] = new_child;
                        return Some(DerivationTree::Expansion {
                            symbol: symbol.clone(),
                            alternative: *alternative,
                            children: new_children,
                        });
                    }
                    // replace_walk consumed (before - remaining) nodes.
                    debug_assert!(*remaining <= before);
                }
                None
            }
        }
    }
}
