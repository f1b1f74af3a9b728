//! An explicit parse tree, built from the parser's callbacks.
//!
//! Nodes live in an arena and refer to each other by `NodeId`, so a node
//! keeps its identity while the tree grows around it and the parent link
//! is a plain index rather than an owning pointer. Every node carries a
//! caller-chosen payload `T`, filled in later by the evaluator.
use super::grammar::ParseCallbacks;
use super::token::{Position, Rule, Token, TokenType, EMPTY};

/// Symbol of the synthetic node that owns the whole derivation.
pub const ROOT: &str = "<root>";

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct Node<T> {
    pub symbol: TokenType,
    pub payload: T,
    raw: Option<String>,
    position: Option<Position>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct ParseTree<T> {
    nodes: Vec<Node<T>>,
    // Leaves still waiting for a rule or a token, right-most first, so the
    // left-most one sits at the end of the vector.
    open: Vec<NodeId>,
}

impl<T: Default> Default for ParseTree<T> {
    fn default() -> Self {
        ParseTree::new()
    }
}

impl<T: Default> ParseTree<T> {
    pub fn new() -> Self {
        let mut tree = ParseTree {
            nodes: Vec::new(),
            open: Vec::new(),
        };
        tree.make_node(ROOT, None);
        tree
    }

    fn make_node(&mut self, symbol: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            symbol: symbol.to_owned(),
            payload: T::default(),
            raw: None,
            position: None,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Moves the payload out of `id`, leaving the default behind.
    pub fn take_payload(&mut self, id: NodeId) -> T {
        std::mem::take(&mut self.nodes[id.0].payload)
    }
}

impl<T> ParseTree<T> {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Every node id, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub fn symbol(&self, id: NodeId) -> &str {
        &self.nodes[id.0].symbol
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Lexeme of the token matched by a terminal leaf.
    pub fn raw(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.0].raw.as_deref()
    }

    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.nodes[id.0].position
    }

    pub fn payload(&self, id: NodeId) -> &T {
        &self.nodes[id.0].payload
    }

    pub fn payload_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].payload
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let children = self.children(id);
            if children.is_empty() {
                out.push(id);
            } else {
                stack.extend(children.iter().rev());
            }
        }
        out
    }

    /// The matched lexemes, read left to right.
    pub fn frontier(&self) -> Vec<&str> {
        self.leaves().into_iter().filter_map(|id| self.raw(id)).collect()
    }

    /// Number of edges between the root and `id`.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut at = id;
        while let Some(parent) = self.parent(at) {
            depth += 1;
            at = parent;
        }
        depth
    }
}

impl<T: Default> ParseCallbacks for ParseTree<T> {
    /// Expands the left-most open leaf labelled `rule.lhs`. With no such
    /// leaf, as for the very first rule, the expansion hangs off the root.
    fn recv_rule(&mut self, rule: &Rule) {
        let found = self
            .open
            .iter()
            .rposition(|&id| self.nodes[id.0].symbol == rule.lhs);
        let (branch, slot) = match found {
            Some(slot) => (self.open.remove(slot), slot),
            None => {
                let root = self.root();
                (self.make_node(&rule.lhs, Some(root)), 0)
            }
        };

        let mut fresh = Vec::with_capacity(rule.rhs.len());
        for symbol in &rule.rhs {
            let child = self.make_node(symbol, Some(branch));
            // An EMPTY leaf never receives anything.
            if symbol != EMPTY {
                fresh.push(child);
            }
        }
        self.open.splice(slot..slot, fresh.into_iter().rev());
    }

    /// Fills the left-most open leaf of the token's type.
    fn recv_token(&mut self, token: &Token) {
        let found = self
            .open
            .iter()
            .rposition(|&id| self.nodes[id.0].symbol == token.kind);
        match found {
            Some(slot) => {
                let id = self.open.remove(slot);
                let node = &mut self.nodes[id.0];
                node.raw = Some(token.lexeme.clone());
                node.position = Some(token.position);
            }
            None => warn!("token {} has no open leaf to fill", token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::grammar::read_grammar;

    fn tok(kind: &str, lexeme: &str) -> Token {
        Token::new(kind, lexeme, Position::new(1, 1))
    }

    #[test]
    fn test_single_terminal_shape() {
        let g = read_grammar("start = \"a\" start | ;").unwrap();
        let mut tree: ParseTree<()> = ParseTree::new();
        g.parse_tokens(&[tok("a", "a")], &mut tree).unwrap();

        let root = tree.root();
        assert_eq!(tree.children(root).len(), 1);
        let start = tree.children(root)[0];
        assert_eq!(tree.symbol(start), "start");

        let kids: Vec<&str> = tree.children(start).iter().map(|&c| tree.symbol(c)).collect();
        assert_eq!(kids, vec!["a", "start"]);
        let a = tree.children(start)[0];
        assert_eq!(tree.raw(a), Some("a"));
        assert_eq!(tree.depth(a), 2);
        assert_eq!(tree.parent(a), Some(start));

        let inner = tree.children(start)[1];
        assert_eq!(tree.symbol(tree.children(inner)[0]), EMPTY);

        assert_eq!(tree.frontier(), vec!["a"]);
    }

    #[test]
    fn test_frontier_reproduces_input() {
        let g = read_grammar("start = pair start | ; pair = \"x\" \"y\" | \"x\" \"x\" \"z\" ;");
        // Not LL(1): both alternatives of `pair` begin with x.
        assert!(g.is_err());

        let g = read_grammar("start = pair start | ; pair = \"x\" tail ; tail = \"y\" | \"x\" \"z\" ;")
            .unwrap();
        let input = [
            tok("x", "x1"),
            tok("y", "y1"),
            tok("x", "x2"),
            tok("x", "x3"),
            tok("z", "z1"),
        ];
        let mut tree: ParseTree<()> = ParseTree::new();
        g.parse_tokens(&input, &mut tree).unwrap();
        assert_eq!(tree.frontier(), vec!["x1", "y1", "x2", "x3", "z1"]);
    }

    #[test]
    fn test_nodes_keep_identity() {
        let g = read_grammar("start = \"a\" start | ;").unwrap();
        let mut tree: ParseTree<u32> = ParseTree::new();
        g.parse_tokens(&[tok("a", "a"), tok("a", "b")], &mut tree).unwrap();
        for leaf in tree.leaves() {
            *tree.payload_mut(leaf) += 1;
        }
        let marked = tree.ids().filter(|&id| *tree.payload(id) == 1).count();
        assert_eq!(marked, tree.leaves().len());
        assert_eq!(tree.frontier(), vec!["a", "b"]);
    }
}
