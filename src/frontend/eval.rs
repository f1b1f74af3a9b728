//! Bottom-up evaluation over a finished parse tree.
use super::tree::{NodeId, ParseTree};

/// Calls `action` once on every node, each node strictly after all of its
/// children.
///
/// Every node counts its unfinished children. Leaves start out eligible;
/// finishing a node decrements its parent's count, and a parent whose
/// count reaches zero becomes eligible. Eligible nodes are kept on a stack
/// seeded with the leaves in left-to-right order, which makes the visit a
/// right-to-left post-order: of two sibling subtrees, the right one is
/// always finished first. Semantic actions that number things from the
/// end of the program rely on this.
///
/// Stops at the first error returned by `action`.
pub fn evaluate_bottom_up<T, E, F>(tree: &mut ParseTree<T>, mut action: F) -> Result<(), E>
where
    F: FnMut(&mut ParseTree<T>, NodeId) -> Result<(), E>,
{
    let mut remaining: Vec<usize> = tree.ids().map(|id| tree.children(id).len()).collect();
    let mut eligible = tree.leaves();
    let mut visited = 0;

    while let Some(id) = eligible.pop() {
        action(tree, id)?;
        visited += 1;
        if let Some(parent) = tree.parent(id) {
            let count = &mut remaining[parent.index()];
            *count -= 1;
            if *count == 0 {
                eligible.push(parent);
            }
        }
    }

    debug_assert_eq!(visited, tree.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::grammar::read_grammar;
    use crate::frontend::token::{Position, Token};

    fn tok(kind: &str, lexeme: &str) -> Token {
        Token::new(kind, lexeme, Position::new(1, 1))
    }

    fn build(tokens: &[Token]) -> ParseTree<Vec<String>> {
        let g = read_grammar("start = item start | ; item = \"a\" | \"b\" ;").unwrap();
        let mut tree = ParseTree::new();
        g.parse_tokens(tokens, &mut tree).unwrap();
        tree
    }

    #[test]
    fn test_children_before_parents() {
        let mut tree = build(&[tok("a", "1"), tok("b", "2"), tok("a", "3")]);
        let mut done = vec![false; tree.len()];
        let result: Result<(), String> = evaluate_bottom_up(&mut tree, |tree, id| {
            for &child in tree.children(id) {
                if !done[child.index()] {
                    return Err(format!("{:?} visited before child {:?}", id, child));
                }
            }
            if done[id.index()] {
                return Err(format!("{:?} visited twice", id));
            }
            done[id.index()] = true;
            Ok(())
        });
        assert_eq!(result, Ok(()));
        assert!(done.iter().all(|d| *d));
    }

    #[test]
    fn test_right_to_left_order() {
        let mut tree = build(&[tok("a", "1"), tok("b", "2"), tok("a", "3")]);
        let mut seen = Vec::new();
        let result: Result<(), ()> = evaluate_bottom_up(&mut tree, |tree, id| {
            if let Some(raw) = tree.raw(id) {
                seen.push(raw.to_owned());
            }
            Ok(())
        });
        assert!(result.is_ok());
        assert_eq!(seen, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_payloads_flow_upward() {
        let mut tree = build(&[tok("a", "x"), tok("b", "y")]);
        let result: Result<(), ()> = evaluate_bottom_up(&mut tree, |tree, id| {
            let mut collected = match tree.raw(id) {
                Some(raw) => vec![raw.to_owned()],
                None => Vec::new(),
            };
            for child in tree.children(id).to_vec() {
                collected.extend(tree.take_payload(child));
            }
            *tree.payload_mut(id) = collected;
            Ok(())
        });
        assert!(result.is_ok());
        let root = tree.root();
        assert_eq!(tree.payload(root), &vec!["x".to_owned(), "y".to_owned()]);
    }

    #[test]
    fn test_stops_at_first_error() {
        let mut tree = build(&[tok("a", "1"), tok("a", "2")]);
        let mut calls = 0;
        let result = evaluate_bottom_up(&mut tree, |tree, id| {
            calls += 1;
            match tree.raw(id) {
                Some("2") => Err("bad"),
                _ => Ok(()),
            }
        });
        assert_eq!(result, Err("bad"));
        assert!(calls < tree.len());
    }
}
