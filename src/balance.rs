//! Left-leaning red-black fixup: the three cases run after every upward
//! return of an insert (SPEC_FULL §4.4), restated from Sedgewick's LLRB
//! algorithm. Rotations are restricted so they never pivot through a leaf —
//! a leaf carries a color but no children, so rotating "through" one would
//! have nothing to rotate.

use crate::node::{Branch, Color, Node};

/// Runs the three LLRB cases on `branch` in order and returns it rewrapped
/// as a `Node`. Each case is independent and is checked in sequence, since
/// applying case 1 can create the precondition for case 2, and applying
/// case 2 can create the precondition for case 3.
pub(crate) fn fixup(mut branch: Box<Branch>) -> Node {
    if is_branch_red(&branch.right) && !branch.left.is_red() {
        branch = rotate_left(branch);
    }
    if branch.left.is_red() && left_left_is_red(&branch.left) {
        branch = rotate_right(branch);
    }
    if branch.left.is_red() && branch.right.is_red() {
        flip_colors(&mut branch);
    }
    Node::Branch(branch)
}

fn is_branch_red(n: &Node) -> bool {
    matches!(n, Node::Branch(_)) && n.is_red()
}

fn left_left_is_red(n: &Node) -> bool {
    match n {
        Node::Branch(b) => matches!(b.left, Node::Branch(_)) && b.left.is_red(),
        Node::Leaf(_) => false,
    }
}

/// Rotates `h` left around its right child `x`, promoting `x` in `h`'s
/// place. `h.right` must be a `Branch` (checked by the caller).
fn rotate_left(mut h: Box<Branch>) -> Box<Branch> {
    let right = std::mem::replace(&mut h.right, Node::empty_leaf());
    let mut x = match right {
        Node::Branch(b) => b,
        Node::Leaf(_) => unreachable!("rotate_left requires a branch right child"),
    };
    h.right = std::mem::replace(&mut x.left, Node::empty_leaf());
    h.recompute_weights();
    x.color = h.color;
    h.color = Color::Red;
    x.left = Node::Branch(h);
    x.recompute_weights();
    x
}

/// Rotates `h` right around its left child `x`, promoting `x` in `h`'s
/// place. `h.left` must be a `Branch` (checked by the caller).
fn rotate_right(mut h: Box<Branch>) -> Box<Branch> {
    let left = std::mem::replace(&mut h.left, Node::empty_leaf());
    let mut x = match left {
        Node::Branch(b) => b,
        Node::Leaf(_) => unreachable!("rotate_right requires a branch left child"),
    };
    h.left = std::mem::replace(&mut x.right, Node::empty_leaf());
    h.recompute_weights();
    x.color = h.color;
    h.color = Color::Red;
    x.right = Node::Branch(h);
    x.recompute_weights();
    x
}

/// Splits a temporary 4-node: both children turn `Black`, `h` turns `Red`.
fn flip_colors(h: &mut Branch) {
    h.color = Color::Red;
    h.left.set_color(Color::Black);
    h.right.set_color(Color::Black);
}

#[cfg(test)]
mod tests {
    use crate::node::Node;

    fn text(n: &Node) -> String {
        let mut s = String::new();
        n.push_str_to(&mut s);
        s
    }

    #[test]
    fn sequential_inserts_stay_balanced_and_correct() {
        let mut n = Node::empty_leaf();
        let mut expected = String::new();
        for i in 0..500 {
            let s = format!("{i},");
            let pos = n.byte_len();
            n = n.insert_at_byte(pos, s.as_bytes());
            expected.push_str(&s);
        }
        assert_eq!(text(&n), expected);
        assert!(n.check_no_red_red());
        assert!(n.check_weights());
    }

    #[test]
    fn interleaved_front_inserts_stay_balanced() {
        let mut n = Node::empty_leaf();
        let mut expected = String::new();
        for i in 0..300 {
            let s = format!("{i}-");
            n = n.insert_at_byte(0, s.as_bytes());
            expected = format!("{s}{expected}");
        }
        assert_eq!(text(&n), expected);
        assert!(n.check_no_red_red());
    }
}
