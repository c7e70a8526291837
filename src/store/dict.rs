//! Module implement the dictionary, a sorted index over the value table.
//!
//! The dictionary is a [left-leaning-red-black][llrb] tree with
//! copy-on-write nodes. Every mutation copies the path from root to the
//! mutated node and shares the rest of the tree with older versions. Cloning
//! a dictionary is cheap, a clone shares the whole tree, and that is how
//! readers get a stable snapshot while the writer keeps mutating its own
//! version.
//!
//! Values are ordered by the comparator type `C`, values that compare Equal
//! are the same key.
//!
//! [llrb]: https://en.wikipedia.org/wiki/Left-leaning_red-black_tree

use std::{cmp::Ordering, fmt, marker, sync::Arc};

use crate::{
    store::{Comparator, EnumIndex},
    Error, Result,
};

pub const MAX_TREE_DEPTH: usize = 100;

// Node corresponds to a single value in the dictionary.
#[derive(Clone)]
struct Node<V> {
    value: V,
    index: EnumIndex,
    black: bool,                  // store: black or red
    left: Option<Arc<Node<V>>>,  // store: left child
    right: Option<Arc<Node<V>>>, // store: right child
}

impl<V> Node<V> {
    fn new(value: V, index: EnumIndex) -> Node<V> {
        Node {
            value,
            index,
            black: false,
            left: None,
            right: None,
        }
    }

    #[inline]
    fn as_left_ref(&self) -> Option<&Node<V>> {
        self.left.as_deref()
    }

    #[inline]
    fn as_right_ref(&self) -> Option<&Node<V>> {
        self.right.as_deref()
    }

    #[inline]
    fn is_black(&self) -> bool {
        self.black
    }

    #[inline]
    fn set_red(&mut self) {
        self.black = false
    }

    #[inline]
    fn set_black(&mut self) {
        self.black = true
    }

    #[inline]
    fn toggle_link(&mut self) {
        self.black = !self.black
    }
}

/// Sorted map of value to [EnumIndex], ordered by comparator `C`.
pub struct Dict<V, C> {
    root: Option<Arc<Node<V>>>,
    n_count: usize,
    _cmp: marker::PhantomData<C>,
}

impl<V, C> Clone for Dict<V, C> {
    fn clone(&self) -> Self {
        Dict {
            root: self.root.as_ref().map(Arc::clone),
            n_count: self.n_count,
            _cmp: marker::PhantomData,
        }
    }
}

impl<V, C> Default for Dict<V, C> {
    fn default() -> Self {
        Dict {
            root: None,
            n_count: 0,
            _cmp: marker::PhantomData,
        }
    }
}

impl<V, C> Dict<V, C> {
    /// Return number of values in the dictionary.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Full scan, in comparator order.
    pub fn iter(&self) -> Iter<V> {
        let root = self.root.as_ref().map(Arc::clone);
        let mut paths = Vec::default();
        build_iter(root, &mut paths);
        Iter { paths }
    }
}

impl<V, C> Dict<V, C>
where
    V: Clone,
    C: Comparator<V>,
{
    /// Lookup `value` by descending the tree.
    pub fn find(&self, value: &V) -> Option<EnumIndex> {
        let mut node = self.root.as_deref();
        while let Some(nref) = node {
            node = match C::compare(&nref.value, value) {
                Ordering::Less => nref.as_right_ref(),
                Ordering::Greater => nref.as_left_ref(),
                Ordering::Equal => return Some(nref.index),
            };
        }
        None
    }

    /// Lookup `value` by scanning the dictionary in order.
    pub fn scan(&self, value: &V) -> Option<EnumIndex> {
        for (val, index) in self.iter() {
            match C::compare(&val, value) {
                Ordering::Less => continue,
                Ordering::Equal => return Some(index),
                Ordering::Greater => return None,
            }
        }
        None
    }

    /// Return all values that compare Equal to `value` under the folded
    /// order, in comparator order.
    pub fn find_folded(&self, value: &V) -> Vec<(V, EnumIndex)> {
        let root = self.root.as_ref().map(Arc::clone);
        let mut paths = Vec::default();
        find_start_folded::<V, C>(root, value, &mut paths);

        let iter = Iter { paths };
        iter.take_while(|(v, _)| C::compare_folded(v, value) == Ordering::Equal)
            .collect()
    }

    /// Insert a new value. Dictionary holds unique values, inserting an
    /// existing value is a Fatal error and leaves the dictionary untouched.
    pub fn insert(&mut self, value: V, index: EnumIndex) -> Result<()> {
        let root = self.root.as_deref();
        let mut root = do_insert::<V, C>(root, value, index)?;
        root.set_black();
        self.root = Some(Arc::new(root));
        self.n_count += 1;
        Ok(())
    }

    /// Remove `value` from the dictionary, return its index if present.
    pub fn remove(&mut self, value: &V) -> Result<Option<EnumIndex>> {
        let root = self.root.as_deref();
        let (root, old) = do_remove::<V, C>(root, value)?;
        self.root = root.map(|mut root| {
            root.set_black();
            Arc::new(root)
        });
        if old.is_some() {
            self.n_count -= 1;
        }
        Ok(old)
    }

    /// Validate dictionary with following rules:
    ///
    /// * Root node is always black in color.
    /// * Verify the sort order between a node and its left/right child.
    /// * No node has RIGHT RED child and LEFT BLACK child (or NULL child).
    /// * Make sure there are no consecutive reds.
    /// * Make sure number of blacks are same on both left and right arm.
    /// * Make sure that the maximum depth do not exceed MAX_TREE_DEPTH.
    pub fn validate(&self) -> Result<()>
    where
        V: fmt::Debug,
    {
        let root = self.root.as_deref();
        if is_red(root) {
            err_at!(Fatal, msg: "root node must be black")?;
        }

        let (_, n_count) = validate_tree::<V, C>(root, false, 0, 0)?;
        if n_count != self.n_count {
            err_at!(Fatal, msg: "n_count {} != {}", n_count, self.n_count)?;
        }

        Ok(())
    }
}

fn do_insert<V, C>(node: Option<&Node<V>>, value: V, index: EnumIndex) -> Result<Node<V>>
where
    V: Clone,
    C: Comparator<V>,
{
    let mut node = match node {
        Some(node) => node.clone(),
        None => return Ok(Node::new(value, index)),
    };

    match C::compare(&node.value, &value) {
        Ordering::Greater => {
            let left = do_insert::<V, C>(node.as_left_ref(), value, index)?;
            node.left = Some(Arc::new(left));
        }
        Ordering::Less => {
            let right = do_insert::<V, C>(node.as_right_ref(), value, index)?;
            node.right = Some(Arc::new(right));
        }
        Ordering::Equal => {
            err_at!(Fatal, msg: "duplicate value, existing {}", node.index)?;
        }
    }

    Ok(walkuprot_23(node))
}

fn do_remove<V, C>(
    node: Option<&Node<V>>,
    value: &V,
) -> Result<(Option<Node<V>>, Option<EnumIndex>)>
where
    V: Clone,
    C: Comparator<V>,
{
    let mut node = match node {
        Some(node) => node.clone(),
        None => return Ok((None, None)),
    };

    let res = match C::compare(&node.value, value) {
        Ordering::Greater if node.left.is_none() => (Some(node), None),
        Ordering::Greater => {
            let left = node.as_left_ref();
            if !is_red(left) && !is_red(left.and_then(Node::as_left_ref)) {
                node = move_red_left(node)?
            }

            let (left, old) = do_remove::<V, C>(node.as_left_ref(), value)?;
            node.left = left.map(Arc::new);
            (Some(fixup(node)?), old)
        }
        _ => {
            if is_red(node.as_left_ref()) {
                node = rotate_right(node)?;
            }

            let is_eq = C::compare(&node.value, value) == Ordering::Equal;
            if is_eq && node.right.is_none() {
                (None, Some(node.index))
            } else {
                let right = node.as_right_ref();
                if right.is_some() && !is_red(right) && !is_red(right.and_then(Node::as_left_ref))
                {
                    node = move_red_right(node)?;
                }

                if C::compare(&node.value, value) == Ordering::Equal {
                    let (right, sub_node) = do_remove_min(node.as_right_ref())?;
                    let old = node.index;
                    let mut sub_node = match sub_node {
                        Some(sub_node) => sub_node,
                        None => err_at!(Fatal, msg: "remove_min on empty subtree")?,
                    };
                    sub_node.left = node.left;
                    sub_node.right = right.map(Arc::new);
                    sub_node.black = node.black;
                    (Some(fixup(sub_node)?), Some(old))
                } else {
                    let (right, old) = do_remove::<V, C>(node.as_right_ref(), value)?;
                    node.right = right.map(Arc::new);
                    (Some(fixup(node)?), old)
                }
            }
        }
    };

    Ok(res)
}

#[allow(clippy::type_complexity)]
fn do_remove_min<V>(node: Option<&Node<V>>) -> Result<(Option<Node<V>>, Option<Node<V>>)>
where
    V: Clone,
{
    let mut node = match node {
        Some(node) => node.clone(),
        None => return Ok((None, None)),
    };

    if node.left.is_none() {
        return Ok((None, Some(node)));
    }

    let left = node.as_left_ref();
    if !is_red(left) && !is_red(left.and_then(Node::as_left_ref)) {
        node = move_red_left(node)?;
    }
    let (left, sub_node) = do_remove_min(node.as_left_ref())?;
    node.left = left.map(Arc::new);
    Ok((Some(fixup(node)?), sub_node))
}

#[inline]
fn is_red<V>(node: Option<&Node<V>>) -> bool {
    node.map_or(false, |node| !node.is_black())
}

#[inline]
fn is_black<V>(node: Option<&Node<V>>) -> bool {
    node.map_or(true, Node::is_black)
}

fn walkuprot_23<V>(mut node: Node<V>) -> Node<V>
where
    V: Clone,
{
    if is_red(node.as_right_ref()) && !is_red(node.as_left_ref()) {
        node = rotate_left(node)
    }
    let left = node.as_left_ref();
    if is_red(left) && is_red(left.and_then(Node::as_left_ref)) {
        node = rotate_right_red(node);
    }
    if is_red(node.as_left_ref()) && is_red(node.as_right_ref()) {
        flip(&mut node)
    }
    node
}

//              (i)                       (i)
//               |                         |
//              node                     right
//              /  \                      / \
//             /    (r)                 (r)  \
//            /       \                 /     \
//          left     right           node     r-r
//                    / \            /  \
//                 r-l  r-r       left  r-l
//
fn rotate_left<V>(mut node: Node<V>) -> Node<V>
where
    V: Clone,
{
    let mut right = match node.as_right_ref() {
        Some(right) => right.clone(),
        None => return node,
    };

    node.right = right.left.take();
    right.black = node.black;
    node.set_red();
    right.left = Some(Arc::new(node));

    right
}

//              (i)                       (i)
//               |                         |
//              node                      left
//              /  \                      / \
//            (r)   \                   (r)  \
//           /       \                 /      \
//         left     right            l-l      node
//         / \                                / \
//      l-l  l-r                            l-r  right
//
fn rotate_right_red<V>(mut node: Node<V>) -> Node<V>
where
    V: Clone,
{
    let mut left = match node.as_left_ref() {
        Some(left) => left.clone(),
        None => return node,
    };

    node.left = left.right.take();
    left.black = node.black;
    node.set_red();
    left.right = Some(Arc::new(node));

    left
}

fn rotate_right<V>(node: Node<V>) -> Result<Node<V>>
where
    V: Clone,
{
    if is_black(node.as_left_ref()) {
        err_at!(Fatal, msg: "rotate_right(): rotate black link")?;
    }
    Ok(rotate_right_red(node))
}

//        (x)                   (!x)
//         |                     |
//        node                  node
//        / \                   / \
//      (y) (z)              (!y) (!z)
//     /      \              /      \
//   left    right         left    right
//
fn flip<V>(node: &mut Node<V>)
where
    V: Clone,
{
    node.toggle_link();
    if let Some(left) = node.as_left_ref() {
        let mut left = left.clone();
        left.toggle_link();
        node.left = Some(Arc::new(left));
    }
    if let Some(right) = node.as_right_ref() {
        let mut right = right.clone();
        right.toggle_link();
        node.right = Some(Arc::new(right));
    }
}

fn fixup<V>(mut node: Node<V>) -> Result<Node<V>>
where
    V: Clone,
{
    if is_red(node.as_right_ref()) {
        node = rotate_left(node)
    }

    let left = node.as_left_ref();
    if is_red(left) && is_red(left.and_then(Node::as_left_ref)) {
        node = rotate_right(node)?
    }

    if is_red(node.as_left_ref()) && is_red(node.as_right_ref()) {
        flip(&mut node)
    }
    Ok(node)
}

fn move_red_left<V>(mut node: Node<V>) -> Result<Node<V>>
where
    V: Clone,
{
    flip(&mut node);

    let right = node.as_right_ref();
    if is_red(right.and_then(Node::as_left_ref)) {
        let newr = match right {
            Some(right) => rotate_right(right.clone())?,
            None => err_at!(Fatal, msg: "move_red_left(): missing right")?,
        };
        node.right = Some(Arc::new(newr));
        node = rotate_left(node);
        flip(&mut node);
    }
    Ok(node)
}

fn move_red_right<V>(mut node: Node<V>) -> Result<Node<V>>
where
    V: Clone,
{
    flip(&mut node);

    if is_red(node.as_left_ref().and_then(Node::as_left_ref)) {
        node = rotate_right(node)?;
        flip(&mut node);
    }
    Ok(node)
}

fn find_start_folded<V, C>(node: Option<Arc<Node<V>>>, value: &V, paths: &mut Vec<Fragment<V>>)
where
    C: Comparator<V>,
{
    if let Some(node) = node {
        match C::compare_folded(&node.value, value) {
            Ordering::Less => {
                // node and its left sub-tree are before value.
                let right = node.right.as_ref().map(Arc::clone);
                find_start_folded::<V, C>(right, value, paths)
            }
            Ordering::Equal | Ordering::Greater => {
                let left = node.left.as_ref().map(Arc::clone);
                paths.push(Fragment {
                    flag: IFlag::Left,
                    node,
                });
                find_start_folded::<V, C>(left, value, paths)
            }
        }
    }
}

fn validate_tree<V, C>(
    node: Option<&Node<V>>,
    fromred: bool,
    mut n_blacks: usize,
    depth: usize,
) -> Result<(usize, usize)>
where
    V: fmt::Debug,
    C: Comparator<V>,
{
    let red = is_red(node);

    let node = match node {
        Some(_) if fromred && red => err_at!(Fatal, msg: "dictionary has consecutive reds")?,
        Some(node) => node,
        None => return Ok((n_blacks, 0)),
    };

    if !red {
        n_blacks += 1;
    }

    if depth > MAX_TREE_DEPTH {
        err_at!(Fatal, msg: "tree exceeds max_depth {}", depth)?;
    }

    if is_red(node.as_right_ref()) && !is_red(node.as_left_ref()) {
        err_at!(Fatal, msg: "right leaning red for {:?}", node.value)?;
    }

    // confirm sort order in the tree.
    if let Some(left) = node.as_left_ref() {
        if C::compare(&left.value, &node.value) != Ordering::Less {
            let (lv, nv) = (&left.value, &node.value);
            err_at!(Fatal, msg: "left:{:?}, parent:{:?}", lv, nv)?;
        }
    }
    if let Some(right) = node.as_right_ref() {
        if C::compare(&right.value, &node.value) != Ordering::Greater {
            let (rv, nv) = (&right.value, &node.value);
            err_at!(Fatal, msg: "right:{:?}, parent:{:?}", rv, nv)?;
        }
    }

    let (lb, lc) = validate_tree::<V, C>(node.as_left_ref(), red, n_blacks, depth + 1)?;
    let (rb, rc) = validate_tree::<V, C>(node.as_right_ref(), red, n_blacks, depth + 1)?;

    if lb != rb {
        err_at!(Fatal, msg: "unbalanced blacks l:{}, r:{}", lb, rb)?;
    }

    Ok((lb, lc + rc + 1))
}

/// Iterator type, to do full scan over the dictionary in comparator order.
///
/// Iterator holds on to the tree it started with, later mutations to the
/// dictionary are not visible.
pub struct Iter<V> {
    paths: Vec<Fragment<V>>,
}

impl<V> Iterator for Iter<V>
where
    V: Clone,
{
    type Item = (V, EnumIndex);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = self.paths.last_mut()?;
            match path.flag {
                IFlag::Left => {
                    path.flag = IFlag::Center;
                    break Some((path.node.value.clone(), path.node.index));
                }
                IFlag::Center => {
                    path.flag = IFlag::Right;
                    let right = path.node.right.as_ref().map(Arc::clone);
                    build_iter(right, &mut self.paths)
                }
                IFlag::Right => {
                    self.paths.pop();
                }
            }
        }
    }
}

// Continuous iteration without walking through the whole tree from root.
// Achieved by maintaining a stack of tree-path to the previous iterated
// node. Each node in the stack is a tuple of node and its current state
// (IFlag), together this tuple is called as a Fragment.
struct Fragment<V> {
    flag: IFlag,
    node: Arc<Node<V>>,
}

#[derive(Copy, Clone)]
enum IFlag {
    Left,   // left path is iterated.
    Center, // current node is iterated.
    Right,  // right paths is being iterated.
}

fn build_iter<V>(node: Option<Arc<Node<V>>>, paths: &mut Vec<Fragment<V>>) {
    if let Some(node) = node {
        let left = node.left.as_ref().map(Arc::clone);
        paths.push(Fragment {
            flag: IFlag::Left,
            node,
        });
        build_iter(left, paths)
    }
}

#[cfg(test)]
#[path = "dict_test.rs"]
mod dict_test;
