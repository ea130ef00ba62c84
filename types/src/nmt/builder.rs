use std::mem;
use std::ops::ControlFlow;

use crate::nmt::{hasher, MerkleHash, Namespace, NamespacedHash, NamespacedHashExt};
use crate::nmt::NamespacedSha2Hasher;
use crate::{Error, Result};

/// Observer of the nodes created while building a namespaced merkle tree.
///
/// Leaves are visited in the order they are pushed, with a single child holding the
/// namespace prefixed leaf data. Inner nodes are visited after both of their subtrees,
/// with the raw hashes of the left and the right child.
///
/// Returning [`ControlFlow::Break`] aborts the tree construction.
pub trait NodeVisitor {
    /// Called for every node of the tree.
    fn visit(&mut self, hash: &NamespacedHash, children: &[&[u8]]) -> ControlFlow<()>;
}

impl NodeVisitor for () {
    fn visit(&mut self, _hash: &NamespacedHash, _children: &[&[u8]]) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<V> NodeVisitor for &mut V
where
    V: NodeVisitor + ?Sized,
{
    fn visit(&mut self, hash: &NamespacedHash, children: &[&[u8]]) -> ControlFlow<()> {
        (**self).visit(hash, children)
    }
}

/// Incremental builder of a namespaced merkle tree.
///
/// The tree is split at the largest power of two smaller than the number of leaves, which
/// gives the same roots as the reference implementation of the tree.
pub struct NmtBuilder<V = ()> {
    hasher: NamespacedSha2Hasher,
    visitor: V,
    leaves: Vec<NamespacedHash>,
    aborted: bool,
}

impl NmtBuilder<()> {
    /// Create a builder without a visitor.
    pub fn new() -> Self {
        NmtBuilder::with_visitor(())
    }
}

impl Default for NmtBuilder<()> {
    fn default() -> Self {
        NmtBuilder::new()
    }
}

impl<V: NodeVisitor> NmtBuilder<V> {
    /// Create a builder which reports created nodes to the `visitor`.
    pub fn with_visitor(visitor: V) -> Self {
        NmtBuilder {
            hasher: hasher(),
            visitor,
            leaves: Vec::new(),
            aborted: false,
        }
    }

    /// Returns the number of leaves pushed so far.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns `true` if no leaves were pushed.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Append a leaf with the given namespace.
    ///
    /// Namespaces of the leaves must be non-decreasing.
    pub fn push_leaf(&mut self, data: &[u8], namespace: Namespace) -> Result<()> {
        if self.aborted {
            return Err(Error::VisitAborted);
        }

        if let Some(last) = self.leaves.last() {
            if *namespace < last.max_namespace() {
                return Err(Error::InvalidNmtLeafOrder);
            }
        }

        let mut payload = Vec::with_capacity(namespace.as_bytes().len() + data.len());
        payload.extend_from_slice(namespace.as_bytes());
        payload.extend_from_slice(data);

        let hash = self.hasher.hash_leaf(&payload);
        self.visit(&hash, &[&payload[..]])?;
        self.leaves.push(hash);

        Ok(())
    }

    /// Compute the root of the tree, visiting every inner node.
    pub fn root(mut self) -> Result<NamespacedHash> {
        if self.aborted {
            return Err(Error::VisitAborted);
        }

        let leaves = mem::take(&mut self.leaves);
        self.subtree_root(&leaves)
    }

    /// Returns the visitor, dropping any pushed leaves.
    pub fn into_visitor(self) -> V {
        self.visitor
    }

    fn subtree_root(&mut self, leaves: &[NamespacedHash]) -> Result<NamespacedHash> {
        match leaves {
            [] => Ok(NamespacedSha2Hasher::EMPTY_ROOT),
            [leaf] => Ok(leaf.clone()),
            _ => {
                let split = leaves.len().next_power_of_two() / 2;
                let left = self.subtree_root(&leaves[..split])?;
                let right = self.subtree_root(&leaves[split..])?;

                let hash = self.hasher.hash_nodes(&left, &right);
                let (left, right) = (left.to_array(), right.to_array());
                self.visit(&hash, &[&left[..], &right[..]])?;

                Ok(hash)
            }
        }
    }

    fn visit(&mut self, hash: &NamespacedHash, children: &[&[u8]]) -> Result<()> {
        match self.visitor.visit(hash, children) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => {
                self.aborted = true;
                Err(Error::VisitAborted)
            }
        }
    }
}

/// Build a tree from `(namespace, data)` leaves and return its root.
pub fn build_tree<'a, V, I>(leaves: I, visitor: V) -> Result<NamespacedHash>
where
    V: NodeVisitor,
    I: IntoIterator<Item = (Namespace, &'a [u8])>,
{
    let mut builder = NmtBuilder::with_visitor(visitor);

    for (namespace, data) in leaves {
        builder.push_leaf(data, namespace)?;
    }

    builder.root()
}
