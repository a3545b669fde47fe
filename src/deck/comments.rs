//! Comment thread of the open card and its reply tree.
//!
//! The tree is never patched: callers rebuild it with [`build_tree`] after
//! every comment mutation.

use std::collections::{HashMap, HashSet};

use super::models::Comment;
use crate::errors::MutationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    card_id: i64,
    comments: Vec<Comment>,
}

impl CommentThread {
    pub fn new(card_id: i64, comments: Vec<Comment>) -> Self {
        Self { card_id, comments }
    }

    pub fn card_id(&self) -> i64 {
        self.card_id
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn get(&self, id: i64) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Reply targets must already belong to this thread.
    pub fn check_parent(&self, parent_id: i64) -> Result<(), MutationError> {
        if self.contains(parent_id) {
            Ok(())
        } else {
            Err(MutationError::CommentNotFound { id: parent_id })
        }
    }

    /// Inserts or replaces by id.
    pub fn upsert(&mut self, comment: Comment) {
        match self.comments.iter_mut().find(|c| c.id == comment.id) {
            Some(existing) => *existing = comment,
            None => self.comments.push(comment),
        }
    }

    /// Replaces the body only; id, author and parent stay as they were.
    pub fn replace_message(&mut self, id: i64, message: &str) -> Result<&Comment, MutationError> {
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(MutationError::CommentNotFound { id })?;
        comment.message = message.to_string();
        Ok(comment)
    }

    pub fn remove(&mut self, id: i64) -> Option<Comment> {
        let pos = self.comments.iter().position(|c| c.id == id)?;
        Some(self.comments.remove(pos))
    }

    pub fn tree(&self) -> Vec<CommentNode> {
        build_tree(&self.comments)
    }
}

/// One node of the rendered reply tree. `comment_id` is the reference the
/// UI hands back when a node is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment_id: i64,
    pub author: String,
    pub message: String,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    /// Depth-first walk yielding `(depth, node)` pairs.
    pub fn walk(&self) -> Vec<(usize, &CommentNode)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a CommentNode)>) {
        out.push((depth, self));
        for child in &self.children {
            child.walk_into(depth + 1, out);
        }
    }
}

/// Builds the reply forest. A comment whose parent is missing (deleted, or
/// never loaded) is shown as a root. Siblings are ordered by creation time,
/// then id. In a reply cycle the lowest id is promoted to a root, so every
/// comment stays reachable.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i64>, Vec<&Comment>> = HashMap::new();

    for comment in comments {
        let parent = comment
            .parent_id
            .filter(|p| ids.contains(p) && *p != comment.id);
        children.entry(parent).or_default().push(comment);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    }

    let parents: HashMap<i64, i64> = children
        .iter()
        .filter_map(|(parent, list)| (*parent).map(|p| (p, list)))
        .flat_map(|(p, list)| list.iter().map(move |c| (c.id, p)))
        .collect();
    let by_id: HashMap<i64, &Comment> = comments.iter().map(|c| (c.id, c)).collect();

    let mut visited = HashSet::new();
    let mut forest: Vec<CommentNode> = children
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .filter_map(|c| build_node(c, &children, &mut visited))
                .collect()
        })
        .unwrap_or_default();

    // whatever is left hangs off a reply cycle
    let mut stranded: Vec<i64> = comments
        .iter()
        .map(|c| c.id)
        .filter(|id| !visited.contains(id))
        .collect();
    stranded.sort_unstable();
    for id in stranded {
        if visited.contains(&id) {
            continue;
        }
        let root = cycle_root(id, &parents);
        if let Some(node) = by_id
            .get(&root)
            .and_then(|c| build_node(c, &children, &mut visited))
        {
            forest.push(node);
        }
    }
    forest
}

/// Follows parent links from `id` until one repeats and returns the lowest
/// id on that cycle.
fn cycle_root(id: i64, parents: &HashMap<i64, i64>) -> i64 {
    let mut path = vec![id];
    let mut current = id;
    while let Some(&parent) = parents.get(&current) {
        if let Some(start) = path.iter().position(|&p| p == parent) {
            return path[start..].iter().copied().min().unwrap_or(parent);
        }
        path.push(parent);
        current = parent;
    }
    current
}

fn build_node(
    comment: &Comment,
    children: &HashMap<Option<i64>, Vec<&Comment>>,
    visited: &mut HashSet<i64>,
) -> Option<CommentNode> {
    if !visited.insert(comment.id) {
        return None;
    }
    let kids = children
        .get(&Some(comment.id))
        .map(|list| {
            list.iter()
                .filter_map(|c| build_node(c, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(CommentNode {
        comment_id: comment.id,
        author: comment.author_name.clone(),
        message: comment.message.clone(),
        children: kids,
    })
}
