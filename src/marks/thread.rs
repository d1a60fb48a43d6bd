//! Comment threads
//!
//! Two-level forest: root comments, each holding its replies flat in
//! `children`. A reply names its immediate parent by id through `reply`.
//!
//! Tombstones: a deleted comment stays (flagged) while any of its
//! descendants is alive, and is spliced out once none is.

use std::collections::HashSet;

use uuid::Uuid;

use super::types::CommentNode;

/// Find a root or reply by mark id
pub fn find(comments: &[CommentNode], mark_id: i64) -> Option<&CommentNode> {
    comments.iter().find_map(|root| {
        if root.mark_id == mark_id {
            Some(root)
        } else {
            root.children.iter().find(|c| c.mark_id == mark_id)
        }
    })
}

pub fn find_mut(comments: &mut [CommentNode], mark_id: i64) -> Option<&mut CommentNode> {
    for root in comments.iter_mut() {
        if root.mark_id == mark_id {
            return Some(root);
        }
        if let Some(child) = root.children.iter_mut().find(|c| c.mark_id == mark_id) {
            return Some(child);
        }
    }
    None
}

/// Find an optimistic node by its client id
pub fn find_local_mut(comments: &mut [CommentNode], client_id: Uuid) -> Option<&mut CommentNode> {
    for root in comments.iter_mut() {
        if root.client_id == Some(client_id) {
            return Some(root);
        }
        if let Some(child) = root
            .children
            .iter_mut()
            .find(|c| c.client_id == Some(client_id))
        {
            return Some(child);
        }
    }
    None
}

/// Root id of the thread containing `mark_id`
pub fn thread_root(comments: &[CommentNode], mark_id: i64) -> Option<i64> {
    comments
        .iter()
        .find(|root| root.mark_id == mark_id || root.children.iter().any(|c| c.mark_id == mark_id))
        .map(|root| root.mark_id)
}

/// Append a reply under its thread root. Returns false if the root is gone.
pub fn attach_reply(comments: &mut [CommentNode], root_id: i64, reply: CommentNode) -> bool {
    match comments.iter_mut().find(|root| root.mark_id == root_id) {
        Some(root) => {
            root.children.push(reply);
            true
        }
        None => false,
    }
}

/// Remove exactly one optimistic node
pub fn remove_local(comments: &mut Vec<CommentNode>, client_id: Uuid) -> bool {
    if let Some(index) = comments.iter().position(|c| c.client_id == Some(client_id)) {
        comments.remove(index);
        return true;
    }
    for root in comments.iter_mut() {
        if let Some(index) = root
            .children
            .iter()
            .position(|c| c.client_id == Some(client_id))
        {
            root.children.remove(index);
            return true;
        }
    }
    false
}

/// Flag a comment deleted and apply the tombstone rule. Returns false if
/// the comment was not found.
pub fn mark_deleted(comments: &mut Vec<CommentNode>, mark_id: i64) -> bool {
    let Some(node) = find_mut(comments, mark_id) else {
        return false;
    };
    node.is_deleted = true;
    node.operate_loading = false;
    prune(comments);
    true
}

/// Splice out deleted comments that have no surviving descendants
pub fn prune(comments: &mut Vec<CommentNode>) {
    for root in comments.iter_mut() {
        let keep: Vec<bool> = root
            .children
            .iter()
            .map(|c| !c.is_deleted || has_live_descendant(&root.children, c.mark_id))
            .collect();
        let mut keep = keep.into_iter();
        root.children.retain(|_| keep.next().unwrap_or(true));
    }
    comments.retain(|root| !root.is_deleted || root.children.iter().any(|c| !c.is_deleted));
}

/// Whether any reply chain below `mark_id` reaches a non-deleted reply
fn has_live_descendant(replies: &[CommentNode], mark_id: i64) -> bool {
    let mut seen: HashSet<i64> = HashSet::from([mark_id]);
    let mut frontier = vec![mark_id];
    while let Some(parent) = frontier.pop() {
        for reply in replies {
            if reply.reply.as_ref().map(|r| r.id) != Some(parent) || !seen.insert(reply.mark_id) {
                continue;
            }
            if !reply.is_deleted {
                return true;
            }
            frontier.push(reply.mark_id);
        }
    }
    false
}

/// Number of non-deleted comments across all threads
pub fn live_count(comments: &[CommentNode]) -> usize {
    comments
        .iter()
        .map(|root| {
            usize::from(!root.is_deleted) + root.children.iter().filter(|c| !c.is_deleted).count()
        })
        .sum()
}
