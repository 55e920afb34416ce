//! Builds the initial snapshot out of the two post sources.

use qudpro_common::model::post::{Post, PostOrigin};
use std::collections::HashSet;

/// Merges persisted and synthetic posts into one sequence ordered by
/// `created_at`, most recent first.
///
/// Every post is stamped with the origin of the sequence it came from. When an
/// id appears more than once only its first occurrence is kept, so a
/// persisted post always wins against a synthetic one. The sort is stable:
/// posts with equal timestamps keep their input order, persisted first.
#[must_use]
pub fn merge(persisted: Vec<Post>, synthetic: Vec<Post>) -> Vec<Post> {
    let stamped_persisted = persisted.into_iter().map(|mut post| {
        post.origin = PostOrigin::Persisted;
        post
    });
    let stamped_synthetic = synthetic.into_iter().map(|mut post| {
        post.origin = PostOrigin::Synthetic;
        post
    });

    let mut seen = HashSet::new();
    let mut merged: Vec<Post> = stamped_persisted
        .chain(stamped_synthetic)
        .filter(|post| seen.insert(post.id))
        .collect();

    merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    merged
}
