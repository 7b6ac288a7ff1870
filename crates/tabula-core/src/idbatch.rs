//! Module: idbatch
//! Responsibility: splitting large id sets into bounded groups so IN-list
//! predicates stay within formatter limits.

use crate::{
    expr::Expr,
    filter::Filter,
    id::{Id, IdSet},
};

/// Default ids per group.
pub const DEFAULT_GROUP_SIZE: usize = 100;

///
/// IdBatcher
///
/// Fixed-size grouping of an id set. Groups preserve the set's ascending
/// order, so reconstitution is lossless.
///

#[derive(Clone, Debug)]
pub struct IdBatcher {
    groups: Vec<Vec<Id>>,
    group_size: usize,
}

impl IdBatcher {
    #[must_use]
    pub fn new(ids: &IdSet) -> Self {
        Self::with_group_size(ids, DEFAULT_GROUP_SIZE)
    }

    #[must_use]
    pub fn with_group_size(ids: &IdSet, group_size: usize) -> Self {
        let group_size = group_size.max(1);
        let mut groups: Vec<Vec<Id>> = Vec::with_capacity(ids.len().div_ceil(group_size));

        for id in ids {
            match groups.last_mut() {
                Some(group) if group.len() < group_size => group.push(*id),
                _ => groups.push(vec![*id]),
            }
        }

        Self { groups, group_size }
    }

    #[must_use]
    pub fn groups(&self) -> &[Vec<Id>] {
        &self.groups
    }

    #[must_use]
    pub const fn group_size(&self) -> usize {
        self.group_size
    }

    /// One IN-list filter for the given group.
    #[must_use]
    pub fn filter_for(&self, expr: Expr, group: &[Id]) -> Filter {
        Filter::ids_in(expr, group.iter().copied().collect())
    }

    /// IN-list filters for every group, in order.
    #[must_use]
    pub fn filters(&self, expr: &Expr) -> Vec<Filter> {
        self.groups
            .iter()
            .map(|group| self.filter_for(expr.clone(), group))
            .collect()
    }

    /// Reconstitute the full id set.
    #[must_use]
    pub fn all_ids(&self) -> IdSet {
        self.groups.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(range: std::ops::Range<i32>) -> IdSet {
        range.map(Id::new).collect()
    }

    #[test]
    fn groups_are_bounded_and_lossless() {
        let set = ids(1..251);
        let batcher = IdBatcher::new(&set);

        assert_eq!(batcher.groups().len(), 3);
        assert!(batcher.groups().iter().all(|g| g.len() <= DEFAULT_GROUP_SIZE));
        assert_eq!(batcher.groups()[2].len(), 50);
        assert_eq!(batcher.all_ids(), set);
    }

    #[test]
    fn each_group_becomes_one_in_filter() {
        let set = ids(1..11);
        let batcher = IdBatcher::with_group_size(&set, 4);
        let filters = batcher.filters(&Expr::column("id"));

        assert_eq!(filters.len(), 3);
        let Filter::IdsIn(first) = &filters[0] else {
            panic!("expected an id filter");
        };
        assert_eq!(first.ids.len(), 4);
    }

    #[test]
    fn zero_group_size_is_clamped() {
        let set = ids(1..4);
        let batcher = IdBatcher::with_group_size(&set, 0);
        assert_eq!(batcher.groups().len(), 3);
    }
}
