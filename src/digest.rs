//! Grouping collected items by source for presentation.

use crate::models::{NewsItem, Source};
use itertools::Itertools;

/// Items from one source, in collection order.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup {
    pub source: Source,
    pub items: Vec<NewsItem>,
}

/// Partition `news` by source. Groups appear in the order their source was
/// first seen and each keeps its items in collection order.
pub fn group_by_source(news: Vec<NewsItem>) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    for item in news {
        match groups.iter_mut().find(|g| g.source == item.source) {
            Some(group) => group.items.push(item),
            None => groups.push(SourceGroup {
                source: item.source.clone(),
                items: vec![item],
            }),
        }
    }
    groups
}

/// Groups in presentation order: known sources by [`Source::PREFERRED_ORDER`],
/// then every other source in first-seen order.
pub fn ordered_groups(news: Vec<NewsItem>) -> Vec<SourceGroup> {
    group_by_source(news)
        .into_iter()
        .sorted_by_key(|g| g.source.preferred_rank().unwrap_or(usize::MAX))
        .collect()
}

/// Total items across all groups.
pub fn item_count(groups: &[SourceGroup]) -> usize {
    groups.iter().map(|g| g.items.len()).sum()
}
