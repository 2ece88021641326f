//! List shaping: keyword filter, sort, paginate
//!
//! Stages always run in the same order regardless of kind. Namespace
//! restriction happens earlier, inside the accessor's list call.

use chrono::{DateTime, Utc};
use kubegate_common::{ResourceQuery, SortBy, SortDirection, SortKey};
use std::cmp::Ordering;

use super::types::{Listing, ResourceList, ResourceSummary};

/// Properties the pipeline can filter and sort on
pub trait DataCell {
    fn name(&self) -> &str;
    /// Empty for cluster-scoped items
    fn namespace(&self) -> &str;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn status(&self) -> &str;
}

impl DataCell for ResourceSummary {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn status(&self) -> &str {
        &self.status
    }
}

pub struct QueryPipeline;

impl QueryPipeline {
    /// Filter, sort and paginate `items`
    ///
    /// Returns the requested page and the number of items that passed the
    /// filter. A page past the end is empty.
    pub fn apply<T: DataCell>(items: Vec<T>, query: &ResourceQuery) -> (Vec<T>, usize) {
        let mut items = Self::filter(items, query.keyword());
        Self::sort(&mut items, query.sort());

        let total = items.len();
        let start = query.page().saturating_mul(query.page_size()).min(total);
        let end = start.saturating_add(query.page_size()).min(total);

        let page = items.drain(start..end).collect();
        (page, total)
    }

    /// Shape a raw accessor listing into one page
    pub fn shape(listing: Listing, query: &ResourceQuery) -> ResourceList {
        let listed = listing.total;
        let (items, total) = Self::apply(listing.items, query);

        ResourceList {
            items,
            total,
            listed,
            page: query.page(),
            page_size: query.page_size(),
        }
    }

    fn filter<T: DataCell>(items: Vec<T>, keyword: Option<&str>) -> Vec<T> {
        match keyword {
            Some(keyword) => {
                let needle = keyword.to_lowercase();
                items
                    .into_iter()
                    .filter(|item| item.name().to_lowercase().contains(&needle))
                    .collect()
            }
            None => items,
        }
    }

    fn sort<T: DataCell>(items: &mut [T], sort: SortBy) {
        items.sort_by(|a, b| {
            let primary = match sort.key {
                SortKey::Name => a.name().cmp(b.name()),
                SortKey::Namespace => a.namespace().cmp(b.namespace()),
                // Missing timestamps sort as oldest
                SortKey::CreationTimestamp => a.created_at().cmp(&b.created_at()),
                SortKey::Status => a.status().cmp(b.status()),
            };

            let primary = match sort.direction {
                SortDirection::Ascending => primary,
                SortDirection::Descending => primary.reverse(),
            };

            primary.then_with(|| tiebreak(a, b))
        });
    }
}

fn tiebreak<T: DataCell>(a: &T, b: &T) -> Ordering {
    a.name()
        .cmp(b.name())
        .then_with(|| a.namespace().cmp(b.namespace()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        namespace: &'static str,
        age: i64,
        status: &'static str,
    }

    impl DataCell for Item {
        fn name(&self) -> &str {
            self.name
        }

        fn namespace(&self) -> &str {
            self.namespace
        }

        fn created_at(&self) -> Option<DateTime<Utc>> {
            Utc.timestamp_opt(self.age, 0).single()
        }

        fn status(&self) -> &str {
            self.status
        }
    }

    fn item(name: &'static str, namespace: &'static str, age: i64) -> Item {
        Item {
            name,
            namespace,
            age,
            status: "Running",
        }
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name).collect()
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let items = vec![item("Web-API", "a", 1), item("worker", "a", 2), item("webhook", "a", 3)];
        let query = ResourceQuery::new()
            .with_keyword("WEB")
            .with_sort(SortBy::ascending(SortKey::Name));

        let (page, total) = QueryPipeline::apply(items, &query);
        assert_eq!(total, 2);
        assert_eq!(names(&page), vec!["Web-API", "webhook"]);
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let items = vec![item("old", "a", 10), item("new", "a", 30), item("mid", "a", 20)];
        let (page, _) = QueryPipeline::apply(items, &ResourceQuery::new());
        assert_eq!(names(&page), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_ties_break_on_name_then_namespace() {
        let items = vec![
            item("b", "x", 5),
            item("a", "z", 5),
            item("a", "y", 5),
            item("c", "x", 5),
        ];
        let query = ResourceQuery::new().with_sort(SortBy::descending(SortKey::CreationTimestamp));

        let (page, _) = QueryPipeline::apply(items.clone(), &query);
        let order: Vec<(&str, &str)> = page.iter().map(|i| (i.name, i.namespace)).collect();
        assert_eq!(order, vec![("a", "y"), ("a", "z"), ("b", "x"), ("c", "x")]);

        let (again, _) = QueryPipeline::apply(items, &query);
        assert_eq!(page, again);
    }

    #[test]
    fn test_pagination_bounds() {
        let items: Vec<Item> = (0..7).map(|i| item("n", "ns", i)).collect();

        for (page, expected) in [(0, 3), (1, 3), (2, 1), (3, 0), (100, 0)] {
            let query = ResourceQuery::new().with_page(page, 3);
            let (items, total) = QueryPipeline::apply(items.clone(), &query);
            assert_eq!(total, 7);
            assert_eq!(items.len(), expected, "page {}", page);
        }
    }

    #[test]
    fn test_sort_by_status() {
        let mut pending = item("a", "ns", 1);
        pending.status = "Pending";
        let items = vec![item("b", "ns", 2), pending];
        let query = ResourceQuery::new().with_sort(SortBy::ascending(SortKey::Status));

        let (page, _) = QueryPipeline::apply(items, &query);
        assert_eq!(names(&page), vec!["a", "b"]);
    }
}
