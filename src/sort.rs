use std::cmp::Ordering;
use std::collections::HashMap;

use crate::entry::Entry;

const DEFAULT_PRIORITY: i64 = 0;

/// Orders a side for display and returns indices into `entries`.
///
/// Groups sort by the largest priority among their members (lower first,
/// missing priorities count as 0), then by group name.
/// Inside a group entries sort by their own priority, then by label with
/// styling, punctuation and case removed.
pub fn sort_side<V>(entries: &[Entry<V>]) -> Vec<usize> {
    let labels: Vec<String> = entries
        .iter()
        .map(|entry| normalize_label(&entry.plain_label()))
        .collect();

    let mut group_priority: HashMap<&str, i64> = HashMap::new();
    for entry in entries {
        let priority = entry.priority.unwrap_or(DEFAULT_PRIORITY);
        group_priority
            .entry(entry.group_name())
            .and_modify(|max| *max = (*max).max(priority))
            .or_insert(priority);
    }

    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        let (left, right) = (&entries[a], &entries[b]);
        let (left_group, right_group) = (left.group_name(), right.group_name());
        if left_group == right_group {
            return left
                .priority
                .unwrap_or(DEFAULT_PRIORITY)
                .cmp(&right.priority.unwrap_or(DEFAULT_PRIORITY))
                .then_with(|| labels[a].cmp(&labels[b]));
        }
        match group_priority[left_group].cmp(&group_priority[right_group]) {
            Ordering::Equal => left_group.cmp(right_group),
            other => other,
        }
    });
    order
}

/// Sorting should happen unless the caller decided otherwise; by default only
/// when at least one entry carries a group tag.
pub fn should_sort<V>(forced: Option<bool>, left: &[Entry<V>], right: &[Entry<V>]) -> bool {
    forced.unwrap_or_else(|| {
        left.iter()
            .chain(right)
            .any(|entry| !entry.group_name().is_empty())
    })
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(entries: &[Entry<i32>], order: &[usize]) -> Vec<String> {
        order
            .iter()
            .map(|&index| {
                format!(
                    "{}:{}",
                    entries[index].group_name(),
                    entries[index].plain_label()
                )
            })
            .collect()
    }

    #[test]
    fn lower_group_priority_sorts_first() {
        let entries = vec![
            Entry::new("x", 1).with_group("b").with_priority(1),
            Entry::new("y", 2).with_group("a").with_priority(5),
            Entry::new("z", 3).with_group("a").with_priority(5),
        ];
        let order = sort_side(&entries);
        assert_eq!(labels(&entries, &order), vec!["b:x", "a:y", "a:z"]);
    }

    #[test]
    fn negative_group_priorities_are_not_lifted_to_default() {
        let entries = vec![
            Entry::new("b1", 1).with_group("b").with_priority(-1),
            Entry::new("z1", 2).with_group("z").with_priority(-5),
            Entry::new("z2", 3).with_group("z").with_priority(-7),
        ];
        let order = sort_side(&entries);
        assert_eq!(labels(&entries, &order), vec!["z:z2", "z:z1", "b:b1"]);
    }

    #[test]
    fn equal_group_priority_falls_back_to_group_name() {
        let entries = vec![
            Entry::new("one", 1).with_group("zeta"),
            Entry::new("two", 2).with_group("alpha"),
            Entry::new("three", 3).with_group("zeta"),
        ];
        let order = sort_side(&entries);
        assert_eq!(
            labels(&entries, &order),
            vec!["alpha:two", "zeta:one", "zeta:three"]
        );
    }

    #[test]
    fn items_sort_by_priority_then_normalized_label() {
        let entries = vec![
            Entry::new("beta", 1).with_group("g"),
            Entry::new("[Alpha]", 2).with_group("g"),
            Entry::new("gamma", 3).with_group("g").with_priority(-1),
        ];
        let order = sort_side(&entries);
        assert_eq!(
            labels(&entries, &order),
            vec!["g:gamma", "g:[Alpha]", "g:beta"]
        );
    }

    #[test]
    fn groups_stay_contiguous() {
        let entries = vec![
            Entry::new("a1", 1).with_group("a"),
            Entry::new("b1", 2).with_group("b"),
            Entry::new("a2", 3).with_group("a"),
            Entry::new("b2", 4).with_group("b"),
        ];
        let order = sort_side(&entries);
        let groups: Vec<&str> = order.iter().map(|&i| entries[i].group_name()).collect();
        assert_eq!(groups, vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn sorting_defaults_to_grouped_lists_only() {
        let plain = vec![Entry::new("a", 1)];
        let grouped = vec![Entry::new("a", 1).with_group("g")];
        assert!(!should_sort(None, &plain, &plain));
        assert!(should_sort(None, &plain, &grouped));
        assert!(should_sort(Some(true), &plain, &plain));
        assert!(!should_sort(Some(false), &grouped, &grouped));
    }
}
