//! Category aggregation for the proportion and ranking charts.
//!
//! Groups records by category in first-seen order, folds small categories
//! into an "other" bucket, and picks the largest highlight entries.

use std::collections::HashMap;

use serde::Serialize;
use viz_core::formatting::{share_at_least, share_percent};
use viz_core::models::{
    AggregatedCategory, HighlightEntry, Record, COLLAPSE_THRESHOLD_PERCENT, TOP_N,
};

// ── CategoryGroup ─────────────────────────────────────────────────────────────

/// All records of one category, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub name: String,
    pub records: Vec<Record>,
}

impl CategoryGroup {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
        }
    }

    /// Sum of the member amounts.
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.amount).sum()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Result of [`CategoryAggregator::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// Every category with its total and share, in first-seen order.
    pub categories: Vec<AggregatedCategory>,
    /// Sum of all category totals.
    pub grand_total: f64,
    /// Categories at or above the collapse threshold, followed by the
    /// "other" bucket when any category fell below it.  Empty when the
    /// grand total is zero.
    pub collapsed: Vec<AggregatedCategory>,
}

impl Aggregation {
    /// `(name, total)` pairs for the proportion chart.
    pub fn chart_slices(&self) -> Vec<(String, f64)> {
        self.collapsed
            .iter()
            .map(|c| (c.name.clone(), c.total))
            .collect()
    }

    /// Total of the named category, if present.
    pub fn total_for(&self, name: &str) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.total)
    }
}

// ── CategoryAggregator ────────────────────────────────────────────────────────

/// Stateless helper that groups records by category.
pub struct CategoryAggregator;

impl CategoryAggregator {
    /// Group `records` by category, preserving the order in which each
    /// category first appears.
    pub fn group(records: &[Record]) -> Vec<CategoryGroup> {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for record in records {
            let slot = *index.entry(record.category.as_str()).or_insert_with(|| {
                groups.push(CategoryGroup::new(record.category.as_str()));
                groups.len() - 1
            });
            groups[slot].records.push(record.clone());
        }

        groups
    }

    /// Compute per-category totals, the grand total and the collapsed view.
    ///
    /// `other_label` names the bucket that collects categories whose share
    /// is strictly below [`COLLAPSE_THRESHOLD_PERCENT`].
    pub fn aggregate(records: &[Record], other_label: &str) -> Aggregation {
        Self::aggregate_groups(&Self::group(records), other_label)
    }

    /// Same as [`aggregate`](Self::aggregate) for already grouped records.
    pub fn aggregate_groups(groups: &[CategoryGroup], other_label: &str) -> Aggregation {
        let totals: Vec<(String, f64)> =
            groups.iter().map(|g| (g.name.clone(), g.total())).collect();
        let grand_total: f64 = totals.iter().map(|(_, t)| t).sum();

        let categories: Vec<AggregatedCategory> = totals
            .iter()
            .map(|(name, total)| AggregatedCategory {
                name: name.clone(),
                total: *total,
                percentage: share_percent(*total, grand_total),
            })
            .collect();

        let collapsed = if grand_total == 0.0 {
            Vec::new()
        } else {
            Self::collapse(&categories, grand_total, other_label)
        };

        Aggregation {
            categories,
            grand_total,
            collapsed,
        }
    }

    /// The `TOP_N` largest highlight entries, largest first.  Equal amounts
    /// keep their input order.
    pub fn top_highlights(highlights: &[HighlightEntry]) -> Vec<HighlightEntry> {
        Self::top_n(highlights, TOP_N)
    }

    /// The `n` largest highlight entries, largest first.
    pub fn top_n(highlights: &[HighlightEntry], n: usize) -> Vec<HighlightEntry> {
        let mut sorted = highlights.to_vec();
        // `sort_by` is stable, so ties stay in input order.
        sorted.sort_by(|a, b| b.amount.total_cmp(&a.amount));
        sorted.truncate(n);
        sorted
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn collapse(
        categories: &[AggregatedCategory],
        grand_total: f64,
        other_label: &str,
    ) -> Vec<AggregatedCategory> {
        let (kept, small): (Vec<&AggregatedCategory>, Vec<&AggregatedCategory>) = categories
            .iter()
            .partition(|c| share_at_least(c.total, grand_total, COLLAPSE_THRESHOLD_PERCENT));

        let mut collapsed: Vec<AggregatedCategory> = kept.into_iter().cloned().collect();

        if !small.is_empty() {
            let other_total: f64 = small.iter().map(|c| c.total).sum();
            collapsed.push(AggregatedCategory {
                name: other_label.to_string(),
                total: other_total,
                percentage: share_percent(other_total, grand_total),
            });
        }

        collapsed
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_ledger;
    use viz_core::models::Labels;
    use viz_core::sink::NullSink;

    fn make_record(category: &str, name: &str, amount: f64) -> Record {
        Record {
            date: "2024-01-15".to_string(),
            category: category.to_string(),
            name: name.to_string(),
            amount,
            description: "无描述".to_string(),
        }
    }

    fn make_highlight(name: &str, amount: f64) -> HighlightEntry {
        HighlightEntry {
            date_label: "2024月01月15日".to_string(),
            name: name.to_string(),
            amount,
            description: "无描述".to_string(),
        }
    }

    fn names(categories: &[AggregatedCategory]) -> Vec<&str> {
        categories.iter().map(|c| c.name.as_str()).collect()
    }

    // ── group ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_group_preserves_first_seen_order() {
        let records = vec![
            make_record("食物", "午餐", 20.0),
            make_record("交通", "地铁", 4.0),
            make_record("食物", "晚餐", 30.0),
            make_record("购物", "鞋", 200.0),
        ];
        let groups = CategoryAggregator::group(&records);

        let keys: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(keys, vec!["食物", "交通", "购物"]);
        assert_eq!(groups[0].count(), 2);
        assert_eq!(groups[0].records[0].name, "午餐");
        assert_eq!(groups[0].records[1].name, "晚餐");
        assert!((groups[0].total() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_record_in_exactly_one_group() {
        let records = vec![
            make_record("a", "1", 1.0),
            make_record("b", "2", 2.0),
            make_record("a", "3", 3.0),
        ];
        let groups = CategoryAggregator::group(&records);
        let count: usize = groups.iter().map(|g| g.count()).sum();
        assert_eq!(count, records.len());
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_two_categories_without_other() {
        let records = vec![
            make_record("饮料", "咖啡", 32.0),
            make_record("食物", "午餐", 45.0),
        ];
        let agg = CategoryAggregator::aggregate(&records, "其他");

        assert!((agg.grand_total - 77.0).abs() < 1e-9);
        assert_eq!(names(&agg.collapsed), vec!["饮料", "食物"]);
        assert_eq!(agg.collapsed, agg.categories);
    }

    #[test]
    fn test_totals_sum_to_grand_total() {
        let records = vec![
            make_record("a", "1", 10.25),
            make_record("b", "2", 0.1),
            make_record("c", "3", 99.99),
            make_record("a", "4", 5.5),
        ];
        let agg = CategoryAggregator::aggregate(&records, "其他");
        let record_sum: f64 = records.iter().map(|r| r.amount).sum();
        let category_sum: f64 = agg.categories.iter().map(|c| c.total).sum();
        let collapsed_sum: f64 = agg.collapsed.iter().map(|c| c.total).sum();

        assert!((category_sum - record_sum).abs() < 1e-9);
        assert!((collapsed_sum - record_sum).abs() < 1e-9);
        assert!((agg.grand_total - record_sum).abs() < 1e-9);
    }

    #[test]
    fn test_small_categories_fold_into_other_last() {
        let records = vec![
            make_record("tiny1", "x", 1.0),
            make_record("big", "y", 90.0),
            make_record("tiny2", "z", 2.0),
            make_record("mid", "w", 7.0),
        ];
        let agg = CategoryAggregator::aggregate(&records, "其他");

        assert_eq!(names(&agg.collapsed), vec!["big", "mid", "其他"]);
        assert!((agg.collapsed[2].total - 3.0).abs() < 1e-9);
        assert!((agg.collapsed[2].percentage - 3.0).abs() < 1e-9);
        // The uncollapsed view still lists every category.
        assert_eq!(agg.categories.len(), 4);
    }

    #[test]
    fn test_category_at_exactly_threshold_is_kept() {
        let records = vec![
            make_record("edge", "x", 3.0),
            make_record("big", "y", 97.0),
        ];
        let agg = CategoryAggregator::aggregate(&records, "其他");

        assert_eq!(agg.categories[0].percentage, 3.0);
        assert_eq!(names(&agg.collapsed), vec!["edge", "big"]);
    }

    #[test]
    fn test_parsed_two_decimal_category_at_threshold_is_kept() {
        let text = "# start\n\
                    DATE:2024-01-01 TYPE:edge NAME:x COST:0.57\n\
                    DATE:2024-01-01 TYPE:big NAME:y COST:18.43\n\
                    # end";
        let parsed = parse_ledger(text, &Labels::zh(), &NullSink);
        assert_eq!(parsed.records.len(), 2);

        let agg = CategoryAggregator::aggregate(&parsed.records, "其他");
        assert_eq!(names(&agg.collapsed), vec!["edge", "big"]);
        assert!((agg.collapsed[0].total - 0.57).abs() < 1e-9);
    }

    #[test]
    fn test_category_just_below_threshold_is_folded() {
        let records = vec![
            make_record("edge", "x", 2.99),
            make_record("big", "y", 97.01),
        ];
        let agg = CategoryAggregator::aggregate(&records, "other");
        assert_eq!(names(&agg.collapsed), vec!["big", "other"]);
    }

    #[test]
    fn test_empty_records() {
        let agg = CategoryAggregator::aggregate(&[], "其他");
        assert!(agg.categories.is_empty());
        assert!(agg.collapsed.is_empty());
        assert_eq!(agg.grand_total, 0.0);
    }

    #[test]
    fn test_all_zero_amounts_give_empty_collapsed_set() {
        let records = vec![make_record("a", "x", 0.0), make_record("b", "y", 0.0)];
        let agg = CategoryAggregator::aggregate(&records, "其他");

        assert_eq!(agg.grand_total, 0.0);
        assert_eq!(agg.categories.len(), 2);
        assert!(agg.categories.iter().all(|c| c.percentage == 0.0));
        assert!(agg.collapsed.is_empty());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = vec![
            make_record("a", "x", 1.0),
            make_record("b", "y", 50.0),
            make_record("c", "z", 49.0),
        ];
        let first = CategoryAggregator::aggregate(&records, "其他");
        let second = CategoryAggregator::aggregate(&records, "其他");
        assert_eq!(first, second);
    }

    #[test]
    fn test_chart_slices_and_total_for() {
        let records = vec![make_record("a", "x", 60.0), make_record("b", "y", 40.0)];
        let agg = CategoryAggregator::aggregate(&records, "其他");
        assert_eq!(
            agg.chart_slices(),
            vec![("a".to_string(), 60.0), ("b".to_string(), 40.0)]
        );
        assert_eq!(agg.total_for("b"), Some(40.0));
        assert_eq!(agg.total_for("missing"), None);
    }

    // ── top_highlights ────────────────────────────────────────────────────────

    #[test]
    fn test_top_highlights_sorted_descending() {
        let highlights = vec![make_highlight("咖啡", 32.0), make_highlight("午餐", 45.0)];
        let top = CategoryAggregator::top_highlights(&highlights);
        let amounts: Vec<f64> = top.iter().map(|h| h.amount).collect();
        assert_eq!(amounts, vec![45.0, 32.0]);
    }

    #[test]
    fn test_top_highlights_caps_at_five() {
        let highlights: Vec<HighlightEntry> = (0..8)
            .map(|i| make_highlight(&format!("item{i}"), 30.0 + i as f64))
            .collect();
        let top = CategoryAggregator::top_highlights(&highlights);

        assert_eq!(top.len(), 5);
        assert_eq!(top[0].name, "item7");
        assert_eq!(top[4].name, "item3");
    }

    #[test]
    fn test_top_highlights_ties_keep_input_order() {
        let highlights = vec![
            make_highlight("first", 50.0),
            make_highlight("bigger", 80.0),
            make_highlight("second", 50.0),
            make_highlight("third", 50.0),
        ];
        let top = CategoryAggregator::top_highlights(&highlights);
        let order: Vec<&str> = top.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(order, vec!["bigger", "first", "second", "third"]);
    }

    #[test]
    fn test_top_highlights_empty() {
        assert!(CategoryAggregator::top_highlights(&[]).is_empty());
    }
}
