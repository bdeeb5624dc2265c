//! Reporting policy applied on top of the ranked table: output targets,
//! inefficiency categories and top/bottom selections.

use std::fmt;

use dea_engine::{ResultRow, ResultTable};
use serde::Serialize;

/// Highest attainable output on the index scale
pub const OUTPUT_CEILING: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Category {
    Efficient,
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Efficient,
        Category::Mild,
        Category::Moderate,
        Category::Severe,
        Category::Critical,
    ];

    /// Classify by the percentage increase in output needed to reach the frontier
    pub fn from_increase(percent: f64) -> Self {
        if percent <= 5.0 {
            Category::Efficient
        } else if percent <= 20.0 {
            Category::Mild
        } else if percent <= 50.0 {
            Category::Moderate
        } else if percent <= 100.0 {
            Category::Severe
        } else {
            Category::Critical
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Efficient => "efficient",
            Category::Mild => "mild",
            Category::Moderate => "moderate",
            Category::Severe => "severe",
            Category::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Output a unit would need, at its current input, to sit on the CRS frontier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub name: String,
    pub output: f64,
    pub required_output: f64,
    pub increase: f64,
    pub percent_increase: f64,
    pub category: Category,
}

impl Target {
    pub fn for_row(row: &ResultRow) -> Self {
        let required = if row.crs > 0.0 && row.crs < 1.0 {
            row.output / row.crs
        } else {
            row.output
        };
        let required_output = required.min(OUTPUT_CEILING);
        let increase = required_output - row.output;
        let percent_increase = if row.output > 0.0 { increase / row.output * 100.0 } else { 0.0 };

        Self {
            name: row.name.clone(),
            output: row.output,
            required_output,
            increase,
            percent_increase,
            category: Category::from_increase(percent_increase),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub units: usize,
    pub mean_output: f64,
    pub mean_required_output: f64,
    pub mean_increase: f64,
}

pub fn targets(table: &ResultTable) -> Vec<Target> {
    table.rows.iter().map(Target::for_row).collect()
}

/// Per-category aggregates; empty categories are omitted
pub fn summarize(targets: &[Target]) -> Vec<CategorySummary> {
    Category::ALL
        .iter()
        .filter_map(|&category| {
            let members: Vec<&Target> = targets.iter().filter(|t| t.category == category).collect();
            if members.is_empty() {
                return None;
            }
            let n = members.len() as f64;
            let mean = |f: fn(&Target) -> f64| members.iter().map(|t| f(t)).sum::<f64>() / n;
            Some(CategorySummary {
                category,
                units: members.len(),
                mean_output: mean(|t| t.output),
                mean_required_output: mean(|t| t.required_output),
                mean_increase: mean(|t| t.increase),
            })
        })
        .collect()
}

/// The `n` highest CRS rows (descending) and the `n` lowest (ascending)
pub fn top_and_bottom(table: &ResultTable, n: usize) -> (Vec<&ResultRow>, Vec<&ResultRow>) {
    let top = table.rows.iter().take(n).collect();
    let bottom = table.rows.iter().rev().take(n).collect();
    (top, bottom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, output: f64, crs: f64) -> ResultRow {
        ResultRow {
            name: name.to_string(),
            code: 0,
            output,
            input: 1000.0,
            crs,
            vrs: 1.0,
            scale: crs,
            crs_peers: Vec::new(),
        }
    }

    #[test]
    fn test_category_thresholds() {
        assert_eq!(Category::from_increase(0.0), Category::Efficient);
        assert_eq!(Category::from_increase(5.0), Category::Efficient);
        assert_eq!(Category::from_increase(5.1), Category::Mild);
        assert_eq!(Category::from_increase(20.0), Category::Mild);
        assert_eq!(Category::from_increase(50.0), Category::Moderate);
        assert_eq!(Category::from_increase(100.0), Category::Severe);
        assert_eq!(Category::from_increase(100.5), Category::Critical);
    }

    #[test]
    fn test_target_for_inefficient_unit() {
        let target = Target::for_row(&row("A", 4.0, 0.8));
        assert!((target.required_output - 5.0).abs() < 1e-9);
        assert!((target.increase - 1.0).abs() < 1e-9);
        assert!((target.percent_increase - 25.0).abs() < 1e-9);
        assert_eq!(target.category, Category::Moderate);
    }

    #[test]
    fn test_target_is_capped() {
        let target = Target::for_row(&row("A", 6.0, 0.4));
        assert_eq!(target.required_output, OUTPUT_CEILING);
        assert!((target.increase - 4.0).abs() < 1e-9);
        assert_eq!(target.category, Category::Severe);
    }

    #[test]
    fn test_efficient_unit_needs_nothing() {
        let target = Target::for_row(&row("A", 6.0, 1.0));
        assert_eq!(target.required_output, 6.0);
        assert_eq!(target.increase, 0.0);
        assert_eq!(target.category, Category::Efficient);
    }

    #[test]
    fn test_summary_groups_by_category() {
        let table = ResultTable {
            rows: vec![row("A", 6.0, 1.0), row("B", 5.0, 0.99), row("C", 2.0, 0.25)],
            excluded: Vec::new(),
        };
        let summary = summarize(&targets(&table));

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].category, Category::Efficient);
        assert_eq!(summary[0].units, 2);
        assert_eq!(summary[1].category, Category::Critical);
        assert!((summary[1].mean_required_output - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_and_bottom() {
        let table = ResultTable {
            rows: vec![row("A", 6.0, 1.0), row("B", 5.0, 0.9), row("C", 2.0, 0.5)],
            excluded: Vec::new(),
        };
        let (top, bottom) = top_and_bottom(&table, 2);
        let top: Vec<&str> = top.iter().map(|r| r.name.as_str()).collect();
        let bottom: Vec<&str> = bottom.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["A", "B"]);
        assert_eq!(bottom, vec!["C", "B"]);
    }
}
