//! Tidy reshape of daily scores

use crate::mental::definitions::ScoreDefinition;
use crate::mental::score::DailyScores;
use crate::types::TidyMetricRow;

/// One row per (category, date): categories in definition order, dates
/// ascending within each category.
pub fn tidy_scores(categories: &[ScoreDefinition], scores: &[DailyScores]) -> Vec<TidyMetricRow> {
    let mut days: Vec<&DailyScores> = scores.iter().collect();
    days.sort_by_key(|s| s.date);

    let mut rows = Vec::with_capacity(categories.len() * days.len());
    for (index, category) in categories.iter().enumerate() {
        for day in &days {
            rows.push(TidyMetricRow {
                date: day.date,
                metric: category.name.clone(),
                value: day.full.get(index).copied().flatten(),
                value_partial: day.partial.get(index).copied().flatten(),
                note: day.note.clone(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn definition(name: &str) -> ScoreDefinition {
        ScoreDefinition {
            name: name.to_string(),
            rescale: true,
            factors: vec![],
        }
    }

    #[test]
    fn test_category_major_order() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let scores = vec![
            DailyScores {
                date: d2,
                note: "later".into(),
                full: vec![Some(1.0), None],
                partial: vec![Some(1.5), Some(2.5)],
            },
            DailyScores {
                date: d1,
                note: String::new(),
                full: vec![None, Some(3.0)],
                partial: vec![Some(0.5), Some(3.0)],
            },
        ];
        let rows = tidy_scores(&[definition("a"), definition("b")], &scores);

        let keys: Vec<_> = rows.iter().map(|r| (r.metric.as_str(), r.date)).collect();
        assert_eq!(keys, vec![("a", d1), ("a", d2), ("b", d1), ("b", d2)]);
        assert_eq!(rows[1].value, Some(1.0));
        assert_eq!(rows[1].note, "later");
        assert_eq!(rows[3].value, None);
        assert_eq!(rows[3].value_partial, Some(2.5));
    }
}
