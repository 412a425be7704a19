use std::collections::HashMap;

use crate::rules::{FoodRules, RuleSet, RuleTable};

/// Constitution headers recognised in a rule chart
pub const CHART_DOSHAS: [&str; 3] = ["Vata", "Pitta", "Kapha"];

/// Category headers recognised in a rule chart
pub const CHART_CATEGORIES: [&str; 15] = [
    "Fruits",
    "Vegetables",
    "Grains",
    "Legumes",
    "Dairy",
    "Animal Foods",
    "Condiments",
    "Nuts",
    "Seeds",
    "Oils",
    "Beverages",
    "Herbal Teas",
    "Spices",
    "Sweeteners",
    "Food Supplements",
];

#[derive(Clone, Copy)]
enum Mode {
    Avoid,
    Favor,
}

/// Parse a plain-text food chart into a rule table.
///
/// The chart is a sequence of trimmed lines: a dosha header switches the
/// current dosha, a category header switches the current category (and
/// creates it, empty, for every dosha), `avoid`/`favor` switch the list,
/// and any other line is a food appended to the current list. Foods seen
/// before a dosha, category and list are all selected are ignored.
pub fn parse_chart(text: &str) -> RuleTable {
    let mut table: HashMap<String, RuleSet> = CHART_DOSHAS
        .iter()
        .map(|d| (d.to_string(), RuleSet::new()))
        .collect();

    let mut dosha: Option<&str> = None;
    let mut category: Option<&str> = None;
    let mut mode: Option<Mode> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if CHART_DOSHAS.contains(&line) {
            dosha = Some(line);
            continue;
        }

        if CHART_CATEGORIES.contains(&line) {
            category = Some(line);
            for rules in table.values_mut() {
                rules.entry(line.to_string()).or_default();
            }
            continue;
        }

        if line.eq_ignore_ascii_case("avoid") {
            mode = Some(Mode::Avoid);
            continue;
        }
        if line.eq_ignore_ascii_case("favor") {
            mode = Some(Mode::Favor);
            continue;
        }

        if let (Some(d), Some(c), Some(m)) = (dosha, category, mode) {
            let rules: &mut FoodRules = table
                .entry(d.to_string())
                .or_default()
                .entry(c.to_string())
                .or_default();
            match m {
                Mode::Avoid => rules.avoid.push(line.to_string()),
                Mode::Favor => rules.favor.push(line.to_string()),
            }
        }
    }

    RuleTable::from_map(table)
}
