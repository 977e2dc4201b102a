use crate::models::{Category, FootprintResult, Suggestion};

/// Annual kg CO2e above which a category earns a tip.
const THRESHOLDS: [(Category, f64, &str); 4] = [
    (
        Category::Transport,
        2_000.0,
        "Combine trips or carpool; prefer trains over short-haul flights and offset the rest.",
    ),
    (
        Category::Electricity,
        2_200.0,
        "Improve home efficiency: LED bulbs, efficient appliances, and switch off standby loads.",
    ),
    (
        Category::Diet,
        700.0,
        "Reduce beef intake or swap it for chicken or plant-based options.",
    ),
    (
        Category::Shopping,
        1_000.0,
        "Buy fewer, longer-lasting goods and favour repair or second-hand.",
    ),
];

const BALANCED: &str = "Nice balance of activities; keep tracking to find small improvements.";

/// Tips for every category over its threshold, largest overshoot first.
pub fn suggest(result: &FootprintResult) -> Vec<Suggestion> {
    let mut ranked: Vec<(f64, Suggestion)> = Vec::new();
    for (category, limit, text) in THRESHOLDS {
        let subtotal = result.subtotal(category);
        if subtotal > limit {
            let suggestion = Suggestion {
                category: Some(category),
                text,
            };
            ranked.push((subtotal / limit, suggestion));
        }
    }

    if ranked.is_empty() {
        return vec![Suggestion {
            category: None,
            text: BALANCED,
        }];
    }

    // stable sort keeps table order on ties
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().map(|(_, suggestion)| suggestion).collect()
}
