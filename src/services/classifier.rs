//! Failure taxonomy rules.

use std::collections::BTreeMap;

use crate::models::Category;

/// Ordered `(substrings, category)` rules; the first rule with any
/// substring contained in the lowercased reason wins.
pub const CATEGORY_RULES: &[(&[&str], Category)] = &[
    (&["test"], Category::TestFailures),
    (&["build"], Category::BuildFailures),
    (&["timeout"], Category::TimeoutIssues),
    (&["dependency"], Category::DependencyProblems),
    (&["permission"], Category::PermissionIssues),
    (&["network", "connection"], Category::NetworkProblems),
];

/// Map a failure reason to its category. Total; unmatched reasons are
/// [`Category::OtherIssues`].
pub fn classify(reason: &str) -> Category {
    let lowered = reason.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lowered.contains(n)))
        .map(|(_, category)| *category)
        .unwrap_or(Category::OtherIssues)
}

/// Group reasons by category. Input order is kept within each group.
pub fn group_by_category<R>(reasons: impl IntoIterator<Item = R>) -> BTreeMap<Category, Vec<R>>
where
    R: AsRef<str>,
{
    let mut groups: BTreeMap<Category, Vec<R>> = BTreeMap::new();
    for reason in reasons {
        groups
            .entry(classify(reason.as_ref()))
            .or_default()
            .push(reason);
    }
    groups
}
