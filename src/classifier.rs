use crate::models::TaskCategory;

/// Ordered keyword rules; the first rule with a matching keyword wins.
const RULES: &[(TaskCategory, &[&str])] = &[
    (TaskCategory::CodingPractice, &["hackerrank", "python"]),
    (TaskCategory::BookWriting, &["book writing"]),
    (TaskCategory::EnglishPractice, &["english"]),
    (TaskCategory::Networking, &["github", "linkedin"]),
    (TaskCategory::Planning, &["planning", "reflection"]),
    (
        TaskCategory::Break,
        &["lunch", "dinner", "tea", "walk", "relax"],
    ),
    (TaskCategory::ProjectsResearch, &["project", "research"]),
];

const FALLBACK: TaskCategory = TaskCategory::ProjectsResearch;

/// Maps a free-text task title to a category with case-insensitive substring rules.
pub fn classify(title: &str) -> TaskCategory {
    let lower = title.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_each_rule() {
        assert_eq!(classify("HackerRank - arrays"), TaskCategory::CodingPractice);
        assert_eq!(classify("Python drills"), TaskCategory::CodingPractice);
        assert_eq!(classify("Book Writing session"), TaskCategory::BookWriting);
        assert_eq!(classify("English podcast"), TaskCategory::EnglishPractice);
        assert_eq!(classify("GitHub cleanup"), TaskCategory::Networking);
        assert_eq!(classify("LinkedIn post"), TaskCategory::Networking);
        assert_eq!(classify("Weekly planning"), TaskCategory::Planning);
        assert_eq!(classify("Evening Reflection"), TaskCategory::Planning);
        assert_eq!(classify("Relax"), TaskCategory::Break);
        assert_eq!(classify("Lunch"), TaskCategory::Break);
        assert_eq!(classify("Research papers"), TaskCategory::ProjectsResearch);
    }

    #[test]
    fn unmatched_titles_fall_back_to_projects_research() {
        assert_eq!(
            classify("Random unrelated text"),
            TaskCategory::ProjectsResearch
        );
        assert_eq!(classify(""), TaskCategory::ProjectsResearch);
    }

    #[test]
    fn earlier_rules_win() {
        // "python" beats "project".
        assert_eq!(classify("Python project"), TaskCategory::CodingPractice);
        // "english" beats "walk".
        assert_eq!(classify("English walk and talk"), TaskCategory::EnglishPractice);
        // Substring matching: "tea" inside "team".
        assert_eq!(classify("Team sync"), TaskCategory::Break);
    }
}
