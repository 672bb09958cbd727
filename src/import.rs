use crate::classifier::classify;
use crate::models::{NewTask, TaskStatus, Weekday};

const HEADER_MARKER: &str = "time";
const RANGE_DELIMITER: &str = " - ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("invalid CSV: no Time column found")]
    MissingHeader,
    #[error("invalid CSV: {0}")]
    Malformed(String),
}

/// Parses a weekly grid (time-slot rows x seven weekday columns) into unsaved tasks.
///
/// The header is the first record with a field containing "time" (case-insensitive);
/// every record after it is a data row. Quoted cells may span lines. Nothing is
/// returned unless the whole text parses, so a caller can insert the result in one go.
pub fn parse_schedule_csv(text: &str) -> Result<Vec<NewTask>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let records = reader
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| ImportError::Malformed(error.to_string()))?;

    let header = records
        .iter()
        .position(is_header)
        .ok_or(ImportError::MissingHeader)?;

    let mut tasks = Vec::new();
    for record in &records[header + 1..] {
        let Some(time_slot) = record.get(0).filter(|slot| !slot.is_empty()) else {
            continue;
        };
        let (start_time, end_time) = split_range(time_slot);

        for (day, content) in Weekday::ALL.iter().zip(record.iter().skip(1)) {
            if content.is_empty() {
                continue;
            }
            let (title, description) = match content.split_once(RANGE_DELIMITER) {
                Some((title, description)) => (title.trim(), description.trim()),
                None => (content, ""),
            };
            tasks.push(NewTask {
                title: title.to_string(),
                description: description.to_string(),
                time_slot: time_slot.to_string(),
                start_time: start_time.clone(),
                end_time: end_time.clone(),
                day: *day,
                category: classify(content),
                status: TaskStatus::Pending,
            });
        }
    }

    log::debug!(
        "parsed schedule csv header_record={} tasks={}",
        header,
        tasks.len()
    );
    Ok(tasks)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .any(|field| field.to_lowercase().contains(HEADER_MARKER))
}

fn split_range(time_slot: &str) -> (String, String) {
    match time_slot.split_once(RANGE_DELIMITER) {
        Some((start, end)) => (start.trim().to_string(), end.trim().to_string()),
        None => (time_slot.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskCategory;

    const HEADER: &str = "Time,Monday,Tuesday,Wednesday,Thursday,Friday,Saturday,Sunday";

    #[test]
    fn imports_quoted_row_into_monday_task() {
        let csv = format!("{HEADER}\n\"08:30 - 09:30\",\"HackerRank - practice\",,,,,,\n");
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");

        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.time_slot, "08:30 - 09:30");
        assert_eq!(task.start_time, "08:30");
        assert_eq!(task.end_time, "09:30");
        assert_eq!(task.title, "HackerRank");
        assert_eq!(task.description, "practice");
        assert_eq!(task.category, TaskCategory::CodingPractice);
        assert_eq!(task.day, Weekday::Monday);
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn missing_header_is_a_validation_error() {
        let csv = "Slot,Monday\n08:30 - 09:30,Python\n";
        assert_eq!(parse_schedule_csv(csv), Err(ImportError::MissingHeader));
        assert_eq!(parse_schedule_csv(""), Err(ImportError::MissingHeader));
    }

    #[test]
    fn maps_columns_to_weekdays_and_skips_empty_cells() {
        let csv = format!(
            "Weekly plan\n{HEADER}\n10:00 - 11:00,,English,,,,,Relax\n\n,Orphan cell,,,,,,\n"
        );
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].day, Weekday::Tuesday);
        assert_eq!(tasks[0].title, "English");
        assert_eq!(tasks[0].description, "");
        assert_eq!(tasks[0].category, TaskCategory::EnglishPractice);
        assert_eq!(tasks[1].day, Weekday::Sunday);
        assert_eq!(tasks[1].category, TaskCategory::Break);
    }

    #[test]
    fn category_uses_full_cell_content() {
        let csv = format!("{HEADER}\n09:00 - 10:00,Deep work - python refactor\n");
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");
        assert_eq!(tasks[0].title, "Deep work");
        assert_eq!(tasks[0].category, TaskCategory::CodingPractice);
    }

    #[test]
    fn description_keeps_text_after_first_delimiter() {
        let csv = format!("{HEADER}\r\n14:00 - 15:00,\"Project - API - auth, tokens\"\r\n");
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");
        assert_eq!(tasks[0].title, "Project");
        assert_eq!(tasks[0].description, "API - auth, tokens");
        assert_eq!(tasks[0].end_time, "15:00");
    }

    #[test]
    fn header_only_yields_no_tasks() {
        let tasks = parse_schedule_csv(HEADER).expect("csv should parse");
        assert!(tasks.is_empty());
    }

    #[test]
    fn quoted_cell_spanning_lines_keeps_following_columns() {
        let csv = format!(
            "{HEADER}\n\"08:30 - 09:30\",\"Book Writing - chapter 3\nnotes\",English\n"
        );
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Book Writing");
        assert_eq!(tasks[0].description, "chapter 3\nnotes");
        assert_eq!(tasks[0].day, Weekday::Monday);
        assert_eq!(tasks[0].category, TaskCategory::BookWriting);
        assert_eq!(tasks[1].title, "English");
        assert_eq!(tasks[1].day, Weekday::Tuesday);
    }

    #[test]
    fn doubled_quotes_unescape_inside_cells() {
        let csv = format!("{HEADER}\n18:00 - 19:00,\"Planning - say \"\"hi\"\"\", tea \n");
        let tasks = parse_schedule_csv(&csv).expect("csv should parse");
        assert_eq!(tasks[0].description, "say \"hi\"");
        assert_eq!(tasks[1].title, "tea");
        assert_eq!(tasks[1].day, Weekday::Tuesday);
    }
}
