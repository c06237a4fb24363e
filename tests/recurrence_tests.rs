use chrono::{NaiveDate, Weekday};
use cleancrew_be::services::recurrence::{RecurrenceRequest, occurrence_dates, parse_weekdays};
use pretty_assertions::assert_eq;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn weekly_projection_from_a_wednesday_template() {
    // Template Wednesday 2024-01-03, Mondays and Wednesdays selected,
    // closing 2024-01-17 inclusive: four occurrences, sorted ascending.
    let weekdays = parse_weekdays(&["Monday".to_string(), "Wednesday".to_string()]).unwrap();
    let dates = occurrence_dates(date(2024, 1, 3), &weekdays, date(2024, 1, 17));

    assert_eq!(
        dates,
        vec![
            date(2024, 1, 8),
            date(2024, 1, 10),
            date(2024, 1, 15),
            date(2024, 1, 17),
        ]
    );
}

#[test]
fn close_date_before_any_occurrence_produces_no_dates() {
    let dates = occurrence_dates(date(2024, 1, 3), &[Weekday::Sat], date(2024, 1, 3));
    assert!(dates.is_empty());
}

#[test]
fn a_year_of_single_weekday_occurrences() {
    let dates = occurrence_dates(date(2024, 1, 1), &[Weekday::Mon], date(2024, 12, 30));

    assert_eq!(dates.len(), 52);
    assert_eq!(dates.first(), Some(&date(2024, 1, 8)));
    assert_eq!(dates.last(), Some(&date(2024, 12, 30)));
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn recurrence_request_reads_camel_case_json() {
    let request: RecurrenceRequest = serde_json::from_str(
        r#"{"selectedWeekdays": ["Monday", "Thursday"], "closeDate": "2024-02-29"}"#,
    )
    .unwrap();

    assert_eq!(request.selected_weekdays.len(), 2);
    assert_eq!(request.close_date, date(2024, 2, 29));
}
