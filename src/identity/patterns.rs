//! Link field derivation from filepaths and records

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::layout::AnchorLinkSpec;
use crate::normalize::{ExternalRecord, is_sentinel, parse_datetime};

static TC_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^TC--(20\d{2}(?:0\d|1[0-2])(?:[0-2]\d|3[0-1]))--(\d{5})\.bmp$").unwrap()
});

static HS_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^HS--(20\d{2}(?:0\d|1[0-2])(?:[0-2]\d|3[0-1]))--(\d{5})$").unwrap()
});

static DATE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(20\d{2})_(0\d|1[0-2])_([0-2]\d|3[0-1])$").unwrap());

static CAMERA_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Camera_((?:[0-1]\d|2[0-3])_[0-5]\d_[0-5]\d)$").unwrap());

static CAMERA_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-1]\d|2[0-3])_[0-5]\d_[0-5]\d$").unwrap());

/// Fields used to link a record to a metadata anchor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkFields {
    pub datestamp: Option<NaiveDate>,
    pub day_counter: Option<i64>,
    pub camera_tag: Option<String>,
}

impl LinkFields {
    pub fn is_empty(&self) -> bool {
        self.datestamp.is_none() && self.day_counter.is_none() && self.camera_tag.is_none()
    }

    /// Derive fields from a relative filepath
    ///
    /// Every rule is tried; later rules overwrite fields set by earlier ones.
    /// A rule with zero or several candidate segments sets nothing.
    pub fn from_path(rel_filepath: &str) -> Self {
        let segments: Vec<&str> = rel_filepath
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();
        let mut fields = LinkFields::default();

        if let Some(filename) = segments.last() {
            if let Some(caps) = TC_FILENAME.captures(filename) {
                fields.set_date_and_counter(&caps[1], &caps[2]);
            }
        }

        if let Some(caps) = single_match(&segments, &HS_SEGMENT) {
            fields.set_date_and_counter(&caps[1], &caps[2]);
        }

        if let Some(caps) = single_match(&segments, &DATE_SEGMENT) {
            if let Some(date) = parse_compact_date(&format!("{}{}{}", &caps[1], &caps[2], &caps[3]))
            {
                fields.datestamp = Some(date);
            }
        }

        if let Some(caps) = single_match(&segments, &CAMERA_SEGMENT) {
            fields.camera_tag = Some(caps[1].to_string());
        }

        fields
    }

    /// Derive fields from the link columns of a record
    pub fn from_record(record: &ExternalRecord, spec: &AnchorLinkSpec) -> Self {
        let field = |column: &Option<String>| {
            column
                .as_deref()
                .and_then(|c| record.get(c))
                .filter(|v| !is_sentinel(v))
        };

        let datestamp = field(&spec.date_column)
            .and_then(Value::as_str)
            .and_then(parse_datetime)
            .map(|dt| dt.date());

        let day_counter = field(&spec.day_counter_column).and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        let camera_tag = field(&spec.camera_column)
            .and_then(Value::as_str)
            .and_then(camera_tag_from_text);

        LinkFields {
            datestamp,
            day_counter,
            camera_tag,
        }
    }

    fn set_date_and_counter(&mut self, date: &str, counter: &str) {
        if let Some(date) = parse_compact_date(date) {
            self.datestamp = Some(date);
        }
        if let Ok(counter) = counter.parse() {
            self.day_counter = Some(counter);
        }
    }
}

/// Camera tag from a camera filename, path or bare `hh_mm_ss` tag
fn camera_tag_from_text(text: &str) -> Option<String> {
    let text = text.trim();
    if CAMERA_TAG.is_match(text) {
        return Some(text.to_string());
    }
    LinkFields::from_path(text).camera_tag
}

fn single_match<'a>(segments: &[&'a str], pattern: &Regex) -> Option<regex::Captures<'a>> {
    let mut matches = segments.iter().copied().filter_map(|s| pattern.captures(s));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}

fn parse_compact_date(digits: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_tc_filename() {
        let fields = LinkFields::from_path("run/TC--20230415--00042.bmp");
        assert_eq!(fields.datestamp, date(2023, 4, 15));
        assert_eq!(fields.day_counter, Some(42));
        assert_eq!(fields.camera_tag, None);
    }

    #[test]
    fn test_single_hs_segment() {
        let fields = LinkFields::from_path("HS--20230415--00042/frame_0001.bmp");
        assert_eq!(fields.datestamp, date(2023, 4, 15));
        assert_eq!(fields.day_counter, Some(42));
    }

    #[test]
    fn test_zero_or_two_hs_segments_leave_fields_unset() {
        let none = LinkFields::from_path("videos/frame_0001.bmp");
        assert_eq!(none, LinkFields::default());
        assert!(none.is_empty());

        let two = LinkFields::from_path("HS--20230415--00042/HS--20230416--00043/frame.bmp");
        assert_eq!(two.datestamp, None);
        assert_eq!(two.day_counter, None);
    }

    #[test]
    fn test_date_and_camera_segments() {
        let fields = LinkFields::from_path("2023_04_15/Camera_11_30_10/frame_0001.bmp");
        assert_eq!(fields.datestamp, date(2023, 4, 15));
        assert_eq!(fields.day_counter, None);
        assert_eq!(fields.camera_tag.as_deref(), Some("11_30_10"));
    }

    #[test]
    fn test_later_rules_overwrite_earlier() {
        let fields = LinkFields::from_path("2023_05_01/TC--20230415--00042.bmp");
        assert_eq!(fields.datestamp, date(2023, 5, 1));
        assert_eq!(fields.day_counter, Some(42));
    }

    #[test]
    fn test_invalid_calendar_date_is_unset() {
        let fields = LinkFields::from_path("TC--20230231--00007.bmp");
        assert_eq!(fields.datestamp, None);
        assert_eq!(fields.day_counter, Some(7));

        assert_eq!(LinkFields::from_path("2023_02_30/x.bmp").datestamp, None);
    }

    #[test]
    fn test_camera_pattern_rejects_bad_times() {
        assert_eq!(LinkFields::from_path("Camera_24_00_00/x.bmp").camera_tag, None);
        assert_eq!(LinkFields::from_path("Camera_11_30_10_extra/x.bmp").camera_tag, None);
    }

    #[test]
    fn test_windows_separators() {
        let fields = LinkFields::from_path(r"HS--20230415--00042\TC--20230415--00042.bmp");
        assert_eq!(fields.day_counter, Some(42));
    }

    #[test]
    fn test_from_record() {
        let spec = AnchorLinkSpec {
            date_column: Some("Date".to_string()),
            day_counter_column: Some("Day".to_string()),
            camera_column: Some("Camera".to_string()),
        };
        let record = ExternalRecord::new(
            "Experiment",
            json!({"Date": "04/15/2023", "Day": "7", "Camera": "Camera_11_30_10"})
                .as_object()
                .unwrap()
                .clone(),
        );
        let fields = LinkFields::from_record(&record, &spec);
        assert_eq!(fields.datestamp, date(2023, 4, 15));
        assert_eq!(fields.day_counter, Some(7));
        assert_eq!(fields.camera_tag.as_deref(), Some("11_30_10"));

        let bare = ExternalRecord::new(
            "Experiment",
            json!({"Date": "N/A", "Day": 3, "Camera": "09_15_00"})
                .as_object()
                .unwrap()
                .clone(),
        );
        let fields = LinkFields::from_record(&bare, &spec);
        assert_eq!(fields.datestamp, None);
        assert_eq!(fields.day_counter, Some(3));
        assert_eq!(fields.camera_tag.as_deref(), Some("09_15_00"));
    }
}
