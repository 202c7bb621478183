//! Domain <-> widget value conversion, one strategy per variant.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use tabula_model::LookupOption;

use crate::errors::{FormError, FormResult};
use crate::value::{FieldValue, WidgetValue};

/// Conversion policy of one control variant.
pub trait ValueCodec {
    /// Folds every accepted input shape into the variant's domain type.
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue>;

    fn to_widget(&self, value: &FieldValue) -> WidgetValue;

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue>;
}

/// Epoch milliseconds of a local wall-clock time.
pub fn local_millis(dt: &NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(dt)
        .earliest()
        .map(|local| local.timestamp_millis())
        .unwrap_or_else(|| dt.and_utc().timestamp_millis())
}

/// Local wall-clock time of an epoch-millisecond timestamp.
pub fn from_local_millis(field: &str, ms: i64) -> FormResult<NaiveDateTime> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|local| local.naive_local())
        .ok_or_else(|| FormError::conversion(field, ms))
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn parse_iso_date(field: &str, input: &str) -> FormResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| FormError::conversion(field, input))
}

/// ISO date-time; a bare date means midnight.
pub fn parse_iso_datetime(field: &str, input: &str) -> FormResult<NaiveDateTime> {
    let trimmed = input.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::default()))
        })
        .ok_or_else(|| FormError::conversion(field, input))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextCodec;

impl ValueCodec for TextCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::Text(_) => Ok(input),
            FieldValue::Number(n) => Ok(FieldValue::Text(n.to_string())),
            FieldValue::Bool(b) => Ok(FieldValue::Text(b.to_string())),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::Text(s) => WidgetValue::Text(s.clone()),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, _field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        Ok(match raw {
            WidgetValue::Empty => FieldValue::Null,
            WidgetValue::Number(n) => FieldValue::Text(n.to_string()),
            other => FieldValue::Text(other.describe()),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NumberCodec;

impl NumberCodec {
    fn parse(field: &str, text: &str) -> FormResult<FieldValue> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(FieldValue::Null);
        }
        trimmed
            .parse::<f64>()
            .map(FieldValue::Number)
            .map_err(|_| FormError::conversion(field, text))
    }
}

impl ValueCodec for NumberCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::Number(_) => Ok(input),
            FieldValue::Text(s) => Self::parse(field, &s),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::Number(n) => WidgetValue::Number(*n),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Empty => Ok(FieldValue::Null),
            WidgetValue::Number(n) => Ok(FieldValue::Number(n)),
            WidgetValue::Text(s) => Self::parse(field, &s),
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

/// Calendar date; the widget holds local midnight in epoch milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateCodec;

impl ValueCodec for DateCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::Date(_) => Ok(input),
            FieldValue::DateTime(dt) => Ok(FieldValue::Date(dt.date())),
            FieldValue::Text(s) => parse_iso_date(field, &s).map(FieldValue::Date),
            FieldValue::Timestamp(ms) => from_local_millis(field, ms).map(|dt| FieldValue::Date(dt.date())),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::Date(d) => WidgetValue::Timestamp(local_millis(&d.and_time(NaiveTime::default()))),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Empty => Ok(FieldValue::Null),
            WidgetValue::Timestamp(ms) => from_local_millis(field, ms).map(|dt| FieldValue::Date(dt.date())),
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

/// Naive date-time.
///
/// Writes truncate to whole seconds before reaching the widget, so
/// sub-second precision does not survive a mounted round trip.
#[derive(Debug, Default, Clone, Copy)]
pub struct DateTimeCodec;

impl ValueCodec for DateTimeCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::DateTime(_) => Ok(input),
            FieldValue::Date(d) => Ok(FieldValue::DateTime(d.and_time(NaiveTime::default()))),
            FieldValue::Text(s) => parse_iso_datetime(field, &s).map(FieldValue::DateTime),
            FieldValue::Timestamp(ms) => from_local_millis(field, ms).map(FieldValue::DateTime),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::DateTime(dt) => WidgetValue::Timestamp(local_millis(dt).div_euclid(1000) * 1000),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Empty => Ok(FieldValue::Null),
            WidgetValue::Timestamp(ms) => from_local_millis(field, ms).map(FieldValue::DateTime),
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

/// Time of day, carried as a date-time on 1970-01-01 with seconds cleared.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeCodec;

impl TimeCodec {
    pub fn anchor(field: &str, hour: u32, minute: u32) -> FormResult<NaiveDateTime> {
        NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .ok_or_else(|| FormError::conversion(field, format!("{:02}:{:02}", hour, minute)))
    }

    fn parse(field: &str, text: &str) -> FormResult<NaiveDateTime> {
        let trimmed = text.trim();
        let time = ["%H:%M:%S", "%H:%M"]
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok());
        match time {
            Some(time) => Ok(time_of(time)),
            None => parse_iso_datetime(field, text),
        }
    }
}

fn time_of(time: NaiveTime) -> NaiveDateTime {
    NaiveDate::default().and_time(time)
}

impl ValueCodec for TimeCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        let dt = match input {
            FieldValue::Null => return Ok(FieldValue::Null),
            FieldValue::DateTime(dt) => dt,
            FieldValue::Text(s) => Self::parse(field, &s)?,
            FieldValue::Timestamp(ms) => from_local_millis(field, ms)?,
            other => return Err(FormError::conversion(field, format!("{:?}", other))),
        };
        Self::anchor(field, dt.hour(), dt.minute()).map(FieldValue::DateTime)
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::DateTime(dt) => match Self::anchor("", dt.hour(), dt.minute()) {
                Ok(anchored) => WidgetValue::Timestamp(local_millis(&anchored)),
                Err(_) => WidgetValue::Empty,
            },
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Empty => Ok(FieldValue::Null),
            WidgetValue::Timestamp(ms) => {
                let dt = from_local_millis(field, ms)?;
                Self::anchor(field, dt.hour(), dt.minute()).map(FieldValue::DateTime)
            }
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CheckboxCodec;

impl ValueCodec for CheckboxCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::Bool(_) => Ok(input),
            FieldValue::Number(n) => Ok(FieldValue::Bool(n != 0.0)),
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(FieldValue::Bool(true)),
                "false" | "0" | "no" | "" => Ok(FieldValue::Bool(false)),
                _ => Err(FormError::conversion(field, s)),
            },
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        WidgetValue::Checked(matches!(value, FieldValue::Bool(true)))
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Checked(b) => Ok(FieldValue::Bool(b)),
            WidgetValue::Empty => Ok(FieldValue::Bool(false)),
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

/// Opaque payloads: radio option values, signatures, inline messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadCodec;

impl ValueCodec for PayloadCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null | FieldValue::Text(_) => Ok(input),
            FieldValue::Number(n) => Ok(FieldValue::Text(n.to_string())),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::Text(s) => WidgetValue::Text(s.clone()),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, _field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        Ok(match raw {
            WidgetValue::Empty => FieldValue::Null,
            other => FieldValue::Text(other.describe()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    Single,
    Multi,
}

/// Option objects in the domain, identifiers in the widget.
#[derive(Debug, Clone)]
pub struct OptionCodec {
    options: Rc<RefCell<Vec<LookupOption>>>,
    mode: SelectMode,
}

impl OptionCodec {
    pub fn new(options: Rc<RefCell<Vec<LookupOption>>>, mode: SelectMode) -> Self {
        Self { options, mode }
    }

    fn find(&self, uid: &str) -> Option<LookupOption> {
        self.options.borrow().iter().find(|o| o.uid == uid).cloned()
    }

    fn find_required(&self, field: &str, uid: &str) -> FormResult<LookupOption> {
        self.find(uid).ok_or_else(|| FormError::conversion(field, uid))
    }
}

impl ValueCodec for OptionCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match (self.mode, input) {
            (_, FieldValue::Null) => Ok(FieldValue::Null),
            (SelectMode::Single, FieldValue::Option(o)) => Ok(FieldValue::Option(o)),
            (SelectMode::Single, FieldValue::Text(uid)) => self.find_required(field, &uid).map(FieldValue::Option),
            (SelectMode::Multi, FieldValue::Options(list)) => Ok(FieldValue::Options(list)),
            (SelectMode::Multi, FieldValue::Option(o)) => Ok(FieldValue::Options(vec![o])),
            (SelectMode::Multi, FieldValue::Text(uid)) => {
                self.find_required(field, &uid).map(|o| FieldValue::Options(vec![o]))
            }
            (_, other) => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, value: &FieldValue) -> WidgetValue {
        match value {
            FieldValue::Option(o) => WidgetValue::Id(o.uid.clone()),
            FieldValue::Options(list) => WidgetValue::Ids(list.iter().map(|o| o.uid.clone()).collect()),
            _ => WidgetValue::Empty,
        }
    }

    fn from_widget(&self, field: &str, raw: WidgetValue) -> FormResult<FieldValue> {
        match raw {
            WidgetValue::Empty => Ok(FieldValue::Null),
            WidgetValue::Id(uid) | WidgetValue::Text(uid) => Ok(self.find(&uid).map(FieldValue::Option).unwrap_or_default()),
            WidgetValue::Ids(ids) => Ok(FieldValue::Options(ids.iter().filter_map(|uid| self.find(uid)).collect())),
            other => Err(FormError::conversion(field, other.describe())),
        }
    }
}

/// Uploaded file lists; the widget never holds the domain value.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesCodec;

impl ValueCodec for FilesCodec {
    fn normalize(&self, field: &str, input: FieldValue) -> FormResult<FieldValue> {
        match input {
            FieldValue::Null => Ok(FieldValue::Files(Vec::new())),
            FieldValue::Files(_) => Ok(input),
            FieldValue::Options(list) if list.is_empty() => Ok(FieldValue::Files(Vec::new())),
            other => Err(FormError::conversion(field, format!("{:?}", other))),
        }
    }

    fn to_widget(&self, _value: &FieldValue) -> WidgetValue {
        WidgetValue::Empty
    }

    fn from_widget(&self, _field: &str, _raw: WidgetValue) -> FormResult<FieldValue> {
        Ok(FieldValue::Files(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_accepts_three_shapes() {
        let codec = DateCodec;
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let from_text = codec.normalize("due", FieldValue::from("2024-03-15")).unwrap();
        let from_date = codec.normalize("due", FieldValue::Date(date)).unwrap();
        let millis = match codec.to_widget(&from_date) {
            WidgetValue::Timestamp(ms) => ms,
            other => panic!("unexpected widget value {:?}", other),
        };
        let from_stamp = codec.normalize("due", FieldValue::Timestamp(millis)).unwrap();
        assert_eq!(from_text, from_date);
        assert_eq!(from_stamp, from_date);
    }

    #[test]
    fn test_bad_date_names_field_and_input() {
        let err = DateCodec.normalize("due", FieldValue::from("15/03/2024")).unwrap_err();
        match err {
            FormError::ValueConversion { field, input } => {
                assert_eq!(field, "due");
                assert_eq!(input, "15/03/2024");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_time_drops_seconds() {
        let value = TimeCodec.normalize("start", FieldValue::from("09:45:31")).unwrap();
        assert_eq!(value, FieldValue::DateTime(TimeCodec::anchor("start", 9, 45).unwrap()));
    }

    #[test]
    fn test_iso_datetime_variants() {
        assert!(parse_iso_datetime("at", "2024-03-15T10:30:00").is_ok());
        assert!(parse_iso_datetime("at", "2024-03-15 10:30").is_ok());
        assert!(parse_iso_datetime("at", "2024-03-15").is_ok());
        assert!(parse_iso_datetime("at", "tomorrow").is_err());
    }
}
