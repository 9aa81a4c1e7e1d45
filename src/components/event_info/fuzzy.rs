use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Captures;
use regex::Regex;
use thiserror::Error;

/// Why no timestamp could be taken from a text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("No date found in text")]
    NoDateFound,
    #[error("Invalid date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("Invalid time {hour:02}:{minute:02}:{second:02}")]
    InvalidTime { hour: u32, minute: u32, second: u32 },
}

/// Every date or time fragment the scanner understands. Alternatives are
/// tried left to right at each position, so compound forms come first.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?xi)
          (?P<iso_y>[0-9]{4})-(?P<iso_m>[0-9]{1,2})-(?P<iso_d>[0-9]{1,2})
        | (?P<sl_a>[0-9]{1,4})/(?P<sl_b>[0-9]{1,2})/(?P<sl_c>[0-9]{1,4})
        | (?:(?P<kj_y>[0-9]{4})\s*年\s*)?(?P<kj_m>[0-9]{1,2})\s*月\s*(?P<kj_d>[0-9]{1,2})\s*日
        | (?P<kt_h>[0-9]{1,2})\s*時(?:\s*(?P<kt_min>[0-9]{1,2})\s*分|(?P<kt_half>半))?
        | (?P<cl_h>[0-9]{1,2}):(?P<cl_min>[0-9]{2})(?::(?P<cl_s>[0-9]{2}))?
          (?:\s*(?P<cl_ap>[ap])\.?m\b\.?)?
        | (?P<ap_h>[0-9]{1,2})\s*(?P<ap>[ap])\.?m\b\.?
        | \b(?P<month>jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?
            |aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\b
        | (?P<ord>[0-9]{1,2})(?:st|nd|rd|th)\b
        | (?P<num>[0-9]+)
        ",
    )
    .expect("date token pattern is valid")
});

/// Scans free-form text for a single date and time, ignoring every word
/// that is not part of one.
///
/// The first occurrence of each field wins. A complete date (`2025-03-14`,
/// `3/14/2025`, `2025年3月14日`) overrides loose fields picked up before it.
/// Fields the text does not mention are taken from the reference
/// timestamp; when a time is mentioned its missing minutes and seconds are
/// zero.
#[derive(Debug, Clone)]
pub struct FuzzyDateParser {
    reference: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Fields {
    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    date_locked: bool,
}

impl Fields {
    fn is_empty(&self) -> bool {
        self.year.is_none() && self.month.is_none() && self.day.is_none() && self.hour.is_none()
    }

    fn set_date(&mut self, year: Option<i32>, month: u32, day: u32) {
        if self.date_locked || !plausible_date(month, day) {
            return;
        }
        if year.is_some() {
            self.year = year;
        }
        self.month = Some(month);
        self.day = Some(day);
        self.date_locked = true;
    }

    fn set_time(&mut self, hour: u32, minute: u32, second: u32) {
        if self.hour.is_some() {
            return;
        }
        self.hour = Some(hour);
        self.minute = Some(minute);
        self.second = Some(second);
    }
}

impl FuzzyDateParser {
    /// Create a parser that fills missing fields from `reference`
    pub fn new(reference: NaiveDateTime) -> Self {
        Self { reference }
    }

    /// Reference timestamp used for missing fields
    pub fn reference(&self) -> NaiveDateTime {
        self.reference
    }

    /// Find the first date/time in `text`
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime, DateParseError> {
        let normalized = normalize(text);
        let mut fields = Fields::default();
        let mut month_at: Option<usize> = None;
        let mut last_small: Option<(usize, u32)> = None;

        for (index, caps) in TOKEN.captures_iter(&normalized).enumerate() {
            if caps.name("iso_y").is_some() {
                if let (Some(y), Some(m), Some(d)) = (
                    value(&caps, "iso_y"),
                    value(&caps, "iso_m"),
                    value(&caps, "iso_d"),
                ) {
                    fields.set_date(Some(y as i32), m, d);
                }
            } else if caps.name("sl_a").is_some() {
                if let Some((y, m, d)) = self.slash_date(&caps) {
                    fields.set_date(Some(y), m, d);
                }
            } else if caps.name("kj_m").is_some() {
                if let (Some(m), Some(d)) = (value(&caps, "kj_m"), value(&caps, "kj_d")) {
                    let year = value(&caps, "kj_y").map(|y| y as i32);
                    fields.set_date(year, m, d);
                }
            } else if caps.name("kt_h").is_some() {
                // 2時間 is a duration, not a clock time
                let whole = caps.get(0).map_or(0, |m| m.end());
                let minute = value(&caps, "kt_min")
                    .or_else(|| caps.name("kt_half").map(|_| 30));
                if minute.is_none() && normalized[whole..].starts_with('間') {
                    continue;
                }
                if let Some(hour) = value(&caps, "kt_h") {
                    fields.set_time(hour, minute.unwrap_or(0), 0);
                }
            } else if caps.name("cl_h").is_some() {
                if let (Some(h), Some(m)) = (value(&caps, "cl_h"), value(&caps, "cl_min")) {
                    let hour = apply_meridiem(h, caps.name("cl_ap").map(|m| m.as_str()));
                    fields.set_time(hour, m, value(&caps, "cl_s").unwrap_or(0));
                }
            } else if caps.name("ap_h").is_some() {
                if let Some(h) = value(&caps, "ap_h") {
                    let hour = apply_meridiem(h, caps.name("ap").map(|m| m.as_str()));
                    fields.set_time(hour, 0, 0);
                }
            } else if let Some(name) = caps.name("month") {
                if fields.date_locked || fields.month.is_some() {
                    continue;
                }
                fields.month = month_number(name.as_str());
                month_at = Some(index);
                // "5 January"
                if let Some((at, n)) = last_small {
                    if at + 1 == index && fields.day.is_none() {
                        fields.day = Some(n);
                    }
                }
            } else if caps.name("ord").is_some() {
                if let Some(n) = value(&caps, "ord").filter(|n| (1..=31).contains(n)) {
                    if !fields.date_locked && fields.day.is_none() {
                        fields.day = Some(n);
                    }
                }
            } else if let Some(num) = caps.name("num") {
                let digits = num.as_str();
                let Ok(n) = digits.parse::<u32>() else {
                    continue;
                };
                if digits.len() == 4 && (1900..=2100).contains(&n) {
                    if fields.year.is_none() {
                        fields.year = Some(n as i32);
                    }
                } else if digits.len() <= 2 && (1..=31).contains(&n) {
                    // "January 5"
                    if month_at.is_some_and(|at| at + 1 == index)
                        && !fields.date_locked
                        && fields.day.is_none()
                    {
                        fields.day = Some(n);
                    } else {
                        last_small = Some((index, n));
                    }
                }
            }
        }

        if fields.is_empty() {
            return Err(DateParseError::NoDateFound);
        }

        self.assemble(&fields)
    }

    fn slash_date(&self, caps: &Captures<'_>) -> Option<(i32, u32, u32)> {
        let a = caps.name("sl_a")?.as_str();
        let b: u32 = caps.name("sl_b")?.as_str().parse().ok()?;
        let c = caps.name("sl_c")?.as_str();

        if a.len() == 4 {
            // 2025/03/14
            return Some((a.parse().ok()?, b, c.parse().ok()?));
        }

        // 03/14/2025 or 03/14/25, swapped when the first part cannot be a month
        let (mut month, mut day): (u32, u32) = (a.parse().ok()?, b);
        if month > 12 && day <= 12 {
            std::mem::swap(&mut month, &mut day);
        }
        let year = match c.len() {
            4 => c.parse().ok()?,
            1 | 2 => expand_year(c.parse().ok()?, self.reference.year()),
            _ => return None,
        };
        Some((year, month, day))
    }

    fn assemble(&self, fields: &Fields) -> Result<NaiveDateTime, DateParseError> {
        let year = fields.year.unwrap_or(self.reference.year());
        let month = fields.month.unwrap_or(self.reference.month());
        let day = fields
            .day
            .unwrap_or_else(|| self.reference.day().min(days_in_month(year, month)));

        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(DateParseError::InvalidDate { year, month, day })?;

        let time = match fields.hour {
            Some(hour) => {
                let minute = fields.minute.unwrap_or(0);
                let second = fields.second.unwrap_or(0);
                NaiveTime::from_hms_opt(hour, minute, second).ok_or(
                    DateParseError::InvalidTime {
                        hour,
                        minute,
                        second,
                    },
                )?
            }
            None => self.reference.time(),
        };

        Ok(date.and_time(time))
    }
}

fn value(caps: &Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

fn plausible_date(month: u32, day: u32) -> bool {
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn apply_meridiem(hour: u32, meridiem: Option<&str>) -> u32 {
    match meridiem.map(str::to_ascii_lowercase).as_deref() {
        Some("a") if hour == 12 => 0,
        Some("p") if (1..12).contains(&hour) => hour + 12,
        _ => hour,
    }
}

/// Two-digit years land within 50 years of the reference year
fn expand_year(short: u32, reference_year: i32) -> i32 {
    let century = reference_year - reference_year.rem_euclid(100);
    let year = century + short as i32;
    if year > reference_year + 50 {
        year - 100
    } else if year <= reference_year - 50 {
        year + 100
    } else {
        year
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

/// Fold full-width digits and separators common in Japanese documents
fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '：' => ':',
            '／' => '/',
            '－' => '-',
            '　' => ' ',
            _ => c,
        })
        .collect()
}
