//! Rendering of typed field values into display properties.
//!
//! The live variant of the property codec: the field's type tag selects the
//! rendering rule, and an origin-absent (null) value renders as an empty
//! string rather than failing.

use chrono::{DateTime, FixedOffset, Utc};
use rowcal_core::Property;

use crate::live::wire::{rich_text_to_string, DateValue, FieldValue, ScalarValue};

/// Canonical date-time display format for rendered field values.
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a named field value into a display property.
pub fn render_property(name: &str, value: &FieldValue) -> Property {
    Property::new(name, render_value(value))
}

/// Renders a field value into its display string.
pub fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Title { title } => rich_text_to_string(title),
        FieldValue::RichText { rich_text } => rich_text_to_string(rich_text),
        FieldValue::Number { number } => number.map(|n| format!("{n:.6}")).unwrap_or_default(),
        FieldValue::Select { select } => option_label(select.as_ref()),
        FieldValue::Status { status } => option_label(status.as_ref()),
        FieldValue::MultiSelect { multi_select } => multi_select
            .iter()
            .map(|option| option.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Date { date } => date.as_ref().map(render_date).unwrap_or_default(),
        FieldValue::Formula { formula } => formula.as_ref().map(render_scalar).unwrap_or_default(),
        FieldValue::Rollup { rollup } => rollup.as_ref().map(render_scalar).unwrap_or_default(),
        FieldValue::Relation { relation } => relation
            .iter()
            .map(|reference| reference.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::People { people } => people
            .iter()
            .map(|person| person.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Files { files } => files
            .iter()
            .map(|file| file.url())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Checkbox { checkbox } => match checkbox {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => String::new(),
        },
        FieldValue::Url { url } => url.clone().unwrap_or_default(),
        FieldValue::Email { email } => email.clone().unwrap_or_default(),
        FieldValue::PhoneNumber { phone_number } => phone_number.clone().unwrap_or_default(),
        FieldValue::CreatedTime { created_time } => render_timestamp(created_time.as_ref()),
        FieldValue::LastEditedTime { last_edited_time } => {
            render_timestamp(last_edited_time.as_ref())
        }
        FieldValue::CreatedBy { created_by } => person_name(created_by.as_ref()),
        FieldValue::LastEditedBy { last_edited_by } => person_name(last_edited_by.as_ref()),
        FieldValue::Unknown => String::new(),
    }
}

fn option_label(option: Option<&crate::live::wire::SelectOption>) -> String {
    option.map(|o| o.name.clone()).unwrap_or_default()
}

fn person_name(person: Option<&crate::live::wire::Person>) -> String {
    person.map(|p| p.name.clone()).unwrap_or_default()
}

fn render_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn render_date(date: &DateValue) -> String {
    match date.end {
        Some(end) => format!(
            "{} \u{2192} {}",
            format_local(&date.start),
            format_local(&end)
        ),
        None => format_local(&date.start),
    }
}

fn format_local(instant: &DateTime<FixedOffset>) -> String {
    instant.format(DATE_TIME_FORMAT).to_string()
}

fn render_scalar(scalar: &ScalarValue) -> String {
    match scalar {
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::Number(n) => n.to_string(),
        ScalarValue::String(s) => s.clone(),
        ScalarValue::Date(date) => render_date(date),
    }
}
