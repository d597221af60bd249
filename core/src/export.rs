//! CSV rendering for the admin export.

use chrono::NaiveDate;

use crate::submission::{Submission, format_timestamp};

pub const CSV_HEADER: &str = "Name,Email,Phone,Message,Status,Created At";

/// Render submissions as CSV. Every field is quoted with embedded quotes
/// doubled; rows are joined with `\n`.
pub fn render_csv(rows: &[Submission]) -> String {
    let mut out = String::from(CSV_HEADER);
    for row in rows {
        out.push('\n');
        let created = format_timestamp(&row.created_at);
        let fields = [
            row.name.as_str(),
            row.email.as_str(),
            row.phone.as_str(),
            row.message.as_str(),
            row.status.as_str(),
            created.as_str(),
        ];
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_quoted(&mut out, field);
        }
    }
    out
}

/// `contacts-YYYY-MM-DD.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("contacts-{}.csv", date.format("%Y-%m-%d"))
}

fn push_quoted(out: &mut String, field: &str) {
    out.push('"');
    out.push_str(&field.replace('"', "\"\""));
    out.push('"');
}
