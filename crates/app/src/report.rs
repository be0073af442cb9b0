//! Export of the medicine list as plain text or a standalone HTML page.

use std::fmt::{self, Display, Formatter};

use chrono::NaiveDate;

use pillminder_domain::medicine::MedicineEntry;
use pillminder_domain::time::Timestamp;

const TITLE: &str = "Medicines";

const STYLE: &str = "body{font-family:sans-serif;padding:16px;background:#fafafa;color:#333;line-height:1.6}\
h1{font-size:20px}\
.card{background:#fff;border:1px solid #ddd;border-radius:12px;padding:16px;margin:16px 0}\
.k{display:inline-block;background:#eee;padding:4px 10px;border-radius:999px;margin-right:8px;font-weight:600}";

/// Render `entries` as plain text. `today` decides the "taken today" flag.
#[must_use]
pub fn render_text(entries: &[MedicineEntry], generated_at: Timestamp, today: NaiveDate) -> String {
    Text {
        entries,
        generated_at,
        today,
    }
    .to_string()
}

/// Render `entries` as an HTML document with all user text escaped.
#[must_use]
pub fn render_html(entries: &[MedicineEntry], generated_at: Timestamp, today: NaiveDate) -> String {
    Html {
        entries,
        generated_at,
        today,
    }
    .to_string()
}

/// Suggested file name for an export, e.g. `medicines_20260302_070000.txt`.
#[must_use]
pub fn file_name(generated_at: Timestamp, extension: &str) -> String {
    format!(
        "medicines_{}.{extension}",
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

struct Text<'a> {
    entries: &'a [MedicineEntry],
    generated_at: Timestamp,
    today: NaiveDate,
}

impl Display for Text<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE} ({})", stamp(self.generated_at))?;
        for entry in self.entries {
            let row = Row::new(entry, self.today);
            writeln!(f)?;
            writeln!(f, "#{} · {}", entry.id, row.name)?;
            writeln!(f, "  Dosage      : {}", entry.dosage)?;
            writeln!(f, "  Schedule    : {}", entry.schedule)?;
            writeln!(f, "  Dates       : {} → {}", row.start, row.end)?;
            writeln!(f, "  Description : {}", row.description)?;
            writeln!(f, "  Prescriber  : {}", row.prescriber)?;
            writeln!(f, "  Location    : {}", row.location)?;
            writeln!(f, "  Last taken  : {}", row.last_taken)?;
            writeln!(f, "  Taken today : {}", row.taken_today)?;
        }
        Ok(())
    }
}

struct Html<'a> {
    entries: &'a [MedicineEntry],
    generated_at: Timestamp,
    today: NaiveDate,
}

impl Display for Html<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let heading = format!("{TITLE} ({})", stamp(self.generated_at));
        write!(
            f,
            "<!doctype html><html><head><meta charset=\"utf-8\">\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
             <title>{TITLE}</title><style>{STYLE}</style></head><body>\
             <h1>{}</h1>",
            Escaped(&heading)
        )?;
        for entry in self.entries {
            let row = Row::new(entry, self.today);
            write!(
                f,
                "<div class=\"card\"><div><span class=\"k\">ID: {}</span><strong>{}</strong></div>",
                entry.id,
                Escaped(&row.name)
            )?;
            field(f, "Dosage", &entry.dosage.to_string())?;
            field(f, "Schedule", &entry.schedule.to_string())?;
            field(f, "Dates", &format!("{} → {}", row.start, row.end))?;
            field(f, "Description", &row.description)?;
            field(f, "Prescriber", &row.prescriber)?;
            field(f, "Location", &row.location)?;
            field(f, "Last taken", &row.last_taken)?;
            field(f, "Taken today", row.taken_today)?;
            f.write_str("</div>")?;
        }
        f.write_str("</body></html>\n")
    }
}

fn field(f: &mut Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    write!(
        f,
        "<div><span class=\"k\">{label}</span>{}</div>",
        Escaped(value)
    )
}

/// Display values for one entry, with `-` standing in for absent ones.
struct Row {
    name: String,
    start: String,
    end: String,
    description: String,
    prescriber: String,
    location: String,
    last_taken: String,
    taken_today: &'static str,
}

impl Row {
    fn new(entry: &MedicineEntry, today: NaiveDate) -> Self {
        Self {
            name: or_dash(Some(entry.name.as_str())),
            start: or_dash(entry.course.start.map(|d| d.to_string()).as_deref()),
            end: or_dash(entry.course.end.map(|d| d.to_string()).as_deref()),
            description: or_dash(entry.description.as_deref()),
            prescriber: or_dash(entry.prescriber.as_deref()),
            location: or_dash(entry.prescriber_location.as_deref()),
            last_taken: or_dash(entry.last_taken_on.map(|d| d.to_string()).as_deref()),
            taken_today: if entry.taken_on(today) { "Yes" } else { "No" },
        }
    }
}

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

fn stamp(ts: Timestamp) -> impl Display {
    ts.format("%Y-%m-%d %H:%M UTC")
}

struct Escaped<'a>(&'a str);

impl Display for Escaped<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            match c {
                '&' => f.write_str("&amp;")?,
                '<' => f.write_str("&lt;")?,
                '>' => f.write_str("&gt;")?,
                '"' => f.write_str("&quot;")?,
                '\'' => f.write_str("&#39;")?,
                c => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}
