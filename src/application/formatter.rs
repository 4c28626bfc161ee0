//! Output formatting.
//!
//! Renders the message sequence into the durable export formats (JSON,
//! Markdown, HTML) and builds the panels shown to the operator.

use chrono::{DateTime, Utc};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{
    Contact, DateRange, Direction, ExportFormat, ExportManifest, Message, RunConfig,
};

/// Renders messages in `format`.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn render(
    format: ExportFormat,
    contact: &Contact,
    messages: &[Message],
    exported_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(messages),
        ExportFormat::Md => Ok(render_markdown(contact, messages, exported_at)),
        ExportFormat::Html => Ok(render_html(contact, messages, exported_at)),
    }
}

/// Formats a conversation as Markdown.
pub fn render_markdown(contact: &Contact, messages: &[Message], exported_at: DateTime<Utc>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Conversation with {}\n\n", contact.name));
    out.push_str(&format!("**Phone:** {}\n", or_unknown(contact.number.as_deref())));
    out.push_str(&format!("**UUID:** {}\n", or_unknown(contact.uuid.as_deref())));
    out.push_str(&format!("**Export Date:** {}\n", exported_at.to_rfc3339()));
    out.push_str(&format!("**Message Count:** {}\n\n", messages.len()));
    out.push_str("---\n");

    for message in messages {
        out.push_str(&format!(
            "\n### {} @ {}\n\n",
            message.direction,
            message.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if message.body.is_empty() {
            out.push_str("*[no content]*\n");
        } else {
            out.push_str(&message.body);
            out.push('\n');
        }

        if !message.attachments.is_empty() {
            out.push_str(&format!("\n*Attachments: {}*\n", message.attachments.len()));
        }
    }

    out
}

/// Formats a conversation as a standalone HTML page.
pub fn render_html(contact: &Contact, messages: &[Message], exported_at: DateTime<Utc>) -> String {
    let name = escape_html(&contact.name);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str(&format!("  <title>Conversation with {name}</title>\n"));
    out.push_str("  <meta charset='utf-8'>\n  <style>\n");
    out.push_str("    body { font-family: sans-serif; margin: 20px; }\n");
    out.push_str("    .message { margin: 10px 0; padding: 10px; border-left: 3px solid #ccc; }\n");
    out.push_str("    .outgoing { border-left-color: #2c6bed; }\n");
    out.push_str("    .sender { font-weight: bold; color: #333; }\n");
    out.push_str("    .timestamp { color: #999; font-size: 0.9em; }\n");
    out.push_str("    .body { margin-top: 5px; color: #333; white-space: pre-wrap; }\n");
    out.push_str("  </style>\n</head>\n<body>\n");
    out.push_str(&format!("  <h1>Conversation with {name}</h1>\n"));
    out.push_str(&format!(
        "  <p><strong>Phone:</strong> {}</p>\n",
        escape_html(or_unknown(contact.number.as_deref()))
    ));
    out.push_str(&format!(
        "  <p><strong>UUID:</strong> {}</p>\n",
        escape_html(or_unknown(contact.uuid.as_deref()))
    ));
    out.push_str(&format!(
        "  <p><strong>Export Date:</strong> {}</p>\n",
        exported_at.to_rfc3339()
    ));
    out.push_str(&format!("  <p><strong>Messages:</strong> {}</p>\n  <hr>\n", messages.len()));

    for message in messages {
        let class = match message.direction {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        };
        out.push_str(&format!("  <div class='message {class}'>\n"));
        out.push_str(&format!("    <div class='sender'>{}</div>\n", message.direction));
        out.push_str(&format!(
            "    <div class='timestamp'>{}</div>\n",
            message.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!(
            "    <div class='body'>{}</div>\n",
            escape_html(&message.body)
        ));
        out.push_str("  </div>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Formats a numbered table of contacts.
pub fn format_contacts_table(contacts: &[Contact]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Name", "Number", "UUID"]);

    for (i, contact) in contacts.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(&contact.name, 30),
            contact.number.clone().unwrap_or_else(|| "-".to_string()),
            contact.uuid.as_deref().map_or_else(|| "-".to_string(), abbreviate),
        ]);
    }

    table.to_string()
}

/// Formats the panel shown before a contact is confirmed.
pub fn format_contact_preview(contact: &Contact) -> String {
    format!(
        "{}\n  Name: {}\n  Number: {}\n  UUID: {}",
        "Contact Preview".bold(),
        contact.name,
        contact.number.as_deref().unwrap_or("-"),
        contact.uuid.as_deref().unwrap_or("-")
    )
}

/// Formats the export configuration shown before exporting.
pub fn format_export_config(contact: &Contact, config: &RunConfig, message_count: usize) -> String {
    let formats: Vec<String> = config.formats.iter().map(ToString::to_string).collect();
    let mode = if config.dry_run {
        "DRY RUN".yellow()
    } else {
        "LIVE".green()
    };

    format!(
        "{}\n  Contact: {}\n  Export Directory: {}\n  Formats: {}\n  Attachments: {}\n  Messages to Export: {}\n  Mode: {}",
        "Export Configuration".bold(),
        contact_label(contact),
        config.export_root.join(contact.slug()).display(),
        formats.join(", "),
        if config.include_attachments { "Yes" } else { "No" },
        message_count.to_string().cyan(),
        mode
    )
}

/// Formats the summary shown after an export.
pub fn format_manifest_summary(manifest: &ExportManifest) -> String {
    let formats: Vec<String> = manifest
        .export_config
        .formats
        .iter()
        .map(ToString::to_string)
        .collect();

    format!(
        "{}\n  Contact: {} ({})\n  Messages: {}\n  Attachments: {}\n  Date Range: {}\n  Formats: {}\n  Export Date: {}",
        "Export Summary".green().bold(),
        manifest.contact.name,
        or_unknown(manifest.contact.number.as_deref()),
        manifest.statistics.message_count.to_string().cyan(),
        manifest.statistics.attachment_count.to_string().cyan(),
        format_date_range(manifest.statistics.date_range.as_ref()),
        formats.join(", "),
        manifest.export_date.to_rfc3339()
    )
}

/// Formats the summary shown before a deletion.
pub fn format_deletion_summary(manifest: &ExportManifest, contact: &Contact, dry_run: bool) -> String {
    let mode = if dry_run {
        "DRY RUN".yellow()
    } else {
        "LIVE DELETION".red().bold()
    };

    format!(
        "{}\n  Messages: {}\n  Attachments: {}\n  Date Range: {}\n  Contact: {}\n  Mode: {}",
        "DELETION SUMMARY".red().bold(),
        manifest.statistics.message_count,
        manifest.statistics.attachment_count,
        format_date_range(manifest.statistics.date_range.as_ref()),
        contact_label(contact),
        mode
    )
}

/// Formats an optional date range as `start to end`.
pub fn format_date_range(range: Option<&DateRange>) -> String {
    range.map_or_else(
        || "N/A".to_string(),
        |r| {
            format!(
                "{} to {}",
                r.start.format("%Y-%m-%d %H:%M"),
                r.end.format("%Y-%m-%d %H:%M")
            )
        },
    )
}

fn contact_label(contact: &Contact) -> String {
    format!("{} ({})", contact.name, contact.identifier())
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Keeps the first and last 8 characters of identifiers longer than 16.
fn abbreviate(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 16 {
        return id.to_string();
    }

    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 8..].iter().collect();
    format!("{head}...{tail}")
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{cut}...")
    }
}
