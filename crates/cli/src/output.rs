//! Rendering of command results.
//!
//! Every command result is `Serialize`; `--format json` prints it as pretty
//! JSON, the default text format uses the short renderings below.

use parkwatch_client::api::{BlacklistStatus, InvestigateResult};
use parkwatch_client::Ack;
use parkwatch_core::types::{
    BlacklistEntry, Comment, Notification, NotificationList, Page, Pagination, ParkingArea, QaItem,
    Report, ReportShare, Staff, User, UserRef, VehicleRecord,
};
use parkwatch_realtime::ServerEvent;
use serde::Serialize;
use serde_json::{json, Value};

use crate::commands::OutputFormat;
use crate::error::Result;

/// Render `value` in `format`, using `text` for the text format.
pub fn render<T, F>(format: OutputFormat, value: &T, text: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Text => Ok(text(value)),
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}

fn lines<T>(items: &[T], empty: &str, line: impl Fn(&T) -> String) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items.iter().map(line).collect::<Vec<_>>().join("\n")
}

fn footer(pagination: Option<&Pagination>) -> String {
    match pagination {
        Some(p) if p.total_pages > 0 => format!(
            "\npage {}/{} ({} total)",
            p.page, p.total_pages, p.total
        ),
        _ => String::new(),
    }
}

/// Server message of a mutation.
pub fn ack(ack: &Ack) -> String {
    ack.message.clone().unwrap_or_else(|| "ok".to_string())
}

/// Account summary.
pub fn user(user: &User) -> String {
    let name = [user.first_name.as_deref(), user.last_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} ({})\nname: {}\nemail: {}\nrole: {}\nbusiness: {}",
        user.username,
        user.id,
        or_dash(Some(name.as_str())),
        or_dash(user.email.as_deref()),
        or_dash(user.role.as_deref()),
        or_dash(user.business_id.as_deref()),
    )
}

/// One line per area: id, name, occupancy, location.
pub fn areas(areas: &[ParkingArea]) -> String {
    lines(areas, "no parking areas", |area| {
        let occupancy = match (area.current_capacity, area.capacity) {
            (Some(current), Some(total)) => format!("{}/{}", current, total),
            (None, Some(total)) => format!("?/{}", total),
            _ => "-".to_string(),
        };
        format!(
            "{}  {}  {}  {}",
            area.id,
            area.name,
            occupancy,
            or_dash(area.location.as_deref())
        )
    })
}

/// One line per vehicle record.
pub fn records(records: &[VehicleRecord]) -> String {
    lines(records, "no records", |record| {
        format!(
            "{:<12} {:<8} {}",
            record.plate_number,
            or_dash(record.action.as_deref().or(record.status.as_deref())),
            record.when()
        )
    })
}

/// Records followed by the page position.
pub fn record_page(page: &Page<VehicleRecord>) -> String {
    records(&page.data) + &footer(page.pagination.as_ref())
}

/// Staff listing with the page position.
pub fn staff_page(page: &Page<Staff>) -> String {
    lines(&page.data, "no staff", |staff| {
        format!(
            "{}  {}  {} {}  {}  {}",
            staff.id,
            staff.username,
            staff.first_name,
            staff.last_name,
            staff.email,
            or_dash(staff.role.as_deref())
        )
    }) + &footer(page.pagination.as_ref())
}

/// One line per report.
pub fn reports(reports: &[Report]) -> String {
    lines(reports, "no reports", |report| {
        format!(
            "{}  {}  {}  {}",
            report.id,
            report.name,
            or_dash(report.kind.as_deref()),
            or_dash(report.created_at.as_deref())
        )
    })
}

/// Report details.
pub fn report(report: &Report) -> String {
    format!(
        "{} ({})\ntype: {}\narea: {}\ncreated: {}\n{}",
        report.name,
        report.id,
        or_dash(report.kind.as_deref()),
        or_dash(report.area_id.as_deref()),
        or_dash(report.created_at.as_deref()),
        report.description.as_deref().unwrap_or_default()
    )
    .trim_end()
    .to_string()
}

/// One line per comment.
pub fn comments(comments: &[Comment]) -> String {
    lines(comments, "no comments", comment)
}

/// A comment with its author.
pub fn comment(comment: &Comment) -> String {
    format!(
        "{}  {} ({}): {}",
        comment.id,
        comment.author_id.display_name(),
        or_dash(comment.created_at.as_deref()),
        comment.content
    )
}

/// Users a report can be shared with.
pub fn users(users: &[UserRef]) -> String {
    lines(users, "no users", |user| {
        format!("{}  {}", user.id, user.display_name())
    })
}

/// Users a report is shared with.
pub fn shares(shares: &[ReportShare]) -> String {
    lines(shares, "not shared", |share| {
        format!(
            "{}  {}  {}",
            share.id,
            share.shared_with.display_name(),
            or_dash(share.permissions.as_deref())
        )
    })
}

fn notification(n: &Notification) -> String {
    format!(
        "{} {}  {}  {}",
        if n.is_read() { " " } else { "*" },
        n.id,
        or_dash(n.created_at.as_deref()),
        n.message
    )
}

/// Notifications, unread ones starred.
pub fn notifications(list: &NotificationList) -> String {
    let mut out = lines(&list.notifications, "no notifications", notification);
    out.push_str(&format!("\n{} unread", list.unread_count));
    out + &footer(list.pagination.as_ref())
}

/// One line per blacklisted plate.
pub fn blacklist(entries: &[BlacklistEntry]) -> String {
    lines(entries, "no blacklisted plates", |entry| {
        format!(
            "{}  {:<12} {}",
            entry.id, entry.plate_number, entry.reason
        )
    })
}

/// Blacklist listing with the page position.
pub fn blacklist_page(page: &Page<BlacklistEntry>) -> String {
    blacklist(&page.data) + &footer(page.pagination.as_ref())
}

/// Verdict of a plate check.
pub fn blacklist_status(plate: &str, status: &BlacklistStatus) -> String {
    match (&status.entry, status.is_blacklisted) {
        (Some(entry), true) => format!("{} is blacklisted: {}", plate, entry.reason),
        (None, true) => format!("{} is blacklisted", plate),
        _ => format!("{} is not blacklisted", plate),
    }
}

/// Generated query, its outcome and the AI's answer.
pub fn investigation(result: &InvestigateResult) -> String {
    let mut out = format!("question: {}", result.question);
    if let Some(collection) = &result.collection {
        out.push_str(&format!("\ncollection: {}", collection));
    }
    if let Some(query) = &result.mongo_query {
        out.push_str(&format!("\nquery: {}", query));
    }
    if let Some(rows) = result.row_count() {
        out.push_str(&format!("\nrows: {}", rows));
    }
    if let Some(ms) = result.execution_time {
        out.push_str(&format!("\ntime: {} ms", ms));
    }
    if let Some(answer) = &result.ai_response {
        out.push_str(&format!("\n\n{}", answer));
    }
    out
}

/// Suggested questions with their keyword.
pub fn questions(items: &[QaItem]) -> String {
    lines(items, "no suggestions", |item| {
        format!("[{}] {}", item.keyword, item.question)
    })
}

/// One keyword per line.
pub fn keywords(keywords: &[String]) -> String {
    lines(keywords, "no keywords", String::clone)
}

/// Free-form reply: the answer text when there is one, else pretty JSON.
pub fn value(value: &Value) -> String {
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    ["analysis", "response", "answer", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()))
}

/// Realtime event as one JSON object per line.
pub fn event_json(event: &ServerEvent) -> Value {
    let data = match event {
        ServerEvent::DataUpdated(e) => serde_json::to_value(e),
        ServerEvent::DataUpdateError(e) => serde_json::to_value(e),
        ServerEvent::RefreshComplete(e) => serde_json::to_value(e),
        ServerEvent::Other { data, .. } => Ok(data.clone()),
    };
    json!({ "event": event.name(), "data": data.unwrap_or(Value::Null) })
}

/// One line per realtime event.
pub fn event(event: &ServerEvent) -> String {
    match event {
        ServerEvent::DataUpdated(e) => format!(
            "[{}] area {} updated{}",
            or_dash(e.timestamp.as_deref()),
            e.area_id,
            e.message
                .as_deref()
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        ),
        ServerEvent::DataUpdateError(e) => format!(
            "[{}] area {} update failed: {}",
            or_dash(e.timestamp.as_deref()),
            e.area_id,
            or_dash(e.error.as_deref())
        ),
        ServerEvent::RefreshComplete(e) if e.success => {
            format!("area {} refresh complete", e.area_id)
        }
        ServerEvent::RefreshComplete(e) => format!(
            "area {} refresh failed: {}",
            e.area_id,
            or_dash(e.error.as_deref())
        ),
        ServerEvent::Other { name, data } => format!("{} {}", name, data),
    }
}
