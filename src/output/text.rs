use chrono::{DateTime, Utc};

use crate::models::{CategoryView, Task};
use crate::services::comments::FeedEntry;

fn short_id(id: &str) -> &str {
    &id[..std::cmp::min(8, id.len())]
}

pub fn print_board(views: &[CategoryView]) {
    if views.is_empty() {
        println!("No categories yet.");
        return;
    }
    for view in views {
        println!(
            "{} ({}) — {} task{}",
            view.category.title,
            short_id(&view.category.id),
            view.tasks.len(),
            if view.tasks.len() == 1 { "" } else { "s" }
        );
        for task in &view.tasks {
            print_task_line(task);
        }
    }
}

pub fn print_category_list(views: &[CategoryView]) {
    if views.is_empty() {
        println!("No categories found.");
        return;
    }
    for view in views {
        println!(
            "  {} {} ({}) - {} tasks",
            view.category.position,
            view.category.title,
            short_id(&view.category.id),
            view.tasks.len()
        );
    }
}

pub fn print_task_line(t: &Task) {
    let check = if t.completed { "x" } else { " " };
    let mut line = format!(
        "  [{check}] {} ({}) [{}]",
        t.name,
        short_id(&t.id),
        t.status.as_str()
    );
    if !t.due_date.is_empty() {
        line.push_str(&format!(" due={}", t.due_date));
    }
    if !t.assignee.name.is_empty() {
        line.push_str(&format!(" @{}", t.assignee.name));
    }
    if t.comments > 0 {
        line.push_str(&format!(" ({} comments)", t.comments));
    }
    println!("{line}");
}

pub fn print_task(t: &Task) {
    println!("Task: {} ({})", t.name, t.id);
    println!("  Status: {}", t.status.as_str());
    if !t.due_date.is_empty() {
        println!("  Due: {}", t.due_date);
    }
    if !t.assignee.name.is_empty() {
        println!("  Assignee: {} {}", t.assignee.avatar, t.assignee.name);
    }
    if let Some(ref priority) = t.priority {
        println!("  Priority: {}", priority.as_str());
    }
    if let Some(ref description) = t.description {
        println!("  Description: {description}");
    }
    println!("  Created: {}", t.created_at);
    if !t.task_comments.is_empty() {
        println!("\nComments ({}):", t.task_comments.len());
        for c in &t.task_comments {
            println!("  {} {}: {}", c.avatar, c.author, c.text);
        }
    }
}

pub fn print_comment_feed(feed: &[FeedEntry]) {
    if feed.is_empty() {
        println!("No comments yet.");
        return;
    }
    let now = Utc::now();
    for entry in feed {
        println!(
            "  {} {} on \"{}\" in {} ({}): {}",
            entry.comment.avatar,
            entry.comment.author,
            entry.task_name,
            entry.category_title,
            format_relative(&entry.comment.created_at, now),
            entry.comment.text
        );
    }
}

/// Human-readable age of an RFC 3339 timestamp relative to `now`.
/// Timestamps that fail to parse come back unchanged.
pub fn format_relative(timestamp: &str, now: DateTime<Utc>) -> String {
    let then = match DateTime::parse_from_rfc3339(timestamp) {
        Ok(t) => t.with_timezone(&Utc),
        Err(_) => return timestamp.to_string(),
    };
    let minutes = (now - then).num_minutes();
    let hours = (now - then).num_hours();
    let days = (now - then).num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} minute{} ago", if minutes == 1 { "" } else { "s" })
    } else if hours < 24 {
        format!("{hours} hour{} ago", if hours == 1 { "" } else { "s" })
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{days} days ago")
    } else if then.format("%Y").to_string() == now.format("%Y").to_string() {
        then.format("%b %-d").to_string()
    } else {
        then.format("%b %-d, %Y").to_string()
    }
}
