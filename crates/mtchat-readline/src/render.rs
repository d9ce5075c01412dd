//! Terminal rendering of entities, tabs and notices.

use colored::Colorize;
use mtchat_application::{TabData, TabKey, TabState};
use mtchat_core::conversation::StatusLog;
use mtchat_core::entity::{Category, Entity};
use mtchat_core::notice::{Toast, ToastVariant};
use mtchat_core::stats::EntityStats;
use serde_json::Value;

pub fn toast(toast: &Toast) {
    let line = format!("{}: {}", toast.title, toast.description);
    match toast.variant {
        ToastVariant::Destructive => println!("{}", line.red()),
        ToastVariant::Default => println!("{}", line.bright_green()),
    }
}

pub fn error(message: impl std::fmt::Display) {
    eprintln!("{}", format!("Error: {message}").red());
}

pub fn info(message: impl std::fmt::Display) {
    println!("{}", message.to_string().bright_black());
}

fn attribute(value: &Value) -> String {
    match value {
        Value::Null => "(not provided)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn entity_line(entity: &Entity) {
    let kind = entity.entity_type.as_deref().unwrap_or("-");
    let images = if entity.images.is_empty() {
        String::new()
    } else {
        format!(" [{} image(s)]", entity.images.len())
    };
    println!(
        "  {} {} {}{}",
        entity.id.bright_black(),
        entity.title().bold(),
        format!("({kind})").bright_black(),
        images.bright_black()
    );
}

pub fn entities(title: &str, list: &[Entity]) {
    println!("{}", title.bright_magenta());
    if list.is_empty() {
        info("  (none)");
    }
    for entity in list {
        entity_line(entity);
    }
}

pub fn entity(entity: &Entity) {
    println!("{}", entity.title().bright_magenta().bold());
    if let Some(description) = &entity.description {
        println!("  {description}");
    }
    if let Some(kind) = &entity.entity_type {
        println!("  {} {}", "type:".bright_black(), kind);
    }
    for (key, value) in &entity.attributes {
        println!("  {} {}", format!("{key}:").bright_black(), attribute(value));
    }
    for image in &entity.images {
        if let Some(url) = &image.url {
            println!("  {} {}", "image:".bright_black(), url.underline());
        }
    }
    let missing = entity.requestable_attributes();
    if !missing.is_empty() {
        info(format!("  /request <{}> asks the owner", missing.join("|")));
    }
}

pub fn categories(list: &[Category]) {
    println!("{}", "Categories".bright_magenta());
    for (i, category) in list.iter().enumerate() {
        let name = category.display_name.as_deref().unwrap_or(&category.name);
        println!("  {}. {}", i + 1, name.bold());
    }
}

fn stats(stats: &EntityStats) {
    if stats.is_placeholder() {
        info("  (sample data, statistics unavailable)");
    }
    println!(
        "  views {}  interactions {}  shares {}  chats {}  requests {}",
        stats.views, stats.interactions, stats.shares, stats.chat_requests, stats.attribute_requests
    );
    println!(
        "  {} {}",
        "last viewed".bright_black(),
        stats.last_viewed.format("%Y-%m-%d %H:%M")
    );
    for day in &stats.view_history {
        println!(
            "  {} {}",
            day.date,
            "#".repeat(day.count.min(40) as usize).bright_blue()
        );
    }
}

pub fn tab(key: TabKey, state: &TabState) {
    println!("{}", format!("[{key}]").bright_magenta());
    match &state.data {
        None if state.loading => info("  loading..."),
        None if key.requires_auth() => info("  sign in to see this tab"),
        None => info("  (no data)"),
        Some(TabData::Entities(list)) => {
            if list.is_empty() {
                info("  (none)");
            }
            for entity in list {
                entity_line(entity);
            }
        }
        Some(TabData::Stats(data)) => stats(data),
        Some(TabData::Announcements(entries)) => {
            if entries.is_empty() {
                info("  (no announcements)");
            }
            for entry in entries {
                let when = entry
                    .occurred_at()
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                println!(
                    "  {} {}",
                    when.bright_black(),
                    entry.message.as_deref().unwrap_or(entry.kind())
                );
            }
        }
    }
}

pub fn status(log: &StatusLog) {
    if log.is_empty() {
        info("No recent activity.");
        return;
    }
    for entry in log.visible() {
        println!(
            "  {} {}",
            entry.at.format("%H:%M:%S").to_string().bright_black(),
            entry.text
        );
    }
}
