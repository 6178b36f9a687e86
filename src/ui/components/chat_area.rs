use chrono::{DateTime, Local, Utc};
use eframe::egui;

use super::avatar_badge;
use crate::avatar::{self, AvatarColor};
use crate::common::ChatMessage;

/// Shown instead of a time while the store has not stamped the message.
pub const JUST_NOW: &str = "Just now";

const ACCENT: egui::Color32 = egui::Color32::from_rgb(0x4a, 0x76, 0xa8);
const BUBBLE: egui::Color32 = egui::Color32::from_rgb(0xf0, 0xf2, 0xf5);
const AVATAR_SIZE: f32 = 36.0;

/// One rendered message, everything derived up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub sender: String,
    pub text: String,
    pub initials: String,
    pub color: AvatarColor,
    pub time_label: String,
    /// Sent by the local user; drawn right-aligned.
    pub own: bool,
}

impl MessageRow {
    pub fn from_message(message: &ChatMessage, display_name: &str) -> Self {
        Self {
            id: message.id.clone(),
            sender: message.sender.clone(),
            text: message.text.clone(),
            initials: avatar::initials_for(&message.sender),
            color: message.avatar(),
            time_label: time_label(message.timestamp),
            own: message.sender == display_name,
        }
    }
}

pub fn rows(messages: &[ChatMessage], display_name: &str) -> Vec<MessageRow> {
    messages
        .iter()
        .map(|message| MessageRow::from_message(message, display_name))
        .collect()
}

pub fn time_label(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M").to_string(),
        None => JUST_NOW.to_string(),
    }
}

pub fn render(ui: &mut egui::Ui, rows: &[MessageRow]) {
    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for row in rows {
                render_row(ui, row);
            }
        });
}

fn render_row(ui: &mut egui::Ui, row: &MessageRow) {
    let layout = if row.own {
        egui::Layout::right_to_left(egui::Align::TOP)
    } else {
        egui::Layout::left_to_right(egui::Align::TOP)
    };

    ui.with_layout(layout, |ui| {
        avatar_badge::render(ui, &row.initials, row.color, AVATAR_SIZE);
        let max_width = ui.available_width() * 0.7;
        egui::Frame::new()
            .fill(BUBBLE)
            .corner_radius(egui::CornerRadius::same(8))
            .inner_margin(egui::Margin::symmetric(12, 8))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(&row.sender).strong().color(ACCENT));
                    ui.add(egui::Label::new(&row.text).wrap());
                    ui.label(egui::RichText::new(&row.time_label).small().weak());
                });
            });
    });
    ui.add_space(10.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, sender: &str, timestamp: Option<DateTime<Utc>>) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            text: format!("message {id}"),
            sender: sender.to_string(),
            timestamp,
            avatar_color: String::new(),
        }
    }

    #[test]
    fn missing_timestamp_reads_just_now() {
        assert_eq!(time_label(None), "Just now");
        let stamped = time_label(DateTime::from_timestamp(1_700_000_000, 0));
        assert_eq!(stamped.len(), 5);
        assert_eq!(&stamped[2..3], ":");
    }

    #[test]
    fn rows_keep_snapshot_order_and_mark_own_messages() {
        let messages = vec![
            message("1", "HappyPenguin42", DateTime::from_timestamp(100, 0)),
            message("2", "BraveFox7", DateTime::from_timestamp(200, 0)),
        ];

        let rows = rows(&messages, "BraveFox7");

        assert_eq!(rows[0].id, "1");
        assert_eq!(rows[1].id, "2");
        assert!(!rows[0].own);
        assert!(rows[1].own);
        assert_eq!(rows[0].initials, "HP");
        assert_eq!(rows[0].color, avatar::color_for("HappyPenguin42"));
    }

    #[test]
    fn persisted_color_wins_over_recomputed_one() {
        let mut stored = message("1", "HappyPenguin42", None);
        stored.avatar_color = "hsl(200, 70%, 60%)".to_string();

        let row = MessageRow::from_message(&stored, "someone");
        assert_eq!(row.color.hue(), 200);
    }
}
