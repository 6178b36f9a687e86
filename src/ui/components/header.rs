use eframe::egui;

use super::avatar_badge;
use crate::avatar;

pub fn render(ui: &mut egui::Ui, display_name: &str) {
    ui.horizontal(|ui| {
        ui.heading("Community Chat");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(egui::RichText::new(display_name).strong());
            avatar_badge::render(
                ui,
                &avatar::initials_for(display_name),
                avatar::color_for(display_name),
                32.0,
            );
        });
    });
}
