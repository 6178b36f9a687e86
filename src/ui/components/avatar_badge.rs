use eframe::egui;

use crate::avatar::AvatarColor;

/// Colored circle with the sender's initials.
pub fn render(ui: &mut egui::Ui, initials: &str, color: AvatarColor, diameter: f32) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(diameter, diameter), egui::Sense::hover());
    let painter = ui.painter();
    painter.circle_filled(rect.center(), diameter / 2.0, color.to_color32());
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        initials,
        egui::FontId::proportional(14.0),
        egui::Color32::WHITE,
    );
}
