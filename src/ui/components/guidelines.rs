use eframe::egui;

const GUIDELINES: [&str; 3] = [
    "Be respectful to other members",
    "No spamming or inappropriate content",
    "Stay on topic in discussions",
];

pub fn render(ui: &mut egui::Ui) {
    ui.add_space(6.0);
    ui.label(egui::RichText::new("Community Guidelines").strong());
    for rule in GUIDELINES {
        ui.label(format!("• {rule}"));
    }
    ui.add_space(6.0);
}
