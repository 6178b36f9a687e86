use std::sync::Arc;

use eframe::egui;

use crate::identity::{IdentityProvider, LocalStorage};
use crate::store::MessageStore;

use super::components::{chat_area, guidelines, header, input_bar};
use super::view::ChatView;

pub struct ChatApp {
    view: ChatView,
}

impl ChatApp {
    pub fn new<S: LocalStorage>(
        cc: &eframe::CreationContext<'_>,
        store: Arc<dyn MessageStore>,
        identity: &IdentityProvider<S>,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        let view = ChatView::mount(store, identity, move || ctx.request_repaint());
        Self { view }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.view.pump();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            header::render(ui, self.view.display_name());
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("guidelines").show(ctx, |ui| {
            guidelines::render(ui);
        });

        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(6.0);
            if self.view.edit_composer(|draft| input_bar::render(ui, draft)) {
                self.view.submit();
            }
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let rows = chat_area::rows(self.view.messages(), self.view.display_name());
            chat_area::render(ui, &rows);
        });
    }
}
