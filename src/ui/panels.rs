use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::{AppState, RANGE_LABEL, ROAD_LABEL, VEHICLE_LABEL};

// ---------------------------------------------------------------------------
// Left side panel – cascading selectboxes
// ---------------------------------------------------------------------------

/// Render the three dropdowns. A pick is applied after the widget returns,
/// so downstream options are rebuilt before the next frame.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros");
    ui.separator();

    let ranges: Vec<String> = state.ranges.labels().map(str::to_string).collect();
    // A range whose dataset failed to load stays pickable for a retry.
    let retry = state.dataset.is_none();
    if let Some(pick) = selectbox(
        ui,
        "range",
        RANGE_LABEL,
        &ranges,
        state.selected_range.as_deref(),
        retry,
    ) {
        state.select_range(&pick);
    }

    let vehicles = state.vehicle_options.clone();
    if let Some(pick) = selectbox(
        ui,
        "vehicle",
        VEHICLE_LABEL,
        &vehicles,
        state.selected_vehicle.as_deref(),
        false,
    ) {
        state.select_vehicle(&pick);
    }

    let roads: Vec<String> = state.roads.keys().cloned().collect();
    if let Some(pick) = selectbox(
        ui,
        "road",
        ROAD_LABEL,
        &roads,
        state.selected_road.as_deref(),
        false,
    ) {
        state.select_road(&pick);
    }
}

/// A labelled combo box. Returns the newly picked option, if any.
/// With `repick`, clicking the current option also counts as a pick.
fn selectbox(
    ui: &mut Ui,
    id: &str,
    label: &str,
    options: &[String],
    current: Option<&str>,
    repick: bool,
) -> Option<String> {
    ui.strong(label);
    let mut picked = None;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.unwrap_or_default())
        .width(ui.available_width())
        .show_ui(ui, |ui: &mut Ui| {
            if options.is_empty() {
                ui.weak("Nenhuma opção disponível");
            }
            for opt in options {
                let is_current = current == Some(opt.as_str());
                if ui.selectable_label(is_current, opt).clicked() && (repick || !is_current) {
                    picked = Some(opt.clone());
                }
            }
        });
    ui.add_space(8.0);
    picked
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        if ui.button("⟳ Recarregar").clicked() {
            state.reload();
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!("{} registros carregados", ds.len()));
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Raw data preview
// ---------------------------------------------------------------------------

/// Collapsible table with the first rows of the loaded dataset.
pub fn raw_preview(ui: &mut Ui, state: &AppState) {
    let Some(dataset) = &state.dataset else {
        return;
    };
    let rows = dataset.head(state.config.preview_rows);

    egui::CollapsingHeader::new(RichText::new("Amostra dos dados brutos").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
                TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .columns(Column::auto().at_least(60.0), dataset.columns.len())
                    .header(20.0, |mut header| {
                        for col in &dataset.columns {
                            header.col(|ui: &mut Ui| {
                                ui.strong(col);
                            });
                        }
                    })
                    .body(|mut body| {
                        for row in rows {
                            body.row(18.0, |mut tr| {
                                for cell in row {
                                    tr.col(|ui: &mut Ui| {
                                        ui.label(cell.to_string());
                                    });
                                }
                            });
                        }
                    });
            });
        });
}
