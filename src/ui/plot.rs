use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{uniform_grid_spacer, Bar, BarChart, Plot};

use crate::color::FlowColorScale;
use crate::state::AppState;

const LEGEND_STOPS: usize = 5;

// ---------------------------------------------------------------------------
// Flow bar chart (central panel)
// ---------------------------------------------------------------------------

/// One bar per interval, coloured by flow.
pub fn flow_chart(ui: &mut Ui, state: &AppState) {
    if let Some(msg) = &state.status_message {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.label(RichText::new(msg).color(Color32::RED));
        });
        return;
    }

    let selection = match state.selection() {
        Ok(sel) => sel,
        Err(e) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading(e.to_string());
            });
            return;
        }
    };

    let Some(aggregated) = state.aggregated.as_ref().filter(|a| !a.is_empty()) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Nenhum registro para esta seleção");
        });
        return;
    };

    let scale = FlowColorScale::new(
        aggregated.min_fluxo().unwrap_or(0.0),
        aggregated.max_fluxo().unwrap_or(0.0),
    );

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Fluxo:");
        for (value, color) in scale.legend_entries(LEGEND_STOPS) {
            ui.label(RichText::new("■").color(color));
            ui.label(format!("{value:.0}"));
        }
    });

    let intervals: Vec<String> = aggregated
        .rows
        .iter()
        .map(|r| r.key.intervalo.clone())
        .collect();

    let bars: Vec<Bar> = aggregated
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Bar::new(i as f64, r.fluxo())
                .name(&r.key.intervalo)
                .fill(scale.color_for(r.fluxo()))
                .width(0.8)
        })
        .collect();

    let porte = selection.vehicle.to_string();
    let chart = BarChart::new(bars)
        .name("Fluxo")
        .element_formatter(Box::new(move |bar: &Bar, _chart: &BarChart| {
            format!(
                "Intervalo: {}\nFluxo: {}\nPorte: {porte}",
                bar.name, bar.value
            )
        }));

    Plot::new("flow_chart")
        .x_axis_label("Intervalo")
        .y_axis_label("Fluxo")
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
        .x_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if idx < 0.0 || (mark.value - idx).abs() > 1e-6 {
                return String::new();
            }
            intervals.get(idx as usize).cloned().unwrap_or_default()
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(chart);
        });
}
