use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

// ---------------------------------------------------------------------------
// Sequential colour scale: flow value → Color32
// ---------------------------------------------------------------------------

/// Light-to-dark blue ramp over `[min, max]`, used to colour bars by flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowColorScale {
    min: f64,
    max: f64,
    low: Hsl,
    high: Hsl,
}

impl FlowColorScale {
    pub fn new(min: f64, max: f64) -> Self {
        FlowColorScale {
            min,
            max,
            low: Hsl::new(205.0, 0.70, 0.85),
            high: Hsl::new(215.0, 0.80, 0.30),
        }
    }

    /// Position of `value` within the domain, clamped to `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f32 {
        let range = self.max - self.min;
        if range.abs() < f64::EPSILON {
            return 1.0;
        }
        ((value - self.min) / range).clamp(0.0, 1.0) as f32
    }

    pub fn color_for(&self, value: f64) -> Color32 {
        to_color32(self.low.mix(self.high, self.normalize(value)))
    }

    /// `n` evenly spaced (value, colour) stops for the legend.
    pub fn legend_entries(&self, n: usize) -> Vec<(f64, Color32)> {
        match n {
            0 => Vec::new(),
            1 => vec![(self.max, self.color_for(self.max))],
            _ => (0..n)
                .map(|i| {
                    let v = self.min + (self.max - self.min) * i as f64 / (n - 1) as f64;
                    (v, self.color_for(v))
                })
                .collect(),
        }
    }
}

fn to_color32(hsl: Hsl) -> Color32 {
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brightness(c: Color32) -> u32 {
        c.r() as u32 + c.g() as u32 + c.b() as u32
    }

    #[test]
    fn higher_flow_is_darker() {
        let scale = FlowColorScale::new(0.0, 100.0);
        assert!(brightness(scale.color_for(0.0)) > brightness(scale.color_for(50.0)));
        assert!(brightness(scale.color_for(50.0)) > brightness(scale.color_for(100.0)));
    }

    #[test]
    fn values_outside_domain_are_clamped() {
        let scale = FlowColorScale::new(10.0, 20.0);
        assert_eq!(scale.color_for(-5.0), scale.color_for(10.0));
        assert_eq!(scale.color_for(99.0), scale.color_for(20.0));
    }

    #[test]
    fn degenerate_domain_uses_high_end() {
        let scale = FlowColorScale::new(15.0, 15.0);
        assert_eq!(scale.normalize(15.0), 1.0);
    }

    #[test]
    fn legend_spans_the_domain() {
        let scale = FlowColorScale::new(0.0, 30.0);
        let stops = scale.legend_entries(4);
        let values: Vec<f64> = stops.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec![0.0, 10.0, 20.0, 30.0]);
        assert!(scale.legend_entries(0).is_empty());
    }
}
