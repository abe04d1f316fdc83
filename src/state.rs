use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::Memo;
use crate::config::SourceConfig;
use crate::data::catalog::{load_ranges, RangeCatalog};
use crate::data::fetch::Fetch;
use crate::data::filter::{filter_and_aggregate, AggregatedTable};
use crate::data::loader::load_traffic;
use crate::data::model::{TrafficTable, PORTE, TRECHO};
use crate::data::roads::{load_segments, road_catalog, RoadCatalog, RoadSegment};
use crate::error::DashboardError;

pub const RANGE_LABEL: &str = "Intervalo de tempo";
pub const VEHICLE_LABEL: &str = "Tipo de veículo";
pub const ROAD_LABEL: &str = "Trecho";

// ---------------------------------------------------------------------------
// Loader caches
// ---------------------------------------------------------------------------

/// Memoized loader results, kept for the whole process.
#[derive(Default)]
pub struct Caches {
    /// Keyed by catalog page URL.
    pub ranges: Memo<String, RangeCatalog>,
    /// Keyed by traffic CSV URL.
    pub traffic: Memo<String, TrafficTable>,
    /// Keyed by roads CSV URL.
    pub roads: Memo<String, Vec<RoadSegment>>,
}

/// A complete, valid set of dropdown picks.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub range: &'a str,
    pub vehicle: &'a str,
    pub road_label: &'a str,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The dashboard state, independent of rendering.
///
/// Changing a dropdown recomputes everything downstream of it before the
/// next frame is drawn.
pub struct AppState {
    pub config: SourceConfig,
    fetcher: Box<dyn Fetch>,
    caches: Caches,

    /// Range dropdown options.
    pub ranges: Arc<RangeCatalog>,
    pub selected_range: Option<String>,

    /// Dataset of the selected range (None until loaded).
    pub dataset: Option<Arc<TrafficTable>>,

    /// Vehicle dropdown options: sorted distinct `Porte` values.
    pub vehicle_options: Vec<String>,
    pub selected_vehicle: Option<String>,

    /// Road dropdown options, restricted to segments in `dataset`.
    pub roads: RoadCatalog,
    pub selected_road: Option<String>,

    /// Chart data for the current selection.
    pub aggregated: Option<AggregatedTable>,

    /// Error message shown in the UI.
    pub status_message: Option<String>,

    started: bool,
}

impl AppState {
    pub fn new(config: SourceConfig, fetcher: Box<dyn Fetch>) -> Self {
        Self {
            config,
            fetcher,
            caches: Caches::default(),
            ranges: Arc::new(RangeCatalog::default()),
            selected_range: None,
            dataset: None,
            vehicle_options: Vec::new(),
            selected_vehicle: None,
            roads: RoadCatalog::new(),
            selected_road: None,
            aggregated: None,
            status_message: None,
            started: false,
        }
    }

    /// Populate the range dropdown on first call; later calls do nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        if let Err(e) = self.load_catalog(None) {
            self.report(e);
        }
    }

    /// Run the pipeline again from the catalog, staying on the current time
    /// range if the catalog still lists it. Cached results are reused,
    /// failed loads are retried.
    pub fn reload(&mut self) {
        let keep = self.selected_range.take();
        self.started = true;
        self.status_message = None;
        if let Err(e) = self.load_catalog(keep.as_deref()) {
            self.report(e);
        }
    }

    /// Load the catalog and select `preferred`, or the first range when the
    /// catalog does not list it.
    fn load_catalog(&mut self, preferred: Option<&str>) -> Result<()> {
        let url = self.config.catalog_url.clone();
        let encoding = self.config.catalog_encoding.clone();
        let fetcher = self.fetcher.as_ref();
        self.ranges = self
            .caches
            .ranges
            .get_or_try_insert_with(&url, || load_ranges(fetcher, &url, &encoding))
            .context("loading the time-range catalog")?;

        if self.ranges.is_empty() {
            log::warn!("catalog at {url} lists no time ranges");
            self.clear_from_range();
            return Ok(());
        }

        let ranges = Arc::clone(&self.ranges);
        let label = preferred
            .filter(|p| ranges.url(p).is_some())
            .or_else(|| ranges.first_label());
        match label {
            Some(label) => self.try_select_range(label),
            None => Ok(()),
        }
    }

    // -- Selection changes --

    pub fn select_range(&mut self, label: &str) {
        if let Err(e) = self.try_select_range(label) {
            self.report(e);
        }
    }

    pub fn select_vehicle(&mut self, vehicle: &str) {
        self.selected_vehicle = Some(vehicle.to_string());
        self.refresh();
    }

    pub fn select_road(&mut self, label: &str) {
        self.selected_road = Some(label.to_string());
        self.refresh();
    }

    /// Load the range's dataset, rebuild the vehicle and road options, and
    /// re-aggregate.
    fn try_select_range(&mut self, label: &str) -> Result<()> {
        self.clear_from_range();
        self.status_message = None;
        self.selected_range = Some(label.to_string());

        let url = self
            .ranges
            .url(label)
            .map(str::to_string)
            .with_context(|| format!("unknown time range '{label}'"))?;

        let fetcher = self.fetcher.as_ref();
        let config = &self.config;
        let dataset = self
            .caches
            .traffic
            .get_or_try_insert_with(&url, || {
                load_traffic(fetcher, &url, &config.traffic_encoding, config.traffic_delimiter)
            })
            .with_context(|| format!("loading traffic data for '{label}'"))?;
        if dataset.is_empty() {
            log::warn!("traffic data for '{label}' has no rows");
        }

        let roads_url = config.roads_url.clone();
        let segments = self
            .caches
            .roads
            .get_or_try_insert_with(&roads_url, || {
                load_segments(fetcher, &roads_url, &config.roads_encoding, config.roads_delimiter)
            })
            .context("loading road segments")?;

        let present: BTreeSet<String> = dataset.distinct_keys(TRECHO).into_iter().collect();
        self.roads = road_catalog(&segments, &present);
        self.vehicle_options = dataset.distinct_keys(PORTE);
        self.selected_vehicle = self.vehicle_options.first().cloned();
        self.selected_road = self.roads.keys().next().cloned();
        self.dataset = Some(dataset);

        self.recompute()
    }

    fn refresh(&mut self) {
        if let Err(e) = self.recompute() {
            self.report(e);
        }
    }

    /// Re-aggregate for the current vehicle and road picks.
    fn recompute(&mut self) -> Result<()> {
        self.aggregated = None;
        let (Some(dataset), Some(vehicle), Some(road)) =
            (&self.dataset, &self.selected_vehicle, &self.selected_road)
        else {
            return Ok(());
        };
        let code = self
            .roads
            .get(road)
            .with_context(|| format!("unknown road segment '{road}'"))?;

        let aggregated = filter_and_aggregate(dataset, vehicle, code)
            .with_context(|| format!("aggregating flow for {vehicle} on {road}"))?;
        log::info!(
            "{vehicle} / {road}: {} intervals",
            aggregated.rows.len()
        );
        self.aggregated = Some(aggregated);
        Ok(())
    }

    fn clear_from_range(&mut self) {
        self.selected_range = None;
        self.dataset = None;
        self.vehicle_options.clear();
        self.selected_vehicle = None;
        self.roads.clear();
        self.selected_road = None;
        self.aggregated = None;
    }

    fn report(&mut self, err: anyhow::Error) {
        log::error!("{err:#}");
        self.aggregated = None;
        self.status_message = Some(format!("Erro: {err:#}"));
    }

    // -- Read access for rendering --

    /// The current picks, or which dropdown has no options.
    pub fn selection(&self) -> std::result::Result<Selection<'_>, DashboardError> {
        let range = self
            .selected_range
            .as_deref()
            .ok_or(DashboardError::EmptySelection(RANGE_LABEL))?;
        let vehicle = self
            .selected_vehicle
            .as_deref()
            .ok_or(DashboardError::EmptySelection(VEHICLE_LABEL))?;
        let road_label = self
            .selected_road
            .as_deref()
            .and_then(|label| self.roads.get_key_value(label))
            .map(|(label, _)| label.as_str())
            .ok_or(DashboardError::EmptySelection(ROAD_LABEL))?;
        Ok(Selection {
            range,
            vehicle,
            road_label,
        })
    }

    /// `"<vehicle> / <road> / <range>"` shown under the title.
    pub fn caption(&self) -> Option<String> {
        let s = self.selection().ok()?;
        Some([s.vehicle, s.road_label, s.range].join(" / "))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::data::fetch::testing::MemoryFetcher;

    const CATALOG: &str = "https://catalog.test/dataset/trafego";
    const ROADS: &str = "https://catalog.test/roads.csv";
    const JAN: &str = "https://catalog.test/jan.csv";
    const FEV: &str = "https://catalog.test/fev.csv";

    fn config() -> SourceConfig {
        SourceConfig {
            catalog_url: CATALOG.to_string(),
            roads_url: ROADS.to_string(),
            ..SourceConfig::default()
        }
    }

    fn catalog_page(items: &[(&str, &str)]) -> String {
        let lis: String = items
            .iter()
            .map(|(heading, url)| {
                format!(
                    r#"<li class="resource-item"><a class="heading">{heading}</a>
                       <a class="resource-url-analytics" href="/track?url={url}">Ir</a></li>"#
                )
            })
            .collect();
        format!("<html><body><ul>{lis}</ul></body></html>")
    }

    fn fetcher() -> Rc<MemoryFetcher> {
        let page = catalog_page(&[("Tráfego Jan/2022 CSV", JAN), ("Tráfego Fev/2022 CSV", FEV)]);
        Rc::new(
            MemoryFetcher::default()
                .with(CATALOG, page)
                .with(
                    JAN,
                    "Trecho,Porte,Intervalo,Fluxo\n\
                     A,Leve,08-09,10\n\
                     A,Leve,08-09,5\n\
                     A,Pesado,08-09,3\n\
                     B,Leve,09-10,8\n",
                )
                .with(FEV, "Trecho,Porte,Intervalo,Fluxo\nC,Moto,10-11,2\n")
                .with(
                    ROADS,
                    "COD. TRECHO;INÍCIO;FIM\nA;Taguatinga;Ceilândia\nB;Asa Norte;Sobradinho\nC;Gama;Recanto\nD;Lago;Paranoá\n",
                ),
        )
    }

    fn started(fetcher: &Rc<MemoryFetcher>) -> AppState {
        let mut state = AppState::new(config(), Box::new(Rc::clone(fetcher)));
        state.start();
        state
    }

    #[test]
    fn startup_selects_first_option_of_each_dropdown() {
        let f = fetcher();
        let state = started(&f);
        assert_eq!(state.status_message, None);
        assert_eq!(state.ranges.labels().collect::<Vec<_>>(), vec!["Jan de 2022", "Fev de 2022"]);
        assert_eq!(state.vehicle_options, vec!["Leve", "Pesado"]);
        assert_eq!(
            state.roads.keys().collect::<Vec<_>>(),
            vec!["Asa Norte <=> Sobradinho", "Taguatinga <=> Ceilândia"]
        );

        let sel = state.selection().unwrap();
        assert_eq!(sel.vehicle, "Leve");
        assert_eq!(state.roads[sel.road_label], "B");
        assert_eq!(
            state.caption().as_deref(),
            Some("Leve / Asa Norte <=> Sobradinho / Jan de 2022")
        );
    }

    #[test]
    fn selecting_vehicle_and_road_aggregates_flow() {
        let f = fetcher();
        let mut state = started(&f);
        state.select_road("Taguatinga <=> Ceilândia");
        state.select_vehicle("Leve");

        let agg = state.aggregated.as_ref().unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].fluxo(), 15.0);
        assert_eq!(agg.rows[0].key.trecho, "A");
    }

    #[test]
    fn changing_range_rebuilds_downstream_options() {
        let f = fetcher();
        let mut state = started(&f);
        state.select_range("Fev de 2022");

        assert_eq!(state.vehicle_options, vec!["Moto"]);
        assert_eq!(state.roads.keys().collect::<Vec<_>>(), vec!["Gama <=> Recanto"]);
        assert_eq!(state.aggregated.as_ref().unwrap().rows[0].fluxo(), 2.0);
    }

    #[test]
    fn loaders_fetch_each_url_once() {
        let f = fetcher();
        let mut state = started(&f);
        state.select_range("Fev de 2022");
        state.select_range("Jan de 2022");
        state.select_range("Fev de 2022");
        state.start();

        assert_eq!(f.calls(CATALOG), 1);
        assert_eq!(f.calls(JAN), 1);
        assert_eq!(f.calls(FEV), 1);
        assert_eq!(f.calls(ROADS), 1);
    }

    #[test]
    fn empty_catalog_yields_zero_options_without_error() {
        let f = Rc::new(MemoryFetcher::default().with(CATALOG, "<html><body></body></html>"));
        let state = started(&f);

        assert!(state.ranges.is_empty());
        assert_eq!(state.status_message, None);
        assert!(state.aggregated.is_none());
        assert!(matches!(
            state.selection(),
            Err(DashboardError::EmptySelection(RANGE_LABEL))
        ));
        assert_eq!(state.caption(), None);
    }

    #[test]
    fn failed_download_surfaces_message_and_clears_view() {
        let page = catalog_page(&[("Tráfego Jan/2022 CSV", "https://catalog.test/missing.csv")]);
        let f = Rc::new(MemoryFetcher::default().with(CATALOG, page));
        let state = started(&f);

        let msg = state.status_message.as_deref().unwrap();
        assert!(msg.contains("Jan de 2022"), "{msg}");
        assert!(msg.contains("missing.csv"), "{msg}");
        assert!(state.dataset.is_none());
        assert!(state.aggregated.is_none());
        assert_eq!(state.selected_range.as_deref(), Some("Jan de 2022"));
        assert!(matches!(
            state.selection(),
            Err(DashboardError::EmptySelection(VEHICLE_LABEL))
        ));
    }

    #[test]
    fn start_runs_once_and_reload_fetches_again() {
        let f = Rc::new(MemoryFetcher::default());
        let mut state = started(&f);
        assert!(state.status_message.is_some());
        state.start();
        assert_eq!(f.calls(CATALOG), 1);

        state.reload();
        assert_eq!(f.calls(CATALOG), 2);
    }

    #[test]
    fn reload_after_success_reuses_caches() {
        let f = fetcher();
        let mut state = started(&f);
        state.select_vehicle("Pesado");
        state.reload();

        assert_eq!(f.calls(CATALOG), 1);
        assert_eq!(f.calls(JAN), 1);
        assert_eq!(state.status_message, None);
        assert_eq!(state.selected_vehicle.as_deref(), Some("Leve"));
    }

    #[test]
    fn reload_stays_on_the_selected_range() {
        let f = fetcher();
        let mut state = started(&f);
        state.select_range("Fev de 2022");
        state.reload();

        assert_eq!(state.selected_range.as_deref(), Some("Fev de 2022"));
        assert_eq!(state.vehicle_options, vec!["Moto"]);
        assert_eq!(f.calls(JAN), 1);
        assert_eq!(f.calls(FEV), 1);
    }

    #[test]
    fn reload_retries_a_failed_range() {
        let page = catalog_page(&[("Tráfego Jan/2022 CSV", JAN), ("Tráfego Fev/2022 CSV", FEV)]);
        let f = Rc::new(
            MemoryFetcher::default()
                .with(CATALOG, page)
                .with(JAN, "Trecho,Porte,Intervalo,Fluxo\nA,Leve,08-09,1\n")
                .with(ROADS, "COD. TRECHO;INÍCIO;FIM\nA;Taguatinga;Ceilândia\n"),
        );
        let mut state = started(&f);
        state.select_range("Fev de 2022");
        assert!(state.status_message.is_some());

        state.reload();
        assert_eq!(f.calls(FEV), 2);
        assert_eq!(f.calls(JAN), 1);
        assert_eq!(state.selected_range.as_deref(), Some("Fev de 2022"));
        assert!(state.status_message.is_some());
    }

    #[test]
    fn reload_falls_back_to_first_range_when_selection_is_gone() {
        let f = fetcher();
        let mut state = started(&f);
        state.selected_range = Some("Dez de 1999".to_string());
        state.reload();

        assert_eq!(state.selected_range.as_deref(), Some("Jan de 2022"));
        assert_eq!(state.status_message, None);
    }

    #[test]
    fn zero_padded_segment_codes_reach_the_road_dropdown() {
        let page = catalog_page(&[("Tráfego Jan/2022 CSV", JAN)]);
        let f = Rc::new(
            MemoryFetcher::default()
                .with(CATALOG, page)
                .with(JAN, "Trecho,Porte,Intervalo,Fluxo\n007,Leve,08-09,10\n")
                .with(ROADS, "COD. TRECHO;INÍCIO;FIM\n007;Guará;Núcleo Bandeirante\n"),
        );
        let state = started(&f);

        assert_eq!(state.status_message, None);
        assert_eq!(
            state.roads.keys().collect::<Vec<_>>(),
            vec!["Guará <=> Núcleo Bandeirante"]
        );
        let agg = state.aggregated.as_ref().unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.rows[0].key.trecho, "007");
        assert_eq!(agg.rows[0].fluxo(), 10.0);
    }
}
