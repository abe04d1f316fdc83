use std::time::Duration;

// ---------------------------------------------------------------------------
// Fixed data sources
// ---------------------------------------------------------------------------

pub const BASE_URL: &str = "https://dados.gov.br";
pub const DATASET_PATH: &str = "/dataset/volume-medio-diario-de-trafego";
pub const ROADS_PATH: &str = "/dataset/3cb44f4a-576c-45b8-8f13-ae94a6623277/resource/2bd0f48e-d3a1-47c6-bd12-83aed24e9461/download/2022-08-18-scr.csv";

pub const WINDOW_TITLE: &str = "Fluxo de veículos no DF";
pub const WINDOW_SIZE: [f32; 2] = [1200.0, 800.0];
pub const WINDOW_MIN_SIZE: [f32; 2] = [600.0, 400.0];

/// Where the dashboard reads its data from and how to decode it.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Catalog listing page scraped for the time-range datasets.
    pub catalog_url: String,
    /// Semicolon-delimited CSV of road segments.
    pub roads_url: String,
    /// Encoding labels understood by `encoding_rs` (WHATWG labels).
    pub catalog_encoding: String,
    pub traffic_encoding: String,
    pub roads_encoding: String,
    pub traffic_delimiter: u8,
    pub roads_delimiter: u8,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Rows shown in the raw-data preview.
    pub preview_rows: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            catalog_url: format!("{BASE_URL}{DATASET_PATH}"),
            roads_url: format!("{BASE_URL}{ROADS_PATH}"),
            catalog_encoding: "utf-8".to_string(),
            traffic_encoding: "latin1".to_string(),
            roads_encoding: "utf-8".to_string(),
            traffic_delimiter: b',',
            roads_delimiter: b';',
            request_timeout: Duration::from_secs(60),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            preview_rows: 10,
        }
    }
}
