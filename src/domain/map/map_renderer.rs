use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tera::Tera;

use crate::domain::jobs_map::model::jobs_map_view::JobsMapView;
use crate::domain::map::kepler_config::DATASET_ID;

const DASHBOARD_TEMPLATE: &str = "dashboard.html";

/// Renders the dashboard page: input form, caption and the kepler.gl widget.
pub struct MapRenderer {
    tera: Tera,
    map_height: u32,
    mapbox_token: Option<String>,
}

impl MapRenderer {
    pub fn new(map_height: u32, mapbox_token: Option<String>) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(DASHBOARD_TEMPLATE, include_str!("templates/dashboard.html"))
            .context("Failed to compile dashboard template")?;

        Ok(Self {
            tera,
            map_height,
            mapbox_token,
        })
    }

    pub fn render_page(&self, view: &JobsMapView, config: &Value) -> Result<String> {
        let mut ctx = tera::Context::new();
        ctx.insert("server_id", &view.server_id);
        ctx.insert("lookback_days", &view.lookback_days);
        ctx.insert("server_name", &view.server_name);
        ctx.insert("caption", &view.caption);
        ctx.insert("map_height", &self.map_height);
        ctx.insert("dataset_json", &script_json(&view.dataset)?);
        ctx.insert("config_json", &script_json(config)?);
        ctx.insert("mapbox_token_json", &script_json(&self.mapbox_token)?);
        ctx.insert("dataset_id_json", &script_json(&DATASET_ID)?);

        self.tera
            .render(DASHBOARD_TEMPLATE, &ctx)
            .context("Failed to render dashboard page")
    }
}

/// JSON safe to inline in a `<script>` element: `<`, `>` and `&` become
/// unicode escapes so the text can never close the element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let raw = serde_json::to_string(value)?;
    Ok(raw
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}
