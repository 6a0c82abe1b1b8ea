use crate::interop::warn;
use crate::{error, step_name, Viewer};
use bitgrid::input::{display_bytes, magnitude_in_units};
use bitgrid::summary::parse_summary_response;
use bitgrid::{humanize_bytes, parse_magnitude, try_parse_magnitude, InputUnit, Mode, RenderConfig, RenderPlan};
use serde::Serialize;
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Human-readable size of a magnitude, e.g. `"5 MB"`.
#[wasm_bindgen]
pub fn humanize(value: &str, mode: &str) -> String {
    humanize_bytes(&display_bytes(&parse_magnitude(value), lenient_mode(mode)))
}

fn lenient_mode(mode: &str) -> Mode { mode.parse().unwrap_or(Mode::BitCount) }

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanInfo {
    level: &'static str,
    group_count: u64,
    total_bits: String,
    use_aggregation: bool,
}

impl From<&RenderPlan> for PlanInfo {
    fn from(p: &RenderPlan) -> Self {
        PlanInfo {
            level: p.level.name(),
            group_count: p.block_count,
            total_bits: p.total_bits.to_string(),
            use_aggregation: p.use_aggregation,
        }
    }
}

fn plan_value(p: &RenderPlan) -> JsValue { serde_wasm_bindgen::to_value(&PlanInfo::from(p)).unwrap_or(JsValue::NULL) }

#[wasm_bindgen]
impl Viewer {
    #[wasm_bindgen(constructor)]
    pub fn new(sink: JsValue) -> Viewer {
        Viewer::rs_new(sink, RenderConfig::default())
    }
    /// Partial configs are filled with defaults; an unreadable one is ignored.
    pub fn with_config(sink: JsValue, config: JsValue) -> Viewer {
        let config = match serde_wasm_bindgen::from_value::<RenderConfig>(config) {
            Ok(c) => c,
            Err(e) => {
                warn(&format!("ignoring render config: {e}"));
                RenderConfig::default()
            }
        };
        Viewer::rs_new(sink, config)
    }
    pub fn token(&self) -> u64 {
        self.renderer.token()
    }

    // Rendering
    pub fn render(&mut self, value: &str, mode: &str) -> String {
        self.rs_render(&parse_magnitude(value), lenient_mode(mode)).to_string()
    }
    pub fn render_res(&mut self, value: &str, mode: &str) -> JsValue {
        let mode: Mode = match mode.parse() {
            Ok(m) => m,
            Err(e) => return error::input("mode", &e),
        };
        let n = match try_parse_magnitude(value) {
            Ok(n) => n,
            Err(e) => return error::input("value", &e),
        };
        error::ok(JsValue::from_str(self.rs_render(&n, mode)))
    }
    pub fn render_units(&mut self, value: &str, unit: &str) -> String {
        let unit = unit.parse().unwrap_or(InputUnit::Bits);
        let bits = magnitude_in_units(&parse_magnitude(value), unit, Mode::BitCount);
        self.rs_render(&bits, Mode::BitCount).to_string()
    }
    pub fn render_units_res(&mut self, value: &str, unit: &str) -> JsValue {
        let unit: InputUnit = match unit.parse() {
            Ok(u) => u,
            Err(e) => return error::input("unit", &e),
        };
        let n = match try_parse_magnitude(value) {
            Ok(n) => n,
            Err(e) => return error::input("value", &e),
        };
        let bits = magnitude_in_units(&n, unit, Mode::BitCount);
        error::ok(JsValue::from_str(self.rs_render(&bits, Mode::BitCount)))
    }
    pub fn step(&mut self) -> String {
        self.rs_step().map_or("idle", step_name).to_string()
    }
    pub fn step_res(&mut self) -> JsValue {
        match self.rs_step() {
            Some(s) => error::ok(JsValue::from_str(step_name(s))),
            None => error::no_session(),
        }
    }
    pub fn cancel(&mut self) {
        self.renderer.cancel();
    }
    pub fn progress(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.progress())
    }

    // Group summary
    /// JSON body for `POST /api/group_summary`, or null when none is awaited.
    pub fn summary_request(&self) -> JsValue {
        match self.session.as_ref().and_then(|s| s.summary_request()).map(|req| req.to_json()) {
            Some(Ok(body)) => JsValue::from_str(&body),
            Some(Err(e)) => {
                warn(&format!("summary request not encodable: {e}"));
                JsValue::NULL
            }
            None => JsValue::NULL,
        }
    }
    pub fn supply_summary(&mut self, token: u64, status: u16, body: &str) -> bool {
        match self.session.as_mut() {
            Some(s) if s.token() == token => {
                s.supply_summary_response(status, body);
                true
            }
            _ => false,
        }
    }
    pub fn supply_summary_res(&mut self, token: u64, status: u16, body: &str) -> JsValue {
        let current = self.renderer.token();
        let Some(s) = self.session.as_mut() else {
            return error::no_session();
        };
        if s.token() != token || !s.is_current() {
            return error::stale_token(token, current);
        }
        match parse_summary_response(status, body, &s.plan().total_bits) {
            Ok(kb) => {
                s.supply_summary(Some(kb));
                error::ok(JsValue::from_bool(true))
            }
            Err(e) => {
                s.supply_summary(None);
                error::summary(&e)
            }
        }
    }
    pub fn summary_failed(&mut self, token: u64) -> bool {
        match self.session.as_mut() {
            Some(s) if s.token() == token => {
                s.supply_summary(None);
                true
            }
            _ => false,
        }
    }

    // Debug info
    pub fn plan(&self, value: &str, mode: &str) -> JsValue {
        plan_value(&self.renderer.plan(&parse_magnitude(value), lenient_mode(mode)))
    }
    pub fn plan_res(&self, value: &str, mode: &str) -> JsValue {
        let mode: Mode = match mode.parse() {
            Ok(m) => m,
            Err(e) => return error::input("mode", &e),
        };
        match try_parse_magnitude(value) {
            Ok(n) => error::ok(plan_value(&self.renderer.plan(&n, mode))),
            Err(e) => error::input("value", &e),
        }
    }
}
