use bitgrid::{Mode, Phase, RenderConfig, RenderSession, Renderer, Step};
use num_bigint::BigUint;
use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

pub use api::{humanize, set_panic_hook};

/// Progressive renderer bound to a JS sink object.
///
/// The page drives it: `render`, then `step` once per macrotask until the
/// status is no longer `"progress"` or `"pending"`.
#[wasm_bindgen]
pub struct Viewer {
    pub(crate) renderer: Renderer,
    pub(crate) session: Option<RenderSession>,
    pub(crate) sink: interop::JsSink,
}

impl Viewer {
    pub fn rs_new(sink: JsValue, config: RenderConfig) -> Viewer {
        Viewer { renderer: Renderer::with_config(config), session: None, sink: interop::JsSink::new(sink) }
    }

    pub(crate) fn rs_render(&mut self, magnitude: &BigUint, mode: Mode) -> &'static str {
        let s = self.renderer.render(magnitude, mode, &mut self.sink);
        let status = phase_name(s.phase());
        self.session = Some(s);
        status
    }

    pub(crate) fn rs_step(&mut self) -> Option<Step> {
        let s = self.session.as_mut()?;
        Some(s.step(&mut self.sink))
    }
}

pub(crate) fn phase_name(p: Phase) -> &'static str {
    match p {
        Phase::AwaitingSummary => "pending",
        Phase::Chunked => "progress",
        Phase::Done => "done",
        Phase::Cancelled => "cancelled",
    }
}

pub(crate) fn step_name(s: Step) -> &'static str {
    match s {
        Step::Pending => "pending",
        Step::Progress(_) => "progress",
        Step::Done => "done",
        Step::Cancelled => "cancelled",
    }
}
