use crate::config::RenderConfig;
use crate::engine::bits::BitModel;
use crate::engine::density::DensitySource;
use crate::engine::levels;
use crate::model::{Level, Mode, RenderPlan, Shape};
use crate::sink::VisualSink;
use crate::summary::{parse_summary_response, SummaryFetcher, SummaryRequest, SummaryTransport};
use num_bigint::BigUint;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Outcome of one scheduler step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Waiting for a group summary; nothing was drawn.
    Pending,
    /// A chunk was drawn; the value is the fraction of blocks emitted so far.
    Progress(f64),
    Done,
    /// The session was superseded or cancelled; nothing was drawn.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    AwaitingSummary,
    Chunked,
    Done,
    Cancelled,
}

/// Cancels one session without touching newer ones.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: u64,
    live: Rc<Cell<u64>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if self.live.get() == self.token {
            self.live.set(self.token.wrapping_add(1));
        }
    }

    pub fn is_current(&self) -> bool { self.live.get() == self.token }
}

/// Owns the render token and the shape currently on the sink.
///
/// Every call to [`Renderer::render`] supersedes all earlier sessions.
#[derive(Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
    live: Rc<Cell<u64>>,
    displayed: Option<Shape>,
}

impl Renderer {
    pub fn new() -> Self { Renderer::default() }

    pub fn with_config(config: RenderConfig) -> Self { Renderer { config, ..Renderer::default() } }

    pub fn config(&self) -> &RenderConfig { &self.config }

    pub fn token(&self) -> u64 { self.live.get() }

    /// Shape of the most recent render, complete or not.
    pub fn displayed(&self) -> Option<Shape> { self.displayed }

    pub fn plan(&self, magnitude: &BigUint, mode: Mode) -> RenderPlan { levels::plan(magnitude, mode) }

    /// Invalidate whatever session is running. Output already drawn stays.
    pub fn cancel(&mut self) {
        let t = self.next_token();
        debug!(token = t, "render cancelled");
    }

    fn next_token(&mut self) -> u64 {
        let t = self.live.get().wrapping_add(1);
        self.live.set(t);
        t
    }

    fn wants_summary(&self, plan: &RenderPlan, mode: Mode) -> bool {
        self.config.use_summary
            && mode == Mode::BitCount
            && plan.level > Level::Kb
            && plan.kb_count() <= BigUint::from(self.config.summary_kb_cap)
    }

    /// Start rendering `magnitude`.
    ///
    /// Small plans are drawn before this returns and come back `Done`. Larger
    /// plans come back `Chunked` (or `AwaitingSummary`) and are driven by
    /// [`RenderSession::step`] or [`RenderSession::run`].
    pub fn render<S: VisualSink + ?Sized>(&mut self, magnitude: &BigUint, mode: Mode, sink: &mut S) -> RenderSession {
        let token = self.next_token();
        let plan = levels::plan(magnitude, mode);
        let shape = plan.shape();
        // Snapshot the old shape before it is overwritten.
        let previous = self.displayed.replace(shape);
        let in_place = previous == Some(shape);
        if !in_place {
            sink.clear();
        }

        let direct = plan.cells() < BigUint::from(self.config.cell_threshold);
        let wants_summary = !direct && self.wants_summary(&plan, mode);
        debug!(
            token,
            level = %plan.level,
            blocks = plan.block_count,
            in_place,
            direct,
            wants_summary,
            "render planned"
        );

        let mut session = RenderSession {
            token,
            live: Rc::clone(&self.live),
            model: BitModel::new(magnitude, mode),
            source: DensitySource::closed_form(plan.total_bits.clone()),
            chunk: self.config.chunk_size(plan.level) as u64,
            plan,
            phase: Phase::Chunked,
            next: 0,
            in_place,
        };
        if direct {
            session.emit_all(sink);
        } else {
            if wants_summary {
                session.phase = Phase::AwaitingSummary;
            }
            sink.report_progress(0.0);
        }
        session
    }
}

/// Incremental state of one render.
#[derive(Debug)]
pub struct RenderSession {
    token: u64,
    live: Rc<Cell<u64>>,
    plan: RenderPlan,
    model: BitModel,
    source: DensitySource,
    phase: Phase,
    next: u64,
    chunk: u64,
    in_place: bool,
}

impl RenderSession {
    pub fn token(&self) -> u64 { self.token }

    pub fn plan(&self) -> &RenderPlan { &self.plan }

    pub fn phase(&self) -> Phase { self.phase }

    /// True when the sink was not cleared because the shape did not change.
    pub fn in_place(&self) -> bool { self.in_place }

    pub fn emitted(&self) -> u64 { self.next }

    pub fn source(&self) -> &DensitySource { &self.source }

    pub fn is_current(&self) -> bool { self.live.get() == self.token }

    pub fn cancel_handle(&self) -> CancelHandle { CancelHandle { token: self.token, live: Rc::clone(&self.live) } }

    pub fn cancel(&self) { self.cancel_handle().cancel() }

    pub fn progress(&self) -> f64 {
        if self.plan.block_count == 0 {
            1.0
        } else {
            self.next as f64 / self.plan.block_count as f64
        }
    }

    /// Body to send to the summary service, while one is awaited.
    pub fn summary_request(&self) -> Option<SummaryRequest> {
        (self.phase == Phase::AwaitingSummary).then(|| SummaryRequest::for_total_bits(&self.plan.total_bits))
    }

    /// Resolve the summary wait. `None`, or an array of the wrong length,
    /// falls back to local densities.
    pub fn supply_summary(&mut self, kb: Option<Vec<f64>>) {
        if self.phase != Phase::AwaitingSummary {
            return;
        }
        if let Some(kb) = kb {
            if BigUint::from(kb.len()) == self.plan.kb_count() {
                self.source = DensitySource::from_kb(self.plan.total_bits.clone(), kb);
            } else {
                warn!(got = kb.len(), "group summary has the wrong length; using local densities");
            }
        }
        self.phase = Phase::Chunked;
    }

    /// Resolve the summary wait from a raw service answer.
    pub fn supply_summary_response(&mut self, status: u16, body: &str) {
        let kb = match parse_summary_response(status, body, &self.plan.total_bits) {
            Ok(kb) => Some(kb),
            Err(e) => {
                warn!(code = e.code(), error = %e, "group summary unavailable; using local densities");
                None
            }
        };
        self.supply_summary(kb);
    }

    /// Ask `fetcher` for the awaited summary. A plan outside the fetcher's
    /// cap is not sent and uses local densities.
    pub async fn fetch_summary<T: SummaryTransport>(&mut self, fetcher: &SummaryFetcher<T>) {
        if self.phase != Phase::AwaitingSummary {
            return;
        }
        if !fetcher.wants(&self.plan) {
            debug!(token = self.token, "plan outside the summary cap; using local densities");
            self.supply_summary(None);
            return;
        }
        let kb = fetcher.fetch_or_fallback(&self.plan.total_bits).await;
        self.supply_summary(kb);
    }

    /// Draw the next chunk. Checks the token first and draws nothing once superseded.
    pub fn step<S: VisualSink + ?Sized>(&mut self, sink: &mut S) -> Step {
        match self.phase {
            Phase::Done => return Step::Done,
            Phase::Cancelled => return Step::Cancelled,
            _ => {}
        }
        if !self.is_current() {
            trace!(token = self.token, emitted = self.next, "stale render abandoned");
            self.phase = Phase::Cancelled;
            return Step::Cancelled;
        }
        if self.phase == Phase::AwaitingSummary {
            return Step::Pending;
        }

        let total = self.plan.block_count;
        let end = self.next.saturating_add(self.chunk).min(total);
        for index in self.next..end {
            self.emit(index, sink);
        }
        self.next = end;
        if end >= total {
            self.finish(sink);
            return Step::Done;
        }
        let p = self.progress();
        sink.report_progress(p);
        trace!(token = self.token, emitted = end, total, "chunk drawn");
        Step::Progress(p)
    }

    /// Drive the session to an end, awaiting `yield_now()` between chunks.
    ///
    /// A summary still awaited at this point is given up on.
    pub async fn run<S, Y, F>(&mut self, sink: &mut S, mut yield_now: Y) -> Step
    where
        S: VisualSink + ?Sized,
        Y: FnMut() -> F,
        F: Future<Output = ()>,
    {
        if self.phase == Phase::AwaitingSummary && self.is_current() {
            debug!(token = self.token, "no group summary supplied; using local densities");
            self.supply_summary(None);
        }
        loop {
            match self.step(sink) {
                Step::Progress(_) | Step::Pending => yield_now().await,
                other => return other,
            }
        }
    }

    /// Draw everything that is left without yielding.
    pub fn finish_now<S: VisualSink + ?Sized>(&mut self, sink: &mut S) -> Step {
        self.supply_summary(None);
        loop {
            match self.step(sink) {
                Step::Progress(_) | Step::Pending => continue,
                other => return other,
            }
        }
    }

    fn emit<S: VisualSink + ?Sized>(&self, index: u64, sink: &mut S) {
        match self.plan.level {
            Level::Byte => sink.draw_byte_row(index, self.model.byte_row(index)),
            level => sink.draw_block_raster(level, index, &self.source.raster(level, index)),
        }
    }

    fn emit_all<S: VisualSink + ?Sized>(&mut self, sink: &mut S) {
        for index in 0..self.plan.block_count {
            self.emit(index, sink);
        }
        self.next = self.plan.block_count;
        self.finish(sink);
    }

    fn finish<S: VisualSink + ?Sized>(&mut self, sink: &mut S) {
        sink.report_progress(1.0);
        sink.report_done();
        self.phase = Phase::Done;
        debug!(token = self.token, blocks = self.next, "render done");
    }
}
