pub mod config;
pub mod error;
pub mod input;
pub mod limits;
pub mod model;
pub mod sink;
pub mod summary;
pub mod engine {
    pub mod bits;
    pub mod density;
    pub mod levels;
    pub mod scheduler;
}

pub use config::RenderConfig;
pub use engine::bits::BitModel;
pub use engine::density::DensitySource;
pub use engine::levels::{plan, select_level};
pub use engine::scheduler::{CancelHandle, Phase, RenderSession, Renderer, Step};
pub use error::{InputError, SummaryError};
pub use input::{humanize_bytes, parse_magnitude, try_parse_magnitude, InputUnit};
pub use model::{Density, Level, Mode, RenderPlan, Shape};
pub use sink::{Element, MemorySink, VisualSink};
pub use summary::{
    handle_summary_request, LocalSummaryService, SummaryFetcher, SummaryRequest, SummaryResponse, SummaryTransport,
    TransportResponse,
};
