mod assembler;
mod cancel;
mod geometry;
mod plan;
mod raster;
mod render;
mod slice;
pub mod units;

pub use assembler::{Artifact, PageAssembler, Placement};
pub use cancel::CancelToken;
pub use geometry::PageGeometry;
pub use plan::{PagePlan, PagePlanEntry, paginate, plan_pages};
pub use raster::{PageImage, RasterBuffer, flatten_to_rgb};
pub use render::{ProgressFn, RenderOptions, RenderOutcome, render};
pub(crate) use render::assembly_error;
pub use slice::{extract_all, extract_entries, extract_slice};
pub use units::UnitConverter;
