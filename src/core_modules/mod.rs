// The internal layers of the perception core, leaf-first: raw pixels up to
// the dispatch queue. External consumers should go through `pipeline` and
// `runtime` instead of reaching in here.

pub mod pixel;
pub mod frame;
pub mod preprocessor;
pub mod segmenter;
pub mod contour;
pub mod shape_validator;
pub mod ranker;
pub mod geometry;
pub mod command;
pub mod stabilizer;
pub mod dispatch;
pub mod utils;
