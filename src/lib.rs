mod byte_writer;
mod constants;
pub mod error;
mod parser;
mod types;
mod utils;
mod writer;

pub use types::*;
pub use utils::{is_chroma_key, pack_rga555, pack_rgb565, unpack_rga555, unpack_rgb565};
pub use writer::build_pack_index;
