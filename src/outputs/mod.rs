//! Writers that persist harvested records as text files.
//!
//! # Submodules
//!
//! - [`articles`]: Writes archive transcripts, one file per article
//! - [`videos`]: Writes video descriptions and comment threads, per playlist
//!
//! # Output Structure
//!
//! ```text
//! archive_output_dir/
//! ├── version_estenografica_de_la_conferencia.txt
//! └── ...
//!
//! channel_output_dir/
//! ├── mananeras/
//! │   ├── 2021_05_06_title_conferencia_matutina.txt
//! │   └── conferencia_matutina_comments.txt
//! └── giras/
//! ```
//!
//! File names are derived only from the record itself, so re-running a
//! pipeline overwrites the same files instead of adding new ones.

pub mod articles;
pub mod videos;
