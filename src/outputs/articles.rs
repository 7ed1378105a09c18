//! Archive transcript files.
//!
//! Each article is written to a file named after its URL (see
//! [`archive_filename`]) with the layout:
//!
//! ```text
//! <url>https://www.gob.mx/...</url>
//! <h1>Versión estenográfica</h1>
//! <h2>Conferencia de prensa</h2>
//! <id>0</id><p>...</p>
//! <id>1</id><p>...</p>
//! ```

use crate::fetch::BoxError;
use crate::models::ArchiveArticle;
use crate::utils::archive_filename;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Render an article into its text-file representation.
pub fn render_article(article: &ArchiveArticle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<url>{}</url>", article.url);
    let _ = writeln!(out, "<h1>{}</h1>", article.h1);
    let _ = writeln!(out, "<h2>{}</h2>", article.h2);
    for (idx, paragraph) in article.paragraphs.iter().enumerate() {
        let _ = writeln!(out, "<id>{idx}</id>{paragraph}");
    }
    out
}

/// Write one article below `outdir` and return the path written.
#[instrument(level = "info", skip_all, fields(url = %article.url))]
pub async fn write_article(outdir: &Path, article: &ArchiveArticle) -> Result<PathBuf, BoxError> {
    let outfile = outdir.join(archive_filename(&article.url));
    info!(path = %outfile.display(), "Writing archive article");
    fs::write(&outfile, render_article(article)).await?;
    Ok(outfile)
}

/// Write every article, returning the paths in article order.
///
/// A failing write is returned immediately; files already written stay on disk.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display(), count = articles.len()))]
pub async fn write_articles(
    outdir: &Path,
    articles: &[ArchiveArticle],
) -> Result<Vec<PathBuf>, BoxError> {
    fs::create_dir_all(outdir).await?;
    let mut written = Vec::with_capacity(articles.len());
    for article in articles {
        written.push(write_article(outdir, article).await?);
    }
    info!(count = written.len(), "Wrote archive articles");
    Ok(written)
}
