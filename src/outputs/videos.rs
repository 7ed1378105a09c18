//! Video description and comment files, grouped per playlist.
//!
//! Descriptions go to `<outdir>/<playlist>/<date>_title_<title>.txt`:
//!
//! ```text
//! <h1>2021-05-06T13:00:00Z</h1>
//! <h2>Conferencia matutina</h2>
//! <p>First paragraph of the description</p>
//! ```
//!
//! Paragraphs containing links are left out. Comments go to
//! `<outdir>/<playlist>/<title>_comments.txt` as one JSON document.

use crate::fetch::BoxError;
use crate::models::{PlaylistVideo, PlaylistVideos, VideoComments};
use crate::utils::{description_paragraphs, normalize_for_filename, publication_date};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// File name of a video description.
pub fn description_filename(video: &PlaylistVideo) -> String {
    format!(
        "{}_title_{}.txt",
        publication_date(&video.published_at),
        normalize_for_filename(&video.title)
    )
}

/// File name of a video's comment dump.
pub fn comments_filename(title: &str) -> String {
    format!("{}_comments.txt", normalize_for_filename(title))
}

pub fn render_description(video: &PlaylistVideo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<h1>{}</h1>", video.published_at);
    let _ = writeln!(out, "<h2>{}</h2>", video.title);
    for paragraph in description_paragraphs(&video.description) {
        let _ = writeln!(out, "<p>{paragraph}</p>");
    }
    out
}

/// Write one description file per video, returning how many files were written.
///
/// When `clean` is set an existing `outdir` is removed first. A video whose
/// file name is already taken in its playlist gets its video id appended.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display(), clean = clean))]
pub async fn write_video_descriptions(
    outdir: &Path,
    playlists: &[PlaylistVideos],
    clean: bool,
) -> Result<usize, BoxError> {
    if clean && fs::try_exists(outdir).await? {
        info!("Removing previous output");
        fs::remove_dir_all(outdir).await?;
    }

    let mut count = 0usize;
    for playlist in playlists {
        info!(playlist = %playlist.dir_name, videos = playlist.videos.len(), "Writing descriptions");
        let subdir = outdir.join(&playlist.dir_name);
        fs::create_dir_all(&subdir).await?;

        let mut used = HashSet::new();
        for video in &playlist.videos {
            let mut name = description_filename(video);
            if !used.insert(name.clone()) {
                let renamed = format!("{}_{}.txt", name.trim_end_matches(".txt"), video.video_id);
                warn!(%name, %renamed, video_id = %video.video_id, "Description file name already used in playlist");
                used.insert(renamed.clone());
                name = renamed;
            }
            let outfile = subdir.join(name);
            debug!(path = %outfile.display(), "Writing description");
            fs::write(&outfile, render_description(video)).await?;
            count += 1;
        }
    }

    info!(count, "Video description files were written");
    Ok(count)
}

/// Write the comment threads of each video as JSON, returning the paths written.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display()))]
pub async fn write_video_comments(
    outdir: &Path,
    comments: &[VideoComments],
) -> Result<Vec<PathBuf>, BoxError> {
    let mut written = Vec::with_capacity(comments.len());
    for video in comments {
        let subdir = outdir.join(&video.dir_name);
        fs::create_dir_all(&subdir).await?;

        let outfile = subdir.join(comments_filename(&video.title));
        info!(path = %outfile.display(), threads = video.items.len(), "Writing comments");
        fs::write(&outfile, serde_json::to_string(video)?).await?;
        written.push(outfile);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Playlist;
    use serde_json::json;

    fn video(title: &str, published_at: &str) -> PlaylistVideo {
        PlaylistVideo {
            video_id: "abc".to_string(),
            title: title.to_string(),
            description: "Resumen del día\n\nMás en https://gob.mx\n\nGracias".to_string(),
            published_at: published_at.to_string(),
            position: Some(0),
        }
    }

    fn playlist(dir_name: &str, videos: Vec<PlaylistVideo>) -> PlaylistVideos {
        PlaylistVideos {
            dir_name: dir_name.to_string(),
            playlist: Playlist {
                id: "PL1".to_string(),
                title: dir_name.to_string(),
                description: String::new(),
            },
            videos,
            truncated: false,
        }
    }

    #[test]
    fn test_description_filename() {
        let v = video("Conferencia de prensa, 6 de mayo.", "2021-05-06T13:00:00Z");
        assert_eq!(
            description_filename(&v),
            "2021_05_06_title_conferencia_de_prensa_6_de_mayo.txt"
        );
        assert_eq!(comments_filename("¿Qué pasó?"), "que_paso_comments.txt");
    }

    #[test]
    fn test_render_description_skips_link_paragraphs() {
        let v = video("Título", "2021-05-06T13:00:00Z");
        assert_eq!(
            render_description(&v),
            "<h1>2021-05-06T13:00:00Z</h1>\n<h2>Título</h2>\n<p>Resumen del día</p>\n<p>Gracias</p>\n"
        );
    }

    #[tokio::test]
    async fn test_write_video_descriptions_cleans_and_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let outdir = tmp.path().join("Data");
        std::fs::create_dir_all(outdir.join("stale")).unwrap();

        let playlists = vec![
            playlist(
                "mananeras",
                vec![
                    video("Uno", "2021-05-06T13:00:00Z"),
                    video("Dos", "2021-05-07T13:00:00Z"),
                ],
            ),
            playlist("giras", vec![video("Tres", "2021-06-01T08:00:00Z")]),
        ];

        let count = write_video_descriptions(&outdir, &playlists, true).await.unwrap();
        assert_eq!(count, 3);
        assert!(!outdir.join("stale").exists());
        assert!(outdir.join("mananeras").join("2021_05_06_title_uno.txt").is_file());
        assert!(outdir.join("mananeras").join("2021_05_07_title_dos.txt").is_file());
        assert!(outdir.join("giras").join("2021_06_01_title_tres.txt").is_file());
    }

    #[tokio::test]
    async fn test_write_video_descriptions_keeps_existing_without_clean() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("stale")).unwrap();

        let playlists = vec![playlist("giras", vec![video("Tres", "2021-06-01T08:00:00Z")])];
        write_video_descriptions(tmp.path(), &playlists, false).await.unwrap();
        assert!(tmp.path().join("stale").is_dir());
    }

    #[tokio::test]
    async fn test_write_video_comments_as_json() {
        let tmp = tempfile::tempdir().unwrap();
        let comments = vec![VideoComments {
            dir_name: "mananeras".to_string(),
            video_id: "abc".to_string(),
            title: "Conferencia".to_string(),
            items: vec![json!({ "id": "thread-1" })],
        }];

        let written = write_video_comments(tmp.path(), &comments).await.unwrap();
        assert_eq!(written, vec![tmp.path().join("mananeras").join("conferencia_comments.txt")]);

        let text = std::fs::read_to_string(&written[0]).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            doc,
            json!({ "videoId": "abc", "title": "Conferencia", "items": [{ "id": "thread-1" }] })
        );
    }

    #[tokio::test]
    async fn test_colliding_names_keep_both_descriptions() {
        let tmp = tempfile::tempdir().unwrap();
        let first = video("Conferencia", "2021-05-06T13:00:00Z");
        let mut second = video("Conferencia.", "2021-05-06T18:00:00Z");
        second.video_id = "def".to_string();
        second.description = "Vespertina".to_string();

        let playlists = vec![playlist("mananeras", vec![first, second])];
        let count = write_video_descriptions(tmp.path(), &playlists, false).await.unwrap();

        let dir = tmp.path().join("mananeras");
        assert_eq!(count, 2);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 2);
        let renamed = std::fs::read_to_string(dir.join("2021_05_06_title_conferencia_def.txt")).unwrap();
        assert!(renamed.contains("<p>Vespertina</p>"));
        assert!(dir.join("2021_05_06_title_conferencia.txt").is_file());
    }
}
