//! Command line surface. Without a subcommand the TUI starts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::chord::diagram::text_lines;
use crate::chord::{Chord, Diagram};
use crate::db::replace_library_songs;
use crate::import::{ImportPlan, ResolveMode};
use crate::library::Library;
use crate::newsong::NewSong;

#[derive(Parser, Debug)]
#[command(name = "songbook-manager")]
#[command(author, version, about = "Manage a songbook library from the terminal", long_about = None)]
pub struct Cli {
    /// Library directory (defaults to the last one used, then ~/songbook)
    #[arg(short, long, global = true)]
    pub library: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rescan the library and print a summary
    Scan,

    /// Draw a chord given as a \gtab macro
    Chord {
        /// For example '\gtab{A}{X0:222}'
        gtab: String,

        /// Write an SVG diagram instead of printing the text grid
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Frame the SVG diagram
        #[arg(long)]
        border: bool,
    },

    /// Create a song file from the template
    New(NewSongArgs),

    /// Copy songs from another songbook into the library
    Import {
        /// Songbook or folder to import from
        source: PathBuf,

        /// Replace library songs that also exist in the source
        #[arg(long, conflicts_with = "preserve")]
        overwrite: bool,

        /// Keep library songs that also exist in the source
        #[arg(long)]
        preserve: bool,
    },
}

#[derive(Args, Debug)]
pub struct NewSongArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub artist: String,
    #[arg(long, default_value = "")]
    pub album: String,
    /// JPEG image copied beside the song
    #[arg(long)]
    pub cover: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    pub columns: u8,
    #[arg(long, default_value_t = 0)]
    pub capo: u8,
}

impl From<NewSongArgs> for NewSong {
    fn from(args: NewSongArgs) -> Self {
        NewSong {
            title: args.title,
            artist: args.artist,
            album: args.album,
            cover: args.cover,
            columns: args.columns,
            capo: args.capo,
        }
    }
}

/// Rescan `library_dir`, store the snapshot and print the outcome.
pub fn run_scan(conn: &mut Connection, library_dir: &Path) -> Result<()> {
    let mut library = Library::new(library_dir);
    let report = library.update(|_, _| {})?;
    replace_library_songs(conn, library_dir, library.songs())?;

    println!("{report}");
    for (path, reason) in &report.skipped {
        println!("  skipped {}: {reason}", path.display());
    }
    Ok(())
}

pub fn run_chord(gtab: &str, svg: Option<&Path>, border: bool) -> Result<()> {
    let chord = Chord::from_gtab(gtab);
    chord
        .validate()
        .with_context(|| format!("cannot draw {gtab}"))?;

    match svg {
        Some(path) => {
            let diagram = Diagram::render(&chord, border)
                .ok_or_else(|| anyhow!("cannot draw {gtab}"))?;
            fs::write(path, diagram.to_svg())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let lines = text_lines(&chord).ok_or_else(|| anyhow!("cannot draw {gtab}"))?;
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub fn run_new(library_dir: &Path, args: NewSongArgs) -> Result<()> {
    let song = NewSong::from(args);
    let path = song.create_in(library_dir)?;
    println!("Created {}", path.display());
    Ok(())
}

pub fn run_import(library_dir: &Path, source: &Path, overwrite: bool, preserve: bool) -> Result<()> {
    let plan = ImportPlan::from_directory(source, library_dir)?;
    if plan.is_empty() {
        println!("Nothing to import from {}.", source.display());
        return Ok(());
    }

    let mode = if overwrite {
        ResolveMode::Overwrite
    } else if preserve || !plan.conflicts_found() {
        ResolveMode::Preserve
    } else {
        for target in plan.conflicts().values() {
            println!("  conflict: {}", target.display());
        }
        bail!(
            "{} songs already exist in the library; pass --overwrite or --preserve",
            plan.conflicts().len()
        );
    };

    let report = plan.resolve(mode).copy(|done, total| {
        if done == total {
            println!("{done}/{total}");
        }
    });
    for failure in &report.failures {
        println!("  {failure}");
    }
    println!("{}", report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_flags() {
        let cli = Cli::parse_from(["songbook-manager", "import", "/tmp/other", "--overwrite"]);
        match cli.command {
            Some(Command::Import {
                source,
                overwrite,
                preserve,
            }) => {
                assert_eq!(source, PathBuf::from("/tmp/other"));
                assert!(overwrite);
                assert!(!preserve);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn overwrite_and_preserve_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "songbook-manager",
            "import",
            "/tmp/other",
            "--overwrite",
            "--preserve",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn library_flag_is_global() {
        let cli = Cli::parse_from(["songbook-manager", "scan", "--library", "/books/main"]);
        assert_eq!(cli.library, Some(PathBuf::from("/books/main")));
        assert!(matches!(cli.command, Some(Command::Scan)));
    }

    #[test]
    fn invalid_chord_is_rejected() {
        assert!(run_chord("\\gtab{A}{7:X0222}", None, false).is_err());
    }
}
