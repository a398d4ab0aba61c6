//! svgbook - rebuild ebooks from SVG page snapshots

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tempfile::NamedTempFile;
use tracing::info;
use tracing_subscriber::EnvFilter;

use svgbook::export::{
    EpubConfig, EpubExporter, Exporter, Format, FsCoverFetcher, HtmlConfig, HtmlExporter, PdfConfig,
    PdfExporter,
};
use svgbook::{Book, decode_text};

#[derive(Parser)]
#[command(name = "svgbook")]
#[command(version, about = "Rebuild ebooks from SVG page snapshots", long_about = None)]
#[command(after_help = "EXAMPLES:
    svgbook book.json book.html           Single HTML document
    svgbook book.json book.epub --covers ./covers
    svgbook book.json out.bin --format pdf  Needs wkhtmltopdf on PATH")]
struct Cli {
    /// Book manifest (JSON: title, chapters, toc)
    #[arg(value_name = "BOOK")]
    input: PathBuf,

    /// Output file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Output format (default: from the output extension)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Directory holding cover images, looked up by file name (EPUB only)
    #[arg(long, value_name = "DIR")]
    covers: Option<PathBuf>,

    /// Heading of the generated table of contents
    #[arg(long)]
    toc_title: Option<String>,

    /// Suppress output messages
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Html,
    Pdf,
    Epub,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Html => Format::Html,
            FormatArg::Pdf => Format::Pdf,
            FormatArg::Epub => Format::Epub,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match convert(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool, verbose: u8) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn convert(cli: &Cli) -> Result<(), String> {
    let format = match cli.format {
        Some(arg) => Format::from(arg),
        None => format_for(&cli.output)?,
    };

    let bytes = fs::read(&cli.input).map_err(|e| format!("{}: {e}", cli.input.display()))?;
    let book = Book::from_json(&decode_text(&bytes, None)).map_err(|e| e.to_string())?;
    info!(
        title = %book.title,
        chapters = book.chapters.len(),
        toc = book.toc.len(),
        "loaded book"
    );

    write_output(&cli.output, |writer| match format {
        Format::Html => {
            let mut config = HtmlConfig::default();
            if let Some(title) = &cli.toc_title {
                config.toc_title = title.clone();
            }
            HtmlExporter::new().with_config(config).export(&book, writer)
        }
        Format::Pdf => {
            let mut config = PdfConfig::default();
            if let Some(title) = &cli.toc_title {
                config.toc_title = title.clone();
            }
            PdfExporter::new().with_config(config).export(&book, writer)
        }
        Format::Epub => {
            let mut exporter = EpubExporter::new().with_config(EpubConfig::default());
            if let Some(dir) = &cli.covers {
                exporter = exporter.with_cover_fetcher(FsCoverFetcher::new(dir));
            }
            exporter.export(&book, writer)
        }
    })?;
    info!(output = %cli.output.display(), "done");
    Ok(())
}

/// Export into a temporary file next to `path` and move it into place only
/// once the export succeeded, so a failed run leaves no partial output.
fn write_output<F>(path: &Path, export: F) -> Result<(), String>
where
    F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> svgbook::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| format!("{}: {e}", dir.display()))?;

    let mut writer = BufWriter::new(&mut tmp);
    export(&mut writer).map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())?;
    drop(writer);

    tmp.as_file().sync_all().map_err(|e| e.to_string())?;
    tmp.persist(path)
        .map_err(|e| format!("{}: {}", path.display(), e.error))?;
    Ok(())
}

fn format_for(path: &Path) -> Result<Format, String> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Format::from_extension)
        .ok_or_else(|| {
            format!(
                "cannot infer format from {}, pass --format html|pdf|epub",
                path.display()
            )
        })
}
