//! markgrid CLI — batch answer-sheet grading from the command line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

use markgrid::{summarize, AnswerKey, Grader, GraderConfig, SheetResult, Template};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "markgrid")]
#[command(about = "Grade photographed answer sheets against a printed template and answer key")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more sheet photos.
    Grade(CliGradeArgs),

    /// Print the geometry of a built-in template.
    TemplateInfo {
        /// Template to describe.
        #[arg(long, value_enum, default_value_t = TemplateArg::Grid25)]
        template: TemplateArg,
    },
}

#[derive(Debug, Clone, Args)]
struct CliGradeArgs {
    /// Sheet photos to grade.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Answer key JSON ({"choices": [...], "responses": [...]}).
    #[arg(long)]
    key: Option<PathBuf>,

    /// Printed template the sheets were produced from.
    #[arg(long, value_enum, default_value_t = TemplateArg::Grid25)]
    template: TemplateArg,

    /// Path to write full per-sheet results (JSON).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write a per-sheet score table (CSV).
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Canonical raster height in pixels.
    #[arg(long, default_value = "1800")]
    canvas_height: u32,

    /// Fill score below which a cell reads as unmarked.
    #[arg(long, default_value = "0.18")]
    blank: f32,

    /// Minimum fill score for a plausible mark.
    #[arg(long, default_value = "0.35")]
    review_low: f32,

    /// Fill score at which a mark is a confident selection.
    #[arg(long, default_value = "0.55")]
    select: f32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TemplateArg {
    /// 25 multiple-choice rows, 5 choices each.
    Grid25,
    /// 30 multiple-choice rows plus a 10-row free-response column.
    Mixed30,
}

impl TemplateArg {
    fn to_template(self) -> Template {
        match self {
            Self::Grid25 => Template::grid25(),
            Self::Mixed30 => Template::mixed30(),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade(args) => run_grade(&args),
        Commands::TemplateInfo { template } => run_template_info(template),
    }
}

// ── grade ──────────────────────────────────────────────────────────────

fn run_grade(args: &CliGradeArgs) -> CliResult<()> {
    let template = args.template.to_template();

    let mut config = GraderConfig::default();
    config.canvas_height = args.canvas_height;
    config.thresholds.blank = args.blank;
    config.thresholds.review_low = args.review_low;
    config.thresholds.select = args.select;

    let key = match &args.key {
        Some(path) => AnswerKey::from_json_file(path, template.choices)?,
        None => AnswerKey::empty(template.rows, template.free_rows()),
    };

    let grader = Grader::with_config(template.clone(), config)?;

    let mut results = Vec::new();
    for path in &args.images {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let photo = match image::open(path) {
            Ok(img) => img.to_luma8(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable image");
                results.push(SheetResult::failed_marker(
                    source,
                    format!("unreadable image: {e}"),
                ));
                continue;
            }
        };
        results.push(grader.grade(&source, &photo, &key, None));
    }

    let summary = summarize(&results, &key, template.rows);

    if let Some(out) = &args.out {
        let report = serde_json::json!({
            "template": template.name,
            "sheets": results,
            "summary": summary,
        });
        std::fs::write(out, serde_json::to_string_pretty(&report)?)?;
        println!("wrote {}", out.display());
    }

    if let Some(csv_path) = &args.csv {
        write_csv(csv_path, &results, template.rows)?;
        println!("wrote {}", csv_path.display());
    }

    println!("graded {} sheet(s)", summary.sheets);
    println!("  graded:        {}", summary.graded);
    println!("  needs review:  {}", summary.needs_review);
    println!("  failed marker: {}", summary.failed);
    if summary.sheets > summary.failed {
        println!(
            "  correct: mean {:.1}, min {}, max {}",
            summary.mean_correct, summary.min_correct, summary.max_correct
        );
    }
    for r in &results {
        let note = r.failure.as_deref().unwrap_or("");
        println!(
            "  {:<30} {:<13} {:>3} correct, {:>3} wrong  {}",
            r.source,
            r.status.to_string(),
            r.choice_tally.correct + r.free_tally.correct,
            r.choice_tally.wrong + r.free_tally.wrong,
            note
        );
    }
    Ok(())
}

/// One row per sheet: filename, status, score, wrong, then the chosen option
/// per question as a 1-based digit (empty for blank/multi/unscored).
fn write_csv(path: &PathBuf, results: &[SheetResult], rows: usize) -> CliResult<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![
        "filename".to_string(),
        "status".to_string(),
        "score".to_string(),
        "wrong".to_string(),
    ];
    for q in 1..=rows {
        header.push(format!("Q{q}"));
    }
    writer.write_record(&header)?;

    for r in results {
        let mut record = vec![
            r.source.clone(),
            r.status.to_string(),
            (r.choice_tally.correct + r.free_tally.correct).to_string(),
            (r.choice_tally.wrong + r.free_tally.wrong).to_string(),
        ];
        for q in 0..rows {
            let cell = r
                .items
                .get(q)
                .and_then(|item| item.choice)
                .map(|c| (c + 1).to_string())
                .unwrap_or_default();
            record.push(cell);
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

// ── template-info ──────────────────────────────────────────────────────

fn run_template_info(arg: TemplateArg) -> CliResult<()> {
    let t = arg.to_template();

    println!("template {}", t.name);
    println!("  page:            {} x {} mm", t.page_w_mm, t.page_h_mm);
    println!("  marker centers:  {} mm from each edge", t.marker_center_offset_mm);
    println!("  scored rows:     {}", t.rows);
    println!("  choices per row: {}", t.choices);
    println!(
        "  first row at:    {:.2} mm, gap {:.2} mm",
        t.row_y0_mm, t.row_gap_mm
    );
    match &t.free_response {
        Some(fr) => println!(
            "  free response:   {} rows of {:.1} mm, x {:.2}..{:.2} mm",
            fr.rows, fr.row_h_mm, fr.x0_mm, fr.x1_mm
        ),
        None => println!("  free response:   none"),
    }
    Ok(())
}
