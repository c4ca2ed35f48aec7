mod mode;
pub use mode::cmd_mode;

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::template_io::FsTemplateSource;
use crate::model::format::{CaptureMode, Vocabulary};
use crate::model::metadata::{DATE_FORMAT, Field};
use crate::ops::file_name::document_file_name;
use crate::ops::{CaptureEngine, CaptureSession, DocumentOutput};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let cwd = std::env::current_dir()?;
    let config_path = config_io::config_path(cli.config.as_deref(), &cwd);

    match cli.command {
        Commands::Task(args) => cmd_task(args, &config_path, json),
        Commands::Note(args) => cmd_note(args, &config_path, &cwd, json),
        Commands::Scan(args) => cmd_scan(args, &config_path, json),
        Commands::Extract(args) => cmd_extract(args, &config_path, json),
        Commands::Mode(args) => cmd_mode(args, &config_path, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Words joined with spaces, or all of stdin when no words were given
fn read_input(words: &[String]) -> Result<String, Box<dyn std::error::Error>> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}

fn reference_date(today: Option<&str>) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    match today {
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|_| format!("invalid --today date '{}' (expected YYYY-MM-DD)", s).into()),
        None => Ok(Local::now().date_naive()),
    }
}

fn load_engine(config_path: &Path, today: NaiveDate) -> Result<CaptureEngine, Box<dyn std::error::Error>> {
    let config = config_io::load_config(config_path)?;
    Ok(CaptureEngine::new(&config, today)?)
}

/// A session in `mode` with the controls from `args` applied, then the text
fn capture_session<'e>(
    engine: &'e CaptureEngine,
    args: &CaptureArgs,
    mode: CaptureMode,
    content: &str,
) -> Result<CaptureSession<'e>, Box<dyn std::error::Error>> {
    let mut session = CaptureSession::new(engine).with_mode(mode);
    if let Some(ref vocab) = args.vocab {
        let vocabulary: Vocabulary = vocab
            .parse()
            .map_err(|v| format!("unknown vocabulary '{}' (expected symbol or bracket)", v))?;
        session = session.with_vocabulary(vocabulary);
    }

    let controls = [
        (Field::StartDate, &args.start),
        (Field::DueDate, &args.due),
        (Field::ScheduledDate, &args.scheduled),
        (Field::Priority, &args.priority),
        (Field::Project, &args.project),
        (Field::Context, &args.context),
        (Field::Recurrence, &args.repeat),
        (Field::Status, &args.status),
    ];
    for (field, value) in controls {
        if let Some(value) = value {
            session.set_field(field, value)?;
        }
    }
    for tag in &args.tag {
        session.add_tag(tag);
    }

    session.update_text(content);
    Ok(session)
}

fn print_capture(
    session: &CaptureSession<'_>,
    text: &str,
    file_name: Option<String>,
    output: Option<&DocumentOutput>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let out = CaptureJson {
            mode: session.mode(),
            vocabulary: session.vocabulary(),
            text,
            record: session.record(),
            file_name,
            template_error: output
                .and_then(|o| o.template_error.as_ref())
                .map(TemplateErrorJson::from),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if let Some(e) = output.and_then(|o| o.template_error.as_ref()) {
        eprintln!("warning: {}; wrote a minimal preamble instead", e);
    }
    if let Some(name) = file_name {
        println!("{}", name);
        println!();
    }
    println!("{}", text);
    Ok(())
}

// ---------------------------------------------------------------------------
// Capture commands
// ---------------------------------------------------------------------------

fn cmd_task(args: CaptureArgs, config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(config_path, reference_date(args.today.as_deref())?)?;
    let content = read_input(&args.text)?;
    let session = capture_session(&engine, &args, CaptureMode::InlineTask, &content)?;
    let text = session.submit();
    print_capture(&session, &text, None, None, json)
}

fn cmd_note(args: NoteArgs, config_path: &Path, cwd: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let today = reference_date(args.capture.today.as_deref())?;
    let engine = load_engine(config_path, today)?;
    let content = read_input(&args.capture.text)?;
    let session = capture_session(&engine, &args.capture, CaptureMode::Document, &content)?;

    let document = &engine.config().document;
    let template = args
        .template
        .clone()
        .or_else(|| document.use_template.then(|| document.template.clone()));

    let output = match template {
        Some(path) => {
            let root: PathBuf = args.template_root.clone().unwrap_or_else(|| cwd.to_path_buf());
            Some(session.submit_with_template(&FsTemplateSource::new(root), &path))
        }
        None => None,
    };
    let text = match output {
        Some(ref out) => out.text.clone(),
        None => session.submit(),
    };

    let file_name = args.name.then(|| {
        let (cleaned, _, _) = engine.extract_metadata_and_tags(&content);
        let title = cleaned
            .lines()
            .map(|l| engine.scan_line(l).cleaned_line)
            .find(|l| !l.trim().is_empty());
        document_file_name(
            &document.file_name_template,
            title.as_deref(),
            today.and_time(Local::now().time()),
            &document.default_folder,
        )
    });

    print_capture(&session, &text, file_name, output.as_ref(), json)
}

// ---------------------------------------------------------------------------
// Inspection commands
// ---------------------------------------------------------------------------

fn cmd_scan(args: ScanArgs, config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(config_path, reference_date(args.today.as_deref())?)?;
    let line = args.line.lines().next().unwrap_or_default();
    let scan = engine.scan_line(line);

    if json {
        println!("{}", serde_json::to_string_pretty(&ScanJson::from(&scan))?);
    } else {
        for line in format_scan(&scan) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_extract(args: ExtractArgs, config_path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine(config_path, Local::now().date_naive())?;
    let text = read_input(&args.text)?;
    let (cleaned, metadata, tags) = engine.extract_metadata_and_tags(&text);

    if json {
        let out = ExtractJson {
            cleaned: &cleaned,
            metadata: &metadata,
            tags: &tags,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", cleaned);
        let details = format_extracted(&metadata, &tags);
        if !details.is_empty() {
            println!();
            for line in details {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
