use anyhow::{Context, Result, bail};
use folio_config::Config;
use folio_engine::editing::{Cmd, Editor, EditorConfig};
use folio_engine::io;
use relative_path::RelativePathBuf;
use std::path::{Path, PathBuf};
use std::{env, fs, process};

const USAGE: &str = "\
Usage:
  folio normalize <file.html> [--write]
  folio apply <file.html> <script.json> [--write]
  folio state <file.html> [script.json]
  folio list [documents-folder]";

/// Splits a file argument into the folder it lives in and its name.
fn locate(path: &Path) -> Result<(PathBuf, RelativePathBuf)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("'{}' is not a file path", path.display()))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((root, RelativePathBuf::from(name)))
}

fn open(path: &Path, config: &EditorConfig) -> Result<Editor> {
    let (root, relative) = locate(path)?;
    let outcome = io::read_document(&relative, &root, &config.html)?;
    for warning in &outcome.warnings {
        eprintln!("{}: {warning}", path.display());
    }
    Ok(Editor::with_config(outcome.document, config.clone()))
}

fn read_script(path: &Path) -> Result<Vec<Cmd>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Script '{}' is not a JSON array of commands", path.display()))
}

fn run_script(editor: &mut Editor, script: Vec<Cmd>) -> Result<()> {
    for (index, cmd) in script.into_iter().enumerate() {
        let name = cmd.name();
        editor
            .apply(cmd)
            .with_context(|| format!("Command {} ({name}) was rejected", index + 1))?;
    }
    Ok(())
}

fn save(path: &Path, editor: &Editor) -> Result<()> {
    let (root, relative) = locate(path)?;
    io::write_document(&relative, &root, editor.doc())?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn output(path: &Path, editor: &Editor, write: bool) -> Result<()> {
    if write {
        save(path, editor)
    } else {
        println!("{}", editor.html());
        Ok(())
    }
}

fn list(folder: Option<&String>) -> Result<()> {
    let documents_path = match folder {
        Some(folder) => PathBuf::from(folder),
        None => match Config::load()? {
            Some(config) => config.documents_path,
            None => bail!(
                "No documents folder given and no config file at {}",
                Config::config_path().display()
            ),
        },
    };
    io::validate_documents_dir(&documents_path).with_context(|| {
        format!("Documents path '{}' is invalid", documents_path.display())
    })?;
    for file in io::scan_documents(&documents_path)? {
        let shown = file.strip_prefix(&documents_path).unwrap_or(&file);
        println!("{}", shown.display());
    }
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    let write = args.iter().any(|a| a == "--write");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let config = match Config::load()? {
        Some(config) => config.editor_config(),
        None => EditorConfig::default(),
    };

    match positional.as_slice() {
        [command, file] if command.as_str() == "normalize" => {
            let path = Path::new(file.as_str());
            let editor = open(path, &config)?;
            output(path, &editor, write)
        }
        [command, file, script] if command.as_str() == "apply" => {
            let path = Path::new(file.as_str());
            let mut editor = open(path, &config)?;
            editor.on_change(|event| {
                log::debug!("{} v{}: {}", event.session, event.version, event.html);
            });
            run_script(&mut editor, read_script(Path::new(script.as_str()))?)?;
            output(path, &editor, write)
        }
        [command, file, rest @ ..] if command.as_str() == "state" && rest.len() <= 1 => {
            let mut editor = open(Path::new(file.as_str()), &config)?;
            if let Some(script) = rest.first() {
                run_script(&mut editor, read_script(Path::new(script.as_str()))?)?;
            }
            println!("{}", serde_json::to_string_pretty(&editor.snapshot())?);
            Ok(())
        }
        [command, rest @ ..] if command.as_str() == "list" && rest.len() <= 1 => {
            list(rest.first().copied())
        }
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    run(&args)
}
