/// Dialog Linter — validates dialog libraries against the lines the
/// built-in sections actually play.
///
/// Usage: dialog_linter <ron-file-or-dir> [<ron-file-or-dir>...]

use std::path::Path;
use std::process;

use tutorial_graph::schema::dialog::DialogLibrary;
use tutorial_graph::schema::entity::LocalizationKey;
use tutorial_graph::sections::{courier, team_fight};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: dialog_linter <ron-file-or-dir> [<ron-file-or-dir>...]");
        process::exit(0);
    }

    let mut library = DialogLibrary::new();
    for arg in &args[1..] {
        let path = Path::new(arg);
        if path.is_file() {
            match DialogLibrary::load_from_ron(path) {
                Ok(loaded) => library.merge(loaded),
                Err(e) => {
                    eprintln!("ERROR: Failed to load '{}': {}", arg, e);
                    process::exit(1);
                }
            }
        } else if path.is_dir() {
            if let Err(e) = load_dir(path, &mut library) {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        } else {
            eprintln!("ERROR: Path '{}' does not exist", arg);
            process::exit(1);
        }
    }

    println!("Loaded {} dialog lines", library.lines.len());

    let mut referenced: Vec<&str> = Vec::new();
    referenced.extend(courier::DIALOG_KEYS);
    referenced.extend(team_fight::DIALOG_KEYS);

    let mut missing = 0;
    for key in &referenced {
        if library.duration(&LocalizationKey::from(*key)).is_none() {
            println!("MISSING: '{}' is played but has no line entry", key);
            missing += 1;
        }
    }

    let mut warnings = 0;
    for (key, line) in &library.lines {
        if line.duration <= 0.0 {
            println!("WARNING: '{}' has a non-positive duration", key);
            warnings += 1;
        }
        if !referenced.iter().any(|r| *r == key.as_str()) {
            println!("WARNING: '{}' is not played by any built-in section", key);
            warnings += 1;
        }
    }

    println!(
        "{} referenced lines, {} missing, {} warnings",
        referenced.len(),
        missing,
        warnings
    );

    if missing > 0 {
        process::exit(1);
    }
}

fn load_dir(dir: &Path, library: &mut DialogLibrary) -> Result<(), String> {
    let entries = std::fs::read_dir(dir).map_err(|e| format!("read_dir {:?}: {}", dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            let loaded = DialogLibrary::load_from_ron(&path)
                .map_err(|e| format!("load {:?}: {}", path, e))?;
            library.merge(loaded);
        }
    }
    Ok(())
}
