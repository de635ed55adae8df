//! # Volbook CLI Application
//!
//! Line-oriented interface for recording field measurements and computing
//! trapezoidal volumes. This is the data-entry surface in front of
//! `volbook_core`: it owns a measurement book, recomputes volumes on every
//! edit, autosaves through the debounced scheduler, and exports the PDF
//! report.
//!
//! Usage: `volbook [book.vbk]` (defaults to `measurements.vbk`).

use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;
use volbook_core::book::MeasurementBook;
use volbook_core::engine::format_for_display;
use volbook_core::file_io::{load_book_with_lock_check, save_book, FileLock};
use volbook_core::pdf::export_book_pdf;
use volbook_core::scheduler::SaveScheduler;

fn prompt_line(prompt: &str) -> String {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return String::new();
    }

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return String::new();
    }

    input.trim().to_string()
}

fn user_id() -> String {
    env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "volbook".to_string())
}

fn print_help() {
    println!("Commands:");
    println!("  a  add row        l  list rows       e  edit row");
    println!("  d  delete row     c  clear all rows");
    println!("  w  work detail    t  work type");
    println!("  p  export PDF     j  dump book JSON");
    println!("  s  save now       q  save and quit   h  help");
}

fn print_rows(book: &MeasurementBook) {
    if book.rows.is_empty() {
        println!("No measurements yet. Use 'a' to add a row.");
        return;
    }

    println!(
        "{:>4}  {:<10} {:<14} {:<14} {:<10} {:>10} {:>10}",
        "S.No", "Length", "Height", "Top", "Bed", "Vol (ft3)", "Vol (m3)"
    );
    for (i, row) in book.rows.iter().enumerate() {
        println!(
            "{:>4}  {:<10} {:<14} {:<14} {:<10} {:>10.2} {:>10.2}",
            i + 1,
            row.length,
            row.height_readings,
            row.top_readings,
            row.bed_width,
            format_for_display(row.vol_ft3, 2),
            format_for_display(row.vol_m3, 2),
        );
    }

    let totals = book.grand_totals();
    println!(
        "{:>4}  {:<51} {:>10.2} {:>10.2}",
        "",
        "Grand Total:",
        format_for_display(totals.ft3.value(), 2),
        format_for_display(totals.m3.value(), 2),
    );
}

/// Parse a 1-based S.No into a row id.
fn row_id_at(book: &MeasurementBook, input: &str) -> Option<Uuid> {
    let index: usize = input.parse().ok()?;
    book.rows.get(index.checked_sub(1)?).map(|r| r.id)
}

fn add_row(book: &mut MeasurementBook) {
    let length = prompt_line("Length (feet.inches, e.g. 5.6): ");
    let height = prompt_line("Height readings (e.g. 5+5+5): ");
    let top = prompt_line("Top readings (e.g. 4+4+4): ");
    let bed = prompt_line("Bed width (feet.inches): ");

    let id = book.add_row();
    if let Some(row) = book.row_mut(&id) {
        row.length = length;
        row.height_readings = height;
        row.top_readings = top;
        row.bed_width = bed;
        row.recompute();

        let (ft3, m3) = (row.vol_ft3, row.vol_m3);
        println!(
            "Row {}: {:.2} ft3 / {:.2} m3",
            book.row_count(),
            format_for_display(ft3, 2),
            format_for_display(m3, 2),
        );
    }
}

fn edit_row(book: &mut MeasurementBook) {
    let Some(id) = row_id_at(book, &prompt_line("Row number: ")) else {
        println!("No such row.");
        return;
    };

    let field = prompt_line("Field (l=length, h=height, t=top, b=bed): ");
    let value = prompt_line("New value: ");

    if let Some(row) = book.row_mut(&id) {
        match field.as_str() {
            "l" => row.length = value,
            "h" => row.height_readings = value,
            "t" => row.top_readings = value,
            "b" => row.bed_width = value,
            _ => {
                println!("Unknown field.");
                return;
            }
        }
        row.recompute();
        println!(
            "Recomputed: {:.2} ft3 / {:.2} m3",
            format_for_display(row.vol_ft3, 2),
            format_for_display(row.vol_m3, 2),
        );
    }
}

fn save_now(book: &MeasurementBook, path: &Path) {
    match save_book(book, path) {
        Ok(()) => println!("Saved {}", path.display()),
        Err(e) => eprintln!("Save failed: {}", e),
    }
}

fn main() {
    let path: PathBuf = env::args()
        .nth(1)
        .unwrap_or_else(|| "measurements.vbk".to_string())
        .into();

    println!("Volbook - Field Volume Calculator");
    println!("=================================");
    println!();

    // Load an existing book or start a new one
    let mut book = if path.exists() {
        match load_book_with_lock_check(&path) {
            Ok((book, lock_info)) => {
                if let Some(info) = lock_info {
                    eprintln!(
                        "{} is locked by {} ({}) since {}",
                        path.display(),
                        info.user_id,
                        info.machine,
                        info.locked_at
                    );
                    std::process::exit(1);
                }
                println!(
                    "Loaded {} ({} rows)",
                    path.display(),
                    book.row_count()
                );
                book
            }
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Starting new book at {}", path.display());
        MeasurementBook::default()
    };

    // Hold the lock for the whole session
    let _lock = match FileLock::acquire(&path, user_id()) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut autosave: SaveScheduler<MeasurementBook> = SaveScheduler::default();

    print_help();

    loop {
        // Commit any autosave whose quiet period has elapsed
        if let Some(snapshot) = autosave.poll() {
            if let Err(e) = save_book(&snapshot, &path) {
                eprintln!("Autosave failed: {}", e);
            }
        }

        let command = prompt_line("> ");
        match command.as_str() {
            "a" => {
                add_row(&mut book);
                autosave.schedule(book.clone());
            }
            "l" => print_rows(&book),
            "e" => {
                edit_row(&mut book);
                autosave.schedule(book.clone());
            }
            "d" => {
                match row_id_at(&book, &prompt_line("Row number: ")) {
                    Some(id) => {
                        book.remove_row(&id);
                        println!("Deleted.");
                        autosave.schedule(book.clone());
                    }
                    None => println!("No such row."),
                }
            }
            "c" => {
                if prompt_line("Clear all rows? (y/N): ").eq_ignore_ascii_case("y") {
                    book.clear_rows();
                    autosave.schedule(book.clone());
                }
            }
            "w" => {
                println!("Work detail (one line; use \\n for a second line):");
                book.meta.work_info = prompt_line("").replace("\\n", "\n");
                book.touch();
                autosave.schedule(book.clone());
            }
            "t" => {
                book.meta.work_type = prompt_line("Work type (e.g. Crate, DRSM): ");
                book.touch();
                autosave.schedule(book.clone());
            }
            "p" => match export_book_pdf(&book, Path::new(".")) {
                Ok(report_path) => println!("Report written to {}", report_path.display()),
                Err(e) => eprintln!("Export failed: {}", e),
            },
            "j" => {
                if let Ok(json) = serde_json::to_string_pretty(&book) {
                    println!("{}", json);
                }
            }
            "s" => {
                autosave.flush();
                save_now(&book, &path);
            }
            "q" | "" => {
                // Never lose the last edits
                if let Some(snapshot) = autosave.flush() {
                    save_now(&snapshot, &path);
                }
                break;
            }
            "h" => print_help(),
            other => println!("Unknown command '{}'. Use 'h' for help.", other),
        }
    }
}
