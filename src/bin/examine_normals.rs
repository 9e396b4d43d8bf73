use clap::Parser;
use std::path::PathBuf;

use normals_scraper::normals::{
    locate_section, NormalsDailyParser, StationMetadata, DAILY_SECTIONS,
};

#[derive(Parser)]
#[command(name = "examine-normals")]
#[command(about = "Inspect the header and daily sections of a local normals report", long_about = None)]
struct Cli {
    /// Path to a station normals report
    #[arg(default_value = "sample-data-files/USW00014922.normals.txt")]
    file: PathBuf,

    /// Print the raw slots of every row of this section
    #[arg(long)]
    section: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    println!("Opening normals report: {}", cli.file.display());
    let text = std::fs::read_to_string(&cli.file)?;
    let lines: Vec<&str> = text.lines().collect();
    println!("Lines: {}", lines.len());

    println!("\nHeader:");
    match StationMetadata::from_header_lines(&lines) {
        Ok(meta) => println!("{}", serde_json::to_string_pretty(&meta)?),
        Err(e) => println!("  [error] {e}"),
    }

    let parser = NormalsDailyParser::default();

    println!("\n{}", "=".repeat(60));
    println!("{:<18} {:>6} {:>8} {:>6}", "section", "line", "values", "nulls");
    println!("{}", "=".repeat(60));
    for (marker, kind) in DAILY_SECTIONS {
        let start = match locate_section(&lines, marker) {
            Ok(start) => start,
            Err(e) => {
                println!("{marker:<18} [error] {e}");
                continue;
            }
        };

        match parser.decode_section(&lines, marker, kind) {
            Ok(values) => {
                let nulls = values.iter().filter(|v| v.value.is_none()).count();
                println!("{marker:<18} {:>6} {:>8} {nulls:>6}", start + 1, values.len());
            }
            Err(e) => println!("{marker:<18} {:>6} [error] {e}", start + 1),
        }
    }

    if let Some(section) = cli.section {
        let start = locate_section(&lines, &section)?;
        println!("\nRaw slots for {section}:");
        for (row_idx, line) in lines.iter().skip(start).take(12).enumerate() {
            let raw = parser.decode_row(line)?;
            print!("Row {:2} ({:2} slots): ", row_idx + 1, raw.len());
            for slot in raw.iter().take(10) {
                match slot {
                    Some(v) => print!("[{v}] "),
                    None => print!("[null] "),
                }
            }
            println!();
        }
    }

    Ok(())
}
