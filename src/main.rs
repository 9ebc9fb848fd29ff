use std::env;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use futoshiki::{solve, solve_str, Board};

fn main() -> io::Result<ExitCode> {
    match env::args().nth(1) {
        Some(config) => solve_single(&config),
        None => solve_batch(),
    }
}

fn solve_single(config: &str) -> io::Result<ExitCode> {
    let board: Board = match config.parse() {
        Ok(board) => board,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Input board:\n{board}");
    let start = Instant::now();
    match solve(&board) {
        Ok(solved) => {
            let elapsed = start.elapsed();
            println!("Solved string:\n{}", solved.to_config_str());
            println!("\nSolved board:\n{solved}");
            print_stats(&[elapsed]);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Reads newline-separated configuration strings from stdin and writes one
/// result line per puzzle to stdout, in input order. A puzzle that fails to
/// parse or has no solution produces a `# <error>` line and never aborts the
/// batch. Runtime statistics go to stderr.
fn solve_batch() -> io::Result<ExitCode> {
    let configs: Vec<String> = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<String>>>()?
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let results: Vec<_> = configs
        .par_iter()
        .map(|config| {
            let start = Instant::now();
            let result = solve_str(config);
            (result, start.elapsed())
        })
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut runtimes = Vec::with_capacity(results.len());
    for (line_number, (result, elapsed)) in results.iter().enumerate() {
        runtimes.push(*elapsed);
        match result {
            Ok(solved) => writeln!(out, "{solved}")?,
            Err(err) => {
                writeln!(out, "# {err}")?;
                eprintln!("puzzle {}: {err}", line_number + 1);
            }
        }
    }
    print_stats(&runtimes);
    Ok(ExitCode::SUCCESS)
}

fn print_stats(runtimes: &[Duration]) {
    if runtimes.is_empty() {
        return;
    }
    let n = runtimes.len();
    let secs: Vec<f64> = runtimes.iter().map(Duration::as_secs_f64).collect();
    let total: f64 = secs.iter().sum();
    let mean = total / n as f64;
    let min = secs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = secs.iter().copied().fold(0.0, f64::max);
    let std_dev = (secs.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / n as f64).sqrt();

    eprintln!("\nRuntime statistics:");
    eprintln!("Number of boards = {n}");
    eprintln!("Min runtime = {min:.8}");
    eprintln!("Max runtime = {max:.8}");
    eprintln!("Mean runtime = {mean:.8}");
    eprintln!("Standard deviation of runtime = {std_dev:.8}");
    eprintln!("Total runtime = {total:.8}");
}
