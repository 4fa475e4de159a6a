//! Jobs example: drive a shell through a small job-control scenario
//!
//! This example starts a shell in a scratch directory, creates a file,
//! starts a background job, and then checks the listing and the job table
//! by pattern, the way a terminal test would.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example jobs
//! ```
//!
//! With a different shell and a longer budget:
//! ```bash
//! PTYEXPECT_SHELL="/bin/bash --norc" cargo run --example jobs -- --timeout 10
//! ```

use std::env;
use std::time::Duration;

use ptyexpect::{Script, SessionBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let dir = tempfile::tempdir()?;

    println!("Starting {} in {}...", args.shell, dir.path().display());

    let mut session = SessionBuilder::new(args.shell.as_str())
        .current_dir(dir.path())
        .timeout(Duration::from_secs(args.timeout))
        .strip_ansi(true)
        .start()?;

    // bash only keeps a job table when interactive; sh prints nothing for
    // `jobs` in that case, so fall back to ps.
    let script = Script::builder()
        .send("touch totoExpect.txt")
        .send("sleep 10 &")
        .send("ls -s totoExpect.txt")
        .send("jobs; ps -o comm= -p $!")
        .expect(r"0 totoExpect\.txt")
        .expect("sleep")
        .build()?;

    let result = session.run_script(&script)?;

    println!("{}", "-".repeat(50));
    for record in &result.steps {
        println!("{:<40} {:?} ({:?})", record.step, record.outcome, record.elapsed);
    }
    println!("{}", "-".repeat(50));

    if let Some(timeout) = result.timeout() {
        eprintln!("Script failed: {}", timeout);
    } else {
        println!("Script completed in {:?}", result.elapsed);
    }

    println!("\nTranscript:");
    println!("{}", session.output().as_str_lossy());

    session.send_line("kill $!")?;
    session.stop();
    println!("Done!");

    result.into_result()?;
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    shell: String,
    timeout: u64,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut shell = env::var("PTYEXPECT_SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        let mut timeout = 5u64;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--shell" | "-s" => {
                    i += 1;
                    if i < args.len() {
                        shell = args[i].clone();
                    }
                }
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().unwrap_or(5);
                    }
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                }
            }
            i += 1;
        }

        Self { shell, timeout }
    }

    fn print_help() {
        println!(
            r#"ptyexpect jobs example

USAGE:
    cargo run --example jobs -- [OPTIONS]

OPTIONS:
    -s, --shell <CMD>        Shell command line [default: $PTYEXPECT_SHELL or /bin/sh]
    -t, --timeout <SECS>     Expect timeout [default: 5]
    --help                   Print this help message
"#
        );
    }
}
