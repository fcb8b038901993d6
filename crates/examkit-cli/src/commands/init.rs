//! The `examkit init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create examkit.toml
    if std::path::Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    // Create example question bank
    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.json");
    if example_path.exists() {
        println!("banks/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Edit examkit.toml (exam size, time limit, report sinks)");
    println!("  2. Run: examkit validate --bank banks/example.json");
    println!("  3. Run: examkit take --bank banks/example.json --name \"Your Name\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

[exam]
size = 25
duration_secs = 1200
include_explanations = false

# Post every finished exam to a web endpoint (e.g. a spreadsheet script).
# [sinks.sheet]
# type = "http"
# url = "${EXAMKIT_SHEET_URL}"
# timeout_secs = 10
# max_retries = 2

# Keep a JSON copy of every result.
[sinks.archive]
type = "file"
dir = "./examkit-results/archive"
"#;

const EXAMPLE_BANK: &str = r#"[
  {
    "id": "capital-france",
    "question": "What is the capital of France?",
    "options": ["Berlin", "Paris", "Madrid", "Rome"],
    "correctIndex": 1,
    "explanation": "Paris has been the capital of France since 987."
  },
  {
    "id": "largest-planet",
    "question": "Which planet is the largest in the solar system?",
    "options": ["Earth", "Saturn", "Jupiter", "Neptune"],
    "correctIndex": 2,
    "explanation": "Jupiter is more than twice as massive as all other planets combined."
  },
  {
    "id": "boiling-point",
    "question": "At sea level, water boils at what temperature in Celsius?",
    "options": ["90", "100", "110", ""],
    "correctIndex": 1
  },
  {
    "id": "prime",
    "question": "Which of these numbers is prime?",
    "options": ["21", "27", "29", "33"],
    "correctIndex": 2,
    "explanation": "29 has no divisors other than 1 and itself."
  },
  {
    "id": "author-hamlet",
    "question": "Who wrote Hamlet?",
    "options": ["Charles Dickens", "William Shakespeare", "Jane Austen", "Mark Twain"],
    "correctIndex": 1
  }
]
"#;
