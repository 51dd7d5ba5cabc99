// CLI commands for grading and managing Dojo challenges
use anyhow::{bail, Context, Result};
use dojo_common::catalog::ChallengeCatalog;
use dojo_common::config::Config;
use dojo_common::types::{Challenge, GradingReport, Language};
use dojo_grader::harness::build_harness_named;
use dojo_grader::{grade_submission, grade_submission_concurrent, ExecutionEngine, LanguageConfigManager, PistonEngine};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const SAMPLE_CHALLENGES: &str = include_str!("../../../config/challenges.json");

pub struct GradeArgs {
    pub catalog_path: PathBuf,
    pub code_path: PathBuf,
    pub challenge_id: Option<Uuid>,
    pub piston_url: Option<String>,
    pub parallel: usize,
    pub json: bool,
    pub languages_path: PathBuf,
}

fn read_code(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read code file: {}", path.display()))
}

fn load_catalog(path: &Path) -> Result<ChallengeCatalog> {
    ChallengeCatalog::load_from_file(path)
        .with_context(|| format!("Failed to load challenge catalog: {}", path.display()))
}

/// Pick the challenge to grade: by id, or the only one in the catalog
pub fn select_challenge(catalog: &ChallengeCatalog, id: Option<Uuid>) -> Result<&Challenge> {
    match id {
        Some(id) => catalog
            .get(&id)
            .with_context(|| format!("Challenge {} not found in catalog", id)),
        None => match catalog.challenges() {
            [only] => Ok(only),
            [] => bail!("Catalog contains no challenges"),
            many => {
                let ids: Vec<String> = many.iter().map(|c| format!("  {} {}", c.id, c.title)).collect();
                bail!("Catalog holds {} challenges, pick one with --id:\n{}", many.len(), ids.join("\n"))
            }
        },
    }
}

/// Grade a local solution; returns whether every test passed
pub async fn grade(args: &GradeArgs) -> Result<bool> {
    let catalog = load_catalog(&args.catalog_path)?;
    let challenge = select_challenge(&catalog, args.challenge_id)?;
    let code = read_code(&args.code_path)?;

    let config = Config::from_env()?;
    let piston_url = args.piston_url.clone().unwrap_or(config.piston_url);
    let runtimes = LanguageConfigManager::load_or_default(&args.languages_path)?;
    let engine = PistonEngine::new(&piston_url, runtimes, config.execution_timeout)?;

    if !args.json {
        println!("🧪 Grading '{}' ({}) via {}", challenge.title, challenge.language, engine.execute_url());
    }

    let report = run_grading(&engine, &code, challenge, args.parallel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }

    Ok(report.all_passed)
}

pub async fn run_grading(
    engine: &dyn ExecutionEngine,
    code: &str,
    challenge: &Challenge,
    parallel: usize,
) -> Result<GradingReport> {
    let report = if parallel > 1 {
        grade_submission_concurrent(engine, code, challenge, parallel).await
    } else {
        grade_submission(engine, code, challenge).await
    };
    report.with_context(|| format!("Grading '{}' failed", challenge.title))
}

/// Human-readable per-test table
pub fn render_report(report: &GradingReport) -> String {
    let mut out = String::new();
    for result in &report.test_results {
        let mark = if result.passed { "✅" } else { "❌" };
        out.push_str(&format!("  {} {}\n", mark, result.name));
    }

    let failed = report.failed_tests();
    if !failed.is_empty() {
        out.push_str("\nFailures:\n");
    }
    for result in failed {
        out.push_str(&format!("  {}\n", result.name));
        out.push_str(&format!("      expected: {}\n", result.expected));
        out.push_str(&format!("      actual:   {}\n", result.actual));
        if !result.error.trim().is_empty() {
            out.push_str(&format!("      error:    {}\n", result.error.trim()));
        }
    }
    out.push_str(&format!(
        "\n{}/{} tests passed\n",
        report.passed_count(),
        report.test_results.len()
    ));
    out
}

/// Print the harnessed program for one input
pub fn print_harness(language: &str, function: &str, input: &str, code_path: &Path) -> Result<()> {
    let code = read_code(code_path)?;
    let program = build_harness_named(&code, language, function, input)?;
    println!("{}", program);
    Ok(())
}

/// Validate a catalog file and summarize it
pub fn check_catalog(path: &Path) -> Result<()> {
    println!("🔍 Checking {}", path.display());
    let catalog = load_catalog(path)?;

    for challenge in catalog.challenges() {
        println!(
            "  ✅ {} [{}] {} test cases ({})",
            challenge.title,
            challenge.language,
            challenge.test_cases.len(),
            challenge.id
        );
    }

    println!("✅ {} challenges are valid", catalog.len());
    Ok(())
}

/// List the runtime table
pub fn list_languages(config_path: &Path) -> Result<()> {
    let runtimes = LanguageConfigManager::load_or_default(config_path)?;

    println!("📋 Configured runtimes:\n");
    for (language, selector) in runtimes.list_languages() {
        println!("  {:<12} → {} {}", language, selector.language, selector.version);
    }

    if !config_path.exists() {
        println!("\n(built-in defaults, {} not found)", config_path.display());
    }
    Ok(())
}

/// Initialize a project with runtime and challenge config
pub fn init_project(path: &Path) -> Result<()> {
    println!("🚀 Initializing Dojo project at: {}", path.display());

    let config_dir = path.join("config");
    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create directory: {}", config_dir.display()))?;
    println!("  ✅ Created: config");

    let languages_path = config_dir.join("languages.json");
    if !languages_path.exists() {
        let json_content = serde_json::to_string_pretty(&LanguageConfigManager::default().to_json())?;
        fs::write(&languages_path, json_content).context("Failed to write languages.json")?;
        println!("  ✅ Created: config/languages.json");
    }

    let challenges_path = config_dir.join("challenges.json");
    if !challenges_path.exists() {
        fs::write(&challenges_path, SAMPLE_CHALLENGES).context("Failed to write challenges.json")?;
        println!("  ✅ Created: config/challenges.json");
    }

    println!("✅ Project initialized successfully!");
    println!("\n📋 Next steps:");
    println!("  1. Start an execution service: docker run -p 2000:2000 ghcr.io/engineer-man/piston");
    println!("  2. Try a solution: dojo-cli grade --code solution.py --id <challenge id>");
    println!(
        "  3. Supported languages: {}",
        Language::ALL.map(|l| l.as_str()).join(", ")
    );

    Ok(())
}
